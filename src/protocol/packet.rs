//! Field-by-field layouts of every packet body.
//!
//! There is no length prefix anywhere: message boundaries follow entirely from
//! the counts embedded in each body. A connection record is four ints in the
//! order node index, node type, plug index, plug type.
//!
//! Estimate request (tag 0):
//! `n_graphs, n_graphs × { solution: n_conn, n_conn × record, n_next, n_next × record;
//! problem: n_conn, n_conn × record }`.
//! Estimate response: `n_graphs, n_graphs × { n_next, n_next × f32 }`.
//!
//! Train request (tag 1): `version, n_graphs`, then the estimate layout with an
//! `f32` heuristic label after every candidate record. Train response: `f32 loss`.

use super::stream::PacketStream;
use crate::config::GraphBounds;
use crate::error::{GraphError, ProtocolError};
use crate::graph::{Batch, Connection, Graph};
use std::io::{Read, Write};

pub const ESTIMATE_PACKET: i32 = 0;
pub const TRAIN_PACKET: i32 = 1;

/// The only train request layout this server understands.
pub const TRAIN_VERSION: i32 = 1;

/// Which candidate section, if any, follows a graph's body on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Candidates {
    Absent,
    Unlabelled,
    Labelled,
}

fn read_count<S: Read + Write>(
    stream: &mut PacketStream<S>,
    field: &'static str,
) -> Result<usize, ProtocolError> {
    let value = stream.read_i32()?;
    if value < 0 {
        return Err(GraphError::IndexOutOfRange {
            field,
            value: value as i64,
            bound: i32::MAX as usize,
        }
        .into());
    }
    Ok(value as usize)
}

fn read_connection<S: Read + Write>(
    stream: &mut PacketStream<S>,
    bounds: &GraphBounds,
) -> Result<Connection, ProtocolError> {
    let raw = [
        stream.read_i32()?,
        stream.read_i32()?,
        stream.read_i32()?,
        stream.read_i32()?,
    ];
    Ok(Connection::from_raw(raw, bounds)?)
}

fn read_graph<S: Read + Write>(
    stream: &mut PacketStream<S>,
    bounds: &GraphBounds,
    candidates: Candidates,
) -> Result<Graph, ProtocolError> {
    let mut graph = Graph::new(bounds);

    let n_connections = read_count(stream, "n_connections")?;
    for _ in 0..n_connections {
        let connection = read_connection(stream, bounds)?;
        graph.add_connection(connection)?;
    }

    if candidates == Candidates::Absent {
        return Ok(graph);
    }

    let n_next = read_count(stream, "n_next")?;
    for _ in 0..n_next {
        let mut connection = read_connection(stream, bounds)?;
        if candidates == Candidates::Labelled {
            connection = connection.try_with_heuristic(stream.read_f32()?)?;
        }
        graph.add_next(connection)?;
    }
    Ok(graph)
}

fn read_batch<S: Read + Write>(
    stream: &mut PacketStream<S>,
    bounds: &GraphBounds,
    candidates: Candidates,
) -> Result<Batch, ProtocolError> {
    let n_graphs = read_count(stream, "n_graphs")?;
    let mut batch = Batch::default();
    for _ in 0..n_graphs {
        let solution = read_graph(stream, bounds, candidates)?;
        let problem = read_graph(stream, bounds, Candidates::Absent)?;
        batch.push(problem, solution);
    }
    Ok(batch)
}

/// Decodes an estimate request body (the tag has already been consumed).
pub fn read_estimate_request<S: Read + Write>(
    stream: &mut PacketStream<S>,
    bounds: &GraphBounds,
) -> Result<Batch, ProtocolError> {
    read_batch(stream, bounds, Candidates::Unlabelled)
}

/// Decodes a train request body (the tag has already been consumed).
pub fn read_train_request<S: Read + Write>(
    stream: &mut PacketStream<S>,
    bounds: &GraphBounds,
) -> Result<Batch, ProtocolError> {
    let version = stream.read_i32()?;
    if version != TRAIN_VERSION {
        return Err(ProtocolError::UnsupportedVersion {
            packet: TRAIN_PACKET,
            found: version,
        });
    }
    read_batch(stream, bounds, Candidates::Labelled)
}

pub fn write_estimate_response<S: Read + Write>(stream: &mut PacketStream<S>, scores: &[Vec<f32>]) {
    stream.write_i32(scores.len() as i32);
    for row in scores {
        stream.write_i32(row.len() as i32);
        for &score in row {
            stream.write_f32(score);
        }
    }
}

pub fn write_train_response<S: Read + Write>(stream: &mut PacketStream<S>, loss: f32) {
    stream.write_f32(loss);
}

// Client side: the mirror images of the functions above.

fn write_connection<S: Read + Write>(stream: &mut PacketStream<S>, connection: &Connection) {
    for index in connection.indices() {
        stream.write_i32(index as i32);
    }
}

fn write_graph<S: Read + Write>(
    stream: &mut PacketStream<S>,
    graph: &Graph,
    candidates: Candidates,
) {
    stream.write_i32(graph.connections().len() as i32);
    for connection in graph.connections() {
        write_connection(stream, connection);
    }

    if candidates == Candidates::Absent {
        return;
    }

    stream.write_i32(graph.possible_next().len() as i32);
    for connection in graph.possible_next() {
        write_connection(stream, connection);
        if candidates == Candidates::Labelled {
            stream.write_f32(connection.heuristic);
        }
    }
}

fn write_batch<S: Read + Write>(
    stream: &mut PacketStream<S>,
    batch: &Batch,
    candidates: Candidates,
) {
    stream.write_i32(batch.len() as i32);
    for (problem, solution) in batch.pairs() {
        write_graph(stream, solution, candidates);
        write_graph(stream, problem, Candidates::Absent);
    }
}

/// Writes a full estimate request, tag included.
pub fn write_estimate_request<S: Read + Write>(stream: &mut PacketStream<S>, batch: &Batch) {
    stream.write_i32(ESTIMATE_PACKET);
    write_batch(stream, batch, Candidates::Unlabelled);
}

/// Writes a full train request, tag and version included.
pub fn write_train_request<S: Read + Write>(stream: &mut PacketStream<S>, batch: &Batch) {
    stream.write_i32(TRAIN_PACKET);
    stream.write_i32(TRAIN_VERSION);
    write_batch(stream, batch, Candidates::Labelled);
}

pub fn read_estimate_response<S: Read + Write>(
    stream: &mut PacketStream<S>,
) -> Result<Vec<Vec<f32>>, ProtocolError> {
    let n_graphs = read_count(stream, "n_graphs")?;
    let mut scores = Vec::new();
    for _ in 0..n_graphs {
        let n_next = read_count(stream, "n_next")?;
        let row = (0..n_next)
            .map(|_| stream.read_f32())
            .collect::<Result<Vec<_>, _>>()?;
        scores.push(row);
    }
    Ok(scores)
}

pub fn read_train_response<S: Read + Write>(
    stream: &mut PacketStream<S>,
) -> Result<f32, ProtocolError> {
    stream.read_f32()
}
