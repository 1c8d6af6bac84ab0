//! Common test utilities for building graphs, configurations and stand-in peers.
use graph_heuristic::prelude::*;
use std::io::{self, Cursor, Read, Write};

/// A configuration small enough for fast CPU passes, with the default index bounds.
#[allow(dead_code)]
pub fn small_config() -> HeuristicConfig {
    HeuristicConfig {
        port: 0,
        learning_rate: 0.01,
        n_heads: 2,
        embed_size: 8,
        encoder_layers: 1,
        decoder_layers: 1,
        dim_fc: 16,
        dropout: 0.0,
        ..HeuristicConfig::default()
    }
}

/// A graph with the given body connections and candidates, built by insertion.
#[allow(dead_code)]
pub fn build_graph(body: &[[u32; 4]], next: &[([u32; 4], f32)]) -> Graph {
    let mut graph = Graph::new(&GraphBounds::default());
    for c in body {
        graph
            .add_connection(Connection::new(c[0], c[1], c[2], c[3]))
            .expect("body fits capacity");
    }
    for (c, h) in next {
        graph
            .add_next(Connection::new(c[0], c[1], c[2], c[3]).with_heuristic(*h))
            .expect("candidates fit capacity");
    }
    graph
}

/// The multiply/subtract example graph: ten body connections, three candidates.
#[allow(dead_code)]
pub fn arithmetic_solution() -> Graph {
    build_graph(
        &[
            [0, 0, 0, 0],
            [2, 2, 0, 0],
            [2, 2, 0, 0],
            [1, 1, 1, 0],
            [2, 2, 1, 0],
            [3, 3, 0, 0],
            [3, 3, 0, 0],
            [1, 1, 1, 0],
            [3, 3, 1, 0],
            [1, 1, 2, 0],
        ],
        &[
            ([1, 1, 1, 0], 0.9),
            ([2, 2, 2, 0], 0.1),
            ([3, 3, 3, 0], 0.4),
        ],
    )
}

/// A short problem graph.
#[allow(dead_code)]
pub fn small_problem() -> Graph {
    build_graph(&[[1, 2, 3, 4], [1, 2, 3, 4]], &[])
}

/// In-memory peer: reads come from `input`, writes land in `output`.
#[allow(dead_code)]
pub struct Duplex {
    pub input: Cursor<Vec<u8>>,
    pub output: Vec<u8>,
}

#[allow(dead_code)]
impl Duplex {
    pub fn new(input: Vec<u8>) -> Self {
        Self {
            input: Cursor::new(input),
            output: Vec::new(),
        }
    }
}

impl Read for Duplex {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for Duplex {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// In-memory peer that hands out at most one byte per `read` call.
#[allow(dead_code)]
pub struct Trickle {
    pub input: Vec<u8>,
    pub offset: usize,
    pub reads: usize,
    pub output: Vec<u8>,
}

#[allow(dead_code)]
impl Trickle {
    pub fn new(input: Vec<u8>) -> Self {
        Self {
            input,
            offset: 0,
            reads: 0,
            output: Vec::new(),
        }
    }
}

impl Read for Trickle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reads += 1;
        if buf.is_empty() || self.offset >= self.input.len() {
            return Ok(0);
        }
        buf[0] = self.input[self.offset];
        self.offset += 1;
        Ok(1)
    }
}

impl Write for Trickle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Encodes a request with the client-side writers and returns its bytes.
#[allow(dead_code)]
pub fn encode_with(write: impl FnOnce(&mut PacketStream<Duplex>)) -> Vec<u8> {
    let mut stream = PacketStream::new(Duplex::new(Vec::new()));
    write(&mut stream);
    stream.flush().expect("in-memory flush");
    stream.into_inner().output
}

/// Scores every candidate 0.5 and reports the mean label as its training loss.
#[derive(Default)]
#[allow(dead_code)]
pub struct StubEstimator {
    pub labels: Vec<f32>,
}

impl HeuristicEstimator for StubEstimator {
    fn bounds(&self) -> GraphBounds {
        GraphBounds::default()
    }

    fn estimate(&self, batch: &Batch) -> std::result::Result<Vec<Vec<f32>>, SolverError> {
        Ok(batch
            .solutions()
            .iter()
            .map(|g| vec![0.5; g.possible_next().len()])
            .collect())
    }

    fn train(&mut self, batch: &Batch) -> std::result::Result<f32, SolverError> {
        self.labels = batch
            .solutions()
            .iter()
            .flat_map(|g| g.possible_next().iter().map(|c| c.heuristic))
            .collect();
        let count = self.labels.len().max(1) as f32;
        Ok(self.labels.iter().sum::<f32>() / count)
    }
}
