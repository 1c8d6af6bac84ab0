//! Graph state as seen by the search: the connections made so far plus the
//! candidate connections that could be made next.

mod batch;
mod connection;

pub use batch::Batch;
pub use connection::Connection;

use crate::config::GraphBounds;
use crate::error::GraphError;

/// The current body of a graph and its candidate expansions.
///
/// Both sequences are fixed-capacity slot arenas: storage is reserved once at
/// construction and the vector length is the valid-slot counter. Inserting past
/// capacity is an error, never a reallocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Graph {
    connections: Vec<Connection>,
    possible_next: Vec<Connection>,
    body_capacity: usize,
    next_capacity: usize,
}

impl Graph {
    /// An empty graph sized for the given bounds.
    pub fn new(bounds: &GraphBounds) -> Self {
        Self::with_capacity(bounds.max_connections, bounds.max_candidates())
    }

    pub fn with_capacity(connections: usize, candidates: usize) -> Self {
        Self {
            connections: Vec::with_capacity(connections),
            possible_next: Vec::with_capacity(candidates),
            body_capacity: connections,
            next_capacity: candidates,
        }
    }

    /// Appends a body connection and stamps it with its insertion index.
    pub fn add_connection(&mut self, mut connection: Connection) -> Result<usize, GraphError> {
        if self.connections.len() >= self.body_capacity {
            return Err(GraphError::CapacityExceeded {
                sequence: "body",
                capacity: self.body_capacity,
            });
        }
        let position = self.connections.len();
        connection.position = position;
        self.connections.push(connection);
        Ok(position)
    }

    /// Appends a candidate connection. Candidates keep whatever position they carry.
    pub fn add_next(&mut self, connection: Connection) -> Result<(), GraphError> {
        if self.possible_next.len() >= self.next_capacity {
            return Err(GraphError::CapacityExceeded {
                sequence: "candidate",
                capacity: self.next_capacity,
            });
        }
        self.possible_next.push(connection);
        Ok(())
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn possible_next(&self) -> &[Connection] {
        &self.possible_next
    }

    /// Checks every body and candidate connection against `bounds`.
    pub fn validate(&self, bounds: &GraphBounds) -> Result<(), GraphError> {
        self.connections
            .iter()
            .chain(self.possible_next.iter())
            .try_for_each(|c| c.validate(bounds))
    }
}

impl GraphBounds {
    /// Candidate lists may be as long as the positional table.
    pub fn max_candidates(&self) -> usize {
        self.max_connections * 2
    }
}
