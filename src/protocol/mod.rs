//! The socket protocol: packet decoding, handler dispatch and the accept loop.

pub mod packet;
mod server;
mod stream;

pub use server::HeuristicServer;
pub use stream::{PacketStream, float_to_wire, wire_to_float};

use crate::error::ProtocolError;
use crate::estimator::HeuristicEstimator;
use ahash::AHashMap;
use log::{debug, warn};
use packet::{ESTIMATE_PACKET, TRAIN_PACKET};
use std::io::{Read, Write};

/// Handles one packet whose type tag has already been read.
pub type Handler<E, S> = fn(&mut E, &mut PacketStream<S>) -> Result<(), ProtocolError>;

/// Maps packet type tags to their handlers.
pub struct HandlerTable<E, S> {
    handlers: AHashMap<i32, Handler<E, S>>,
}

impl<E, S> HandlerTable<E, S> {
    /// A table with no handlers; every packet is a protocol violation.
    pub fn empty() -> Self {
        Self {
            handlers: AHashMap::new(),
        }
    }

    pub fn register(&mut self, tag: i32, handler: Handler<E, S>) -> &mut Self {
        self.handlers.insert(tag, handler);
        self
    }

    pub fn contains(&self, tag: i32) -> bool {
        self.handlers.contains_key(&tag)
    }
}

impl<E: HeuristicEstimator, S: Read + Write> HandlerTable<E, S> {
    /// The estimate (tag 0) and train (tag 1) handlers.
    pub fn new() -> Self {
        let mut table = Self::empty();
        table
            .register(ESTIMATE_PACKET, handle_estimate::<E, S>)
            .register(TRAIN_PACKET, handle_train::<E, S>);
        table
    }

    /// Reads a tag and runs the matching handler.
    ///
    /// An unknown tag is returned as [`ProtocolError::UnknownPacket`]; the caller is
    /// expected to drop the connection since the rest of the stream cannot be framed.
    pub fn handle_packet(
        &self,
        estimator: &mut E,
        stream: &mut PacketStream<S>,
    ) -> Result<(), ProtocolError> {
        let tag = stream.read_i32()?;
        match self.handlers.get(&tag) {
            Some(handler) => handler(estimator, stream),
            None => {
                warn!("Unknown packet type: {}", tag);
                Err(ProtocolError::UnknownPacket(tag))
            }
        }
    }
}

impl<E: HeuristicEstimator, S: Read + Write> Default for HandlerTable<E, S> {
    fn default() -> Self {
        Self::new()
    }
}

fn handle_estimate<E: HeuristicEstimator, S: Read + Write>(
    estimator: &mut E,
    stream: &mut PacketStream<S>,
) -> Result<(), ProtocolError> {
    let batch = packet::read_estimate_request(stream, &estimator.bounds())?;
    debug!("Estimate request for {} graphs", batch.len());
    let scores = estimator.estimate(&batch)?;
    packet::write_estimate_response(stream, &scores);
    stream.flush()
}

fn handle_train<E: HeuristicEstimator, S: Read + Write>(
    estimator: &mut E,
    stream: &mut PacketStream<S>,
) -> Result<(), ProtocolError> {
    let batch = packet::read_train_request(stream, &estimator.bounds())?;
    let loss = estimator.train(&batch)?;
    debug!("Train request for {} graphs: loss {}", batch.len(), loss);
    packet::write_train_response(stream, loss);
    stream.flush()
}
