use crate::error::ProtocolError;
use std::io::{ErrorKind, Read, Write};

/// Bytes requested from the socket per low-level read.
const READ_CHUNK: usize = 1024;

/// Bit pattern of `value` as the signed integer that carries it on the wire.
pub fn float_to_wire(value: f32) -> i32 {
    value.to_bits() as i32
}

/// Inverse of [`float_to_wire`].
pub fn wire_to_float(bits: i32) -> f32 {
    f32::from_bits(bits as u32)
}

/// Buffered view of a byte stream in the wire's vocabulary: big-endian `i32`s
/// and `f32`s sent as their `i32` bit pattern.
///
/// Reads block until enough bytes have arrived. Writes accumulate in an output
/// buffer and go out on [`flush`](Self::flush).
pub struct PacketStream<S> {
    inner: S,
    in_buffer: Vec<u8>,
    out_buffer: Vec<u8>,
}

impl<S: Read + Write> PacketStream<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            in_buffer: Vec::with_capacity(READ_CHUNK),
            out_buffer: Vec::new(),
        }
    }

    /// Performs one low-level read, appending whatever arrived.
    fn fill(&mut self) -> Result<(), ProtocolError> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(0) => return Err(ProtocolError::ConnectionClosed),
                Ok(n) => {
                    self.in_buffer.extend_from_slice(&chunk[..n]);
                    return Ok(());
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Blocks until at least `amount` bytes are buffered.
    pub fn ensure_capacity(&mut self, amount: usize) -> Result<(), ProtocolError> {
        while self.in_buffer.len() < amount {
            self.fill()?;
        }
        Ok(())
    }

    pub fn read_i32(&mut self) -> Result<i32, ProtocolError> {
        self.ensure_capacity(4)?;
        let bytes = [
            self.in_buffer[0],
            self.in_buffer[1],
            self.in_buffer[2],
            self.in_buffer[3],
        ];
        self.in_buffer.drain(..4);
        Ok(i32::from_be_bytes(bytes))
    }

    pub fn read_f32(&mut self) -> Result<f32, ProtocolError> {
        self.read_i32().map(wire_to_float)
    }

    pub fn write_i32(&mut self, value: i32) {
        self.out_buffer.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.write_i32(float_to_wire(value));
    }

    /// Sends everything written since the last flush.
    pub fn flush(&mut self) -> Result<(), ProtocolError> {
        self.inner.write_all(&self.out_buffer)?;
        self.inner.flush()?;
        self.out_buffer.clear();
        Ok(())
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}
