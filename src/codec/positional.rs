use crate::error::{GraphError, SolverError};
use candle_core::{Device, Tensor};

/// Precomputed sinusoidal position table.
///
/// Even columns hold `sin(pos * w_i)`, odd columns `cos(pos * w_i)`, with the
/// frequency `w_i` decaying geometrically from 1 to 1/10000 across the width.
#[derive(Debug, Clone)]
pub struct PositionalEncoding {
    table: Tensor,
    max_len: usize,
}

impl PositionalEncoding {
    pub fn new(d_model: usize, max_len: usize, device: &Device) -> Result<Self, SolverError> {
        let mut data = vec![0f32; max_len * d_model];
        for position in 0..max_len {
            let row = &mut data[position * d_model..(position + 1) * d_model];
            for (dim, value) in row.iter_mut().enumerate() {
                *value = sinusoid(position, dim, d_model);
            }
        }
        let table = Tensor::from_vec(data, (max_len, d_model), device)?;
        Ok(Self { table, max_len })
    }

    /// Adds row `p` of the table to row `p` of `x` for every position in `x`.
    pub fn forward(&self, x: &Tensor) -> Result<Tensor, SolverError> {
        let length = x.dim(0)?;
        if length > self.max_len {
            return Err(GraphError::SequenceTooLong {
                length,
                max: self.max_len,
            }
            .into());
        }
        Ok(x.add(&self.table.narrow(0, 0, length)?)?)
    }
}

/// Table entry for `position` at column `dim`.
pub fn sinusoid(position: usize, dim: usize, d_model: usize) -> f32 {
    let pair = (dim - dim % 2) as f64;
    let frequency = (-pair * 10000f64.ln() / d_model as f64).exp();
    let angle = position as f64 * frequency;
    if dim % 2 == 0 {
        angle.sin() as f32
    } else {
        angle.cos() as f32
    }
}
