use candle_core::{Device, Tensor};

/// Large negative bias added to attention scores of padded keys.
///
/// Finite so that a row whose keys are all padding still softmaxes to a uniform
/// distribution instead of NaN.
pub const MASKED_SCORE: f32 = -1e9;

/// Per-graph padding flags for one padded sequence; `true` marks padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaddingMask {
    rows: Vec<Vec<bool>>,
    width: usize,
}

impl PaddingMask {
    /// Builds the mask for sequences of the given lengths padded to `width`.
    pub fn from_lengths(lengths: &[usize], width: usize) -> Self {
        let rows = lengths
            .iter()
            .map(|&len| (0..width).map(|i| i >= len).collect())
            .collect();
        Self { rows, width }
    }

    pub fn rows(&self) -> &[Vec<bool>] {
        &self.rows
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn batch_size(&self) -> usize {
        self.rows.len()
    }

    pub fn padded_count(&self, row: usize) -> usize {
        self.rows[row].iter().filter(|&&padded| padded).count()
    }

    pub fn valid_count(&self, row: usize) -> usize {
        self.width - self.padded_count(row)
    }

    /// `[batch, width]` additive attention bias: 0 for real keys, [`MASKED_SCORE`] for padding.
    pub fn additive(&self, device: &Device) -> candle_core::Result<Tensor> {
        self.to_tensor(device, |padded| if padded { MASKED_SCORE } else { 0.0 })
    }

    /// `[batch, width]` weights: 1 for real positions, 0 for padding.
    pub fn weights(&self, device: &Device) -> candle_core::Result<Tensor> {
        self.to_tensor(device, |padded| if padded { 0.0 } else { 1.0 })
    }

    /// `[batch, 1]` count of real positions per row, never below one.
    pub fn valid_counts(&self, device: &Device) -> candle_core::Result<Tensor> {
        let counts: Vec<f32> = (0..self.batch_size())
            .map(|row| self.valid_count(row).max(1) as f32)
            .collect();
        Tensor::from_vec(counts, (self.batch_size(), 1), device)
    }

    fn to_tensor(
        &self,
        device: &Device,
        value: impl Fn(bool) -> f32,
    ) -> candle_core::Result<Tensor> {
        let data: Vec<f32> = self.rows.iter().flatten().map(|&p| value(p)).collect();
        Tensor::from_vec(data, (self.batch_size(), self.width), device)
    }
}
