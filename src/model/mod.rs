//! Cross-attention scoring of candidate connections.

mod attention;
mod layers;

pub use attention::MultiHeadAttention;
pub use layers::{DecoderLayer, EncoderLayer};

use crate::codec::PaddingMask;
use crate::config::HeuristicConfig;
use crate::error::{ConfigError, SolverError};
use candle_core::Tensor;
use candle_nn::{LayerNorm, Module, VarBuilder};

/// Raw scores are clamped to this magnitude before the sigmoid so that the
/// single-precision result stays strictly inside (0, 1).
const SCORE_LIMIT: f32 = 15.0;

/// Encoder/decoder transformer that scores each candidate of a graph.
///
/// The problem body is the context stream: it runs through the encoder stack and
/// becomes the memory. The solution body is the target stream: it runs through
/// the decoder stack, attending to itself and to the memory. Every candidate is
/// then dotted against every contextualised solution position, the products are
/// averaged over the real (unpadded) solution positions, and squashed by a sigmoid.
pub struct HeuristicModel {
    encoder: Vec<EncoderLayer>,
    encoder_norm: LayerNorm,
    decoder: Vec<DecoderLayer>,
    decoder_norm: LayerNorm,
    embed_size: usize,
}

impl HeuristicModel {
    pub fn new(config: &HeuristicConfig, vb: VarBuilder) -> Result<Self, SolverError> {
        let dim = config.embed_size;
        let encoder = (0..config.encoder_layers)
            .map(|i| {
                EncoderLayer::new(
                    dim,
                    config.n_heads,
                    config.dim_fc,
                    config.dropout,
                    vb.pp(format!("encoder.{i}")),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        let decoder = (0..config.decoder_layers)
            .map(|i| {
                DecoderLayer::new(
                    dim,
                    config.n_heads,
                    config.dim_fc,
                    config.dropout,
                    vb.pp(format!("decoder.{i}")),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            encoder,
            encoder_norm: candle_nn::layer_norm(dim, 1e-5, vb.pp("encoder_norm"))?,
            decoder,
            decoder_norm: candle_nn::layer_norm(dim, 1e-5, vb.pp("decoder_norm"))?,
            embed_size: dim,
        })
    }

    /// Scores `[batch, candidate_width]`, every value in (0, 1).
    ///
    /// Inputs: `problem` `[batch, p_len, dim]`, `solution` `[batch, s_len, dim]`,
    /// `candidates` `[batch, candidate_width, dim]` with their padding masks.
    pub fn forward(
        &self,
        problem: &Tensor,
        problem_mask: &PaddingMask,
        solution: &Tensor,
        solution_mask: &PaddingMask,
        candidates: &Tensor,
        train: bool,
    ) -> Result<Tensor, SolverError> {
        for (name, tensor) in [
            ("problem", problem),
            ("solution", solution),
            ("candidates", candidates),
        ] {
            let width = tensor.dim(2)?;
            if width != self.embed_size {
                return Err(ConfigError::ShapeMismatch {
                    field: name,
                    expected: self.embed_size,
                    found: width,
                }
                .into());
            }
        }

        let device = problem.device();
        let problem_bias = problem_mask.additive(device)?;
        let solution_bias = solution_mask.additive(device)?;

        let mut memory = problem.clone();
        for layer in &self.encoder {
            memory = layer.forward(&memory, &problem_bias, train)?;
        }
        let memory = self.encoder_norm.forward(&memory)?;

        let mut x = solution.clone();
        for layer in &self.decoder {
            x = layer.forward(&x, &memory, &solution_bias, &problem_bias, train)?;
        }
        let x = self.decoder_norm.forward(&x)?;

        // [batch, candidates, solution positions]
        let pairwise = candidates.matmul(&x.transpose(1, 2)?.contiguous()?)?;

        let weights = solution_mask.weights(device)?.unsqueeze(1)?;
        let raw = pairwise
            .broadcast_mul(&weights)?
            .sum(2)?
            .broadcast_div(&solution_mask.valid_counts(device)?)?;

        Ok(sigmoid(&raw.clamp(-SCORE_LIMIT, SCORE_LIMIT)?)?)
    }
}

/// Logistic function built from differentiable primitives.
pub fn sigmoid(x: &Tensor) -> candle_core::Result<Tensor> {
    (x.neg()?.exp()? + 1.0)?.recip()
}

/// Inverted dropout, active only on training passes.
pub(crate) fn dropout(x: &Tensor, p: f32, train: bool) -> candle_core::Result<Tensor> {
    if train && p > 0.0 {
        candle_nn::ops::dropout(x, p)
    } else {
        Ok(x.clone())
    }
}
