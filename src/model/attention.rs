use super::dropout;
use candle_core::{D, Tensor};
use candle_nn::{Linear, Module, VarBuilder};

/// Scaled dot-product attention split across `n_heads` heads.
///
/// Keys are masked with an additive `[batch, kv_len]` bias, so a padded key never
/// receives attention weight from any query.
pub struct MultiHeadAttention {
    q_proj: Linear,
    k_proj: Linear,
    v_proj: Linear,
    out_proj: Linear,
    n_heads: usize,
    head_dim: usize,
    dropout: f32,
}

impl MultiHeadAttention {
    pub fn new(
        embed_size: usize,
        n_heads: usize,
        dropout: f32,
        vb: VarBuilder,
    ) -> candle_core::Result<Self> {
        Ok(Self {
            q_proj: candle_nn::linear(embed_size, embed_size, vb.pp("q_proj"))?,
            k_proj: candle_nn::linear(embed_size, embed_size, vb.pp("k_proj"))?,
            v_proj: candle_nn::linear(embed_size, embed_size, vb.pp("v_proj"))?,
            out_proj: candle_nn::linear(embed_size, embed_size, vb.pp("out_proj"))?,
            n_heads,
            head_dim: embed_size / n_heads,
            dropout,
        })
    }

    /// `query` is `[batch, q_len, dim]`, `context` is `[batch, kv_len, dim]`,
    /// `key_mask` is `[batch, kv_len]`. Returns `[batch, q_len, dim]`.
    pub fn forward(
        &self,
        query: &Tensor,
        context: &Tensor,
        key_mask: &Tensor,
        train: bool,
    ) -> candle_core::Result<Tensor> {
        let (batch, q_len, dim) = query.dims3()?;
        let kv_len = context.dim(1)?;

        let q = self.split_heads(&self.q_proj.forward(query)?, batch, q_len)?;
        let k = self.split_heads(&self.k_proj.forward(context)?, batch, kv_len)?;
        let v = self.split_heads(&self.v_proj.forward(context)?, batch, kv_len)?;

        // [batch, heads, q_len, kv_len]
        let scale = 1.0 / (self.head_dim as f64).sqrt();
        let scores = (q.matmul(&k.t()?.contiguous()?)? * scale)?;
        let bias = key_mask.unsqueeze(1)?.unsqueeze(1)?;
        let scores = scores.broadcast_add(&bias)?;

        let weights = candle_nn::ops::softmax(&scores, D::Minus1)?;
        let weights = dropout(&weights, self.dropout, train)?;

        let context = weights
            .matmul(&v)?
            .transpose(1, 2)?
            .contiguous()?
            .reshape((batch, q_len, dim))?;
        self.out_proj.forward(&context)
    }

    /// `[batch, len, dim]` to `[batch, heads, len, head_dim]`.
    fn split_heads(&self, x: &Tensor, batch: usize, len: usize) -> candle_core::Result<Tensor> {
        x.reshape((batch, len, self.n_heads, self.head_dim))?
            .transpose(1, 2)?
            .contiguous()
    }
}
