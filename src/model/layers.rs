use super::attention::MultiHeadAttention;
use super::dropout;
use candle_core::Tensor;
use candle_nn::{LayerNorm, Linear, Module, VarBuilder};

const LAYER_NORM_EPS: f64 = 1e-5;

struct FeedForward {
    linear1: Linear,
    linear2: Linear,
    dropout: f32,
}

impl FeedForward {
    fn new(
        embed_size: usize,
        dim_fc: usize,
        dropout: f32,
        vb: VarBuilder,
    ) -> candle_core::Result<Self> {
        Ok(Self {
            linear1: candle_nn::linear(embed_size, dim_fc, vb.pp("linear1"))?,
            linear2: candle_nn::linear(dim_fc, embed_size, vb.pp("linear2"))?,
            dropout,
        })
    }

    fn forward(&self, x: &Tensor, train: bool) -> candle_core::Result<Tensor> {
        let hidden = self.linear1.forward(x)?.relu()?;
        let hidden = dropout(&hidden, self.dropout, train)?;
        self.linear2.forward(&hidden)
    }
}

/// Self-attention over the context stream followed by a feed-forward block.
/// Residual connections with post-normalisation.
pub struct EncoderLayer {
    self_attn: MultiHeadAttention,
    feed_forward: FeedForward,
    norm1: LayerNorm,
    norm2: LayerNorm,
    dropout: f32,
}

impl EncoderLayer {
    pub fn new(
        embed_size: usize,
        n_heads: usize,
        dim_fc: usize,
        dropout: f32,
        vb: VarBuilder,
    ) -> candle_core::Result<Self> {
        Ok(Self {
            self_attn: MultiHeadAttention::new(embed_size, n_heads, dropout, vb.pp("self_attn"))?,
            feed_forward: FeedForward::new(embed_size, dim_fc, dropout, vb.pp("feed_forward"))?,
            norm1: candle_nn::layer_norm(embed_size, LAYER_NORM_EPS, vb.pp("norm1"))?,
            norm2: candle_nn::layer_norm(embed_size, LAYER_NORM_EPS, vb.pp("norm2"))?,
            dropout,
        })
    }

    pub fn forward(&self, x: &Tensor, mask: &Tensor, train: bool) -> candle_core::Result<Tensor> {
        let attended = self.self_attn.forward(x, x, mask, train)?;
        let x = self.norm1.forward(&(x + dropout(&attended, self.dropout, train)?)?)?;
        let fed = self.feed_forward.forward(&x, train)?;
        self.norm2.forward(&(&x + dropout(&fed, self.dropout, train)?)?)
    }
}

/// Self-attention over the target stream, cross-attention into the encoded
/// context, then a feed-forward block.
pub struct DecoderLayer {
    self_attn: MultiHeadAttention,
    cross_attn: MultiHeadAttention,
    feed_forward: FeedForward,
    norm1: LayerNorm,
    norm2: LayerNorm,
    norm3: LayerNorm,
    dropout: f32,
}

impl DecoderLayer {
    pub fn new(
        embed_size: usize,
        n_heads: usize,
        dim_fc: usize,
        dropout: f32,
        vb: VarBuilder,
    ) -> candle_core::Result<Self> {
        Ok(Self {
            self_attn: MultiHeadAttention::new(embed_size, n_heads, dropout, vb.pp("self_attn"))?,
            cross_attn: MultiHeadAttention::new(embed_size, n_heads, dropout, vb.pp("cross_attn"))?,
            feed_forward: FeedForward::new(embed_size, dim_fc, dropout, vb.pp("feed_forward"))?,
            norm1: candle_nn::layer_norm(embed_size, LAYER_NORM_EPS, vb.pp("norm1"))?,
            norm2: candle_nn::layer_norm(embed_size, LAYER_NORM_EPS, vb.pp("norm2"))?,
            norm3: candle_nn::layer_norm(embed_size, LAYER_NORM_EPS, vb.pp("norm3"))?,
            dropout,
        })
    }

    pub fn forward(
        &self,
        x: &Tensor,
        memory: &Tensor,
        mask: &Tensor,
        memory_mask: &Tensor,
        train: bool,
    ) -> candle_core::Result<Tensor> {
        let attended = self.self_attn.forward(x, x, mask, train)?;
        let x = self.norm1.forward(&(x + dropout(&attended, self.dropout, train)?)?)?;
        let crossed = self.cross_attn.forward(&x, memory, memory_mask, train)?;
        let x = self.norm2.forward(&(&x + dropout(&crossed, self.dropout, train)?)?)?;
        let fed = self.feed_forward.forward(&x, train)?;
        self.norm3.forward(&(&x + dropout(&fed, self.dropout, train)?)?)
    }
}
