//! Turns batches of variable-length graphs into padded, masked tensors.

mod mask;
mod positional;

pub use mask::{MASKED_SCORE, PaddingMask};
pub use positional::{PositionalEncoding, sinusoid};

use crate::config::{GraphBounds, HeuristicConfig};
use crate::error::SolverError;
use crate::graph::{Connection, Graph};
use candle_core::{DType, Device, Tensor};
use candle_nn::{Embedding, Module, VarBuilder};

/// The tensors produced for one batch of graphs.
///
/// Shapes: `body` is `[batch, body_width, dim]`, `candidates` is
/// `[batch, candidate_width, dim]`, `labels` is `[batch, candidate_width]`.
/// Padded slots hold zero vectors and zero labels.
///
/// Each width is the longest sequence of its kind in the batch, except that it
/// never drops below one. When every graph has an empty body (or no candidates)
/// the width is still 1 and each row's mask holds a single padded slot, so every
/// tensor keeps a non-empty sequence axis.
#[derive(Debug, Clone)]
pub struct EncodedBatch {
    pub body: Tensor,
    pub candidates: Tensor,
    pub labels: Tensor,
    pub body_mask: PaddingMask,
    pub candidate_mask: PaddingMask,
}

/// Learned connection embeddings plus the fixed positional table.
///
/// A connection embeds as the sum of four table lookups (node index, node type,
/// plug index, plug type); the row for sequence slot `p` then gets row `p` of
/// the positional table added to it.
pub struct GraphCodec {
    node_index: Embedding,
    node_type: Embedding,
    plug_index: Embedding,
    plug_type: Embedding,
    positional: PositionalEncoding,
    bounds: GraphBounds,
    embed_size: usize,
    device: Device,
}

impl GraphCodec {
    pub fn new(config: &HeuristicConfig, vb: VarBuilder) -> Result<Self, SolverError> {
        let dim = config.embed_size;
        let device = vb.device().clone();
        Ok(Self {
            node_index: candle_nn::embedding(config.max_nodes, dim, vb.pp("node_index"))?,
            node_type: candle_nn::embedding(config.num_node_types, dim, vb.pp("node_type"))?,
            plug_index: candle_nn::embedding(config.max_plugs, dim, vb.pp("plug_index"))?,
            plug_type: candle_nn::embedding(config.num_data_types, dim, vb.pp("plug_type"))?,
            positional: PositionalEncoding::new(dim, config.max_sequence_len(), &device)?,
            bounds: config.bounds(),
            embed_size: dim,
            device,
        })
    }

    /// Encodes the body and candidate sequences of every graph, padding each to the
    /// longest sequence of its kind in the batch. Batch order follows `graphs`.
    pub fn encode(&self, graphs: &[Graph]) -> Result<EncodedBatch, SolverError> {
        let body_lengths: Vec<usize> = graphs.iter().map(|g| g.connections().len()).collect();
        let candidate_lengths: Vec<usize> =
            graphs.iter().map(|g| g.possible_next().len()).collect();

        // At least one slot per row so every tensor keeps a non-empty sequence axis.
        let body_width = body_lengths.iter().copied().max().unwrap_or(0).max(1);
        let candidate_width = candidate_lengths.iter().copied().max().unwrap_or(0).max(1);

        let mut body = Vec::with_capacity(graphs.len());
        let mut candidates = Vec::with_capacity(graphs.len());
        let mut labels = Vec::with_capacity(graphs.len() * candidate_width);

        for graph in graphs {
            graph.validate(&self.bounds)?;
            body.push(self.embed_sequence(graph.connections(), body_width)?);
            candidates.push(self.embed_sequence(graph.possible_next(), candidate_width)?);

            labels.extend(graph.possible_next().iter().map(|c| c.heuristic));
            labels.extend(std::iter::repeat_n(
                0.0f32,
                candidate_width - graph.possible_next().len(),
            ));
        }

        Ok(EncodedBatch {
            body: Tensor::stack(&body, 0)?,
            candidates: Tensor::stack(&candidates, 0)?,
            labels: Tensor::from_vec(labels, (graphs.len(), candidate_width), &self.device)?,
            body_mask: PaddingMask::from_lengths(&body_lengths, body_width),
            candidate_mask: PaddingMask::from_lengths(&candidate_lengths, candidate_width),
        })
    }

    /// `[width, dim]` embedding of one sequence, zero-padded past its length.
    fn embed_sequence(
        &self,
        connections: &[Connection],
        width: usize,
    ) -> Result<Tensor, SolverError> {
        let length = connections.len();
        if length == 0 {
            return Ok(Tensor::zeros((width, self.embed_size), DType::F32, &self.device)?);
        }

        let mut columns: [Vec<u32>; 4] = std::array::from_fn(|_| Vec::with_capacity(length));
        for connection in connections {
            for (column, index) in columns.iter_mut().zip(connection.indices()) {
                column.push(index);
            }
        }

        let lookup = |table: &Embedding, column: Vec<u32>| -> Result<Tensor, SolverError> {
            let ids = Tensor::from_vec(column, length, &self.device)?;
            Ok(table.forward(&ids)?)
        };
        let [node_index, node_type, plug_index, plug_type] = columns;
        let x = lookup(&self.node_index, node_index)?
            .add(&lookup(&self.node_type, node_type)?)?
            .add(&lookup(&self.plug_index, plug_index)?)?
            .add(&lookup(&self.plug_type, plug_type)?)?;
        let x = self.positional.forward(&x)?;

        if width == length {
            return Ok(x);
        }
        let padding = Tensor::zeros((width - length, self.embed_size), DType::F32, &self.device)?;
        Ok(Tensor::cat(&[&x, &padding], 0)?)
    }
}
