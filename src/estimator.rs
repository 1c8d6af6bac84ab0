use crate::config::GraphBounds;
use crate::error::SolverError;
use crate::graph::Batch;

/// The narrow capability the protocol layer needs from the model.
///
/// [`Solver`](crate::solver::Solver) is the real implementation; anything else that
/// can score and learn from graph batches (a test double, a fixed-rule heuristic)
/// can be served in its place.
pub trait HeuristicEstimator {
    /// Bounds that decoded graphs are validated against.
    fn bounds(&self) -> GraphBounds;

    /// One row per graph with exactly one score per candidate, in candidate order.
    fn estimate(&self, batch: &Batch) -> Result<Vec<Vec<f32>>, SolverError>;

    /// Learns from the labelled candidates of `batch` and returns the loss.
    fn train(&mut self, batch: &Batch) -> Result<f32, SolverError>;
}
