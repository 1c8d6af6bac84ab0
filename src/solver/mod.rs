//! Owns the trainable parameters and runs end-to-end passes.

mod checkpoint;

pub use checkpoint::{AutosaveSolver, Checkpoint, ParameterStore, header_path};

use crate::codec::{EncodedBatch, GraphCodec};
use crate::config::{GraphBounds, HeuristicConfig};
use crate::error::SolverError;
use crate::estimator::HeuristicEstimator;
use crate::graph::{Batch, Graph};
use crate::model::HeuristicModel;
use candle_core::{DType, Device, Tensor};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarBuilder, VarMap};
use log::{debug, warn};

/// What a call to [`Solver::forward`] produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ForwardOutput {
    /// One row per graph, trimmed to that graph's candidate count.
    Scores(Vec<Vec<f32>>),
    /// Mean squared error over real candidates, measured before the update.
    Loss(f32),
}

/// The model context: embedding tables, attention weights and Adam state.
///
/// Created once at startup and passed to whoever serves requests. Training
/// mutates the parameters and optimizer moments; inference only reads them.
pub struct Solver {
    config: HeuristicConfig,
    varmap: VarMap,
    problem_codec: GraphCodec,
    solution_codec: GraphCodec,
    model: HeuristicModel,
    optimizer: AdamW,
}

impl Solver {
    pub fn new(config: HeuristicConfig, device: &Device) -> Result<Self, SolverError> {
        config.validate()?;

        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let problem_codec = GraphCodec::new(&config, vb.pp("problem_encoder"))?;
        let solution_codec = GraphCodec::new(&config, vb.pp("solution_encoder"))?;
        let model = HeuristicModel::new(&config, vb.pp("model"))?;

        // Plain Adam: the decoupled weight decay term is switched off.
        let params = ParamsAdamW {
            lr: config.learning_rate,
            weight_decay: 0.0,
            ..Default::default()
        };
        let optimizer = AdamW::new(varmap.all_vars(), params)?;

        Ok(Self {
            config,
            varmap,
            problem_codec,
            solution_codec,
            model,
            optimizer,
        })
    }

    pub fn config(&self) -> &HeuristicConfig {
        &self.config
    }

    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    pub fn varmap_mut(&mut self) -> &mut VarMap {
        &mut self.varmap
    }

    /// Runs one pass over paired problem and solution graphs.
    ///
    /// With `train` set this encodes both batches, scores the candidates, computes
    /// the loss against the solution candidates' heuristic labels and applies one
    /// optimizer step. Otherwise it only scores, leaving every parameter untouched.
    pub fn forward(
        &mut self,
        problems: &[Graph],
        solutions: &[Graph],
        train: bool,
    ) -> Result<ForwardOutput, SolverError> {
        if problems.len() != solutions.len() {
            return Err(SolverError::BatchMismatch {
                problems: problems.len(),
                solutions: solutions.len(),
            });
        }
        if train {
            self.train_step(problems, solutions).map(ForwardOutput::Loss)
        } else {
            self.infer(problems, solutions).map(ForwardOutput::Scores)
        }
    }

    fn infer(&self, problems: &[Graph], solutions: &[Graph]) -> Result<Vec<Vec<f32>>, SolverError> {
        if solutions.is_empty() {
            return Ok(Vec::new());
        }
        let (scores, _) = self.predict(problems, solutions, false)?;
        let rows = scores.to_vec2::<f32>()?;
        Ok(rows
            .into_iter()
            .zip(solutions)
            .map(|(mut row, graph)| {
                row.truncate(graph.possible_next().len());
                row
            })
            .collect())
    }

    fn train_step(&mut self, problems: &[Graph], solutions: &[Graph]) -> Result<f32, SolverError> {
        if solutions.is_empty() {
            return Ok(0.0);
        }
        let (scores, encoded) = self.predict(problems, solutions, true)?;

        let real = (0..encoded.candidate_mask.batch_size())
            .map(|row| encoded.candidate_mask.valid_count(row))
            .sum::<usize>();
        if real == 0 {
            debug!("Training batch has no candidates; skipping optimizer step");
            return Ok(0.0);
        }

        let weights = encoded.candidate_mask.weights(scores.device())?;
        let squared = scores.sub(&encoded.labels)?.sqr()?.mul(&weights)?;
        let loss = (squared.sum_all()? / real as f64)?;
        let value = loss.to_scalar::<f32>()?;
        if !value.is_finite() {
            warn!("Non-finite training loss {}; parameters left unchanged", value);
            return Err(SolverError::NonFiniteLoss(value));
        }

        // Gradients are recomputed from scratch by every backward pass, so there
        // is nothing left over from the previous step to clear.
        self.optimizer.backward_step(&loss)?;

        debug!("Training step over {} graphs: loss {}", solutions.len(), value);
        Ok(value)
    }

    fn predict(
        &self,
        problems: &[Graph],
        solutions: &[Graph],
        train: bool,
    ) -> Result<(Tensor, EncodedBatch), SolverError> {
        let problem = self.problem_codec.encode(problems)?;
        let solution = self.solution_codec.encode(solutions)?;
        let scores = self.model.forward(
            &problem.body,
            &problem.body_mask,
            &solution.body,
            &solution.body_mask,
            &solution.candidates,
            train,
        )?;
        Ok((scores, solution))
    }
}

impl HeuristicEstimator for Solver {
    fn bounds(&self) -> GraphBounds {
        self.config.bounds()
    }

    fn estimate(&self, batch: &Batch) -> Result<Vec<Vec<f32>>, SolverError> {
        self.infer(batch.problems(), batch.solutions())
    }

    fn train(&mut self, batch: &Batch) -> Result<f32, SolverError> {
        self.train_step(batch.problems(), batch.solutions())
    }
}
