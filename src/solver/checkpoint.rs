use super::Solver;
use crate::config::{GraphBounds, HeuristicConfig};
use crate::error::{ConfigError, SolverError};
use crate::estimator::HeuristicEstimator;
use crate::graph::Batch;
use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use log::info;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Saves and restores a solver's parameters.
pub trait ParameterStore {
    fn save(&self, solver: &Solver, path: &Path) -> Result<(), SolverError>;
    fn load(&self, solver: &mut Solver, path: &Path) -> Result<(), SolverError>;
}

/// Safetensors weights at `path`, plus a bincode header at `path.header` that
/// records the model shape the weights were trained under.
///
/// Optimizer moments are not stored; a restored solver starts Adam afresh.
#[derive(Debug, Clone, Copy, Default)]
pub struct Checkpoint;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct CheckpointHeader {
    n_heads: usize,
    embed_size: usize,
    max_nodes: usize,
    max_plugs: usize,
    num_node_types: usize,
    num_data_types: usize,
    max_connections: usize,
    encoder_layers: usize,
    decoder_layers: usize,
    dim_fc: usize,
}

impl CheckpointHeader {
    fn from_config(config: &HeuristicConfig) -> Self {
        Self {
            n_heads: config.n_heads,
            embed_size: config.embed_size,
            max_nodes: config.max_nodes,
            max_plugs: config.max_plugs,
            num_node_types: config.num_node_types,
            num_data_types: config.num_data_types,
            max_connections: config.max_connections,
            encoder_layers: config.encoder_layers,
            decoder_layers: config.decoder_layers,
            dim_fc: config.dim_fc,
        }
    }

    fn fields(&self) -> [(&'static str, usize); 10] {
        [
            ("n_heads", self.n_heads),
            ("embed_size", self.embed_size),
            ("max_nodes", self.max_nodes),
            ("max_plugs", self.max_plugs),
            ("num_node_types", self.num_node_types),
            ("num_data_types", self.num_data_types),
            ("max_connections", self.max_connections),
            ("encoder_layers", self.encoder_layers),
            ("decoder_layers", self.decoder_layers),
            ("dim_fc", self.dim_fc),
        ]
    }

    /// Fails on the first shape field that differs from `running`.
    fn check_against(&self, running: &CheckpointHeader) -> Result<(), ConfigError> {
        for ((field, found), (_, expected)) in self.fields().into_iter().zip(running.fields()) {
            if found != expected {
                return Err(ConfigError::ShapeMismatch {
                    field,
                    expected,
                    found,
                });
            }
        }
        Ok(())
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Where the shape header for the weights at `path` lives.
pub fn header_path(path: &Path) -> PathBuf {
    with_suffix(path, ".header")
}

fn file_error(action: &str, path: &Path, e: io::Error) -> SolverError {
    SolverError::Checkpoint(format!("Could not {} '{}': {}", action, path.display(), e))
}

impl ParameterStore for Checkpoint {
    /// Both files are staged under a `.tmp` suffix and only renamed into place once
    /// each has been written in full, weights first.
    fn save(&self, solver: &Solver, path: &Path) -> Result<(), SolverError> {
        let header = CheckpointHeader::from_config(solver.config());
        let bytes = encode_to_vec(&header, standard())
            .map_err(|e| SolverError::Checkpoint(format!("Serialization failed: {}", e)))?;

        let header_file = header_path(path);
        let staged_weights = with_suffix(path, ".tmp");
        let staged_header = with_suffix(&header_file, ".tmp");

        solver.varmap().save(&staged_weights)?;
        fs::write(&staged_header, bytes).map_err(|e| file_error("write", &staged_header, e))?;

        fs::rename(&staged_weights, path).map_err(|e| file_error("replace", path, e))?;
        fs::rename(&staged_header, &header_file)
            .map_err(|e| file_error("replace", &header_file, e))?;
        info!("Saved checkpoint to '{}'", path.display());
        Ok(())
    }

    fn load(&self, solver: &mut Solver, path: &Path) -> Result<(), SolverError> {
        let header_file = header_path(path);
        let bytes = fs::read(&header_file).map_err(|e| file_error("read", &header_file, e))?;
        let (header, _): (CheckpointHeader, usize) = decode_from_slice(&bytes, standard())
            .map_err(|e| SolverError::Checkpoint(format!("Deserialization failed: {}", e)))?;
        header.check_against(&CheckpointHeader::from_config(solver.config()))?;

        solver.varmap_mut().load(path)?;
        info!("Loaded checkpoint from '{}'", path.display());
        Ok(())
    }
}

/// A solver that writes a checkpoint after every training step.
pub struct AutosaveSolver {
    solver: Solver,
    path: PathBuf,
}

impl AutosaveSolver {
    pub fn new(solver: Solver, path: impl Into<PathBuf>) -> Self {
        Self {
            solver,
            path: path.into(),
        }
    }

    pub fn into_inner(self) -> Solver {
        self.solver
    }
}

impl HeuristicEstimator for AutosaveSolver {
    fn bounds(&self) -> GraphBounds {
        self.solver.bounds()
    }

    fn estimate(&self, batch: &Batch) -> Result<Vec<Vec<f32>>, SolverError> {
        self.solver.estimate(batch)
    }

    fn train(&mut self, batch: &Batch) -> Result<f32, SolverError> {
        let loss = self.solver.train(batch)?;
        Checkpoint.save(&self.solver, &self.path)?;
        Ok(loss)
    }
}
