//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from the
//! graph-heuristic crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use graph_heuristic::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let config = HeuristicConfig::from_file("path/to/config.json")?;
//! config.validate()?;
//! let solver = Solver::new(config.clone(), &Device::Cpu)?;
//!
//! let mut server = HeuristicServer::bind(config.port, solver)?;
//! server.run()?;
//! # Ok(())
//! # }
//! ```

// Graph data model
pub use crate::graph::{Batch, Connection, Graph};

// Configuration
pub use crate::config::{GraphBounds, HeuristicConfig};

// Encoding, scoring and training
pub use crate::codec::{EncodedBatch, GraphCodec, PaddingMask};
pub use crate::estimator::HeuristicEstimator;
pub use crate::model::HeuristicModel;
pub use crate::solver::{Checkpoint, ForwardOutput, ParameterStore, Solver};

// Serving
pub use crate::protocol::{HandlerTable, HeuristicServer, PacketStream};

// Error types
pub use crate::error::{ConfigError, GraphError, ProtocolError, SolverError};

// Device selection for the tensor backend
pub use candle_core::Device;

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
