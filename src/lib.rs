//! # Graph Heuristic - Learned Scoring for Node-Graph Search
//!
//! **graph-heuristic** estimates how promising each candidate expansion of a node-graph
//! search is. Given a *problem* graph (the structure being synthesised) and a *solution*
//! graph (the partial structure so far plus a list of candidate next connections), it
//! predicts a score in (0, 1) for every candidate.
//!
//! ## Core Workflow
//!
//! 1.  **Describe Graphs**: Build [`Graph`](graph::Graph)s from [`Connection`](graph::Connection)s,
//!     either by hand or by decoding them from the socket protocol.
//! 2.  **Encode**: A [`GraphCodec`](codec::GraphCodec) turns a batch of graphs into padded
//!     embedding tensors with padding masks.
//! 3.  **Score**: The [`HeuristicModel`](model::HeuristicModel) cross-attends the solution
//!     against the problem and scores each candidate.
//! 4.  **Train or Serve**: The [`Solver`](solver::Solver) owns the parameters and the Adam
//!     optimizer; the [`HeuristicServer`](protocol::HeuristicServer) exposes it over TCP.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use graph_heuristic::prelude::*;
//!
//! fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let config = HeuristicConfig::default();
//!     let bounds = config.bounds();
//!     let mut solver = Solver::new(config, &Device::Cpu)?;
//!
//!     let mut problem = Graph::new(&bounds);
//!     problem.add_connection(Connection::new(0, 0, 0, 0))?;
//!
//!     let mut solution = Graph::new(&bounds);
//!     solution.add_connection(Connection::new(1, 1, 1, 0))?;
//!     solution.add_next(Connection::new(2, 2, 0, 0).with_heuristic(0.8))?;
//!
//!     let loss = solver.forward(&[problem.clone()], &[solution.clone()], true)?;
//!     println!("Training loss: {:?}", loss);
//!
//!     let scores = solver.forward(&[problem], &[solution], false)?;
//!     println!("Scores: {:?}", scores);
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod estimator;
pub mod graph;
pub mod model;
pub mod prelude;
pub mod protocol;
pub mod solver;
