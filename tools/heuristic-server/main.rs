use clap::Parser;
use graph_heuristic::prelude::*;
use graph_heuristic::solver::AutosaveSolver;
use log::{error, info};
use std::path::PathBuf;

/// Serves learned heuristic estimates for node-graph search over TCP
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Optional JSON configuration file; flags below override its fields
    #[arg(short, long)]
    config: Option<String>,

    /// Port to listen on (loopback only)
    #[arg(short, long)]
    port: Option<u16>,

    /// Adam learning rate
    #[arg(long)]
    learning_rate: Option<f64>,

    /// Number of attention heads
    #[arg(long)]
    n_heads: Option<usize>,

    /// Embedding width
    #[arg(long)]
    embed_size: Option<usize>,

    /// Maximum node index plus one
    #[arg(long)]
    max_nodes: Option<usize>,

    /// Maximum plug index plus one
    #[arg(long)]
    max_plugs: Option<usize>,

    /// Number of distinct node types
    #[arg(long)]
    num_node_types: Option<usize>,

    /// Number of distinct plug data types
    #[arg(long)]
    num_data_types: Option<usize>,

    /// Maximum body connections per graph
    #[arg(long)]
    max_connections: Option<usize>,

    /// Number of encoder layers
    #[arg(long)]
    encoder_layers: Option<usize>,

    /// Number of decoder layers
    #[arg(long)]
    decoder_layers: Option<usize>,

    /// Feed-forward width inside each layer
    #[arg(long)]
    dim_fc: Option<usize>,

    /// Dropout probability used during training
    #[arg(long)]
    dropout: Option<f32>,

    /// Restore weights from this checkpoint before serving
    #[arg(long)]
    load: Option<PathBuf>,

    /// Write a checkpoint here after every train request
    #[arg(long)]
    save: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> (HeuristicConfig, Option<PathBuf>, Option<PathBuf>) {
        let mut config = match &self.config {
            Some(path) => HeuristicConfig::from_file(path).unwrap_or_else(|e| {
                exit_with_error(&format!("Failed to load configuration '{}': {}", path, e))
            }),
            None => HeuristicConfig::default(),
        };

        if let Some(v) = self.port {
            config.port = v;
        }
        if let Some(v) = self.learning_rate {
            config.learning_rate = v;
        }
        if let Some(v) = self.n_heads {
            config.n_heads = v;
        }
        if let Some(v) = self.embed_size {
            config.embed_size = v;
        }
        if let Some(v) = self.max_nodes {
            config.max_nodes = v;
        }
        if let Some(v) = self.max_plugs {
            config.max_plugs = v;
        }
        if let Some(v) = self.num_node_types {
            config.num_node_types = v;
        }
        if let Some(v) = self.num_data_types {
            config.num_data_types = v;
        }
        if let Some(v) = self.max_connections {
            config.max_connections = v;
        }
        if let Some(v) = self.encoder_layers {
            config.encoder_layers = v;
        }
        if let Some(v) = self.decoder_layers {
            config.decoder_layers = v;
        }
        if let Some(v) = self.dim_fc {
            config.dim_fc = v;
        }
        if let Some(v) = self.dropout {
            config.dropout = v;
        }

        (config, self.load, self.save)
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    let (config, load, save) = Cli::parse().into_config();
    config
        .validate()
        .unwrap_or_else(|e| exit_with_error(&format!("Invalid configuration: {}", e)));
    info!("Configuration: {:?}", config);

    let port = config.port;
    let mut solver = Solver::new(config, &Device::Cpu)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to build model: {}", e)));

    if let Some(path) = &load {
        Checkpoint
            .load(&mut solver, path)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to load checkpoint: {}", e)));
    }

    match save {
        Some(path) => serve(port, AutosaveSolver::new(solver, path)),
        None => serve(port, solver),
    }
}

fn serve<E: HeuristicEstimator>(port: u16, estimator: E) {
    info!("Starting server on port {}...", port);
    let mut server = HeuristicServer::bind(port, estimator)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to bind port {}: {}", port, e)));
    if let Err(e) = server.run() {
        exit_with_error(&format!("Server stopped: {}", e));
    }
}

fn exit_with_error(message: &str) -> ! {
    error!("{}", message);
    std::process::exit(1);
}
