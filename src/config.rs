use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;

/// Startup configuration for the heuristic service.
///
/// Every field except `port` and `learning_rate` affects the shape of the model, so a
/// set of trained weights is only usable with the configuration it was trained under.
/// Missing fields in a JSON file fall back to [`HeuristicConfig::default`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct HeuristicConfig {
    pub port: u16,
    pub learning_rate: f64,
    pub n_heads: usize,
    pub embed_size: usize,
    pub max_nodes: usize,
    pub max_plugs: usize,
    pub num_node_types: usize,
    pub num_data_types: usize,
    pub max_connections: usize,
    pub encoder_layers: usize,
    pub decoder_layers: usize,
    pub dim_fc: usize,
    pub dropout: f32,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            port: 8246,
            learning_rate: 0.01,
            n_heads: 8,
            embed_size: 64,
            max_nodes: 24,
            max_plugs: 8,
            num_node_types: 16,
            num_data_types: 16,
            max_connections: 32,
            encoder_layers: 6,
            decoder_layers: 6,
            dim_fc: 1024,
            dropout: 0.2,
        }
    }
}

impl HeuristicConfig {
    /// Load a configuration from a JSON file.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Number of rows in the positional table: twice the connection limit.
    pub fn max_sequence_len(&self) -> usize {
        self.max_connections * 2
    }

    /// The index bounds a graph must satisfy to be encoded under this configuration.
    pub fn bounds(&self) -> GraphBounds {
        GraphBounds {
            max_nodes: self.max_nodes,
            max_plugs: self.max_plugs,
            num_node_types: self.num_node_types,
            num_data_types: self.num_data_types,
            max_connections: self.max_connections,
        }
    }

    /// Checks that the configuration describes a model that can actually be built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sizes: [(&'static str, usize); 10] = [
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
        ];
        for (field, value) in sizes {
            if value == 0 {
                return Err(ConfigError::InvalidField {
                    field,
                    message: "must be greater than zero".to_string(),
                });
            }
        }

        if self.embed_size % self.n_heads != 0 {
            return Err(ConfigError::InvalidField {
                field: "embed_size",
                message: format!(
                    "{} is not divisible by the head count {}",
                    self.embed_size, self.n_heads
                ),
            });
        }

        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ConfigError::InvalidField {
                field: "dropout",
                message: format!("{} is outside [0, 1)", self.dropout),
            });
        }

        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ConfigError::InvalidField {
                field: "learning_rate",
                message: format!("{} is not a positive finite number", self.learning_rate),
            });
        }

        Ok(())
    }
}

/// Upper bounds for the four index fields of a connection and for sequence length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphBounds {
    pub max_nodes: usize,
    pub max_plugs: usize,
    pub num_node_types: usize,
    pub num_data_types: usize,
    pub max_connections: usize,
}

impl Default for GraphBounds {
    fn default() -> Self {
        HeuristicConfig::default().bounds()
    }
}
