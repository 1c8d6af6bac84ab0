use thiserror::Error;

/// Errors raised when a graph or connection does not fit the configured bounds.
///
/// These are the "range" failures: they reject a request before any embedding
/// lookup can index past the end of a table.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Field '{field}' has value {value}, which is outside the valid range 0..{bound}")]
    IndexOutOfRange {
        field: &'static str,
        value: i64,
        bound: usize,
    },

    #[error("Cannot add to the {sequence} sequence: capacity of {capacity} connections reached")]
    CapacityExceeded {
        sequence: &'static str,
        capacity: usize,
    },

    #[error("Sequence of length {length} exceeds the positional table of {max} rows")]
    SequenceTooLong { length: usize, max: usize },

    #[error("Candidate label {value} is not a finite value in [0, 1]")]
    InvalidLabel { value: f32 },
}

/// Errors caused by an invalid or inconsistent model configuration.
///
/// These are fatal: a server never starts with a configuration that fails validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration field '{field}' is invalid: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },

    #[error("Checkpoint shape mismatch: {field} is {found}, expected {expected}")]
    ShapeMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Failed to read configuration file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors that can occur during a forward or training pass.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Tensor operation failed: {0}")]
    Tensor(#[from] candle_core::Error),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Batch holds {problems} problem graphs but {solutions} solution graphs")]
    BatchMismatch { problems: usize, solutions: usize },

    #[error("Training loss is not finite ({0}); optimizer step skipped")]
    NonFiniteLoss(f32),

    #[error("Checkpoint I/O failed: {0}")]
    Checkpoint(String),
}

/// Errors that end the handling of a single client connection.
///
/// None of these stop the listener; the server logs them and accepts the next client.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Connection closed by peer")]
    ConnectionClosed,

    #[error("Unknown packet type: {0}")]
    UnknownPacket(i32),

    #[error("Unsupported packet version {found} for packet type {packet}")]
    UnsupportedVersion { packet: i32, found: i32 },

    #[error("Socket I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Rejected request: {0}")]
    Range(#[from] GraphError),

    #[error("Handler failed: {0}")]
    Solver(#[from] SolverError),
}
