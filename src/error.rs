use std::io;
use thiserror::Error;

/// Errors of the quantum network core
#[derive(Debug, Error)]
pub enum QnetError {
    /// Target index does not exist in the state
    #[error("target index {index} is out of range for a {qubits}-qubit state")]
    InvalidTarget { index: usize, qubits: usize },

    /// The same target was named twice in one gate application
    #[error("target {0} is named more than once")]
    DuplicateTarget(usize),

    /// Gate matrix does not match the number of targets
    #[error("gate is {rows}x{cols}, expected {expected}x{expected} for {targets} target(s)")]
    GateDimension {
        rows: usize,
        cols: usize,
        expected: usize,
        targets: usize,
    },

    /// Gate matrix is not unitary
    #[error("gate is not unitary (max deviation {0:e})")]
    NonUnitary(f64),

    /// Amplitude vector cannot describe a qubit register
    #[error("amplitude vector of length {0} is not a normalizable qubit register")]
    InvalidAmplitudes(usize),

    /// Lookup by id failed where a qubit was required
    #[error("unknown qubit: {0}")]
    UnknownQubit(String),

    /// Registry and qubit handles disagree
    #[error("state registry is inconsistent: {0}")]
    InconsistentRegistry(String),

    /// Net device has no channel
    #[error("device is not attached to a channel")]
    NotAttached,

    /// Channel or link has nowhere to deliver
    #[error("no receiver is connected")]
    NotConnected,

    /// Classical correction payload could not be decoded
    #[error("malformed correction payload: {0}")]
    MalformedPayload(String),

    /// Gate name is not known
    #[error("unknown gate: {0}")]
    UnknownGate(String),

    /// Configuration error
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A scheduled protocol ended without a result
    #[error("protocol did not complete: {0}")]
    Incomplete(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for QnetError {
    fn from(err: serde_json::Error) -> Self {
        QnetError::Serialization(err.to_string())
    }
}

pub type QnetResult<T> = Result<T, QnetError>;
