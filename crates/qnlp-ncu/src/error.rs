//! Error types for the NCU crate.
//!
//! Only runtime conditions are represented here. Caller bugs such as an
//! inverted control range or a target inside the control block are
//! precondition violations and panic instead.

use thiserror::Error;

/// Errors produced by the decomposition engine and its supporting types.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NcuError {
    /// The closed-form square root divides by `sqrt(trace + 2·sqrt(det))`,
    /// which vanished for this matrix (for example `-I`).
    #[error("matrix square root is degenerate: |t| = {magnitude:e} is within tolerance {tolerance:e}")]
    NumericalDegeneracy {
        /// Magnitude of the denominator `t`.
        magnitude: f64,
        /// Tolerance the magnitude was compared against.
        tolerance: f64,
    },

    /// No chain is cached under this label.
    #[error("no gate chain cached under label '{0}'")]
    UnknownGate(String),

    /// A control list was empty.
    #[error("control list is empty")]
    EmptyControls,

    /// Control indices do not form one contiguous block.
    #[error("control qubits {indices:?} are not contiguous (gap after qubit {gap_after})")]
    NonContiguousControls {
        /// The offending indices, sorted.
        indices: Vec<usize>,
        /// Last index before the first gap.
        gap_after: usize,
    },

    /// The register has no room for a contiguous control block next to the target.
    #[error("cannot place {controls} contiguous controls next to target {target} on a {num_qubits}-qubit register")]
    InsufficientQubits {
        /// Number of control qubits requested.
        controls: usize,
        /// The target qubit.
        target: usize,
        /// Width of the register.
        num_qubits: usize,
    },

    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// I/O failure while reading configuration or writing a trace.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization failure while parsing configuration or exporting a trace.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for NcuError {
    fn from(err: serde_json::Error) -> Self {
        NcuError::Serialization(err.to_string())
    }
}

impl From<serde_yaml_ng::Error> for NcuError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        NcuError::Serialization(err.to_string())
    }
}

/// Result type for NCU operations.
pub type NcuResult<T> = Result<T, NcuError>;
