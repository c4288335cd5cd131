//! Error types for the native pipeline and its configuration.

use thiserror::Error;

/// Integer-domain violations raised by the arithmetic unit.
///
/// In-circuit, the same inputs leave the constraint system unsatisfiable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    #[error("{op}: operand does not fit in {bits} bits")]
    Overflow { op: &'static str, bits: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("stream capacity exceeded: capacity {capacity}, got {got} records")]
    CapacityExceeded { capacity: usize, got: usize },

    #[error("stream length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },
}

/// Malformed pipeline constant. Raised before any computation graph is built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{name}: invalid hex: {reason}")]
    InvalidHex { name: &'static str, reason: String },

    #[error("{name}: expected at most {max} bytes, got {got}")]
    TooLong { name: &'static str, max: usize, got: usize },

    #[error("{name}: invalid number: {reason}")]
    InvalidNumber { name: &'static str, reason: String },

    #[error("scale factor must be non-zero")]
    ZeroScale,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("output {index} does not fit in {bits} bits")]
    OutputOverflow { index: usize, bits: u16 },
}
