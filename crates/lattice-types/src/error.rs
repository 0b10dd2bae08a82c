// ─────────────────────────────────────────────────────────────────────
// Trigger Lattice — Error Hierarchy
// ─────────────────────────────────────────────────────────────────────

use thiserror::Error;

/// Root error type for trigger lattice failures.
///
/// Graph mutation never produces one of these: unknown node names are
/// answered with `false` or `None`. Errors are reserved for bad caller
/// input (enum strings, configuration) and malformed persisted state.
#[derive(Error, Debug)]
pub enum LatticeError {
    /// Unknown node kind string.
    #[error("invalid node kind: {0}")]
    InvalidKind(String),

    /// Unknown propagation mode string.
    #[error("invalid propagation mode: {0}")]
    InvalidMode(String),

    /// Unknown named pattern shortcut.
    #[error("unknown pattern: {0}")]
    UnknownPattern(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Persisted state is malformed or missing mandatory fields.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// File I/O around persistence failed.
    #[error("io error: {0}")]
    Io(String),
}

pub type LatticeResult<T> = Result<T, LatticeError>;
