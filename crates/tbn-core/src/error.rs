//! Unified error types for the TBN toolkit
//!
//! This module provides a common error type [`TbnError`] that can represent
//! errors from any part of the pipeline. Domain-specific error types (e.g.
//! the solver adapters') convert into `TbnError` at API boundaries, and the
//! CLI maps each kind to a distinct process exit code.

use thiserror::Error;

/// Unified error type for all TBN operations.
///
/// The pipeline is a batch computation: errors bubble up to the driver,
/// which prints a single user-facing message tagged with the originating
/// component and exits with a per-kind code.
#[derive(Error, Debug)]
pub enum TbnError {
    /// I/O errors (file access, artifact staging, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed input text (`.tbn`, `.tbnpolys`, filter specifications)
    #[error("parse error: {0}")]
    Parse(String),

    /// A structural invariant of the TBN model was violated
    /// (star-limiting failure, negative merged concentration,
    /// monomer-name / site-name collision, mismatched on-target polymer)
    #[error("invariant violation: {0}")]
    Invariant(String),

    /// A required external solver binary could not be located
    #[error("solver `{name}` not found; set {env_hint} or install it on PATH")]
    MissingSolver { name: String, env_hint: String },

    /// The lattice solver exited non-zero or produced malformed output
    #[error("lattice solver failed: {0}")]
    LatticeSolver(String),

    /// The lattice solver exceeded the caller-supplied deadline
    #[error("lattice solver timed out after {seconds} s")]
    LatticeSolverTimeout { seconds: u64 },

    /// The equilibrium solver exited non-zero or produced malformed output
    #[error("equilibrium solver failed: {0}")]
    EquilibriumSolver(String),

    /// The polymer-matrix artifact could not be reused (non-fatal: callers
    /// recompute silently and log)
    #[error("stale polymer-matrix artifact: {0}")]
    CacheStale(String),

    /// An irreducible canonical reaction supported entirely on-target is
    /// not balanced (total reactant multiplicity != total product
    /// multiplicity)
    #[error("detailed balance violated by on-target reaction: {rendered}")]
    OnTargetImbalance { rendered: String },

    /// Integer overflow detected in an exact accumulator
    #[error("integer overflow in {0}")]
    ArithmeticOverflow(&'static str),
}

/// Convenience type alias for Results using TbnError.
pub type TbnResult<T> = Result<T, TbnError>;

impl TbnError {
    /// Component tag printed alongside the user-facing message.
    pub fn component(&self) -> &'static str {
        match self {
            TbnError::Io(_) => "io",
            TbnError::Parse(_) => "parser",
            TbnError::Invariant(_) => "model",
            TbnError::MissingSolver { .. } => "config",
            TbnError::LatticeSolver(_) | TbnError::LatticeSolverTimeout { .. } => "lattice",
            TbnError::EquilibriumSolver(_) => "equilibrium",
            TbnError::CacheStale(_) => "cache",
            TbnError::OnTargetImbalance { .. } => "reactions",
            TbnError::ArithmeticOverflow(_) => "arith",
        }
    }

    /// Distinct non-zero process exit code per error kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            TbnError::Parse(_) => 2,
            TbnError::Invariant(_) => 3,
            TbnError::MissingSolver { .. } => 4,
            TbnError::LatticeSolver(_) => 5,
            TbnError::LatticeSolverTimeout { .. } => 6,
            TbnError::EquilibriumSolver(_) => 7,
            TbnError::OnTargetImbalance { .. } => 8,
            TbnError::ArithmeticOverflow(_) => 9,
            TbnError::Io(_) => 10,
            TbnError::CacheStale(_) => 11,
        }
    }
}

// Conversion from anyhow::Error for driver-level glue
impl From<anyhow::Error> for TbnError {
    fn from(err: anyhow::Error) -> Self {
        TbnError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TbnError::Invariant("star-limiting failed on site `a`".into());
        assert!(err.to_string().contains("invariant violation"));
        assert!(err.to_string().contains("star-limiting"));
    }

    #[test]
    fn test_exit_codes_distinct() {
        let errs = vec![
            TbnError::Parse("x".into()),
            TbnError::Invariant("x".into()),
            TbnError::MissingSolver {
                name: "normaliz".into(),
                env_hint: "TBNX_LATTICE_SOLVER".into(),
            },
            TbnError::LatticeSolver("x".into()),
            TbnError::LatticeSolverTimeout { seconds: 5 },
            TbnError::EquilibriumSolver("x".into()),
            TbnError::OnTargetImbalance {
                rendered: "x".into(),
            },
            TbnError::ArithmeticOverflow("bond accumulator"),
            TbnError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")),
            TbnError::CacheStale("x".into()),
        ];
        let mut codes: Vec<i32> = errs.iter().map(|e| e.exit_code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errs.len());
        assert!(codes.iter().all(|&c| c != 0));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TbnError = io_err.into();
        assert!(matches!(err, TbnError::Io(_)));
        assert_eq!(err.component(), "io");
    }
}
