//! Error types for solver subprocess communication.

use thiserror::Error;

/// Errors from launching and talking to external solver binaries.
#[derive(Debug, Error)]
pub enum SolverError {
    /// The solver binary could not be located.
    #[error("solver `{name}` is not installed; set {env} or place `{name}` on PATH")]
    NotInstalled { name: String, env: String },

    /// The solver process failed to start.
    #[error("failed to start solver process: {0}")]
    ProcessStart(#[source] std::io::Error),

    /// The solver exited with a non-zero status.
    #[error("solver process failed with exit code {code}: {stderr}")]
    ProcessFailed { code: i32, stderr: String },

    /// The solver exceeded the caller-supplied deadline.
    #[error("solver timed out after {seconds} s")]
    Timeout { seconds: u64 },

    /// The solver produced output the adapter could not parse.
    #[error("malformed solver output: {0}")]
    MalformedOutput(String),

    /// Generic I/O error while staging inputs or reading outputs.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for solver operations.
pub type SolverResult<T> = Result<T, SolverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_installed_message_names_env_var() {
        let err = SolverError::NotInstalled {
            name: "normaliz".into(),
            env: "TBNX_LATTICE_SOLVER".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("normaliz"));
        assert!(msg.contains("TBNX_LATTICE_SOLVER"));
    }
}
