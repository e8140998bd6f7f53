//! Subprocess management for solver binaries.
//!
//! Solvers are batch programs driven through files: the adapter stages
//! input files in a temporary directory, runs the binary with a deadline,
//! and parses its output files. Stdout and stderr are redirected to files
//! in the staging directory so large solver logs never back up a pipe.

use crate::error::{SolverError, SolverResult};
use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Poll interval while waiting for a solver to exit.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Longest stderr excerpt carried into an error message.
const STDERR_EXCERPT_LEN: usize = 2000;

/// Run a solver binary to completion inside `workdir`.
///
/// `deadline` of `None` waits indefinitely. On deadline expiry the process
/// is killed (and reaped) before `Timeout` is returned; the caller's
/// temporary staging directory is dropped afterwards, which removes any
/// solver inputs.
pub fn run_solver(
    binary: &Path,
    args: &[String],
    workdir: &Path,
    deadline: Option<Duration>,
) -> SolverResult<()> {
    let stdout = File::create(workdir.join("solver.stdout"))?;
    let stderr_path = workdir.join("solver.stderr");
    let stderr = File::create(&stderr_path)?;

    let start = Instant::now();
    let mut child = Command::new(binary)
        .args(args)
        .current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .spawn()
        .map_err(SolverError::ProcessStart)?;

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if let Some(limit) = deadline {
            if start.elapsed() >= limit {
                let _ = child.kill();
                let _ = child.wait();
                return Err(SolverError::Timeout {
                    seconds: limit.as_secs(),
                });
            }
        }
        std::thread::sleep(POLL_INTERVAL);
    };

    if !status.success() {
        let stderr_text = std::fs::read_to_string(&stderr_path).unwrap_or_default();
        let mut excerpt: String = stderr_text.chars().take(STDERR_EXCERPT_LEN).collect();
        if stderr_text.len() > excerpt.len() {
            excerpt.push_str(" ...");
        }
        return Err(SolverError::ProcessFailed {
            code: status.code().unwrap_or(-1),
            stderr: excerpt,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_true() {
        let dir = tempfile::tempdir().unwrap();
        run_solver(Path::new("/bin/true"), &[], dir.path(), None).unwrap();
    }

    #[test]
    fn test_nonzero_exit_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_solver(Path::new("/bin/false"), &[], dir.path(), None).unwrap_err();
        assert!(matches!(err, SolverError::ProcessFailed { .. }));
    }

    #[test]
    fn test_deadline_kills_process() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_solver(
            Path::new("/bin/sleep"),
            &["5".to_string()],
            dir.path(),
            Some(Duration::from_millis(100)),
        )
        .unwrap_err();
        assert!(matches!(err, SolverError::Timeout { .. }));
    }

    #[test]
    fn test_missing_binary_is_process_start() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_solver(
            Path::new("/nonexistent/solver-binary"),
            &[],
            dir.path(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, SolverError::ProcessStart(_)));
    }
}
