//! Shared helpers for CLI commands.

use crate::cli::SolverArgs;
use rayon::ThreadPoolBuilder;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tbn_core::{TbnError, TbnResult};
use tbn_solvers::SolveOptions;

/// Size the global rayon pool from a "auto"-or-count spec.
pub fn configure_threads(spec: &str) {
    let count = if spec.eq_ignore_ascii_case("auto") {
        num_cpus::get()
    } else {
        spec.parse().unwrap_or_else(|_| num_cpus::get())
    };
    let _ = ThreadPoolBuilder::new().num_threads(count).build_global();
}

/// Parse `k=v` parameter pairs into the `{{expr}}` variable map.
pub fn parse_params(params: &[String]) -> TbnResult<HashMap<String, f64>> {
    let mut vars = HashMap::new();
    for pair in params {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| TbnError::Parse(format!("bad parameter `{pair}`, expected k=v")))?;
        let value: f64 = value
            .trim()
            .parse()
            .map_err(|_| TbnError::Parse(format!("bad parameter value in `{pair}`")))?;
        vars.insert(key.trim().to_string(), value);
    }
    Ok(vars)
}

/// Build the shared solver options from CLI flags.
pub fn solve_options(input: &Path, solver: &SolverArgs) -> SolveOptions {
    let debug_dir = if solver.keep_solver_inputs {
        Some(
            input
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join("solver-inputs"),
        )
    } else {
        None
    };
    SolveOptions {
        deadline: solver.timeout.map(Duration::from_secs),
        debug_dir,
        debug_base: input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "tbn".to_string()),
    }
}
