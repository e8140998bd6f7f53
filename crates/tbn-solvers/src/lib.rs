//! # tbn-solvers: External Solver Adapters
//!
//! The TBN pipeline delegates two problems to external batch solvers:
//!
//! - **Lattice problems** (Hilbert bases and strict-slice minimal
//!   solutions) go to a Hilbert-basis solver, with a primary and an
//!   alternate backend behind one [`LatticeBackend`] interface.
//! - **Equilibrium concentrations** go to an equilibrium solver behind
//!   [`EquilibriumBackend`], likewise with two backends.
//!
//! Binaries are discovered from environment variables first, then the
//! per-user solver directory, then PATH; CLI flags override everything.
//! All invocations honor a caller-supplied deadline, redirect solver
//! output to files, and optionally preserve solver inputs for debugging.

use std::path::{Path, PathBuf};

pub mod equilibrium;
pub mod error;
pub mod lattice;
pub mod subprocess;

pub use equilibrium::{
    ColumnFileBackend, EquilibriumBackend, EquilibriumProblem, RowAugmentedBackend,
};
pub use error::{SolverError, SolverResult};
pub use lattice::{
    FourTiTwoStyleBackend, HomogeneousProblem, LatticeBackend, NormalizStyleBackend, SolveOptions,
    StrictSliceProblem, StrictSliceSolution,
};

/// Environment variable naming the primary lattice solver binary.
pub const LATTICE_SOLVER_ENV: &str = "TBNX_LATTICE_SOLVER";
/// Environment variable naming the alternate lattice solver binary.
pub const LATTICE_SOLVER_ALT_ENV: &str = "TBNX_LATTICE_SOLVER_ALT";
/// Environment variable naming the equilibrium solver binary.
pub const EQUILIBRIUM_SOLVER_ENV: &str = "TBNX_EQUILIBRIUM_SOLVER";

/// Default binary name of the primary lattice solver.
pub const LATTICE_BINARY: &str = "normaliz";
/// Default binary name of the alternate lattice solver.
pub const LATTICE_ALT_BINARY: &str = "zsolve";
/// Default binary name of the equilibrium solver.
pub const EQUILIBRIUM_BINARY: &str = "tbn-equilibrium";

/// Locate a solver binary.
///
/// Search order:
/// 1. Explicit override (CLI flag)
/// 2. The given environment variable
/// 3. `~/.tbnx/solvers/<binary_name>`
/// 4. System PATH
pub fn find_binary(
    binary_name: &str,
    env_var: &str,
    override_path: Option<&Path>,
) -> SolverResult<PathBuf> {
    if let Some(path) = override_path {
        return Ok(path.to_path_buf());
    }

    if let Some(path) = std::env::var_os(env_var) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    if let Some(home) = dirs::home_dir() {
        let candidate = home.join(".tbnx").join("solvers").join(binary_name);
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    if let Ok(path) = which::which(binary_name) {
        return Ok(path);
    }

    Err(SolverError::NotInstalled {
        name: binary_name.to_string(),
        env: env_var.to_string(),
    })
}

/// Which lattice backend the caller selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LatticeBackendKind {
    #[default]
    Primary,
    Alternate,
}

/// Resolve the selected lattice backend to a boxed implementation.
pub fn lattice_backend(
    kind: LatticeBackendKind,
    override_path: Option<&Path>,
) -> SolverResult<Box<dyn LatticeBackend>> {
    match kind {
        LatticeBackendKind::Primary => {
            let binary = find_binary(LATTICE_BINARY, LATTICE_SOLVER_ENV, override_path)?;
            Ok(Box::new(NormalizStyleBackend::new(binary)))
        }
        LatticeBackendKind::Alternate => {
            let binary = find_binary(LATTICE_ALT_BINARY, LATTICE_SOLVER_ALT_ENV, override_path)?;
            Ok(Box::new(FourTiTwoStyleBackend::new(binary)))
        }
    }
}

/// Resolve the equilibrium backend. `row_augmented` selects the alternate
/// tool's combined file layout.
pub fn equilibrium_backend(
    row_augmented: bool,
    override_path: Option<&Path>,
) -> SolverResult<Box<dyn EquilibriumBackend>> {
    let binary = find_binary(EQUILIBRIUM_BINARY, EQUILIBRIUM_SOLVER_ENV, override_path)?;
    if row_augmented {
        Ok(Box::new(RowAugmentedBackend::new(binary)))
    } else {
        Ok(Box::new(ColumnFileBackend::new(binary)))
    }
}
