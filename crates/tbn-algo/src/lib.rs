//! # tbn-algo: TBN Analysis Engines
//!
//! The algorithmic heart of the toolkit, layered over the data model in
//! `tbn-core` and the solver adapters in `tbn-solvers`:
//!
//! - [`basis`] - polymer basis engine: augment A, query the lattice
//!   oracle, project, dedup, sort; parallel free-energy evaluation
//! - [`cache`] - content-addressed reuse of `.tbnpolymat` artifacts
//! - [`concentrations`] - equilibrium bridge with exact unit conversion
//! - [`reactions`] - canonical reaction enumeration (full and
//!   bounded-target modes) with the detailed-balance pre-check
//! - [`ibot`] - the IBOT exponent scheduler and balanced-concentration
//!   synthesis
//! - [`filter`] - constraint-driven queries over polymer × concentration
//!   records
//!
//! The engines are deterministic batch computations: identical inputs
//! produce identical output bytes, with parallelism confined to
//! embarrassingly parallel stages followed by stable sorts.

use tbn_core::TbnError;
use tbn_solvers::SolverError;

pub mod basis;
pub mod cache;
pub mod concentrations;
pub mod filter;
pub mod ibot;
pub mod reactions;
pub mod test_utils;

pub use basis::{augment, compute_free_energies, compute_polymer_basis, AugmentedMatrix};
pub use cache::{artifact_path_for, load_or_compute_basis, BasisSource};
pub use concentrations::equilibrium_concentrations;
pub use filter::{apply_filter, FilterLimits, FilterMatch};
pub use ibot::{
    ordered_assignments, run_ibot, synthesize_concentrations, Exponent, IbotOutcome,
};
pub use reactions::{
    bounded_target_reactions, check_detailed_balance, enumerate_canonical_reactions,
    resolve_on_target, CanonicalReaction, OnTargetSet,
};

/// Map a lattice-solver failure onto the pipeline error taxonomy.
pub fn lattice_error(err: SolverError) -> TbnError {
    match err {
        SolverError::NotInstalled { name, env } => TbnError::MissingSolver {
            name,
            env_hint: env,
        },
        SolverError::Timeout { seconds } => TbnError::LatticeSolverTimeout { seconds },
        other => TbnError::LatticeSolver(other.to_string()),
    }
}

/// Map an equilibrium-solver failure onto the pipeline error taxonomy.
pub fn equilibrium_error(err: SolverError) -> TbnError {
    match err {
        SolverError::NotInstalled { name, env } => TbnError::MissingSolver {
            name,
            env_hint: env,
        },
        other => TbnError::EquilibriumSolver(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lattice_error_mapping() {
        let err = lattice_error(SolverError::Timeout { seconds: 30 });
        assert!(matches!(
            err,
            TbnError::LatticeSolverTimeout { seconds: 30 }
        ));

        let err = lattice_error(SolverError::NotInstalled {
            name: "normaliz".into(),
            env: "TBNX_LATTICE_SOLVER".into(),
        });
        assert!(matches!(err, TbnError::MissingSolver { .. }));
    }

    #[test]
    fn test_equilibrium_error_mapping() {
        let err = equilibrium_error(SolverError::Timeout { seconds: 5 });
        assert!(matches!(err, TbnError::EquilibriumSolver(_)));
    }
}
