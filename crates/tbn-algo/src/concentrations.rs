//! Equilibrium-concentration pipeline glue.
//!
//! Converts declared-unit monomer concentrations to Molar, stages the
//! polymer matrix and free energies for the external equilibrium solver,
//! and rescales the returned concentrations back to the declared units.

use crate::equilibrium_error;
use tbn_core::{MonomerMatrix, PolymerBasis, TbnError, TbnResult};
use tbn_solvers::{EquilibriumBackend, EquilibriumProblem, SolveOptions};
use tracing::info;

/// Compute equilibrium polymer concentrations in the declared units.
pub fn equilibrium_concentrations(
    matrix: &MonomerMatrix,
    basis: &PolymerBasis,
    free_energies: &[f64],
    backend: &dyn EquilibriumBackend,
    temperature_c: f64,
    opts: &SolveOptions,
) -> TbnResult<Vec<f64>> {
    let unit = matrix.units().ok_or_else(|| {
        TbnError::Invariant("equilibrium concentrations require a \\UNITS header".into())
    })?;
    let declared = matrix.concentrations().ok_or_else(|| {
        TbnError::Invariant("equilibrium concentrations require monomer concentrations".into())
    })?;

    let problem = EquilibriumProblem {
        polymers: basis.iter().map(|row| row.to_vec()).collect(),
        free_energies: free_energies.to_vec(),
        concentrations_molar: declared.iter().map(|&c| unit.to_molar(c)).collect(),
        temperature_c,
    };

    info!(
        backend = backend.name(),
        polymers = basis.len(),
        temperature_c,
        "solving equilibrium concentrations"
    );
    let molar = backend.solve(&problem, opts).map_err(equilibrium_error)?;
    Ok(molar.iter().map(|&c| unit.from_molar(c)).collect())
}
