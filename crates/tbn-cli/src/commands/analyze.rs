//! The primary driver: parse a TBN, compute (or reuse) its polymer basis,
//! evaluate free energies and equilibrium concentrations, and write the
//! `.tbnpolymat` artifact.

use crate::cli::SolverArgs;
use crate::commands::util::{configure_threads, parse_params, solve_options};
use std::path::{Path, PathBuf};
use tbn_algo::{
    artifact_path_for, compute_free_energies, equilibrium_concentrations, load_or_compute_basis,
};
use tbn_core::{AssocPenalty, EnergyModel, TbnResult};
use tbn_io::{emit_polys_str, parse_tbn_file, write_polymat, PolymatArtifact, PolysEntry};
use tbn_solvers::{equilibrium_backend, lattice_backend, LatticeBackendKind};
use tracing::info;

#[allow(clippy::too_many_arguments)]
pub fn handle(
    input: &Path,
    no_concentrations: bool,
    no_free_energies: bool,
    friendly: bool,
    params: &[String],
    temperature: f64,
    dg_assoc: Option<f64>,
    dh_assoc: Option<f64>,
    solver: &SolverArgs,
) -> TbnResult<()> {
    configure_threads(&solver.threads);
    let vars = parse_params(params)?;

    let file = parse_tbn_file(input, &vars)?;
    let matrix = tbn_core::MonomerMatrix::build(&file.records, file.units)?;
    matrix.check_star_limiting()?;
    info!(
        monomers = matrix.num_monomers(),
        sites = matrix.num_sites(),
        "monomer matrix built"
    );

    let kind = if solver.alt_lattice {
        LatticeBackendKind::Alternate
    } else {
        LatticeBackendKind::Primary
    };
    let backend =
        lattice_backend(kind, solver.lattice_solver.as_deref()).map_err(tbn_algo::lattice_error)?;
    let opts = solve_options(input, solver);

    let artifact_path = artifact_path_for(input);
    let source = load_or_compute_basis(&artifact_path, &matrix, backend.as_ref(), &opts)?;
    let basis = source.basis;
    println!(
        "Polymer basis: {} polymers{}",
        basis.len(),
        if source.reused { " (cached)" } else { "" }
    );

    let free_energies = if no_free_energies {
        None
    } else {
        let model = EnergyModel {
            penalty: dg_assoc.map(|dg| AssocPenalty {
                dg_assoc_37: dg,
                dh_assoc: dh_assoc.unwrap_or(dg),
            }),
            temperature_c: temperature,
        };
        Some(compute_free_energies(&matrix, &basis, &model)?)
    };

    let concentrations = match (&free_energies, no_concentrations, matrix.concentrations()) {
        (Some(energies), false, Some(_)) => {
            let eq_backend = equilibrium_backend(
                solver.alt_equilibrium,
                solver.equilibrium_solver.as_deref(),
            )
            .map_err(tbn_algo::equilibrium_error)?;
            Some(equilibrium_concentrations(
                &matrix,
                &basis,
                energies,
                eq_backend.as_ref(),
                temperature,
                &opts,
            )?)
        }
        _ => None,
    };

    let artifact = PolymatArtifact {
        matrix_hash: matrix.canonical_hash(),
        units: if concentrations.is_some() {
            matrix.units()
        } else {
            None
        },
        parameters: params
            .iter()
            .filter_map(|p| p.split_once('='))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect(),
        polymers: basis.iter().map(|row| row.to_vec()).collect(),
        free_energies,
        concentrations,
    };
    write_polymat(&artifact_path, &artifact)?;
    println!("Wrote {}", artifact_path.display());

    if friendly {
        let entries: Vec<PolysEntry<'_>> = basis
            .iter()
            .map(|polymer| PolysEntry { polymer, mu: None })
            .collect();
        let polys_path: PathBuf = input.with_extension("tbnpolys");
        std::fs::write(&polys_path, emit_polys_str(&matrix, &entries))?;
        println!("Wrote {}", polys_path.display());
    }

    Ok(())
}
