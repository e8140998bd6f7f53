//! The IBOT driver: canonical reactions plus exponent assignment, with
//! optional bounded-target mode and balanced-TBN generation.

use crate::cli::SolverArgs;
use crate::commands::util::{configure_threads, parse_params, solve_options};
use std::path::{Path, PathBuf};
use tbn_algo::{
    artifact_path_for, bounded_target_reactions, enumerate_canonical_reactions,
    load_or_compute_basis, ordered_assignments, resolve_on_target, run_ibot,
    synthesize_concentrations,
};
use tbn_core::{BindingSite, ConcUnit, MonomerRecord, TbnError, TbnResult};
use tbn_io::{
    emit_polys_str, emit_tbn_str, parse_polys_file, parse_tbn_file, write_polymat,
    PolymatArtifact, PolysEntry,
};
use tbn_solvers::{lattice_backend, LatticeBackendKind};
use tracing::{info, warn};

#[allow(clippy::too_many_arguments)]
pub fn handle(
    input: &Path,
    on_target_path: &Path,
    bounded: Option<&Path>,
    generate_tbn: Option<&str>,
    out: Option<&Path>,
    params: &[String],
    solver: &SolverArgs,
) -> TbnResult<()> {
    configure_threads(&solver.threads);
    let vars = parse_params(params)?;

    let file = parse_tbn_file(input, &vars)?;
    let matrix = tbn_core::MonomerMatrix::build(&file.records, file.units)?;
    matrix.check_star_limiting()?;

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
    if !source.reused {
        // Persist the basis so later runs (and the filter driver) can
        // reuse it without the lattice solver.
        let artifact = PolymatArtifact {
            matrix_hash: matrix.canonical_hash(),
            units: None,
            parameters: Vec::new(),
            polymers: basis.iter().map(|row| row.to_vec()).collect(),
            free_energies: None,
            concentrations: None,
        };
        write_polymat(&artifact_path, &artifact)?;
    }

    let on_target_polymers = parse_polys_file(on_target_path, &matrix)?;
    let on_target = resolve_on_target(&matrix, &basis, &on_target_polymers)?;
    info!(
        polymers = basis.len(),
        on_target = on_target.indices.len(),
        "IBOT setup"
    );

    let bounded_mode = bounded.is_some();
    let reactions = match bounded {
        Some(bounded_path) => {
            let undesired_polymers = parse_polys_file(bounded_path, &matrix)?;
            let mut undesired = Vec::with_capacity(undesired_polymers.len());
            for x in &undesired_polymers {
                let idx = basis.index_of(x).ok_or_else(|| {
                    TbnError::Invariant(format!(
                        "bounded-mode polymer {} is not in the polymer basis",
                        tbn_core::render_polymer(&matrix, x)
                    ))
                })?;
                undesired.push(idx);
            }
            bounded_target_reactions(&basis, &on_target, &undesired, backend.as_ref(), &opts)?
        }
        None => {
            enumerate_canonical_reactions(&matrix, &basis, &on_target, backend.as_ref(), &opts)?
        }
    };
    println!("Canonical reactions: {}", reactions.len());

    let outcome = run_ibot(&reactions, &on_target, basis.len())?;
    for &p in &outcome.unreachable {
        warn!(
            polymer = %tbn_core::render_polymer(&matrix, basis.polymer(p)),
            "unreachable from on-target polymers by canonical reactions; excluded from output"
        );
    }
    if bounded_mode {
        println!("Note: bounded-target exponents are lower bounds on μ");
    }

    let ordered = ordered_assignments(&outcome, &on_target);
    let entries: Vec<PolysEntry<'_>> = ordered
        .iter()
        .map(|&(p, mu)| PolysEntry {
            polymer: basis.polymer(p),
            mu: Some(mu.to_string()),
        })
        .collect();
    let out_path: PathBuf = match out {
        Some(path) => path.to_path_buf(),
        None => ibot_output_path(input),
    };
    std::fs::write(&out_path, emit_polys_str(&matrix, &entries))?;
    println!(
        "Assigned μ to {} polymers ({} iterations); wrote {}",
        ordered.len(),
        outcome.iterations,
        out_path.display()
    );

    if let Some(spec) = generate_tbn {
        let (target, unit) = parse_generate_spec(spec)?;
        let concentrations = synthesize_concentrations(&basis, &ordered, target, unit);
        let records = balanced_records(&matrix, &concentrations);
        let tbn_path = balanced_output_path(input);
        std::fs::write(&tbn_path, emit_tbn_str(Some(unit), &records))?;
        println!("Wrote {}", tbn_path.display());
    }

    Ok(())
}

fn ibot_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "tbn".to_string());
    input.with_file_name(format!("{stem}-ibot.tbnpolys"))
}

fn balanced_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "tbn".to_string());
    input.with_file_name(format!("{stem}-balanced.tbn"))
}

/// Parse a `--generate-tbn` spec such as `100,nM`.
fn parse_generate_spec(spec: &str) -> TbnResult<(f64, ConcUnit)> {
    let (conc, unit) = spec.split_once(',').ok_or_else(|| {
        TbnError::Parse(format!("bad --generate-tbn spec `{spec}`, expected CONC,UNIT"))
    })?;
    let conc: f64 = conc
        .trim()
        .parse()
        .map_err(|_| TbnError::Parse(format!("bad concentration in `{spec}`")))?;
    let unit = ConcUnit::parse(unit.trim())
        .ok_or_else(|| TbnError::Parse(format!("bad unit in `{spec}`")))?;
    Ok((conc, unit))
}

/// Rebuild monomer records from the matrix with synthesized
/// concentrations attached.
fn balanced_records(matrix: &tbn_core::MonomerMatrix, concentrations: &[f64]) -> Vec<MonomerRecord> {
    (0..matrix.num_monomers())
        .map(|j| {
            let mut sites = Vec::new();
            for (i, &v) in matrix.column(j).iter().enumerate() {
                let (count, star) = if v >= 0 { (v, false) } else { (-v, true) };
                for _ in 0..count {
                    sites.push(BindingSite {
                        base: matrix.site_names()[i].clone(),
                        star,
                    });
                }
            }
            MonomerRecord {
                name: matrix.monomer_name(j).map(String::from),
                sites,
                concentration: Some(concentrations[j]),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generate_spec() {
        let (conc, unit) = parse_generate_spec("100,nM").unwrap();
        assert_eq!(conc, 100.0);
        assert_eq!(unit, ConcUnit::Nanomolar);
        assert!(parse_generate_spec("100").is_err());
        assert!(parse_generate_spec("x,nM").is_err());
        assert!(parse_generate_spec("1,kM").is_err());
    }

    #[test]
    fn test_output_paths() {
        assert_eq!(
            ibot_output_path(Path::new("/w/case.tbn")),
            PathBuf::from("/w/case-ibot.tbnpolys")
        );
        assert_eq!(
            balanced_output_path(Path::new("/w/case.tbn")),
            PathBuf::from("/w/case-balanced.tbn")
        );
    }
}
