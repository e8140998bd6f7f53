//! Read-only queries over an existing polymer-matrix artifact.

use crate::commands::util::parse_params;
use std::path::Path;
use tbn_algo::{apply_filter, artifact_path_for, FilterLimits};
use tbn_core::{render_polymer, TbnError, TbnResult};
use tbn_io::{format_concentration, parse_filter_file, parse_tbn_file, read_polymat};

pub fn handle(
    input: &Path,
    spec: &Path,
    params: &[String],
    max_count: Option<usize>,
    min_concentration: Option<f64>,
    min_percent: Option<f64>,
) -> TbnResult<()> {
    let vars = parse_params(params)?;
    let file = parse_tbn_file(input, &vars)?;
    let matrix = tbn_core::MonomerMatrix::build(&file.records, file.units)?;

    let artifact_path = artifact_path_for(input);
    let artifact = read_polymat(&artifact_path, matrix.num_monomers())?.ok_or_else(|| {
        TbnError::Invariant(format!(
            "no artifact at {}; run `tbnx analyze` first",
            artifact_path.display()
        ))
    })?;
    if artifact.matrix_hash != matrix.canonical_hash() {
        return Err(TbnError::CacheStale(format!(
            "{} was built from a different monomer matrix; re-run `tbnx analyze`",
            artifact_path.display()
        )));
    }

    let constraints = parse_filter_file(spec)?;
    let limits = FilterLimits {
        max_count,
        min_concentration,
        min_percent,
    };
    let matches = apply_filter(&matrix, &artifact, &constraints, &limits)?;

    let unit = artifact
        .units
        .map(|u| format!(" {u}"))
        .unwrap_or_default();
    for m in &matches {
        println!(
            "{}{}  {}",
            format_concentration(m.concentration),
            unit,
            render_polymer(&matrix, &m.polymer)
        );
    }
    println!("{} matching polymers", matches.len());
    Ok(())
}
