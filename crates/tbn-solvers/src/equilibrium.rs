//! Equilibrium solver adapter.
//!
//! The external equilibrium solver receives the polymer matrix with a
//! free-energy column and the per-monomer concentrations in Molar, and
//! returns one equilibrium concentration per polymer (also in Molar).
//! Unit conversion to and from the user's declared units happens in the
//! caller; this adapter only stages files, runs the binary with a deadline,
//! and parses concentrations in row order.

use crate::error::{SolverError, SolverResult};
use crate::lattice::SolveOptions;
use crate::subprocess::run_solver;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Staged equilibrium problem, already converted to Molar.
#[derive(Debug, Clone, PartialEq)]
pub struct EquilibriumProblem {
    /// One polymer per row, monomer multiplicities.
    pub polymers: Vec<Vec<i64>>,
    /// Free energy per polymer, same order.
    pub free_energies: Vec<f64>,
    /// Per-monomer concentrations in Molar.
    pub concentrations_molar: Vec<f64>,
    /// Temperature in °C (default 37).
    pub temperature_c: f64,
}

/// Abstract interface to an external equilibrium solver.
pub trait EquilibriumBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Equilibrium concentration per polymer, in Molar, in row order.
    fn solve(&self, problem: &EquilibriumProblem, opts: &SolveOptions) -> SolverResult<Vec<f64>>;
}

fn write_polymer_rows<W: Write>(w: &mut W, problem: &EquilibriumProblem) -> std::io::Result<()> {
    for (row, dg) in problem.polymers.iter().zip(&problem.free_energies) {
        for v in row {
            write!(w, "{v} ")?;
        }
        writeln!(w, "{dg}")?;
    }
    Ok(())
}

/// Parse whitespace-separated decimal or scientific concentrations
/// (`0.00e0` included), expecting exactly `count` values.
fn parse_concentrations(path: &Path, count: usize) -> SolverResult<Vec<f64>> {
    let reader = BufReader::new(File::open(path)?);
    let mut out = Vec::with_capacity(count);
    for line in reader.lines() {
        for tok in line?.split_whitespace() {
            let v: f64 = tok.parse().map_err(|_| {
                SolverError::MalformedOutput(format!("bad concentration `{tok}`"))
            })?;
            out.push(v);
        }
    }
    if out.len() != count {
        return Err(SolverError::MalformedOutput(format!(
            "expected {count} concentrations, got {}",
            out.len()
        )));
    }
    Ok(out)
}

// ============================================================================
// Primary backend: separate matrix and concentration files
// ============================================================================

/// Primary equilibrium backend: `<staging>/problem.polymat` (polymer rows
/// with a trailing ΔG column) plus `<staging>/problem.conc` (one Molar
/// value per monomer line); the solver writes the flat concentration list
/// to `problem.eq`.
#[derive(Debug, Clone)]
pub struct ColumnFileBackend {
    binary: PathBuf,
}

impl ColumnFileBackend {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }
}

impl EquilibriumBackend for ColumnFileBackend {
    fn name(&self) -> &'static str {
        "equilibrium"
    }

    fn solve(&self, problem: &EquilibriumProblem, opts: &SolveOptions) -> SolverResult<Vec<f64>> {
        let staging = tempfile::tempdir()?;
        let mat_path = staging.path().join("problem.polymat");
        let conc_path = staging.path().join("problem.conc");
        let out_path = staging.path().join("problem.eq");

        let mut mat = BufWriter::new(File::create(&mat_path)?);
        write_polymer_rows(&mut mat, problem)?;
        mat.flush()?;

        let mut conc = BufWriter::new(File::create(&conc_path)?);
        for c in &problem.concentrations_molar {
            writeln!(conc, "{c:e}")?;
        }
        conc.flush()?;

        run_solver(
            &self.binary,
            &[
                mat_path.display().to_string(),
                conc_path.display().to_string(),
                "--temperature".to_string(),
                problem.temperature_c.to_string(),
                "--out".to_string(),
                out_path.display().to_string(),
            ],
            staging.path(),
            opts.deadline,
        )?;

        parse_concentrations(&out_path, problem.polymers.len())
    }
}

// ============================================================================
// Alternate backend: row-augmented combined layout
// ============================================================================

/// Alternate equilibrium backend: a single combined input file (polymer
/// rows with ΔG, then a `concentrations:` line of Molar values); the
/// solver echoes the rows back with the equilibrium concentration appended
/// as the last column.
#[derive(Debug, Clone)]
pub struct RowAugmentedBackend {
    binary: PathBuf,
}

impl RowAugmentedBackend {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }

    fn parse_augmented(path: &Path, dimension: usize, count: usize) -> SolverResult<Vec<f64>> {
        let reader = BufReader::new(File::open(path)?);
        let mut out = Vec::with_capacity(count);
        for line in reader.lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let fields: Vec<&str> = trimmed.split_whitespace().collect();
            // Row layout: n multiplicities, ΔG, concentration.
            if fields.len() != dimension + 2 {
                return Err(SolverError::MalformedOutput(format!(
                    "augmented row has {} fields, expected {}",
                    fields.len(),
                    dimension + 2
                )));
            }
            let tok = fields[fields.len() - 1];
            let v: f64 = tok.parse().map_err(|_| {
                SolverError::MalformedOutput(format!("bad concentration `{tok}`"))
            })?;
            out.push(v);
        }
        if out.len() != count {
            return Err(SolverError::MalformedOutput(format!(
                "expected {count} augmented rows, got {}",
                out.len()
            )));
        }
        Ok(out)
    }
}

impl EquilibriumBackend for RowAugmentedBackend {
    fn name(&self) -> &'static str {
        "equilibrium-alt"
    }

    fn solve(&self, problem: &EquilibriumProblem, opts: &SolveOptions) -> SolverResult<Vec<f64>> {
        let staging = tempfile::tempdir()?;
        let in_path = staging.path().join("problem.dat");
        let out_path = staging.path().join("problem.eq");

        let mut w = BufWriter::new(File::create(&in_path)?);
        write_polymer_rows(&mut w, problem)?;
        write!(w, "concentrations:")?;
        for c in &problem.concentrations_molar {
            write!(w, " {c:e}")?;
        }
        writeln!(w)?;
        w.flush()?;

        run_solver(
            &self.binary,
            &[
                in_path.display().to_string(),
                "--temperature".to_string(),
                problem.temperature_c.to_string(),
                "--out".to_string(),
                out_path.display().to_string(),
            ],
            staging.path(),
            opts.deadline,
        )?;

        let dimension = problem.polymers.first().map(|p| p.len()).unwrap_or(0);
        Self::parse_augmented(&out_path, dimension, problem.polymers.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_concentrations_scientific_and_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.eq");
        std::fs::write(&path, "1.5e-7 0.00e0\n2e-9\n").unwrap();
        let v = parse_concentrations(&path, 3).unwrap();
        assert_eq!(v, vec![1.5e-7, 0.0, 2e-9]);
    }

    #[test]
    fn test_parse_concentrations_count_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.eq");
        std::fs::write(&path, "1.0 2.0\n").unwrap();
        assert!(matches!(
            parse_concentrations(&path, 3),
            Err(SolverError::MalformedOutput(_))
        ));
    }

    #[test]
    fn test_parse_augmented_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.eq");
        std::fs::write(&path, "1 1 -3 9.9e-8\n1 0 0 1.0e-9\n").unwrap();
        let v = RowAugmentedBackend::parse_augmented(&path, 2, 2).unwrap();
        assert_eq!(v, vec![9.9e-8, 1.0e-9]);
    }

    #[test]
    fn test_parse_augmented_field_count_checked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.eq");
        std::fs::write(&path, "1 1 -3\n").unwrap();
        assert!(RowAugmentedBackend::parse_augmented(&path, 2, 1).is_err());
    }
}
