//! Lattice oracle adapter.
//!
//! Converts in-memory cone descriptions into the external Hilbert-basis
//! solver's textual input, runs the solver as a subprocess, and streams its
//! output back as integer vectors. Two problem shapes are supported:
//!
//! 1. **Homogeneous**: the Hilbert basis of
//!    `{x ∈ ℤ^d_{≥0} : E·x = 0, I·x ≥ 0}`.
//! 2. **Strict slice**: the minimal inhomogeneous solutions of the same
//!    system with the extra constraint `x_i ≥ 1`, returned together with
//!    the Hilbert basis of the homogeneous recession cone.
//!
//! Everything is integer-exact; the output parse is line-streamed so the
//! working set stays a small buffer plus the growing result vector. Two
//! backends implement the same interface: the primary expects a
//! Normaliz-style problem file, the alternate a 4ti2-style file family.

use crate::error::{SolverError, SolverResult};
use crate::subprocess::run_solver;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Homogeneous cone description: equality rows `E` and inequality rows `I`
/// over `dimension` non-negative integer variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomogeneousProblem {
    pub dimension: usize,
    pub equations: Vec<Vec<i64>>,
    pub inequalities: Vec<Vec<i64>>,
}

/// Strict-slice description: the homogeneous system plus `x_i ≥ 1` for the
/// distinguished coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrictSliceProblem {
    pub base: HomogeneousProblem,
    pub strict_index: usize,
}

/// Result of a strict-slice solve: minimal inhomogeneous solutions (module
/// generators) and the recession-cone Hilbert basis, reported separately.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrictSliceSolution {
    pub module_generators: Vec<Vec<i64>>,
    pub recession_basis: Vec<Vec<i64>>,
}

/// Per-invocation options shared by all solver adapters.
#[derive(Debug, Clone, Default)]
pub struct SolveOptions {
    /// Wall-clock limit; the subprocess is killed on expiry.
    pub deadline: Option<Duration>,
    /// When set, solver input files are preserved under this directory as
    /// `<base>-<purpose>.<ext>` before the solver runs.
    pub debug_dir: Option<PathBuf>,
    /// Base name for preserved inputs (typically the input-file stem).
    pub debug_base: String,
}

/// Abstract interface to an external Hilbert-basis solver.
///
/// `Send + Sync` so independent strict-slice solves can fan out across
/// threads.
pub trait LatticeBackend: Send + Sync {
    /// Human-readable backend name, used in logs and `doctor` output.
    fn name(&self) -> &'static str;

    /// Hilbert basis of the homogeneous cone.
    fn hilbert_basis(
        &self,
        problem: &HomogeneousProblem,
        purpose: &str,
        opts: &SolveOptions,
    ) -> SolverResult<Vec<Vec<i64>>>;

    /// Minimal inhomogeneous solutions of the strict slice, with the
    /// recession-cone Hilbert basis.
    fn strict_slice(
        &self,
        problem: &StrictSliceProblem,
        purpose: &str,
        opts: &SolveOptions,
    ) -> SolverResult<StrictSliceSolution>;
}

// ============================================================================
// Shared helpers
// ============================================================================

fn write_rows<W: Write>(w: &mut W, rows: &[Vec<i64>]) -> std::io::Result<()> {
    for row in rows {
        let mut first = true;
        for v in row {
            if !first {
                write!(w, " ")?;
            }
            write!(w, "{v}")?;
            first = false;
        }
        writeln!(w)?;
    }
    Ok(())
}

/// Parse one whitespace-separated integer vector of the expected dimension.
fn parse_vector(line: &str, dimension: usize) -> SolverResult<Vec<i64>> {
    let mut out = Vec::with_capacity(dimension);
    for tok in line.split_whitespace() {
        let v: i64 = tok
            .parse()
            .map_err(|_| SolverError::MalformedOutput(format!("bad integer `{tok}`")))?;
        out.push(v);
    }
    if out.len() != dimension {
        return Err(SolverError::MalformedOutput(format!(
            "expected {dimension} entries per vector, got {}",
            out.len()
        )));
    }
    Ok(out)
}

/// Copy staged solver inputs to the debug directory, if enabled.
fn preserve_inputs(opts: &SolveOptions, purpose: &str, files: &[&Path]) -> SolverResult<()> {
    let Some(dir) = &opts.debug_dir else {
        return Ok(());
    };
    fs::create_dir_all(dir)?;
    for file in files {
        let ext = file
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("in")
            .to_string();
        let dest = dir.join(format!("{}-{}.{}", opts.debug_base, purpose, ext));
        fs::copy(file, &dest)?;
        debug!(dest = %dest.display(), "preserved solver input");
    }
    Ok(())
}

// ============================================================================
// Primary backend: Normaliz-style single problem file
// ============================================================================

/// Primary lattice backend. One `<base>.in` problem file listing the
/// ambient dimension, equation rows, inequality rows and (for slices) a
/// strict inequality; the solver writes `<base>.out` with labelled vector
/// sections.
#[derive(Debug, Clone)]
pub struct NormalizStyleBackend {
    binary: PathBuf,
}

impl NormalizStyleBackend {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }

    fn write_problem(
        &self,
        path: &Path,
        problem: &HomogeneousProblem,
        strict_index: Option<usize>,
    ) -> SolverResult<()> {
        let mut w = BufWriter::new(File::create(path)?);
        writeln!(w, "amb_space {}", problem.dimension)?;
        writeln!(w, "equations {}", problem.equations.len())?;
        write_rows(&mut w, &problem.equations)?;
        writeln!(w, "inequalities {}", problem.inequalities.len())?;
        write_rows(&mut w, &problem.inequalities)?;
        match strict_index {
            Some(i) => {
                let mut row = vec![0i64; problem.dimension];
                row[i] = 1;
                writeln!(w, "strict_inequalities 1")?;
                write_rows(&mut w, std::slice::from_ref(&row))?;
                writeln!(w, "ModuleGenerators")?;
            }
            None => writeln!(w, "HilbertBasis")?,
        }
        w.flush()?;
        Ok(())
    }

    /// Stream-parse the labelled sections of a `<base>.out` file.
    fn parse_output(
        &self,
        path: &Path,
        dimension: usize,
    ) -> SolverResult<(Vec<Vec<i64>>, Vec<Vec<i64>>, Vec<Vec<i64>>)> {
        let reader = BufReader::new(File::open(path)?);
        let mut hilbert = Vec::new();
        let mut module = Vec::new();
        let mut recession = Vec::new();
        let mut lines = reader.lines();
        while let Some(line) = lines.next() {
            let line = line?;
            let trimmed = line.trim();
            let (count_str, target): (&str, &mut Vec<Vec<i64>>) =
                if let Some(head) = trimmed.strip_suffix("Hilbert basis elements of recession cone:")
                {
                    (head, &mut recession)
                } else if let Some(head) = trimmed.strip_suffix("Hilbert basis elements:") {
                    (head, &mut hilbert)
                } else if let Some(head) = trimmed.strip_suffix("module generators:") {
                    (head, &mut module)
                } else {
                    continue;
                };
            let count: usize = count_str.trim().parse().map_err(|_| {
                SolverError::MalformedOutput(format!("bad section count in `{trimmed}`"))
            })?;
            for _ in 0..count {
                let row = lines.next().ok_or_else(|| {
                    SolverError::MalformedOutput("section ended before its declared count".into())
                })??;
                target.push(parse_vector(&row, dimension)?);
            }
        }
        Ok((hilbert, module, recession))
    }
}

impl LatticeBackend for NormalizStyleBackend {
    fn name(&self) -> &'static str {
        "normaliz"
    }

    fn hilbert_basis(
        &self,
        problem: &HomogeneousProblem,
        purpose: &str,
        opts: &SolveOptions,
    ) -> SolverResult<Vec<Vec<i64>>> {
        let staging = tempfile::tempdir()?;
        let in_path = staging.path().join("problem.in");
        self.write_problem(&in_path, problem, None)?;
        preserve_inputs(opts, purpose, &[&in_path])?;

        run_solver(
            &self.binary,
            &[in_path.display().to_string()],
            staging.path(),
            opts.deadline,
        )?;

        let out_path = staging.path().join("problem.out");
        let (hilbert, _, _) = self.parse_output(&out_path, problem.dimension)?;
        Ok(hilbert)
    }

    fn strict_slice(
        &self,
        problem: &StrictSliceProblem,
        purpose: &str,
        opts: &SolveOptions,
    ) -> SolverResult<StrictSliceSolution> {
        let staging = tempfile::tempdir()?;
        let in_path = staging.path().join("problem.in");
        self.write_problem(&in_path, &problem.base, Some(problem.strict_index))?;
        preserve_inputs(opts, purpose, &[&in_path])?;

        run_solver(
            &self.binary,
            &[in_path.display().to_string()],
            staging.path(),
            opts.deadline,
        )?;

        let out_path = staging.path().join("problem.out");
        let (_, module, recession) = self.parse_output(&out_path, problem.base.dimension)?;
        Ok(StrictSliceSolution {
            module_generators: module,
            recession_basis: recession,
        })
    }
}

// ============================================================================
// Alternate backend: 4ti2-style file family
// ============================================================================

/// Alternate lattice backend. Writes a `.mat`/`.rel`/`.sign` file family
/// (plus `.rhs` for slices) and reads `.hil` or `.zinhom`/`.zhom` outputs,
/// each with a leading `rows cols` header line.
#[derive(Debug, Clone)]
pub struct FourTiTwoStyleBackend {
    binary: PathBuf,
}

impl FourTiTwoStyleBackend {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }

    fn write_family(
        &self,
        base: &Path,
        problem: &HomogeneousProblem,
        strict_index: Option<usize>,
    ) -> SolverResult<Vec<PathBuf>> {
        let d = problem.dimension;
        let mut rows: Vec<Vec<i64>> = Vec::new();
        let mut rels: Vec<char> = Vec::new();
        for eq in &problem.equations {
            rows.push(eq.clone());
            rels.push('=');
        }
        for ineq in &problem.inequalities {
            rows.push(ineq.clone());
            rels.push('>');
        }
        if let Some(i) = strict_index {
            let mut row = vec![0i64; d];
            row[i] = 1;
            rows.push(row);
            rels.push('>');
        }

        let mat_path = base.with_extension("mat");
        let mut mat = BufWriter::new(File::create(&mat_path)?);
        writeln!(mat, "{} {}", rows.len(), d)?;
        write_rows(&mut mat, &rows)?;
        mat.flush()?;

        let rel_path = base.with_extension("rel");
        let mut rel = BufWriter::new(File::create(&rel_path)?);
        writeln!(rel, "1 {}", rels.len())?;
        let rel_row: Vec<String> = rels.iter().map(|c| c.to_string()).collect();
        writeln!(rel, "{}", rel_row.join(" "))?;
        rel.flush()?;

        let sign_path = base.with_extension("sign");
        let mut sign = BufWriter::new(File::create(&sign_path)?);
        writeln!(sign, "1 {d}")?;
        writeln!(sign, "{}", vec!["1"; d].join(" "))?;
        sign.flush()?;

        let mut files = vec![mat_path, rel_path, sign_path];
        if strict_index.is_some() {
            let rhs_path = base.with_extension("rhs");
            let mut rhs = BufWriter::new(File::create(&rhs_path)?);
            writeln!(rhs, "1 {}", rels.len())?;
            let mut vals = vec!["0".to_string(); rels.len()];
            *vals.last_mut().unwrap() = "1".to_string();
            writeln!(rhs, "{}", vals.join(" "))?;
            rhs.flush()?;
            files.push(rhs_path);
        }
        Ok(files)
    }

    /// Stream-parse a headered matrix file: `rows cols` then `rows` lines.
    fn parse_matrix_file(&self, path: &Path, dimension: usize) -> SolverResult<Vec<Vec<i64>>> {
        let reader = BufReader::new(File::open(path)?);
        let mut lines = reader.lines();
        let header = lines
            .next()
            .ok_or_else(|| SolverError::MalformedOutput("empty output file".into()))??;
        let mut parts = header.split_whitespace();
        let rows: usize = parts
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| SolverError::MalformedOutput(format!("bad header `{header}`")))?;
        let cols: usize = parts
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| SolverError::MalformedOutput(format!("bad header `{header}`")))?;
        if cols != dimension {
            return Err(SolverError::MalformedOutput(format!(
                "solver returned {cols}-dimensional vectors, expected {dimension}"
            )));
        }
        let mut out = Vec::with_capacity(rows);
        for _ in 0..rows {
            let line = lines.next().ok_or_else(|| {
                SolverError::MalformedOutput("output ended before its declared row count".into())
            })??;
            out.push(parse_vector(&line, dimension)?);
        }
        Ok(out)
    }
}

impl LatticeBackend for FourTiTwoStyleBackend {
    fn name(&self) -> &'static str {
        "4ti2"
    }

    fn hilbert_basis(
        &self,
        problem: &HomogeneousProblem,
        purpose: &str,
        opts: &SolveOptions,
    ) -> SolverResult<Vec<Vec<i64>>> {
        let staging = tempfile::tempdir()?;
        let base = staging.path().join("problem");
        let files = self.write_family(&base, problem, None)?;
        let file_refs: Vec<&Path> = files.iter().map(|p| p.as_path()).collect();
        preserve_inputs(opts, purpose, &file_refs)?;

        run_solver(
            &self.binary,
            &[base.display().to_string()],
            staging.path(),
            opts.deadline,
        )?;

        self.parse_matrix_file(&base.with_extension("hil"), problem.dimension)
    }

    fn strict_slice(
        &self,
        problem: &StrictSliceProblem,
        purpose: &str,
        opts: &SolveOptions,
    ) -> SolverResult<StrictSliceSolution> {
        let staging = tempfile::tempdir()?;
        let base = staging.path().join("problem");
        let files = self.write_family(&base, &problem.base, Some(problem.strict_index))?;
        let file_refs: Vec<&Path> = files.iter().map(|p| p.as_path()).collect();
        preserve_inputs(opts, purpose, &file_refs)?;

        run_solver(
            &self.binary,
            &[base.display().to_string()],
            staging.path(),
            opts.deadline,
        )?;

        let dimension = problem.base.dimension;
        Ok(StrictSliceSolution {
            module_generators: self
                .parse_matrix_file(&base.with_extension("zinhom"), dimension)?,
            recession_basis: self.parse_matrix_file(&base.with_extension("zhom"), dimension)?,
        })
    }
}
