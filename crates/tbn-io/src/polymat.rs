//! `.tbnpolymat` artifact reader and writer.
//!
//! The artifact stores the polymer basis with optional free-energy and
//! concentration columns, keyed by the canonical hash of the monomer
//! matrix. Header keywords (`\MATRIX-HASH:`, `\UNITS:`, `\PARAMETERS:`)
//! carry no comment prefix; `#` lines are comments. Body rows are
//! whitespace-separated: n monomer counts, then ΔG if present, then the
//! concentration if present.
//!
//! Writes stage through a temp file and rename under an advisory `.lock`
//! file; readers tolerate a missing artifact, and any corruption surfaces
//! as [`TbnError::CacheStale`] so callers recompute.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tbn_core::{ConcUnit, TbnError, TbnResult};
use tracing::warn;

/// In-memory form of a `.tbnpolymat` artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct PolymatArtifact {
    pub matrix_hash: String,
    pub units: Option<ConcUnit>,
    /// Free-form `k=v` parameters recorded with the run.
    pub parameters: Vec<(String, String)>,
    /// One polymer per row, n multiplicities each, in basis order.
    pub polymers: Vec<Vec<i64>>,
    pub free_energies: Option<Vec<f64>>,
    pub concentrations: Option<Vec<f64>>,
}

/// Read an artifact, returning `Ok(None)` when the file does not exist.
/// Structural problems are reported as `CacheStale` so the caller can
/// recompute silently.
pub fn read_polymat(path: &Path, num_monomers: usize) -> TbnResult<Option<PolymatArtifact>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let reader = BufReader::new(file);

    let mut matrix_hash: Option<String> = None;
    let mut units: Option<ConcUnit> = None;
    let mut parameters = Vec::new();
    let mut polymers: Vec<Vec<i64>> = Vec::new();
    let mut free_energies: Vec<f64> = Vec::new();
    let mut concentrations: Vec<f64> = Vec::new();
    let mut extra_columns: Option<usize> = None;

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("\\MATRIX-HASH:") {
            matrix_hash = Some(rest.trim().to_string());
            continue;
        }
        if let Some(rest) = line.strip_prefix("\\UNITS:") {
            let symbol = rest.trim();
            units = Some(ConcUnit::parse(symbol).ok_or_else(|| {
                TbnError::CacheStale(format!("unknown unit `{symbol}` in artifact"))
            })?);
            continue;
        }
        if let Some(rest) = line.strip_prefix("\\PARAMETERS:") {
            for pair in rest.split_whitespace() {
                match pair.split_once('=') {
                    Some((k, v)) => parameters.push((k.to_string(), v.to_string())),
                    None => {
                        return Err(TbnError::CacheStale(format!(
                            "bad parameter `{pair}` in artifact"
                        )))
                    }
                }
            }
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < num_monomers {
            return Err(TbnError::CacheStale(format!(
                "artifact row has {} fields, expected at least {num_monomers}",
                fields.len()
            )));
        }
        let extras = fields.len() - num_monomers;
        if extras > 2 {
            return Err(TbnError::CacheStale(format!(
                "artifact row has {extras} trailing columns, expected at most 2"
            )));
        }
        match extra_columns {
            Some(prev) if prev != extras => {
                return Err(TbnError::CacheStale(
                    "artifact rows have inconsistent column counts".into(),
                ))
            }
            None => extra_columns = Some(extras),
            _ => {}
        }

        let mut row = Vec::with_capacity(num_monomers);
        for tok in &fields[..num_monomers] {
            let v: i64 = tok.parse().map_err(|_| {
                TbnError::CacheStale(format!("bad multiplicity `{tok}` in artifact"))
            })?;
            row.push(v);
        }
        polymers.push(row);

        if extras >= 1 {
            let dg: f64 = fields[num_monomers].parse().map_err(|_| {
                TbnError::CacheStale(format!(
                    "bad free energy `{}` in artifact",
                    fields[num_monomers]
                ))
            })?;
            free_energies.push(dg);
        }
        if extras == 2 {
            let c: f64 = fields[num_monomers + 1].parse().map_err(|_| {
                TbnError::CacheStale(format!(
                    "bad concentration `{}` in artifact",
                    fields[num_monomers + 1]
                ))
            })?;
            concentrations.push(c);
        }
    }

    let matrix_hash = matrix_hash
        .ok_or_else(|| TbnError::CacheStale("artifact is missing \\MATRIX-HASH".into()))?;

    Ok(Some(PolymatArtifact {
        matrix_hash,
        units,
        parameters,
        polymers,
        free_energies: if free_energies.is_empty() {
            None
        } else {
            Some(free_energies)
        },
        concentrations: if concentrations.is_empty() {
            None
        } else {
            Some(concentrations)
        },
    }))
}

/// Advisory write lock next to the artifact. Held for the duration of a
/// write; a stale lock is stolen after a bounded wait.
struct WriteLock {
    path: PathBuf,
}

impl WriteLock {
    fn acquire(artifact_path: &Path) -> TbnResult<Self> {
        let path = lock_path(artifact_path);
        for _ in 0..50 {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(WriteLock { path }),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) => return Err(e.into()),
            }
        }
        warn!(lock = %path.display(), "stealing stale artifact lock");
        Ok(WriteLock { path })
    }
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn lock_path(artifact_path: &Path) -> PathBuf {
    let mut os = artifact_path.as_os_str().to_os_string();
    os.push(".lock");
    PathBuf::from(os)
}

/// Write an artifact atomically (temp file + rename) under the advisory
/// lock.
pub fn write_polymat(path: &Path, artifact: &PolymatArtifact) -> TbnResult<()> {
    let _lock = WriteLock::acquire(path)?;

    let mut tmp_os = path.as_os_str().to_os_string();
    tmp_os.push(".tmp");
    let tmp_path = PathBuf::from(tmp_os);

    {
        let mut w = BufWriter::new(File::create(&tmp_path)?);
        writeln!(w, "# polymer matrix artifact")?;
        writeln!(
            w,
            "# columns: monomer counts{}{}",
            if artifact.free_energies.is_some() {
                ", free energy"
            } else {
                ""
            },
            if artifact.concentrations.is_some() {
                ", concentration"
            } else {
                ""
            }
        )?;
        writeln!(w, "\\MATRIX-HASH: {}", artifact.matrix_hash)?;
        if let Some(unit) = artifact.units {
            writeln!(w, "\\UNITS: {}", unit.symbol())?;
        }
        if !artifact.parameters.is_empty() {
            let pairs: Vec<String> = artifact
                .parameters
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            writeln!(w, "\\PARAMETERS: {}", pairs.join(" "))?;
        }
        for (i, row) in artifact.polymers.iter().enumerate() {
            let mut fields: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            if let Some(dg) = &artifact.free_energies {
                let value = if dg[i] == 0.0 { 0.0 } else { dg[i] };
                fields.push(format!("{value}"));
            }
            if let Some(conc) = &artifact.concentrations {
                fields.push(format_concentration(conc[i]));
            }
            writeln!(w, "{}", fields.join(" "))?;
        }
        w.flush()?;
    }

    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Format a concentration with at most 3 significant digits, preferring
/// plain decimal notation when the scientific exponent lies in [−3, 3].
pub fn format_concentration(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    let exponent = value.abs().log10().floor() as i32;
    if (-3..=3).contains(&exponent) {
        // Round to 3 significant digits before fixing the decimal count.
        let scale = 10f64.powi(exponent - 2);
        let rounded = (value / scale).round() * scale;
        let exponent = rounded.abs().log10().floor() as i32;
        let decimals = (2 - exponent).max(0) as usize;
        format!("{rounded:.decimals$}")
    } else {
        format!("{value:.2e}")
    }
}
