//! `.tbnpolys` parser and emitter.
//!
//! One polymer per paragraph; paragraphs are separated by at least one
//! empty line. Each line is `n | <monomer>` with an optional multiplicity
//! prefix defaulting to 1; the monomer is referenced by declared name or by
//! a site list (in any order), which is canonicalized to its signed vector.
//! `# μ: value` trailer lines accompany IBOT output and parse as comments.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tbn_core::{BindingSite, MonomerMatrix, TbnError, TbnResult};

/// Parse a `.tbnpolys` file from disk into polymer vectors over `matrix`.
pub fn parse_polys_file(path: &Path, matrix: &MonomerMatrix) -> TbnResult<Vec<Vec<i64>>> {
    let text = fs::read_to_string(path)?;
    parse_polys_str(&text, matrix)
}

/// Parse `.tbnpolys` content from a string.
pub fn parse_polys_str(text: &str, matrix: &MonomerMatrix) -> TbnResult<Vec<Vec<i64>>> {
    let mut polymers = Vec::new();
    let mut current: Option<Vec<i64>> = None;

    for (lineno, raw) in text.lines().enumerate() {
        let lineno = lineno + 1;
        let line = match raw.find('#') {
            Some(pos) => &raw[..pos],
            None => raw,
        };
        let line = line.trim();
        if line.is_empty() {
            if let Some(done) = current.take() {
                polymers.push(done);
            }
            continue;
        }

        let (count, item) = match line.split_once('|') {
            Some((count, item)) => {
                let count: i64 = count.trim().parse().map_err(|_| {
                    TbnError::Parse(format!("line {lineno}: bad multiplicity `{}`", count.trim()))
                })?;
                if count < 1 {
                    return Err(TbnError::Parse(format!(
                        "line {lineno}: multiplicity must be at least 1"
                    )));
                }
                (count, item.trim())
            }
            None => (1, line),
        };

        let column = resolve_monomer(item, matrix)
            .ok_or_else(|| TbnError::Parse(format!("line {lineno}: unknown monomer `{item}`")))?;

        let polymer = current.get_or_insert_with(|| vec![0i64; matrix.num_monomers()]);
        polymer[column] += count;
    }
    if let Some(done) = current.take() {
        polymers.push(done);
    }
    Ok(polymers)
}

/// Resolve a monomer reference: declared name first, then a site list
/// canonicalized to its signed vector.
fn resolve_monomer(item: &str, matrix: &MonomerMatrix) -> Option<usize> {
    if let Some(idx) = matrix.monomer_index_by_name(item) {
        return Some(idx);
    }
    let mut vector = vec![0i64; matrix.num_sites()];
    for token in item.split_whitespace() {
        let site = BindingSite::parse(token).ok()?;
        let row = matrix.site_row(&site.base)?;
        vector[row] += site.sign();
    }
    matrix.column_index_of_vector(&vector)
}

/// One emitted polymer: its vector plus an optional preformatted
/// exponent trailer.
#[derive(Debug, Clone)]
pub struct PolysEntry<'a> {
    pub polymer: &'a [i64],
    pub mu: Option<String>,
}

/// Emit `.tbnpolys` content: one paragraph per entry, `n | ` prefixes only
/// where the multiplicity exceeds 1, `# μ:` trailers where provided.
pub fn emit_polys_str(matrix: &MonomerMatrix, entries: &[PolysEntry<'_>]) -> String {
    let mut out = String::new();
    for (i, entry) in entries.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        for (j, &count) in entry.polymer.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let label = matrix.monomer_label(j);
            if count == 1 {
                let _ = writeln!(out, "{label}");
            } else {
                let _ = writeln!(out, "{count} | {label}");
            }
        }
        if let Some(mu) = &entry.mu {
            let _ = writeln!(out, "# μ: {mu}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tbn_core::MonomerRecord;

    fn matrix() -> MonomerMatrix {
        let records = vec![
            MonomerRecord {
                name: Some("A".into()),
                sites: ["a", "b"]
                    .iter()
                    .map(|t| BindingSite::parse(t).unwrap())
                    .collect(),
                concentration: None,
            },
            MonomerRecord {
                name: None,
                sites: ["a*", "b*"]
                    .iter()
                    .map(|t| BindingSite::parse(t).unwrap())
                    .collect(),
                concentration: None,
            },
        ];
        MonomerMatrix::build(&records, None).unwrap()
    }

    #[test]
    fn test_parse_by_name_and_site_list() {
        let m = matrix();
        let polys = parse_polys_str("A\nb* a*\n\n2 | A\n", &m).unwrap();
        assert_eq!(polys, vec![vec![1, 1], vec![2, 0]]);
    }

    #[test]
    fn test_site_order_canonicalized() {
        let m = matrix();
        // `b* a*` and `a* b*` are the same monomer vector.
        let polys = parse_polys_str("b* a*\n", &m).unwrap();
        assert_eq!(polys, vec![vec![0, 1]]);
    }

    #[test]
    fn test_mu_trailer_ignored_on_input() {
        let m = matrix();
        let polys = parse_polys_str("A\n# μ: 3/2\n\nA\nA\n", &m).unwrap();
        assert_eq!(polys, vec![vec![1, 0], vec![2, 0]]);
    }

    #[test]
    fn test_unknown_monomer_rejected() {
        let m = matrix();
        assert!(parse_polys_str("C\n", &m).is_err());
        assert!(parse_polys_str("c c\n", &m).is_err());
    }

    #[test]
    fn test_bad_multiplicity_rejected() {
        let m = matrix();
        assert!(parse_polys_str("0 | A\n", &m).is_err());
        assert!(parse_polys_str("x | A\n", &m).is_err());
    }

    #[test]
    fn test_emit_round_trip() {
        let m = matrix();
        let entries = vec![
            PolysEntry {
                polymer: &[2, 1],
                mu: None,
            },
            PolysEntry {
                polymer: &[1, 0],
                mu: Some("1/2".into()),
            },
        ];
        let text = emit_polys_str(&m, &entries);
        assert!(text.contains("2 | A"));
        assert!(text.contains("# μ: 1/2"));
        let parsed = parse_polys_str(&text, &m).unwrap();
        assert_eq!(parsed, vec![vec![2, 1], vec![1, 0]]);
    }
}
