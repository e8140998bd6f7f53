//! `.tbn` file parser and emitter.
//!
//! UTF-8 text, `#` starts a comment. An optional `\UNITS: {nM|pM|uM|mM|M}`
//! header activates concentration mode. Monomer lines come in three
//! shapes:
//!
//! ```text
//! name: site site ...[, conc]
//! site site ... > name[, conc]
//! site site ...[, conc]
//! ```
//!
//! The concentration field may contain `{{expr}}` tokens substituted from
//! a user-supplied variable map before the field is parsed as a number.

use crate::expr::substitute;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tbn_core::{validate_name, BindingSite, ConcUnit, MonomerRecord, TbnError, TbnResult};

/// A parsed `.tbn` file: declared units and monomer records in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct TbnFile {
    pub units: Option<ConcUnit>,
    pub records: Vec<MonomerRecord>,
}

/// Parse a `.tbn` file from disk.
pub fn parse_tbn_file(path: &Path, vars: &HashMap<String, f64>) -> TbnResult<TbnFile> {
    let text = fs::read_to_string(path)?;
    parse_tbn_str(&text, vars)
}

/// Parse `.tbn` content from a string.
pub fn parse_tbn_str(text: &str, vars: &HashMap<String, f64>) -> TbnResult<TbnFile> {
    let mut units: Option<ConcUnit> = None;
    let mut records = Vec::new();

    for (lineno, raw) in text.lines().enumerate() {
        let lineno = lineno + 1;
        let line = match raw.find('#') {
            Some(pos) => &raw[..pos],
            None => raw,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix("\\UNITS:") {
            let symbol = rest.trim();
            let unit = ConcUnit::parse(symbol).ok_or_else(|| {
                TbnError::Parse(format!("line {lineno}: unknown unit `{symbol}`"))
            })?;
            if units.replace(unit).is_some() {
                return Err(TbnError::Parse(format!(
                    "line {lineno}: duplicate \\UNITS header"
                )));
            }
            continue;
        }

        let record = parse_monomer_line(line, lineno, units, vars)?;
        records.push(record);
    }

    Ok(TbnFile { units, records })
}

fn parse_monomer_line(
    line: &str,
    lineno: usize,
    units: Option<ConcUnit>,
    vars: &HashMap<String, f64>,
) -> TbnResult<MonomerRecord> {
    // The concentration field follows the first comma; names and sites
    // cannot contain one.
    let (head, conc_field) = match line.split_once(',') {
        Some((head, conc)) => (head.trim(), Some(conc.trim())),
        None => (line, None),
    };

    let concentration = match conc_field {
        Some(field) => {
            if units.is_none() {
                return Err(TbnError::Parse(format!(
                    "line {lineno}: concentration given without a \\UNITS header"
                )));
            }
            let substituted = substitute(field, vars)
                .map_err(|e| TbnError::Parse(format!("line {lineno}: {e}")))?;
            let value: f64 = substituted.trim().parse().map_err(|_| {
                TbnError::Parse(format!(
                    "line {lineno}: bad concentration `{substituted}`"
                ))
            })?;
            Some(value)
        }
        None => None,
    };

    // `name: sites`, `sites > name`, or bare `sites`.
    let (name, sites_text) = if let Some((name, sites)) = head.split_once(':') {
        (Some(name.trim()), sites.trim())
    } else if let Some((sites, name)) = head.split_once('>') {
        (Some(name.trim()), sites.trim())
    } else {
        (None, head)
    };

    if let Some(n) = name {
        validate_name(n).map_err(|e| TbnError::Parse(format!("line {lineno}: {e}")))?;
    }

    let mut sites = Vec::new();
    for token in sites_text.split_whitespace() {
        let site = BindingSite::parse(token)
            .map_err(|e| TbnError::Parse(format!("line {lineno}: {e}")))?;
        sites.push(site);
    }
    if sites.is_empty() {
        return Err(TbnError::Parse(format!(
            "line {lineno}: monomer has no binding sites"
        )));
    }

    Ok(MonomerRecord {
        name: name.map(String::from),
        sites,
        concentration,
    })
}

/// Emit a `.tbn` file body for the given monomer records.
///
/// Used for round-trips and for `--generate-tbn` output; concentrations
/// are written with full shortest-round-trip precision.
pub fn emit_tbn_str(units: Option<ConcUnit>, records: &[MonomerRecord]) -> String {
    let mut out = String::new();
    if let Some(unit) = units {
        out.push_str(&format!("\\UNITS: {}\n", unit.symbol()));
    }
    for rec in records {
        match &rec.name {
            Some(name) => out.push_str(&format!("{name}: {}", rec.site_list())),
            None => out.push_str(&rec.site_list()),
        }
        if let Some(conc) = rec.concentration {
            out.push_str(&format!(", {conc}"));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tbn_core::MonomerMatrix;

    fn no_vars() -> HashMap<String, f64> {
        HashMap::new()
    }

    #[test]
    fn test_parse_minimal() {
        let file = parse_tbn_str("A: a b c\nB: a* b* c*\n", &no_vars()).unwrap();
        assert_eq!(file.units, None);
        assert_eq!(file.records.len(), 2);
        assert_eq!(file.records[0].name.as_deref(), Some("A"));
        assert_eq!(file.records[1].sites.len(), 3);
    }

    #[test]
    fn test_parse_arrow_name_form() {
        let file = parse_tbn_str("a b* > gate\n", &no_vars()).unwrap();
        assert_eq!(file.records[0].name.as_deref(), Some("gate"));
        assert_eq!(file.records[0].site_list(), "a b*");
    }

    #[test]
    fn test_parse_unnamed_with_comment() {
        let file = parse_tbn_str("# header\na a* b # trailing\n", &no_vars()).unwrap();
        assert_eq!(file.records.len(), 1);
        assert_eq!(file.records[0].name, None);
        assert_eq!(file.records[0].sites.len(), 3);
    }

    #[test]
    fn test_units_and_concentrations() {
        let file = parse_tbn_str("\\UNITS: nM\nA: a, 20\nB: a*, 15\n", &no_vars()).unwrap();
        assert_eq!(file.units, Some(ConcUnit::Nanomolar));
        assert_eq!(file.records[0].concentration, Some(20.0));
        assert_eq!(file.records[1].concentration, Some(15.0));
    }

    #[test]
    fn test_parametrized_concentrations() {
        // x = 20, y = 10: m1 gets 20 nM, m2 gets 15 nM.
        let vars = HashMap::from([("x".to_string(), 20.0), ("y".to_string(), 10.0)]);
        let file =
            parse_tbn_str("\\UNITS: nM\nm1: a, {{x}}\nm2: a*, {{y+5}}\n", &vars).unwrap();
        assert_eq!(file.records[0].concentration, Some(20.0));
        assert_eq!(file.records[1].concentration, Some(15.0));
    }

    #[test]
    fn test_concentration_without_units_rejected() {
        let err = parse_tbn_str("A: a, 20\n", &no_vars()).unwrap_err();
        assert!(matches!(err, TbnError::Parse(_)));
    }

    #[test]
    fn test_duplicate_units_rejected() {
        let err = parse_tbn_str("\\UNITS: nM\n\\UNITS: mM\n", &no_vars()).unwrap_err();
        assert!(matches!(err, TbnError::Parse(_)));
    }

    #[test]
    fn test_bad_unit_rejected() {
        assert!(parse_tbn_str("\\UNITS: kM\n", &no_vars()).is_err());
    }

    #[test]
    fn test_empty_monomer_rejected() {
        assert!(parse_tbn_str("A:\n", &no_vars()).is_err());
    }

    #[test]
    fn test_round_trip_preserves_vectors_and_concentrations() {
        let text = "\\UNITS: nM\nA: a b, 3\nb a > A, 2\nc c*, 1\n";
        let file = parse_tbn_str(text, &no_vars()).unwrap();
        let m1 = MonomerMatrix::build(&file.records, file.units).unwrap();

        let emitted = emit_tbn_str(file.units, &file.records);
        let file2 = parse_tbn_str(&emitted, &no_vars()).unwrap();
        let m2 = MonomerMatrix::build(&file2.records, file2.units).unwrap();

        assert_eq!(m1.canonical_hash(), m2.canonical_hash());
        assert_eq!(m1.concentrations(), m2.concentrations());
        // A + unnamed duplicate merged with summed concentration.
        assert_eq!(m1.concentrations().unwrap()[0], 5.0);
    }
}
