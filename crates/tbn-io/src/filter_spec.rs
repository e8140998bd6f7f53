//! Filter-specification parser.
//!
//! A filter file holds one constraint per line; lines combine with logical
//! OR. `CONTAINS m₁ m₂ …` requires each listed monomer with at least the
//! listed multiplicity (repetition raises the bound); `EXACTLY m₁ m₂ …`
//! requires the polymer to equal the listed multiset exactly. `#` starts a
//! comment.

use std::fs;
use std::path::Path;
use tbn_core::{TbnError, TbnResult};

/// One constraint line, with monomer names as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterConstraint {
    Contains(Vec<String>),
    Exactly(Vec<String>),
}

/// Parse a filter file from disk.
pub fn parse_filter_file(path: &Path) -> TbnResult<Vec<FilterConstraint>> {
    let text = fs::read_to_string(path)?;
    parse_filter_str(&text)
}

/// Parse filter content from a string.
pub fn parse_filter_str(text: &str) -> TbnResult<Vec<FilterConstraint>> {
    let mut constraints = Vec::new();
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

        let mut tokens = line.split_whitespace();
        let keyword = tokens.next().unwrap_or_default();
        let names: Vec<String> = tokens.map(String::from).collect();
        if names.is_empty() {
            return Err(TbnError::Parse(format!(
                "line {lineno}: `{keyword}` lists no monomers"
            )));
        }
        match keyword {
            "CONTAINS" => constraints.push(FilterConstraint::Contains(names)),
            "EXACTLY" => constraints.push(FilterConstraint::Exactly(names)),
            other => {
                return Err(TbnError::Parse(format!(
                    "line {lineno}: unknown filter keyword `{other}`"
                )))
            }
        }
    }
    Ok(constraints)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_constraints() {
        let spec = "# header\nCONTAINS A A B\nEXACTLY B\n";
        let parsed = parse_filter_str(spec).unwrap();
        assert_eq!(
            parsed,
            vec![
                FilterConstraint::Contains(vec!["A".into(), "A".into(), "B".into()]),
                FilterConstraint::Exactly(vec!["B".into()]),
            ]
        );
    }

    #[test]
    fn test_unknown_keyword_rejected() {
        assert!(parse_filter_str("HAS A\n").is_err());
    }

    #[test]
    fn test_empty_list_rejected() {
        assert!(parse_filter_str("CONTAINS\n").is_err());
    }

    #[test]
    fn test_empty_spec_ok() {
        assert!(parse_filter_str("# nothing\n\n").unwrap().is_empty());
    }
}
