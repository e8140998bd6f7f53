//! Filter/query engine over polymer × concentration records.
//!
//! Constraint lines OR together; each line is either a multiplicity lower
//! bound (`CONTAINS`, with repetition raising the bound) or an exact
//! monomer-vector match (`EXACTLY`). Matches are returned in globally
//! descending concentration order and truncated by a count cap, a
//! minimum-concentration floor, and a percent-of-total floor, all applied
//! together.

use tbn_core::{MonomerMatrix, TbnError, TbnResult};
use tbn_io::{FilterConstraint, PolymatArtifact};

/// Truncation limits applied after constraint matching.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterLimits {
    pub max_count: Option<usize>,
    pub min_concentration: Option<f64>,
    pub min_percent: Option<f64>,
}

/// One matching record.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterMatch {
    /// Row index in the artifact.
    pub index: usize,
    pub polymer: Vec<i64>,
    pub concentration: f64,
}

/// A constraint with names resolved to monomer multiplicity vectors.
enum ResolvedConstraint {
    /// Componentwise lower bound.
    Contains(Vec<i64>),
    /// Exact vector equality.
    Exactly(Vec<i64>),
}

fn resolve(
    constraint: &FilterConstraint,
    matrix: &MonomerMatrix,
) -> TbnResult<ResolvedConstraint> {
    let names = match constraint {
        FilterConstraint::Contains(names) | FilterConstraint::Exactly(names) => names,
    };
    let mut vector = vec![0i64; matrix.num_monomers()];
    for name in names {
        let idx = matrix.monomer_index_by_name(name).ok_or_else(|| {
            TbnError::Parse(format!("filter references unknown monomer `{name}`"))
        })?;
        vector[idx] += 1;
    }
    Ok(match constraint {
        FilterConstraint::Contains(_) => ResolvedConstraint::Contains(vector),
        FilterConstraint::Exactly(_) => ResolvedConstraint::Exactly(vector),
    })
}

impl ResolvedConstraint {
    fn matches(&self, polymer: &[i64]) -> bool {
        match self {
            ResolvedConstraint::Contains(bound) => {
                polymer.iter().zip(bound).all(|(&have, &need)| have >= need)
            }
            ResolvedConstraint::Exactly(exact) => polymer == exact.as_slice(),
        }
    }
}

/// Apply the filter to an artifact.
///
/// The artifact must carry concentrations; the percent floor is measured
/// against the total concentration over all polymers (not just matches).
pub fn apply_filter(
    matrix: &MonomerMatrix,
    artifact: &PolymatArtifact,
    constraints: &[FilterConstraint],
    limits: &FilterLimits,
) -> TbnResult<Vec<FilterMatch>> {
    let concentrations = artifact.concentrations.as_ref().ok_or_else(|| {
        TbnError::Invariant("polymer-matrix artifact carries no concentrations".into())
    })?;

    let resolved: Vec<ResolvedConstraint> = constraints
        .iter()
        .map(|c| resolve(c, matrix))
        .collect::<TbnResult<_>>()?;

    let total: f64 = concentrations.iter().sum();

    let mut matches: Vec<FilterMatch> = artifact
        .polymers
        .iter()
        .zip(concentrations)
        .enumerate()
        .filter(|(_, (polymer, _))| {
            resolved.is_empty() || resolved.iter().any(|c| c.matches(polymer))
        })
        .map(|(index, (polymer, &concentration))| FilterMatch {
            index,
            polymer: polymer.clone(),
            concentration,
        })
        .collect();

    matches.sort_by(|a, b| {
        b.concentration
            .total_cmp(&a.concentration)
            .then(a.index.cmp(&b.index))
    });

    matches.retain(|m| {
        if let Some(floor) = limits.min_concentration {
            if m.concentration < floor {
                return false;
            }
        }
        if let Some(percent) = limits.min_percent {
            if total <= 0.0 || m.concentration / total * 100.0 < percent {
                return false;
            }
        }
        true
    });
    if let Some(cap) = limits.max_count {
        matches.truncate(cap);
    }
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::matrix_from;
    use tbn_io::parse_filter_str;

    fn artifact() -> PolymatArtifact {
        PolymatArtifact {
            matrix_hash: "h".into(),
            units: None,
            parameters: vec![],
            polymers: vec![vec![1, 0], vec![0, 1], vec![1, 1], vec![2, 1]],
            free_energies: None,
            concentrations: Some(vec![10.0, 40.0, 30.0, 20.0]),
        }
    }

    fn matrix() -> MonomerMatrix {
        matrix_from(&[("A", "a b c"), ("B", "a* b* c*")])
    }

    #[test]
    fn test_contains_with_repetition() {
        let constraints = parse_filter_str("CONTAINS A A\n").unwrap();
        let matches = apply_filter(
            &matrix(),
            &artifact(),
            &constraints,
            &FilterLimits::default(),
        )
        .unwrap();
        // Only [2, 1] has at least two A.
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].polymer, vec![2, 1]);
    }

    #[test]
    fn test_or_combination_and_order() {
        let constraints = parse_filter_str("EXACTLY A\nCONTAINS B\n").unwrap();
        let matches = apply_filter(
            &matrix(),
            &artifact(),
            &constraints,
            &FilterLimits::default(),
        )
        .unwrap();
        // {B}=40, {A+B}=30, {2A+B}=20, {A}=10: descending concentration.
        let concs: Vec<f64> = matches.iter().map(|m| m.concentration).collect();
        assert_eq!(concs, vec![40.0, 30.0, 20.0, 10.0]);
    }

    #[test]
    fn test_limits_combine_as_and() {
        let constraints = vec![];
        let limits = FilterLimits {
            max_count: Some(2),
            min_concentration: Some(15.0),
            min_percent: Some(25.0), // total = 100, so floor is 25.0
        };
        let matches = apply_filter(&matrix(), &artifact(), &constraints, &limits).unwrap();
        // Floors keep 40 and 30; the cap keeps both.
        let concs: Vec<f64> = matches.iter().map(|m| m.concentration).collect();
        assert_eq!(concs, vec![40.0, 30.0]);
    }

    #[test]
    fn test_unknown_monomer_rejected() {
        let constraints = parse_filter_str("CONTAINS Z\n").unwrap();
        let err = apply_filter(
            &matrix(),
            &artifact(),
            &constraints,
            &FilterLimits::default(),
        )
        .unwrap_err();
        assert!(matches!(err, TbnError::Parse(_)));
    }

    #[test]
    fn test_missing_concentrations_rejected() {
        let mut art = artifact();
        art.concentrations = None;
        let err = apply_filter(&matrix(), &art, &[], &FilterLimits::default()).unwrap_err();
        assert!(matches!(err, TbnError::Invariant(_)));
    }
}
