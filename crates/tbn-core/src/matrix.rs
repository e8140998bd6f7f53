//! The monomer matrix A and its invariants.
//!
//! Columns of A are the signed monomer vectors in input order; rows are
//! indexed by the distinct base binding sites in first-occurrence order.
//! The matrix owns the merged monomer names and concentrations and is the
//! single source of truth for everything downstream: the polymer basis
//! cone, free energies, reaction conservation, and the artifact cache key.

use crate::error::{TbnError, TbnResult};
use crate::monomer::MonomerRecord;
use crate::units::ConcUnit;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Integer monomer matrix of shape (sites × monomers).
#[derive(Debug, Clone)]
pub struct MonomerMatrix {
    site_names: Vec<String>,
    site_index: HashMap<String, usize>,
    /// One signed vector per monomer, each of length `site_names.len()`.
    columns: Vec<Vec<i64>>,
    names: Vec<Option<String>>,
    /// Present iff units were declared and every merged monomer carried a
    /// concentration.
    concentrations: Option<Vec<f64>>,
    units: Option<ConcUnit>,
}

impl MonomerMatrix {
    /// Build the matrix from parsed monomer records.
    ///
    /// Records whose signed vectors are equal are collapsed into one column
    /// iff `units` is declared, summing their concentrations. Collapse
    /// fails on conflicting non-empty names; concentration presence must be
    /// uniform across monomers; merged concentrations must be non-negative;
    /// no token may serve as both a monomer name and a base site name.
    pub fn build(records: &[MonomerRecord], units: Option<ConcUnit>) -> TbnResult<Self> {
        // Intern base site names in first-occurrence order.
        let mut site_names: Vec<String> = Vec::new();
        let mut site_index: HashMap<String, usize> = HashMap::new();
        for rec in records {
            for site in &rec.sites {
                if !site_index.contains_key(&site.base) {
                    site_index.insert(site.base.clone(), site_names.len());
                    site_names.push(site.base.clone());
                }
            }
        }
        let m = site_names.len();

        for rec in records {
            if let Some(name) = &rec.name {
                if site_index.contains_key(name) {
                    return Err(TbnError::Invariant(format!(
                        "`{name}` is used both as a monomer name and as a binding-site name"
                    )));
                }
            }
        }

        // Signed vector per record.
        let vectors: Vec<Vec<i64>> = records
            .iter()
            .map(|rec| {
                let mut v = vec![0i64; m];
                for site in &rec.sites {
                    v[site_index[&site.base]] += site.sign();
                }
                v
            })
            .collect();

        // Group records into columns. Without declared units every record
        // keeps its own column.
        let groups: Vec<Vec<usize>> = if units.is_some() {
            let mut order: Vec<Vec<usize>> = Vec::new();
            let mut by_vector: HashMap<&[i64], usize> = HashMap::new();
            for (idx, v) in vectors.iter().enumerate() {
                match by_vector.get(v.as_slice()) {
                    Some(&g) => order[g].push(idx),
                    None => {
                        by_vector.insert(v.as_slice(), order.len());
                        order.push(vec![idx]);
                    }
                }
            }
            order
        } else {
            (0..records.len()).map(|i| vec![i]).collect()
        };

        let mut columns = Vec::with_capacity(groups.len());
        let mut names = Vec::with_capacity(groups.len());
        let mut concs: Vec<Option<f64>> = Vec::with_capacity(groups.len());
        for group in &groups {
            let first = group[0];
            columns.push(vectors[first].clone());

            let mut group_names: Vec<&str> = group
                .iter()
                .filter_map(|&i| records[i].name.as_deref())
                .collect();
            group_names.sort_unstable();
            group_names.dedup();
            if group_names.len() > 1 {
                return Err(TbnError::Invariant(format!(
                    "duplicate monomers carry conflicting names `{}` and `{}`",
                    group_names[0], group_names[1]
                )));
            }
            names.push(group_names.first().map(|s| s.to_string()));

            let with_conc: Vec<f64> = group
                .iter()
                .filter_map(|&i| records[i].concentration)
                .collect();
            if with_conc.is_empty() {
                concs.push(None);
            } else {
                let sum: f64 = with_conc.iter().sum();
                if sum < 0.0 {
                    return Err(TbnError::Invariant(format!(
                        "merged concentration of monomer `{}` is negative ({sum})",
                        names
                            .last()
                            .unwrap()
                            .clone()
                            .unwrap_or_else(|| records[first].site_list())
                    )));
                }
                concs.push(Some(sum));
            }
        }

        let concentrations = if concs.iter().all(|c| c.is_none()) {
            None
        } else if concs.iter().all(|c| c.is_some()) {
            Some(concs.into_iter().map(|c| c.unwrap()).collect())
        } else {
            return Err(TbnError::Invariant(
                "some monomers declare concentrations and others do not".into(),
            ));
        };

        Ok(MonomerMatrix {
            site_names,
            site_index,
            columns,
            names,
            concentrations,
            units,
        })
    }

    /// Number of binding-site rows (m).
    pub fn num_sites(&self) -> usize {
        self.site_names.len()
    }

    /// Number of monomer columns (n).
    pub fn num_monomers(&self) -> usize {
        self.columns.len()
    }

    /// Ordered base site names.
    pub fn site_names(&self) -> &[String] {
        &self.site_names
    }

    /// Row index of a base site name.
    pub fn site_row(&self, base: &str) -> Option<usize> {
        self.site_index.get(base).copied()
    }

    /// Signed vector of monomer `j`.
    pub fn column(&self, j: usize) -> &[i64] {
        &self.columns[j]
    }

    /// Declared monomer name, if any.
    pub fn monomer_name(&self, j: usize) -> Option<&str> {
        self.names[j].as_deref()
    }

    /// Column index of the monomer with the given declared name.
    pub fn monomer_index_by_name(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n.as_deref() == Some(name))
    }

    /// Column index whose signed vector equals `v` exactly.
    pub fn column_index_of_vector(&self, v: &[i64]) -> Option<usize> {
        self.columns.iter().position(|c| c.as_slice() == v)
    }

    /// Merged concentrations in declared units, if present.
    pub fn concentrations(&self) -> Option<&[f64]> {
        self.concentrations.as_deref()
    }

    /// Declared concentration unit, if any.
    pub fn units(&self) -> Option<ConcUnit> {
        self.units
    }

    /// Human-facing label for monomer `j`: its declared name, or a site
    /// list reconstructed from the signed vector.
    pub fn monomer_label(&self, j: usize) -> String {
        if let Some(name) = &self.names[j] {
            return name.clone();
        }
        let mut tokens = Vec::new();
        for (i, &v) in self.columns[j].iter().enumerate() {
            let (count, suffix) = if v >= 0 { (v, "") } else { (-v, "*") };
            for _ in 0..count {
                tokens.push(format!("{}{}", self.site_names[i], suffix));
            }
        }
        tokens.join(" ")
    }

    /// A · x with overflow detection. `x` must have length n.
    pub fn apply(&self, x: &[i64]) -> TbnResult<Vec<i64>> {
        debug_assert_eq!(x.len(), self.num_monomers());
        let mut out = vec![0i64; self.num_sites()];
        for (col, &mult) in self.columns.iter().zip(x) {
            if mult == 0 {
                continue;
            }
            for (acc, &a) in out.iter_mut().zip(col) {
                let term = a
                    .checked_mul(mult)
                    .ok_or(TbnError::ArithmeticOverflow("site-excess accumulator"))?;
                *acc = acc
                    .checked_add(term)
                    .ok_or(TbnError::ArithmeticOverflow("site-excess accumulator"))?;
            }
        }
        Ok(out)
    }

    /// Check the star-limiting invariant `A · c ≥ 0` against the stored
    /// concentrations (or the all-ones vector when absent).
    pub fn check_star_limiting(&self) -> TbnResult<()> {
        match &self.concentrations {
            Some(c) => self.check_star_limiting_with(c),
            None => {
                let ones = vec![1.0; self.num_monomers()];
                self.check_star_limiting_with(&ones)
            }
        }
    }

    /// Check `A · c ≥ 0` for a caller-supplied concentration vector.
    pub fn check_star_limiting_with(&self, c: &[f64]) -> TbnResult<()> {
        for row in 0..self.num_sites() {
            let excess: f64 = self
                .columns
                .iter()
                .zip(c)
                .map(|(col, &conc)| col[row] as f64 * conc)
                .sum();
            if excess < 0.0 {
                return Err(TbnError::Invariant(format!(
                    "not star-limiting: site `{}` (row {row}) has star excess {}",
                    self.site_names[row], -excess
                )));
            }
        }
        Ok(())
    }

    /// Deterministic content hash of the matrix.
    ///
    /// Hashes the ordered site-name list together with the content-sorted
    /// column multiset, so any column permutation hashes identically while
    /// any change to a column or to the site ordering changes the digest.
    pub fn canonical_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"tbn-matrix-v1");
        hasher.update((self.site_names.len() as u64).to_le_bytes());
        for name in &self.site_names {
            hasher.update((name.len() as u64).to_le_bytes());
            hasher.update(name.as_bytes());
        }
        let mut cols: Vec<Vec<u8>> = self
            .columns
            .iter()
            .map(|col| {
                let mut buf = Vec::with_capacity(col.len() * 8);
                for &v in col {
                    buf.extend_from_slice(&v.to_le_bytes());
                }
                buf
            })
            .collect();
        cols.sort_unstable();
        hasher.update((cols.len() as u64).to_le_bytes());
        for col in &cols {
            hasher.update(col);
        }
        let digest = hasher.finalize();
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::BindingSite;

    fn record(name: Option<&str>, sites: &str, conc: Option<f64>) -> MonomerRecord {
        MonomerRecord {
            name: name.map(String::from),
            sites: sites
                .split_whitespace()
                .map(|t| BindingSite::parse(t).unwrap())
                .collect(),
            concentration: conc,
        }
    }

    #[test]
    fn test_build_basic() {
        let records = vec![
            record(Some("A"), "a b c", None),
            record(Some("B"), "a* b* c*", None),
        ];
        let matrix = MonomerMatrix::build(&records, None).unwrap();
        assert_eq!(matrix.num_sites(), 3);
        assert_eq!(matrix.num_monomers(), 2);
        assert_eq!(matrix.column(0), &[1, 1, 1]);
        assert_eq!(matrix.column(1), &[-1, -1, -1]);
        assert_eq!(matrix.monomer_index_by_name("B"), Some(1));
    }

    #[test]
    fn test_intra_monomer_cancellation() {
        let records = vec![record(None, "a a* b", None)];
        let matrix = MonomerMatrix::build(&records, None).unwrap();
        assert_eq!(matrix.column(0), &[0, 1]);
    }

    #[test]
    fn test_duplicates_merged_under_units() {
        // Named and unnamed copies of the same vector merge, summing
        // concentrations and keeping the unique name.
        let records = vec![
            record(Some("A"), "a b", Some(3.0)),
            record(None, "b a", Some(2.0)),
        ];
        let matrix = MonomerMatrix::build(&records, Some(ConcUnit::Nanomolar)).unwrap();
        assert_eq!(matrix.num_monomers(), 1);
        assert_eq!(matrix.monomer_name(0), Some("A"));
        assert_eq!(matrix.concentrations().unwrap(), &[5.0]);
    }

    #[test]
    fn test_duplicates_kept_without_units() {
        let records = vec![record(None, "a", None), record(None, "a", None)];
        let matrix = MonomerMatrix::build(&records, None).unwrap();
        assert_eq!(matrix.num_monomers(), 2);
    }

    #[test]
    fn test_conflicting_names_rejected() {
        let records = vec![
            record(Some("A"), "a b", Some(1.0)),
            record(Some("B"), "a b", Some(1.0)),
        ];
        let err = MonomerMatrix::build(&records, Some(ConcUnit::Nanomolar)).unwrap_err();
        assert!(matches!(err, TbnError::Invariant(_)));
    }

    #[test]
    fn test_mixed_concentration_presence_rejected() {
        let records = vec![
            record(Some("A"), "a", Some(1.0)),
            record(Some("B"), "a*", None),
        ];
        let err = MonomerMatrix::build(&records, Some(ConcUnit::Nanomolar)).unwrap_err();
        assert!(matches!(err, TbnError::Invariant(_)));
    }

    #[test]
    fn test_negative_merged_concentration_rejected() {
        let records = vec![
            record(Some("A"), "a", Some(1.0)),
            record(None, "a", Some(-4.0)),
        ];
        let err = MonomerMatrix::build(&records, Some(ConcUnit::Nanomolar)).unwrap_err();
        assert!(matches!(err, TbnError::Invariant(_)));
    }

    #[test]
    fn test_name_site_collision_rejected() {
        let records = vec![record(Some("a"), "a b", None)];
        let err = MonomerMatrix::build(&records, None).unwrap_err();
        assert!(matches!(err, TbnError::Invariant(_)));
    }

    #[test]
    fn test_star_limiting_detection() {
        // M: a a (conc 1), N: a* a* a* (conc 1) -> row `a` has excess -1.
        let records = vec![
            record(Some("M"), "a a", Some(1.0)),
            record(Some("N"), "a* a* a*", Some(1.0)),
        ];
        let matrix = MonomerMatrix::build(&records, Some(ConcUnit::Nanomolar)).unwrap();
        let err = matrix.check_star_limiting().unwrap_err();
        match err {
            TbnError::Invariant(msg) => assert!(msg.contains("`a`")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_star_limiting_ok_with_ones() {
        let records = vec![
            record(Some("A"), "a b c", None),
            record(Some("B"), "a* b* c*", None),
        ];
        let matrix = MonomerMatrix::build(&records, None).unwrap();
        assert!(matrix.check_star_limiting().is_ok());
    }

    #[test]
    fn test_canonical_hash_permutation_invariant() {
        let fwd = vec![
            record(Some("A"), "a b c", None),
            record(Some("B"), "a* b* c*", None),
        ];
        let rev = vec![
            record(Some("B"), "a* b* c*", None),
            record(Some("A"), "a b c", None),
        ];
        // Both orderings intern base sites as a, b, c; only the column
        // order differs, which the hash must not see.
        let m1 = MonomerMatrix::build(&fwd, None).unwrap();
        let m2 = MonomerMatrix::build(&rev, None).unwrap();
        assert_eq!(m1.canonical_hash(), m2.canonical_hash());
    }

    #[test]
    fn test_canonical_hash_sensitive_to_columns() {
        let m1 = MonomerMatrix::build(&[record(Some("A"), "a b", None)], None).unwrap();
        let m2 = MonomerMatrix::build(&[record(Some("A"), "a b b", None)], None).unwrap();
        assert_ne!(m1.canonical_hash(), m2.canonical_hash());
    }

    #[test]
    fn test_apply() {
        let records = vec![
            record(Some("A"), "a b c", None),
            record(Some("B"), "a* b* c*", None),
        ];
        let matrix = MonomerMatrix::build(&records, None).unwrap();
        assert_eq!(matrix.apply(&[1, 1]).unwrap(), vec![0, 0, 0]);
        assert_eq!(matrix.apply(&[2, 1]).unwrap(), vec![1, 1, 1]);
    }

    #[test]
    fn test_monomer_label_reconstruction() {
        let records = vec![record(None, "a a b*", None)];
        let matrix = MonomerMatrix::build(&records, None).unwrap();
        assert_eq!(matrix.monomer_label(0), "a a b*");
    }
}
