//! Polymers and the polymer basis.
//!
//! A polymer is a non-negative integer vector of monomer multiplicities.
//! The polymer basis is stored as one dense row-major `i64` buffer so the
//! downstream engines (reactions, IBOT, filtering) can refer to polymers by
//! index without per-polymer allocation.

use crate::error::{TbnError, TbnResult};
use crate::matrix::MonomerMatrix;

/// The polymer basis: `len × num_monomers` multiplicities in one
/// contiguous row-major buffer, rows sorted lexicographically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolymerBasis {
    num_monomers: usize,
    data: Vec<i64>,
}

impl PolymerBasis {
    /// Wrap already-deduplicated, lexicographically sorted polymer rows.
    pub fn from_sorted_vectors(vectors: Vec<Vec<i64>>, num_monomers: usize) -> Self {
        let mut data = Vec::with_capacity(vectors.len() * num_monomers);
        for v in &vectors {
            debug_assert_eq!(v.len(), num_monomers);
            data.extend_from_slice(v);
        }
        debug_assert!(vectors.windows(2).all(|w| w[0] < w[1]));
        PolymerBasis { num_monomers, data }
    }

    /// Number of polymers.
    pub fn len(&self) -> usize {
        if self.num_monomers == 0 {
            0
        } else {
            self.data.len() / self.num_monomers
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Monomer dimension (n).
    pub fn num_monomers(&self) -> usize {
        self.num_monomers
    }

    /// Multiplicity row of polymer `idx`.
    pub fn polymer(&self, idx: usize) -> &[i64] {
        let n = self.num_monomers;
        &self.data[idx * n..(idx + 1) * n]
    }

    /// Iterate over polymer rows in index order.
    pub fn iter(&self) -> impl Iterator<Item = &[i64]> {
        self.data.chunks_exact(self.num_monomers.max(1))
    }

    /// Index of the polymer equal to `x`, by binary search over the sorted
    /// rows.
    pub fn index_of(&self, x: &[i64]) -> Option<usize> {
        let mut lo = 0usize;
        let mut hi = self.len();
        while lo < hi {
            let mid = (lo + hi) / 2;
            match self.polymer(mid).cmp(x) {
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
                std::cmp::Ordering::Equal => return Some(mid),
            }
        }
        None
    }

    /// Total monomer count `1ᵀx` of polymer `idx`.
    pub fn size(&self, idx: usize) -> i64 {
        self.polymer(idx).iter().sum()
    }
}

/// Render a polymer as a human-readable monomer sum, e.g. `{2 A + b b*}`.
pub fn render_polymer(matrix: &MonomerMatrix, x: &[i64]) -> String {
    let mut parts = Vec::new();
    for (j, &count) in x.iter().enumerate() {
        if count == 0 {
            continue;
        }
        let label = matrix.monomer_label(j);
        if count == 1 {
            parts.push(label);
        } else {
            parts.push(format!("{count} {label}"));
        }
    }
    if parts.is_empty() {
        "{}".to_string()
    } else {
        format!("{{{}}}", parts.join(" + "))
    }
}

/// Validate that a polymer is non-negative and saturated enough to sit in
/// the basis cone: `x ≥ 0` and `A·x ≥ 0` componentwise.
pub fn check_basis_member(matrix: &MonomerMatrix, x: &[i64]) -> TbnResult<()> {
    if x.iter().any(|&v| v < 0) {
        return Err(TbnError::Invariant(
            "polymer has a negative monomer multiplicity".into(),
        ));
    }
    let excess = matrix.apply(x)?;
    if let Some(row) = excess.iter().position(|&e| e < 0) {
        return Err(TbnError::Invariant(format!(
            "polymer has unbound star sites on `{}`",
            matrix.site_names()[row]
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monomer::MonomerRecord;
    use crate::site::BindingSite;

    fn basis() -> PolymerBasis {
        PolymerBasis::from_sorted_vectors(vec![vec![0, 1], vec![1, 0], vec![1, 1]], 2)
    }

    #[test]
    fn test_len_and_rows() {
        let b = basis();
        assert_eq!(b.len(), 3);
        assert_eq!(b.polymer(0), &[0, 1]);
        assert_eq!(b.polymer(2), &[1, 1]);
        assert_eq!(b.size(2), 2);
    }

    #[test]
    fn test_index_of() {
        let b = basis();
        assert_eq!(b.index_of(&[1, 0]), Some(1));
        assert_eq!(b.index_of(&[2, 0]), None);
    }

    #[test]
    fn test_iter_matches_rows() {
        let b = basis();
        let rows: Vec<&[i64]> = b.iter().collect();
        assert_eq!(rows, vec![&[0, 1][..], &[1, 0][..], &[1, 1][..]]);
    }

    fn two_monomer_matrix() -> MonomerMatrix {
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
    fn test_render_polymer() {
        let m = two_monomer_matrix();
        assert_eq!(render_polymer(&m, &[2, 1]), "{2 A + a* b*}");
        assert_eq!(render_polymer(&m, &[0, 0]), "{}");
    }

    #[test]
    fn test_check_basis_member() {
        let m = two_monomer_matrix();
        assert!(check_basis_member(&m, &[1, 1]).is_ok());
        assert!(check_basis_member(&m, &[2, 1]).is_ok());
        // Excess stars
        assert!(check_basis_member(&m, &[0, 1]).is_err());
        // Negative multiplicity
        assert!(check_basis_member(&m, &[-1, 0]).is_err());
    }
}
