//! Canonical reactions engine.
//!
//! A reaction is an integer vector over polymer-basis indices: negative
//! entries are reactants, positive entries products, with monomer
//! conservation `B·r = 0`. Canonical reactions additionally never consume
//! off-target polymers (`S·r ≥ 0`).
//!
//! The lattice oracle works over non-negative variables, so free-sign
//! on-target coordinates are split into positive and negative parts while
//! off-target coordinates stay single non-negative variables — which
//! enforces `S·r ≥ 0` by construction. Split-pair artifacts map to the
//! zero reaction and are dropped.

use crate::lattice_error;
use hashbrown::HashSet;
use rayon::prelude::*;
use tbn_core::{render_polymer, MonomerMatrix, PolymerBasis, TbnError, TbnResult};
use tbn_solvers::{HomogeneousProblem, LatticeBackend, SolveOptions, StrictSliceProblem};
use tracing::info;

/// Which basis polymers the user designated as on-target.
#[derive(Debug, Clone)]
pub struct OnTargetSet {
    /// One flag per basis polymer.
    pub flags: Vec<bool>,
    /// On-target indices in basis order.
    pub indices: Vec<usize>,
}

impl OnTargetSet {
    pub fn is_on_target(&self, polymer: usize) -> bool {
        self.flags[polymer]
    }
}

/// Match user-supplied on-target polymers against the basis by exact
/// vector equality; any mismatch is a hard error.
pub fn resolve_on_target(
    matrix: &MonomerMatrix,
    basis: &PolymerBasis,
    polymers: &[Vec<i64>],
) -> TbnResult<OnTargetSet> {
    let mut flags = vec![false; basis.len()];
    for x in polymers {
        let idx = basis.index_of(x).ok_or_else(|| {
            TbnError::Invariant(format!(
                "on-target polymer {} is not in the polymer basis",
                render_polymer(matrix, x)
            ))
        })?;
        flags[idx] = true;
    }
    let indices = flags
        .iter()
        .enumerate()
        .filter(|(_, &f)| f)
        .map(|(i, _)| i)
        .collect();
    Ok(OnTargetSet { flags, indices })
}

/// A canonical reaction as a sparse signed vector over basis indices,
/// terms sorted by polymer index. Positive and negative supports are
/// disjoint by construction (one signed entry per polymer), which is the
/// no-catalyst invariant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalReaction {
    pub terms: Vec<(usize, i64)>,
}

impl CanonicalReaction {
    /// Collapse a dense signed vector; `None` for the zero reaction.
    pub fn from_dense(r: &[i64]) -> Option<Self> {
        let terms: Vec<(usize, i64)> = r
            .iter()
            .enumerate()
            .filter(|(_, &v)| v != 0)
            .map(|(p, &v)| (p, v))
            .collect();
        if terms.is_empty() {
            None
        } else {
            Some(CanonicalReaction { terms })
        }
    }

    /// Reactant terms as (polymer, positive multiplicity).
    pub fn reactants(&self) -> impl Iterator<Item = (usize, i64)> + '_ {
        self.terms
            .iter()
            .filter(|(_, v)| *v < 0)
            .map(|&(p, v)| (p, -v))
    }

    /// Product terms as (polymer, multiplicity).
    pub fn products(&self) -> impl Iterator<Item = (usize, i64)> + '_ {
        self.terms.iter().filter(|(_, v)| *v > 0).copied()
    }

    /// `1ᵀr`: total product multiplicity minus total reactant multiplicity.
    pub fn net_multiplicity(&self) -> i64 {
        self.terms.iter().map(|(_, v)| v).sum()
    }

    /// True when every polymer in the support is on-target.
    pub fn all_on_target(&self, on_target: &OnTargetSet) -> bool {
        self.terms.iter().all(|&(p, _)| on_target.is_on_target(p))
    }

    /// Render in human form, e.g. `{A} + 2 {B} -> {A + B} + {B}`.
    pub fn render(&self, matrix: &MonomerMatrix, basis: &PolymerBasis) -> String {
        let side = |terms: Vec<(usize, i64)>| -> String {
            if terms.is_empty() {
                return "0".to_string();
            }
            terms
                .iter()
                .map(|&(p, mult)| {
                    let rendered = render_polymer(matrix, basis.polymer(p));
                    if mult == 1 {
                        rendered
                    } else {
                        format!("{mult} {rendered}")
                    }
                })
                .collect::<Vec<_>>()
                .join(" + ")
        };
        format!(
            "{} -> {}",
            side(self.reactants().collect()),
            side(self.products().collect())
        )
    }
}

/// Variable layout for the sign-split cone.
#[derive(Debug, Clone)]
struct SplitLayout {
    /// Per variable: (polymer index, sign of its contribution to r).
    vars: Vec<(usize, i64)>,
    /// Per polymer: its single non-negative variable, for off-targets.
    off_var: Vec<Option<usize>>,
}

fn build_layout(basis: &PolymerBasis, on_target: &OnTargetSet) -> SplitLayout {
    let mut vars = Vec::new();
    let mut off_var = vec![None; basis.len()];
    for p in 0..basis.len() {
        if on_target.is_on_target(p) {
            vars.push((p, 1));
            vars.push((p, -1));
        } else {
            off_var[p] = Some(vars.len());
            vars.push((p, 1));
        }
    }
    SplitLayout { vars, off_var }
}

/// Conservation rows `B·r = 0` expressed over the split variables.
fn split_equations(basis: &PolymerBasis, layout: &SplitLayout) -> Vec<Vec<i64>> {
    let n = basis.num_monomers();
    let mut rows = Vec::with_capacity(n);
    for monomer in 0..n {
        let row = layout
            .vars
            .iter()
            .map(|&(p, sign)| basis.polymer(p)[monomer] * sign)
            .collect();
        rows.push(row);
    }
    rows
}

/// Map a split solution back to a dense signed reaction vector.
fn unsplit(h: &[i64], layout: &SplitLayout, basis_len: usize) -> Vec<i64> {
    let mut r = vec![0i64; basis_len];
    for (var, &(p, sign)) in layout.vars.iter().enumerate() {
        r[p] += sign * h[var];
    }
    r
}

fn collect_reactions(
    solutions: impl IntoIterator<Item = Vec<i64>>,
    layout: &SplitLayout,
    basis_len: usize,
) -> Vec<CanonicalReaction> {
    let mut unique: HashSet<CanonicalReaction> = HashSet::new();
    for h in solutions {
        if let Some(reaction) = CanonicalReaction::from_dense(&unsplit(&h, layout, basis_len)) {
            unique.insert(reaction);
        }
    }
    let mut reactions: Vec<CanonicalReaction> = unique.into_iter().collect();
    reactions.sort_unstable();
    reactions
}

/// Among irreducible reactions supported entirely on-target, every one
/// must conserve total multiplicity; the first violation is fatal.
pub fn check_detailed_balance(
    reactions: &[CanonicalReaction],
    on_target: &OnTargetSet,
    matrix: &MonomerMatrix,
    basis: &PolymerBasis,
) -> TbnResult<()> {
    for reaction in reactions {
        if reaction.all_on_target(on_target) && reaction.net_multiplicity() != 0 {
            return Err(TbnError::OnTargetImbalance {
                rendered: reaction.render(matrix, basis),
            });
        }
    }
    Ok(())
}

/// Enumerate the Hilbert basis of the canonical-reaction cone
/// `{r : B·r = 0, S·r ≥ 0}` and run the detailed-balance pre-check.
pub fn enumerate_canonical_reactions(
    matrix: &MonomerMatrix,
    basis: &PolymerBasis,
    on_target: &OnTargetSet,
    backend: &dyn LatticeBackend,
    opts: &SolveOptions,
) -> TbnResult<Vec<CanonicalReaction>> {
    let layout = build_layout(basis, on_target);
    let problem = HomogeneousProblem {
        dimension: layout.vars.len(),
        equations: split_equations(basis, &layout),
        inequalities: Vec::new(),
    };

    info!(
        backend = backend.name(),
        dimension = problem.dimension,
        "enumerating canonical reactions"
    );
    let solutions = backend
        .hilbert_basis(&problem, "reactions", opts)
        .map_err(lattice_error)?;

    let reactions = collect_reactions(solutions, &layout, basis.len());
    check_detailed_balance(&reactions, on_target, matrix, basis)?;
    info!(reactions = reactions.len(), "canonical reactions ready");
    Ok(reactions)
}

/// Bounded-target mode: for each undesired off-target polymer, solve the
/// strict slice `B·r = 0, S·r ≥ 0, r_p ≥ 1` for its minimal inhomogeneous
/// solutions; the reduced reaction set is the union over all slices.
///
/// The recession-cone Hilbert basis restricted to a positive entry at the
/// sliced coordinate belongs to the indecomposables and is included.
/// Slices are independent and solve in parallel; the final sort keeps the
/// result deterministic.
pub fn bounded_target_reactions(
    basis: &PolymerBasis,
    on_target: &OnTargetSet,
    undesired: &[usize],
    backend: &dyn LatticeBackend,
    opts: &SolveOptions,
) -> TbnResult<Vec<CanonicalReaction>> {
    let layout = build_layout(basis, on_target);
    let equations = split_equations(basis, &layout);

    for &p in undesired {
        if on_target.is_on_target(p) {
            return Err(TbnError::Invariant(format!(
                "polymer index {p} is on-target and cannot be a bounded-mode target"
            )));
        }
    }

    let slices: Vec<Vec<Vec<i64>>> = undesired
        .par_iter()
        .map(|&p| {
            let strict_index = layout.off_var[p].expect("off-target polymer has a variable");
            let problem = StrictSliceProblem {
                base: HomogeneousProblem {
                    dimension: layout.vars.len(),
                    equations: equations.clone(),
                    inequalities: Vec::new(),
                },
                strict_index,
            };
            let solution = backend
                .strict_slice(&problem, &format!("slice-{p}"), opts)
                .map_err(lattice_error)?;
            let mut vectors = solution.module_generators;
            vectors.extend(
                solution
                    .recession_basis
                    .into_iter()
                    .filter(|h| h[strict_index] > 0),
            );
            Ok(vectors)
        })
        .collect::<TbnResult<Vec<_>>>()?;

    Ok(collect_reactions(
        slices.into_iter().flatten(),
        &layout,
        basis.len(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{matrix_from, MockLattice};
    use tbn_core::PolymerBasis;

    // Basis over monomers A, B: polymers {A}, {B}, {A+B} in sorted order:
    // [0,1] < [1,0] < [1,1].
    fn basis() -> PolymerBasis {
        PolymerBasis::from_sorted_vectors(vec![vec![0, 1], vec![1, 0], vec![1, 1]], 2)
    }

    fn on_target(basis: &PolymerBasis, targets: &[&[i64]]) -> OnTargetSet {
        let matrix = matrix_from(&[("A", "a b c"), ("B", "a* b* c*")]);
        let polymers: Vec<Vec<i64>> = targets.iter().map(|t| t.to_vec()).collect();
        resolve_on_target(&matrix, basis, &polymers).unwrap()
    }

    #[test]
    fn test_resolve_on_target_exact_match() {
        let b = basis();
        let set = on_target(&b, &[&[1, 1]]);
        assert_eq!(set.indices, vec![2]);
        assert!(set.is_on_target(2));
        assert!(!set.is_on_target(0));
    }

    #[test]
    fn test_resolve_on_target_mismatch_is_fatal() {
        let matrix = matrix_from(&[("A", "a b c"), ("B", "a* b* c*")]);
        let b = basis();
        let err = resolve_on_target(&matrix, &b, &[vec![2, 2]]).unwrap_err();
        assert!(matches!(err, TbnError::Invariant(_)));
    }

    #[test]
    fn test_split_layout_and_equations() {
        let b = basis();
        // {A+B} (index 2) on-target: split into two variables.
        let set = on_target(&b, &[&[1, 1]]);
        let layout = build_layout(&b, &set);
        assert_eq!(layout.vars, vec![(0, 1), (1, 1), (2, 1), (2, -1)]);
        assert_eq!(layout.off_var[0], Some(0));
        assert_eq!(layout.off_var[2], None);

        let eqs = split_equations(&b, &layout);
        // Monomer A row: {B} has 0, {A} has 1, {A+B}± have ±1.
        assert_eq!(eqs[0], vec![0, 1, 1, -1]);
        // Monomer B row.
        assert_eq!(eqs[1], vec![1, 0, 1, -1]);
    }

    #[test]
    fn test_unsplit_drops_pair_artifacts() {
        let b = basis();
        let set = on_target(&b, &[&[1, 1]]);
        let layout = build_layout(&b, &set);
        // e+ + e- on the split coordinate is the zero reaction.
        assert_eq!(
            CanonicalReaction::from_dense(&unsplit(&[0, 0, 1, 1], &layout, 3)),
            None
        );
        // {A+B} -> {A} + {B}: consume one on-target, produce both others.
        let r = unsplit(&[1, 1, 0, 1], &layout, 3);
        assert_eq!(r, vec![1, 1, -1]);
    }

    #[test]
    fn test_enumerate_dissociation_reaction() {
        let matrix = matrix_from(&[("A", "a b c"), ("B", "a* b* c*")]);
        let b = basis();
        let set = on_target(&b, &[&[1, 1]]);
        // Mock Hilbert basis: the split-pair artifact plus the
        // dissociation {A+B} -> {A} + {B}.
        let backend = MockLattice::hilbert(vec![vec![0, 0, 1, 1], vec![1, 1, 0, 1]]);
        let reactions =
            enumerate_canonical_reactions(&matrix, &b, &set, &backend, &SolveOptions::default())
                .unwrap();
        assert_eq!(reactions.len(), 1);
        assert_eq!(reactions[0].terms, vec![(0, 1), (1, 1), (2, -1)]);
        assert_eq!(reactions[0].net_multiplicity(), 1);
        assert_eq!(reactions[0].render(&matrix, &b), "{A + B} -> {B} + {A}");
    }

    #[test]
    fn test_no_catalyst_supports_disjoint() {
        let r = CanonicalReaction::from_dense(&[2, -1, 0]).unwrap();
        let reactants: Vec<usize> = r.reactants().map(|(p, _)| p).collect();
        let products: Vec<usize> = r.products().map(|(p, _)| p).collect();
        assert!(reactants.iter().all(|p| !products.contains(p)));
    }

    #[test]
    fn test_detailed_balance_violation_rendered() {
        let matrix = matrix_from(&[("A", "a b c"), ("B", "a* b* c*")]);
        let b = basis();
        // Everything on-target, with an imbalanced 2 -> 3 reaction.
        let set = on_target(&b, &[&[0, 1], &[1, 0], &[1, 1]]);
        let bad = CanonicalReaction {
            terms: vec![(0, -2), (1, 3)],
        };
        let err = check_detailed_balance(&[bad], &set, &matrix, &b).unwrap_err();
        match err {
            TbnError::OnTargetImbalance { rendered } => {
                assert!(rendered.contains("->"));
                assert!(rendered.contains('2'));
                assert!(rendered.contains('3'));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_balanced_on_target_reactions_pass() {
        let matrix = matrix_from(&[("A", "a b c"), ("B", "a* b* c*")]);
        let b = basis();
        let set = on_target(&b, &[&[0, 1], &[1, 0], &[1, 1]]);
        let ok = CanonicalReaction {
            terms: vec![(0, -1), (1, -1), (2, 2)],
        };
        assert!(check_detailed_balance(&[ok], &set, &matrix, &b).is_ok());
    }

    #[test]
    fn test_bounded_mode_includes_positive_recession() {
        let b = basis();
        let set = on_target(&b, &[&[1, 1]]);
        // Slice on {B} (index 0, variable 0). The module generator is the
        // dissociation; one recession element also hits variable 0, one
        // does not.
        let backend = MockLattice::slice(
            vec![vec![1, 1, 0, 1]],
            vec![vec![1, 1, 0, 1], vec![0, 0, 1, 1]],
        );
        let reactions =
            bounded_target_reactions(&b, &set, &[0], &backend, &SolveOptions::default()).unwrap();
        assert_eq!(reactions.len(), 1);
        assert_eq!(reactions[0].terms, vec![(0, 1), (1, 1), (2, -1)]);
    }

    #[test]
    fn test_bounded_mode_rejects_on_target_slice() {
        let b = basis();
        let set = on_target(&b, &[&[1, 1]]);
        let backend = MockLattice::hilbert(vec![]);
        let err = bounded_target_reactions(&b, &set, &[2], &backend, &SolveOptions::default())
            .unwrap_err();
        assert!(matches!(err, TbnError::Invariant(_)));
    }
}
