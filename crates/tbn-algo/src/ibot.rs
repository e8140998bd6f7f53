//! IBOT scheduler.
//!
//! Iteratively assigns concentration exponents μ to off-target polymers so
//! that detailed balance holds across every irreducible canonical
//! reaction. Each iteration finds the globally minimum imbalance-to-novelty
//! ratio over the surviving reactions, assigns that value to every
//! still-unassigned off-target polymer in the support of every minimizing
//! reaction, and incrementally refreshes only the reactions whose support
//! was touched (via a polymer → reactions inverted index).
//!
//! Ratios are exact `Ratio<i64>` values; the min-heap compares them
//! exactly with reaction-index tie-breaks, and stale entries are skipped
//! lazily on pop by comparing their (novelty, imbalance) snapshot against
//! the current state.

use crate::reactions::{CanonicalReaction, OnTargetSet};
use num_rational::Rational64;
use num_traits::{CheckedAdd, CheckedDiv, CheckedMul, One, Zero};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tbn_core::{ConcUnit, PolymerBasis, TbnError, TbnResult, RHO_WATER_MOLAR};
use tracing::{debug, info};

/// Concentration exponent: an exact non-negative rational.
pub type Exponent = Rational64;

/// Result of an IBOT run.
#[derive(Debug, Clone)]
pub struct IbotOutcome {
    /// Per basis polymer: `Some(μ)` for on-target (μ = 1) and for
    /// reachable off-target polymers; `None` marks an off-target polymer
    /// unreachable from on-target polymers by canonical reactions.
    pub mu: Vec<Option<Exponent>>,
    /// Unreachable off-target polymer indices, in basis order.
    pub unreachable: Vec<usize>,
    /// Number of assignment iterations performed.
    pub iterations: usize,
    /// The sequence of μ_min values, one per iteration (non-decreasing).
    pub min_ratios: Vec<Exponent>,
}

#[derive(Debug, Clone)]
struct Entry {
    ratio: Exponent,
    reaction: u32,
    novelty: u32,
    imbalance: Exponent,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ratio
            .cmp(&other.ratio)
            .then(self.reaction.cmp(&other.reaction))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn overflow() -> TbnError {
    TbnError::ArithmeticOverflow("exponent accumulator")
}

/// `k(r) = μ₁(r) − μ₂(r) = Σ_p (−r_p)·μ(p)`, with unassigned μ reading 0.
fn imbalance(reaction: &CanonicalReaction, mu: &[Exponent]) -> TbnResult<Exponent> {
    let mut k = Exponent::zero();
    for &(p, coeff) in &reaction.terms {
        let weight = Exponent::from_integer(-coeff);
        let term = weight.checked_mul(&mu[p]).ok_or_else(overflow)?;
        k = k.checked_add(&term).ok_or_else(overflow)?;
    }
    Ok(k)
}

/// `ℓ(r)`: distinct off-target polymers in the support still unassigned.
fn novelty(reaction: &CanonicalReaction, on_target: &OnTargetSet, assigned: &[bool]) -> u32 {
    reaction
        .terms
        .iter()
        .filter(|&&(p, _)| !on_target.is_on_target(p) && !assigned[p])
        .count() as u32
}

/// Run the IBOT iteration to completion.
pub fn run_ibot(
    reactions: &[CanonicalReaction],
    on_target: &OnTargetSet,
    basis_len: usize,
) -> TbnResult<IbotOutcome> {
    let mut mu = vec![Exponent::zero(); basis_len];
    let mut assigned = vec![false; basis_len];
    for &p in &on_target.indices {
        mu[p] = Exponent::one();
        assigned[p] = true;
    }

    // Inverted index over off-target support.
    let mut by_polymer: Vec<Vec<u32>> = vec![Vec::new(); basis_len];
    for (r, reaction) in reactions.iter().enumerate() {
        for &(p, _) in &reaction.terms {
            if !on_target.is_on_target(p) {
                by_polymer[p].push(r as u32);
            }
        }
    }

    let mut l = vec![0u32; reactions.len()];
    let mut k = vec![Exponent::zero(); reactions.len()];
    let mut alive = vec![false; reactions.len()];
    let mut heap: BinaryHeap<std::cmp::Reverse<Entry>> = BinaryHeap::new();

    for (r, reaction) in reactions.iter().enumerate() {
        l[r] = novelty(reaction, on_target, &assigned);
        if l[r] == 0 {
            // Fully on-target (or fully assigned) reactions carry no new
            // information and are discarded up front.
            continue;
        }
        k[r] = imbalance(reaction, &mu)?;
        alive[r] = true;
        let ratio = k[r]
            .checked_div(&Exponent::from_integer(l[r] as i64))
            .ok_or_else(overflow)?;
        heap.push(std::cmp::Reverse(Entry {
            ratio,
            reaction: r as u32,
            novelty: l[r],
            imbalance: k[r],
        }));
    }

    let mut iterations = 0usize;
    let mut min_ratios: Vec<Exponent> = Vec::new();
    let mut newly: Vec<usize> = Vec::new();
    let mut touched: Vec<u32> = Vec::new();

    enum Peek {
        Stop,
        Stale,
        Join(usize),
    }

    loop {
        // Pop the first live, up-to-date entry.
        let head = loop {
            match heap.pop() {
                None => break None,
                Some(std::cmp::Reverse(entry)) => {
                    let r = entry.reaction as usize;
                    if alive[r] && entry.novelty == l[r] && entry.imbalance == k[r] {
                        break Some(entry);
                    }
                }
            }
        };
        let Some(head) = head else {
            break;
        };
        let mu_min = head.ratio;
        let mut min_set = vec![head.reaction as usize];

        // Every reaction attaining the minimum joins this iteration.
        loop {
            let decision = match heap.peek() {
                None => Peek::Stop,
                Some(std::cmp::Reverse(top)) => {
                    let r = top.reaction as usize;
                    if !(alive[r] && top.novelty == l[r] && top.imbalance == k[r]) {
                        Peek::Stale
                    } else if top.ratio == mu_min {
                        Peek::Join(r)
                    } else {
                        Peek::Stop
                    }
                }
            };
            match decision {
                Peek::Stop => break,
                Peek::Stale => {
                    heap.pop();
                }
                Peek::Join(r) => {
                    heap.pop();
                    min_set.push(r);
                }
            }
        }

        newly.clear();
        for &r in &min_set {
            for &(p, _) in &reactions[r].terms {
                if !on_target.is_on_target(p) && !assigned[p] {
                    assigned[p] = true;
                    mu[p] = mu_min;
                    newly.push(p);
                }
            }
        }
        debug_assert!(!newly.is_empty(), "a live reaction must assign something");

        // Refresh only the reactions whose support intersects the newly
        // assigned polymers.
        touched.clear();
        for &p in &newly {
            touched.extend_from_slice(&by_polymer[p]);
        }
        touched.sort_unstable();
        touched.dedup();
        for &r32 in &touched {
            let r = r32 as usize;
            if !alive[r] {
                continue;
            }
            l[r] = novelty(&reactions[r], on_target, &assigned);
            if l[r] == 0 {
                alive[r] = false;
                continue;
            }
            k[r] = imbalance(&reactions[r], &mu)?;
            let ratio = k[r]
                .checked_div(&Exponent::from_integer(l[r] as i64))
                .ok_or_else(overflow)?;
            heap.push(std::cmp::Reverse(Entry {
                ratio,
                reaction: r32,
                novelty: l[r],
                imbalance: k[r],
            }));
        }

        iterations += 1;
        debug!(
            iteration = iterations,
            mu_min = %mu_min,
            assigned = newly.len(),
            "IBOT assignment"
        );
        min_ratios.push(mu_min);
    }

    let unreachable: Vec<usize> = (0..basis_len)
        .filter(|&p| !on_target.is_on_target(p) && !assigned[p])
        .collect();
    info!(
        iterations,
        assigned = basis_len - unreachable.len(),
        unreachable = unreachable.len(),
        "IBOT finished"
    );

    let mu = (0..basis_len)
        .map(|p| if assigned[p] { Some(mu[p]) } else { None })
        .collect();
    Ok(IbotOutcome {
        mu,
        unreachable,
        iterations,
        min_ratios,
    })
}

/// Emission order: on-target polymers first in basis order, then assigned
/// off-target polymers by ascending μ, ties in basis order.
pub fn ordered_assignments(
    outcome: &IbotOutcome,
    on_target: &OnTargetSet,
) -> Vec<(usize, Exponent)> {
    let mut out: Vec<(usize, Exponent)> = on_target
        .indices
        .iter()
        .map(|&p| (p, Exponent::one()))
        .collect();
    let mut off: Vec<(usize, Exponent)> = outcome
        .mu
        .iter()
        .enumerate()
        .filter_map(|(p, m)| match m {
            Some(mu) if !on_target.is_on_target(p) => Some((p, *mu)),
            _ => None,
        })
        .collect();
    off.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));
    out.extend(off);
    out
}

/// Balanced monomer concentrations for `--generate-tbn`.
///
/// With `f = c′/ρ` the mole fraction of the requested concentration,
/// monomer `i` receives `ρ · Σ_p x_p[i] · f^{μ(p)}` over the assigned
/// polymers, re-expressed in the requested units.
pub fn synthesize_concentrations(
    basis: &PolymerBasis,
    assignments: &[(usize, Exponent)],
    target_concentration: f64,
    unit: ConcUnit,
) -> Vec<f64> {
    let fraction = unit.to_molar(target_concentration) / RHO_WATER_MOLAR;
    let mut totals_molar = vec![0.0f64; basis.num_monomers()];
    for &(p, mu) in assignments {
        let weight = fraction.powf(*mu.numer() as f64 / *mu.denom() as f64);
        for (total, &count) in totals_molar.iter_mut().zip(basis.polymer(p)) {
            *total += RHO_WATER_MOLAR * count as f64 * weight;
        }
    }
    totals_molar.iter().map(|&m| unit.from_molar(m)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratio(n: i64, d: i64) -> Exponent {
        Exponent::new(n, d)
    }

    // Polymer indices: 0 = X, 1 = Y, 2 = T (on-target).
    fn on_target() -> OnTargetSet {
        OnTargetSet {
            flags: vec![false, false, true],
            indices: vec![2],
        }
    }

    fn reaction(terms: &[(usize, i64)]) -> CanonicalReaction {
        CanonicalReaction {
            terms: terms.to_vec(),
        }
    }

    #[test]
    fn test_single_dissociation_assigns_halves() {
        // T -> X + Y: k = 1, l = 2, μ_min = 1/2 for both products.
        let reactions = vec![reaction(&[(0, 1), (1, 1), (2, -1)])];
        let outcome = run_ibot(&reactions, &on_target(), 3).unwrap();
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.mu[0], Some(ratio(1, 2)));
        assert_eq!(outcome.mu[1], Some(ratio(1, 2)));
        assert_eq!(outcome.mu[2], Some(ratio(1, 1)));
        assert!(outcome.unreachable.is_empty());
    }

    #[test]
    fn test_two_iterations_and_monotone_ratios() {
        // R0: T -> X          k = 1, l = 1, ratio 1
        // R1: 3T -> X + Y     k = 3, l = 2, ratio 3/2
        // Iteration 1 assigns X = 1; R1 refreshes to k = 2, l = 1,
        // so iteration 2 assigns Y = 2.
        let reactions = vec![
            reaction(&[(0, 1), (2, -1)]),
            reaction(&[(0, 1), (1, 1), (2, -3)]),
        ];
        let outcome = run_ibot(&reactions, &on_target(), 3).unwrap();
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.mu[0], Some(ratio(1, 1)));
        assert_eq!(outcome.mu[1], Some(ratio(2, 1)));
        assert_eq!(outcome.min_ratios, vec![ratio(1, 1), ratio(2, 1)]);
        assert!(outcome
            .min_ratios
            .windows(2)
            .all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_tied_minimum_processes_both_reactions() {
        // Two independent reactions with the same ratio assign in one
        // iteration.
        let reactions = vec![
            reaction(&[(0, 2), (2, -1)]),
            reaction(&[(1, 2), (2, -1)]),
        ];
        let outcome = run_ibot(&reactions, &on_target(), 3).unwrap();
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.mu[0], Some(ratio(1, 1)));
        assert_eq!(outcome.mu[1], Some(ratio(1, 1)));
    }

    #[test]
    fn test_unreachable_polymer_reported() {
        // Y appears in no reaction: unreachable, and excluded from μ.
        let reactions = vec![reaction(&[(0, 1), (2, -1)])];
        let outcome = run_ibot(&reactions, &on_target(), 3).unwrap();
        assert_eq!(outcome.mu[1], None);
        assert_eq!(outcome.unreachable, vec![1]);
    }

    #[test]
    fn test_on_target_only_reactions_discarded() {
        let reactions = vec![reaction(&[(2, -1)])]; // support entirely on-target, l = 0
        let outcome = run_ibot(&reactions, &on_target(), 3).unwrap();
        assert_eq!(outcome.iterations, 0);
        assert_eq!(outcome.unreachable, vec![0, 1]);
    }

    #[test]
    fn test_closure_every_survivor_positive() {
        let reactions = vec![
            reaction(&[(0, 1), (1, 1), (2, -1)]),
            reaction(&[(0, 2), (2, -1)]),
        ];
        let outcome = run_ibot(&reactions, &on_target(), 3).unwrap();
        for (p, mu) in outcome.mu.iter().enumerate() {
            if let Some(mu) = mu {
                assert!(*mu > Exponent::zero(), "polymer {p} has non-positive μ");
            }
        }
    }

    #[test]
    fn test_reduced_reaction_set_preserves_exponents() {
        // A reduced set that still covers every reachable off-target
        // polymer with its minimum-ratio reactions yields the same μ as
        // the full set.
        let full = vec![
            reaction(&[(0, 1), (1, 1), (2, -1)]),
            reaction(&[(0, 2), (2, -1)]),
        ];
        let reduced = vec![reaction(&[(0, 1), (1, 1), (2, -1)])];
        let full_outcome = run_ibot(&full, &on_target(), 3).unwrap();
        let reduced_outcome = run_ibot(&reduced, &on_target(), 3).unwrap();
        assert_eq!(full_outcome.mu, reduced_outcome.mu);
    }

    #[test]
    fn test_ordered_assignments_layout() {
        // On-target first (basis order), then off-target by ascending μ
        // with index tie-break.
        let outcome = IbotOutcome {
            mu: vec![Some(ratio(3, 2)), Some(ratio(1, 2)), Some(ratio(1, 1))],
            unreachable: vec![],
            iterations: 2,
            min_ratios: vec![],
        };
        let ordered = ordered_assignments(&outcome, &on_target());
        assert_eq!(
            ordered,
            vec![(2, ratio(1, 1)), (1, ratio(1, 2)), (0, ratio(3, 2))]
        );
    }

    #[test]
    fn test_synthesize_concentrations() {
        use tbn_core::PolymerBasis;
        // One monomer; polymer {M} with μ = 1.
        let basis = PolymerBasis::from_sorted_vectors(vec![vec![1]], 1);
        let assignments = vec![(0usize, ratio(1, 1))];
        let out = synthesize_concentrations(&basis, &assignments, 100.0, ConcUnit::Nanomolar);
        // ρ · (c′/ρ)^1 = c′, re-expressed: exactly the requested 100 nM.
        assert!((out[0] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_synthesize_concentrations_square_exponent() {
        use tbn_core::PolymerBasis;
        let basis = PolymerBasis::from_sorted_vectors(vec![vec![1]], 1);
        let assignments = vec![(0usize, ratio(2, 1))];
        let out = synthesize_concentrations(&basis, &assignments, 55.14, ConcUnit::Molar);
        // f = 1, so ρ · f² = ρ.
        assert!((out[0] - 55.14).abs() < 1e-9);
    }
}
