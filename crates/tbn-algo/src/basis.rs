//! Polymer basis engine.
//!
//! Builds the augmented matrix A′, poses the homogeneous Hilbert-basis
//! problem to the lattice oracle, and post-processes the result: project
//! out the fake slack columns, deduplicate exactly at scale, drop the zero
//! vector, and sort into the stable polymer index order used everywhere
//! downstream.

use crate::lattice_error;
use hashbrown::HashSet;
use rayon::prelude::*;
use tbn_core::{EnergyModel, MonomerMatrix, PolymerBasis, TbnResult};
use tbn_solvers::{HomogeneousProblem, LatticeBackend, SolveOptions};
use tracing::info;

/// Threshold above which dedup and sorting shard across threads.
const PARALLEL_THRESHOLD: usize = 10_000;

/// The augmented system A′: original columns plus one `−eᵢ` slack column
/// for every binding-site row that lacks a singleton-star monomer.
#[derive(Debug, Clone)]
pub struct AugmentedMatrix {
    /// Equation rows over the `n′` columns.
    pub equations: Vec<Vec<i64>>,
    /// Original column count n.
    pub original: usize,
    /// Total column count n′.
    pub total: usize,
}

/// Build A′ from the monomer matrix.
pub fn augment(matrix: &MonomerMatrix) -> AugmentedMatrix {
    let m = matrix.num_sites();
    let n = matrix.num_monomers();

    // Rows that already own a singleton-star column keep it as the slack.
    let mut fake_rows = Vec::new();
    for i in 0..m {
        let mut negated = vec![0i64; m];
        negated[i] = -1;
        if matrix.column_index_of_vector(&negated).is_none() {
            fake_rows.push(i);
        }
    }

    let total = n + fake_rows.len();
    let mut equations = Vec::with_capacity(m);
    for i in 0..m {
        let mut row = Vec::with_capacity(total);
        for j in 0..n {
            row.push(matrix.column(j)[i]);
        }
        for &fake in &fake_rows {
            row.push(if fake == i { -1 } else { 0 });
        }
        equations.push(row);
    }

    AugmentedMatrix {
        equations,
        original: n,
        total,
    }
}

/// Project, deduplicate, drop the zero vector, and sort lexicographically.
///
/// Dedup hashes the byte image of each fixed-width vector with an equality
/// check on collision (the behavior of a hash set over `Vec<i64>`); the
/// final sort shards across threads for large outputs and is stable in
/// content, so output bytes are identical across runs.
pub fn postprocess(raw: Vec<Vec<i64>>, original: usize) -> Vec<Vec<i64>> {
    let mut unique: HashSet<Vec<i64>> = HashSet::with_capacity(raw.len());
    for mut vector in raw {
        vector.truncate(original);
        if vector.iter().all(|&v| v == 0) {
            continue;
        }
        unique.insert(vector);
    }
    let mut vectors: Vec<Vec<i64>> = unique.into_iter().collect();
    if vectors.len() > PARALLEL_THRESHOLD {
        vectors.par_sort_unstable();
    } else {
        vectors.sort_unstable();
    }
    vectors
}

/// Compute the polymer basis of the TBN.
pub fn compute_polymer_basis(
    matrix: &MonomerMatrix,
    backend: &dyn LatticeBackend,
    opts: &SolveOptions,
) -> TbnResult<PolymerBasis> {
    let augmented = augment(matrix);
    let problem = HomogeneousProblem {
        dimension: augmented.total,
        equations: augmented.equations.clone(),
        inequalities: Vec::new(),
    };

    info!(
        backend = backend.name(),
        dimension = augmented.total,
        equations = problem.equations.len(),
        "computing polymer basis"
    );
    let raw = backend
        .hilbert_basis(&problem, "polymer-basis", opts)
        .map_err(lattice_error)?;

    let vectors = postprocess(raw, augmented.original);
    info!(polymers = vectors.len(), "polymer basis ready");
    Ok(PolymerBasis::from_sorted_vectors(
        vectors,
        matrix.num_monomers(),
    ))
}

/// Evaluate ΔG for every basis polymer, in basis order.
///
/// Evaluation is embarrassingly parallel per polymer; results are
/// collected back in index order so output stays deterministic.
pub fn compute_free_energies(
    matrix: &MonomerMatrix,
    basis: &PolymerBasis,
    model: &EnergyModel,
) -> TbnResult<Vec<f64>> {
    (0..basis.len())
        .into_par_iter()
        .map(|idx| model.delta_g(matrix, basis.polymer(idx)))
        .collect()
}
