//! Polymer-basis artifact cache.
//!
//! The `.tbnpolymat` artifact is content-addressed by the canonical hash
//! of the monomer matrix. When the stored hash matches the freshly built
//! matrix, the basis is reloaded and the lattice solver is skipped
//! entirely; a missing, stale, or corrupt artifact triggers a silent
//! recompute (logged at warn) and a rewrite.

use crate::basis::compute_polymer_basis;
use std::path::{Path, PathBuf};
use tbn_core::{MonomerMatrix, PolymerBasis, TbnError, TbnResult};
use tbn_io::read_polymat;
use tbn_solvers::{LatticeBackend, SolveOptions};
use tracing::{info, warn};

/// Where the artifact for a `.tbn` input lives.
pub fn artifact_path_for(tbn_path: &Path) -> PathBuf {
    tbn_path.with_extension("tbnpolymat")
}

/// A basis together with its provenance.
#[derive(Debug)]
pub struct BasisSource {
    pub basis: PolymerBasis,
    /// True when the basis was reloaded from a matching artifact.
    pub reused: bool,
}

/// Load the polymer basis from the artifact when its hash matches the
/// matrix, computing it through the lattice oracle otherwise.
pub fn load_or_compute_basis(
    artifact_path: &Path,
    matrix: &MonomerMatrix,
    backend: &dyn LatticeBackend,
    opts: &SolveOptions,
) -> TbnResult<BasisSource> {
    let hash = matrix.canonical_hash();

    match read_polymat(artifact_path, matrix.num_monomers()) {
        Ok(Some(artifact)) if artifact.matrix_hash == hash => {
            info!(path = %artifact_path.display(), "reusing cached polymer basis");
            let mut vectors = artifact.polymers;
            vectors.sort_unstable();
            return Ok(BasisSource {
                basis: PolymerBasis::from_sorted_vectors(vectors, matrix.num_monomers()),
                reused: true,
            });
        }
        Ok(Some(_)) => {
            info!(path = %artifact_path.display(), "monomer matrix changed; recomputing basis");
        }
        Ok(None) => {}
        Err(TbnError::CacheStale(reason)) => {
            warn!(path = %artifact_path.display(), %reason, "ignoring stale artifact");
        }
        Err(other) => return Err(other),
    }

    let basis = compute_polymer_basis(matrix, backend, opts)?;
    Ok(BasisSource {
        basis,
        reused: false,
    })
}
