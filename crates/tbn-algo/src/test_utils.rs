//! Shared fixtures for tests: tiny monomer matrices and a canned lattice
//! backend so the engines can run without an external solver.

use tbn_core::{BindingSite, MonomerMatrix, MonomerRecord};
use tbn_solvers::{
    HomogeneousProblem, LatticeBackend, SolveOptions, SolverError, SolverResult,
    StrictSliceProblem, StrictSliceSolution,
};

/// Build a matrix from `(name, "site site ...")` pairs, no concentrations.
pub fn matrix_from(monomers: &[(&str, &str)]) -> MonomerMatrix {
    let records: Vec<MonomerRecord> = monomers
        .iter()
        .map(|(name, sites)| MonomerRecord {
            name: Some(name.to_string()),
            sites: sites
                .split_whitespace()
                .map(|t| BindingSite::parse(t).expect("valid site token"))
                .collect(),
            concentration: None,
        })
        .collect();
    MonomerMatrix::build(&records, None).expect("valid fixture matrix")
}

/// A lattice backend that replays canned answers.
#[derive(Debug, Default, Clone)]
pub struct MockLattice {
    hilbert: Vec<Vec<i64>>,
    module: Vec<Vec<i64>>,
    recession: Vec<Vec<i64>>,
    fail: bool,
}

impl MockLattice {
    /// Answer Hilbert-basis queries with the given vectors.
    pub fn hilbert(vectors: Vec<Vec<i64>>) -> Self {
        MockLattice {
            hilbert: vectors,
            ..Default::default()
        }
    }

    /// Answer strict-slice queries with the given generators.
    pub fn slice(module: Vec<Vec<i64>>, recession: Vec<Vec<i64>>) -> Self {
        MockLattice {
            module,
            recession,
            ..Default::default()
        }
    }

    /// Fail every query; used to prove a path never reaches the solver.
    pub fn failing() -> Self {
        MockLattice {
            fail: true,
            ..Default::default()
        }
    }
}

impl LatticeBackend for MockLattice {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn hilbert_basis(
        &self,
        _problem: &HomogeneousProblem,
        _purpose: &str,
        _opts: &SolveOptions,
    ) -> SolverResult<Vec<Vec<i64>>> {
        if self.fail {
            return Err(SolverError::ProcessFailed {
                code: 1,
                stderr: "mock backend invoked".into(),
            });
        }
        Ok(self.hilbert.clone())
    }

    fn strict_slice(
        &self,
        _problem: &StrictSliceProblem,
        _purpose: &str,
        _opts: &SolveOptions,
    ) -> SolverResult<StrictSliceSolution> {
        if self.fail {
            return Err(SolverError::ProcessFailed {
                code: 1,
                stderr: "mock backend invoked".into(),
            });
        }
        Ok(StrictSliceSolution {
            module_generators: self.module.clone(),
            recession_basis: self.recession.clone(),
        })
    }
}
