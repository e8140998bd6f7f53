//! Polymer free energies.
//!
//! Every basis polymer satisfies `A·x ≥ 0`, so all of its star sites are
//! bound and the bond count is
//! `bonds(x) = (total_sites(x) − unpaired_excess(x)) / 2`,
//! where `total_sites` sums `|A|·x` and `unpaired_excess` sums `A·x`. The
//! two sums are congruent mod 2 column by column, so the division is
//! exact. Free energy is `−bonds` plus an optional empirical association
//! penalty per extra monomer in the polymer.

use crate::error::{TbnError, TbnResult};
use crate::matrix::MonomerMatrix;

/// Temperature offset from °C to K.
const KELVIN_OFFSET: f64 = 273.15;
/// 37 °C in Kelvin, the reference temperature for ΔG_assoc.
const T37_KELVIN: f64 = 310.15;

/// Optional association penalty, in kcal/mol per polymer association.
///
/// `ΔG_assoc(T) = ΔH_assoc − T·ΔS` with `ΔS` fixed by the 37 °C anchor:
/// `ΔS = (ΔH_assoc − ΔG_assoc,37) / 310.15 K`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssocPenalty {
    /// ΔG of association at 37 °C.
    pub dg_assoc_37: f64,
    /// ΔH of association (temperature-independent).
    pub dh_assoc: f64,
}

impl AssocPenalty {
    /// Association ΔG at the given temperature in °C.
    pub fn dg_at(&self, temperature_c: f64) -> f64 {
        let t = temperature_c + KELVIN_OFFSET;
        let ds = (self.dh_assoc - self.dg_assoc_37) / T37_KELVIN;
        self.dh_assoc - t * ds
    }
}

/// Free-energy model: bond counting plus the optional association term.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyModel {
    pub penalty: Option<AssocPenalty>,
    /// Temperature in °C; only consulted when the penalty is enabled.
    pub temperature_c: f64,
}

impl Default for EnergyModel {
    fn default() -> Self {
        EnergyModel {
            penalty: None,
            temperature_c: 37.0,
        }
    }
}

impl EnergyModel {
    /// `1ᵀ|A|x`: total binding-site occurrences of the polymer (net of
    /// intra-monomer cancellation, which already happened at the vector
    /// level).
    pub fn total_sites(matrix: &MonomerMatrix, x: &[i64]) -> TbnResult<i64> {
        let mut total: i64 = 0;
        for (j, &mult) in x.iter().enumerate() {
            if mult == 0 {
                continue;
            }
            for &a in matrix.column(j) {
                let term = a
                    .abs()
                    .checked_mul(mult)
                    .ok_or(TbnError::ArithmeticOverflow("total-sites accumulator"))?;
                total = total
                    .checked_add(term)
                    .ok_or(TbnError::ArithmeticOverflow("total-sites accumulator"))?;
            }
        }
        Ok(total)
    }

    /// `1ᵀAx`: signed unpaired excess; zero iff the polymer is saturated.
    pub fn unpaired_excess(matrix: &MonomerMatrix, x: &[i64]) -> TbnResult<i64> {
        let excess = matrix.apply(x)?;
        let mut total: i64 = 0;
        for e in excess {
            total = total
                .checked_add(e)
                .ok_or(TbnError::ArithmeticOverflow("unpaired-excess accumulator"))?;
        }
        Ok(total)
    }

    /// Number of inter-monomer bonds in the polymer.
    pub fn bonds(matrix: &MonomerMatrix, x: &[i64]) -> TbnResult<i64> {
        let total = Self::total_sites(matrix, x)?;
        let unpaired = Self::unpaired_excess(matrix, x)?;
        let diff = total
            .checked_sub(unpaired)
            .ok_or(TbnError::ArithmeticOverflow("bond accumulator"))?;
        debug_assert_eq!(diff % 2, 0, "parity law violated");
        Ok(diff / 2)
    }

    /// ΔG of the polymer: `−bonds` plus the association penalty for each
    /// monomer beyond the first. Exactly `−bonds` when the penalty is
    /// disabled.
    pub fn delta_g(&self, matrix: &MonomerMatrix, x: &[i64]) -> TbnResult<f64> {
        let bonds = Self::bonds(matrix, x)?;
        let mut dg = -(bonds as f64);
        if let Some(penalty) = &self.penalty {
            let size: i64 = x.iter().sum();
            let associations = (size - 1).max(0);
            dg += associations as f64 * penalty.dg_at(self.temperature_c);
        }
        Ok(dg)
    }
}
