//! Concentration units.
//!
//! Declared by the `\UNITS:` header of a `.tbn` file and carried through
//! the polymer-matrix artifact. All conversion factors are exact powers of
//! ten, so round-tripping a value through Molar and back multiplies by
//! exactly 1.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference density of water at 37 °C, in Molar. Mole fractions are
/// concentrations divided by this value.
pub const RHO_WATER_MOLAR: f64 = 55.14;

/// Concentration unit declared in a `.tbn` file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConcUnit {
    Picomolar,
    Nanomolar,
    Micromolar,
    Millimolar,
    Molar,
}

impl ConcUnit {
    /// Parse a unit symbol as it appears in a `\UNITS:` header.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pM" => Some(ConcUnit::Picomolar),
            "nM" => Some(ConcUnit::Nanomolar),
            "uM" => Some(ConcUnit::Micromolar),
            "mM" => Some(ConcUnit::Millimolar),
            "M" => Some(ConcUnit::Molar),
            _ => None,
        }
    }

    /// The header symbol for this unit.
    pub fn symbol(&self) -> &'static str {
        match self {
            ConcUnit::Picomolar => "pM",
            ConcUnit::Nanomolar => "nM",
            ConcUnit::Micromolar => "uM",
            ConcUnit::Millimolar => "mM",
            ConcUnit::Molar => "M",
        }
    }

    /// Power of ten relating this unit to Molar (`value × 10^exponent` M).
    pub fn exponent(&self) -> i32 {
        match self {
            ConcUnit::Picomolar => -12,
            ConcUnit::Nanomolar => -9,
            ConcUnit::Micromolar => -6,
            ConcUnit::Millimolar => -3,
            ConcUnit::Molar => 0,
        }
    }

    /// Convert a value in this unit to Molar.
    pub fn to_molar(&self, value: f64) -> f64 {
        value * 10f64.powi(self.exponent())
    }

    /// Convert a value in Molar to this unit.
    pub fn from_molar(&self, molar: f64) -> f64 {
        molar * 10f64.powi(-self.exponent())
    }
}

impl fmt::Display for ConcUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_symbols() {
        assert_eq!(ConcUnit::parse("nM"), Some(ConcUnit::Nanomolar));
        assert_eq!(ConcUnit::parse("pM"), Some(ConcUnit::Picomolar));
        assert_eq!(ConcUnit::parse("uM"), Some(ConcUnit::Micromolar));
        assert_eq!(ConcUnit::parse("mM"), Some(ConcUnit::Millimolar));
        assert_eq!(ConcUnit::parse("M"), Some(ConcUnit::Molar));
        assert_eq!(ConcUnit::parse("kM"), None);
    }

    #[test]
    fn test_round_trip_is_exact() {
        for unit in [
            ConcUnit::Picomolar,
            ConcUnit::Nanomolar,
            ConcUnit::Micromolar,
            ConcUnit::Millimolar,
            ConcUnit::Molar,
        ] {
            let v = 12.5;
            // Power-of-ten factors round-trip without drift
            assert_eq!(unit.from_molar(unit.to_molar(v)), v);
        }
    }

    #[test]
    fn test_nanomolar_to_molar() {
        assert_eq!(ConcUnit::Nanomolar.to_molar(100.0), 1e-7);
    }

    #[test]
    fn test_serde_round_trip() {
        let json = serde_json::to_string(&ConcUnit::Micromolar).unwrap();
        let back: ConcUnit = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ConcUnit::Micromolar);
    }
}
