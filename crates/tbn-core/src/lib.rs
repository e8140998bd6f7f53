//! # tbn-core: Thermodynamic Binding Network Model Core
//!
//! Fundamental data structures for TBN analysis: binding sites, monomers,
//! the integer monomer matrix, polymers, and free energies.
//!
//! ## Design Philosophy
//!
//! A TBN is reduced to exact integer linear algebra:
//! - **Binding sites** are rows; star and unstar occurrences of a base name
//!   contribute −1 and +1 to a monomer's signed count vector.
//! - **Monomers** are columns of the matrix A; equality is vector equality.
//! - **Polymers** are non-negative multiplicity vectors over the monomer
//!   columns; every basis polymer satisfies `A·x ≥ 0` (all stars bound).
//! - **Free energy** is `−bonds` with an optional association penalty.
//!
//! Everything in this crate is exact `i64` arithmetic with overflow
//! detection; floating point appears only at the concentration boundary
//! (declared concentrations and ΔG output).
//!
//! ## Modules
//!
//! - [`site`] - Binding-site tokens and name validation
//! - [`monomer`] - Parsed monomer records
//! - [`matrix`] - The monomer matrix, star-limiting check, canonical hash
//! - [`polymer`] - Polymer vectors and the dense polymer-basis store
//! - [`energy`] - Bond counting and ΔG
//! - [`units`] - Concentration units and the mole-fraction reference
//! - [`error`] - Unified error type and exit codes

pub mod energy;
pub mod error;
pub mod matrix;
pub mod monomer;
pub mod polymer;
pub mod site;
pub mod units;

pub use energy::{AssocPenalty, EnergyModel};
pub use error::{TbnError, TbnResult};
pub use matrix::MonomerMatrix;
pub use monomer::MonomerRecord;
pub use polymer::{check_basis_member, render_polymer, PolymerBasis};
pub use site::{validate_name, BindingSite, RESERVED_NAME_CHARS};
pub use units::{ConcUnit, RHO_WATER_MOLAR};
