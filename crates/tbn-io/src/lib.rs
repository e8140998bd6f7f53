//! # tbn-io: Text Formats for the TBN Toolkit
//!
//! Parsers and emitters for the three file formats the toolkit speaks,
//! plus the safe arithmetic used by parametrized concentrations:
//!
//! - [`tbn_file`] - `.tbn` networks (monomer lines, `\UNITS:` header,
//!   `{{expr}}` concentration parametrization)
//! - [`polys_file`] - `.tbnpolys` polymer lists (paragraphs, `n | `
//!   multiplicity prefixes, `# μ:` trailers)
//! - [`polymat`] - `.tbnpolymat` polymer-matrix artifacts (hash-keyed
//!   cache with free-energy and concentration columns)
//! - [`filter_spec`] - filter constraint files (`CONTAINS` / `EXACTLY`)
//! - [`expr`] - the `{{expr}}` arithmetic evaluator
//!
//! All parsers return [`tbn_core::TbnError`] with line-level context.

pub mod expr;
pub mod filter_spec;
pub mod polymat;
pub mod polys_file;
pub mod tbn_file;

pub use expr::{eval_expr, substitute};
pub use filter_spec::{parse_filter_file, parse_filter_str, FilterConstraint};
pub use polymat::{format_concentration, read_polymat, write_polymat, PolymatArtifact};
pub use polys_file::{emit_polys_str, parse_polys_file, parse_polys_str, PolysEntry};
pub use tbn_file::{emit_tbn_str, parse_tbn_file, parse_tbn_str, TbnFile};
