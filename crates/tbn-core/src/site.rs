//! Binding-site tokens.
//!
//! A binding site is a named token drawn from the user's alphabet, tagged
//! as `unstar` (`a`) or `star` (`a*`). The two forms on the same base name
//! are the complementary pair. Site names may not contain the characters
//! reserved by the text formats.

use crate::error::{TbnError, TbnResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Characters forbidden in binding-site and monomer names (whitespace is
/// also forbidden, checked separately).
pub const RESERVED_NAME_CHARS: &[char] = &[',', '>', '*', '|', ':', '\\'];

/// Validate a base name (binding site or monomer).
pub fn validate_name(name: &str) -> TbnResult<()> {
    if name.is_empty() {
        return Err(TbnError::Parse("empty name".into()));
    }
    if let Some(c) = name
        .chars()
        .find(|c| c.is_whitespace() || RESERVED_NAME_CHARS.contains(c))
    {
        return Err(TbnError::Parse(format!(
            "name `{name}` contains reserved character `{c}`"
        )));
    }
    Ok(())
}

/// One occurrence of a binding site within a monomer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BindingSite {
    /// Base name, without the star.
    pub base: String,
    /// Star (complement) form.
    pub star: bool,
}

impl BindingSite {
    /// Parse a site token, e.g. `a` or `a*`.
    pub fn parse(token: &str) -> TbnResult<Self> {
        let (base, star) = match token.strip_suffix('*') {
            Some(b) => (b, true),
            None => (token, false),
        };
        validate_name(base)?;
        Ok(BindingSite {
            base: base.to_string(),
            star,
        })
    }

    /// Signed contribution of this occurrence to the monomer vector:
    /// +1 for unstar, -1 for star.
    pub fn sign(&self) -> i64 {
        if self.star {
            -1
        } else {
            1
        }
    }
}

impl fmt::Display for BindingSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.star {
            write!(f, "{}*", self.base)
        } else {
            write!(f, "{}", self.base)
        }
    }
}
