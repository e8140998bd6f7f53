//! Monomer records.
//!
//! A monomer is an ordered record of (optional name, binding-site
//! occurrence list, optional concentration). Its canonical representation
//! is the signed count vector over the distinct base sites: unstar
//! occurrences count +1, star occurrences -1, so `a a*` inside one monomer
//! cancels at the vector level. Two monomers are equal as monomers iff
//! their signed vectors are equal.

use crate::site::BindingSite;
use serde::{Deserialize, Serialize};

/// A monomer as parsed from a `.tbn` line, before matrix construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonomerRecord {
    /// Declared name, if any.
    pub name: Option<String>,
    /// Binding-site occurrences, in input order.
    pub sites: Vec<BindingSite>,
    /// Concentration in the declared units, if any.
    pub concentration: Option<f64>,
}

impl MonomerRecord {
    /// Render the raw site list, space separated, in input order.
    pub fn site_list(&self) -> String {
        let tokens: Vec<String> = self.sites.iter().map(|s| s.to_string()).collect();
        tokens.join(" ")
    }

    /// The label used for this monomer in human-facing output: its name if
    /// declared, otherwise the site list.
    pub fn label(&self) -> String {
        match &self.name {
            Some(n) => n.clone(),
            None => self.site_list(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(tok: &str) -> BindingSite {
        BindingSite::parse(tok).unwrap()
    }

    #[test]
    fn test_site_list_order_preserved() {
        let m = MonomerRecord {
            name: None,
            sites: vec![site("b*"), site("a")],
            concentration: None,
        };
        assert_eq!(m.site_list(), "b* a");
        assert_eq!(m.label(), "b* a");
    }

    #[test]
    fn test_label_prefers_name() {
        let m = MonomerRecord {
            name: Some("gate".into()),
            sites: vec![site("a")],
            concentration: Some(3.0),
        };
        assert_eq!(m.label(), "gate");
    }
}
