//! Insert-or-fail helpers for name-keyed maps.
//!
//! Each validation pass builds its own maps and trackers; nothing here is
//! shared between passes.

use crate::Result;
use crate::config_bail;

use std::collections::{BTreeMap, BTreeSet};

/// Insert `value` under `name`, failing with `"<what> name <name> used twice"`
/// if the name is already taken.
pub fn insert_unique<V>(
    map: &mut BTreeMap<String, V>,
    name: String,
    value: V,
    what: &str,
) -> Result<()> {
    if map.contains_key(&name) {
        config_bail!("{} name {} used twice", what, name);
    }
    map.insert(name, value);
    Ok(())
}

/// Tracks names that must be unique across several entity kinds, e.g.
/// nodes and node pools, or jobs and services.
#[derive(Debug)]
pub struct UniqueNames {
    names: BTreeSet<String>,
    message: &'static str,
}

impl UniqueNames {
    pub fn new(message: &'static str) -> Self {
        Self {
            names: BTreeSet::new(),
            message,
        }
    }

    pub fn claim(&mut self, name: &str) -> Result<()> {
        if !self.names.insert(name.to_string()) {
            config_bail!("{} {}", self.message, name);
        }
        Ok(())
    }

    pub fn into_names(self) -> BTreeSet<String> {
        self.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_unique_rejects_duplicates() {
        let mut map = BTreeMap::new();
        insert_unique(&mut map, "a".to_string(), 1, "Job").unwrap();
        let err = insert_unique(&mut map, "a".to_string(), 2, "Job").unwrap_err();
        assert_eq!(err.to_string(), "Job name a used twice");
        assert_eq!(map["a"], 1);
    }

    #[test]
    fn claims_are_shared_across_kinds() {
        let mut names = UniqueNames::new("Node and NodePool names must be unique");
        names.claim("sameName").unwrap();
        let err = names.claim("sameName").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Node and NodePool names must be unique sameName"
        );
    }
}
