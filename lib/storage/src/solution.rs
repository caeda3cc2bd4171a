//! Solution detail lookup.

use std::collections::{BTreeMap, HashMap};
use remedex_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Reference text for one solution. Missing sections serialize as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolutionDetail {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub characteristics: Option<String>,
    #[serde(default)]
    pub relations: Option<String>,
    /// Organ to symptom text.
    #[serde(default)]
    pub symptoms: Option<BTreeMap<String, String>>,
}

pub trait SolutionStore: Send + Sync {
    fn get(&self, name: &str) -> Result<SolutionDetail>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Solution details held in memory, keyed by exact solution name.
#[derive(Debug, Clone, Default)]
pub struct InMemorySolutionStore {
    solutions: HashMap<String, SolutionDetail>,
}

impl InMemorySolutionStore {
    pub fn new(solutions: impl IntoIterator<Item = (String, SolutionDetail)>) -> Self {
        Self { solutions: solutions.into_iter().collect() }
    }
}

impl SolutionStore for InMemorySolutionStore {
    fn get(&self, name: &str) -> Result<SolutionDetail> {
        self.solutions
            .get(name)
            .cloned()
            .ok_or_else(|| Error::SolutionNotFound(name.to_string()))
    }

    fn len(&self) -> usize {
        self.solutions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_and_not_found() {
        let store = InMemorySolutionStore::new([(
            "Arnica".to_string(),
            SolutionDetail { relations: Some("Compare Rhus".into()), ..Default::default() },
        )]);

        assert_eq!(store.get("Arnica").unwrap().relations.as_deref(), Some("Compare Rhus"));
        assert!(matches!(store.get("arnica"), Err(Error::SolutionNotFound(_))));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_missing_sections_serialize_as_null() {
        let json = serde_json::to_value(SolutionDetail::default()).unwrap();
        assert!(json["description"].is_null());
        assert!(json["symptoms"].is_null());
    }
}
