use std::collections::BTreeSet;

/// Known reference sources, lowercased, de-duplicated and sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceRegistry {
    sources: Vec<String>,
}

impl SourceRegistry {
    pub fn new<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let sources: BTreeSet<String> = sources
            .into_iter()
            .map(|s| s.as_ref().trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        Self { sources: sources.into_iter().collect() }
    }

    pub fn list(&self) -> &[String] {
        &self.sources
    }

    pub fn contains(&self, source: &str) -> bool {
        self.sources.binary_search(&source.to_lowercase()).is_ok()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_normalizes() {
        let registry = SourceRegistry::new(["Clarke", "boericke", "CLARKE", " ", "Allen "]);
        assert_eq!(registry.list(), ["allen", "boericke", "clarke"]);
        assert!(registry.contains("Boericke"));
        assert!(!registry.contains("kent"));
    }
}
