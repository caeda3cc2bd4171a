// Source filtering for symptom retrieval
use std::collections::BTreeSet;
use crate::{Error, Result, SymptomRecord};

pub trait Filter: Send + Sync {
    fn matches(&self, record: &SymptomRecord) -> bool;
}

/// Restricts retrieval to records from a set of sources.
///
/// An empty filter admits every record. Sources are compared
/// case-insensitively; identifiers are stored lowercased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFilter {
    sources: BTreeSet<String>,
}

impl SourceFilter {
    /// A filter that admits everything.
    pub fn any() -> Self {
        Self::default()
    }

    /// Build from caller-supplied identifiers. Blank entries are rejected.
    pub fn new<I, S>(sources: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for source in sources {
            let source = source.as_ref().trim();
            if source.is_empty() {
                return Err(Error::InvalidFilter("source identifiers must not be blank".into()));
            }
            set.insert(source.to_lowercase());
        }
        Ok(Self { sources: set })
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn admits(&self, source: &str) -> bool {
        self.sources.is_empty() || self.sources.contains(&source.to_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(String::as_str)
    }
}

impl Filter for SourceFilter {
    fn matches(&self, record: &SymptomRecord) -> bool {
        self.admits(&record.source)
    }
}
