//! Symptom records stored in the index and the neighbor rows it returns.

use serde::{Deserialize, Serialize};
use crate::vector::Vector;

/// One embedded symptom description belonging to a solution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymptomRecord {
    pub solution_name: String,
    /// Organ label as it appears in the source data, before normalization.
    pub organ_name: String,
    pub source: String,
    pub vector: Vector,
}

impl SymptomRecord {
    #[must_use]
    pub fn new(
        solution_name: impl Into<String>,
        organ_name: impl Into<String>,
        source: impl Into<String>,
        vector: Vector,
    ) -> Self {
        Self {
            solution_name: solution_name.into(),
            organ_name: organ_name.into(),
            source: source.into(),
            vector,
        }
    }
}

/// A single nearest-neighbor hit, scoped to one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborMatch {
    pub solution_name: String,
    /// Letters only, see [`normalize_organ`].
    pub organ_name: String,
    pub source: String,
    /// Index similarity, clamped to [0, 1].
    pub similarity: f64,
}

impl NeighborMatch {
    /// Build a match from raw index output, normalizing the organ label and
    /// clamping the score.
    #[must_use]
    pub fn new(
        solution_name: impl Into<String>,
        raw_organ: &str,
        source: impl Into<String>,
        similarity: f64,
    ) -> Self {
        let similarity = if similarity.is_nan() { 0.0 } else { similarity.clamp(0.0, 1.0) };
        Self {
            solution_name: solution_name.into(),
            organ_name: normalize_organ(raw_organ),
            source: source.into(),
            similarity,
        }
    }

    #[must_use]
    pub fn from_record(record: &SymptomRecord, similarity: f64) -> Self {
        Self::new(
            record.solution_name.clone(),
            &record.organ_name,
            record.source.clone(),
            similarity,
        )
    }
}

/// Strip everything except ASCII letters, then trim.
///
/// `"Head (Internal)"` becomes `"HeadInternal"`, `" 12 "` becomes `""`.
pub fn normalize_organ(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .trim()
        .to_string()
}
