//! Per-solution evidence accumulated from one query's neighbor rows.

use std::collections::HashMap;
use ahash::RandomState;
use ordered_float::OrderedFloat;
use remedex_core::NeighborMatch;
use smallvec::SmallVec;

/// Best similarity per organ or source.
pub type ScoreMap = HashMap<String, f64, RandomState>;

/// Evidence for one solution.
///
/// `organ_scores` and `source_scores` keep the best similarity seen per key;
/// `matching_organs`/`matching_sources` list the same keys in first-seen
/// order. `all_scores` keeps every contributing similarity.
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionAggregate {
    organ_scores: ScoreMap,
    source_scores: ScoreMap,
    matching_organs: Vec<String>,
    matching_sources: Vec<String>,
    all_scores: Vec<f64>,
}

impl SolutionAggregate {
    /// Seed an aggregate from its first match.
    pub fn from_match(m: &NeighborMatch) -> Self {
        let mut agg = Self {
            organ_scores: ScoreMap::with_capacity_and_hasher(4, RandomState::new()),
            source_scores: ScoreMap::with_capacity_and_hasher(1, RandomState::new()),
            matching_organs: Vec::with_capacity(4),
            matching_sources: Vec::with_capacity(1),
            all_scores: Vec::with_capacity(4),
        };
        agg.absorb(m);
        agg
    }

    /// Fold another match in.
    pub fn absorb(&mut self, m: &NeighborMatch) {
        self.all_scores.push(m.similarity);
        keep_max(&mut self.organ_scores, &mut self.matching_organs, &m.organ_name, m.similarity);
        keep_max(&mut self.source_scores, &mut self.matching_sources, &m.source, m.similarity);
    }

    pub fn match_count(&self) -> usize {
        self.all_scores.len()
    }

    pub fn all_scores(&self) -> &[f64] {
        &self.all_scores
    }

    pub fn organ_scores(&self) -> &ScoreMap {
        &self.organ_scores
    }

    pub fn source_scores(&self) -> &ScoreMap {
        &self.source_scores
    }

    pub fn matching_organs(&self) -> &[String] {
        &self.matching_organs
    }

    pub fn matching_sources(&self) -> &[String] {
        &self.matching_sources
    }

    /// Mean of every contributing similarity.
    pub fn avg_score(&self) -> f64 {
        if self.all_scores.is_empty() {
            return 0.0;
        }
        self.all_scores.iter().sum::<f64>() / self.all_scores.len() as f64
    }

    /// The `n` best per-organ scores, highest first.
    pub fn top_organ_scores(&self, n: usize) -> SmallVec<[f64; 3]> {
        let mut scores: SmallVec<[f64; 8]> = self.organ_scores.values().copied().collect();
        scores.sort_unstable_by_key(|s| std::cmp::Reverse(OrderedFloat(*s)));
        scores.into_iter().take(n).collect()
    }
}

fn keep_max(scores: &mut ScoreMap, seen: &mut Vec<String>, key: &str, similarity: f64) {
    match scores.get_mut(key) {
        Some(best) => {
            if similarity > *best {
                *best = similarity;
            }
        }
        None => {
            scores.insert(key.to_string(), similarity);
            seen.push(key.to_string());
        }
    }
}

/// Aggregates keyed by solution name, in order of first appearance.
#[derive(Debug, Clone, Default)]
pub struct Aggregates {
    entries: Vec<(String, SolutionAggregate)>,
    positions: HashMap<String, usize, RandomState>,
}

impl Aggregates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route one match to its solution's aggregate, creating it if needed.
    pub fn add(mut self, m: &NeighborMatch) -> Self {
        match self.positions.get(&m.solution_name) {
            Some(&pos) => self.entries[pos].1.absorb(m),
            None => {
                self.positions.insert(m.solution_name.clone(), self.entries.len());
                self.entries.push((m.solution_name.clone(), SolutionAggregate::from_match(m)));
            }
        }
        self
    }

    pub fn get(&self, solution: &str) -> Option<&SolutionAggregate> {
        self.positions.get(solution).map(|&pos| &self.entries[pos].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SolutionAggregate)> {
        self.entries.iter().map(|(name, agg)| (name.as_str(), agg))
    }
}

impl IntoIterator for Aggregates {
    type Item = (String, SolutionAggregate);
    type IntoIter = std::vec::IntoIter<(String, SolutionAggregate)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Group neighbor rows by solution in a single pass. Never drops a match.
pub fn aggregate<'a, I>(matches: I) -> Aggregates
where
    I: IntoIterator<Item = &'a NeighborMatch>,
{
    matches.into_iter().fold(Aggregates::new(), Aggregates::add)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn m(solution: &str, organ: &str, source: &str, similarity: f64) -> NeighborMatch {
        NeighborMatch::new(solution, organ, source, similarity)
    }

    fn sample() -> Vec<NeighborMatch> {
        vec![
            m("S1", "head", "src1", 0.9),
            m("S1", "chest", "src1", 0.85),
            m("S2", "head", "src1", 0.5),
        ]
    }

    fn organ_set(agg: &SolutionAggregate) -> BTreeSet<String> {
        agg.matching_organs().iter().cloned().collect()
    }

    #[test]
    fn test_worked_example() {
        let aggregates = aggregate(&sample());
        assert_eq!(aggregates.len(), 2);

        let s1 = aggregates.get("S1").unwrap();
        assert_eq!(s1.match_count(), 2);
        assert_eq!(organ_set(s1), BTreeSet::from(["head".to_string(), "chest".to_string()]));
        assert!((s1.avg_score() - 0.875).abs() < 1e-12);

        let s2 = aggregates.get("S2").unwrap();
        assert_eq!(s2.match_count(), 1);
        assert!((s2.avg_score() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_first_match_seeds_organ_and_source_scores() {
        let agg = SolutionAggregate::from_match(&m("S1", "head", "src1", 0.4));
        assert_eq!(agg.organ_scores().get("head"), Some(&0.4));
        assert_eq!(agg.source_scores().get("src1"), Some(&0.4));
        assert_eq!(agg.match_count(), 1);
    }

    #[test]
    fn test_keeps_maximum_per_organ_and_source() {
        let matches = vec![
            m("S1", "head", "a", 0.3),
            m("S1", "head", "b", 0.8),
            m("S1", "head", "a", 0.6),
        ];
        let aggregates = aggregate(&matches);
        let agg = aggregates.get("S1").unwrap();
        assert_eq!(agg.match_count(), 3);
        assert_eq!(agg.all_scores(), &[0.3, 0.8, 0.6]);
        assert_eq!(agg.organ_scores().get("head"), Some(&0.8));
        assert_eq!(agg.source_scores().get("a"), Some(&0.6));
        assert_eq!(agg.source_scores().get("b"), Some(&0.8));
        assert_eq!(agg.matching_organs(), &["head".to_string()]);
        assert_eq!(agg.matching_sources(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_invariants_hold() {
        let matches = vec![
            m("S1", "head", "a", 0.3),
            m("S2", "chest", "b", 0.7),
            m("S1", "Back (lower)", "b", 0.9),
            m("S1", "head", "a", 0.1),
        ];
        for (_, agg) in aggregate(&matches) {
            assert!(agg.match_count() >= 1);
            assert_eq!(agg.match_count(), agg.all_scores().len());
            for organ in agg.organ_scores().keys() {
                assert!(agg.matching_organs().contains(organ));
            }
            for source in agg.source_scores().keys() {
                assert!(agg.matching_sources().contains(source));
            }
            assert!(agg.all_scores().iter().all(|s| (0.0..=1.0).contains(s)));
        }
    }

    #[test]
    fn test_order_independence() {
        let forward = sample();
        let mut reversed = sample();
        reversed.reverse();
        let rotated = vec![forward[1].clone(), forward[2].clone(), forward[0].clone()];

        let base = aggregate(&forward);
        for permutation in [reversed, rotated] {
            let other = aggregate(&permutation);
            assert_eq!(other.len(), base.len());
            for (name, agg) in base.iter() {
                let o = other.get(name).unwrap();
                assert_eq!(o.match_count(), agg.match_count());
                assert_eq!(o.organ_scores(), agg.organ_scores());
                assert_eq!(o.source_scores(), agg.source_scores());
                assert_eq!(organ_set(o), organ_set(agg));
                assert!((o.avg_score() - agg.avg_score()).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_first_appearance_order() {
        let matches = vec![m("B", "head", "a", 0.3), m("A", "head", "a", 0.3), m("B", "chest", "a", 0.2)];
        let names: Vec<String> = aggregate(&matches).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["B".to_string(), "A".to_string()]);
    }

    #[test]
    fn test_top_organ_scores() {
        let matches = vec![
            m("S", "a", "x", 0.2),
            m("S", "b", "x", 0.9),
            m("S", "c", "x", 0.5),
            m("S", "d", "x", 0.7),
        ];
        let aggregates = aggregate(&matches);
        let top = aggregates.get("S").unwrap().top_organ_scores(3);
        assert_eq!(top.as_slice(), &[0.9, 0.7, 0.5]);
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate(&Vec::<NeighborMatch>::new()).is_empty());
    }
}
