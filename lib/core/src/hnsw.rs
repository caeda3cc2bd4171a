use std::cmp::Ordering;
use std::collections::BinaryHeap;
use serde::{Deserialize, Serialize};
use crate::index::Distance;
use crate::{Error, Result};

/// Bit vector for visited node tracking, one per search.
struct VisitedSet {
    bits: Vec<u64>,
}

impl VisitedSet {
    #[inline]
    fn new(capacity: usize) -> Self {
        Self { bits: vec![0; (capacity + 63) / 64] }
    }

    /// Returns true if `idx` was not yet visited.
    #[inline]
    fn insert(&mut self, idx: usize) -> bool {
        let word = idx / 64;
        if word >= self.bits.len() {
            self.bits.resize(word + 1, 0);
        }
        let mask = 1u64 << (idx % 64);
        let fresh = self.bits[word] & mask == 0;
        self.bits[word] |= mask;
        fresh
    }

    #[inline]
    fn contains(&self, idx: usize) -> bool {
        self.bits
            .get(idx / 64)
            .map(|w| w & (1u64 << (idx % 64)) != 0)
            .unwrap_or(false)
    }
}

/// Candidate for search with distance
#[derive(Clone, Copy)]
struct Candidate {
    idx: usize,
    dist: f32,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.dist == other.dist && self.idx == other.idx
    }
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: smaller distance = higher priority
        other.dist.partial_cmp(&self.dist).unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Reverse candidate for max-heap (furthest first)
#[derive(Clone, Copy)]
struct ReverseCandidate {
    idx: usize,
    dist: f32,
}

impl PartialEq for ReverseCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.dist == other.dist && self.idx == other.idx
    }
}

impl Eq for ReverseCandidate {}

impl Ord for ReverseCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist.partial_cmp(&other.dist).unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for ReverseCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn admit_all(_: usize) -> bool {
    true
}

/// Graph construction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HnswParams {
    /// Links per node on upper layers; layer 0 keeps twice as many.
    pub max_connections: usize,
    pub max_layers: usize,
    pub ef_construction: usize,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            max_connections: 16,
            max_layers: 4,
            ef_construction: 200,
        }
    }
}

#[derive(Debug, Clone)]
struct HnswNode {
    layers: Vec<Vec<usize>>,
}

/// HNSW graph over contiguously stored vectors.
///
/// Node `i` corresponds to the `i`-th inserted vector, so callers keep their
/// own payloads in a parallel array. Search takes `&self`; the graph is
/// immutable once built.
pub struct HnswIndex {
    nodes: Vec<HnswNode>,
    vectors: Vec<f32>,
    dim: usize,
    distance: Distance,
    params: HnswParams,
    entry_point: Option<usize>,
    top_layer: usize,
}

impl HnswIndex {
    pub fn new(distance: Distance, params: HnswParams) -> Self {
        Self {
            nodes: Vec::new(),
            vectors: Vec::new(),
            dim: 0,
            distance,
            params: HnswParams {
                max_connections: params.max_connections.max(2),
                max_layers: params.max_layers.max(1),
                ef_construction: params.ef_construction.max(1),
            },
            entry_point: None,
            top_layer: 0,
        }
    }

    #[inline]
    fn get_vector(&self, node_idx: usize) -> &[f32] {
        let start = node_idx * self.dim;
        &self.vectors[start..start + self.dim]
    }

    #[inline]
    fn distance_to(&self, query: &[f32], node_idx: usize) -> f32 {
        self.distance.distance(query, self.get_vector(node_idx))
    }

    /// Select layer using exponential decay
    #[inline]
    fn select_layer(&self) -> usize {
        let mut layer = 0;
        while layer < self.params.max_layers - 1 && rand::random::<f32>() < 0.5 {
            layer += 1;
        }
        layer
    }

    #[inline]
    fn layer_capacity(&self, layer: usize) -> usize {
        if layer == 0 {
            self.params.max_connections * 2
        } else {
            self.params.max_connections
        }
    }

    /// Beam search on one layer. Returns up to `ef` nodes accepted by
    /// `admit`, nearest first.
    ///
    /// Rejected nodes are still traversed but never fill the beam, so the
    /// search keeps expanding until `ef` admitted nodes are found or the
    /// reachable graph is exhausted.
    fn search_layer(
        &self,
        query: &[f32],
        entry_point: usize,
        ef: usize,
        layer: usize,
        admit: &dyn Fn(usize) -> bool,
    ) -> Vec<(usize, f32)> {
        let mut visited = VisitedSet::new(self.nodes.len());
        let mut candidates: BinaryHeap<Candidate> = BinaryHeap::with_capacity(ef * 2);
        let mut results: BinaryHeap<ReverseCandidate> = BinaryHeap::with_capacity(ef + 1);

        let entry_dist = self.distance_to(query, entry_point);
        candidates.push(Candidate { idx: entry_point, dist: entry_dist });
        if admit(entry_point) {
            results.push(ReverseCandidate { idx: entry_point, dist: entry_dist });
        }
        visited.insert(entry_point);

        let mut worst_dist = results.peek().map_or(f32::INFINITY, |w| w.dist);

        while let Some(Candidate { idx: current_idx, dist: current_dist }) = candidates.pop() {
            if results.len() >= ef && current_dist > worst_dist {
                break;
            }

            let Some(neighbors) = self.nodes[current_idx].layers.get(layer) else {
                continue;
            };

            for &neighbor_idx in neighbors {
                if !visited.insert(neighbor_idx) {
                    continue;
                }
                let dist = self.distance_to(query, neighbor_idx);
                if results.len() < ef || dist < worst_dist {
                    candidates.push(Candidate { idx: neighbor_idx, dist });
                    if admit(neighbor_idx) {
                        results.push(ReverseCandidate { idx: neighbor_idx, dist });
                        if results.len() > ef {
                            results.pop();
                        }
                        if let Some(worst) = results.peek() {
                            worst_dist = worst.dist;
                        }
                    }
                }
            }
        }

        debug_assert!(visited.contains(entry_point));
        let mut result_vec: Vec<(usize, f32)> = results.into_iter().map(|c| (c.idx, c.dist)).collect();
        result_vec.sort_unstable_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        result_vec
    }

    /// Insert a vector and return its node index.
    ///
    /// The first vector fixes the dimension; later ones must match it.
    pub fn insert(&mut self, vector: &[f32]) -> Result<usize> {
        if vector.is_empty() {
            return Err(Error::InvalidDimension { expected: self.dim, actual: 0 });
        }
        if self.nodes.is_empty() {
            self.dim = vector.len();
        } else if vector.len() != self.dim {
            return Err(Error::InvalidDimension { expected: self.dim, actual: vector.len() });
        }

        let node_idx = self.nodes.len();
        let layer = self.select_layer();
        self.vectors.extend_from_slice(vector);
        self.nodes.push(HnswNode { layers: vec![Vec::new(); layer + 1] });

        let Some(mut entry) = self.entry_point else {
            self.entry_point = Some(node_idx);
            self.top_layer = layer;
            return Ok(node_idx);
        };

        // Greedy descent through layers above the new node's level
        let mut current_layer = self.top_layer;
        while current_layer > layer {
            if let Some(&(closest, _)) = self.search_layer(vector, entry, 1, current_layer, &admit_all).first() {
                entry = closest;
            }
            current_layer -= 1;
        }

        for l in (0..=layer.min(self.top_layer)).rev() {
            let candidates = self.search_layer(vector, entry, self.params.ef_construction, l, &admit_all);
            let neighbors: Vec<usize> = candidates
                .iter()
                .filter(|(idx, _)| *idx != node_idx)
                .take(self.layer_capacity(l))
                .map(|(idx, _)| *idx)
                .collect();

            for &neighbor_idx in &neighbors {
                self.link(neighbor_idx, node_idx, l);
            }
            self.nodes[node_idx].layers[l] = neighbors;

            if let Some(&(closest, _)) = candidates.first() {
                entry = closest;
            }
        }

        if layer > self.top_layer {
            self.top_layer = layer;
            self.entry_point = Some(node_idx);
        }
        Ok(node_idx)
    }

    /// Add `to` to `from`'s adjacency on `layer`, pruning the furthest links
    /// when the list exceeds capacity.
    fn link(&mut self, from: usize, to: usize, layer: usize) {
        let capacity = self.layer_capacity(layer);
        if layer >= self.nodes[from].layers.len() {
            return;
        }
        self.nodes[from].layers[layer].push(to);
        if self.nodes[from].layers[layer].len() <= capacity {
            return;
        }

        let base = self.get_vector(from).to_vec();
        let mut connections = std::mem::take(&mut self.nodes[from].layers[layer]);
        connections.sort_by(|&a, &b| {
            let dist_a = self.distance_to(&base, a);
            let dist_b = self.distance_to(&base, b);
            dist_a.partial_cmp(&dist_b).unwrap_or(Ordering::Equal)
        });
        connections.truncate(capacity);
        self.nodes[from].layers[layer] = connections;
    }

    /// Search for the `k` nearest nodes using a beam of width `ef`.
    ///
    /// Returns `(node_idx, distance)` pairs, nearest first.
    pub fn search(&self, query: &[f32], k: usize, ef: usize) -> Vec<(usize, f32)> {
        self.search_filtered(query, k, ef, &admit_all)
    }

    /// Like [`search`](Self::search), but only nodes accepted by `admit` are
    /// returned. The filter is applied during the layer-0 beam search rather
    /// than on its output.
    pub fn search_filtered(
        &self,
        query: &[f32],
        k: usize,
        ef: usize,
        admit: &dyn Fn(usize) -> bool,
    ) -> Vec<(usize, f32)> {
        let Some(mut entry) = self.entry_point else {
            return Vec::new();
        };
        if query.len() != self.dim || k == 0 {
            return Vec::new();
        }

        let mut current_layer = self.top_layer;
        while current_layer > 0 {
            if let Some(&(closest, _)) = self.search_layer(query, entry, 1, current_layer, &admit_all).first() {
                entry = closest;
            }
            current_layer -= 1;
        }

        let mut results = self.search_layer(query, entry, ef.max(k), 0, admit);
        results.truncate(k);
        results
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
