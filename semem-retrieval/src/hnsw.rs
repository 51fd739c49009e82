//! The in-memory approximate-nearest-neighbor index behind the similarity
//! strategy of the Hybrid Retriever (C10, §4.10 point 1).
//!
//! No external vector database is in scope for this spec (§9 dependency
//! note), so this is a small hierarchical-navigable-small-world index
//! reimplemented in-crate: a handful of probabilistically-assigned layers,
//! greedy descent to the nearest entry point per layer, and an `efSearch`-
//! bounded candidate expansion at layer 0. Distance is cosine; neighbor
//! lists cap at `m` per node (`m * 2` at layer 0, the usual HNSW tweak).
//!
//! Guarded by a single `RwLock` per §5 ("searches share; inserts take the
//! write lock briefly"). Deletion is mark-and-sweep: `delete` tombstones in
//! place so in-flight searches never observe a half-removed node, and
//! `sweep` rebuilds the graph without tombstoned entries.

use std::collections::{BinaryHeap, HashMap};

use parking_lot::RwLock;
use rand::Rng;

/// Tuning knobs named directly in §4.10 ("configurable M, efConstruction,
/// efSearch").
#[derive(Debug, Clone, Copy)]
pub struct HnswConfig {
    pub m: usize,
    pub ef_construction: usize,
    pub ef_search: usize,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self { m: 16, ef_construction: 200, ef_search: 64 }
    }
}

struct Node {
    uri: String,
    embedding: Vec<f32>,
    deleted: bool,
}

struct Inner {
    nodes: Vec<Node>,
    /// layer -> node id -> neighbor node ids, capped at `m` (`2*m` at layer 0).
    layers: Vec<HashMap<usize, Vec<usize>>>,
    uri_to_id: HashMap<String, usize>,
    entry_point: Option<usize>,
    live_count: usize,
    tombstones: usize,
}

impl Inner {
    fn new() -> Self {
        Self { nodes: Vec::new(), layers: vec![HashMap::new()], uri_to_id: HashMap::new(), entry_point: None, live_count: 0, tombstones: 0 }
    }
}

/// Hierarchical navigable small world index over `(uri, embedding)` pairs
/// (§4.10: "holds ... for all processed interactions, concept corpuscles,
/// and chunks").
pub struct HnswIndex {
    config: HnswConfig,
    inner: RwLock<Inner>,
}

impl HnswIndex {
    #[must_use]
    pub fn new(config: HnswConfig) -> Self {
        Self { config, inner: RwLock::new(Inner::new()) }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().live_count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Incremental insert (§4.10: "Build is incremental"). Re-inserting an
    /// already-present URI replaces its embedding in place rather than
    /// creating a duplicate node.
    pub fn insert(&self, uri: &str, embedding: Vec<f32>) {
        let mut inner = self.inner.write();
        if let Some(&id) = inner.uri_to_id.get(uri) {
            inner.nodes[id].embedding = embedding;
            inner.nodes[id].deleted = false;
            return;
        }

        let id = inner.nodes.len();
        let layer = assign_layer(self.config.m);
        inner.nodes.push(Node { uri: uri.to_string(), embedding, deleted: false });
        inner.uri_to_id.insert(uri.to_string(), id);
        inner.live_count += 1;
        while inner.layers.len() <= layer {
            inner.layers.push(HashMap::new());
        }

        let Some(entry) = inner.entry_point else {
            inner.entry_point = Some(id);
            for l in &mut inner.layers {
                l.entry(id).or_default();
            }
            return;
        };

        let top_layer = inner.layers.len() - 1;
        let mut cur = entry;
        for l in (0..=top_layer).rev() {
            if l > layer {
                cur = greedy_descend(&inner, l, cur, &inner.nodes[id].embedding.clone());
                continue;
            }
            let ef = self.config.ef_construction;
            let cap = if l == 0 { self.config.m * 2 } else { self.config.m };
            let query = inner.nodes[id].embedding.clone();
            let candidates = search_layer(&inner, l, cur, &query, ef);
            let neighbors: Vec<usize> = candidates.into_iter().take(cap).map(|(nid, _)| nid).collect();
            for &n in &neighbors {
                inner.layers[l].entry(id).or_default().push(n);
                let back = inner.layers[l].entry(n).or_default();
                back.push(id);
                if back.len() > cap {
                    let q2 = inner.nodes[n].embedding.clone();
                    let mut scored: Vec<(usize, f32)> = back.iter().map(|&o| (o, distance(&q2, &inner.nodes[o].embedding))).collect();
                    scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
                    scored.truncate(cap);
                    *back = scored.into_iter().map(|(o, _)| o).collect();
                }
            }
            if let Some(&best) = neighbors.first() {
                cur = best;
            }
        }
        if layer > top_layer {
            inner.entry_point = Some(id);
        }
    }

    /// Mark-and-sweep deletion: tombstone now, physically removed by the
    /// next [`Self::sweep`].
    pub fn delete(&self, uri: &str) {
        let mut inner = self.inner.write();
        if let Some(&id) = inner.uri_to_id.get(uri) {
            if !inner.nodes[id].deleted {
                inner.nodes[id].deleted = true;
                inner.live_count = inner.live_count.saturating_sub(1);
                inner.tombstones += 1;
            }
        }
    }

    /// Rebuild the graph excluding tombstoned nodes. O(n log n); intended
    /// to run periodically, not per-delete.
    pub fn sweep(&self) {
        let mut inner = self.inner.write();
        if inner.tombstones == 0 {
            return;
        }
        let surviving: Vec<(String, Vec<f32>)> =
            inner.nodes.iter().filter(|n| !n.deleted).map(|n| (n.uri.clone(), n.embedding.clone())).collect();
        *inner = Inner::new();
        drop(inner);
        for (uri, embedding) in surviving {
            self.insert(&uri, embedding);
        }
    }

    /// Approximate top-k by cosine similarity (§4.10 strategy 1). Returns
    /// `(uri, similarity)` pairs, descending.
    #[must_use]
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(String, f32)> {
        if k == 0 {
            return Vec::new();
        }
        let inner = self.inner.read();
        let Some(entry) = inner.entry_point else { return Vec::new() };
        let top_layer = inner.layers.len() - 1;
        let mut cur = entry;
        for l in (1..=top_layer).rev() {
            cur = greedy_descend(&inner, l, cur, query);
        }
        let ef = self.config.ef_search.max(k);
        let candidates = search_layer(&inner, 0, cur, query, ef);
        candidates
            .into_iter()
            .filter(|(id, _)| !inner.nodes[*id].deleted)
            .take(k)
            .map(|(id, dist)| (inner.nodes[id].uri.clone(), 1.0 - dist))
            .collect()
    }
}

/// Layer assignment per the standard HNSW exponential decay: `P(layer=l)
/// \propto exp(-l / (1/ln(m)))`.
fn assign_layer(m: usize) -> usize {
    let m = m.max(2) as f64;
    let level_mult = 1.0 / m.ln();
    let r: f64 = rand::thread_rng().gen_range(f64::EPSILON..1.0);
    (-r.ln() * level_mult).floor() as usize
}

#[must_use]
pub fn distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn greedy_descend(inner: &Inner, layer: usize, start: usize, query: &[f32]) -> usize {
    let mut cur = start;
    let mut cur_dist = distance(query, &inner.nodes[cur].embedding);
    loop {
        let mut improved = false;
        if let Some(neighbors) = inner.layers[layer].get(&cur) {
            for &n in neighbors {
                let d = distance(query, &inner.nodes[n].embedding);
                if d < cur_dist {
                    cur_dist = d;
                    cur = n;
                    improved = true;
                }
            }
        }
        if !improved {
            return cur;
        }
    }
}

#[derive(PartialEq)]
struct ScoredId(usize, f32);
impl Eq for ScoredId {}
impl Ord for ScoredId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.1.partial_cmp(&other.1).unwrap_or(std::cmp::Ordering::Equal)
    }
}
impl PartialOrd for ScoredId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Best-first expansion bounded by `ef`, returning candidates sorted by
/// ascending distance.
fn search_layer(inner: &Inner, layer: usize, entry: usize, query: &[f32], ef: usize) -> Vec<(usize, f32)> {
    let mut visited = std::collections::HashSet::new();
    visited.insert(entry);
    let entry_dist = distance(query, &inner.nodes[entry].embedding);
    let mut candidates = BinaryHeap::new();
    candidates.push(std::cmp::Reverse(ScoredId(entry, entry_dist)));
    let mut found: Vec<(usize, f32)> = vec![(entry, entry_dist)];

    while let Some(std::cmp::Reverse(ScoredId(cur, cur_dist))) = candidates.pop() {
        if found.len() >= ef {
            let worst = found.iter().map(|(_, d)| *d).fold(f32::MIN, f32::max);
            if cur_dist > worst {
                break;
            }
        }
        if let Some(neighbors) = inner.layers[layer].get(&cur) {
            for &n in neighbors {
                if visited.insert(n) {
                    let d = distance(query, &inner.nodes[n].embedding);
                    candidates.push(std::cmp::Reverse(ScoredId(n, d)));
                    found.push((n, d));
                }
            }
        }
    }
    found.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    found.truncate(ef);
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> HnswIndex {
        HnswIndex::new(HnswConfig { m: 4, ef_construction: 32, ef_search: 16 })
    }

    #[test]
    fn empty_index_search_is_empty() {
        let idx = index();
        assert!(idx.search(&[1.0, 0.0], 5).is_empty());
    }

    #[test]
    fn finds_exact_match_first() {
        let idx = index();
        idx.insert("a", vec![1.0, 0.0, 0.0]);
        idx.insert("b", vec![0.0, 1.0, 0.0]);
        idx.insert("c", vec![0.9, 0.1, 0.0]);
        let hits = idx.search(&[1.0, 0.0, 0.0], 2);
        assert_eq!(hits[0].0, "a");
        assert!(hits[0].1 > 0.99);
    }

    #[test]
    fn k_zero_returns_nothing() {
        let idx = index();
        idx.insert("a", vec![1.0, 0.0]);
        assert!(idx.search(&[1.0, 0.0], 0).is_empty());
    }

    #[test]
    fn delete_then_sweep_removes_from_results() {
        let idx = index();
        idx.insert("a", vec![1.0, 0.0, 0.0]);
        idx.insert("b", vec![0.0, 1.0, 0.0]);
        idx.delete("a");
        assert_eq!(idx.len(), 1);
        let hits = idx.search(&[1.0, 0.0, 0.0], 5);
        assert!(hits.iter().all(|(uri, _)| uri != "a"));
        idx.sweep();
        assert_eq!(idx.len(), 1);
        let hits = idx.search(&[1.0, 0.0, 0.0], 5);
        assert!(hits.iter().all(|(uri, _)| uri != "a"));
    }

    #[test]
    fn reinserting_same_uri_updates_embedding() {
        let idx = index();
        idx.insert("a", vec![1.0, 0.0, 0.0]);
        idx.insert("a", vec![0.0, 1.0, 0.0]);
        assert_eq!(idx.len(), 1);
        let hits = idx.search(&[0.0, 1.0, 0.0], 1);
        assert_eq!(hits[0].0, "a");
    }

    #[test]
    fn cosine_similarity_orthogonal_is_zero() {
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-6);
    }
}
