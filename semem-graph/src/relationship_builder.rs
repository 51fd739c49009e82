//! Relationship Builder (C9, §4.9): similarity / entity-match /
//! community-bridge sweeps over stored corpuscles, producing reified
//! `ragno:Relationship` edges.
//!
//! Grounded on `llmspell-graph::types::{Entity, Relationship}` for the edge
//! shape and `llmspell-graph::extraction::regex` for the "cheap, explicit
//! heuristic over a local-moving loop" texture this module follows for its
//! in-core Leiden skeleton (no external graph-algorithm crate is pulled in —
//! documented in DESIGN.md).

use std::collections::{HashMap, HashSet, VecDeque};

use semem_core::{ids::new_id, RelationshipType};

use crate::types::{Corpuscle, Relationship};

/// Tunables for one sweep (§4.9 defaults).
#[derive(Debug, Clone, Copy)]
pub struct SweepConfig {
    /// `tau_sim`: minimum cosine similarity for a `similarity` edge.
    pub similarity_threshold: f32,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self { similarity_threshold: 0.10 }
    }
}

/// Cosine similarity between two equal-length vectors. Returns 0.0 for a
/// zero-magnitude vector rather than NaN.
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

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f32 / union as f32
    }
}

/// Drives the three sweep strategies and normalizes the result per I4 ("for
/// any source entity, the sum of outgoing weights of one type is <= 1").
/// Stateless: takes a snapshot of corpuscles and returns the edges for the
/// caller to persist (typically via `semem-store`'s `SparqlStore::update`).
pub struct RelationshipBuilder {
    config: SweepConfig,
}

impl RelationshipBuilder {
    #[must_use]
    pub fn new(config: SweepConfig) -> Self {
        Self { config }
    }

    /// Run all three strategies for one sweep. Re-running with unchanged
    /// inputs produces the same edges modulo floating-point tolerance (§8).
    #[must_use]
    pub fn sweep(&self, corpuscles: &[Corpuscle]) -> Vec<Relationship> {
        let sweep_id = new_id();
        let mut edges = Vec::new();
        edges.extend(self.similarity_edges(corpuscles, &sweep_id));
        edges.extend(self.entity_match_edges(corpuscles, &sweep_id));
        let bridge_input = edges.clone();
        edges.extend(self.community_bridge_edges(corpuscles, &bridge_input, &sweep_id));
        normalize_outgoing_weights(&mut edges);
        edges
    }

    fn similarity_edges(&self, corpuscles: &[Corpuscle], sweep_id: &str) -> Vec<Relationship> {
        let mut edges = Vec::new();
        for i in 0..corpuscles.len() {
            for j in (i + 1)..corpuscles.len() {
                let (Some(a), Some(b)) = (&corpuscles[i].embedding, &corpuscles[j].embedding) else {
                    continue;
                };
                let sim = cosine_similarity(a, b);
                if sim >= self.config.similarity_threshold {
                    edges.push(Relationship::new(&corpuscles[i].uri, &corpuscles[j].uri, RelationshipType::Similarity, sim, sweep_id));
                    edges.push(Relationship::new(&corpuscles[j].uri, &corpuscles[i].uri, RelationshipType::Similarity, sim, sweep_id));
                }
            }
        }
        edges
    }

    fn entity_match_edges(&self, corpuscles: &[Corpuscle], sweep_id: &str) -> Vec<Relationship> {
        let labels: Vec<HashSet<String>> = corpuscles
            .iter()
            .map(|c| c.entity_labels.iter().map(|l| l.to_lowercase()).collect())
            .collect();
        let mut edges = Vec::new();
        for i in 0..corpuscles.len() {
            for j in (i + 1)..corpuscles.len() {
                if labels[i].is_empty() || labels[j].is_empty() {
                    continue;
                }
                if labels[i].is_disjoint(&labels[j]) {
                    continue;
                }
                let weight = jaccard(&labels[i], &labels[j]);
                edges.push(Relationship::new(&corpuscles[i].uri, &corpuscles[j].uri, RelationshipType::EntityMatch, weight, sweep_id));
                edges.push(Relationship::new(&corpuscles[j].uri, &corpuscles[i].uri, RelationshipType::EntityMatch, weight, sweep_id));
            }
        }
        edges
    }

    /// Community-bridge edges (§4.9): after a one-pass modularity
    /// local-moving community assignment over the `similarity`/`entity-match`
    /// adjacency, connect the highest-degree node of each pair of adjacent
    /// communities (a degree-centrality proxy for betweenness — a deliberate
    /// simplification over full betweenness centrality, documented in
    /// DESIGN.md), weighted `1/(graph_distance+1)`.
    fn community_bridge_edges(&self, corpuscles: &[Corpuscle], base_edges: &[Relationship], sweep_id: &str) -> Vec<Relationship> {
        let adjacency = build_adjacency(corpuscles, base_edges);
        if adjacency.len() < 2 {
            return Vec::new();
        }
        let communities = detect_communities(&adjacency);
        let mut by_community: HashMap<u32, Vec<&String>> = HashMap::new();
        for (node, community) in &communities {
            by_community.entry(*community).or_default().push(node);
        }

        // Which pairs of communities have at least one direct edge between them.
        let mut adjacent_pairs: HashSet<(u32, u32)> = HashSet::new();
        for (node, neighbors) in &adjacency {
            let Some(&c1) = communities.get(node) else { continue };
            for neighbor in neighbors.keys() {
                let Some(&c2) = communities.get(neighbor) else { continue };
                if c1 != c2 {
                    adjacent_pairs.insert((c1.min(c2), c1.max(c2)));
                }
            }
        }

        let mut edges = Vec::new();
        for (c1, c2) in adjacent_pairs {
            let (Some(nodes1), Some(nodes2)) = (by_community.get(&c1), by_community.get(&c2)) else { continue };
            let bridge1 = highest_degree_node(nodes1, &adjacency);
            let bridge2 = highest_degree_node(nodes2, &adjacency);
            let (Some(b1), Some(b2)) = (bridge1, bridge2) else { continue };
            let distance = shortest_path_length(&adjacency, b1, b2).unwrap_or(1);
            let weight = 1.0 / (distance as f32 + 1.0);
            edges.push(Relationship::new(b1, b2, RelationshipType::CommunityBridge, weight, sweep_id));
        }
        edges
    }
}

fn build_adjacency(corpuscles: &[Corpuscle], edges: &[Relationship]) -> HashMap<String, HashMap<String, f32>> {
    let mut adjacency: HashMap<String, HashMap<String, f32>> = HashMap::new();
    for c in corpuscles {
        adjacency.entry(c.uri.clone()).or_default();
    }
    for e in edges {
        adjacency.entry(e.source.clone()).or_default().insert(e.target.clone(), e.weight);
    }
    adjacency
}

/// One-pass modularity local-moving: each node starts in its own community
/// and moves to whichever neighboring community maximizes modularity gain,
/// iterating until no move improves the partition. This is the first phase
/// of Leiden/Louvain; the aggregation phase is intentionally omitted for
/// this scope (see DESIGN.md).
fn detect_communities(adjacency: &HashMap<String, HashMap<String, f32>>) -> HashMap<String, u32> {
    let nodes: Vec<String> = adjacency.keys().cloned().collect();
    let mut community: HashMap<String, u32> = nodes.iter().enumerate().map(|(i, n)| (n.clone(), i as u32)).collect();

    let total_weight: f32 = adjacency.values().map(|m| m.values().sum::<f32>()).sum::<f32>().max(1e-9);
    let degree: HashMap<&String, f32> = adjacency.iter().map(|(n, m)| (n, m.values().sum::<f32>())).collect();

    let mut improved = true;
    let mut pass = 0;
    while improved && pass < 20 {
        improved = false;
        pass += 1;
        for node in &nodes {
            let neighbors = &adjacency[node];
            if neighbors.is_empty() {
                continue;
            }
            let current_community = community[node];
            let mut best_community = current_community;
            let mut best_gain = 0.0f32;
            let mut candidate_communities: HashSet<u32> = HashSet::new();
            for neighbor in neighbors.keys() {
                candidate_communities.insert(community[neighbor]);
            }
            for candidate in candidate_communities {
                if candidate == current_community {
                    continue;
                }
                let k_i_in: f32 = neighbors.iter().filter(|(n, _)| community[*n] == candidate).map(|(_, w)| w).sum();
                let sigma_tot: f32 = nodes
                    .iter()
                    .filter(|n| community[*n] == candidate)
                    .map(|n| degree.get(n).copied().unwrap_or(0.0))
                    .sum();
                let k_i = degree.get(node).copied().unwrap_or(0.0);
                let gain = k_i_in - (sigma_tot * k_i) / total_weight;
                if gain > best_gain {
                    best_gain = gain;
                    best_community = candidate;
                }
            }
            if best_community != current_community {
                community.insert(node.clone(), best_community);
                improved = true;
            }
        }
    }
    community
}

fn highest_degree_node<'a>(nodes: &[&'a String], adjacency: &HashMap<String, HashMap<String, f32>>) -> Option<&'a str> {
    nodes
        .iter()
        .max_by(|a, b| {
            let da = adjacency.get(**a).map_or(0, HashMap::len);
            let db = adjacency.get(**b).map_or(0, HashMap::len);
            da.cmp(&db)
        })
        .map(|s| s.as_str())
}

fn shortest_path_length(adjacency: &HashMap<String, HashMap<String, f32>>, start: &str, goal: &str) -> Option<usize> {
    if start == goal {
        return Some(0);
    }
    let mut visited: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<(&str, usize)> = VecDeque::new();
    queue.push_back((start, 0));
    visited.insert(start);
    while let Some((node, dist)) = queue.pop_front() {
        let Some(neighbors) = adjacency.get(node) else { continue };
        for neighbor in neighbors.keys() {
            if neighbor == goal {
                return Some(dist + 1);
            }
            if visited.insert(neighbor.as_str()) {
                queue.push_back((neighbor, dist + 1));
            }
        }
    }
    None
}

/// Enforce I4: normalize per `(source, relationship_type)` so outgoing
/// weights of one type sum to at most 1.
fn normalize_outgoing_weights(edges: &mut [Relationship]) {
    let mut sums: HashMap<(String, RelationshipType), f32> = HashMap::new();
    for e in edges.iter() {
        *sums.entry((e.source.clone(), e.relationship_type)).or_insert(0.0) += e.weight;
    }
    for e in edges.iter_mut() {
        let sum = sums[&(e.source.clone(), e.relationship_type)];
        if sum > 1.0 {
            e.weight /= sum;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpuscle(uri: &str, embedding: Vec<f32>, labels: &[&str]) -> Corpuscle {
        Corpuscle { uri: uri.to_string(), embedding: Some(embedding), entity_labels: labels.iter().map(|s| s.to_string()).collect() }
    }

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    }

    #[test]
    fn similarity_sweep_emits_edges_above_threshold() {
        let builder = RelationshipBuilder::new(SweepConfig { similarity_threshold: 0.5 });
        let corpuscles = vec![
            corpuscle("http://a", vec![1.0, 0.0], &[]),
            corpuscle("http://b", vec![1.0, 0.0], &[]),
            corpuscle("http://c", vec![0.0, 1.0], &[]),
        ];
        let edges = builder.sweep(&corpuscles);
        let sim_edges: Vec<_> = edges.iter().filter(|e| e.relationship_type == RelationshipType::Similarity).collect();
        assert!(sim_edges.iter().any(|e| e.source == "http://a" && e.target == "http://b"));
        assert!(!sim_edges.iter().any(|e| (e.source == "http://a" || e.source == "http://b") && e.target == "http://c"));
    }

    #[test]
    fn entity_match_weight_is_jaccard() {
        let builder = RelationshipBuilder::new(SweepConfig::default());
        let corpuscles = vec![
            corpuscle("http://a", vec![], &["rust", "wasm"]),
            corpuscle("http://b", vec![], &["rust", "go"]),
        ];
        let edges = builder.sweep(&corpuscles);
        let e = edges.iter().find(|e| e.relationship_type == RelationshipType::EntityMatch && e.source == "http://a").unwrap();
        assert!((e.weight - (1.0 / 3.0)).abs() < 1e-6);
    }

    #[test]
    fn weights_stay_in_unit_interval() {
        let builder = RelationshipBuilder::new(SweepConfig::default());
        let corpuscles = vec![
            corpuscle("http://a", vec![1.0, 0.1], &["x"]),
            corpuscle("http://b", vec![1.0, 0.2], &["x"]),
            corpuscle("http://c", vec![0.9, 0.1], &["x"]),
        ];
        let edges = builder.sweep(&corpuscles);
        for e in &edges {
            assert!((0.0..=1.0).contains(&e.weight), "weight {} out of range", e.weight);
        }
    }

    #[test]
    fn outgoing_weights_per_type_sum_to_at_most_one() {
        let builder = RelationshipBuilder::new(SweepConfig { similarity_threshold: 0.0 });
        let corpuscles = vec![
            corpuscle("http://a", vec![1.0, 0.0], &[]),
            corpuscle("http://b", vec![0.99, 0.01], &[]),
            corpuscle("http://c", vec![0.98, 0.02], &[]),
            corpuscle("http://d", vec![0.97, 0.03], &[]),
        ];
        let edges = builder.sweep(&corpuscles);
        let mut sums: HashMap<(String, RelationshipType), f32> = HashMap::new();
        for e in &edges {
            *sums.entry((e.source.clone(), e.relationship_type)).or_insert(0.0) += e.weight;
        }
        for (_, sum) in sums {
            assert!(sum <= 1.0 + 1e-4, "sum {sum} exceeds 1");
        }
    }

    #[test]
    fn rerunning_sweep_on_unchanged_input_is_stable() {
        let builder = RelationshipBuilder::new(SweepConfig::default());
        let corpuscles = vec![
            corpuscle("http://a", vec![1.0, 0.0], &["x"]),
            corpuscle("http://b", vec![0.9, 0.1], &["x"]),
        ];
        let first = builder.sweep(&corpuscles);
        let second = builder.sweep(&corpuscles);
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.source, b.source);
            assert_eq!(a.target, b.target);
            assert!((a.weight - b.weight).abs() < 1e-5);
        }
    }
}
