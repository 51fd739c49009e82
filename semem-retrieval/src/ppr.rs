//! Personalized PageRank traversal, the third Hybrid Retriever strategy
//! (§4.10 point 3): "restricted to the subgraph induced by Relationship
//! edges, seeded at the top-1 similarity hit with restart probability
//! alpha = 0.15; iterate until the L1 change in the score vector < 1e-4 or
//! 50 iterations".
//!
//! Plain power iteration over a sparse adjacency map built from
//! `semem_graph::Relationship` edges; no external graph crate (DESIGN.md
//! notes neither the teacher nor the pack carries one that fits a reified-
//! edge RDF graph).

use std::collections::HashMap;

use semem_graph::Relationship;

pub const DEFAULT_ALPHA: f32 = 0.15;
pub const MAX_ITERATIONS: usize = 50;
pub const CONVERGENCE_EPSILON: f32 = 1e-4;

/// Directed, weighted adjacency built once per traversal call from the
/// relationships visible to the current query (§4.10: "subgraph induced by
/// Relationship edges").
pub struct Adjacency {
    out_edges: HashMap<String, Vec<(String, f32)>>,
    nodes: Vec<String>,
}

impl Adjacency {
    #[must_use]
    pub fn from_relationships(relationships: &[Relationship]) -> Self {
        let mut out_edges: HashMap<String, Vec<(String, f32)>> = HashMap::new();
        let mut node_set: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();
        for r in relationships {
            node_set.insert(r.source.clone());
            node_set.insert(r.target.clone());
            out_edges.entry(r.source.clone()).or_default().push((r.target.clone(), r.weight.max(0.0)));
            // Relationships are modeled as directed reified edges (§3), but
            // PageRank over a one-directional graph from a sweep that only
            // ever wrote A->B would starve every node but the sources; the
            // traversal strategy treats the induced subgraph as undirected.
            out_edges.entry(r.target.clone()).or_default().push((r.source.clone(), r.weight.max(0.0)));
        }
        Self { out_edges, nodes: node_set.into_iter().collect() }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Run personalized PageRank restarting at `seeds` (typically the top-1
/// similarity hit, §4.10). Returns a score per visited node, normalized to
/// sum to 1.
#[must_use]
pub fn personalized_pagerank(adj: &Adjacency, seeds: &[String], alpha: f32) -> HashMap<String, f32> {
    if adj.is_empty() || seeds.is_empty() {
        return HashMap::new();
    }
    let n = adj.nodes.len();
    let index: HashMap<&str, usize> = adj.nodes.iter().enumerate().map(|(i, u)| (u.as_str(), i)).collect();

    let mut restart = vec![0.0f32; n];
    let seed_ids: Vec<usize> = seeds.iter().filter_map(|s| index.get(s.as_str()).copied()).collect();
    if seed_ids.is_empty() {
        return HashMap::new();
    }
    let share = 1.0 / seed_ids.len() as f32;
    for &id in &seed_ids {
        restart[id] = share;
    }

    // Row-normalized transition weights per node, computed once.
    let transitions: Vec<Vec<(usize, f32)>> = adj
        .nodes
        .iter()
        .map(|u| {
            let edges = adj.out_edges.get(u).cloned().unwrap_or_default();
            let total: f32 = edges.iter().map(|(_, w)| w).sum();
            if total <= 0.0 {
                Vec::new()
            } else {
                edges.into_iter().filter_map(|(v, w)| index.get(v.as_str()).map(|&id| (id, w / total))).collect()
            }
        })
        .collect();

    let mut scores = restart.clone();
    for _ in 0..MAX_ITERATIONS {
        let mut next = vec![0.0f32; n];
        for (i, edges) in transitions.iter().enumerate() {
            if edges.is_empty() {
                // Dangling node: redistribute its mass back through the restart vector.
                for (j, r) in restart.iter().enumerate() {
                    next[j] += (1.0 - alpha) * scores[i] * r;
                }
                continue;
            }
            for &(j, w) in edges {
                next[j] += (1.0 - alpha) * scores[i] * w;
            }
        }
        for (j, r) in restart.iter().enumerate() {
            next[j] += alpha * r;
        }

        let l1: f32 = next.iter().zip(&scores).map(|(a, b)| (a - b).abs()).sum();
        scores = next;
        if l1 < CONVERGENCE_EPSILON {
            break;
        }
    }

    adj.nodes.iter().cloned().zip(scores).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use semem_core::RelationshipType;

    fn rel(source: &str, target: &str, weight: f32) -> Relationship {
        Relationship::new(source, target, RelationshipType::Similarity, weight, "sweep-test")
    }

    #[test]
    fn empty_adjacency_yields_no_scores() {
        let adj = Adjacency::from_relationships(&[]);
        let scores = personalized_pagerank(&adj, &["http://a".to_string()], DEFAULT_ALPHA);
        assert!(scores.is_empty());
    }

    #[test]
    fn seed_node_retains_the_highest_score_in_a_star_graph() {
        let rels = vec![rel("center", "a", 0.9), rel("center", "b", 0.8), rel("center", "c", 0.7)];
        let adj = Adjacency::from_relationships(&rels);
        let scores = personalized_pagerank(&adj, &["center".to_string()], DEFAULT_ALPHA);
        let center_score = scores["center"];
        assert!(scores.values().all(|&s| s <= center_score + 1e-6));
    }

    #[test]
    fn scores_sum_to_approximately_one() {
        let rels = vec![rel("a", "b", 1.0), rel("b", "c", 1.0), rel("c", "a", 1.0)];
        let adj = Adjacency::from_relationships(&rels);
        let scores = personalized_pagerank(&adj, &["a".to_string()], DEFAULT_ALPHA);
        let total: f32 = scores.values().sum();
        assert!((total - 1.0).abs() < 1e-3, "total={total}");
    }

    #[test]
    fn unknown_seed_yields_no_scores() {
        let rels = vec![rel("a", "b", 1.0)];
        let adj = Adjacency::from_relationships(&rels);
        let scores = personalized_pagerank(&adj, &["nowhere".to_string()], DEFAULT_ALPHA);
        assert!(scores.is_empty());
    }
}
