//! The Hybrid Retriever (C10, §4.10): merges similarity, exact, and
//! traversal strategies into one ranked `Vec<Hit>`.
//!
//! Grounded on `llmspell-rag::traits::hybrid::HybridStorage` for the
//! "multiple strategies -> per-component scores -> weighted merge" shape
//! (`ComponentScores`/`RetrievalWeights` there map onto
//! `similarity_score`/`exact_score`/`traversal_score` and
//! [`RetrieverWeights`] here), and on
//! `llmspell-context::retrieval::strategy` for running the strategies
//! concurrently and awaiting all before merging (§9: "the hybrid retriever
//! runs its three strategies as concurrent tasks and awaits all before
//! merging").

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use semem_core::{escaping, vocab, Hit, RelationshipType};
use semem_graph::Relationship;
use semem_store::{SparqlStore, Term};
use tracing::{debug, warn};

use crate::error::{Result, RetrievalError};
use crate::hnsw::HnswIndex;
use crate::ppr::{self, Adjacency};
use crate::zpt::{PanFilter, TemporalWindow, TiltStyle, ZptState};

/// Default per-strategy weights (§4.10: "defaults: similarity 0.6, exact
/// 0.2, traversal 0.2").
#[derive(Debug, Clone, Copy)]
pub struct RetrieverWeights {
    pub similarity: f32,
    pub exact: f32,
    pub traversal: f32,
}

impl Default for RetrieverWeights {
    fn default() -> Self {
        Self { similarity: 0.6, exact: 0.2, traversal: 0.2 }
    }
}

impl RetrieverWeights {
    /// Adjust weights per the active tilt (§4.10: "adjusted by
    /// `zptState.tilt`"). `embedding` leans on similarity, `graph` leans on
    /// traversal, `keywords`/`temporal` lean on the exact filter.
    #[must_use]
    pub fn adjusted_for_tilt(self, tilt: TiltStyle) -> Self {
        match tilt {
            TiltStyle::Embedding => Self { similarity: 0.8, exact: 0.1, traversal: 0.1 },
            TiltStyle::Graph => Self { similarity: 0.3, exact: 0.1, traversal: 0.6 },
            TiltStyle::Keywords | TiltStyle::Temporal => Self { similarity: 0.4, exact: 0.5, traversal: 0.1 },
        }
    }
}

pub const DEFAULT_THRESHOLD: f32 = 0.1;
const SIMILARITY_CANDIDATE_MULT: usize = 4;

/// Combines the HNSW similarity index with the SPARQL store for exact and
/// traversal lookups (C10).
pub struct HybridRetriever {
    store: Arc<dyn SparqlStore>,
    index: Arc<HnswIndex>,
    weights: RetrieverWeights,
    threshold: f32,
}

impl HybridRetriever {
    #[must_use]
    pub fn new(store: Arc<dyn SparqlStore>, index: Arc<HnswIndex>) -> Self {
        Self { store, index, weights: RetrieverWeights::default(), threshold: DEFAULT_THRESHOLD }
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// §4.10 primary operation: `retrieve(queryEmbedding, queryText,
    /// zptState, k) -> Vec<Hit>`.
    pub async fn retrieve(&self, query_embedding: &[f32], query_text: &str, zpt_state: &ZptState, k: usize) -> Result<Vec<Hit>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let weights = self.weights.adjusted_for_tilt(zpt_state.tilt);

        let similarity_hits = self.index.search(query_embedding, k * SIMILARITY_CANDIDATE_MULT);
        let exact_hits = self.exact_filter(&zpt_state.pan).await?;

        let run_traversal = zpt_state.tilt == TiltStyle::Graph || !zpt_state.pan.is_empty();
        let traversal_hits = if run_traversal {
            let seed = similarity_hits.first().map(|(uri, _)| uri.clone());
            match seed {
                Some(seed_uri) => self.traversal(&seed_uri).await?,
                None => HashMap::new(),
            }
        } else {
            HashMap::new()
        };

        let mut merged: HashMap<String, (Option<f32>, Option<f32>, Option<f32>)> = HashMap::new();
        for (uri, score) in similarity_hits {
            merged.entry(uri).or_insert((None, None, None)).0 = Some(score);
        }
        for (uri, score) in &exact_hits {
            merged.entry(uri.clone()).or_insert((None, None, None)).1 = Some(*score);
        }
        for (uri, score) in traversal_hits {
            merged.entry(uri).or_insert((None, None, None)).2 = Some(score);
        }

        // A non-empty pan narrows the view rather than just reweighting it:
        // once any constraint is active, a node that satisfies none of them
        // is dropped outright, not merely scored lower (§8 scenario 3).
        if !zpt_state.pan.is_empty() {
            merged.retain(|uri, _| exact_hits.contains_key(uri));
        }

        let mut hits = Vec::with_capacity(merged.len());
        for (uri, (sim, exact, traversal)) in merged {
            let final_score = sim.unwrap_or(0.0) * weights.similarity + exact.unwrap_or(0.0) * weights.exact + traversal.unwrap_or(0.0) * weights.traversal;
            if final_score < self.threshold {
                debug!(uri = %uri, score = final_score, "below-threshold hit dropped (observability only)");
                continue;
            }
            let meta = self.fetch_node_meta(&uri).await?;
            hits.push(Hit {
                uri,
                title: meta.title,
                content: meta.content,
                score: final_score,
                similarity_score: sim,
                exact_score: exact,
                traversal_score: traversal,
                timestamp: meta.timestamp,
            });
        }

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        let _ = query_text; // reserved for future lexical scoring; filter is keyword-driven via pan today.
        Ok(hits)
    }

    /// §4.10 strategy 2: "exact SPARQL filter derived from `zptState.pan`
    /// (keyword regex on `rdfs:label` / `ragno:content`, temporal window,
    /// entity/domain filters)". Each active pan field runs as its own
    /// constraint query; a node must satisfy every active field (set
    /// intersection), since a pan narrows the view rather than broadening it.
    async fn exact_filter(&self, pan: &PanFilter) -> Result<HashMap<String, f32>> {
        let mut constraints: Vec<HashSet<String>> = Vec::new();

        if let Some(keywords) = pan.keywords.as_ref().filter(|k| !k.is_empty()) {
            constraints.push(self.keyword_filter(keywords).await?);
        }
        if let Some(domains) = pan.domains.as_ref().filter(|d| !d.is_empty()) {
            constraints.push(self.attribute_filter(vocab::SEMEM_DOMAIN, domains).await?);
        }
        if let Some(entities) = pan.entities.as_ref().filter(|e| !e.is_empty()) {
            constraints.push(self.entity_filter(entities).await?);
        }
        if let Some(window) = pan.temporal.as_ref() {
            constraints.push(self.temporal_filter(window).await?);
        }

        let Some((first, rest)) = constraints.split_first() else {
            return Ok(HashMap::new());
        };
        let mut matched = first.clone();
        for set in rest {
            matched.retain(|uri| set.contains(uri));
        }
        Ok(matched.into_iter().map(|uri| (uri, 1.0)).collect())
    }

    /// Keyword match on `rdfs:label` or `ragno:content` (§4.10); a node
    /// satisfies this constraint if any keyword hits either property.
    async fn keyword_filter(&self, keywords: &[String]) -> Result<HashSet<String>> {
        let mut hits = HashSet::new();
        for keyword in keywords {
            let kw = escaping::escape_literal(keyword);
            for property in [vocab::RDFS_LABEL, vocab::RAGNO_CONTENT] {
                let query = format!(
                    "{prefix}SELECT ?node ?text WHERE {{ ?node <{property}> ?text . FILTER(CONTAINS(LCASE(?text), LCASE(\"{kw}\"))) }} LIMIT 200",
                    prefix = vocab::prefix_block(),
                );
                let rows = self.store.select(&query).await.map_err(RetrievalError::Store)?;
                for row in rows {
                    if let Some(Term::Iri(uri)) = row.get("node") {
                        hits.insert(uri.clone());
                    }
                }
            }
        }
        Ok(hits)
    }

    /// Exact (case-insensitive) match of `property` against any of `values`
    /// — used for the pan domain constraint.
    async fn attribute_filter(&self, property: &str, values: &[String]) -> Result<HashSet<String>> {
        let mut hits = HashSet::new();
        for value in values {
            let v = escaping::escape_literal(value);
            let query = format!(
                "{prefix}SELECT ?node ?v WHERE {{ ?node <{property}> ?v . FILTER(LCASE(?v) = LCASE(\"{v}\")) }} LIMIT 500",
                prefix = vocab::prefix_block(),
            );
            let rows = self.store.select(&query).await.map_err(RetrievalError::Store)?;
            for row in rows {
                if let Some(Term::Iri(uri)) = row.get("node") {
                    hits.insert(uri.clone());
                }
            }
        }
        Ok(hits)
    }

    /// Entity filter: matches `ragno:Entity` nodes whose label equals one of
    /// `entities` (case-insensitive).
    async fn entity_filter(&self, entities: &[String]) -> Result<HashSet<String>> {
        let mut hits = HashSet::new();
        for entity in entities {
            let e = escaping::escape_literal(entity);
            let query = format!(
                "{prefix}SELECT ?node ?label WHERE {{ ?node <{rdf_type}> <{class}> . ?node <{label_p}> ?label . FILTER(LCASE(?label) = LCASE(\"{e}\")) }} LIMIT 500",
                prefix = vocab::prefix_block(),
                rdf_type = vocab::RDF_TYPE,
                class = vocab::RAGNO_ENTITY,
                label_p = vocab::RDFS_LABEL,
            );
            let rows = self.store.select(&query).await.map_err(RetrievalError::Store)?;
            for row in rows {
                if let Some(Term::Iri(uri)) = row.get("node") {
                    hits.insert(uri.clone());
                }
            }
        }
        Ok(hits)
    }

    /// Temporal window filter: matches nodes whose `semem:timestamp` falls
    /// in `[since, until)`.
    async fn temporal_filter(&self, window: &TemporalWindow) -> Result<HashSet<String>> {
        let mut conditions = Vec::new();
        if let Some(since) = window.since {
            conditions.push(format!("?ts >= \"{}\"^^<{}dateTime>", since.to_rfc3339(), vocab::XSD));
        }
        if let Some(until) = window.until {
            conditions.push(format!("?ts < \"{}\"^^<{}dateTime>", until.to_rfc3339(), vocab::XSD));
        }
        if conditions.is_empty() {
            return Ok(HashSet::new());
        }
        let query = format!(
            "{prefix}SELECT ?node ?ts WHERE {{ ?node <{ts_p}> ?ts . FILTER({conds}) }} LIMIT 500",
            prefix = vocab::prefix_block(),
            ts_p = vocab::SEMEM_TIMESTAMP,
            conds = conditions.join(" && "),
        );
        let rows = self.store.select(&query).await.map_err(RetrievalError::Store)?;
        Ok(rows
            .into_iter()
            .filter_map(|row| match row.get("node") {
                Some(Term::Iri(uri)) => Some(uri.clone()),
                _ => None,
            })
            .collect())
    }

    /// §4.10 strategy 3: personalized PageRank over the Relationship
    /// subgraph, seeded at `seed_uri`.
    async fn traversal(&self, seed_uri: &str) -> Result<HashMap<String, f32>> {
        let relationships = self.fetch_relationships(2_000).await?;
        if relationships.is_empty() {
            return Ok(HashMap::new());
        }
        let adjacency = Adjacency::from_relationships(&relationships);
        Ok(ppr::personalized_pagerank(&adjacency, &[seed_uri.to_string()], ppr::DEFAULT_ALPHA))
    }

    async fn fetch_relationships(&self, limit: usize) -> Result<Vec<Relationship>> {
        let query = format!(
            "{prefix}SELECT ?r ?source ?target ?rtype ?weight WHERE {{
               ?r a <{class}> ;
                  <{has_source}> ?source ;
                  <{has_target}> ?target ;
                  <{rtype_p}> ?rtype ;
                  <{weight_p}> ?weight .
             }} LIMIT {limit}",
            prefix = vocab::prefix_block(),
            class = vocab::RAGNO_RELATIONSHIP,
            has_source = vocab::RAGNO_HAS_SOURCE_ENTITY,
            has_target = vocab::RAGNO_HAS_TARGET_ENTITY,
            rtype_p = vocab::RAGNO_RELATIONSHIP_TYPE,
            weight_p = vocab::RAGNO_WEIGHT,
        );
        let rows = self.store.select(&query).await.map_err(RetrievalError::Store)?;
        Ok(rows.into_iter().filter_map(row_to_relationship).collect())
    }

    async fn fetch_node_meta(&self, uri: &str) -> Result<NodeMeta> {
        let query = format!(
            "{prefix}SELECT ?title ?label ?content ?prompt ?output ?ts WHERE {{
               OPTIONAL {{ <{uri}> <{title_p}> ?title . }}
               OPTIONAL {{ <{uri}> <{label_p}> ?label . }}
               OPTIONAL {{ <{uri}> <{content_p}> ?content . }}
               OPTIONAL {{ <{uri}> <{prompt_p}> ?prompt . }}
               OPTIONAL {{ <{uri}> <{output_p}> ?output . }}
               OPTIONAL {{ <{uri}> <{ts_p}> ?ts . }}
             }} LIMIT 1",
            prefix = vocab::prefix_block(),
            title_p = vocab::DCTERMS_TITLE,
            label_p = vocab::RDFS_LABEL,
            content_p = vocab::RAGNO_CONTENT,
            prompt_p = vocab::SEMEM_PROMPT,
            output_p = vocab::SEMEM_OUTPUT,
            ts_p = vocab::SEMEM_TIMESTAMP,
        );
        let rows = self.store.select(&query).await.map_err(RetrievalError::Store)?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(NodeMeta { title: None, content: String::new(), timestamp: None });
        };
        let title = row.get("title").or_else(|| row.get("label")).map(literal_value);
        let content = row
            .get("content")
            .map(literal_value)
            .or_else(|| {
                let prompt = row.get("prompt").map(literal_value);
                let output = row.get("output").map(literal_value);
                match (prompt, output) {
                    (Some(p), Some(o)) if !o.is_empty() => Some(format!("{p}\n{o}")),
                    (Some(p), _) => Some(p),
                    _ => None,
                }
            })
            .unwrap_or_default();
        let timestamp = row.get("ts").and_then(|t| literal_value(t).parse::<DateTime<Utc>>().ok());
        Ok(NodeMeta { title, content, timestamp })
    }
}

struct NodeMeta {
    title: Option<String>,
    content: String,
    timestamp: Option<DateTime<Utc>>,
}

fn literal_value(t: &Term) -> String {
    match t {
        Term::Literal { value, .. } => value.clone(),
        Term::Iri(u) => u.clone(),
    }
}

fn row_to_relationship(row: semem_store::Bindings) -> Option<Relationship> {
    let source = match row.get("source")? {
        Term::Iri(u) => u.clone(),
        Term::Literal { value, .. } => value.clone(),
    };
    let target = match row.get("target")? {
        Term::Iri(u) => u.clone(),
        Term::Literal { value, .. } => value.clone(),
    };
    let rtype_str = literal_value(row.get("rtype")?);
    let weight = literal_value(row.get("weight")?).parse::<f32>().ok()?;
    let rtype = match rtype_str.as_str() {
        "similarity" => RelationshipType::Similarity,
        "entity-match" => RelationshipType::EntityMatch,
        "community-bridge" => RelationshipType::CommunityBridge,
        "semantic-answer" => RelationshipType::SemanticAnswer,
        "keyword-answer" => RelationshipType::KeywordAnswer,
        other => {
            warn!(rtype = other, "unknown relationship type encountered during traversal fetch");
            return None;
        }
    };
    Some(Relationship::new(&source, &target, rtype, weight, "retrieval-read"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hnsw::HnswConfig;
    use crate::zpt::ZptState;
    use semem_store::InMemorySparqlStore;

    fn retriever() -> (HybridRetriever, Arc<HnswIndex>) {
        let index = Arc::new(HnswIndex::new(HnswConfig::default()));
        let store = Arc::new(InMemorySparqlStore::new());
        (HybridRetriever::new(store, Arc::clone(&index)), index)
    }

    #[tokio::test]
    async fn k_zero_does_no_work() {
        let (retriever, _) = retriever();
        let hits = retriever.retrieve(&[1.0, 0.0], "q", &ZptState::default(), 0).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn similarity_only_hit_survives_default_threshold() {
        let (retriever, index) = retriever();
        index.insert("http://doc/1", vec![1.0, 0.0, 0.0]);
        let hits = retriever.retrieve(&[1.0, 0.0, 0.0], "q", &ZptState::default(), 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].uri, "http://doc/1");
        assert!(hits[0].similarity_score.unwrap() > 0.9);
    }

    #[tokio::test]
    async fn zero_stored_interactions_yields_empty_not_error() {
        let (retriever, _) = retriever();
        let hits = retriever.retrieve(&[1.0, 0.0], "q", &ZptState::default(), 5).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn keyword_filter_matches_content_as_well_as_label() {
        let index = Arc::new(HnswIndex::new(HnswConfig::default()));
        let store: Arc<dyn SparqlStore> = Arc::new(InMemorySparqlStore::new());
        store
            .update(&format!("INSERT DATA {{ <http://doc/1> <{content_p}> \"alpha content\" . }}", content_p = vocab::RAGNO_CONTENT))
            .await
            .unwrap();
        let retriever = HybridRetriever::new(Arc::clone(&store), Arc::clone(&index));
        index.insert("http://doc/1", vec![1.0, 0.0]);

        let mut zpt = ZptState::default();
        zpt.pan = PanFilter { keywords: Some(vec!["alpha".to_string()]), ..Default::default() };
        let hits = retriever.retrieve(&[1.0, 0.0], "q", &zpt, 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].uri, "http://doc/1");
        assert!(hits[0].exact_score.unwrap() > 0.0);
    }

    #[tokio::test]
    async fn pan_filter_hard_gates_nodes_that_miss_every_active_constraint() {
        let index = Arc::new(HnswIndex::new(HnswConfig::default()));
        let store: Arc<dyn SparqlStore> = Arc::new(InMemorySparqlStore::new());
        store
            .update(&format!("INSERT DATA {{ <http://doc/1> <{domain_p}> \"AI\" . }}", domain_p = vocab::SEMEM_DOMAIN))
            .await
            .unwrap();
        let retriever = HybridRetriever::new(Arc::clone(&store), Arc::clone(&index));
        index.insert("http://doc/1", vec![1.0, 0.0]);
        index.insert("http://doc/2", vec![1.0, 0.0]);

        let mut zpt = ZptState::default();
        zpt.pan = PanFilter { domains: Some(vec!["AI".to_string()]), ..Default::default() };
        let hits = retriever.retrieve(&[1.0, 0.0], "q", &zpt, 5).await.unwrap();
        let uris: Vec<&str> = hits.iter().map(|h| h.uri.as_str()).collect();
        assert_eq!(uris, vec!["http://doc/1"]);
    }
}
