//! Ingestion Orchestrator (C8): drives chunking, embedding, concept
//! extraction, and concept-corpuscle/document persistence for one document.
//!
//! Grounded on the bounded-fan-out pattern the teacher uses throughout
//! `llmspell-agents` (`futures::stream::buffer_unordered` capped at a small
//! constant, gated by a shared rate limiter) for exactly this "many
//! independent I/O-bound units of work per top-level request" shape.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use semem_core::{escaping, ids::content_hash, vocab, RelationshipType};
use semem_graph::{cosine_similarity, Corpuscle, Relationship};
use semem_providers::{ChatProvider, EmbeddingProvider, PromptTemplateService, TokenBucket, TokenBucketConfig};
use semem_store::SparqlStore;
use tracing::{debug, error, warn};

use crate::chunker::{self, Chunk, ChunkerConfig};
use crate::concept_extractor::extract_concepts;
use crate::embedding_cache::EmbeddingCache;
use crate::error::{IngestError, Result};

/// Default bounded concurrency for per-chunk work (§4.8 "bounded fan-out (default 8)").
pub const DEFAULT_FAN_OUT: usize = 8;

/// A document to ingest.
#[derive(Debug, Clone)]
pub struct Document {
    pub title: String,
    pub content: String,
    pub format: String,
    pub domain: Option<String>,
}

impl Document {
    #[must_use]
    pub fn new(title: impl Into<String>, content: impl Into<String>, format: impl Into<String>) -> Self {
        Self { title: title.into(), content: content.into(), format: format.into(), domain: None }
    }

    #[must_use]
    pub fn with_domain(mut self, domain: Option<String>) -> Self {
        self.domain = domain;
        self
    }
}

/// Outcome of a successful `ingest_document` call.
#[derive(Debug, Clone)]
pub struct IngestionReport {
    pub document_uri: String,
    pub chunk_count: usize,
    pub concept_count: usize,
    pub entity_count: usize,
    pub similarity_edge_count: usize,
}

struct ProcessedChunk {
    chunk: Chunk,
    embedding: Vec<f32>,
    concepts: Vec<String>,
    concept_embeddings: Vec<Vec<f32>>,
}

/// Drives C6 (chunk) -> C4/embed -> C7 (concepts) -> persistence for one
/// document, with bounded, rate-limited fan-out over its chunks.
pub struct IngestionOrchestrator {
    store: Arc<dyn SparqlStore>,
    chat: Arc<dyn ChatProvider>,
    embedder: Arc<dyn EmbeddingProvider>,
    cache: EmbeddingCache,
    templates: PromptTemplateService,
    rate_limiter: Arc<TokenBucket>,
    fan_out: usize,
    dimension: usize,
    chunker_config: ChunkerConfig,
}

impl IngestionOrchestrator {
    #[must_use]
    pub fn new(
        store: Arc<dyn SparqlStore>,
        chat: Arc<dyn ChatProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        dimension: usize,
    ) -> Self {
        Self {
            store,
            chat,
            embedder,
            cache: EmbeddingCache::default(),
            templates: PromptTemplateService::new(),
            rate_limiter: Arc::new(TokenBucket::new(TokenBucketConfig::default())),
            fan_out: DEFAULT_FAN_OUT,
            dimension,
            chunker_config: ChunkerConfig::default(),
        }
    }

    #[must_use]
    pub fn with_fan_out(mut self, fan_out: usize) -> Self {
        self.fan_out = fan_out.max(1);
        self
    }

    #[must_use]
    pub fn with_chunker_config(mut self, config: ChunkerConfig) -> Self {
        self.chunker_config = config;
        self
    }

    /// Ingest one document: chunk, embed + extract concepts (bounded
    /// fan-out), then stage and write every triple in a single `INSERT
    /// DATA`. `known_documents` are prior documents' pooled embeddings, used
    /// to emit cross-document `similarity` relationships (§4.8 step 4).
    pub async fn ingest_document(&self, doc: &Document, known_documents: &[Corpuscle]) -> Result<IngestionReport> {
        if doc.content.trim().is_empty() {
            return Err(IngestError::EmptyDocument);
        }
        let document_uri = document_uri(&doc.title, &doc.content);
        let chunks = chunker::chunk(&doc.content, self.chunker_config);
        debug!(document_uri, chunks = chunks.len(), "chunked document");

        let processed = self.process_chunks(&chunks).await;
        let processed = match processed {
            Ok(p) => p,
            Err(e) => {
                warn!(document_uri, error = %e, "ingestion failed, marking document as failed");
                self.mark_ingestion_failed(&document_uri).await.ok();
                return Err(IngestError::Ingestion { document: document_uri, reason: e.to_string() });
            }
        };

        let mean_embedding = mean_vector(processed.iter().map(|p| p.embedding.as_slice()), self.dimension);
        let entities = entity_candidates(processed.iter().map(|p| p.chunk.text.as_str()));
        let similarity_edges = similarity_edges(&document_uri, &mean_embedding, known_documents);

        let concept_count: usize = processed.iter().map(|p| p.concepts.len()).sum();
        let body = build_document_insert(doc, &document_uri, &processed, &entities, &similarity_edges, self.dimension);

        if let Err(e) = self.store.update(&body).await {
            error!(document_uri, error = %e, "document write failed");
            self.mark_ingestion_failed(&document_uri).await.ok();
            return Err(IngestError::Ingestion { document: document_uri, reason: e.to_string() });
        }

        Ok(IngestionReport {
            document_uri,
            chunk_count: processed.len(),
            concept_count,
            entity_count: entities.len(),
            similarity_edge_count: similarity_edges.len(),
        })
    }

    async fn process_chunks(&self, chunks: &[Chunk]) -> Result<Vec<ProcessedChunk>> {
        let results: Vec<Result<ProcessedChunk>> = stream::iter(chunks.iter())
            .map(|c| self.process_one_chunk(c))
            .buffer_unordered(self.fan_out)
            .collect()
            .await;

        let mut out = Vec::with_capacity(results.len());
        for r in results {
            out.push(r?);
        }
        out.sort_by_key(|p| p.chunk.index);
        Ok(out)
    }

    async fn process_one_chunk(&self, chunk: &Chunk) -> Result<ProcessedChunk> {
        self.rate_limiter.acquire().await;
        let embedding = match self.cache.get(&chunk.text) {
            Some(e) => e,
            None => {
                let mut vecs = self.embedder.embed(&[chunk.text.clone()]).await.map_err(IngestError::Provider)?;
                let v = vecs.pop().ok_or(IngestError::ProviderUnavailable)?;
                self.cache.put(&chunk.text, v.clone());
                v
            }
        };
        if embedding.len() != self.dimension {
            return Err(IngestError::Ingestion {
                document: chunk.text.chars().take(24).collect(),
                reason: format!("embedding dimension {} != configured {}", embedding.len(), self.dimension),
            });
        }
        let concepts = extract_concepts(self.chat.as_ref(), &self.templates, &chunk.text).await?;
        let concept_embeddings = self.embed_concepts(&concepts).await?;
        Ok(ProcessedChunk { chunk: chunk.clone(), embedding, concepts, concept_embeddings })
    }

    /// Embeds each extracted concept string, reusing the cache by concept
    /// text (distinct from the chunk-text cache entry above) and batching
    /// the provider call over whatever misses remain.
    async fn embed_concepts(&self, concepts: &[String]) -> Result<Vec<Vec<f32>>> {
        if concepts.is_empty() {
            return Ok(Vec::new());
        }
        let mut out: Vec<Option<Vec<f32>>> = vec![None; concepts.len()];
        let mut miss_indices = Vec::new();
        for (i, concept) in concepts.iter().enumerate() {
            match self.cache.get(concept) {
                Some(e) => out[i] = Some(e),
                None => miss_indices.push(i),
            }
        }
        if !miss_indices.is_empty() {
            self.rate_limiter.acquire().await;
            let texts: Vec<String> = miss_indices.iter().map(|&i| concepts[i].clone()).collect();
            let vecs = self.embedder.embed(&texts).await.map_err(IngestError::Provider)?;
            if vecs.len() != texts.len() {
                return Err(IngestError::ProviderUnavailable);
            }
            for (&i, v) in miss_indices.iter().zip(vecs) {
                self.cache.put(&concepts[i], v.clone());
                out[i] = Some(v);
            }
        }
        Ok(out.into_iter().map(Option::unwrap_or_default).collect())
    }

    async fn mark_ingestion_failed(&self, document_uri: &str) -> Result<()> {
        let query = format!(
            "{prefix}INSERT DATA {{ <{document_uri}> <{p}> \"true\"^^<{xsd_bool}> . }}",
            prefix = vocab::prefix_block(),
            p = vocab::SEMEM_INGESTION_FAILED,
            xsd_bool = format!("{}boolean", vocab::XSD),
        );
        self.store.update(&query).await.map_err(IngestError::from_store)
    }
}

impl IngestError {
    fn from_store(e: semem_store::StoreError) -> Self {
        IngestError::Ingestion { document: String::new(), reason: e.to_string() }
    }
}

fn document_uri(title: &str, content: &str) -> String {
    format!("{}Document/{}", vocab::SEMEM, content_hash(&[title, content]))
}

fn mean_vector<'a>(vectors: impl Iterator<Item = &'a [f32]>, dim: usize) -> Vec<f32> {
    let mut sum = vec![0.0f32; dim];
    let mut count = 0usize;
    for v in vectors {
        for (s, x) in sum.iter_mut().zip(v) {
            *s += x;
        }
        count += 1;
    }
    if count > 0 {
        for s in &mut sum {
            *s /= count as f32;
        }
    }
    sum
}

/// Design-level noun-phrase heuristic (§4.8 step 4): a capitalized word (not
/// the first word of its chunk) appearing in at least two distinct chunks is
/// treated as an entity candidate. A real implementation may swap this for a
/// dedicated NER call.
fn entity_candidates<'a>(chunks: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for text in chunks {
        let mut seen_in_chunk = std::collections::HashSet::new();
        for (i, word) in text.split_whitespace().enumerate() {
            let cleaned: String = word.chars().filter(|c| c.is_alphanumeric() || *c == '-').collect();
            if i == 0 || cleaned.len() < 3 {
                continue;
            }
            if cleaned.chars().next().is_some_and(char::is_uppercase) && seen_in_chunk.insert(cleaned.clone()) {
                *counts.entry(cleaned).or_insert(0) += 1;
            }
        }
    }
    let mut out: Vec<String> = counts.into_iter().filter(|(_, n)| *n >= 2).map(|(w, _)| w).collect();
    out.sort();
    out
}

fn similarity_edges(document_uri: &str, mean_embedding: &[f32], known_documents: &[Corpuscle]) -> Vec<Relationship> {
    const THRESHOLD: f32 = 0.1;
    let sweep_id = content_hash(&[document_uri, "ingest-similarity"]);
    known_documents
        .iter()
        .filter_map(|other| {
            let other_emb = other.embedding.as_ref()?;
            let score = cosine_similarity(mean_embedding, other_emb);
            (score >= THRESHOLD).then(|| Relationship::new(document_uri, &other.uri, RelationshipType::Similarity, score, &sweep_id))
        })
        .collect()
}

fn build_document_insert(
    doc: &Document,
    document_uri: &str,
    processed: &[ProcessedChunk],
    entities: &[String],
    similarity_edges: &[Relationship],
    dimension: usize,
) -> String {
    let mut body = format!(
        "<{document_uri}> a <{class}> .\n<{document_uri}> <{title_p}> \"{title}\" .\n",
        class = vocab::RAGNO_DOCUMENT,
        title_p = vocab::DCTERMS_TITLE,
        title = escaping::escape_literal(&doc.title),
    );
    if let Some(domain) = doc.domain.as_deref().filter(|d| !d.trim().is_empty()) {
        body.push_str(&format!(
            "<{document_uri}> <{domain_p}> \"{domain}\" .\n",
            domain_p = vocab::SEMEM_DOMAIN,
            domain = escaping::escape_literal(domain),
        ));
    }

    for p in processed {
        let text_uri = format!("{}TextElement/{}", vocab::SEMEM, content_hash(&[document_uri, &p.chunk.index.to_string()]));
        let corpuscle_uri = format!("{}Corpuscle/{}", vocab::SEMEM, content_hash(&[document_uri, &p.chunk.index.to_string(), "concepts"]));
        body.push_str(&format!(
            "<{document_uri}> <{has_text}> <{text_uri}> .\n\
             <{text_uri}> a <{te_class}> .\n\
             <{text_uri}> <{content_p}> \"{content}\" .\n\
             <{text_uri}> <{start_p}> \"{start}\"^^<{xsd_int}> .\n\
             <{text_uri}> <{end_p}> \"{end}\"^^<{xsd_int}> .\n\
             <{text_uri}> <{emb_p}> \"{embedding}\" .\n\
             <{corpuscle_uri}> a <{corp_class}> .\n\
             <{corpuscle_uri}> <{derived_p}> <{text_uri}> .\n",
            has_text = vocab::RAGNO_HAS_TEXT_ELEMENT,
            te_class = vocab::RAGNO_TEXT_ELEMENT,
            content_p = vocab::RAGNO_CONTENT,
            content = escaping::escape_literal(&p.chunk.text),
            start_p = vocab::SEMEM_CHUNK_START,
            start = p.chunk.start,
            end_p = vocab::SEMEM_CHUNK_END,
            end = p.chunk.end,
            xsd_int = format!("{}integer", vocab::XSD),
            emb_p = vocab::SEMEM_EMBEDDING,
            embedding = escaping::escape_literal(&serde_json::to_string(&p.embedding).unwrap_or_default()),
            corp_class = vocab::RAGNO_CORPUSCLE,
            derived_p = vocab::PROV_WAS_DERIVED_FROM,
        ));
        if let Some(domain) = doc.domain.as_deref().filter(|d| !d.trim().is_empty()) {
            body.push_str(&format!(
                "<{text_uri}> <{domain_p}> \"{domain}\" .\n",
                domain_p = vocab::SEMEM_DOMAIN,
                domain = escaping::escape_literal(domain),
            ));
        }

        // Each extracted concept becomes its own embedded Unit, linked from
        // the corpuscle via skos:member; the corpuscle's own embedding is
        // the mean-pool of those member embeddings (invariant I3).
        for (concept, embedding) in p.concepts.iter().zip(&p.concept_embeddings) {
            let unit_uri = format!("{}Unit/{}", vocab::SEMEM, content_hash(&[document_uri, &p.chunk.index.to_string(), concept]));
            body.push_str(&format!(
                "<{unit_uri}> a <{unit_class}> .\n\
                 <{unit_uri}> <{label_p}> \"{c}\" .\n\
                 <{unit_uri}> <{emb_p}> \"{embedding}\" .\n\
                 <{corpuscle_uri}> <{member_p}> <{unit_uri}> .\n",
                unit_class = vocab::RAGNO_UNIT,
                label_p = vocab::RDFS_LABEL,
                c = escaping::escape_literal(concept),
                emb_p = vocab::SEMEM_EMBEDDING,
                embedding = escaping::escape_literal(&serde_json::to_string(embedding).unwrap_or_default()),
                member_p = vocab::SKOS_MEMBER,
            ));
        }
        let corpuscle_embedding = mean_vector(p.concept_embeddings.iter().map(Vec::as_slice), dimension);
        body.push_str(&format!(
            "<{corpuscle_uri}> <{emb_p}> \"{embedding}\" .\n",
            emb_p = vocab::SEMEM_EMBEDDING,
            embedding = escaping::escape_literal(&serde_json::to_string(&corpuscle_embedding).unwrap_or_default()),
        ));
    }

    for entity in entities {
        let entity_uri = format!("{}Entity/{}", vocab::SEMEM, content_hash(&[document_uri, entity]));
        body.push_str(&format!(
            "<{entity_uri}> a <{class}> .\n\
             <{entity_uri}> <{label_p}> \"{label}\" .\n\
             <{entity_uri}> <{source_p}> <{document_uri}> .\n",
            class = vocab::RAGNO_ENTITY,
            label_p = vocab::RDFS_LABEL,
            label = escaping::escape_literal(entity),
            source_p = vocab::RAGNO_SOURCE_CORPUS,
        ));
    }

    for rel in similarity_edges {
        body.push_str(&semem_graph::to_triples(rel));
    }

    format!("{}INSERT DATA {{ {body} }}", vocab::prefix_block())
}

#[cfg(test)]
mod tests {
    use super::*;
    use semem_providers::MockProvider;
    use semem_store::InMemorySparqlStore;

    fn orchestrator() -> IngestionOrchestrator {
        let store: Arc<dyn SparqlStore> = Arc::new(InMemorySparqlStore::new());
        let provider = Arc::new(MockProvider::new(8).with_response(r#"["concept a", "concept b"]"#));
        IngestionOrchestrator::new(store, provider.clone(), provider, 8)
    }

    #[tokio::test]
    async fn ingests_a_short_document_as_a_single_chunk() {
        let orch = orchestrator();
        let doc = Document::new("Title", "A short document about Rust and Memory.", "text/plain");
        let report = orch.ingest_document(&doc, &[]).await.unwrap();
        assert_eq!(report.chunk_count, 1);
        assert_eq!(report.concept_count, 2);
    }

    #[tokio::test]
    async fn rejects_empty_document() {
        let orch = orchestrator();
        let doc = Document::new("Empty", "   ", "text/plain");
        assert!(matches!(orch.ingest_document(&doc, &[]).await, Err(IngestError::EmptyDocument)));
    }

    #[tokio::test]
    async fn emits_similarity_edge_to_a_close_known_document() {
        let orch = orchestrator();
        let doc = Document::new("Title", "Some content about testing ingestion pipelines.", "text/plain");
        let known = Corpuscle {
            uri: "http://semem.hyperdata.it/Document/other".to_string(),
            embedding: Some(semem_providers::deterministic_vector("some content about testing ingestion pipelines", 8)),
            entity_labels: vec![],
        };
        let report = orch.ingest_document(&doc, &[known]).await.unwrap();
        assert!(report.similarity_edge_count >= 1);
    }

    #[tokio::test]
    async fn entity_candidates_need_at_least_two_occurrences() {
        let chunks = vec!["Some text. Rust is great.", "More text. Rust is fast too.", "Python is fine too."];
        let entities = entity_candidates(chunks.into_iter());
        assert!(entities.contains(&"Rust".to_string()));
        assert!(!entities.contains(&"Python".to_string()));
    }

    #[tokio::test]
    async fn concept_corpuscle_embedding_is_the_mean_of_its_member_units() {
        use semem_store::Term;

        let store: Arc<dyn SparqlStore> = Arc::new(InMemorySparqlStore::new());
        let provider = Arc::new(MockProvider::new(8).with_response(r#"["alpha", "beta"]"#));
        let orch = IngestionOrchestrator::new(Arc::clone(&store), provider.clone(), provider, 8);
        let doc = Document::new("Title", "A document about alpha and beta.", "text/plain").with_domain(Some("AI".to_string()));
        orch.ingest_document(&doc, &[]).await.unwrap();

        let literal_embedding = |row: &semem_store::Bindings| -> Vec<f32> {
            match row.get("embedding").unwrap() {
                Term::Literal { value, .. } => serde_json::from_str(value).unwrap(),
                Term::Iri(_) => panic!("expected a literal embedding"),
            }
        };

        let unit_rows = store
            .select(&format!(
                "SELECT ?node ?embedding WHERE {{ ?node <{rdf_type}> <{class}> . ?node <{emb}> ?embedding . }}",
                rdf_type = vocab::RDF_TYPE,
                class = vocab::RAGNO_UNIT,
                emb = vocab::SEMEM_EMBEDDING,
            ))
            .await
            .unwrap();
        assert_eq!(unit_rows.len(), 2, "each extracted concept should materialize its own embedded ragno:Unit");
        let unit_embeddings: Vec<Vec<f32>> = unit_rows.iter().map(literal_embedding).collect();

        let corpuscle_rows = store
            .select(&format!(
                "SELECT ?node ?embedding WHERE {{ ?node <{rdf_type}> <{class}> . ?node <{emb}> ?embedding . }}",
                rdf_type = vocab::RDF_TYPE,
                class = vocab::RAGNO_CORPUSCLE,
                emb = vocab::SEMEM_EMBEDDING,
            ))
            .await
            .unwrap();
        assert_eq!(corpuscle_rows.len(), 1);
        let corpuscle_embedding = literal_embedding(&corpuscle_rows[0]);

        let expected = mean_vector(unit_embeddings.iter().map(Vec::as_slice), 8);
        assert_eq!(corpuscle_embedding.len(), expected.len());
        for (a, b) in corpuscle_embedding.iter().zip(&expected) {
            assert!((a - b).abs() < 1e-5, "corpuscle embedding should mean-pool its member units");
        }
    }

    #[tokio::test]
    async fn document_domain_is_persisted_on_the_document_and_its_text_elements() {
        let store: Arc<dyn SparqlStore> = Arc::new(InMemorySparqlStore::new());
        let provider = Arc::new(MockProvider::new(8).with_response(r#"["alpha"]"#));
        let orch = IngestionOrchestrator::new(Arc::clone(&store), provider.clone(), provider, 8);
        let doc = Document::new("Title", "A document tagged with a domain.", "text/plain").with_domain(Some("AI".to_string()));
        orch.ingest_document(&doc, &[]).await.unwrap();

        let rows = store
            .select(&format!(
                "SELECT ?node ?d WHERE {{ ?node <{domain_p}> ?d . }}",
                domain_p = vocab::SEMEM_DOMAIN,
            ))
            .await
            .unwrap();
        // one Document + one TextElement carry the domain literal.
        assert_eq!(rows.len(), 2);
    }
}
