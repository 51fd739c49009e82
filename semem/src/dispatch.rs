//! The Verb Dispatcher (C13, §4.13): routes a validated `{verb, params,
//! sessionId}` request into the Memory Store, Ingestion Orchestrator,
//! Relationship Builder, Hybrid Retriever, ZPT Navigator, or VSOM Trainer.
//!
//! Grounded on `llmspell-memory::manager::DefaultMemoryManager` (§ "manager
//! coordinates subsystems" shape: one struct holding `Arc<dyn Trait>`/
//! concrete subsystem handles, a uniform entry point fanning out to them).

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use semem_core::{vocab, CoreError, Hit, Result};
use semem_graph::Corpuscle;
use semem_ingest::{Document, IngestionOrchestrator};
use semem_memory::{Interaction, MemoryStore};
use semem_providers::{ChatOptions, ChatProvider, EmbeddingProvider};
use semem_retrieval::{
    build_context, ContextBundle, HybridRetriever, HnswConfig, HnswIndex, PanFilter, TiltStyle, ZoomLevel, ZptNavigator, ZptState,
    DEFAULT_TOKEN_BUDGET,
};
use semem_store::{SparqlStore, Term};
use semem_vsom::{TrainerConfig, TrainingEntity, VsomTrainer};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

/// One `{verb, params, sessionId}` request (§4.13, §6).
#[derive(Debug, Clone, Deserialize)]
pub struct VerbRequest {
    pub verb: String,
    #[serde(default)]
    pub params: Value,
    #[serde(rename = "sessionId", default = "default_session")]
    pub session_id: String,
}

fn default_session() -> String {
    "default".to_string()
}

/// §6: "Responses always include `success: bool`, plus verb-specific
/// payload, plus `sessionId`".
#[derive(Debug, Clone, Serialize)]
pub struct VerbResponse {
    pub success: bool,
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub payload: Value,
    pub degraded: bool,
}

/// Coordinates every subsystem behind the eight-verb surface (§4.13).
pub struct Semem {
    store: Arc<dyn SparqlStore>,
    memory: Arc<MemoryStore>,
    ingest: Arc<IngestionOrchestrator>,
    retriever: Arc<HybridRetriever>,
    navigator: Arc<ZptNavigator>,
    index: Arc<HnswIndex>,
    chat: Arc<dyn ChatProvider>,
    embedder: Arc<dyn EmbeddingProvider>,
    dimension: usize,
    context_budget: usize,
}

impl Semem {
    #[must_use]
    pub fn new(store: Arc<dyn SparqlStore>, chat: Arc<dyn ChatProvider>, embedder: Arc<dyn EmbeddingProvider>, dimension: usize) -> Self {
        let index = Arc::new(HnswIndex::new(HnswConfig::default()));
        Self {
            store: Arc::clone(&store),
            memory: Arc::new(MemoryStore::new(Arc::clone(&store), dimension)),
            ingest: Arc::new(IngestionOrchestrator::new(Arc::clone(&store), Arc::clone(&chat), Arc::clone(&embedder), dimension)),
            retriever: Arc::new(HybridRetriever::new(Arc::clone(&store), Arc::clone(&index))),
            navigator: Arc::new(ZptNavigator::new()),
            index,
            chat,
            embedder,
            dimension,
            context_budget: DEFAULT_TOKEN_BUDGET,
        }
    }

    /// Convenience constructor for tests and local experimentation: an
    /// in-memory store and a deterministic mock provider, mirroring
    /// `DefaultMemoryManager::new_in_memory`.
    #[must_use]
    pub fn new_in_memory(dimension: usize) -> Self {
        let store: Arc<dyn SparqlStore> = Arc::new(semem_store::InMemorySparqlStore::new());
        let provider = Arc::new(semem_providers::MockProvider::new(dimension));
        Self::new(store, provider.clone(), provider, dimension)
    }

    /// Build a fully wired engine from a loaded `SememConfig` (§6 "Config
    /// file"): an `HttpSparqlStore` over `storage`, and the first usable
    /// entry in `llmProviders`/`embeddingProviders` (§6 "Selection is
    /// priority-ordered from config"). Only `ollama` has a concrete in-core
    /// connector (§1 non-goal: hosted vendor SDKs); any other selected
    /// vendor name is a setup error the caller resolves by wiring its own
    /// `ChatProvider`/`EmbeddingProvider` through [`Self::new`] instead.
    pub fn from_config(config: &semem_config::SememConfig) -> std::result::Result<Self, crate::error::SetupError> {
        use crate::error::SetupError;
        use semem_providers::{provider_kind, select_provider, ProviderKind};

        config.validate()?;

        let store: Arc<dyn SparqlStore> = Arc::new(semem_store::HttpSparqlStore::new(semem_store::SparqlEndpointConfig {
            query_url: config.storage.query.clone(),
            update_url: config.storage.update.clone(),
            user: config.storage.user.clone(),
            password: config.storage.resolve_password().unwrap_or_default(),
            graph_name: config.storage.graph_name.clone(),
            pool_size: config.performance.sparql_pool_size,
            timeout: std::time::Duration::from_secs(config.performance.sparql_timeout_secs),
            retry: semem_store::RetryPolicy::default(),
        }));

        let chat_entry = select_provider(&config.llm_providers).ok_or(SetupError::NoUsableProvider("llm"))?;
        let embed_entry = select_provider(&config.embedding_providers).ok_or(SetupError::NoUsableProvider("embedding"))?;
        if provider_kind(chat_entry) != ProviderKind::Ollama || provider_kind(embed_entry) != ProviderKind::Ollama {
            return Err(SetupError::UnsupportedProvider(chat_entry.name.clone()));
        }

        let base_url = chat_entry
            .endpoint
            .clone()
            .or_else(|| embed_entry.endpoint.clone())
            .unwrap_or_else(|| "http://localhost:11434".to_string());
        let provider = Arc::new(semem_providers::OllamaProvider::new(
            base_url,
            chat_entry.model.clone(),
            embed_entry.model.clone(),
            config.memory.dimension,
        ));

        Ok(Self::new(store, provider.clone(), provider, config.memory.dimension))
    }

    /// Single entry point for every verb (§4.13).
    pub async fn dispatch(&self, request: VerbRequest) -> Result<VerbResponse> {
        let mut params = request.params;
        normalize_legacy_keys(&mut params, &request.verb);

        match request.verb.as_str() {
            "tell" => self.tell(params, &request.session_id).await,
            "ask" => self.ask(params, &request.session_id).await,
            "augment" => self.augment(params, &request.session_id).await,
            "zoom" => self.zoom(params, &request.session_id),
            "pan" => self.pan(params, &request.session_id),
            "tilt" => self.tilt(params, &request.session_id),
            "inspect" => self.inspect(params, &request.session_id).await,
            "train-vsom" => self.train_vsom(params, &request.session_id).await,
            other => Err(CoreError::UnknownVerb(other.to_string())),
        }
    }

    async fn tell(&self, params: Value, session_id: &str) -> Result<VerbResponse> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct TellParams {
            content: String,
            #[serde(default)]
            r#type: TellType,
            #[serde(default)]
            metadata: Value,
            #[serde(default)]
            lazy: bool,
        }
        #[derive(Deserialize, Default, PartialEq)]
        #[serde(rename_all = "lowercase")]
        enum TellType {
            #[default]
            Interaction,
            Document,
            Concept,
        }

        let p: TellParams = parse_params(params)?;
        if p.content.trim().is_empty() {
            return Err(CoreError::Validation("tell.content must not be empty".to_string()));
        }
        let title = p.metadata.get("title").and_then(Value::as_str).map(str::to_string);

        if p.r#type == TellType::Document {
            let domain = p.metadata.get("domain").and_then(Value::as_str).map(str::to_string);
            let known = self.fetch_known_corpuscles(5_000).await?;
            let doc = Document::new(title.clone().unwrap_or_default(), p.content.clone(), "text/plain").with_domain(domain);
            let report = self.ingest.ingest_document(&doc, &known).await?;
            return Ok(VerbResponse {
                success: true,
                session_id: session_id.to_string(),
                payload: json!({
                    "documentUri": report.document_uri,
                    "chunkCount": report.chunk_count,
                    "conceptCount": report.concept_count,
                    "entityCount": report.entity_count,
                }),
                degraded: false,
            });
        }

        if p.lazy {
            let content_type = if p.r#type == TellType::Concept { "concept" } else { "interaction" };
            let interaction = self.memory.store_lazy(&p.content, content_type, title.as_deref()).await?;
            return Ok(VerbResponse {
                success: true,
                session_id: session_id.to_string(),
                payload: json!({ "id": interaction.id, "status": "lazy" }),
                degraded: false,
            });
        }

        let embedding = self.embed_one(&p.content).await?;
        let mut interaction = Interaction::new_eager(p.content.clone(), "", embedding.clone());
        if let Some(t) = title.as_deref() {
            interaction = interaction.with_title(t);
        }
        self.memory.store(&interaction).await?;
        self.index.insert(&interaction_uri(&interaction.id), embedding);
        Ok(VerbResponse {
            success: true,
            session_id: session_id.to_string(),
            payload: json!({ "id": interaction.id, "status": "processed" }),
            degraded: false,
        })
    }

    async fn ask(&self, params: Value, session_id: &str) -> Result<VerbResponse> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct AskParams {
            question: String,
            #[serde(default = "default_true")]
            use_context: bool,
            #[serde(default)]
            mode: AskMode,
            #[serde(default)]
            use_hyde: bool,
            #[serde(default)]
            use_wikipedia: bool,
            #[serde(default)]
            use_wikidata: bool,
        }
        fn default_true() -> bool {
            true
        }
        #[derive(Deserialize, Default, Clone, Copy)]
        #[serde(rename_all = "lowercase")]
        enum AskMode {
            Basic,
            #[default]
            Standard,
            Comprehensive,
        }
        impl AskMode {
            fn k(self) -> usize {
                match self {
                    AskMode::Basic => 3,
                    AskMode::Standard => 5,
                    AskMode::Comprehensive => 10,
                }
            }
        }

        let p: AskParams = parse_params(params)?;
        if p.question.trim().is_empty() {
            return Err(CoreError::Validation("ask.question must not be empty".to_string()));
        }
        // §1 non-goal: the Wikipedia/Wikidata harvesters are external
        // collaborators out of scope for this engine; the flags are
        // accepted (schema-valid) but have no in-core effect.
        let _ = (p.use_wikipedia, p.use_wikidata);

        let zpt_state = self.navigator.inspect(session_id);
        let question_embedding = self.embed_one(&p.question).await?;

        let hits = if !p.use_context {
            Vec::new()
        } else if p.use_hyde {
            self.retrieve_with_hyde(&p.question, &question_embedding, &zpt_state, p.mode.k()).await?
        } else {
            self.retriever.retrieve(&question_embedding, &p.question, &zpt_state, p.mode.k()).await?
        };

        let ContextBundle { prompt, included_uris, degraded: no_context } = build_context(&p.question, hits, self.context_budget);

        match self
            .chat
            .chat("You are a careful assistant. Answer using only the supplied context.", &prompt, ChatOptions::default())
            .await
        {
            Ok(answer) => Ok(VerbResponse {
                success: true,
                session_id: session_id.to_string(),
                payload: json!({ "answer": answer, "sources": included_uris, "noContext": no_context }),
                degraded: no_context,
            }),
            Err(e) => {
                let core: CoreError = e.into();
                if core.is_degradable() {
                    Ok(VerbResponse {
                        success: false,
                        session_id: session_id.to_string(),
                        payload: json!({
                            "answer": "I don't have enough information to answer confidently right now.",
                            "sources": included_uris,
                            "error": core.to_string(),
                        }),
                        degraded: true,
                    })
                } else {
                    Err(core)
                }
            }
        }
    }

    async fn retrieve_with_hyde(&self, question: &str, question_embedding: &[f32], zpt_state: &ZptState, k: usize) -> Result<Vec<Hit>> {
        let hyde_prompt = format!("Write a short hypothetical answer to this question, for retrieval purposes only: {question}");
        let hyde_answer = self.chat.chat("You produce brief hypothetical answers for retrieval augmentation.", &hyde_prompt, ChatOptions { temperature: 0.3, max_tokens: Some(256) }).await?;
        let hyde_embedding = self.embed_one(&hyde_answer).await?;

        let direct = self.retriever.retrieve(question_embedding, question, zpt_state, k).await?;
        let via_hyde = self.retriever.retrieve(&hyde_embedding, question, zpt_state, k).await?;

        let mut merged: HashMap<String, Hit> = HashMap::new();
        for hit in direct.into_iter().chain(via_hyde) {
            merged
                .entry(hit.uri.clone())
                .and_modify(|existing| {
                    if hit.score > existing.score {
                        *existing = hit.clone();
                    }
                })
                .or_insert(hit);
        }
        let mut hits: Vec<Hit> = merged.into_values().collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }

    async fn augment(&self, params: Value, session_id: &str) -> Result<VerbResponse> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct AugmentParams {
            #[serde(default)]
            operation: AugmentOp,
            #[serde(default)]
            target: String,
            #[serde(default)]
            options: Value,
        }
        #[derive(Deserialize, Default, PartialEq, Clone, Copy)]
        #[serde(rename_all = "snake_case")]
        enum AugmentOp {
            #[default]
            Auto,
            Concepts,
            Attributes,
            Relationships,
            ProcessLazy,
            ChunkDocuments,
        }

        let p: AugmentParams = parse_params(params)?;
        let _ = p.options;

        let payload = match p.operation {
            AugmentOp::Concepts | AugmentOp::Attributes if !p.target.is_empty() => {
                let templates = semem_providers::PromptTemplateService::new();
                let concepts = semem_ingest::extract_concepts(self.chat.as_ref(), &templates, &p.target).await?;
                json!({ "concepts": concepts })
            }
            AugmentOp::Concepts | AugmentOp::Attributes => {
                return Err(CoreError::Validation("augment.target is required for concept/attribute extraction".to_string()));
            }
            AugmentOp::ChunkDocuments => {
                let chunks = semem_ingest::chunk(&p.target, semem_ingest::ChunkerConfig::default());
                json!({ "chunkCount": chunks.len() })
            }
            AugmentOp::ProcessLazy => self.process_lazy_batch().await?,
            AugmentOp::Auto if !p.target.is_empty() => {
                let templates = semem_providers::PromptTemplateService::new();
                let concepts = semem_ingest::extract_concepts(self.chat.as_ref(), &templates, &p.target).await?;
                json!({ "concepts": concepts })
            }
            AugmentOp::Auto => self.process_lazy_batch().await?,
            AugmentOp::Relationships => {
                let corpuscles = self.fetch_known_corpuscles(5_000).await?;
                let sweep = semem_graph::RelationshipBuilder::new(semem_graph::SweepConfig::default());
                let relationships = sweep.sweep(&corpuscles);
                if !relationships.is_empty() {
                    self.store.update(&semem_graph::to_insert_query(&relationships)).await?;
                }
                json!({ "relationshipCount": relationships.len() })
            }
        };

        Ok(VerbResponse { success: true, session_id: session_id.to_string(), payload, degraded: false })
    }

    fn zoom(&self, params: Value, session_id: &str) -> Result<VerbResponse> {
        #[derive(Deserialize)]
        struct ZoomParams {
            level: ZoomLevel,
        }
        let p: ZoomParams = parse_params(params)?;
        self.navigator.zoom(session_id, p.level);
        Ok(VerbResponse { success: true, session_id: session_id.to_string(), payload: json!({ "zoom": p.level }), degraded: false })
    }

    fn pan(&self, params: Value, session_id: &str) -> Result<VerbResponse> {
        let filter: PanFilter = if params.is_null() { PanFilter::default() } else { parse_params(params)? };
        self.navigator.pan(session_id, filter.clone());
        Ok(VerbResponse { success: true, session_id: session_id.to_string(), payload: json!({ "pan": filter }), degraded: false })
    }

    fn tilt(&self, params: Value, session_id: &str) -> Result<VerbResponse> {
        #[derive(Deserialize)]
        struct TiltParams {
            style: TiltStyle,
        }
        let p: TiltParams = parse_params(params)?;
        self.navigator.tilt(session_id, p.style);
        Ok(VerbResponse { success: true, session_id: session_id.to_string(), payload: json!({ "tilt": p.style }), degraded: false })
    }

    async fn inspect(&self, params: Value, session_id: &str) -> Result<VerbResponse> {
        #[derive(Deserialize, Default)]
        #[serde(rename_all = "lowercase")]
        enum What {
            #[default]
            Zpt,
            Counts,
            Interaction,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct InspectParams {
            #[serde(default)]
            what: What,
            #[serde(default)]
            details: Option<String>,
        }
        let p: InspectParams = parse_params(params)?;
        let payload = match p.what {
            What::Zpt => json!({ "zptState": self.navigator.inspect(session_id) }),
            What::Counts => {
                let lazy = self.memory.find_lazy(10_000).await?.len();
                json!({ "lazyCount": lazy, "indexedCount": self.index.len() })
            }
            What::Interaction => {
                let id = p.details.ok_or_else(|| CoreError::Validation("inspect.details (interaction id) required".to_string()))?;
                json!({ "id": id })
            }
        };
        Ok(VerbResponse { success: true, session_id: session_id.to_string(), payload, degraded: false })
    }

    async fn train_vsom(&self, params: Value, session_id: &str) -> Result<VerbResponse> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct TrainVsomParams {
            #[serde(default = "default_epochs")]
            epochs: usize,
            #[serde(default = "default_learning_rate")]
            learning_rate: f32,
            #[serde(default = "default_grid_size")]
            grid_size: usize,
            #[serde(default)]
            seed: u64,
        }
        fn default_epochs() -> usize {
            100
        }
        fn default_learning_rate() -> f32 {
            0.1
        }
        fn default_grid_size() -> usize {
            20
        }

        let p: TrainVsomParams = parse_params(params)?;
        let corpuscles = self.fetch_known_corpuscles(5_000).await?;
        let entities: Vec<TrainingEntity> = corpuscles
            .into_iter()
            .filter_map(|c| c.embedding.map(|e| TrainingEntity { uri: c.uri, embedding: e }))
            .collect();
        if entities.is_empty() {
            return Err(CoreError::Validation("train-vsom requires at least one embedded corpuscle".to_string()));
        }

        let config = TrainerConfig {
            grid_size: p.grid_size,
            epochs: p.epochs,
            dimension: self.dimension,
            seed: p.seed,
            eta_initial: p.learning_rate,
            eta_final: (p.learning_rate / 10.0).max(0.001),
        };

        // §4.12: training is synchronous CPU-bound work and runs off the
        // request thread.
        let report = tokio::task::spawn_blocking(move || {
            let mut trainer = VsomTrainer::new(config);
            let cancel = AtomicBool::new(false);
            trainer.train(&entities, Some(&cancel))
        })
        .await
        .map_err(|e| CoreError::Cancelled(e.to_string()))??;

        Ok(VerbResponse {
            success: true,
            session_id: session_id.to_string(),
            payload: json!({
                "epochsCompleted": report.epochs_completed,
                "topographicError": report.topographic_error,
                "finalQuantizationError": report.quantization_error_by_epoch.last().copied().unwrap_or(0.0),
                "positionCount": report.positions.len(),
            }),
            degraded: false,
        })
    }

    async fn process_lazy_batch(&self) -> Result<Value> {
        let lazy_ids = self.memory.find_lazy(1_000).await?;
        let mut processed = 0usize;
        for id in &lazy_ids {
            let content = self.fetch_lazy_content(id).await?;
            let Some(content) = content else { continue };
            let embedding = self.embed_one(&content).await?;
            self.memory.promote_lazy(id, &embedding, None).await?;
            self.index.insert(&interaction_uri(id), embedding);
            processed += 1;
        }
        Ok(json!({ "processed": processed, "remaining": lazy_ids.len() - processed }))
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embedder.embed(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| CoreError::Provider("embedding provider returned no vectors".to_string()))
    }

    async fn fetch_known_corpuscles(&self, limit: usize) -> Result<Vec<Corpuscle>> {
        let query = format!(
            "{prefix}SELECT ?node ?embedding WHERE {{ ?node <{emb_p}> ?embedding . }} LIMIT {limit}",
            prefix = vocab::prefix_block(),
            emb_p = vocab::SEMEM_EMBEDDING,
        );
        let rows = self.store.select(&query).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let uri = match row.get("node")? {
                    Term::Iri(u) => u.clone(),
                    Term::Literal { value, .. } => value.clone(),
                };
                let embedding = row.get("embedding").and_then(|t| match t {
                    Term::Literal { value, .. } => serde_json::from_str::<Vec<f32>>(value).ok(),
                    Term::Iri(_) => None,
                });
                Some(Corpuscle { uri, embedding, entity_labels: Vec::new() })
            })
            .collect())
    }

    async fn fetch_lazy_content(&self, id: &str) -> Result<Option<String>> {
        let uri = interaction_uri(id);
        let query = format!(
            "{prefix}SELECT ?prompt WHERE {{ <{uri}> <{p}> ?prompt . }} LIMIT 1",
            prefix = vocab::prefix_block(),
            p = vocab::SEMEM_PROMPT,
        );
        let rows = self.store.select(&query).await?;
        Ok(rows.into_iter().next().and_then(|row| {
            row.get("prompt").map(|t| match t {
                Term::Literal { value, .. } => value.clone(),
                Term::Iri(u) => u.clone(),
            })
        }))
    }
}

fn interaction_uri(id: &str) -> String {
    format!("{}Interaction/{}", vocab::SEMEM, id)
}

fn parse_params<T: for<'de> Deserialize<'de>>(params: Value) -> Result<T> {
    serde_json::from_value(params).map_err(|e| CoreError::Validation(e.to_string()))
}

/// Legacy parameter names accepted and mapped to canonical ones with a
/// debug-level warning (§4.13).
fn normalize_legacy_keys(params: &mut Value, verb: &str) {
    const LEGACY: &[(&str, &[(&str, &str)])] = &[
        ("tell", &[("text", "content"), ("isLazy", "lazy")]),
        ("ask", &[("query", "question"), ("useHyde", "useHyDE")]),
        ("augment", &[("op", "operation")]),
    ];
    let Value::Object(map) = params else { return };
    let Some((_, mappings)) = LEGACY.iter().find(|(v, _)| *v == verb) else { return };
    for (legacy, canonical) in *mappings {
        if !map.contains_key(*canonical) {
            if let Some(value) = map.remove(*legacy) {
                debug!(verb, legacy, canonical, "mapped legacy parameter name to canonical form");
                map.insert((*canonical).to_string(), value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_verb_fails() {
        let semem = Semem::new_in_memory(8);
        let req = VerbRequest { verb: "frobnicate".to_string(), params: json!({}), session_id: "s1".to_string() };
        assert!(matches!(semem.dispatch(req).await, Err(CoreError::UnknownVerb(_))));
    }

    #[tokio::test]
    async fn tell_rejects_empty_content() {
        let semem = Semem::new_in_memory(8);
        let req = VerbRequest { verb: "tell".to_string(), params: json!({ "content": "" }), session_id: "s1".to_string() };
        assert!(matches!(semem.dispatch(req).await, Err(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn legacy_text_param_maps_to_content() {
        let semem = Semem::new_in_memory(8);
        let req = VerbRequest { verb: "tell".to_string(), params: json!({ "text": "hello legacy world" }), session_id: "s1".to_string() };
        let resp = semem.dispatch(req).await.unwrap();
        assert!(resp.success);
    }

    #[tokio::test]
    async fn eager_tell_then_ask_finds_it() {
        let semem = Semem::new_in_memory(8);
        let tell = VerbRequest {
            verb: "tell".to_string(),
            params: json!({ "content": "CouchDB is a document-oriented NoSQL database." }),
            session_id: "s1".to_string(),
        };
        semem.dispatch(tell).await.unwrap();

        let ask = VerbRequest { verb: "ask".to_string(), params: json!({ "question": "What kind of database is CouchDB?" }), session_id: "s1".to_string() };
        let resp = semem.dispatch(ask).await.unwrap();
        assert!(resp.success);
        assert!(resp.payload.get("answer").is_some());
    }

    #[tokio::test]
    async fn ask_with_no_stored_context_is_not_an_error() {
        let semem = Semem::new_in_memory(8);
        let ask = VerbRequest { verb: "ask".to_string(), params: json!({ "question": "anything?" }), session_id: "s1".to_string() };
        let resp = semem.dispatch(ask).await.unwrap();
        assert!(resp.success);
        assert!(resp.degraded);
    }

    #[tokio::test]
    async fn lazy_tell_then_process_lazy_promotes_it() {
        let semem = Semem::new_in_memory(8);
        let tell = VerbRequest {
            verb: "tell".to_string(),
            params: json!({ "content": "Neural networks learn patterns from data.", "lazy": true }),
            session_id: "s1".to_string(),
        };
        semem.dispatch(tell).await.unwrap();

        let before = semem.dispatch(VerbRequest { verb: "inspect".to_string(), params: json!({ "what": "counts" }), session_id: "s1".to_string() }).await.unwrap();
        assert_eq!(before.payload["lazyCount"], 1);

        let augment = VerbRequest { verb: "augment".to_string(), params: json!({ "operation": "process_lazy" }), session_id: "s1".to_string() };
        let resp = semem.dispatch(augment).await.unwrap();
        assert_eq!(resp.payload["processed"], 1);

        let after = semem.dispatch(VerbRequest { verb: "inspect".to_string(), params: json!({ "what": "counts" }), session_id: "s1".to_string() }).await.unwrap();
        assert_eq!(after.payload["lazyCount"], 0);
    }

    #[tokio::test]
    async fn zoom_pan_tilt_persist_then_inspect_reports_them() {
        let semem = Semem::new_in_memory(8);
        semem.dispatch(VerbRequest { verb: "zoom".to_string(), params: json!({ "level": "community" }), session_id: "s1".to_string() }).await.unwrap();
        semem.dispatch(VerbRequest { verb: "pan".to_string(), params: json!({ "domains": ["AI"] }), session_id: "s1".to_string() }).await.unwrap();
        semem.dispatch(VerbRequest { verb: "tilt".to_string(), params: json!({ "style": "graph" }), session_id: "s1".to_string() }).await.unwrap();

        let resp = semem.dispatch(VerbRequest { verb: "inspect".to_string(), params: json!({}), session_id: "s1".to_string() }).await.unwrap();
        let zpt = &resp.payload["zptState"];
        assert_eq!(zpt["zoom"], "community");
        assert_eq!(zpt["tilt"], "graph");
    }

    #[tokio::test]
    async fn train_vsom_requires_embedded_data() {
        let semem = Semem::new_in_memory(4);
        let req = VerbRequest { verb: "train-vsom".to_string(), params: json!({ "epochs": 5, "gridSize": 3 }), session_id: "s1".to_string() };
        assert!(matches!(semem.dispatch(req).await, Err(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn train_vsom_succeeds_after_data_exists() {
        let semem = Semem::new_in_memory(4);
        for text in ["alpha content", "beta content", "gamma content"] {
            semem.dispatch(VerbRequest { verb: "tell".to_string(), params: json!({ "content": text }), session_id: "s1".to_string() }).await.unwrap();
        }
        let req = VerbRequest { verb: "train-vsom".to_string(), params: json!({ "epochs": 5, "gridSize": 3 }), session_id: "s1".to_string() };
        let resp = semem.dispatch(req).await.unwrap();
        assert!(resp.success);
    }

    #[test]
    fn from_config_rejects_invalid_config() {
        let mut config = semem_config::SememConfig::default();
        config.memory.dimension = 0;
        assert!(matches!(Semem::from_config(&config), Err(crate::error::SetupError::Config(_))));
    }

    #[test]
    fn from_config_requires_a_usable_llm_provider() {
        let config = semem_config::SememConfig::default();
        assert!(matches!(Semem::from_config(&config), Err(crate::error::SetupError::NoUsableProvider("llm"))));
    }

    #[test]
    fn from_config_accepts_ollama_as_the_zero_config_fallback() {
        let mut config = semem_config::SememConfig::default();
        config.llm_providers.push(semem_config::ProviderEntry {
            name: "ollama".to_string(),
            model: "llama3".to_string(),
            endpoint: Some("http://localhost:11434".to_string()),
            api_key_env: None,
            timeout_secs: None,
        });
        config.embedding_providers.push(semem_config::ProviderEntry {
            name: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            endpoint: None,
            api_key_env: None,
            timeout_secs: None,
        });
        assert!(Semem::from_config(&config).is_ok());
    }
}
