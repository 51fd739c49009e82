//! The Triple Store Adapter (C1): a `SparqlStore` trait, a production
//! `HttpSparqlStore` over `reqwest`, and an `InMemorySparqlStore` test
//! double — grounded on the teacher's backend-behind-trait shape
//! (`llmspell-graph::storage::SurrealDBBackend` vs. its in-memory sibling).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use reqwest::StatusCode;
use tokio::sync::Semaphore;

use crate::error::{Result, StoreError};
use crate::term::{self, PatternTerm, Term, TriplePattern};

/// One row of a SPARQL SELECT result: variable name -> bound term.
pub type Bindings = HashMap<String, Term>;
/// Full result set of a SELECT query.
pub type ResultBindings = Vec<Bindings>;

/// Retry policy for transient backend failures (§4.1: 3 attempts, 200ms ->
/// 1.6s, capped exponential backoff).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base: Duration,
    pub cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { attempts: 3, base: Duration::from_millis(200), cap: Duration::from_millis(1600) }
    }
}

impl RetryPolicy {
    /// Backoff delay for the given zero-based attempt, doubling each time
    /// and capped, with +-20% jitter to avoid synchronized retries across
    /// concurrent callers.
    fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base.as_millis().saturating_mul(1u128 << attempt.min(10));
        let capped = exp.min(self.cap.as_millis());
        let jitter_frac = rand::thread_rng().gen_range(0.8..1.2);
        Duration::from_millis((capped as f64 * jitter_frac) as u64)
    }
}

/// `select`/`update`/`clearGraph`/`verify` over a remote SPARQL endpoint
/// (C1, §4.1). Implementations are stateless aside from a connection pool;
/// all auth is supplied at construction.
#[async_trait]
pub trait SparqlStore: Send + Sync {
    async fn select(&self, query: &str) -> Result<ResultBindings>;
    async fn update(&self, query: &str) -> Result<()>;
    async fn clear_graph(&self, graph_uri: &str) -> Result<()>;
    /// `ASK { ?s ?p ?o }` on the configured graph; used at startup.
    async fn verify(&self) -> Result<bool>;
}

/// Endpoint configuration (§6 "SPARQL endpoint": `{query, update, user,
/// password, graphName}`).
#[derive(Debug, Clone)]
pub struct SparqlEndpointConfig {
    pub query_url: String,
    pub update_url: String,
    pub user: String,
    pub password: String,
    pub graph_name: String,
    pub pool_size: usize,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

/// Production adapter: POSTs `application/sparql-query` /
/// `application/sparql-update` bodies over HTTP Basic auth, connection pool
/// bounded by a semaphore on top of `reqwest::Client`'s own pool (§5: "bound
/// default 16").
pub struct HttpSparqlStore {
    client: reqwest::Client,
    config: SparqlEndpointConfig,
    pool: Arc<Semaphore>,
}

impl HttpSparqlStore {
    #[must_use]
    pub fn new(config: SparqlEndpointConfig) -> Self {
        let pool = Arc::new(Semaphore::new(config.pool_size.max(1)));
        let client = reqwest::Client::builder().timeout(config.timeout).build().unwrap_or_default();
        Self { client, config, pool }
    }

    async fn post(&self, url: &str, body: String, content_type: &str) -> Result<reqwest::Response> {
        let _permit = self.pool.acquire().await.map_err(|e| StoreError::Transient(e.to_string()))?;
        let mut attempt = 0;
        loop {
            let result = self
                .client
                .post(url)
                .header("Content-Type", content_type)
                .header("Accept", "application/sparql-results+json")
                .basic_auth(&self.config.user, Some(&self.config.password))
                .body(body.clone())
                .send()
                .await;

            match result {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return Ok(resp);
                    }
                    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                        return Err(StoreError::AuthFailed);
                    }
                    if status.is_server_error() && attempt < self.config.retry.attempts {
                        tracing::warn!(%status, attempt, "transient SPARQL backend error, retrying");
                        tokio::time::sleep(self.config.retry.delay_for(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    if status.is_server_error() {
                        return Err(StoreError::Transient(format!("status {status}")));
                    }
                    return Err(StoreError::Permanent(format!("status {status}")));
                }
                Err(e) if e.is_timeout() => {
                    return Err(StoreError::Timeout(e.to_string()));
                }
                Err(e) if attempt < self.config.retry.attempts => {
                    tracing::warn!(error = %e, attempt, "transient network error, retrying");
                    tokio::time::sleep(self.config.retry.delay_for(attempt)).await;
                    attempt += 1;
                }
                Err(e) => return Err(StoreError::Network(e)),
            }
        }
    }
}

#[async_trait]
impl SparqlStore for HttpSparqlStore {
    async fn select(&self, query: &str) -> Result<ResultBindings> {
        let resp = self.post(&self.config.query_url, query.to_string(), "application/sparql-query").await?;
        let body: serde_json::Value = resp.json().await.map_err(|e| StoreError::Parse(e.to_string()))?;
        parse_sparql_json(&body)
    }

    async fn update(&self, query: &str) -> Result<()> {
        self.post(&self.config.update_url, query.to_string(), "application/sparql-update").await?;
        Ok(())
    }

    async fn clear_graph(&self, graph_uri: &str) -> Result<()> {
        self.update(&format!("CLEAR GRAPH <{graph_uri}>")).await
    }

    async fn verify(&self) -> Result<bool> {
        let bindings = self
            .select(&format!(
                "ASK FROM <{}> WHERE {{ ?s ?p ?o }}",
                self.config.graph_name
            ))
            .await?;
        Ok(!bindings.is_empty())
    }
}

fn parse_sparql_json(body: &serde_json::Value) -> Result<ResultBindings> {
    if let Some(boolean) = body.get("boolean").and_then(serde_json::Value::as_bool) {
        // ASK response shape: {"head":{},"boolean":true}
        return Ok(if boolean { vec![HashMap::new()] } else { Vec::new() });
    }
    let rows = body
        .get("results")
        .and_then(|r| r.get("bindings"))
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| StoreError::Parse("missing results.bindings".to_string()))?;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let obj = row.as_object().ok_or_else(|| StoreError::Parse("binding row is not an object".to_string()))?;
        let mut bindings = HashMap::new();
        for (var, value) in obj {
            let term_type = value.get("type").and_then(serde_json::Value::as_str).unwrap_or("literal");
            let v = value.get("value").and_then(serde_json::Value::as_str).unwrap_or_default().to_string();
            let term = match term_type {
                "uri" => Term::Iri(v),
                _ => {
                    let datatype = value.get("datatype").and_then(serde_json::Value::as_str).map(str::to_string);
                    Term::Literal { value: v, datatype }
                }
            };
            bindings.insert(var.clone(), term);
        }
        out.push(bindings);
    }
    Ok(out)
}

/// In-memory test double: a `Vec<Triple>` plus the small SPARQL-subset
/// interpreter in `crate::term`. Mirrors the teacher's
/// `InMemoryEpisodicMemory` vs. `HnswEpisodicMemory` split — unit tests use
/// this so they don't need a live Fuseki/GraphDB endpoint.
#[derive(Default)]
pub struct InMemorySparqlStore {
    triples: Mutex<Vec<term::Triple>>,
}

impl InMemorySparqlStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn triple_count(&self) -> usize {
        self.triples.lock().len()
    }
}

fn find_block(text: &str, from: usize) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let open = text[from..].find('{')? + from;
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((open + 1, i));
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn block_after(text: &str, keyword: &str, from: usize) -> Option<(String, usize)> {
    let pos = text[from..].find(keyword)? + from;
    let (start, end) = find_block(text, pos)?;
    Some((text[start..end].to_string(), end))
}

fn substitute_pattern(p: &TriplePattern, bindings: &Bindings) -> Option<term::Triple> {
    let resolve = |t: &PatternTerm| -> Option<Term> {
        match t {
            PatternTerm::Term(term) => Some(term.clone()),
            PatternTerm::Var(name) => bindings.get(name).cloned(),
        }
    };
    Some(term::Triple { s: resolve(&p.s)?, p: resolve(&p.p)?, o: resolve(&p.o)? })
}

fn eval_patterns(store: &[term::Triple], patterns: &[TriplePattern]) -> Vec<Bindings> {
    let mut solutions = vec![Bindings::new()];
    for pattern in patterns {
        let mut next = Vec::new();
        for solution in &solutions {
            for candidate in store {
                let mut trial = solution.clone();
                if matches_with_bindings(pattern, candidate, &mut trial) {
                    next.push(trial);
                }
            }
        }
        solutions = next;
        if solutions.is_empty() {
            break;
        }
    }
    solutions
}

fn matches_with_bindings(pattern: &TriplePattern, candidate: &term::Triple, bindings: &mut Bindings) -> bool {
    let check = |pt: &PatternTerm, value: &Term, bindings: &mut Bindings| -> bool {
        match pt {
            PatternTerm::Term(t) => t == value,
            PatternTerm::Var(name) => {
                if let Some(existing) = bindings.get(name) {
                    existing == value
                } else {
                    bindings.insert(name.clone(), value.clone());
                    true
                }
            }
        }
    };
    check(&pattern.s, &candidate.s, bindings)
        && check(&pattern.p, &candidate.p, bindings)
        && check(&pattern.o, &candidate.o, bindings)
}

#[async_trait]
impl SparqlStore for InMemorySparqlStore {
    async fn select(&self, query: &str) -> Result<ResultBindings> {
        let store = self.triples.lock().clone();
        let upper_start = query.trim_start();
        if upper_start.to_uppercase().starts_with("ASK") {
            let (block, _) = block_after(query, "{", 0).ok_or_else(|| StoreError::Parse("ASK missing block".to_string()))?;
            let patterns = term::parse_block(&block);
            let solutions = eval_patterns(&store, &patterns);
            return Ok(if solutions.is_empty() { Vec::new() } else { vec![Bindings::new()] });
        }
        let (block, _) = block_after(query, "WHERE", 0)
            .or_else(|| block_after(query, "{", 0))
            .ok_or_else(|| StoreError::Parse("SELECT missing WHERE block".to_string()))?;
        let patterns = term::parse_block(&block);
        let mut solutions = eval_patterns(&store, &patterns);

        if let Some(limit_pos) = query.to_uppercase().find("LIMIT") {
            if let Some(n) = query[limit_pos + 5..].split_whitespace().next().and_then(|s| s.parse::<usize>().ok()) {
                solutions.truncate(n);
            }
        }
        Ok(solutions)
    }

    async fn update(&self, query: &str) -> Result<()> {
        let upper = query.to_uppercase();
        if let Some(pos) = upper.find("CLEAR GRAPH").or_else(|| upper.find("CLEAR ")) {
            let _ = pos;
            self.triples.lock().clear();
            return Ok(());
        }
        if let Some(insert_pos) = upper.find("INSERT DATA") {
            let (block, _) = block_after(query, "{", insert_pos).ok_or_else(|| StoreError::Parse("INSERT DATA missing block".to_string()))?;
            let ground = term::parse_ground_block(&block);
            self.triples.lock().extend(ground);
            return Ok(());
        }
        if let Some(delete_pos) = upper.find("DELETE DATA") {
            let (block, _) = block_after(query, "{", delete_pos).ok_or_else(|| StoreError::Parse("DELETE DATA missing block".to_string()))?;
            let ground = term::parse_ground_block(&block);
            let mut store = self.triples.lock();
            store.retain(|t| !ground.iter().any(|g| g.s == t.s && g.p == t.p && g.o == t.o));
            return Ok(());
        }
        // General DELETE { .. } INSERT { .. } WHERE { .. } (C5 promoteLazy).
        if let Some(delete_pos) = upper.find("DELETE") {
            let (delete_block, delete_end) = find_block(query, delete_pos)
                .map(|(s, e)| (query[s..e].to_string(), e))
                .ok_or_else(|| StoreError::Parse("DELETE missing block".to_string()))?;
            let insert_pos = upper[delete_end..].find("INSERT").map(|p| p + delete_end);
            let (insert_block, insert_end) = if let Some(ip) = insert_pos {
                find_block(query, ip).map(|(s, e)| (query[s..e].to_string(), e)).ok_or_else(|| StoreError::Parse("INSERT missing block".to_string()))?
            } else {
                (String::new(), delete_end)
            };
            let where_pos = upper[insert_end..].find("WHERE").map(|p| p + insert_end);
            let where_block = if let Some(wp) = where_pos {
                find_block(query, wp).map(|(s, e)| query[s..e].to_string())
            } else {
                None
            };

            let delete_patterns = term::parse_block(&delete_block);
            let insert_patterns = term::parse_block(&insert_block);

            let bindings_list = if let Some(wb) = where_block {
                let where_patterns = term::parse_block(&wb);
                let store = self.triples.lock().clone();
                eval_patterns(&store, &where_patterns)
            } else {
                vec![Bindings::new()]
            };

            let mut store = self.triples.lock();
            for bindings in &bindings_list {
                for p in &delete_patterns {
                    if let Some(triple) = substitute_pattern(p, bindings) {
                        store.retain(|t| !(t.s == triple.s && t.p == triple.p && t.o == triple.o));
                    }
                }
                for p in &insert_patterns {
                    if let Some(triple) = substitute_pattern(p, bindings) {
                        store.push(triple);
                    }
                }
            }
            return Ok(());
        }
        Err(StoreError::Parse(format!("unrecognized update form: {query}")))
    }

    async fn clear_graph(&self, _graph_uri: &str) -> Result<()> {
        self.triples.lock().clear();
        Ok(())
    }

    async fn verify(&self) -> Result<bool> {
        Ok(!self.triples.lock().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_then_select_roundtrip() {
        let store = InMemorySparqlStore::new();
        store
            .update(r#"INSERT DATA { <http://a/s> <http://a/p> "hello" . }"#)
            .await
            .unwrap();
        let rows = store.select(r#"SELECT ?o WHERE { <http://a/s> <http://a/p> ?o }"#).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["o"], Term::Literal { value: "hello".to_string(), datatype: None });
    }

    #[tokio::test]
    async fn ask_is_true_when_store_nonempty() {
        let store = InMemorySparqlStore::new();
        assert!(!store.verify().await.unwrap());
        store
            .update(r#"INSERT DATA { <http://a/s> <http://a/p> <http://a/o> . }"#)
            .await
            .unwrap();
        assert!(store.verify().await.unwrap());
    }

    #[tokio::test]
    async fn delete_data_removes_exact_match() {
        let store = InMemorySparqlStore::new();
        store.update(r#"INSERT DATA { <http://a/s> <http://a/p> "x" . }"#).await.unwrap();
        assert_eq!(store.triple_count(), 1);
        store.update(r#"DELETE DATA { <http://a/s> <http://a/p> "x" . }"#).await.unwrap();
        assert_eq!(store.triple_count(), 0);
    }

    #[tokio::test]
    async fn delete_insert_where_atomically_transitions_status() {
        let store = InMemorySparqlStore::new();
        store
            .update(r#"INSERT DATA { <http://a/i1> <http://semem/status> "lazy" . }"#)
            .await
            .unwrap();
        store
            .update(
                r#"DELETE { <http://a/i1> <http://semem/status> ?old }
                   INSERT { <http://a/i1> <http://semem/status> "processed" . }
                   WHERE { <http://a/i1> <http://semem/status> ?old }"#,
            )
            .await
            .unwrap();
        let rows = store
            .select(r#"SELECT ?o WHERE { <http://a/i1> <http://semem/status> ?o }"#)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["o"], Term::Literal { value: "processed".to_string(), datatype: None });
    }

    #[tokio::test]
    async fn clear_graph_empties_store() {
        let store = InMemorySparqlStore::new();
        store.update(r#"INSERT DATA { <http://a/s> <http://a/p> <http://a/o> . }"#).await.unwrap();
        store.clear_graph("http://anything").await.unwrap();
        assert_eq!(store.triple_count(), 0);
    }
}
