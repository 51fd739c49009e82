//! Query Template Service (C2, §4.2).
//!
//! Templates live under a `queries/` tree organized by category
//! (`retrieval`, `management`, `search`, `visualization`); each file holds
//! one SPARQL body with `${name}` placeholders, `prefixes.sparql` prepended
//! at load. The embedded default set ships via `include_str!` for
//! reproducible tests; an optional on-disk override directory takes
//! precedence and is mtime-checked per lookup.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::SystemTime;

use parking_lot::Mutex;

use crate::error::{Result, StoreError};

macro_rules! embedded_queries {
    ($($category:literal / $name:literal),+ $(,)?) => {
        &[$((concat!($category, "/", $name), include_str!(concat!("../queries/", $category, "/", $name, ".sparql")))),+]
    };
}

const EMBEDDED: &[(&str, &str)] = embedded_queries! {
    "retrieval"/"find_lazy",
    "retrieval"/"similarity_candidates",
    "retrieval"/"store_count",
    "management"/"clear_graph_marker",
    "management"/"mark_ingestion_failed",
    "search"/"keyword_filter",
    "visualization"/"entity_positions",
};

struct CacheEntry {
    body: String,
    source_path: Option<PathBuf>,
    mtime: Option<SystemTime>,
}

/// Loads and caches SPARQL query templates (C2). Cache policy: file mtime is
/// checked on each lookup; an LRU over the in-memory cache is unnecessary at
/// this scale (the template set is small and bounded) but the mtime-reload
/// semantics described in §4.2 are preserved exactly.
pub struct QueryTemplateService {
    cache: Mutex<HashMap<String, CacheEntry>>,
    override_root: Option<PathBuf>,
    prefixes: String,
}

impl QueryTemplateService {
    #[must_use]
    pub fn new() -> Self {
        let mut cache = HashMap::new();
        for (name, body) in EMBEDDED {
            cache.insert(
                (*name).to_string(),
                CacheEntry { body: (*body).to_string(), source_path: None, mtime: None },
            );
        }
        Self { cache: Mutex::new(cache), override_root: None, prefixes: semem_core::vocab::prefix_block() }
    }

    /// Construct with an on-disk override directory; files under it take
    /// precedence over the embedded defaults and are reloaded when their
    /// mtime changes.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let mut svc = Self::new();
        svc.override_root = Some(root.into());
        svc
    }

    /// Load and render `category/name` with `${key}` substitution. Unknown
    /// placeholders produce `TemplateError::Missing` per §4.2 — here
    /// represented as `StoreError::Parse`.
    pub fn get_query(&self, category: &str, name: &str, params: &HashMap<String, String>) -> Result<String> {
        let key = format!("{category}/{name}");
        self.reload_if_stale(&key);
        let cache = self.cache.lock();
        let entry = cache.get(&key).ok_or_else(|| StoreError::Parse(format!("unknown query template {key}")))?;
        let rendered = substitute(&entry.body, params)?;
        Ok(format!("{}{}", self.prefixes, rendered))
    }

    fn reload_if_stale(&self, key: &str) {
        let Some(root) = &self.override_root else { return };
        let path = root.join(format!("{key}.sparql"));
        let Ok(metadata) = std::fs::metadata(&path) else { return };
        let mtime = metadata.modified().ok();
        let mut cache = self.cache.lock();
        let needs_reload = cache.get(key).map_or(true, |e| e.source_path.as_deref() != Some(path.as_path()) || e.mtime != mtime);
        if needs_reload {
            if let Ok(body) = std::fs::read_to_string(&path) {
                cache.insert(key.to_string(), CacheEntry { body, source_path: Some(path), mtime });
            }
        }
    }
}

impl Default for QueryTemplateService {
    fn default() -> Self {
        Self::new()
    }
}

fn substitute(body: &str, params: &HashMap<String, String>) -> Result<String> {
    let mut out = String::with_capacity(body.len());
    let bytes = body.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' && i + 1 < bytes.len() && bytes[i + 1] == b'{' {
            if let Some(end) = body[i + 2..].find('}') {
                let name = &body[i + 2..i + 2 + end];
                match params.get(name) {
                    Some(value) => out.push_str(value),
                    None => return Err(StoreError::Parse(format!("missing template parameter: {name}"))),
                }
                i += 2 + end + 1;
                continue;
            }
        }
        let ch = body[i..].chars().next().unwrap();
        out.push(ch);
        i += ch.len_utf8();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_known_template() {
        let svc = QueryTemplateService::new();
        let mut params = HashMap::new();
        params.insert("limit".to_string(), "10".to_string());
        let query = svc.get_query("retrieval", "find_lazy", &params).unwrap();
        assert!(query.contains("PREFIX ragno:"));
        assert!(query.contains("LIMIT 10"));
    }

    #[test]
    fn missing_placeholder_is_an_error() {
        let svc = QueryTemplateService::new();
        let result = svc.get_query("retrieval", "find_lazy", &HashMap::new());
        assert!(result.is_err());
    }

    #[test]
    fn substitution_is_referentially_transparent() {
        let svc = QueryTemplateService::new();
        let mut params = HashMap::new();
        params.insert("limit".to_string(), "5".to_string());
        let a = svc.get_query("retrieval", "find_lazy", &params).unwrap();
        let b = svc.get_query("retrieval", "find_lazy", &params).unwrap();
        assert_eq!(a, b);
    }
}
