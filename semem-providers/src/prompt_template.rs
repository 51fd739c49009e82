//! Prompt Template Service (C3, §4.3).
//!
//! Same embedded+override-directory shape as the query template service in
//! `semem-store`, grounded on the same mtime-cache pattern, but keyed on
//! `supportedModels` globs instead of a fixed name.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use parking_lot::Mutex;

/// Output shape the template expects the LLM to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptFormat {
    Completion,
    Chat,
}

/// A single prompt template.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub name: String,
    /// Model-name globs this template supports; `"*"` matches anything.
    pub supported_models: Vec<String>,
    pub format: PromptFormat,
    pub body: String,
}

impl PromptTemplate {
    /// Specificity of the most precise glob matching `model`, or `None` if
    /// no glob in this template matches at all. Used to rank templates: a
    /// template whose glob is the bare model name outranks `"*"`.
    fn match_specificity(&self, model: &str) -> Option<usize> {
        let mut best: Option<usize> = None;
        for glob in &self.supported_models {
            if glob == "*" {
                best = best.max(Some(0));
            } else if glob_matches(glob, model) {
                // Longer, non-wildcard globs are more specific.
                best = best.max(Some(glob.len() + 1));
            }
        }
        best
    }

    /// Render this template by substituting `${name}` placeholders.
    #[must_use]
    pub fn render(&self, params: &HashMap<String, String>) -> String {
        substitute(&self.body, params)
    }
}

/// Minimal glob matcher supporting a single trailing `*` (e.g. `"gpt-4*"`),
/// which is the only pattern shape the spec's `supportedModels` globs need.
fn glob_matches(glob: &str, value: &str) -> bool {
    if let Some(prefix) = glob.strip_suffix('*') {
        value.starts_with(prefix)
    } else {
        glob == value
    }
}

fn substitute(body: &str, params: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(body.len());
    let bytes = body.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' && i + 1 < bytes.len() && bytes[i + 1] == b'{' {
            if let Some(end) = body[i + 2..].find('}') {
                let name = &body[i + 2..i + 2 + end];
                if let Some(value) = params.get(name) {
                    out.push_str(value);
                } // unknown placeholders left blank, per C2/C3 contract
                i += 2 + end + 1;
                continue;
            }
        }
        let ch = body[i..].chars().next().unwrap();
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

const BUILTIN_FALLBACK_BODY: &str = "Extract the key concepts from the following text as a JSON array of strings:\n\n${text}";
const ENHANCED_CONCEPT_EXTRACTION: &str = include_str!("../prompts/concept_extraction_enhanced.txt");
const BASIC_CONCEPT_EXTRACTION: &str = include_str!("../prompts/concept_extraction_basic.txt");
const ANSWER_SYNTHESIS: &str = include_str!("../prompts/answer_synthesis.txt");

struct CacheEntry {
    template: PromptTemplate,
    source_path: Option<PathBuf>,
    mtime: Option<SystemTime>,
}

/// Loads and selects prompt templates by model (§4.3 selection rule: most
/// specific non-wildcard match wins; fall back to "enhanced"; if that's also
/// absent, a built-in minimal fallback with a loud warning).
pub struct PromptTemplateService {
    templates: Mutex<HashMap<String, CacheEntry>>,
    override_root: Option<PathBuf>,
}

impl PromptTemplateService {
    /// Construct with the embedded default template set.
    #[must_use]
    pub fn new() -> Self {
        let mut templates = HashMap::new();
        templates.insert(
            "concept-extraction-enhanced".to_string(),
            CacheEntry {
                template: PromptTemplate {
                    name: "concept-extraction-enhanced".to_string(),
                    supported_models: vec!["*".to_string()],
                    format: PromptFormat::Chat,
                    body: ENHANCED_CONCEPT_EXTRACTION.to_string(),
                },
                source_path: None,
                mtime: None,
            },
        );
        templates.insert(
            "concept-extraction-basic".to_string(),
            CacheEntry {
                template: PromptTemplate {
                    name: "concept-extraction-basic".to_string(),
                    supported_models: vec!["mistral*".to_string(), "claude*".to_string()],
                    format: PromptFormat::Chat,
                    body: BASIC_CONCEPT_EXTRACTION.to_string(),
                },
                source_path: None,
                mtime: None,
            },
        );
        templates.insert(
            "answer-synthesis".to_string(),
            CacheEntry {
                template: PromptTemplate {
                    name: "answer-synthesis".to_string(),
                    supported_models: vec!["*".to_string()],
                    format: PromptFormat::Chat,
                    body: ANSWER_SYNTHESIS.to_string(),
                },
                source_path: None,
                mtime: None,
            },
        );
        Self { templates: Mutex::new(templates), override_root: None }
    }

    /// Construct with an on-disk override directory checked (by mtime) ahead
    /// of the embedded defaults, mirroring `QueryTemplateService::with_root`.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let mut svc = Self::new();
        svc.override_root = Some(root.into());
        svc
    }

    /// Select the best template for `category` (e.g. "concept-extraction")
    /// and `model`, per the §4.3 specificity rule.
    pub fn select(&self, category: &str, model: &str) -> PromptTemplate {
        self.reload_if_stale();
        let templates = self.templates.lock();
        let mut best: Option<(usize, &PromptTemplate)> = None;
        for entry in templates.values() {
            if !entry.template.name.starts_with(category) {
                continue;
            }
            if let Some(spec) = entry.template.match_specificity(model) {
                if best.map_or(true, |(s, _)| spec > s) {
                    best = Some((spec, &entry.template));
                }
            }
        }
        if let Some((_, t)) = best {
            return t.clone();
        }
        if let Some(entry) = templates.get(&format!("{category}-enhanced")) {
            return entry.template.clone();
        }
        tracing::warn!(category, model, "no prompt template matched; using built-in minimal fallback");
        PromptTemplate {
            name: "built-in-fallback".to_string(),
            supported_models: vec!["*".to_string()],
            format: PromptFormat::Chat,
            body: BUILTIN_FALLBACK_BODY.to_string(),
        }
    }

    fn reload_if_stale(&self) {
        let Some(root) = &self.override_root else { return };
        let mut templates = self.templates.lock();
        let Ok(read_dir) = std::fs::read_dir(root) else { return };
        for entry in read_dir.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else { continue };
            let mtime = entry.metadata().ok().and_then(|m| m.modified().ok());
            let needs_reload = templates
                .get(stem)
                .map_or(true, |e| e.source_path.as_deref() != Some(path.as_path()) || e.mtime != mtime);
            if needs_reload {
                if let Ok(body) = std::fs::read_to_string(&path) {
                    templates.insert(
                        stem.to_string(),
                        CacheEntry {
                            template: PromptTemplate {
                                name: stem.to_string(),
                                supported_models: vec!["*".to_string()],
                                format: PromptFormat::Chat,
                                body,
                            },
                            source_path: Some(path),
                            mtime,
                        },
                    );
                }
            }
        }
    }
}

impl Default for PromptTemplateService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn most_specific_model_wins_over_wildcard() {
        let svc = PromptTemplateService::new();
        let t = svc.select("concept-extraction", "claude-3-opus");
        assert_eq!(t.name, "concept-extraction-basic");
    }

    #[test]
    fn falls_back_to_enhanced_for_unmatched_model() {
        let svc = PromptTemplateService::new();
        let t = svc.select("concept-extraction", "some-random-model");
        assert_eq!(t.name, "concept-extraction-enhanced");
    }

    #[test]
    fn unknown_placeholder_left_blank() {
        let t = PromptTemplate {
            name: "x".to_string(),
            supported_models: vec!["*".to_string()],
            format: PromptFormat::Chat,
            body: "hello ${name}, ${missing}!".to_string(),
        };
        let mut params = HashMap::new();
        params.insert("name".to_string(), "world".to_string());
        assert_eq!(t.render(&params), "hello world, !");
    }

    #[test]
    fn substitution_is_referentially_transparent() {
        let t = PromptTemplate {
            name: "x".to_string(),
            supported_models: vec!["*".to_string()],
            format: PromptFormat::Chat,
            body: "${a}-${b}".to_string(),
        };
        let mut params = HashMap::new();
        params.insert("a".to_string(), "1".to_string());
        params.insert("b".to_string(), "2".to_string());
        assert_eq!(t.render(&params), t.render(&params));
    }
}
