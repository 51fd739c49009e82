//! The Context Builder (C14, §4.14): packs retrieval hits into a token-
//! budgeted prompt.
//!
//! Grounded on `llmspell-context::assembly::ContextAssembler` (temporal
//! sort + confidence filter + token-budget truncation), adapted from its
//! fixed `max_tokens`/`min_confidence` pair to the spec's score-ordered
//! greedy pack with a per-hit cap.

use semem_core::Hit;

pub const DEFAULT_TOKEN_BUDGET: usize = 4000;

/// A built prompt plus which hits made it in, so the caller can cite
/// sources (§4.14 point 4).
#[derive(Debug, Clone)]
pub struct ContextBundle {
    pub prompt: String,
    pub included_uris: Vec<String>,
    /// True when no hits were available at all (§8 "ask with zero stored
    /// interactions: returns a structured 'no context' answer, not an
    /// error").
    pub degraded: bool,
}

const SYSTEM_PREAMBLE: &str =
    "You are a careful assistant. Answer the user's question using only the context below. If the context does not contain the answer, say so plainly.";

/// Build a structured prompt from `hits` within token budget `budget`
/// (rough token estimate `chars/4`, §4.14 point 2, matching
/// [`Hit::approx_tokens`]).
#[must_use]
pub fn build_context(question: &str, mut hits: Vec<Hit>, budget: usize) -> ContextBundle {
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    if hits.is_empty() {
        return ContextBundle {
            prompt: format!("{SYSTEM_PREAMBLE}\n\nContext:\n(no stored context is available)\n\nQuestion: {question}"),
            included_uris: Vec::new(),
            degraded: true,
        };
    }

    let per_hit_cap = (budget / 3).max(1);
    let mut used = 0usize;
    let mut included_uris = Vec::new();
    let mut context_section = String::new();
    let mut ordinal = 1;

    for hit in &hits {
        let mut content = hit.content.clone();
        let max_chars = per_hit_cap * 4;
        if content.len() > max_chars {
            content.truncate(max_chars);
        }
        let entry_tokens = content.len() / 4;
        if used + entry_tokens > budget {
            break;
        }
        let label = hit.title.clone().unwrap_or_else(|| hit.uri.clone());
        context_section.push_str(&format!("[{ordinal}] {label} (source: {})\n{content}\n\n", hit.uri));
        used += entry_tokens;
        included_uris.push(hit.uri.clone());
        ordinal += 1;
    }

    let prompt = format!("{SYSTEM_PREAMBLE}\n\nContext:\n{context_section}Question: {question}");
    ContextBundle { prompt, included_uris, degraded: false }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(uri: &str, title: &str, content: &str, score: f32) -> Hit {
        Hit {
            uri: uri.to_string(),
            title: Some(title.to_string()),
            content: content.to_string(),
            score,
            similarity_score: Some(score),
            exact_score: None,
            traversal_score: None,
            timestamp: None,
        }
    }

    #[test]
    fn no_hits_is_degraded_but_not_an_error() {
        let bundle = build_context("what is semem?", Vec::new(), DEFAULT_TOKEN_BUDGET);
        assert!(bundle.degraded);
        assert!(bundle.included_uris.is_empty());
        assert!(bundle.prompt.contains("no stored context"));
    }

    #[test]
    fn packs_highest_scoring_hits_first() {
        let hits = vec![hit("http://a", "A", "low score content", 0.2), hit("http://b", "B", "high score content", 0.9)];
        let bundle = build_context("q", hits, DEFAULT_TOKEN_BUDGET);
        assert_eq!(bundle.included_uris, vec!["http://b".to_string(), "http://a".to_string()]);
    }

    #[test]
    fn truncates_a_hit_to_budget_over_three() {
        let long_content = "x".repeat(100_000);
        let hits = vec![hit("http://a", "A", &long_content, 0.9)];
        let bundle = build_context("q", hits, 300);
        let cap_chars = (300 / 3) * 4;
        assert!(bundle.prompt.len() < long_content.len());
        assert!(bundle.prompt.contains(&"x".repeat(cap_chars.min(50))));
    }

    #[test]
    fn stops_packing_once_budget_exhausted() {
        let hits: Vec<Hit> = (0..50).map(|i| hit(&format!("http://{i}"), "T", &"word ".repeat(200), 0.5)).collect();
        let bundle = build_context("q", hits, 100);
        assert!(bundle.included_uris.len() < 50);
    }
}
