//! The ZPT Navigator (C11, §4.11): a per-session zoom/pan/tilt lens over
//! the knowledge graph.
//!
//! State lives in a `DashMap<SessionId, Mutex<ZptState>>` (§4.11, §5: "each
//! session's state is behind its own mutex"), which gives serialized-in-
//! arrival-order mutation within a session for free and lock-free access
//! across sessions, the same sharding shape `semem-providers::TokenBucket`
//! uses for its own per-provider state.

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// §4.11 zoom axis: "selects the granularity ... the retriever may return".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomLevel {
    Entity,
    Unit,
    Text,
    Community,
    Corpus,
}

impl Default for ZoomLevel {
    fn default() -> Self {
        Self::Entity
    }
}

/// §4.11 tilt axis: "reweights the retriever strategies and changes the
/// final projection of results".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TiltStyle {
    Keywords,
    Embedding,
    Graph,
    Temporal,
}

impl Default for TiltStyle {
    fn default() -> Self {
        Self::Keywords
    }
}

/// A half-open temporal window, inclusive of `since`, exclusive of `until`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalWindow {
    pub since: Option<chrono::DateTime<chrono::Utc>>,
    pub until: Option<chrono::DateTime<chrono::Utc>>,
}

/// §4.11 pan axis: "filters applied as SPARQL constraints". The default
/// (empty) pan filter matches everything. Every field is independently
/// optional in the wire format, so a caller may supply just `{"domains":
/// [...]}` and leave the rest defaulted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanFilter {
    pub domains: Option<Vec<String>>,
    pub keywords: Option<Vec<String>>,
    pub entities: Option<Vec<String>>,
    pub temporal: Option<TemporalWindow>,
}

impl PanFilter {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.domains.is_none() && self.keywords.is_none() && self.entities.is_none() && self.temporal.is_none()
    }
}

/// "exactly one (zoom, pan, tilt) tuple" per session (§8 invariant).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZptState {
    pub zoom: ZoomLevel,
    pub pan: PanFilter,
    pub tilt: TiltStyle,
}

/// Per-session ZPT state, keyed by opaque session id (§4.11, §5).
pub struct ZptNavigator {
    sessions: DashMap<String, Mutex<ZptState>>,
}

impl ZptNavigator {
    #[must_use]
    pub fn new() -> Self {
        Self { sessions: DashMap::new() }
    }

    /// §4.11: "A new session id starts at defaults". No explicit
    /// create step is required; reads materialize the default state.
    #[must_use]
    pub fn inspect(&self, session_id: &str) -> ZptState {
        self.sessions.entry(session_id.to_string()).or_default().lock().clone()
    }

    pub fn zoom(&self, session_id: &str, level: ZoomLevel) {
        let entry = self.sessions.entry(session_id.to_string()).or_default();
        entry.lock().zoom = level;
    }

    pub fn pan(&self, session_id: &str, filter: PanFilter) {
        let entry = self.sessions.entry(session_id.to_string()).or_default();
        entry.lock().pan = filter;
    }

    pub fn tilt(&self, session_id: &str, style: TiltStyle) {
        let entry = self.sessions.entry(session_id.to_string()).or_default();
        entry.lock().tilt = style;
    }
}

impl Default for ZptNavigator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_at_defaults() {
        let nav = ZptNavigator::new();
        let state = nav.inspect("s1");
        assert_eq!(state.zoom, ZoomLevel::Entity);
        assert!(state.pan.is_empty());
        assert_eq!(state.tilt, TiltStyle::Keywords);
    }

    #[test]
    fn mutations_persist_across_verbs_within_a_session() {
        let nav = ZptNavigator::new();
        nav.zoom("s1", ZoomLevel::Community);
        nav.tilt("s1", TiltStyle::Graph);
        let state = nav.inspect("s1");
        assert_eq!(state.zoom, ZoomLevel::Community);
        assert_eq!(state.tilt, TiltStyle::Graph);
    }

    #[test]
    fn pan_with_empty_filter_resets() {
        let nav = ZptNavigator::new();
        nav.pan("s1", PanFilter { domains: Some(vec!["AI".to_string()]), ..Default::default() });
        assert!(!nav.inspect("s1").pan.is_empty());
        nav.pan("s1", PanFilter::default());
        assert!(nav.inspect("s1").pan.is_empty());
    }

    #[test]
    fn sessions_are_independent() {
        let nav = ZptNavigator::new();
        nav.zoom("s1", ZoomLevel::Corpus);
        assert_eq!(nav.inspect("s2").zoom, ZoomLevel::Entity);
    }
}
