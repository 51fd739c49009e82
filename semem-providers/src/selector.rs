//! Priority-ordered provider selection (§6 "Selection is priority-ordered
//! from config: first entry with a valid API key wins; Ollama is the
//! zero-config fallback"), grounded on `ProviderConfig::from_env` in
//! `llmspell-providers::abstraction` but made a pure function over the
//! config list so it's trivially unit-testable without touching the
//! environment beyond what `ProviderEntry::resolve_api_key` already reads.

use semem_config::ProviderEntry;

/// Which kind of provider a config entry resolved to, so callers can
/// construct the matching concrete connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderKind {
    Ollama,
    Other(String),
}

/// Select the first usable provider entry, in list order. Returns `None`
/// if the list is empty or every entry requires an unset API key.
#[must_use]
pub fn select_provider(entries: &[ProviderEntry]) -> Option<&ProviderEntry> {
    entries.iter().find(|e| e.is_usable())
}

#[must_use]
pub fn provider_kind(entry: &ProviderEntry) -> ProviderKind {
    if entry.name.eq_ignore_ascii_case("ollama") {
        ProviderKind::Ollama
    } else {
        ProviderKind::Other(entry.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, key_env: Option<&str>) -> ProviderEntry {
        ProviderEntry {
            name: name.to_string(),
            model: "m".to_string(),
            endpoint: None,
            api_key_env: key_env.map(str::to_string),
            timeout_secs: None,
        }
    }

    #[test]
    fn first_usable_entry_wins() {
        let entries = vec![
            entry("mistral", Some("SEMEM_TEST_SELECTOR_UNSET_1")),
            entry("ollama", None),
        ];
        let selected = select_provider(&entries).unwrap();
        assert_eq!(selected.name, "ollama");
    }

    #[test]
    fn empty_list_selects_none() {
        assert!(select_provider(&[]).is_none());
    }

    #[test]
    fn all_unusable_selects_none() {
        let entries = vec![entry("mistral", Some("SEMEM_TEST_SELECTOR_UNSET_2"))];
        assert!(select_provider(&entries).is_none());
    }
}
