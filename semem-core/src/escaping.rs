//! SPARQL string-literal escaping (I6).
//!
//! Used by `semem-store` when building query/update bodies, and by any
//! caller that needs to embed untrusted text in a SPARQL literal. Kept here
//! rather than in `semem-store` so `semem-ingest` and `semem-graph` can use
//! the identical routine without depending on the store crate.

/// Escape a string for safe embedding inside a SPARQL string literal
/// (`"..."`). Escapes backslash, double quote, CR, LF and tab so that no
/// stored content can close the literal or inject additional triples.
#[must_use]
pub fn escape_literal(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

/// Inverse of [`escape_literal`]. Not used on the write path (SPARQL
/// endpoints unescape on parse) but needed to validate the round-trip law in
/// §8: `unescape(escape(x)) = x`.
#[must_use]
pub fn unescape_literal(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Quote a bare URI as a SPARQL IRI reference (`<...>`).
#[must_use]
pub fn quote_uri(uri: &str) -> String {
    format!("<{uri}>")
}

/// Format a list of URIs as a comma-separated, angle-bracketed list, the
/// `formatEntityList` helper from §4.2.
#[must_use]
pub fn format_entity_list(uris: &[String]) -> String {
    uris.iter()
        .map(|u| quote_uri(u))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Format a timestamp as an `xsd:dateTime` literal, the `formatDateTime`
/// helper from §4.2.
#[must_use]
pub fn format_datetime(t: chrono::DateTime<chrono::Utc>) -> String {
    format!("\"{}\"^^xsd:dateTime", t.to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn escapes_all_dangerous_characters() {
        let input = "line1\nline2\twith\"quote\\and\rcr";
        let escaped = escape_literal(input);
        assert!(!escaped.contains('\n'));
        assert!(!escaped.contains('\t'));
        assert!(!escaped.contains('\r'));
        // every literal quote/backslash is preceded by a backslash
        assert_eq!(unescape_literal(&escaped), input);
    }

    #[test]
    fn format_entity_list_wraps_each_uri() {
        let uris = vec!["http://a".to_string(), "http://b".to_string()];
        assert_eq!(format_entity_list(&uris), "<http://a>, <http://b>");
    }

    proptest! {
        #[test]
        fn roundtrip_any_utf8(s in ".*") {
            prop_assert_eq!(unescape_literal(&escape_literal(&s)), s);
        }
    }
}
