//! A minimal RDF term model and triple-pattern tokenizer.
//!
//! `InMemorySparqlStore` doesn't embed a general SPARQL engine — it parses
//! the small, self-consistent subset of SPARQL this workspace's own writers
//! and query templates emit (IRIs, typed/untyped string literals, and `?var`
//! placeholders in triple-pattern position), the same "naive pattern
//! matching" scope called out for the storage test double in DESIGN.md.

use std::fmt;

/// A concrete RDF term (no variables) — what's actually stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Iri(String),
    Literal { value: String, datatype: Option<String> },
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(u) => write!(f, "<{u}>"),
            Term::Literal { value, datatype: Some(dt) } => write!(f, "\"{value}\"^^<{dt}>"),
            Term::Literal { value, datatype: None } => write!(f, "\"{value}\""),
        }
    }
}

/// A term appearing in a triple pattern: either a concrete term or a
/// variable to bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternTerm {
    Var(String),
    Term(Term),
}

/// A single `subject predicate object` pattern.
#[derive(Debug, Clone)]
pub struct TriplePattern {
    pub s: PatternTerm,
    pub p: PatternTerm,
    pub o: PatternTerm,
}

/// A fully bound triple, ready for insertion/deletion.
#[derive(Debug, Clone)]
pub struct Triple {
    pub s: Term,
    pub p: Term,
    pub o: Term,
}

/// Tokenize and parse a `{ ... }` block body (brace contents already
/// stripped by the caller) into a list of triple patterns, one per `.`
/// terminated statement.
pub fn parse_block(body: &str) -> Vec<TriplePattern> {
    let tokens = tokenize(body);
    let mut patterns = Vec::new();
    let mut current = Vec::new();
    for tok in tokens {
        if tok == "." {
            if current.len() == 3 {
                patterns.push(TriplePattern {
                    s: to_pattern_term(&current[0]),
                    p: to_pattern_term(&current[1]),
                    o: to_pattern_term(&current[2]),
                });
            }
            current.clear();
        } else {
            current.push(tok);
        }
    }
    if current.len() == 3 {
        patterns.push(TriplePattern {
            s: to_pattern_term(&current[0]),
            p: to_pattern_term(&current[1]),
            o: to_pattern_term(&current[2]),
        });
    }
    patterns
}

/// Parse a block that is known to contain only ground (variable-free)
/// triples, as in `INSERT DATA { ... }` / `DELETE DATA { ... }`.
#[must_use]
pub fn parse_ground_block(body: &str) -> Vec<Triple> {
    parse_block(body)
        .into_iter()
        .filter_map(|p| match (p.s, p.p, p.o) {
            (PatternTerm::Term(s), PatternTerm::Term(p), PatternTerm::Term(o)) => {
                Some(Triple { s, p, o })
            }
            _ => None,
        })
        .collect()
}

fn to_pattern_term(tok: &str) -> PatternTerm {
    if let Some(var) = tok.strip_prefix('?') {
        PatternTerm::Var(var.to_string())
    } else {
        PatternTerm::Term(parse_term(tok))
    }
}

fn parse_term(tok: &str) -> Term {
    if let Some(inner) = tok.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
        return Term::Iri(inner.to_string());
    }
    if let Some(rest) = tok.strip_prefix('"') {
        if let Some(end) = rest.rfind('"') {
            let value = unescape(&rest[..end]);
            let tail = &rest[end + 1..];
            let datatype = tail
                .strip_prefix("^^<")
                .and_then(|s| s.strip_suffix('>'))
                .map(str::to_string);
            return Term::Literal { value, datatype };
        }
    }
    // Fall back: treat unrecognized tokens (e.g. a bare prefixed name slipping
    // through) as an opaque IRI so matching still degrades gracefully.
    Term::Iri(tok.to_string())
}

fn unescape(s: &str) -> String {
    semem_core::escaping::unescape_literal(s)
}

/// Character-level tokenizer: splits on whitespace but keeps quoted string
/// literals (with their `^^<...>` datatype suffix) and angle-bracketed IRIs
/// intact as single tokens, and treats `.` as its own token when it
/// terminates a statement (i.e. not inside a literal).
fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '<' {
            let start = i;
            i += 1;
            while i < chars.len() && chars[i] != '>' {
                i += 1;
            }
            i += 1; // consume '>'
            tokens.push(chars[start..i].iter().collect());
            continue;
        }
        if c == '"' {
            let start = i;
            i += 1;
            while i < chars.len() {
                if chars[i] == '\\' {
                    i += 2;
                    continue;
                }
                if chars[i] == '"' {
                    i += 1;
                    break;
                }
                i += 1;
            }
            // optional ^^<...> datatype suffix
            if i + 1 < chars.len() && chars[i] == '^' && chars[i + 1] == '^' {
                i += 2;
                if i < chars.len() && chars[i] == '<' {
                    while i < chars.len() && chars[i] != '>' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            tokens.push(chars[start..i].iter().collect());
            continue;
        }
        if c == '?' {
            let start = i;
            i += 1;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(chars[start..i].iter().collect());
            continue;
        }
        if c == '.' {
            tokens.push(".".to_string());
            i += 1;
            continue;
        }
        // bare token (e.g. a keyword we don't otherwise expect); consume
        // until whitespace or a structural character.
        let start = i;
        while i < chars.len() && !chars[i].is_whitespace() && chars[i] != '.' {
            i += 1;
        }
        tokens.push(chars[start..i].iter().collect());
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ground_triple() {
        let triples = parse_ground_block(r#"<http://a/s> <http://a/p> "hello" ."#);
        assert_eq!(triples.len(), 1);
        assert_eq!(triples[0].s, Term::Iri("http://a/s".to_string()));
        assert_eq!(triples[0].o, Term::Literal { value: "hello".to_string(), datatype: None });
    }

    #[test]
    fn parses_typed_literal() {
        let triples =
            parse_ground_block(r#"<http://a/s> <http://a/p> "1.5"^^<http://www.w3.org/2001/XMLSchema#float> ."#);
        assert_eq!(
            triples[0].o,
            Term::Literal {
                value: "1.5".to_string(),
                datatype: Some("http://www.w3.org/2001/XMLSchema#float".to_string())
            }
        );
    }

    #[test]
    fn parses_variable_pattern() {
        let patterns = parse_block(r#"?s <http://a/p> ?o ."#);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].s, PatternTerm::Var("s".to_string()));
        assert_eq!(patterns[0].o, PatternTerm::Var("o".to_string()));
    }

    #[test]
    fn handles_escaped_quote_in_literal() {
        let escaped = semem_core::escaping::escape_literal("she said \"hi\"");
        let block = format!(r#"<http://a/s> <http://a/p> "{escaped}" ."#);
        let triples = parse_ground_block(&block);
        match &triples[0].o {
            Term::Literal { value, .. } => assert_eq!(value, "she said \"hi\""),
            Term::Iri(_) => panic!("expected literal"),
        }
    }

    #[test]
    fn parses_multiple_statements() {
        let triples = parse_ground_block(
            r#"<http://a/s1> <http://a/p> "x" . <http://a/s2> <http://a/p> "y" ."#,
        );
        assert_eq!(triples.len(), 2);
    }
}
