//! Serializes [`Relationship`] values to SPARQL `INSERT DATA` bodies.
//!
//! Shared by the ingestion orchestrator's document-level similarity edges
//! (C8) and any caller that persists a [`RelationshipBuilder`] sweep's
//! output (C9) — both need the identical reified-edge triple shape, so it
//! lives once here rather than being duplicated per caller.

use semem_core::{escaping, vocab};

use crate::types::Relationship;

/// Build one `INSERT DATA { ... }` update (with the shared `PREFIX` block)
/// covering every relationship in `relationships`. Empty input yields an
/// empty-bodied but syntactically valid update.
#[must_use]
pub fn to_insert_query(relationships: &[Relationship]) -> String {
    let mut body = String::new();
    for r in relationships {
        body.push_str(&to_triples(r));
    }
    format!("{}INSERT DATA {{ {body} }}", vocab::prefix_block())
}

/// Render a single relationship's reified triples (§3: relationships are
/// first-class nodes, not plain predicate-arcs).
#[must_use]
pub fn to_triples(r: &Relationship) -> String {
    let mut out = format!(
        "<{uri}> a <{class}> .\n\
         <{uri}> <{has_source}> <{source}> .\n\
         <{uri}> <{has_target}> <{target}> .\n\
         <{uri}> <{rtype_p}> \"{rtype}\" .\n\
         <{uri}> <{weight_p}> \"{weight}\"^^<{xsd_float}> .\n\
         <{uri}> <{ts_p}> {ts} .\n",
        uri = r.uri,
        class = vocab::RAGNO_RELATIONSHIP,
        has_source = vocab::RAGNO_HAS_SOURCE_ENTITY,
        source = r.source,
        has_target = vocab::RAGNO_HAS_TARGET_ENTITY,
        target = r.target,
        rtype_p = vocab::RAGNO_RELATIONSHIP_TYPE,
        rtype = r.relationship_type,
        weight_p = vocab::RAGNO_WEIGHT,
        weight = r.weight,
        xsd_float = format!("{}float", vocab::XSD),
        ts_p = vocab::SEMEM_TIMESTAMP,
        ts = escaping::format_datetime(r.timestamp),
    );
    if let Some(desc) = &r.description {
        out.push_str(&format!(
            "<{uri}> <{p}> \"{d}\" .\n",
            uri = r.uri,
            p = vocab::RAGNO_DESCRIPTION,
            d = escaping::escape_literal(desc)
        ));
    }
    if let Some(source_corpus) = &r.source_corpus {
        out.push_str(&format!(
            "<{uri}> <{p}> <{c}> .\n",
            uri = r.uri,
            p = vocab::RAGNO_SOURCE_CORPUS,
            c = source_corpus
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use semem_core::RelationshipType;

    #[test]
    fn renders_a_similarity_relationship() {
        let r = Relationship::new("http://a/doc1", "http://a/doc2", RelationshipType::Similarity, 0.42, "sweep-1");
        let query = to_insert_query(&[r]);
        assert!(query.contains("INSERT DATA"));
        assert!(query.contains("\"similarity\""));
        assert!(query.contains("0.42"));
    }

    #[test]
    fn empty_input_is_still_a_valid_update() {
        let query = to_insert_query(&[]);
        assert!(query.contains("INSERT DATA {  }"));
    }
}
