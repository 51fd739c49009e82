//! Canonical RDF vocabulary IRIs shared by every writer and reader in the
//! workspace.
//!
//! §9 flags a real divergence in the source system: some queries assumed
//! `ragno:hasTextElement` + `skos:prefLabel` while writers used `rdfs:label`.
//! This module is the single place that shape is decided, so `semem-store`'s
//! query templates, `semem-ingest`'s writers, and `semem-graph`'s readers all
//! agree: **`rdfs:label`** for human-readable labels, **`ragno:hasTextElement`**
//! for the Document -> TextElement edge.

pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
pub const SKOS: &str = "http://www.w3.org/2004/02/skos/core#";
pub const PROV: &str = "http://www.w3.org/ns/prov#";
pub const DCTERMS: &str = "http://purl.org/dc/terms/";
pub const RAGNO: &str = "http://purl.org/stuff/ragno/";
pub const SEMEM: &str = "http://semem.hyperdata.it/";

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
pub const SKOS_MEMBER: &str = "http://www.w3.org/2004/02/skos/core#member";
pub const PROV_WAS_DERIVED_FROM: &str = "http://www.w3.org/ns/prov#wasDerivedFrom";
pub const DCTERMS_TITLE: &str = "http://purl.org/dc/terms/title";

pub const RAGNO_UNIT: &str = "http://purl.org/stuff/ragno/Unit";
pub const RAGNO_CORPUSCLE: &str = "http://purl.org/stuff/ragno/Corpuscle";
pub const RAGNO_TEXT_ELEMENT: &str = "http://purl.org/stuff/ragno/TextElement";
pub const RAGNO_DOCUMENT: &str = "http://purl.org/stuff/ragno/Document";
pub const RAGNO_ENTITY: &str = "http://purl.org/stuff/ragno/Entity";
pub const RAGNO_RELATIONSHIP: &str = "http://purl.org/stuff/ragno/Relationship";
/// Canonical Document -> TextElement edge (not `skos:member`, per the §9 note).
pub const RAGNO_HAS_TEXT_ELEMENT: &str = "http://purl.org/stuff/ragno/hasTextElement";
pub const RAGNO_CONTENT: &str = "http://purl.org/stuff/ragno/content";
pub const RAGNO_HAS_SOURCE_ENTITY: &str = "http://purl.org/stuff/ragno/hasSourceEntity";
pub const RAGNO_HAS_TARGET_ENTITY: &str = "http://purl.org/stuff/ragno/hasTargetEntity";
pub const RAGNO_RELATIONSHIP_TYPE: &str = "http://purl.org/stuff/ragno/relationshipType";
pub const RAGNO_WEIGHT: &str = "http://purl.org/stuff/ragno/weight";
pub const RAGNO_DESCRIPTION: &str = "http://purl.org/stuff/ragno/description";
pub const RAGNO_SOURCE_CORPUS: &str = "http://purl.org/stuff/ragno/sourceCorpus";

pub const SEMEM_INTERACTION: &str = "http://semem.hyperdata.it/Interaction";
pub const SEMEM_PROMPT: &str = "http://semem.hyperdata.it/prompt";
pub const SEMEM_OUTPUT: &str = "http://semem.hyperdata.it/output";
pub const SEMEM_EMBEDDING: &str = "http://semem.hyperdata.it/embedding";
pub const SEMEM_TIMESTAMP: &str = "http://semem.hyperdata.it/timestamp";
pub const SEMEM_ACCESS_COUNT: &str = "http://semem.hyperdata.it/accessCount";
pub const SEMEM_DECAY_FACTOR: &str = "http://semem.hyperdata.it/decayFactor";
pub const SEMEM_MEMORY_TYPE: &str = "http://semem.hyperdata.it/memoryType";
pub const SEMEM_PROCESSING_STATUS: &str = "http://semem.hyperdata.it/processingStatus";
pub const SEMEM_INGESTION_FAILED: &str = "http://semem.hyperdata.it/ingestionFailed";
pub const SEMEM_CHUNK_START: &str = "http://semem.hyperdata.it/chunkStart";
pub const SEMEM_CHUNK_END: &str = "http://semem.hyperdata.it/chunkEnd";
/// Domain/tag carried by a Document and denormalized onto its TextElements,
/// so the pan filter's domain constraint (§4.11) can match the same nodes
/// the keyword/content constraints match, without a join back to Document.
pub const SEMEM_DOMAIN: &str = "http://semem.hyperdata.it/domain";

/// Default named graph (§6 "Default graph: `http://hyperdata.it/content`").
pub const DEFAULT_GRAPH: &str = "http://hyperdata.it/content";

/// Shared `PREFIX` block prepended to every SPARQL query/update body.
#[must_use]
pub fn prefix_block() -> String {
    format!(
        "PREFIX rdf: <{RDF}>\nPREFIX rdfs: <{RDFS}>\nPREFIX xsd: <{XSD}>\nPREFIX skos: <{SKOS}>\nPREFIX prov: <{PROV}>\nPREFIX dcterms: <{DCTERMS}>\nPREFIX ragno: <{RAGNO}>\nPREFIX semem: <{SEMEM}>\n"
    )
}
