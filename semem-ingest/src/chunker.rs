//! Chunker (C6): paragraph-merge segmentation with boundary-aligned overlap.
//!
//! Grounded on the paragraph/overlap algorithm described in §4.6; no direct
//! teacher counterpart exists (the teacher workspace chunks by token count
//! for LLM context windows, not by byte-offset document segmentation), so
//! this module is authored fresh but kept pure and restartable in the same
//! spirit as the teacher's `llmspell-rag::chunking` pipeline stages (plain
//! functions over owned data, no I/O).

use serde::{Deserialize, Serialize};

/// A single ordered, offset-stamped segment of a document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
    /// Byte offset into the original content where this chunk's
    /// non-overlapping content starts.
    pub start: usize,
    /// Byte offset (exclusive) into the original content where this chunk
    /// ends, including any trailing overlap carried into the next chunk.
    pub end: usize,
    /// Length, in bytes, of the leading overlap copied from the previous
    /// chunk (0 for the first chunk).
    pub overlap_len: usize,
}

/// Chunker tuning (§4.6 "target chunk size T... and overlap O").
#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    pub target_size: usize,
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self { target_size: 2000, overlap: 200 }
    }
}

impl ChunkerConfig {
    #[must_use]
    pub fn with_target_size(mut self, target_size: usize) -> Self {
        self.target_size = target_size;
        self
    }

    #[must_use]
    pub fn with_overlap(mut self, overlap: usize) -> Self {
        self.overlap = overlap;
        self
    }
}

/// Split `content` into paragraphs on blank-line boundaries (`\n\n+`),
/// merge adjacent paragraphs while under `target_size`, and carry the last
/// `overlap` characters (aligned to the nearest preceding whitespace) into
/// the start of the next chunk.
#[must_use]
pub fn chunk(content: &str, config: ChunkerConfig) -> Vec<Chunk> {
    if content.is_empty() {
        return Vec::new();
    }
    if content.len() <= config.target_size {
        return vec![Chunk { index: 0, text: content.to_string(), start: 0, end: content.len(), overlap_len: 0 }];
    }

    let paragraphs = split_paragraphs(content);
    let mut chunks = Vec::new();
    let mut cursor_start = 0usize; // start of the current chunk's own (non-overlap) content
    let mut buf = String::new();
    let mut overlap_len = 0usize;

    let mut para_iter = paragraphs.into_iter().peekable();
    while let Some((p_start, p_text)) = para_iter.next() {
        if buf.is_empty() && overlap_len == 0 {
            cursor_start = p_start;
        }
        let would_be = buf.len() + p_text.len();
        if !buf.is_empty() && would_be > config.target_size {
            let end = cursor_start + buf.len();
            chunks.push(Chunk { index: chunks.len(), text: std::mem::take(&mut buf), start: cursor_start, end, overlap_len });
            let (tail, tail_len) = trailing_overlap(&chunks.last().unwrap().text, config.overlap);
            overlap_len = tail_len;
            cursor_start = end - tail_len;
            buf = tail;
        }
        if !buf.is_empty() && !buf.ends_with('\n') {
            buf.push_str("\n\n");
        }
        buf.push_str(p_text);
        if para_iter.peek().is_none() {
            let end = cursor_start + buf.len();
            chunks.push(Chunk { index: chunks.len(), text: buf.clone(), start: cursor_start, end, overlap_len });
        }
    }
    chunks
}

/// Find `\n\n`-delimited paragraphs, returning each with its byte offset in
/// the original string.
fn split_paragraphs(content: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut pos = 0usize;
    for raw in content.split("\n\n") {
        // re-locate raw within content from pos to recover its true offset,
        // since split() doesn't give us offsets directly.
        if let Some(rel) = content[pos..].find(raw) {
            let start = pos + rel;
            if !raw.is_empty() {
                out.push((start, raw));
            }
            pos = start + raw.len();
        }
    }
    if out.is_empty() {
        out.push((0, content));
    }
    out
}

/// Take the trailing `want` characters (bytes) of `text`, snapped outward to
/// the nearest preceding whitespace so we never split mid-word.
fn trailing_overlap(text: &str, want: usize) -> (String, usize) {
    if want == 0 || text.len() <= want {
        return (String::new(), 0);
    }
    let raw_start = text.len() - want;
    let boundary = text[..raw_start].rfind(char::is_whitespace).map_or(raw_start, |i| i + 1);
    let tail = text[boundary..].to_string();
    let len = tail.len();
    (tail, len)
}

/// Reassemble the original content from chunks by trimming each chunk's
/// leading overlap before concatenating (§4.6 "concatenating chunks...
/// reproduces the original").
#[must_use]
pub fn reassemble(chunks: &[Chunk]) -> String {
    let mut out = String::new();
    for c in chunks {
        let trimmed = &c.text[c.overlap_len.min(c.text.len())..];
        out.push_str(trimmed);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_document_is_a_single_chunk() {
        let content = "just one short paragraph";
        let chunks = chunk(content, ChunkerConfig::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, content);
        assert_eq!(chunks[0].overlap_len, 0);
    }

    #[test]
    fn long_document_splits_into_multiple_chunks() {
        let para = "word ".repeat(100); // ~500 chars
        let content = std::iter::repeat(para).take(20).collect::<Vec<_>>().join("\n\n"); // ~10k chars
        let config = ChunkerConfig::default().with_target_size(2000).with_overlap(200);
        let chunks = chunk(&content, config);
        assert!(chunks.len() >= 4, "expected several chunks, got {}", chunks.len());
        for c in &chunks[1..] {
            assert!(c.overlap_len > 0, "non-first chunks should carry an overlap");
        }
    }

    #[test]
    fn reassembly_reproduces_the_original() {
        let para = "sentence number forms a paragraph. ".repeat(30);
        let content = std::iter::repeat(para).take(10).collect::<Vec<_>>().join("\n\n");
        let config = ChunkerConfig::default();
        let chunks = chunk(&content, config);
        assert_eq!(reassemble(&chunks), content);
    }

    #[test]
    fn chunks_are_contiguous_and_ordered() {
        let para = "abcdefgh ".repeat(50);
        let content = std::iter::repeat(para).take(15).collect::<Vec<_>>().join("\n\n");
        let chunks = chunk(&content, ChunkerConfig::default());
        for w in chunks.windows(2) {
            assert!(w[0].index < w[1].index);
            assert!(w[1].start <= w[0].end, "chunk {} should start at/before the previous chunk's end", w[1].index);
        }
    }

    #[test]
    fn empty_document_yields_no_chunks() {
        assert!(chunk("", ChunkerConfig::default()).is_empty());
    }
}
