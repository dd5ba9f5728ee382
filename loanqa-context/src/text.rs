//! Chunking policy for the loanqa retrieval pipeline.
//!
//! Cleaned page text arrives here as plain strings; this module slices each
//! document into bounded-size units ("chunks") that are small enough to embed
//! individually. The policy is deliberately simple: contiguous,
//! non-overlapping runs of a fixed number of characters, with no awareness of
//! word or sentence boundaries. The last chunk of a document may be shorter.
//!
//! The one guarantee callers rely on is reconstruction: concatenating the
//! chunks of a document, in order, reproduces the document byte-for-byte.
//! Downstream components index chunks by position, so the splitter must also
//! be deterministic: the same input always yields the same output.
//!
//! # Usage
//!
//! ```
//! use loanqa_context::text::TextChunker;
//!
//! let chunker = TextChunker::new(10);
//! let chunks = chunker.chunk("Home loans offer rates from 8%.");
//!
//! assert!(!chunks.is_empty());
//! let reconstructed: String = chunks.concat();
//! assert_eq!(reconstructed, "Home loans offer rates from 8%.");
//! ```

use serde::{Deserialize, Serialize};

/// A bounded-size unit of source text with a stable, 0-based id.
///
/// Ids are assigned at insertion time by the index builder and are positional:
/// the chunk with id `n` corresponds to the `n`-th vector in the vector index.
/// Chunks are immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// 0-based insertion index, stable for the lifetime of the index.
    pub id: usize,
    /// The chunk text itself.
    pub text: String,
    /// URL of the page this text was scraped from, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl Chunk {
    /// Create a chunk with the given id and text, and no source metadata.
    pub fn new(id: usize, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            source_url: None,
        }
    }

    /// Attach the source URL of the page this chunk was extracted from.
    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }
}

/// Fixed-size text splitter.
///
/// Splits text into contiguous, non-overlapping substrings of `chunk_size`
/// characters (Unicode scalar values, so a multi-byte code point is never cut
/// in half). The splitter holds no other state and is cheap to construct.
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    chunk_size: usize,
}

impl TextChunker {
    /// Creates a new chunker producing chunks of at most `chunk_size`
    /// characters.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size` is zero; a zero-size chunk can never make
    /// progress through the input.
    pub fn new(chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk_size must be positive");
        TextChunker { chunk_size }
    }

    /// The configured maximum chunk length, in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Splits `text` into chunks of at most `chunk_size` characters.
    ///
    /// The output chunks are contiguous and non-overlapping; concatenating
    /// them reproduces `text` exactly. Empty input yields an empty vector.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut start = 0;
        let mut chars_in_chunk = 0;

        for (byte_idx, _) in text.char_indices() {
            if chars_in_chunk == self.chunk_size {
                chunks.push(text[start..byte_idx].to_string());
                start = byte_idx;
                chars_in_chunk = 0;
            }
            chars_in_chunk += 1;
        }

        if start < text.len() {
            chunks.push(text[start..].to_string());
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_reconstruction() {
        // Procedurally generate a long string by repeating a simple sentence
        let text = (0..100).map(|_| "This is a test sentence. ").collect::<String>();
        let chunker = TextChunker::new(500);
        let chunks = chunker.chunk(&text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 500);
        }

        let reconstructed: String = chunks.concat();
        assert_eq!(reconstructed, text);
    }

    #[test]
    fn test_chunk_exact_multiple() {
        let chunker = TextChunker::new(4);
        let chunks = chunker.chunk("abcdefgh");

        assert_eq!(chunks, vec!["abcd", "efgh"]);
    }

    #[test]
    fn test_chunk_trailing_remainder() {
        let chunker = TextChunker::new(3);
        let chunks = chunker.chunk("abcdefgh");

        assert_eq!(chunks, vec!["abc", "def", "gh"]);
        assert_eq!(chunks.concat(), "abcdefgh");
    }

    #[test]
    fn test_chunk_single_chunk_when_size_exceeds_input() {
        let text = "Car loans require a down payment.";
        let chunker = TextChunker::new(1000);
        let chunks = chunker.chunk(text);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], text);
    }

    #[test]
    fn test_chunk_empty_input() {
        let chunker = TextChunker::new(100);
        assert!(chunker.chunk("").is_empty());
    }

    #[test]
    fn test_chunk_multibyte_boundaries() {
        // Interest-rate text with non-ASCII characters; splitting must land
        // on character boundaries, not byte boundaries.
        let text = "₹50,000 का ऋण — ब्याज दर 8.5% से शुरू";
        let chunker = TextChunker::new(5);
        let chunks = chunker.chunk(text);

        for chunk in &chunks {
            assert!(chunk.chars().count() <= 5);
        }
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_chunk_deterministic() {
        let text = "Personal loans are available for salaried applicants.";
        let chunker = TextChunker::new(7);

        assert_eq!(chunker.chunk(text), chunker.chunk(text));
    }

    #[test]
    #[should_panic(expected = "chunk_size must be positive")]
    fn test_zero_chunk_size_panics() {
        TextChunker::new(0);
    }

    #[test]
    fn test_chunk_serde_round_trip() {
        let chunk = Chunk::new(3, "Home loans offer rates from 8%.")
            .with_source_url("https://example.com/home-loans");
        let json = serde_json::to_string(&chunk).unwrap();
        let parsed: Chunk = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, chunk);
    }
}
