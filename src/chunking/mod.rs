//! Fixed-size text chunking on word boundaries.
//!
//! Documents are cut into windows of at most `chunk_size` characters. Cuts
//! only fall on Unicode word boundaries, so a single word longer than the
//! window becomes a chunk of its own.

use unicode_segmentation::UnicodeSegmentation;

use crate::error::CommandError;

/// Default chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default overlap between consecutive chunks in characters.
pub const DEFAULT_OVERLAP: usize = 0;

/// Splits text into bounded, optionally overlapping chunks.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl Chunker {
    /// Creates a chunker.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidArgument`] if `chunk_size` is zero or
    /// `overlap` is not smaller than `chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, CommandError> {
        if chunk_size == 0 {
            return Err(CommandError::InvalidArgument(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(CommandError::InvalidArgument(format!(
                "overlap ({overlap}) must be smaller than chunk size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    /// Chunk size in characters.
    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap in characters.
    #[must_use]
    pub const fn overlap(&self) -> usize {
        self.overlap
    }

    /// Cuts `text` into trimmed, non-empty chunks in document order.
    #[must_use]
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let segments: Vec<(&str, usize)> = text
            .split_word_bounds()
            .map(|s| (s, s.chars().count()))
            .collect();

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < segments.len() {
            let mut end = start;
            let mut len = 0;
            while let Some(&(_, seg_len)) = segments.get(end) {
                if end > start && len + seg_len > self.chunk_size {
                    break;
                }
                len += seg_len;
                end += 1;
            }

            let chunk: String = segments[start..end].iter().map(|(s, _)| *s).collect();
            let trimmed = chunk.trim();
            if !trimmed.is_empty() {
                chunks.push(trimmed.to_string());
            }

            if end >= segments.len() {
                break;
            }

            // Step back over trailing segments for the overlap, always
            // leaving at least one segment of progress.
            let mut next = end;
            let mut carried = 0;
            while next > start + 1 {
                let seg_len = segments[next - 1].1;
                if carried + seg_len > self.overlap {
                    break;
                }
                carried += seg_len;
                next -= 1;
            }
            start = next;
        }

        chunks
    }
}
