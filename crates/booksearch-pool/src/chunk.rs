//! Lazy, order-preserving partition of a document into fixed-size chunks.
use std::num::NonZeroUsize;
use std::sync::Arc;

use booksearch_core::types::Paragraph;

/// A contiguous run of paragraphs handed to exactly one worker slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub paragraphs: Vec<Paragraph>,
}

impl Chunk {
    pub fn len(&self) -> usize { self.paragraphs.len() }

    pub fn is_empty(&self) -> bool { self.paragraphs.is_empty() }

    /// Ordinal of the final paragraph; its result closes the chunk.
    pub fn last_ordinal(&self) -> Option<usize> { self.paragraphs.last().map(|p| p.ordinal) }
}

/// The `cursor`-th chunk of `paragraphs`, or `None` once the partition is exhausted.
/// Every chunk but the last holds exactly `chunk_size` paragraphs.
pub fn next_chunk(paragraphs: &[Paragraph], chunk_size: usize, cursor: usize) -> Option<Chunk> {
    if chunk_size == 0 {
        return None;
    }
    let start = cursor.checked_mul(chunk_size)?;
    if start >= paragraphs.len() {
        return None;
    }
    let end = start.saturating_add(chunk_size).min(paragraphs.len());
    Some(Chunk { index: cursor, paragraphs: paragraphs[start..end].to_vec() })
}

/// Pull-driven chunk producer for one document. Nothing is sliced until asked for.
#[derive(Debug, Clone)]
pub struct ChunkSource {
    paragraphs: Arc<[Paragraph]>,
    chunk_size: NonZeroUsize,
    cursor: usize,
}

impl ChunkSource {
    pub fn new(paragraphs: Arc<[Paragraph]>, chunk_size: NonZeroUsize) -> Self { Self { paragraphs, chunk_size, cursor: 0 } }

    pub fn next_chunk(&mut self) -> Option<Chunk> {
        let chunk = next_chunk(&self.paragraphs, self.chunk_size.get(), self.cursor)?;
        self.cursor += 1;
        Some(chunk)
    }

    /// Start handing out the same partition again from the first chunk.
    pub fn rewind(&mut self) { self.cursor = 0; }

    /// Chunks handed out since construction or the last rewind.
    pub fn issued(&self) -> usize { self.cursor }

    pub fn chunk_count(&self) -> usize { self.paragraphs.len().div_ceil(self.chunk_size.get()) }

    pub fn paragraph_count(&self) -> usize { self.paragraphs.len() }
}

impl Iterator for ChunkSource {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> { self.next_chunk() }
}
