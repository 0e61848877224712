use std::hash::{Hash, Hasher};
use std::sync::Arc;

use twox_hash::XxHash64;

use crate::types::Paragraph;

/// Paragraph separator: one blank line.
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// A fetched document split into ordinal-numbered paragraphs.
#[derive(Debug, Clone)]
pub struct Document {
    url: String,
    paragraphs: Arc<[Paragraph]>,
    fingerprint: u64,
}

impl Document {
    pub fn from_text(url: impl Into<String>, text: &str) -> Self {
        Self { url: url.into(), paragraphs: split_paragraphs(text).collect(), fingerprint: fingerprint(text) }
    }

    pub fn url(&self) -> &str { &self.url }

    pub fn paragraphs(&self) -> &Arc<[Paragraph]> { &self.paragraphs }

    pub fn len(&self) -> usize { self.paragraphs.len() }

    pub fn is_empty(&self) -> bool { self.paragraphs.is_empty() }

    /// XxHash64 of the full text; equal fingerprints mean the same paragraph partition.
    pub fn fingerprint(&self) -> u64 { self.fingerprint }
}

/// Split on blank lines. Empty paragraphs are kept so ordinals line up with the source.
pub fn split_paragraphs(text: &str) -> impl Iterator<Item = Paragraph> + '_ {
    text.split(PARAGRAPH_SEPARATOR)
        .enumerate()
        .map(|(ordinal, paragraph)| Paragraph::new(ordinal, paragraph))
}

fn fingerprint(text: &str) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    text.hash(&mut hasher);
    hasher.finish()
}
