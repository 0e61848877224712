//! Domain types shared by the matcher, the worker pool and its consumers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Monotonic epoch number. Every (document, query) pairing gets a new one.
pub type EpochId = u64;

/// An immutable search phrase, current for exactly one epoch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query(Arc<str>);

impl Query {
    pub fn new(text: impl Into<Arc<str>>) -> Self { Self(text.into()) }

    pub fn as_str(&self) -> &str { &self.0 }

    /// Length in characters, which is the unit every match index uses.
    pub fn char_len(&self) -> usize { self.0.chars().count() }
}

impl Default for Query {
    fn default() -> Self { Self::new("") }
}

impl From<&str> for Query {
    fn from(s: &str) -> Self { Self::new(s) }
}

impl From<String> for Query {
    fn from(s: String) -> Self { Self::new(s) }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// A paragraph of a document together with its position in that document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    pub ordinal: usize,
    pub text: Arc<str>,
}

impl Paragraph {
    pub fn new(ordinal: usize, text: impl Into<Arc<str>>) -> Self { Self { ordinal, text: text.into() } }
}

/// Raw output of the fuzzy matcher for one (needle, haystack) pair.
///
/// `start_index`/`end_index` are character offsets into the haystack.
/// `similarity_score` is `1.0` for an exact hit and `1 - distance / needle_len`
/// otherwise, so it can go negative for very poor matches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuzzyMatch {
    pub distance: usize,
    pub start_index: usize,
    pub end_index: usize,
    pub similarity_score: f64,
}

/// Identifies the epoch (and its query) a result was computed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryTag {
    pub epoch: EpochId,
    pub query: Query,
}

impl QueryTag {
    pub fn new(epoch: EpochId, query: Query) -> Self { Self { epoch, query } }
}

/// One scored paragraph. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuzzyMatchResult {
    pub paragraph: Arc<str>,
    pub ordinal: usize,
    pub distance: usize,
    pub span_start: usize,
    pub span_end: usize,
    pub similarity_score: f64,
    pub query_tag: QueryTag,
}

impl FuzzyMatchResult {
    pub fn new(paragraph: &Paragraph, found: FuzzyMatch, query_tag: QueryTag) -> Self {
        Self {
            paragraph: Arc::clone(&paragraph.text),
            ordinal: paragraph.ordinal,
            distance: found.distance,
            span_start: found.start_index,
            span_end: found.end_index,
            similarity_score: found.similarity_score,
            query_tag,
        }
    }

    /// Slice the paragraph around the match span.
    pub fn ranked(&self) -> RankedResult {
        RankedResult::from_span(&self.paragraph, self.span_start, self.span_end, self.similarity_score)
    }
}

/// A paragraph split into the text before, inside and after its match span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub before: String,
    #[serde(rename = "match")]
    pub matched: String,
    pub after: String,
    pub score: f64,
}

impl RankedResult {
    /// Offsets are in characters and are clamped to the text, mirroring how a
    /// substring call treats out-of-range bounds.
    pub fn from_span(text: &str, start: usize, end: usize, score: f64) -> Self {
        let start_byte = char_to_byte(text, start.min(end));
        let end_byte = char_to_byte(text, end);
        Self {
            before: text[..start_byte].to_string(),
            matched: text[start_byte..end_byte].to_string(),
            after: text[end_byte..].to_string(),
            score,
        }
    }
}

fn char_to_byte(text: &str, char_index: usize) -> usize {
    text.char_indices().nth(char_index).map_or(text.len(), |(byte, _)| byte)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub searched_count: usize,
    pub total_count: usize,
}

/// Snapshot handed to consumers: the current top results plus progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub epoch: EpochId,
    pub query: Query,
    pub searched_paragraph_count: usize,
    pub paragraph_count: usize,
    pub paragraphs: Vec<RankedResult>,
}

impl SearchResults {
    pub fn progress(&self) -> Progress {
        Progress { searched_count: self.searched_paragraph_count, total_count: self.paragraph_count }
    }

    pub fn is_complete(&self) -> bool { self.searched_paragraph_count >= self.paragraph_count }
}
