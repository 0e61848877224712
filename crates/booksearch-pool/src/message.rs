//! Messages exchanged between the dispatcher and its workers.
//!
//! Both directions are internally tagged on `type`, e.g.
//! `{"type":"query","epoch":3,"value":"rabbit"}`.
use serde::{Deserialize, Serialize};

use booksearch_core::types::{EpochId, FuzzyMatchResult, Paragraph, Query, QueryTag};
use booksearch_match::ScoredParagraph;

/// Dispatcher to worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerMessage {
    /// Makes `value` the worker's query; anything still being scored is dropped.
    Query { epoch: EpochId, value: Query },
    Chunk { paragraphs: Vec<Paragraph> },
    Shutdown,
}

/// A scored paragraph without its text; the dispatcher already holds the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchReport {
    pub ordinal: usize,
    pub distance: usize,
    pub span_start: usize,
    pub span_end: usize,
    pub similarity_score: f64,
    pub query_tag: QueryTag,
}

impl MatchReport {
    pub fn into_result(self, paragraph: &Paragraph) -> FuzzyMatchResult {
        FuzzyMatchResult {
            paragraph: paragraph.text.clone(),
            ordinal: self.ordinal,
            distance: self.distance,
            span_start: self.span_start,
            span_end: self.span_end,
            similarity_score: self.similarity_score,
            query_tag: self.query_tag,
        }
    }
}

impl From<FuzzyMatchResult> for MatchReport {
    fn from(result: FuzzyMatchResult) -> Self {
        Self {
            ordinal: result.ordinal,
            distance: result.distance,
            span_start: result.span_start,
            span_end: result.span_end,
            similarity_score: result.similarity_score,
            query_tag: result.query_tag,
        }
    }
}

/// Worker to dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerReply {
    Matched(MatchReport),
    #[serde(rename_all = "camelCase")]
    Skipped { ordinal: usize, query_tag: QueryTag, reason: String },
    /// Sent once when the worker thread ends, including by panic.
    Exited,
}

impl WorkerReply {
    pub fn query_tag(&self) -> Option<&QueryTag> {
        match self {
            Self::Matched(report) => Some(&report.query_tag),
            Self::Skipped { query_tag, .. } => Some(query_tag),
            Self::Exited => None,
        }
    }

    pub fn ordinal(&self) -> Option<usize> {
        match self {
            Self::Matched(report) => Some(report.ordinal),
            Self::Skipped { ordinal, .. } => Some(*ordinal),
            Self::Exited => None,
        }
    }

    /// Rebuild the full result using the dispatcher's copy of the paragraph.
    pub fn into_scored(self, paragraph: &Paragraph) -> Option<ScoredParagraph> {
        match self {
            Self::Matched(report) => Some(ScoredParagraph::Matched(report.into_result(paragraph))),
            Self::Skipped { ordinal, query_tag, reason } => Some(ScoredParagraph::Skipped { ordinal, query_tag, reason }),
            Self::Exited => None,
        }
    }
}

impl From<ScoredParagraph> for WorkerReply {
    fn from(scored: ScoredParagraph) -> Self {
        match scored {
            ScoredParagraph::Matched(result) => Self::Matched(result.into()),
            ScoredParagraph::Skipped { ordinal, query_tag, reason } => Self::Skipped { ordinal, query_tag, reason },
        }
    }
}

/// A reply together with the slot it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotReply {
    pub slot: usize,
    pub reply: WorkerReply,
}
