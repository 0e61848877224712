use std::sync::Arc;

use futures::stream::{self, Stream};
use tracing::warn;

use booksearch_core::types::{FuzzyMatchResult, Paragraph, QueryTag};

use crate::fuzzy::{try_fuzzy_substring_similarity, MatchLimits};

/// Outcome of scoring one paragraph against the epoch's query.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoredParagraph {
    Matched(FuzzyMatchResult),
    /// The paragraph could not be scored and contributes no ranked entry.
    Skipped { ordinal: usize, query_tag: QueryTag, reason: String },
}

impl ScoredParagraph {
    pub fn ordinal(&self) -> usize {
        match self {
            Self::Matched(result) => result.ordinal,
            Self::Skipped { ordinal, .. } => *ordinal,
        }
    }

    pub fn query_tag(&self) -> &QueryTag {
        match self {
            Self::Matched(result) => &result.query_tag,
            Self::Skipped { query_tag, .. } => query_tag,
        }
    }
}

pub fn score_paragraph(tag: &QueryTag, paragraph: &Paragraph, limits: MatchLimits) -> ScoredParagraph {
    match try_fuzzy_substring_similarity(tag.query.as_str(), &paragraph.text, limits) {
        Ok(found) => ScoredParagraph::Matched(FuzzyMatchResult::new(paragraph, found, tag.clone())),
        Err(e) => {
            warn!(epoch = tag.epoch, ordinal = paragraph.ordinal, error = %e, "Skipping paragraph");
            ScoredParagraph::Skipped { ordinal: paragraph.ordinal, query_tag: tag.clone(), reason: e.to_string() }
        }
    }
}

/// Lazily scores paragraphs in order, one per `next()`.
pub struct MatchIter<'a> {
    tag: QueryTag,
    paragraphs: std::slice::Iter<'a, Paragraph>,
    limits: MatchLimits,
}

impl<'a> MatchIter<'a> {
    pub fn new(tag: QueryTag, paragraphs: &'a [Paragraph], limits: MatchLimits) -> Self {
        Self { tag, paragraphs: paragraphs.iter(), limits }
    }
}

impl Iterator for MatchIter<'_> {
    type Item = ScoredParagraph;

    fn next(&mut self) -> Option<Self::Item> {
        let paragraph = self.paragraphs.next()?;
        Some(score_paragraph(&self.tag, paragraph, self.limits))
    }

    fn size_hint(&self) -> (usize, Option<usize>) { self.paragraphs.size_hint() }
}

/// Async counterpart of [`MatchIter`] for scoring on the coordinator.
///
/// Yields to the tokio scheduler before every paragraph so a long document
/// never starves other tasks on the same runtime. Dropping the stream stops
/// the work.
pub fn search_matches(
    tag: QueryTag,
    paragraphs: Arc<[Paragraph]>,
    limits: MatchLimits,
) -> impl Stream<Item = ScoredParagraph> + Send + 'static {
    stream::unfold((0usize, tag, paragraphs), move |(index, tag, paragraphs)| async move {
        let paragraph = paragraphs.get(index)?.clone();
        tokio::task::yield_now().await;
        let scored = score_paragraph(&tag, &paragraph, limits);
        Some((scored, (index + 1, tag, paragraphs)))
    })
}
