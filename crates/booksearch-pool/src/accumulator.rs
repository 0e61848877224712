//! Folds an epoch's match results into ranked snapshots.
use futures::stream::{self, Stream, StreamExt};

use booksearch_core::types::{FuzzyMatchResult, QueryTag, SearchResults};
use booksearch_match::ScoredParagraph;

pub const DEFAULT_TOP_K: usize = 10;

/// Collects every result of one epoch and ranks them on demand.
///
/// The collection only grows. Each snapshot is a full stable re-sort by
/// score, so equal scores keep arrival order.
#[derive(Debug, Clone)]
pub struct ResultAccumulator {
    tag: QueryTag,
    paragraph_count: usize,
    top_k: usize,
    results: Vec<FuzzyMatchResult>,
    searched: usize,
}

impl ResultAccumulator {
    pub fn new(tag: QueryTag, paragraph_count: usize, top_k: usize) -> Self {
        Self { tag, paragraph_count, top_k, results: Vec::new(), searched: 0 }
    }

    pub fn tag(&self) -> &QueryTag { &self.tag }

    /// Record one searched paragraph. Skipped paragraphs count towards
    /// progress but never rank.
    pub fn push(&mut self, scored: ScoredParagraph) {
        if let ScoredParagraph::Matched(result) = scored {
            self.results.push(result);
        }
        self.searched += 1;
    }

    pub fn searched(&self) -> usize { self.searched }

    pub fn is_complete(&self) -> bool { self.searched >= self.paragraph_count }

    pub fn snapshot(&self) -> SearchResults {
        let mut ranked: Vec<&FuzzyMatchResult> = self.results.iter().collect();
        ranked.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));
        SearchResults {
            epoch: self.tag.epoch,
            query: self.tag.query.clone(),
            searched_paragraph_count: self.searched,
            paragraph_count: self.paragraph_count,
            paragraphs: ranked.into_iter().take(self.top_k).map(FuzzyMatchResult::ranked).collect(),
        }
    }
}

/// Stream form: the empty snapshot first, then one snapshot per item.
pub fn accumulate<S>(tag: QueryTag, paragraph_count: usize, top_k: usize, scored: S) -> impl Stream<Item = SearchResults>
where
    S: Stream<Item = ScoredParagraph>,
{
    let mut accumulator = ResultAccumulator::new(tag, paragraph_count, top_k);
    let initial = accumulator.snapshot();
    stream::once(futures::future::ready(initial)).chain(scored.map(move |item| {
        accumulator.push(item);
        accumulator.snapshot()
    }))
}
