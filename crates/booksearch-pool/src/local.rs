use std::sync::Arc;

use futures::stream::Stream;

use booksearch_core::types::{Paragraph, QueryTag, SearchResults};
use booksearch_match::{search_matches, MatchLimits};

use crate::accumulator::accumulate;

/// Score a whole document on the current task, without workers.
///
/// Yields the empty snapshot first and then one snapshot per paragraph, each
/// ranking at most `top_k` results.
pub fn accumulated_search(
    tag: QueryTag,
    paragraphs: Arc<[Paragraph]>,
    limits: MatchLimits,
    top_k: usize,
) -> impl Stream<Item = SearchResults> + Send + 'static {
    let paragraph_count = paragraphs.len();
    let scored = search_matches(tag.clone(), paragraphs, limits);
    accumulate(tag, paragraph_count, top_k, scored)
}
