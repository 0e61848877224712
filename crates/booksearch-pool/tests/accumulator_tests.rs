use std::sync::Arc;

use futures::stream::{self, StreamExt};

use booksearch_core::document::Document;
use booksearch_core::types::{FuzzyMatch, FuzzyMatchResult, Paragraph, Query, QueryTag, SearchResults};
use booksearch_match::{MatchLimits, ScoredParagraph};
use booksearch_pool::{accumulate, accumulated_search, ResultAccumulator, DEFAULT_TOP_K};

fn tag() -> QueryTag { QueryTag::new(1, Query::from("rabbit")) }

fn matched(ordinal: usize, score: f64) -> ScoredParagraph {
    let paragraph = Paragraph::new(ordinal, format!("paragraph {ordinal}"));
    let found = FuzzyMatch { distance: 0, start_index: 0, end_index: 9, similarity_score: score };
    ScoredParagraph::Matched(FuzzyMatchResult::new(&paragraph, found, tag()))
}

#[test]
fn fresh_accumulator_is_empty() {
    let acc = ResultAccumulator::new(tag(), 5, DEFAULT_TOP_K);
    let snapshot = acc.snapshot();
    assert_eq!(snapshot.searched_paragraph_count, 0);
    assert_eq!(snapshot.paragraph_count, 5);
    assert!(snapshot.paragraphs.is_empty());
    assert_eq!(snapshot.query, Query::from("rabbit"));
}

#[test]
fn snapshot_keeps_top_ten_by_score() {
    let mut acc = ResultAccumulator::new(tag(), 25, DEFAULT_TOP_K);
    for i in 0..25 {
        acc.push(matched(i, (i % 7) as f64 / 7.0));
    }
    let snapshot = acc.snapshot();
    assert_eq!(snapshot.paragraphs.len(), 10);
    assert!(snapshot.paragraphs.windows(2).all(|w| w[0].score >= w[1].score));
    assert!(snapshot.is_complete());
}

#[test]
fn equal_scores_keep_arrival_order() {
    let mut acc = ResultAccumulator::new(tag(), 4, DEFAULT_TOP_K);
    for ordinal in [3, 0, 2, 1] {
        acc.push(matched(ordinal, 0.5));
    }
    let afters: Vec<String> = acc.snapshot().paragraphs.into_iter().map(|r| r.after).collect();
    assert_eq!(afters, vec![" 3", " 0", " 2", " 1"]);
}

#[test]
fn skipped_paragraphs_count_but_do_not_rank() {
    let mut acc = ResultAccumulator::new(tag(), 2, DEFAULT_TOP_K);
    acc.push(ScoredParagraph::Skipped { ordinal: 0, query_tag: tag(), reason: "too long".to_string() });
    acc.push(matched(1, 1.0));
    let snapshot = acc.snapshot();
    assert_eq!(snapshot.searched_paragraph_count, 2);
    assert_eq!(snapshot.paragraphs.len(), 1);
}

#[tokio::test]
async fn stream_form_emits_initial_then_one_per_item() {
    let items = vec![matched(0, 0.2), matched(1, 0.9), matched(2, 0.5)];
    let snapshots: Vec<SearchResults> = accumulate(tag(), 3, DEFAULT_TOP_K, stream::iter(items)).collect().await;
    assert_eq!(snapshots.len(), 4);
    let progress: Vec<usize> = snapshots.iter().map(|s| s.searched_paragraph_count).collect();
    assert_eq!(progress, vec![0, 1, 2, 3]);
    let best = &snapshots[3].paragraphs[0];
    assert_eq!(best.score, 0.9);
}

#[tokio::test]
async fn coordinator_only_search_covers_the_document() {
    let doc = Document::from_text(
        "mem://alice",
        "Alice was beginning to get very tired\n\nthe White Rabbit with pink eyes\n\nOh dear! Oh dear! I shall be late!",
    );
    let snapshots: Vec<SearchResults> =
        accumulated_search(tag(), Arc::clone(doc.paragraphs()), MatchLimits::default(), DEFAULT_TOP_K).collect().await;

    assert_eq!(snapshots.first().map(|s| s.searched_paragraph_count), Some(0));
    assert!(snapshots.windows(2).all(|w| w[0].searched_paragraph_count <= w[1].searched_paragraph_count));
    let last = snapshots.last().expect("final snapshot");
    assert!(last.is_complete());
    assert_eq!(last.paragraph_count, 3);
    // "Rabbit" is one substitution away from "rabbit"
    assert_eq!(last.paragraphs[0].matched, "Rabbit");
    assert!(last.paragraphs.len() <= DEFAULT_TOP_K);
}

#[tokio::test]
async fn coordinator_only_search_honours_top_k() {
    let text = (0..12).map(|i| format!("rabbit number {i}")).collect::<Vec<_>>().join("\n\n");
    let doc = Document::from_text("mem://warren", &text);
    let last = accumulated_search(tag(), Arc::clone(doc.paragraphs()), MatchLimits::default(), 3)
        .collect::<Vec<SearchResults>>()
        .await
        .pop()
        .expect("final snapshot");
    assert_eq!(last.searched_paragraph_count, 12);
    assert_eq!(last.paragraphs.len(), 3);
}
