use std::sync::Arc;

use futures::StreamExt;

use booksearch_core::document::Document;
use booksearch_core::types::{Query, QueryTag};
use booksearch_match::{fuzzy_substring_similarity, search_matches, MatchIter, MatchLimits, ScoredParagraph};

const HAYSTACKS: &[&str] = &[
    "Alice was beginning to get very tired of sitting by her sister on the bank",
    "‘Curiouser and curiouser!’ cried Alice",
    "so she set to work, and very soon finished off the cake",
    "ü ö ä · mixed scripts: 日本語のテキスト",
];

#[test]
fn every_verbatim_substring_is_found_exactly() {
    for haystack in HAYSTACKS {
        let chars: Vec<char> = haystack.chars().collect();
        for start in (0..chars.len()).step_by(3) {
            for len in [1usize, 4, 9] {
                if start + len > chars.len() { continue; }
                let needle: String = chars[start..start + len].iter().collect();
                let m = fuzzy_substring_similarity(&needle, haystack);
                assert_eq!(m.distance, 0, "needle {needle:?} in {haystack:?}");
                let found: String = chars[m.start_index..m.end_index].iter().collect();
                assert_eq!(found, needle);
                assert_eq!(m.similarity_score, 1.0);
            }
        }
    }
}

#[test]
fn score_is_one_only_for_distance_zero() {
    let needles = ["tired", "tierd", "curiouser", "cakes", "xyz", "Alice sister", "日本"];
    for haystack in HAYSTACKS.iter().chain([""].iter()) {
        for needle in needles {
            let m = fuzzy_substring_similarity(needle, haystack);
            assert_eq!(m.similarity_score == 1.0, m.distance == 0, "{needle:?} in {haystack:?}");
            assert!(m.start_index <= m.end_index);
            assert!(m.end_index <= haystack.chars().count());
        }
    }
}

#[test]
fn empty_haystack_distance_is_needle_length() {
    for needle in ["a", "xyz", "päragraph"] {
        let m = fuzzy_substring_similarity(needle, "");
        assert_eq!(m.distance, needle.chars().count());
        assert_eq!((m.start_index, m.end_index), (0, 0));
    }
}

#[test]
fn matching_is_repeatable() {
    let first = fuzzy_substring_similarity("sistre", HAYSTACKS[0]);
    for _ in 0..5 { assert_eq!(fuzzy_substring_similarity("sistre", HAYSTACKS[0]), first); }
}

#[test]
fn match_iter_scores_in_order_and_lazily() {
    let doc = Document::from_text("mem://book", "a cat\n\na dog\n\nno pets");
    let tag = QueryTag::new(3, Query::from("cat"));
    let mut iter = MatchIter::new(tag.clone(), doc.paragraphs(), MatchLimits::default());
    assert_eq!(iter.size_hint(), (3, Some(3)));

    let first = iter.next().expect("first paragraph");
    assert_eq!(first.ordinal(), 0);
    assert_eq!(first.query_tag(), &tag);
    assert_eq!(iter.size_hint(), (2, Some(2)), "remaining paragraphs untouched");

    let rest: Vec<usize> = iter.map(|s| s.ordinal()).collect();
    assert_eq!(rest, vec![1, 2]);
}

#[test]
fn over_budget_paragraphs_are_skipped_not_fatal() {
    let doc = Document::from_text("mem://book", "short\n\na much longer paragraph that blows the budget");
    let tag = QueryTag::new(1, Query::from("shrt"));
    let scored: Vec<ScoredParagraph> = MatchIter::new(tag, doc.paragraphs(), MatchLimits { max_cells: 40 }).collect();
    assert!(matches!(scored[0], ScoredParagraph::Matched(_)));
    assert!(matches!(&scored[1], ScoredParagraph::Skipped { ordinal: 1, .. }));
}

#[tokio::test]
async fn search_matches_streams_every_paragraph_in_order() {
    let doc = Document::from_text("mem://book", "one fish\n\ntwo fish\n\nred fish\n\nblue fish");
    let tag = QueryTag::new(9, Query::from("red"));
    let scored: Vec<ScoredParagraph> =
        search_matches(tag, Arc::clone(doc.paragraphs()), MatchLimits::default()).collect().await;

    let ordinals: Vec<usize> = scored.iter().map(ScoredParagraph::ordinal).collect();
    assert_eq!(ordinals, vec![0, 1, 2, 3]);
    match &scored[2] {
        ScoredParagraph::Matched(r) => {
            assert_eq!(r.distance, 0);
            assert_eq!(r.query_tag.epoch, 9);
        }
        other => panic!("expected a match, got {other:?}"),
    }
}

#[tokio::test(flavor = "current_thread")]
async fn search_matches_yields_between_paragraphs() {
    let text = vec!["paragraph"; 50].join("\n\n");
    let doc = Document::from_text("mem://long", &text);
    let ticker = tokio::spawn(async {
        let mut ticks = 0usize;
        loop {
            ticks += 1;
            tokio::task::yield_now().await;
            if ticks >= 10 { return ticks; }
        }
    });
    let count = search_matches(QueryTag::new(1, Query::from("para")), Arc::clone(doc.paragraphs()), MatchLimits::default())
        .count()
        .await;
    assert_eq!(count, 50);
    assert!(ticker.is_finished(), "the other task ran while paragraphs were scored");
}
