use std::fs;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use figment::providers::{Format, Toml};
use figment::Figment;
use tempfile::TempDir;

use booksearch_core::config::{Config, SearchConfig};
use booksearch_core::document::Document;
use booksearch_core::error::{Error, Result};
use booksearch_core::provider::{CachingProvider, FileDocumentProvider, StaticDocumentProvider};
use booksearch_core::traits::DocumentProvider;
use booksearch_core::types::{FuzzyMatch, FuzzyMatchResult, Paragraph, Query, QueryTag};

#[test]
fn document_splits_on_blank_lines_and_keeps_ordinals() {
    let doc = Document::from_text("mem://alice", "Down the rabbit hole\n\n\n\nThe pool of tears\n\nA caucus race");
    let texts: Vec<&str> = doc.paragraphs().iter().map(|p| &*p.text).collect();
    assert_eq!(texts, vec!["Down the rabbit hole", "", "The pool of tears", "A caucus race"]);
    for (i, p) in doc.paragraphs().iter().enumerate() { assert_eq!(p.ordinal, i); }
    assert_eq!(doc.len(), 4);
}

#[test]
fn document_fingerprint_tracks_content() {
    let a = Document::from_text("a", "same text");
    let b = Document::from_text("b", "same text");
    let c = Document::from_text("a", "other text");
    assert_eq!(a.fingerprint(), b.fingerprint());
    assert_ne!(a.fingerprint(), c.fingerprint());
}

#[test]
fn search_config_defaults_when_section_missing() {
    let config = Config::from_figment(Figment::new()).expect("config");
    let search = config.search().expect("search section");
    assert_eq!(search, SearchConfig::default());
    assert_eq!(search.chunk_size, 10);
    assert_eq!(search.top_k, 10);
    assert!(search.worker_count() >= 1);
}

#[test]
fn search_config_reads_overrides() {
    let figment = Figment::new().merge(Toml::string("[search]\nchunk_size = 25\nworkers = 3\nmax_emits_per_sec = 30\n"));
    let search = Config::from_figment(figment).expect("config").search().expect("search");
    assert_eq!(search.chunk_size, 25);
    assert_eq!(search.worker_count(), 3);
    assert_eq!(search.reserved_cores, 2, "unset keys keep defaults");
    assert_eq!(search.emit_interval(), std::time::Duration::from_secs(1) / 30);
}

#[test]
fn zero_chunk_size_is_rejected() {
    let figment = Figment::new().merge(Toml::string("[search]\nchunk_size = 0\n"));
    assert!(Config::from_figment(figment).is_err());
    let bad = SearchConfig { chunk_size: 0, ..SearchConfig::default() };
    assert!(matches!(bad.validate(), Err(Error::InvalidConfig(_))));
}

#[test]
fn explicit_zero_workers_is_allowed() {
    let search = SearchConfig { workers: Some(0), ..SearchConfig::default() };
    assert_eq!(search.worker_count(), 0);
}

#[test]
fn result_slicing_uses_match_span() {
    let paragraph = Paragraph::new(7, "the cat sat");
    let found = FuzzyMatch { distance: 0, start_index: 4, end_index: 7, similarity_score: 1.0 };
    let result = FuzzyMatchResult::new(&paragraph, found, QueryTag::new(1, Query::from("cat")));
    assert_eq!(result.ordinal, 7);
    let ranked = result.ranked();
    assert_eq!((ranked.before.as_str(), ranked.matched.as_str(), ranked.after.as_str()), ("the ", "cat", " sat"));
}

#[test]
fn ranked_result_serializes_match_field() {
    let paragraph = Paragraph::new(0, "abc");
    let found = FuzzyMatch { distance: 0, start_index: 1, end_index: 2, similarity_score: 1.0 };
    let ranked = FuzzyMatchResult::new(&paragraph, found, QueryTag::new(0, Query::from("b"))).ranked();
    let json = serde_json::to_value(&ranked).expect("json");
    assert_eq!(json["match"], "b");
    assert_eq!(json["before"], "a");
}

#[tokio::test]
async fn file_provider_reads_relative_and_file_urls() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("book.txt"), "one\n\ntwo").unwrap();
    let provider = FileDocumentProvider::new(tmp.path());

    let text = provider.fetch_document("book.txt").await.expect("relative path");
    assert_eq!(text, "one\n\ntwo");

    let url = format!("file://{}", tmp.path().join("book.txt").display());
    assert_eq!(provider.fetch_document(&url).await.expect("file url"), "one\n\ntwo");
}

#[tokio::test]
async fn file_provider_falls_back_to_lossy_utf8() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("bad.txt"), b"ok \xff text").unwrap();
    let provider = FileDocumentProvider::new(tmp.path());
    let text = provider.fetch_document("bad.txt").await.expect("lossy read");
    assert!(text.starts_with("ok "));
    assert!(text.ends_with(" text"));
}

#[tokio::test]
async fn missing_documents_are_fetch_errors() {
    let tmp = TempDir::new().unwrap();
    let file = FileDocumentProvider::new(tmp.path());
    assert!(matches!(file.fetch_document("nope.txt").await, Err(Error::Fetch { .. })));

    let mem = StaticDocumentProvider::new();
    match mem.fetch_document("mem://missing").await {
        Err(Error::Fetch { url, .. }) => assert_eq!(url, "mem://missing"),
        other => panic!("expected fetch error, got {other:?}"),
    }
}

struct CountingProvider {
    inner: StaticDocumentProvider,
    calls: Arc<AtomicUsize>,
}

impl DocumentProvider for CountingProvider {
    fn fetch_document(&self, url: &str) -> impl Future<Output = Result<String>> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_document(url)
    }
}

#[tokio::test]
async fn caching_provider_fetches_each_url_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let inner = StaticDocumentProvider::new().with_document("mem://a", "alpha").with_document("mem://b", "beta");
    let cached = CachingProvider::new(CountingProvider { inner, calls: Arc::clone(&calls) });

    assert_eq!(cached.fetch_document("mem://a").await.unwrap(), "alpha");
    assert_eq!(cached.fetch_document("mem://a").await.unwrap(), "alpha");
    assert_eq!(cached.fetch_document("mem://b").await.unwrap(), "beta");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(cached.cached_len().await, 2);

    assert!(cached.fetch_document("mem://missing").await.is_err());
    assert_eq!(cached.cached_len().await, 2, "failures are not cached");
}
