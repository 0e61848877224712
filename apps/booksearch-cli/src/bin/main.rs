use std::env;
use std::sync::Arc;

use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use booksearch_core::config::{Config, SearchConfig};
use booksearch_core::document::Document;
use booksearch_core::provider::{CachingProvider, FileDocumentProvider};
use booksearch_core::traits::DocumentProvider;
use booksearch_core::types::{Query, QueryTag, SearchResults};
use booksearch_match::MatchLimits;
use booksearch_pool::{accumulated_search, Dispatcher, SearchEvent, SearchUpdates};

const USAGE: &str = "Usage: booksearch <search|scan|interactive> <document> [query] [--json]";

fn parse_args() -> (String, Vec<String>, bool) {
    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() { eprintln!("{}", USAGE); std::process::exit(1); }
    let json = args.iter().any(|a| a == "--json");
    args.retain(|a| a != "--json");
    let cmd = args.remove(0);
    (cmd, args, json)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr).init();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let search = config.search()?;
    let provider = CachingProvider::new(FileDocumentProvider::new(config.document_dir()));
    let (cmd, args, json) = parse_args();
    let document = args.first().cloned().unwrap_or_else(|| { eprintln!("{}", USAGE); std::process::exit(1) });
    let runtime = tokio::runtime::Runtime::new()?;
    match cmd.as_str() {
        "search" => {
            let query = args.get(1).cloned().unwrap_or_else(|| { eprintln!("Usage: booksearch search <document> \"<query>\" [--json]"); std::process::exit(1) });
            runtime.block_on(search_once(search, provider, document, query, json))?;
        }
        "scan" => {
            let query = args.get(1).cloned().unwrap_or_else(|| { eprintln!("Usage: booksearch scan <document> \"<query>\" [--json]"); std::process::exit(1) });
            runtime.block_on(scan(&search, &provider, &document, query, json))?;
        }
        "interactive" => runtime.block_on(interactive(search, provider, document))?,
        _ => { eprintln!("Unknown command: {}", cmd); std::process::exit(1); }
    }
    Ok(())
}

/// Run one query across the worker pool and print the final ranking.
async fn search_once<P: DocumentProvider + 'static>(search: SearchConfig, provider: P, document: String, query: String, json: bool) -> anyhow::Result<()> {
    let (controller, mut updates) = Dispatcher::new(search, provider)?.spawn();
    controller.set_query(query.as_str())?;
    controller.set_document(document)?;
    let pb = progress_bar()?;
    let finished = loop {
        let Some(snapshot) = next_snapshot(&mut updates).await? else { anyhow::bail!("search stopped before completing") };
        show_progress(&pb, &snapshot);
        if snapshot.query.as_str() == query && snapshot.is_complete() { break snapshot; }
    };
    pb.finish_and_clear();
    print_results(&finished, json)
}

/// Same search on the current thread only, without the worker pool.
async fn scan(search: &SearchConfig, provider: &impl DocumentProvider, url: &str, query: String, json: bool) -> anyhow::Result<()> {
    let text = provider.fetch_document(url).await?;
    let document = Document::from_text(url, &text);
    info!(url = %url, paragraphs = document.len(), "Scanning without workers");
    let tag = QueryTag::new(1, Query::from(query));
    let limits = MatchLimits { max_cells: search.max_match_cells };
    let last = accumulated_search(tag, Arc::clone(document.paragraphs()), limits, search.top_k).fold(None, |_, s| async move { Some(s) }).await;
    match last {
        Some(snapshot) => print_results(&snapshot, json),
        None => anyhow::bail!("no snapshot produced"),
    }
}

/// Every stdin line becomes the new query; results refresh as they arrive.
async fn interactive<P: DocumentProvider + 'static>(search: SearchConfig, provider: P, document: String) -> anyhow::Result<()> {
    let (controller, mut updates) = Dispatcher::new(search, provider)?.spawn();
    controller.set_document(document.as_str())?;
    println!("Searching {} (type a query, Ctrl-D to quit)", document);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let pb = progress_bar()?;
    let mut printed_epoch = None;
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => controller.set_query(line.trim())?,
                None => break,
            },
            snapshot = next_snapshot(&mut updates) => {
                let Some(snapshot) = snapshot? else { break };
                show_progress(&pb, &snapshot);
                if snapshot.is_complete() && !snapshot.query.as_str().is_empty() && printed_epoch != Some(snapshot.epoch) {
                    printed_epoch = Some(snapshot.epoch);
                    pb.suspend(|| print_results(&snapshot, false))?;
                }
            }
        }
    }
    pb.finish_and_clear();
    Ok(())
}

async fn next_snapshot(updates: &mut SearchUpdates) -> anyhow::Result<Option<SearchResults>> {
    match updates.recv().await {
        Some(SearchEvent::Snapshot(snapshot)) => Ok(Some(snapshot)),
        Some(SearchEvent::Failed(e)) => Err(e.into()),
        None => Ok(None),
    }
}

fn progress_bar() -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new(0);
    pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} paragraphs {msg}")?.progress_chars("#>-"));
    Ok(pb)
}

fn show_progress(pb: &ProgressBar, snapshot: &SearchResults) {
    let progress = snapshot.progress();
    pb.set_length(progress.total_count as u64);
    pb.set_position(progress.searched_count as u64);
    pb.set_message(format!("\"{}\"", snapshot.query));
}

fn print_results(snapshot: &SearchResults, json: bool) -> anyhow::Result<()> {
    if json { println!("{}", serde_json::to_string_pretty(snapshot)?); return Ok(()); }
    println!("🔎 \"{}\": {}/{} paragraphs searched", snapshot.query, snapshot.searched_paragraph_count, snapshot.paragraph_count);
    if snapshot.paragraphs.is_empty() { println!("No matches"); }
    for (rank, r) in snapshot.paragraphs.iter().enumerate() {
        println!("{:>2}. [{:.3}] {}[{}]{}", rank + 1, r.score, r.before.trim_start(), r.matched, r.after.trim_end());
    }
    Ok(())
}
