//! The coordinating task: owns the document, the epoch counter, the worker
//! slots and the accumulator, and turns input changes into paced snapshots.
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread::JoinHandle;

use futures::future::{self, BoxFuture, FutureExt};
use futures::stream::{BoxStream, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, trace, warn};

use booksearch_core::config::SearchConfig;
use booksearch_core::document::Document;
use booksearch_core::error::{Error, Result};
use booksearch_core::traits::DocumentProvider;
use booksearch_core::types::{EpochId, Query, QueryTag, SearchResults};
use booksearch_match::{search_matches, MatchLimits, ScoredParagraph};

use crate::accumulator::ResultAccumulator;
use crate::chunk::ChunkSource;
use crate::message::{SlotReply, WorkerMessage};
use crate::pacer::Pacer;
use crate::schedule::ChunkSchedule;
use crate::worker::{spawn_worker, WorkerHandle};

/// The latest (document, query) pair the consumer asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchInput {
    pub url: Option<String>,
    pub query: Query,
}

/// What a consumer receives.
#[derive(Debug, Clone)]
pub enum SearchEvent {
    Snapshot(SearchResults),
    /// Terminal. No further events follow.
    Failed(Error),
}

/// Consumer handle for changing the document or the query.
///
/// Repeating the current value is a no-op. Dropping the controller shuts the
/// dispatcher and its workers down.
#[derive(Debug)]
pub struct SearchController {
    inputs: watch::Sender<SearchInput>,
}

impl SearchController {
    pub fn set_document(&self, url: impl Into<String>) -> Result<()> {
        let url = url.into();
        self.update(|input| {
            if input.url.as_deref() == Some(url.as_str()) {
                return false;
            }
            input.url = Some(url);
            true
        })
    }

    pub fn set_query(&self, query: impl Into<Query>) -> Result<()> {
        let query = query.into();
        self.update(|input| {
            if input.query == query {
                return false;
            }
            input.query = query;
            true
        })
    }

    fn update(&self, modify: impl FnOnce(&mut SearchInput) -> bool) -> Result<()> {
        if self.inputs.is_closed() {
            return Err(Error::Operation("search dispatcher has stopped".to_string()));
        }
        self.inputs.send_if_modified(modify);
        Ok(())
    }
}

/// Consumer handle for snapshots and the terminal failure, if any.
///
/// Latest wins: a consumer that falls behind skips straight to the newest
/// event and never holds the coordinator up.
#[derive(Debug)]
pub struct SearchUpdates {
    events: watch::Receiver<Option<SearchEvent>>,
}

impl SearchUpdates {
    /// Newest event not yet seen, or `None` once the dispatcher has stopped.
    pub async fn recv(&mut self) -> Option<SearchEvent> {
        loop {
            self.events.changed().await.ok()?;
            if let Some(event) = self.events.borrow_and_update().clone() {
                return Some(event);
            }
        }
    }
}

/// Builder for the coordinator and its worker pool.
pub struct Dispatcher<P> {
    config: SearchConfig,
    chunk_size: NonZeroUsize,
    provider: Arc<P>,
}

impl<P> Dispatcher<P>
where
    P: DocumentProvider + 'static,
{
    pub fn new(config: SearchConfig, provider: P) -> Result<Self> {
        config.validate()?;
        let chunk_size = NonZeroUsize::new(config.chunk_size)
            .ok_or_else(|| Error::InvalidConfig("search.chunk_size must be at least 1".to_string()))?;
        Ok(Self { config, chunk_size, provider: Arc::new(provider) })
    }

    /// Start the workers and the coordinator task. Must be called inside a tokio runtime.
    pub fn spawn(self) -> (SearchController, SearchUpdates) {
        let limits = MatchLimits { max_cells: self.config.max_match_cells };
        let (reply_tx, replies) = mpsc::unbounded_channel();

        let slot_count = self.config.worker_count();
        let mut workers = Vec::with_capacity(slot_count);
        let mut schedule = ChunkSchedule::new(slot_count);
        for slot in 0..slot_count {
            match spawn_worker(slot, reply_tx.clone(), limits) {
                Ok(handle) => workers.push(Some(handle)),
                Err(e) => {
                    warn!(slot, error = %e, "Worker failed to start, continuing with fewer slots");
                    schedule.mark_dead(slot);
                    workers.push(None);
                }
            }
        }
        drop(reply_tx);
        info!(slots = slot_count, live = schedule.live_count(), chunk_size = self.chunk_size.get(), "Search dispatcher started");

        let (inputs_tx, inputs) = watch::channel(SearchInput::default());
        let (events_tx, events) = watch::channel(None);

        let coordinator = Coordinator {
            provider: self.provider,
            chunk_size: self.chunk_size,
            top_k: self.config.top_k,
            limits,
            inputs,
            events: events_tx,
            workers,
            replies,
            replies_open: true,
            schedule,
            epoch: 0,
            current: None,
            document: None,
            source: None,
            accumulator: None,
            local: None,
            fetch: None,
            pacer: Pacer::new(self.config.emit_interval()),
            stopped: false,
        };
        tokio::spawn(coordinator.run());

        (SearchController { inputs: inputs_tx }, SearchUpdates { events })
    }
}

type Fetch = BoxFuture<'static, (String, Result<String>)>;

struct Coordinator<P> {
    provider: Arc<P>,
    chunk_size: NonZeroUsize,
    top_k: usize,
    limits: MatchLimits,
    inputs: watch::Receiver<SearchInput>,
    events: watch::Sender<Option<SearchEvent>>,
    /// Indexed by slot; `None` once the worker is gone.
    workers: Vec<Option<WorkerHandle>>,
    replies: mpsc::UnboundedReceiver<SlotReply>,
    replies_open: bool,
    schedule: ChunkSchedule,
    epoch: EpochId,
    /// Last input that was acted on.
    current: Option<SearchInput>,
    document: Option<Document>,
    source: Option<ChunkSource>,
    /// Present only while an epoch is running.
    accumulator: Option<ResultAccumulator>,
    /// Coordinator-side scoring when no worker is alive.
    local: Option<BoxStream<'static, ScoredParagraph>>,
    fetch: Option<Fetch>,
    pacer: Pacer,
    stopped: bool,
}

impl<P> Coordinator<P>
where
    P: DocumentProvider + 'static,
{
    async fn run(mut self) {
        self.apply_input();
        while !self.stopped {
            let deadline = self.pacer.deadline();
            tokio::select! {
                changed = self.inputs.changed() => match changed {
                    Ok(()) => self.apply_input(),
                    Err(_) => {
                        debug!("Search controller dropped");
                        break;
                    }
                },
                (url, fetched) = next_fetch(&mut self.fetch), if self.fetch.is_some() => {
                    self.fetch = None;
                    self.on_fetched(url, fetched);
                }
                reply = self.replies.recv(), if self.replies_open => match reply {
                    Some(reply) => self.on_reply(reply).await,
                    None => self.replies_open = false,
                },
                scored = next_local(&mut self.local), if self.local.is_some() => match scored {
                    Some(scored) => self.record(scored),
                    None => self.local = None,
                },
                _ = sleep_until_deadline(deadline), if deadline.is_some() => self.flush(),
            }
            // an epoch that starts with nothing to search never gets a reply
            if self.kickoff_pending() {
                self.start_epoch().await;
            }
        }
        self.shutdown().await;
    }

    fn kickoff_pending(&self) -> bool {
        !self.stopped && self.accumulator.is_none() && self.fetch.is_none() && self.document.is_some() && self.current.is_some()
    }

    /// Act on the latest input. Only tears the running epoch down; the next
    /// one is started from the main loop once the document is in hand.
    fn apply_input(&mut self) {
        let input = self.inputs.borrow_and_update().clone();
        let Some(url) = input.url.clone() else {
            return;
        };
        let previous = self.current.as_ref();
        let document_changed = previous.and_then(|p| p.url.as_deref()) != Some(url.as_str());
        let query_changed = previous.map(|p| &p.query) != Some(&input.query);
        if !document_changed && !query_changed {
            return;
        }

        self.teardown();
        self.current = Some(input);
        if document_changed {
            debug!(url = %url, "Fetching document");
            let provider = Arc::clone(&self.provider);
            // replacing the future cancels any fetch still in flight
            self.fetch = Some(
                async move {
                    let fetched = provider.fetch_document(&url).await;
                    (url, fetched)
                }
                .boxed(),
            );
        }
    }

    fn on_fetched(&mut self, url: String, fetched: Result<String>) {
        let text = match fetched {
            Ok(text) => text,
            Err(e) => {
                error!(url = %url, error = %e, "Document fetch failed, stopping search");
                self.emit(SearchEvent::Failed(e));
                self.stopped = true;
                return;
            }
        };

        let document = Document::from_text(url, &text);
        let unchanged = self
            .document
            .as_ref()
            .is_some_and(|d| d.fingerprint() == document.fingerprint() && d.len() == document.len());
        if unchanged {
            debug!(url = %document.url(), "Document content unchanged, reusing partition");
        } else {
            info!(url = %document.url(), paragraphs = document.len(), "Document loaded");
            self.source = Some(ChunkSource::new(Arc::clone(document.paragraphs()), self.chunk_size));
            self.document = Some(document);
        }
    }

    fn teardown(&mut self) {
        if let Some(accumulator) = self.accumulator.take() {
            debug!(epoch = accumulator.tag().epoch, searched = accumulator.searched(), "Cancelling epoch");
        }
        self.local = None;
        self.pacer.clear();
    }

    async fn start_epoch(&mut self) {
        let (Some(document), Some(input)) = (&self.document, &self.current) else {
            return;
        };
        let paragraphs = Arc::clone(document.paragraphs());
        self.epoch += 1;
        let tag = QueryTag::new(self.epoch, input.query.clone());
        info!(epoch = tag.epoch, query = %tag.query, paragraphs = paragraphs.len(), "Starting search epoch");

        // the empty snapshot goes out now only if the rate allows; otherwise
        // a later snapshot of this epoch replaces it at the deadline
        self.accumulator = Some(ResultAccumulator::new(tag.clone(), paragraphs.len(), self.top_k));
        self.pacer.mark_pending();
        if self.pacer.is_due(Instant::now()) {
            self.flush();
        }

        if self.schedule.live_count() == 0 {
            debug!(epoch = tag.epoch, "No live workers, scoring on the coordinator");
            self.local = Some(search_matches(tag, paragraphs, self.limits).boxed());
            return;
        }

        let assigned = match self.source.as_mut() {
            Some(source) => {
                source.rewind();
                self.schedule.start_epoch(source)
            }
            None => Vec::new(),
        };
        for slot in 0..self.workers.len() {
            if self.workers[slot].is_some() {
                self.send_to(slot, WorkerMessage::Query { epoch: tag.epoch, value: tag.query.clone() }).await;
            }
        }
        for (slot, chunk) in assigned {
            trace!(slot, chunk = chunk.index, "Assigning chunk");
            self.send_to(slot, WorkerMessage::Chunk { paragraphs: chunk.paragraphs }).await;
        }
    }

    async fn on_reply(&mut self, SlotReply { slot, reply }: SlotReply) {
        let (Some(tag), Some(ordinal)) = (reply.query_tag(), reply.ordinal()) else {
            // Exited: only unexpected if the slot is still ours
            if self.workers.get(slot).is_some_and(Option::is_some) {
                warn!(slot, "Worker exited unexpectedly");
                self.retire(slot);
            }
            return;
        };
        let current = self.accumulator.as_ref().map(|a| a.tag().epoch);
        if current != Some(tag.epoch) {
            trace!(slot, epoch = tag.epoch, ordinal, "Discarding stale result");
            return;
        }

        let next = self.source.as_mut().and_then(|source| self.schedule.on_result(slot, ordinal, source));
        if let Some(chunk) = next {
            trace!(slot, chunk = chunk.index, "Assigning chunk");
            self.send_to(slot, WorkerMessage::Chunk { paragraphs: chunk.paragraphs }).await;
        }

        let paragraph = self.document.as_ref().and_then(|d| d.paragraphs().get(ordinal)).cloned();
        match paragraph.and_then(|p| reply.into_scored(&p)) {
            Some(scored) => self.record(scored),
            None => warn!(slot, ordinal, "Reply for an unknown paragraph"),
        }
    }

    fn record(&mut self, scored: ScoredParagraph) {
        if let Some(accumulator) = self.accumulator.as_mut() {
            accumulator.push(scored);
            self.pacer.mark_pending();
            if accumulator.is_complete() {
                debug!(epoch = accumulator.tag().epoch, searched = accumulator.searched(), "Epoch complete");
            }
        }
    }

    fn flush(&mut self) {
        let Some(snapshot) = self.accumulator.as_ref().map(ResultAccumulator::snapshot) else {
            self.pacer.clear();
            return;
        };
        self.pacer.record_emit(Instant::now());
        self.emit(SearchEvent::Snapshot(snapshot));
    }

    fn emit(&mut self, event: SearchEvent) {
        if self.events.send(Some(event)).is_err() {
            debug!("Search updates dropped, stopping dispatcher");
            self.stopped = true;
        }
    }

    async fn send_to(&mut self, slot: usize, message: WorkerMessage) {
        let Some(Some(handle)) = self.workers.get(slot) else {
            return;
        };
        let sent = handle.send(message).await;
        if let Err(e) = sent {
            warn!(slot, error = %e, "Worker unreachable, retiring slot");
            self.retire(slot);
        }
    }

    /// A retired slot stays idle for good; the chunk it held is not reassigned.
    fn retire(&mut self, slot: usize) {
        if let Some(chunk) = self.schedule.mark_dead(slot) {
            warn!(slot, chunk, "Abandoning chunk of dead worker");
        }
        if let Some(handle) = self.workers.get_mut(slot).and_then(Option::take) {
            drop(handle.shutdown());
        }
        if self.schedule.live_count() == 0 {
            warn!("No live workers left, later epochs score on the coordinator");
        }
    }

    async fn shutdown(&mut self) {
        let threads: Vec<JoinHandle<()>> =
            self.workers.iter_mut().filter_map(Option::take).map(WorkerHandle::shutdown).collect();
        if threads.is_empty() {
            return;
        }
        debug!(workers = threads.len(), "Shutting workers down");
        let joined =
            tokio::task::spawn_blocking(move || threads.into_iter().map(JoinHandle::join).filter(|joined| joined.is_err()).count()).await;
        match joined {
            Ok(0) => {}
            Ok(panicked) => warn!(panicked, "Workers panicked before shutdown"),
            Err(e) => warn!(error = %e, "Could not join worker threads"),
        }
    }
}

async fn next_fetch(fetch: &mut Option<Fetch>) -> (String, Result<String>) {
    match fetch {
        Some(fetch) => fetch.await,
        None => future::pending().await,
    }
}

async fn next_local(local: &mut Option<BoxStream<'static, ScoredParagraph>>) -> Option<ScoredParagraph> {
    match local {
        Some(stream) => stream.next().await,
        None => future::pending().await,
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => future::pending().await,
    }
}
