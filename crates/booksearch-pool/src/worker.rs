//! Worker threads. Each one owns its inbox and scores whatever chunk it is
//! handed against the last query it was told about.
use std::thread::JoinHandle;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, warn};

use booksearch_core::error::{Error, Result};
use booksearch_core::types::{Paragraph, QueryTag};
use booksearch_match::{MatchIter, MatchLimits};

use crate::message::{SlotReply, WorkerMessage, WorkerReply};

/// Inbox capacity per worker; the dispatcher never queues more than this.
pub const INBOX_CAPACITY: usize = 1;

/// Dispatcher-side end of one worker.
#[derive(Debug)]
pub struct WorkerHandle {
    slot: usize,
    commands: mpsc::Sender<WorkerMessage>,
    thread: JoinHandle<()>,
}

impl WorkerHandle {
    pub fn slot(&self) -> usize { self.slot }

    pub async fn send(&self, message: WorkerMessage) -> Result<()> {
        self.commands
            .send(message)
            .await
            .map_err(|_| Error::Operation(format!("worker {} is no longer receiving", self.slot)))
    }

    /// Ask the worker to stop and hand back its thread for joining.
    pub fn shutdown(self) -> JoinHandle<()> {
        let _ = self.commands.try_send(WorkerMessage::Shutdown);
        self.thread
    }
}

/// Start a worker thread for `slot`. Replies go to the shared `replies` channel.
pub fn spawn_worker(slot: usize, replies: mpsc::UnboundedSender<SlotReply>, limits: MatchLimits) -> Result<WorkerHandle> {
    let (commands, inbox) = mpsc::channel(INBOX_CAPACITY);
    let worker = Worker { slot, inbox, replies, limits };
    let thread = std::thread::Builder::new()
        .name(format!("booksearch-worker-{slot}"))
        .spawn(move || worker.run())
        .map_err(|e| Error::WorkerSpawn { slot, reason: e.to_string() })?;
    Ok(WorkerHandle { slot, commands, thread })
}

struct Worker {
    slot: usize,
    inbox: mpsc::Receiver<WorkerMessage>,
    replies: mpsc::UnboundedSender<SlotReply>,
    limits: MatchLimits,
}

/// Reports the worker's end to the dispatcher, also when unwinding from a panic.
struct ExitNotice {
    slot: usize,
    replies: mpsc::UnboundedSender<SlotReply>,
}

impl Drop for ExitNotice {
    fn drop(&mut self) {
        let _ = self.replies.send(SlotReply { slot: self.slot, reply: WorkerReply::Exited });
    }
}

impl Worker {
    fn run(mut self) {
        let _notice = ExitNotice { slot: self.slot, replies: self.replies.clone() };
        debug!(slot = self.slot, "Worker started");

        let mut tag: Option<QueryTag> = None;
        let mut interrupted: Option<WorkerMessage> = None;
        loop {
            let message = match interrupted.take() {
                Some(message) => message,
                None => match self.inbox.blocking_recv() {
                    Some(message) => message,
                    None => break,
                },
            };
            match message {
                WorkerMessage::Query { epoch, value } => tag = Some(QueryTag::new(epoch, value)),
                WorkerMessage::Chunk { paragraphs } => match &tag {
                    Some(tag) => interrupted = self.score_chunk(tag, &paragraphs),
                    None => warn!(slot = self.slot, "Chunk arrived before any query, dropping it"),
                },
                WorkerMessage::Shutdown => break,
            }
        }
        debug!(slot = self.slot, "Worker stopped");
    }

    /// Score paragraphs in order, checking the inbox between them. A message
    /// that arrives mid-chunk abandons the rest of the chunk and is returned
    /// for the main loop to handle.
    fn score_chunk(&mut self, tag: &QueryTag, paragraphs: &[Paragraph]) -> Option<WorkerMessage> {
        for scored in MatchIter::new(tag.clone(), paragraphs, self.limits) {
            let reply = SlotReply { slot: self.slot, reply: scored.into() };
            if self.replies.send(reply).is_err() {
                return Some(WorkerMessage::Shutdown);
            }
            match self.inbox.try_recv() {
                Ok(message) => {
                    debug!(slot = self.slot, epoch = tag.epoch, "New message mid-chunk, abandoning the rest");
                    return Some(message);
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => return Some(WorkerMessage::Shutdown),
            }
        }
        None
    }
}
