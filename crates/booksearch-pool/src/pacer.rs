use std::time::Duration;

use tokio::time::Instant;

/// Rate limiter for consumer-facing snapshots.
///
/// Accumulation is never throttled; only emission is. A snapshot that cannot
/// go out yet stays pending until [`Pacer::deadline`] and is then flushed.
#[derive(Debug, Clone)]
pub struct Pacer {
    interval: Duration,
    last_emit: Option<Instant>,
    pending: bool,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self { Self { interval, last_emit: None, pending: false } }

    pub fn mark_pending(&mut self) { self.pending = true; }

    pub fn is_pending(&self) -> bool { self.pending }

    /// When the pending snapshot may be emitted, or `None` if nothing is pending.
    pub fn deadline(&self) -> Option<Instant> {
        if !self.pending {
            return None;
        }
        Some(match self.last_emit {
            Some(last) => last + self.interval,
            None => Instant::now(),
        })
    }

    /// Whether a pending snapshot may be emitted at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        self.pending && self.last_emit.map_or(true, |last| last + self.interval <= now)
    }

    pub fn record_emit(&mut self, at: Instant) {
        self.last_emit = Some(at);
        self.pending = false;
    }

    /// Drop whatever is pending, e.g. at an epoch boundary.
    pub fn clear(&mut self) { self.pending = false; }
}
