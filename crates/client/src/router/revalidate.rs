//! Background revalidation events.
//!
//! Stale-while-revalidate hands the cached copy back immediately and refreshes
//! the entry on a detached task. The task reports what happened on a broadcast
//! channel; nothing it does can reach the response that was already returned.

use tokio::sync::broadcast;

/// Capacity of the revalidation event channel. Slow subscribers lag and skip events.
pub(crate) const EVENT_CAPACITY: usize = 64;

/// How a background revalidation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevalidationOutcome {
    /// The network answered 2xx and the cache entry was replaced.
    Refreshed,
    /// The network answered with a non-2xx status; the cache was left alone.
    Rejected { status: u16 },
    /// The fetch or the cache write failed.
    Failed { reason: String },
}

/// Published once per finished revalidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevalidationEvent {
    pub url: String,
    pub outcome: RevalidationOutcome,
}

pub(crate) fn channel() -> broadcast::Sender<RevalidationEvent> {
    broadcast::channel(EVENT_CAPACITY).0
}

/// Log and publish an event. Having no subscribers is normal.
pub(crate) fn publish(events: &broadcast::Sender<RevalidationEvent>, event: RevalidationEvent) {
    match &event.outcome {
        RevalidationOutcome::Refreshed => tracing::debug!(url = %event.url, "revalidated cache entry"),
        RevalidationOutcome::Rejected { status } => {
            tracing::debug!(url = %event.url, status, "revalidation returned non-success status")
        }
        RevalidationOutcome::Failed { reason } => tracing::warn!(url = %event.url, %reason, "revalidation failed"),
    }
    let _ = events.send(event);
}
