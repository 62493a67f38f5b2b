//! Typed sync events.
//!
//! Consumers subscribe via [`SyncEngine::subscribe`](super::SyncEngine::subscribe)
//! and receive one event per non-empty result set of a poll. A lagging or
//! absent subscriber never blocks the engine.

use crate::listing::Entry;

/// Broadcast channel depth. Events carry whole batches, so a handful of
/// pending polls' worth is plenty before a slow subscriber starts lagging.
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// Entries alerted for the first time. `initial` is true for the
    /// population pass at startup, so front ends can suppress notifications
    /// for documents that merely predate the process.
    Created { entries: Vec<Entry>, initial: bool },
    /// Entries whose display name or acknowledgment state changed remotely.
    Modified { entries: Vec<Entry> },
}

impl SyncEvent {
    pub fn entries(&self) -> &[Entry] {
        match self {
            SyncEvent::Created { entries, .. } | SyncEvent::Modified { entries } => entries,
        }
    }
}
