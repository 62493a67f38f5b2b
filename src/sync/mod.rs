//! The incremental sync engine.
//!
//! One poll cycle: fetch the whole listing window, diff it against the
//! snapshot cursor and the in-memory entry map, materialize new and changed
//! documents into the mirror, merge the sidecar ledgers, and broadcast typed
//! events. The reverse path re-reads an edited ledger and pushes name changes
//! back to the listing source.
//!
//! Both operations read-modify-write the same cursor and entry map, so the
//! engine serializes them with a single async mutex held run-to-completion;
//! a trigger that arrives mid-run queues behind it instead of overlapping.

pub mod cursor;
pub mod error;
pub mod events;

pub use cursor::{Classification, SnapshotCursor};
pub use error::{MaterializeError, SyncError};
pub use events::SyncEvent;

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tokio::sync::{broadcast, Mutex};

use crate::listing::{Entry, EntryKey, ListingError, ListingSource};
use crate::mirror::{ledger, paths, MirrorStore};
use crate::raster::Rasterizer;
use crate::retry::{self, RetryAction, RetryConfig};

/// Engine tuning knobs.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Fixed start of the listing window. `None` polls the current day only;
    /// the window always ends at "today", recomputed each poll.
    pub start_date: Option<NaiveDate>,
    /// Backoff for the raw document fetch inside materialization.
    pub retry: RetryConfig,
}

/// Result sets of one poll cycle.
#[derive(Debug, Default)]
pub struct PollOutcome {
    pub created: Vec<Entry>,
    pub modified: Vec<Entry>,
}

/// Mutable state shared by poll and reconciliation.
#[derive(Debug, Default)]
struct EngineState {
    cursor: SnapshotCursor,
    /// Most-recently-seen entry per key. Only entries that were alerted
    /// (created or modified) live here; it is the baseline for both the
    /// modified-diff and rename detection.
    entries: BTreeMap<EntryKey, Entry>,
}

pub struct SyncEngine {
    source: Arc<dyn ListingSource>,
    rasterizer: Arc<dyn Rasterizer>,
    store: MirrorStore,
    options: EngineOptions,
    state: Mutex<EngineState>,
    events: broadcast::Sender<SyncEvent>,
}

impl SyncEngine {
    pub fn new(
        source: Arc<dyn ListingSource>,
        rasterizer: Arc<dyn Rasterizer>,
        store: MirrorStore,
        options: EngineOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(events::EVENT_CHANNEL_CAPACITY);
        Self {
            source,
            rasterizer,
            store,
            options,
            state: Mutex::new(EngineState::default()),
            events,
        }
    }

    pub fn store(&self) -> &MirrorStore {
        &self.store
    }

    /// Subscribe to created/modified batches.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Run one full sync cycle.
    ///
    /// `first` marks the initial population pass. A fetch failure leaves the
    /// cursor and entry map untouched; materialization failures are isolated
    /// per entry and never fail the poll. The caller (normally the
    /// scheduler) re-arms the next poll whatever the outcome.
    pub async fn poll(&self, first: bool) -> Result<PollOutcome, SyncError> {
        let mut state = self.state.lock().await;
        self.poll_locked(&mut state, first).await
    }

    async fn poll_locked(
        &self,
        state: &mut EngineState,
        first: bool,
    ) -> Result<PollOutcome, SyncError> {
        let today = Local::now().date_naive();
        let start = self.options.start_date.unwrap_or(today).min(today);
        let mut fetched = self
            .source
            .fetch_all(start, today)
            .await
            .map_err(SyncError::Fetch)?;
        fetched.sort_by_key(Entry::key);

        let mut seen = HashSet::new();
        let mut created = Vec::new();
        let mut modified = Vec::new();
        for entry in &fetched {
            let key = entry.key();
            match cursor::classify(entry, first, &state.cursor, &state.entries, &seen) {
                Classification::New => {
                    state.cursor.advance(key);
                    created.push(entry.clone());
                }
                Classification::Modified => modified.push(entry.clone()),
                Classification::Unchanged => {}
            }
            seen.insert(key);
        }

        if !created.is_empty() || !modified.is_empty() {
            tracing::info!(
                created = created.len(),
                modified = modified.len(),
                listed = fetched.len(),
                "sync cycle found changes"
            );
        } else {
            tracing::debug!(listed = fetched.len(), "sync cycle found no changes");
        }

        self.materialize(&mut created).await;
        self.materialize(&mut modified).await;

        for entry in created.iter().chain(modified.iter()) {
            state.entries.insert(entry.key(), entry.clone());
        }

        if !created.is_empty() {
            let _ = self.events.send(SyncEvent::Created {
                entries: created.clone(),
                initial: first,
            });
        }
        if !modified.is_empty() {
            let _ = self.events.send(SyncEvent::Modified {
                entries: modified.clone(),
            });
        }

        Ok(PollOutcome { created, modified })
    }

    /// Materialize a batch of entries into the mirror and merge their
    /// id→name pairs into the bucket ledgers.
    ///
    /// Idempotent: entries whose first page already exists on disk are
    /// enumerated instead of re-fetched. A failing entry is logged and left
    /// without local pages; its ledger line is still written so rename
    /// reconciliation can see it.
    pub async fn materialize(&self, entries: &mut [Entry]) {
        let mut ledger_updates: BTreeMap<u32, BTreeMap<u64, String>> = BTreeMap::new();
        for entry in entries.iter_mut() {
            if let Err(e) = self.materialize_entry(entry).await {
                tracing::warn!(
                    key = %entry.key(),
                    name = %entry.display_name,
                    error = %e,
                    "materialization failed, entry left without local pages"
                );
            }
            ledger_updates
                .entry(entry.bucket_id)
                .or_default()
                .insert(entry.sequence_id, entry.display_name.clone());
        }

        for (bucket_id, updates) in &ledger_updates {
            match self.store.ensure_bucket(*bucket_id).await {
                Ok(dir) => {
                    if let Err(e) = ledger::merge_write(&dir, updates).await {
                        tracing::warn!(bucket = bucket_id, error = %e, "could not update ledger");
                    }
                }
                Err(e) => {
                    tracing::warn!(bucket = bucket_id, error = %e, "could not create bucket directory");
                }
            }
        }
    }

    async fn materialize_entry(&self, entry: &mut Entry) -> Result<(), MaterializeError> {
        let dir = self.store.ensure_bucket(entry.bucket_id).await?;
        let prefix = paths::entry_prefix(entry.sequence_id);
        let first_page = paths::page_file_name(entry.sequence_id, &entry.display_name, 0);
        let existing = self.store.prefix_files(&dir, &prefix).await?;

        if existing.iter().any(|name| *name == first_page) {
            // Already materialized under the current name; recover the page
            // list from disk instead of re-fetching.
            entry.local_images = self
                .store
                .probe_pages(&dir, entry.sequence_id, &entry.display_name)
                .await;
            return Ok(());
        }

        // Same id under a different (old) name: those files are stale now.
        if !existing.is_empty() {
            self.store.remove_files(&dir, &existing).await;
        }

        let raw = retry::retry_with_backoff(
            &self.options.retry,
            |e: &ListingError| {
                if e.is_retryable() {
                    RetryAction::Retry
                } else {
                    RetryAction::Abort
                }
            },
            || self.source.fetch_raw(&entry.source_ref),
        )
        .await
        .map_err(MaterializeError::Fetch)?;

        let mut pages = Vec::new();
        for page in 0.. {
            match self.rasterizer.extract_page(raw.clone(), page).await {
                Ok(image) => {
                    let name = paths::page_file_name(entry.sequence_id, &entry.display_name, page);
                    let path = self.store.write_page(&dir, &name, &image.png).await?;
                    pages.push(path);
                }
                Err(e) if e.is_end_of_pages() => break,
                Err(e) => return Err(MaterializeError::Raster { page, source: e }),
            }
        }
        if pages.is_empty() {
            tracing::warn!(key = %entry.key(), "document produced no pages");
        }
        tracing::debug!(key = %entry.key(), pages = pages.len(), "materialized document");
        entry.local_images = pages;
        Ok(())
    }

    /// Push local ledger edits for one bucket back to the listing source,
    /// then refresh from remote.
    ///
    /// For every in-memory entry of the bucket whose cached name differs from
    /// the ledger's value, a remote rename is issued; failures are logged and
    /// naturally retried on the next ledger pass because the mismatch
    /// persists. The follow-up poll is what re-materializes renamed entries
    /// (they come back as modified) and confirms the rename took.
    pub async fn reconcile_from_ledger(&self, bucket_dir: &Path) -> Result<(), SyncError> {
        let Some(bucket_id) = bucket_id_from_dir(bucket_dir) else {
            tracing::debug!(path = %bucket_dir.display(), "ignoring change outside a bucket directory");
            return Ok(());
        };

        let mut state = self.state.lock().await;
        let names = ledger::load(bucket_dir).await;

        let renames: Vec<(Entry, String)> = state
            .entries
            .values()
            .filter(|entry| entry.bucket_id == bucket_id)
            .filter_map(|entry| {
                names
                    .get(&entry.sequence_id)
                    .filter(|name| *name != &entry.display_name)
                    .map(|name| (entry.clone(), name.clone()))
            })
            .collect();

        for (entry, new_name) in &renames {
            tracing::info!(
                key = %entry.key(),
                from = %entry.display_name,
                to = %new_name,
                "pushing local rename to the listing source"
            );
            if let Err(e) = self.source.rename(entry, new_name).await {
                tracing::warn!(
                    key = %entry.key(),
                    error = %e,
                    "rename failed, will retry on the next ledger pass"
                );
            }
        }

        self.poll_locked(&mut state, false).await?;
        Ok(())
    }
}

/// A bucket directory is named after its numeric bucket id.
fn bucket_id_from_dir(dir: &Path) -> Option<u32> {
    dir.file_name()?.to_str()?.parse().ok()
}
