//! Snapshot cursor and listing diff classification.
//!
//! The cursor remembers the highest entry key already alerted on. Each poll
//! re-fetches the whole listing window and classifies every entry against the
//! cursor plus the in-memory entry map; only `New` entries move the cursor
//! forward, and it never moves backward within a run.

use std::collections::{BTreeMap, HashSet};

use crate::listing::{Entry, EntryKey};

/// Highest `(bucket_id, sequence_id)` already alerted. Empty at process
/// start; not persisted across runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotCursor {
    last: Option<EntryKey>,
}

impl SnapshotCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Option<EntryKey> {
        self.last
    }

    /// Whether `key` lies strictly beyond everything already alerted.
    pub fn is_beyond(&self, key: EntryKey) -> bool {
        match self.last {
            Some(last) => key > last,
            None => true,
        }
    }

    /// Move the cursor forward to `key`. Regressions are ignored.
    pub fn advance(&mut self, key: EntryKey) {
        match self.last {
            Some(last) if key < last => {}
            _ => self.last = Some(key),
        }
    }
}

/// Outcome of diffing one fetched entry against local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Never alerted before; materialize and advance the cursor.
    New,
    /// Already alerted, but its name or acknowledgment state changed.
    Modified,
    /// Nothing to do (includes duplicates within a fetch cycle).
    Unchanged,
}

/// Classify one fetched entry.
///
/// `first` marks the initial population pass: everything beyond the cursor is
/// `New` regardless of acknowledgment, so the mirror fills completely. On
/// later passes an unacknowledged entry beyond the cursor stays `Unchanged`
/// without advancing the cursor — it surfaces as `New` once the remote side
/// acknowledges it.
///
/// `seen` is the set of keys already classified this cycle; a repeat (the
/// same entry appearing on two fetch pages) is `Unchanged`.
pub fn classify(
    entry: &Entry,
    first: bool,
    cursor: &SnapshotCursor,
    cache: &BTreeMap<EntryKey, Entry>,
    seen: &HashSet<EntryKey>,
) -> Classification {
    let key = entry.key();
    if seen.contains(&key) {
        return Classification::Unchanged;
    }
    if cursor.is_beyond(key) {
        if first || entry.is_acknowledged() {
            return Classification::New;
        }
        return Classification::Unchanged;
    }
    // At or below the cursor: only entries we already hold can be modified.
    // An entry first seen below the cursor is dropped here.
    if let Some(cached) = cache.get(&key) {
        if cached.display_name != entry.display_name
            || cached.is_acknowledged() != entry.is_acknowledged()
        {
            return Classification::Modified;
        }
    }
    Classification::Unchanged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(bucket_id: u32, sequence_id: u64, name: &str, acked: bool) -> Entry {
        Entry {
            bucket_id,
            sequence_id,
            display_name: name.to_string(),
            source_ref: format!("http://gw/raw/{sequence_id}"),
            received_at: None,
            acknowledged_at: acked.then(chrono::Utc::now),
            local_images: Vec::new(),
        }
    }

    fn key(bucket_id: u32, sequence_id: u64) -> EntryKey {
        EntryKey {
            bucket_id,
            sequence_id,
        }
    }

    fn cursor_at(bucket_id: u32, sequence_id: u64) -> SnapshotCursor {
        let mut c = SnapshotCursor::new();
        c.advance(key(bucket_id, sequence_id));
        c
    }

    #[test]
    fn cursor_advances_and_never_regresses() {
        let mut c = SnapshotCursor::new();
        assert_eq!(c.position(), None);
        c.advance(key(20231201, 5));
        c.advance(key(20231201, 3));
        assert_eq!(c.position(), Some(key(20231201, 5)));
        c.advance(key(20231202, 1));
        assert_eq!(c.position(), Some(key(20231202, 1)));
    }

    #[test]
    fn beyond_uses_bucket_then_sequence() {
        let c = cursor_at(20231201, 5);
        assert!(c.is_beyond(key(20231201, 6)));
        assert!(c.is_beyond(key(20231202, 1)));
        assert!(!c.is_beyond(key(20231201, 5)));
        assert!(!c.is_beyond(key(20231130, 999)));
    }

    #[test]
    fn acknowledged_entry_beyond_cursor_is_new() {
        let c = cursor_at(20231201, 5);
        let e = entry(20231201, 6, "Receipt", true);
        assert_eq!(
            classify(&e, false, &c, &BTreeMap::new(), &HashSet::new()),
            Classification::New
        );
    }

    #[test]
    fn unacknowledged_entry_waits_unless_first_run() {
        let c = cursor_at(20231201, 5);
        let e = entry(20231201, 6, "Receipt", false);
        assert_eq!(
            classify(&e, false, &c, &BTreeMap::new(), &HashSet::new()),
            Classification::Unchanged
        );
        assert_eq!(
            classify(&e, true, &c, &BTreeMap::new(), &HashSet::new()),
            Classification::New
        );
    }

    #[test]
    fn first_run_sees_everything_with_an_empty_cursor() {
        let c = SnapshotCursor::new();
        for acked in [true, false] {
            let e = entry(20231201, 1, "Doc", acked);
            assert_eq!(
                classify(&e, true, &c, &BTreeMap::new(), &HashSet::new()),
                Classification::New
            );
        }
    }

    #[test]
    fn cached_entry_with_changed_name_is_modified() {
        let c = cursor_at(20231201, 5);
        let cached = entry(20231201, 4, "Old Name", true);
        let mut cache = BTreeMap::new();
        cache.insert(cached.key(), cached);

        let renamed = entry(20231201, 4, "New Name", true);
        assert_eq!(
            classify(&renamed, false, &c, &cache, &HashSet::new()),
            Classification::Modified
        );
    }

    #[test]
    fn cached_entry_with_changed_ack_state_is_modified() {
        let c = cursor_at(20231201, 5);
        let cached = entry(20231201, 4, "Doc", false);
        let mut cache = BTreeMap::new();
        cache.insert(cached.key(), cached);

        let acked = entry(20231201, 4, "Doc", true);
        assert_eq!(
            classify(&acked, false, &c, &cache, &HashSet::new()),
            Classification::Modified
        );
    }

    #[test]
    fn cached_entry_without_changes_is_unchanged() {
        let c = cursor_at(20231201, 5);
        let cached = entry(20231201, 4, "Doc", true);
        let mut cache = BTreeMap::new();
        cache.insert(cached.key(), cached.clone());

        assert_eq!(
            classify(&cached, false, &c, &cache, &HashSet::new()),
            Classification::Unchanged
        );
    }

    #[test]
    fn entry_below_cursor_and_not_cached_is_dropped() {
        let c = cursor_at(20231201, 5);
        let e = entry(20231201, 2, "Unseen Old Doc", true);
        assert_eq!(
            classify(&e, false, &c, &BTreeMap::new(), &HashSet::new()),
            Classification::Unchanged
        );
    }

    #[test]
    fn duplicate_within_a_cycle_is_suppressed() {
        let c = cursor_at(20231201, 5);
        let e = entry(20231201, 6, "Receipt", true);
        let mut seen = HashSet::new();
        assert_eq!(
            classify(&e, false, &c, &BTreeMap::new(), &seen),
            Classification::New
        );
        seen.insert(e.key());
        assert_eq!(
            classify(&e, false, &c, &BTreeMap::new(), &seen),
            Classification::Unchanged
        );
    }

    /// Once the cursor reaches a key, nothing at or below it ever comes back
    /// as `New`, whatever its acknowledgment state.
    #[test]
    fn new_classification_is_monotonic() {
        let c = cursor_at(20231201, 10);
        for seq in 1..=10 {
            for acked in [true, false] {
                let e = entry(20231201, seq, "Doc", acked);
                assert_ne!(
                    classify(&e, false, &c, &BTreeMap::new(), &HashSet::new()),
                    Classification::New,
                    "seq {seq} acked {acked}"
                );
            }
        }
    }
}
