//! Inbox entry value types.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

/// Compound identity of an inbox entry.
///
/// The derived `Ord` is the sync order: bucket (receive date) ascending, then
/// sequence id ascending. The remote source assigns sequence ids
/// monotonically within a bucket; the pair is globally unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryKey {
    /// Date bucket, `YYYYMMDD` as a number (e.g. `20231201`).
    pub bucket_id: u32,
    /// Monotonic per-bucket sequence id. Upstream values exceed 2^53, so this
    /// must stay a full-width integer and round-trip as a decimal string.
    pub sequence_id: u64,
}

impl std::fmt::Display for EntryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.bucket_id, self.sequence_id)
    }
}

/// One inbound document as reported by the remote listing.
///
/// Entries are rebuilt from the listing on every poll; the only fields that
/// can change between polls are `display_name`, `acknowledged_at`, and the
/// locally-populated `local_images`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub bucket_id: u32,
    pub sequence_id: u64,
    /// User-editable document title, mutable on the remote side too.
    pub display_name: String,
    /// Opaque locator for the raw document bytes (resolved by the
    /// [`ListingSource`](crate::listing::ListingSource)).
    pub source_ref: String,
    pub received_at: Option<DateTime<Utc>>,
    /// When the remote side marked the document as checked. `None` means the
    /// document is still pending remote acknowledgment.
    pub acknowledged_at: Option<DateTime<Utc>>,
    /// Rasterized page files in the mirror, in page order. Populated by
    /// materialization; empty until then.
    pub local_images: Vec<PathBuf>,
}

impl Entry {
    pub fn key(&self) -> EntryKey {
        EntryKey {
            bucket_id: self.bucket_id,
            sequence_id: self.sequence_id,
        }
    }

    /// Whether the remote side has acknowledged this document.
    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged_at.is_some()
    }
}
