//! The remote inbox listing capability.
//!
//! The sync engine never talks to a concrete server; it consumes this trait.
//! [`HttpListingSource`] is the bundled reference transport for a JSON
//! gateway; deployments fronted by a different protocol implement the trait
//! themselves.

pub mod entry;
pub mod error;
pub mod http;

pub use entry::{Entry, EntryKey};
pub use error::ListingError;
pub use http::HttpListingSource;

use bytes::Bytes;
use chrono::NaiveDate;

/// Async capability over the remote inbox.
///
/// Object-safe so the engine can hold an `Arc<dyn ListingSource>`.
#[async_trait::async_trait]
pub trait ListingSource: Send + Sync {
    /// Establish a session. `Ok(false)` means the credentials were rejected.
    async fn authenticate(&self) -> Result<bool, ListingError>;

    /// Fetch the complete listing for the inclusive date range.
    ///
    /// Implementations may return entries in any order and may repeat an
    /// entry across pages; the engine re-sorts and de-duplicates.
    async fn fetch_all(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Entry>, ListingError>;

    /// Change an entry's display name on the remote side.
    async fn rename(&self, entry: &Entry, new_name: &str) -> Result<(), ListingError>;

    /// Resolve an entry's `source_ref` to the raw document bytes.
    async fn fetch_raw(&self, source_ref: &str) -> Result<Bytes, ListingError>;
}
