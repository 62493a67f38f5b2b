//! Sync engine errors.
//!
//! Only listing fetch failures abort a poll; everything else in the engine is
//! isolated per entry and logged where it happens, because one bad document
//! must not stall the rest of the mirror.

use thiserror::Error;

use crate::listing::ListingError;
use crate::raster::RasterError;

#[derive(Debug, Error)]
pub enum SyncError {
    /// The remote listing could not be fetched. Transient: the cursor and
    /// entry map are untouched and the next scheduled poll retries.
    #[error("failed to fetch the remote listing: {0}")]
    Fetch(#[source] ListingError),
}

/// Why one entry failed to materialize. Logged per entry; siblings in the
/// same batch continue.
#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("fetching document bytes: {0}")]
    Fetch(#[source] ListingError),

    #[error("rasterizing page {page}: {source}")]
    Raster {
        page: usize,
        #[source]
        source: RasterError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
