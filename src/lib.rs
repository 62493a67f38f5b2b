//! faxmirror — incremental mirror of a remote fax/document inbox.
//!
//! Polls a paginated remote listing, diffs it against a snapshot cursor,
//! materializes new and changed documents as rasterized PNG pages under one
//! directory per receive date, and keeps display names synchronized both
//! ways through a per-bucket sidecar ledger: remote renames land in the
//! ledger, local ledger edits are pushed back as remote renames.
//!
//! The remote transport ([`listing::ListingSource`]) and the page renderer
//! ([`raster::Rasterizer`]) are capabilities injected into the engine;
//! reference implementations for a JSON gateway and single-frame images are
//! bundled.

#![warn(clippy::all)]

pub mod cli;
pub mod config;
pub mod listing;
pub mod mirror;
pub mod raster;
pub mod retry;
pub mod scheduler;
pub mod shutdown;
pub mod sync;
pub mod types;

pub use listing::{Entry, EntryKey, ListingSource};
pub use mirror::MirrorStore;
pub use raster::Rasterizer;
pub use sync::{SyncEngine, SyncEvent};
