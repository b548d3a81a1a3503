//! Collection metadata lifecycle.
//!
//! Every collection embeds one hidden sentinel record (id `@metadata`)
//! carrying its creation time, a concurrency etag and arbitrary
//! user-supplied properties. [`CollectionManager`] owns the sentinel
//! protocol: existence checks, reads with a derived last-updated
//! timestamp, the two-step upsert that preserves `@created_on` across
//! replaces, and etag-checked deletion with a compensating restore.

mod manager;
mod sort;

pub use manager::{CollectionManager, DeleteOutcome, UpsertOutcome};
pub use sort::parse_sort_by;

/// Immutable creation timestamp, set once on first sentinel creation.
pub const CREATED_ON: &str = "@created_on";
/// Concurrency token, restamped on every successful sentinel write.
pub const ETAG: &str = "@etag";
/// Derived display field; never stored, computed from `@etag` on reads.
pub const LASTUPDATED_ON: &str = "@lastupdated_on";
