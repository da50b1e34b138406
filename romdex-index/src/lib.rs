//! Bucketed item index over a DAT entity store.
//!
//! [`DatIndex`] owns an append-only [`ItemStore`] and a derived bucket index
//! keyed by machine name or by a content hash. On top of that sit the
//! deduplication engine, the parent/clone relationship passes, predicate
//! filtering, and running statistics.

mod dedup;
mod filter;
mod index;
mod key;
mod sets;
mod stats;
mod store;

pub use filter::ItemPredicate;
pub use index::{DatIndex, DedupeMode};
pub use key::BucketKey;
pub use stats::{DatStatistics, StatsSnapshot};
pub use store::ItemStore;
