//! Core data model for DAT catalogs: items, machines, provenance sources,
//! content-hash envelopes, and the streaming hasher used by verification
//! workflows. The index and dedup engine lives in `romdex-index`.

pub mod error;
pub mod hasher;
pub mod hashes;
pub mod item;
pub mod machine;
pub mod natural;
pub mod source;

pub use error::CoreError;
pub use hashes::{HashKind, ItemHashes};
pub use item::{DatItem, DumpStatus, DupeType, ItemKind, ItemType};
pub use machine::{DEFAULT_MACHINE_NAME, Machine};
pub use natural::natural_cmp;
pub use source::Source;
