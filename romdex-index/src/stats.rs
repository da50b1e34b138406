//! Running statistics over the entity store.
//!
//! Counters are updated synchronously inside every store insert/remove and
//! are the authoritative answer to "which hash kind is safe to bucket by".
//! A single coarse lock guards the counters since parallel bucket work can
//! add and remove items concurrently.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use romdex_core::{DatItem, DumpStatus, HashKind, ItemType};

use crate::key::BucketKey;

/// A plain copy of all counters, ready for report writers to serialize.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_count: u64,
    pub item_counts: BTreeMap<ItemType, u64>,
    /// Dump statuses across Rom/Disk/Media items. Kinds without a status
    /// field count as Good.
    pub status_counts: BTreeMap<DumpStatus, u64>,
    /// Number of items carrying each hash kind.
    pub hash_counts: BTreeMap<HashKind, u64>,
    /// Sum of declared sizes.
    pub total_size: u64,
}

impl StatsSnapshot {
    fn add(&mut self, item: &DatItem) {
        self.total_count += 1;
        *self.item_counts.entry(item.item_type()).or_default() += 1;
        if let Some(status) = effective_status(item) {
            *self.status_counts.entry(status).or_default() += 1;
        }
        if let Some(hashes) = item.hashes() {
            for &kind in &HashKind::ALL {
                if hashes.get(kind).is_some() {
                    *self.hash_counts.entry(kind).or_default() += 1;
                }
            }
        }
        self.total_size += item.size().unwrap_or(0);
    }

    fn remove(&mut self, item: &DatItem) {
        self.total_count = self.total_count.saturating_sub(1);
        if let Some(n) = self.item_counts.get_mut(&item.item_type()) {
            *n = n.saturating_sub(1);
        }
        if let Some(status) = effective_status(item) {
            if let Some(n) = self.status_counts.get_mut(&status) {
                *n = n.saturating_sub(1);
            }
        }
        if let Some(hashes) = item.hashes() {
            for &kind in &HashKind::ALL {
                if hashes.get(kind).is_some() {
                    if let Some(n) = self.hash_counts.get_mut(&kind) {
                        *n = n.saturating_sub(1);
                    }
                }
            }
        }
        self.total_size = self.total_size.saturating_sub(item.size().unwrap_or(0));
    }
}

/// The dump status an item contributes to the status counters: Rom and Disk
/// report their own, Media counts as Good, everything else is exempt.
fn effective_status(item: &DatItem) -> Option<DumpStatus> {
    match item.item_type() {
        ItemType::Rom | ItemType::Disk => item.status().or(Some(DumpStatus::Good)),
        ItemType::Media => Some(DumpStatus::Good),
        _ => None,
    }
}

/// Thread-safe running counters over a store's live item set.
#[derive(Debug, Default)]
pub struct DatStatistics {
    inner: Mutex<StatsSnapshot>,
}

impl DatStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_item(&self, item: &DatItem) {
        self.inner.lock().add(item);
    }

    pub fn remove_item(&self, item: &DatItem) {
        self.inner.lock().remove(item);
    }

    pub fn reset(&self) {
        *self.inner.lock() = StatsSnapshot::default();
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.inner.lock().clone()
    }

    pub fn total_count(&self) -> u64 {
        self.inner.lock().total_count
    }

    pub fn item_count(&self, item_type: ItemType) -> u64 {
        self.inner
            .lock()
            .item_counts
            .get(&item_type)
            .copied()
            .unwrap_or(0)
    }

    pub fn status_count(&self, status: DumpStatus) -> u64 {
        self.inner
            .lock()
            .status_counts
            .get(&status)
            .copied()
            .unwrap_or(0)
    }

    pub fn hash_count(&self, kind: HashKind) -> u64 {
        self.inner.lock().hash_counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_size(&self) -> u64 {
        self.inner.lock().total_size
    }

    /// Number of hash-carrying items (Rom + Disk + Media).
    pub fn hashed_item_count(&self) -> u64 {
        let inner = self.inner.lock();
        [ItemType::Rom, ItemType::Disk, ItemType::Media]
            .iter()
            .map(|t| inner.item_counts.get(t).copied().unwrap_or(0))
            .sum()
    }

    /// Pick the strongest hash kind every non-nodump hash item carries.
    ///
    /// A heuristic, not a guarantee: used to choose a default bucketing key
    /// when the caller does not specify one. Falls back to CRC.
    pub fn best_available_key(&self) -> BucketKey {
        let inner = self.inner.lock();
        let hashed: u64 = [ItemType::Rom, ItemType::Disk, ItemType::Media]
            .iter()
            .map(|t| inner.item_counts.get(t).copied().unwrap_or(0))
            .sum();
        let nodump = inner
            .status_counts
            .get(&DumpStatus::Nodump)
            .copied()
            .unwrap_or(0);
        let expected = hashed.saturating_sub(nodump);

        let candidates = [
            (HashKind::Sha512, BucketKey::Sha512),
            (HashKind::Sha384, BucketKey::Sha384),
            (HashKind::Sha256, BucketKey::Sha256),
            (HashKind::Sha1, BucketKey::Sha1),
            (HashKind::Md5, BucketKey::Md5),
        ];
        for (kind, key) in candidates {
            let present = inner.hash_counts.get(&kind).copied().unwrap_or(0);
            if expected > 0 && present == expected {
                return key;
            }
        }
        BucketKey::Crc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use romdex_core::item::{Disk, Rom};
    use romdex_core::ItemHashes;

    fn rom_with(crc: Option<&str>, sha1: Option<&str>, size: u64) -> DatItem {
        DatItem::rom(
            "test.bin",
            Rom {
                size: Some(size),
                hashes: ItemHashes {
                    crc: crc.map(String::from),
                    sha1: sha1.map(String::from),
                    ..Default::default()
                },
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_add_remove_roundtrip() {
        let stats = DatStatistics::new();
        let rom = rom_with(Some("11111111"), None, 64);
        stats.add_item(&rom);
        assert_eq!(stats.total_count(), 1);
        assert_eq!(stats.item_count(ItemType::Rom), 1);
        assert_eq!(stats.hash_count(HashKind::Crc), 1);
        assert_eq!(stats.total_size(), 64);

        stats.remove_item(&rom);
        assert_eq!(stats.total_count(), 0);
        assert_eq!(stats.hash_count(HashKind::Crc), 0);
        assert_eq!(stats.total_size(), 0);
    }

    #[test]
    fn test_status_counts_cover_hash_kinds() {
        let stats = DatStatistics::new();
        stats.add_item(&rom_with(Some("11111111"), None, 1));
        let mut nodump = DatItem::disk("cd", Disk::default());
        nodump.set_status(DumpStatus::Nodump);
        stats.add_item(&nodump);

        let per_status: u64 = [
            DumpStatus::BadDump,
            DumpStatus::Good,
            DumpStatus::Nodump,
            DumpStatus::Verified,
        ]
        .iter()
        .map(|&s| stats.status_count(s))
        .sum();
        assert_eq!(per_status, stats.hashed_item_count());
    }

    #[test]
    fn test_best_available_key_prefers_strongest_complete() {
        let stats = DatStatistics::new();
        stats.add_item(&rom_with(Some("11111111"), Some("aa".repeat(20).as_str()), 1));
        stats.add_item(&rom_with(Some("22222222"), Some("bb".repeat(20).as_str()), 1));
        // Every non-nodump item has SHA1
        assert_eq!(stats.best_available_key(), BucketKey::Sha1);
    }

    #[test]
    fn test_best_available_key_ignores_nodump_gap() {
        let stats = DatStatistics::new();
        stats.add_item(&rom_with(Some("11111111"), Some(&"aa".repeat(20)), 1));
        let mut nodump = rom_with(None, None, 0);
        nodump.set_status(DumpStatus::Nodump);
        stats.add_item(&nodump);
        // One nodump item with no hashes does not block SHA1 bucketing
        assert_eq!(stats.best_available_key(), BucketKey::Sha1);
    }

    #[test]
    fn test_best_available_key_falls_back_to_crc() {
        let stats = DatStatistics::new();
        stats.add_item(&rom_with(Some("11111111"), Some(&"aa".repeat(20)), 1));
        stats.add_item(&rom_with(Some("22222222"), None, 1));
        assert_eq!(stats.best_available_key(), BucketKey::Crc);
    }

    #[test]
    fn test_snapshot_serializes() {
        let stats = DatStatistics::new();
        stats.add_item(&rom_with(Some("11111111"), None, 8));
        let json = serde_json::to_string(&stats.snapshot()).unwrap();
        assert!(json.contains("\"total_count\":1"));
    }
}
