//! Predicate-driven filtering.
//!
//! The predicate itself is injected by the caller; this module only owns the
//! traversal and the marking convention (`remove = true`, compacted later by
//! `clear_marked`).

use rayon::prelude::*;

use romdex_core::DatItem;

use crate::index::DatIndex;

/// A filter decision: `true` keeps the item.
pub type ItemPredicate = dyn Fn(&DatItem) -> bool + Sync;

impl DatIndex {
    /// Mark every item failing the predicate for removal. Evaluation runs in
    /// parallel per bucket when an index is active, per item otherwise; the
    /// marking itself is applied sequentially.
    pub fn execute_filters(&mut self, passes: &ItemPredicate) {
        let store = &self.store;
        let failing: Vec<usize> = if self.buckets.is_empty() {
            store
                .live_indices()
                .par_iter()
                .filter(|&&ix| store.get_item(ix).is_some_and(|item| !passes(item)))
                .copied()
                .collect()
        } else {
            self.buckets
                .par_iter()
                .flat_map_iter(|(_, bucket)| {
                    bucket
                        .iter()
                        .copied()
                        .filter(|&ix| store.get_item(ix).is_some_and(|item| !passes(item)))
                        .collect::<Vec<_>>()
                })
                .collect()
        };

        for ix in failing {
            if let Some(item) = self.store.get_item_mut(ix) {
                item.remove = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::DedupeMode;
    use crate::key::BucketKey;
    use romdex_core::item::Rom;
    use romdex_core::{ItemHashes, Machine};

    fn rom_item(name: &str, size: u64, crc: &str) -> DatItem {
        DatItem::rom(
            name,
            Rom {
                size: Some(size),
                hashes: ItemHashes {
                    crc: Some(crc.into()),
                    ..Default::default()
                },
                ..Default::default()
            },
        )
    }

    fn sample_index() -> DatIndex {
        let mut index = DatIndex::new();
        let m = index.add_machine(Machine::named("game"));
        index.add_item(rom_item("small.bin", 16, "11111111"), m, None);
        index.add_item(rom_item("large.bin", 4096, "22222222"), m, None);
        index
    }

    #[test]
    fn test_filter_marks_without_deleting() {
        let mut index = sample_index();
        index.execute_filters(&|item| item.size().unwrap_or(0) < 1024);

        assert_eq!(index.store().live_item_count(), 2);
        let marked: Vec<_> = index
            .store()
            .iter_live()
            .filter(|(_, item)| item.remove)
            .map(|(_, item)| item.name.clone().unwrap())
            .collect();
        assert_eq!(marked, vec!["large.bin"]);
    }

    #[test]
    fn test_filter_then_clear_marked_compacts() {
        let mut index = sample_index();
        index.bucket_by(BucketKey::Machine, DedupeMode::None);
        index.execute_filters(&|item| item.size().unwrap_or(0) >= 1024);
        index.clear_marked();

        assert_eq!(index.store().live_item_count(), 1);
        assert_eq!(index.get_items_for_bucket("game", false).len(), 1);
    }

    #[test]
    fn test_keep_all_predicate_is_noop() {
        let mut index = sample_index();
        index.execute_filters(&|_| true);
        assert!(index.store().iter_live().all(|(_, item)| !item.remove));
    }
}
