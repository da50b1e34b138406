//! The entity store: append-only tables of items, machines, and provenance
//! sources, plus the item→machine and item→source mappings.
//!
//! Indices are permanent for the lifetime of a run and never reused.
//! Statistics are updated synchronously inside every mutation so the
//! counters are always consistent with the stored item set.

use romdex_core::{DatItem, DumpStatus, ItemKind, Machine, Source};

use crate::stats::DatStatistics;

#[derive(Debug, Default)]
pub struct ItemStore {
    items: Vec<Option<DatItem>>,
    machines: Vec<Option<Machine>>,
    sources: Vec<Source>,
    item_machine: Vec<Option<usize>>,
    item_source: Vec<Option<usize>>,
    stats: DatStatistics,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    // -- insertion --

    /// Store an item attributed to a machine and (optionally) a provenance
    /// source, returning its permanent index.
    ///
    /// Applies the hash-cleanup policy before storage, so the stored item
    /// may differ from the argument (zero-byte normalization, forced Nodump
    /// status).
    pub fn add_item(
        &mut self,
        mut item: DatItem,
        machine_ix: usize,
        source_ix: Option<usize>,
    ) -> usize {
        clean_item(&mut item);
        self.stats.add_item(&item);
        let ix = self.items.len();
        self.items.push(Some(item));
        self.item_machine.push(Some(machine_ix));
        self.item_source.push(source_ix);
        ix
    }

    pub fn add_machine(&mut self, machine: Machine) -> usize {
        let ix = self.machines.len();
        self.machines.push(Some(machine));
        ix
    }

    pub fn add_source(&mut self, source: Source) -> usize {
        let ix = self.sources.len();
        self.sources.push(source);
        ix
    }

    // -- lookups --

    pub fn get_item(&self, ix: usize) -> Option<&DatItem> {
        self.items.get(ix).and_then(|slot| slot.as_ref())
    }

    pub fn get_item_mut(&mut self, ix: usize) -> Option<&mut DatItem> {
        self.items.get_mut(ix).and_then(|slot| slot.as_mut())
    }

    pub fn get_machine(&self, ix: usize) -> Option<&Machine> {
        self.machines.get(ix).and_then(|slot| slot.as_ref())
    }

    pub fn get_machine_mut(&mut self, ix: usize) -> Option<&mut Machine> {
        self.machines.get_mut(ix).and_then(|slot| slot.as_mut())
    }

    pub fn get_source(&self, ix: usize) -> Option<&Source> {
        self.sources.get(ix)
    }

    /// Machine index an item is mapped to, if any.
    pub fn machine_of(&self, item_ix: usize) -> Option<usize> {
        self.item_machine.get(item_ix).copied().flatten()
    }

    /// Source index an item is mapped to, if any.
    pub fn source_of(&self, item_ix: usize) -> Option<usize> {
        self.item_source.get(item_ix).copied().flatten()
    }

    /// Ordinal of the originating input file for an item, read off its
    /// source record. This, not the source table index, is what key
    /// prefixes and dedup tie-breaks compare: sources may be registered in
    /// any order.
    pub fn input_of(&self, item_ix: usize) -> Option<usize> {
        self.source_of(item_ix)
            .and_then(|six| self.get_source(six))
            .map(|source| source.input)
    }

    pub fn set_machine_of(&mut self, item_ix: usize, machine_ix: usize) {
        if let Some(slot) = self.item_machine.get_mut(item_ix) {
            *slot = Some(machine_ix);
        }
    }

    /// Linear scan for a machine by name. Names are assumed unique; when
    /// they are not, the first (lowest-index) match wins.
    pub fn get_machine_by_name(&self, name: &str) -> Option<usize> {
        self.machines.iter().position(|slot| {
            slot.as_ref()
                .is_some_and(|m| m.name.as_deref() == Some(name))
        })
    }

    // -- removal --

    /// Physically delete an item and detach its mappings. Returns false if
    /// the index never held an item or it was already removed.
    pub fn remove_item(&mut self, ix: usize) -> bool {
        let Some(slot) = self.items.get_mut(ix) else {
            return false;
        };
        let Some(item) = slot.take() else {
            return false;
        };
        self.stats.remove_item(&item);
        if let Some(m) = self.item_machine.get_mut(ix) {
            *m = None;
        }
        if let Some(s) = self.item_source.get_mut(ix) {
            *s = None;
        }
        true
    }

    /// Delete a machine and detach every item mapped to it. The items
    /// themselves are not deleted.
    pub fn remove_machine(&mut self, ix: usize) -> bool {
        let Some(slot) = self.machines.get_mut(ix) else {
            return false;
        };
        if slot.take().is_none() {
            return false;
        }
        for mapping in self.item_machine.iter_mut() {
            if *mapping == Some(ix) {
                *mapping = None;
            }
        }
        true
    }

    /// Replace an item in place, keeping its index and mappings and
    /// adjusting statistics for the field changes.
    pub fn replace_item(&mut self, ix: usize, item: DatItem) -> bool {
        let Some(slot) = self.items.get_mut(ix) else {
            return false;
        };
        let Some(old) = slot.as_ref() else {
            return false;
        };
        self.stats.remove_item(old);
        self.stats.add_item(&item);
        *slot = Some(item);
        true
    }

    // -- iteration --

    /// Indices of all live (non-deleted) items, in index order. Items with
    /// the soft-delete `remove` flag are still live.
    pub fn live_indices(&self) -> Vec<usize> {
        self.items
            .iter()
            .enumerate()
            .filter_map(|(ix, slot)| slot.as_ref().map(|_| ix))
            .collect()
    }

    pub fn iter_live(&self) -> impl Iterator<Item = (usize, &DatItem)> {
        self.items
            .iter()
            .enumerate()
            .filter_map(|(ix, slot)| slot.as_ref().map(|item| (ix, item)))
    }

    pub fn live_item_count(&self) -> usize {
        self.items.iter().filter(|slot| slot.is_some()).count()
    }

    /// Indices of all live machines.
    pub fn machine_indices(&self) -> Vec<usize> {
        self.machines
            .iter()
            .enumerate()
            .filter_map(|(ix, slot)| slot.as_ref().map(|_| ix))
            .collect()
    }

    pub fn machine_count(&self) -> usize {
        self.machines.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    // -- statistics --

    pub fn stats(&self) -> &DatStatistics {
        &self.stats
    }

    /// Rebuild the statistics counters from the stored items.
    pub fn recalculate_stats(&self) {
        self.stats.reset();
        for (_, item) in self.iter_live() {
            self.stats.add_item(item);
        }
    }
}

// ---------------------------------------------------------------------------
// Hash-cleanup policy
// ---------------------------------------------------------------------------

/// Deterministic normalization applied to every item before storage.
///
/// - A Rom whose size is missing or zero and whose hashes are absent or
///   equal to the empty file becomes the canonical zero-byte file.
/// - A Rom that cannot be the zero-byte file but has no usable size, or has
///   a size but no hash at all, is forced to Nodump.
/// - A Disk with neither MD5 nor SHA1 is forced to Nodump, unless it has no
///   hash at all (an intentionally incomplete upstream entry).
fn clean_item(item: &mut DatItem) {
    match &mut item.kind {
        ItemKind::Rom(rom) => {
            let sizeless = rom.size.is_none_or(|s| s == 0);
            if sizeless && (rom.hashes.crc.is_none() || rom.hashes.matches_empty_file()) {
                rom.size = Some(0);
                rom.hashes.normalize_to_empty_file();
            } else if rom.status != DumpStatus::Nodump && sizeless {
                rom.status = DumpStatus::Nodump;
            } else if rom.status != DumpStatus::Nodump && !sizeless && rom.hashes.is_empty() {
                rom.status = DumpStatus::Nodump;
            }
        }
        ItemKind::Disk(disk) => {
            if disk.hashes.is_empty() {
                // Intentional incomplete entry upstream
                return;
            }
            if disk.status != DumpStatus::Nodump
                && disk.hashes.md5.is_none()
                && disk.hashes.sha1.is_none()
            {
                disk.status = DumpStatus::Nodump;
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use romdex_core::item::{Disk, Rom};
    use romdex_core::{HashKind, ItemHashes, ItemType};

    fn rom(name: &str, size: Option<u64>, crc: Option<&str>) -> DatItem {
        DatItem::rom(
            name,
            Rom {
                size,
                hashes: ItemHashes {
                    crc: crc.map(String::from),
                    ..Default::default()
                },
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_add_and_get() {
        let mut store = ItemStore::new();
        let mix = store.add_machine(Machine::named("pacman"));
        let six = store.add_source(Source::new(0));
        let ix = store.add_item(rom("a.bin", Some(8), Some("12345678")), mix, Some(six));

        assert_eq!(store.get_item(ix).unwrap().name.as_deref(), Some("a.bin"));
        assert_eq!(store.machine_of(ix), Some(mix));
        assert_eq!(store.source_of(ix), Some(six));
        assert_eq!(store.live_item_count(), 1);
    }

    #[test]
    fn test_remove_item_detaches_mappings() {
        let mut store = ItemStore::new();
        let mix = store.add_machine(Machine::named("pacman"));
        let ix = store.add_item(rom("a.bin", Some(8), Some("12345678")), mix, None);

        assert!(store.remove_item(ix));
        assert!(store.get_item(ix).is_none());
        assert!(store.machine_of(ix).is_none());
        assert!(!store.remove_item(ix));
        assert_eq!(store.stats().total_count(), 0);
    }

    #[test]
    fn test_remove_machine_cascades_mappings_only() {
        let mut store = ItemStore::new();
        let mix = store.add_machine(Machine::named("pacman"));
        let ix = store.add_item(rom("a.bin", Some(8), Some("12345678")), mix, None);

        assert!(store.remove_machine(mix));
        assert!(store.get_machine(mix).is_none());
        // Item survives, mapping does not
        assert!(store.get_item(ix).is_some());
        assert!(store.machine_of(ix).is_none());
    }

    #[test]
    fn test_get_machine_by_name_first_match_wins() {
        let mut store = ItemStore::new();
        let first = store.add_machine(Machine::named("dupe"));
        let _second = store.add_machine(Machine::named("dupe"));
        assert_eq!(store.get_machine_by_name("dupe"), Some(first));
        assert_eq!(store.get_machine_by_name("missing"), None);
    }

    #[test]
    fn test_zero_byte_normalization() {
        let mut store = ItemStore::new();
        let mix = store.add_machine(Machine::named("pacman"));
        let ix = store.add_item(rom("empty.bin", None, None), mix, None);

        let stored = store.get_item(ix).unwrap();
        assert_eq!(stored.size(), Some(0));
        let hashes = stored.hashes().unwrap();
        assert_eq!(hashes.get(HashKind::Crc), Some("00000000"));
        assert_eq!(
            hashes.get(HashKind::Md5),
            Some(HashKind::Md5.empty_digest())
        );
        assert_eq!(
            hashes.get(HashKind::Sha1),
            Some(HashKind::Sha1.empty_digest())
        );
        assert_eq!(stored.status(), Some(DumpStatus::Good));
    }

    #[test]
    fn test_sizeless_rom_with_real_hash_forced_nodump() {
        let mut store = ItemStore::new();
        let mix = store.add_machine(Machine::named("pacman"));
        // CRC present but not the empty-file digest, size missing
        let ix = store.add_item(rom("odd.bin", None, Some("cafebabe")), mix, None);
        assert_eq!(store.get_item(ix).unwrap().status(), Some(DumpStatus::Nodump));
    }

    #[test]
    fn test_sized_rom_with_no_hash_forced_nodump() {
        let mut store = ItemStore::new();
        let mix = store.add_machine(Machine::named("pacman"));
        let ix = store.add_item(rom("nohash.bin", Some(1024), None), mix, None);
        assert_eq!(store.get_item(ix).unwrap().status(), Some(DumpStatus::Nodump));
    }

    #[test]
    fn test_disk_without_md5_or_sha1_forced_nodump() {
        let mut store = ItemStore::new();
        let mix = store.add_machine(Machine::named("pacman"));
        let ix = store.add_item(
            DatItem::disk(
                "cd",
                Disk {
                    hashes: ItemHashes {
                        sha256: Some("ab".repeat(32)),
                        ..Default::default()
                    },
                    ..Default::default()
                },
            ),
            mix,
            None,
        );
        assert_eq!(store.get_item(ix).unwrap().status(), Some(DumpStatus::Nodump));
    }

    #[test]
    fn test_hashless_disk_passes_through() {
        let mut store = ItemStore::new();
        let mix = store.add_machine(Machine::named("pacman"));
        let ix = store.add_item(DatItem::disk("cd", Disk::default()), mix, None);
        assert_eq!(store.get_item(ix).unwrap().status(), Some(DumpStatus::Good));
    }

    #[test]
    fn test_stats_consistency_under_mutation() {
        let mut store = ItemStore::new();
        let mix = store.add_machine(Machine::named("pacman"));
        let a = store.add_item(rom("a.bin", Some(8), Some("11111111")), mix, None);
        let _b = store.add_item(rom("b.bin", Some(8), Some("22222222")), mix, None);
        store.remove_item(a);

        assert_eq!(store.stats().total_count(), 1);
        assert_eq!(store.stats().item_count(ItemType::Rom), 1);

        store.recalculate_stats();
        assert_eq!(store.stats().total_count(), 1);
        assert_eq!(store.stats().total_size(), 8);
    }

    #[test]
    fn test_replace_item_adjusts_stats() {
        let mut store = ItemStore::new();
        let mix = store.add_machine(Machine::named("pacman"));
        let ix = store.add_item(rom("a.bin", Some(8), Some("11111111")), mix, None);

        let mut filled = store.get_item(ix).unwrap().clone();
        filled.hashes_mut().unwrap().sha1 = Some("da".repeat(20));
        assert!(store.replace_item(ix, filled));

        assert_eq!(store.stats().hash_count(HashKind::Sha1), 1);
        assert_eq!(store.stats().total_count(), 1);
    }
}
