//! The hash-keyed bucket index over the entity store.
//!
//! Buckets are a derived cache: fully rebuilt whenever the active key kind
//! changes, patched incrementally on add/remove while a key kind is active.
//! Bucket membership is only guaranteed valid immediately after the call
//! that produced it.

use std::collections::BTreeMap;

use log::debug;
use rayon::prelude::*;

use romdex_core::{DatItem, Machine, Source};

use crate::dedup;
use crate::key::{self, BucketKey};
use crate::stats::DatStatistics;
use crate::store::ItemStore;

/// How aggressively `bucket_by` collapses duplicates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DedupeMode {
    /// Keep every item; buckets are only sorted.
    #[default]
    None,
    /// Merge content-equivalent items within every bucket.
    Full,
    /// Merge only within a machine: dedup runs only when bucketed by the
    /// machine key.
    Game,
}

/// An entity store with a bucket index derived over it.
#[derive(Debug, Default)]
pub struct DatIndex {
    pub(crate) store: ItemStore,
    pub(crate) buckets: BTreeMap<String, Vec<usize>>,
    pub(crate) bucketed_by: Option<BucketKey>,
    pub(crate) merged_by: DedupeMode,
    pub(crate) lowercase: bool,
    pub(crate) norename: bool,
}

impl DatIndex {
    pub fn new() -> Self {
        Self {
            lowercase: true,
            norename: true,
            ..Default::default()
        }
    }

    // -- store delegation (kept here so the bucket cache stays consistent) --

    pub fn store(&self) -> &ItemStore {
        &self.store
    }

    pub fn stats(&self) -> &DatStatistics {
        self.store.stats()
    }

    pub fn add_machine(&mut self, machine: Machine) -> usize {
        self.store.add_machine(machine)
    }

    pub fn add_source(&mut self, source: Source) -> usize {
        self.store.add_source(source)
    }

    /// Add an item; while a key kind is active the item is also inserted
    /// into its bucket, so relationship passes can mutate the store while
    /// iterating a snapshot of keys.
    pub fn add_item(
        &mut self,
        item: DatItem,
        machine_ix: usize,
        source_ix: Option<usize>,
    ) -> usize {
        let ix = self.store.add_item(item, machine_ix, source_ix);
        if let Some(kind) = self.bucketed_by {
            if let Some(k) = key::bucket_key(&self.store, ix, kind, self.lowercase, self.norename)
            {
                self.buckets.entry(k).or_default().push(ix);
            }
        }
        ix
    }

    /// Remove an item from the store and from its current bucket.
    pub fn remove_item(&mut self, ix: usize) -> bool {
        if let Some(kind) = self.bucketed_by {
            if let Some(k) = key::bucket_key(&self.store, ix, kind, self.lowercase, self.norename)
            {
                if let Some(bucket) = self.buckets.get_mut(&k) {
                    bucket.retain(|&i| i != ix);
                }
            }
        }
        self.store.remove_item(ix)
    }

    /// Replace an item in place, moving it between buckets if its key
    /// changed.
    pub fn replace_item(&mut self, ix: usize, item: DatItem) -> bool {
        let old_key = self.current_key_of(ix);
        if !self.store.replace_item(ix, item) {
            return false;
        }
        let new_key = self.current_key_of(ix);
        if old_key != new_key {
            if let Some(k) = old_key {
                if let Some(bucket) = self.buckets.get_mut(&k) {
                    bucket.retain(|&i| i != ix);
                }
            }
            if let Some(k) = new_key {
                self.buckets.entry(k).or_default().push(ix);
            }
        }
        true
    }

    fn current_key_of(&self, ix: usize) -> Option<String> {
        let kind = self.bucketed_by?;
        key::bucket_key(&self.store, ix, kind, self.lowercase, self.norename)
    }

    pub fn recalculate_stats(&self) {
        self.store.recalculate_stats();
    }

    // -- bucketing --

    /// Rebucket with the default flags (`lowercase=true`, `norename=true`).
    pub fn bucket_by(&mut self, key: BucketKey, dedupe: DedupeMode) {
        self.bucket_by_opts(key, dedupe, true, true);
    }

    /// Group all live items by the derived key, then either dedup each
    /// bucket or bring it into the deterministic sort order.
    ///
    /// Key derivation runs in parallel per item; dedup and sorting run in
    /// parallel per bucket. Within one bucket dedup is sequential because
    /// the tie-break rules depend on scan order.
    pub fn bucket_by_opts(
        &mut self,
        key: BucketKey,
        dedupe: DedupeMode,
        lowercase: bool,
        norename: bool,
    ) {
        if self.bucketed_by != Some(key) {
            debug!("rebucketing by {key:?}");
            self.buckets.clear();
            self.lowercase = lowercase;
            self.norename = norename;

            let live = self.store.live_indices();
            let keyed: Vec<(String, usize)> = live
                .par_iter()
                .filter_map(|&ix| {
                    key::bucket_key(&self.store, ix, key, lowercase, norename).map(|k| (k, ix))
                })
                .collect();
            for (k, ix) in keyed {
                self.buckets.entry(k).or_default().push(ix);
            }
            self.bucketed_by = Some(key);
            self.merged_by = DedupeMode::None;
        }

        let run_dedupe = match dedupe {
            DedupeMode::None => false,
            DedupeMode::Full => true,
            DedupeMode::Game => key == BucketKey::Machine,
        };

        if run_dedupe {
            if self.merged_by != dedupe {
                self.dedupe_buckets();
                self.merged_by = dedupe;
            }
        } else {
            let mut buckets = std::mem::take(&mut self.buckets);
            let store = &self.store;
            buckets.par_iter_mut().for_each(|(_, bucket)| {
                bucket.sort_by(|&a, &b| dedup::compare_items(store, a, b, norename));
            });
            self.buckets = buckets;
        }
    }

    fn dedupe_buckets(&mut self) {
        let mut buckets = std::mem::take(&mut self.buckets);
        let store = &self.store;
        let outcomes: Vec<(String, dedup::BucketOutcome)> = buckets
            .par_iter()
            .map(|(k, bucket)| (k.clone(), dedup::dedupe_bucket(store, bucket)))
            .collect();

        // Apply phase: sequential, so the mappings and statistics see no
        // concurrent writers.
        for (k, outcome) in outcomes {
            for (ix, item) in outcome.rewrites {
                self.store.replace_item(ix, item);
            }
            for (ix, machine_ix) in outcome.moves {
                self.store.set_machine_of(ix, machine_ix);
            }
            for ix in outcome.removed {
                self.store.remove_item(ix);
            }
            buckets.insert(k, outcome.order);
        }
        self.buckets = buckets;
    }

    /// Active key kind, if the index is currently bucketed.
    pub fn bucketed_by(&self) -> Option<BucketKey> {
        self.bucketed_by
    }

    /// Snapshot of the current bucket keys.
    pub fn bucket_keys(&self) -> Vec<String> {
        self.buckets.keys().cloned().collect()
    }

    /// Drop the derived index entirely; the next `bucket_by` rebuilds it.
    /// Needed after passes that rename machines in place.
    pub(crate) fn invalidate_buckets(&mut self) {
        self.buckets.clear();
        self.bucketed_by = None;
        self.merged_by = DedupeMode::None;
    }

    // -- queries --

    /// Live members of a bucket. An unknown key is an empty bucket. With
    /// `filtered`, items flagged for removal are excluded.
    pub fn get_items_for_bucket(&self, key: &str, filtered: bool) -> Vec<usize> {
        let Some(bucket) = self.buckets.get(key) else {
            return Vec::new();
        };
        bucket
            .iter()
            .copied()
            .filter(|&ix| {
                self.store
                    .get_item(ix)
                    .is_some_and(|item| !(filtered && item.remove))
            })
            .collect()
    }

    /// Find every stored item content-equal to the probe.
    ///
    /// Side effect, depended on by the verify/rebuild workflows: every match
    /// is flagged `remove=true` before being returned, and the bucket is
    /// rewritten with the matches ahead of the non-matches.
    pub fn get_duplicates(&mut self, probe: &DatItem, already_sorted: bool) -> Vec<usize> {
        self.ensure_sorted(already_sorted);
        let Some(kind) = self.bucketed_by else {
            return Vec::new();
        };
        let key = key::probe_key(probe, kind, self.lowercase);
        let Some(bucket) = self.buckets.get(&key).cloned() else {
            return Vec::new();
        };

        let mut matches = Vec::new();
        let mut rest = Vec::new();
        for ix in bucket {
            let is_match = self
                .store
                .get_item(ix)
                .is_some_and(|item| dedup::items_match(probe, item));
            if is_match {
                if let Some(item) = self.store.get_item_mut(ix) {
                    item.remove = true;
                }
                matches.push(ix);
            } else {
                rest.push(ix);
            }
        }

        let mut rewritten = matches.clone();
        rewritten.extend(rest);
        self.buckets.insert(key, rewritten);
        matches
    }

    /// Same lookup as [`get_duplicates`](Self::get_duplicates), without the
    /// mutation.
    pub fn has_duplicates(&mut self, probe: &DatItem, already_sorted: bool) -> bool {
        self.ensure_sorted(already_sorted);
        let Some(kind) = self.bucketed_by else {
            return false;
        };
        let key = key::probe_key(probe, kind, self.lowercase);
        let Some(bucket) = self.buckets.get(&key) else {
            return false;
        };
        bucket.iter().any(|&ix| {
            self.store
                .get_item(ix)
                .is_some_and(|item| dedup::items_match(probe, item))
        })
    }

    fn ensure_sorted(&mut self, already_sorted: bool) {
        if !already_sorted {
            let key = self.store.stats().best_available_key();
            self.bucket_by(key, DedupeMode::None);
        }
    }

    // -- maintenance --

    /// Physically delete every item flagged `remove=true`.
    pub fn clear_marked(&mut self) {
        let marked: Vec<usize> = self
            .store
            .iter_live()
            .filter_map(|(ix, item)| item.remove.then_some(ix))
            .collect();
        debug!("compacting {} marked items", marked.len());
        for ix in marked {
            self.remove_item(ix);
        }
    }

    /// Drop bucket keys whose member list is empty.
    pub fn clear_empty(&mut self) {
        self.buckets.retain(|_, bucket| !bucket.is_empty());
    }
}
