//! Per-bucket deduplication and the deterministic bucket ordering.
//!
//! Dedup within a bucket is strictly sequential: the tie-break rules depend
//! on first-match-wins scanning order. Parallelism happens across buckets,
//! never inside one.

use std::cmp::Ordering;

use romdex_core::{DEFAULT_MACHINE_NAME, DatItem, DumpStatus, DupeType, ItemType, natural_cmp};

use crate::store::ItemStore;

/// What a per-bucket dedup pass decided, computed against an immutable view
/// of the store and applied sequentially afterwards.
#[derive(Debug, Default)]
pub(crate) struct BucketOutcome {
    /// Surviving bucket membership, in output order.
    pub order: Vec<usize>,
    /// Survivors whose fields changed (filled hashes, renamed identity).
    pub rewrites: Vec<(usize, DatItem)>,
    /// Survivors whose owning machine changed.
    pub moves: Vec<(usize, usize)>,
    /// Items merged away, to be deleted from the store.
    pub removed: Vec<usize>,
}

struct Survivor {
    ix: usize,
    item: DatItem,
    machine_ix: Option<usize>,
    input: Option<usize>,
    changed: bool,
    moved: bool,
}

/// Collapse content-equivalent items within one bucket.
///
/// Non-hash kinds and Nodump Rom/Disk entries pass through untouched;
/// everything else is compared against the survivors already accepted, in
/// order, and merged into the first match.
pub(crate) fn dedupe_bucket(store: &ItemStore, bucket: &[usize]) -> BucketOutcome {
    let mut outcome = BucketOutcome::default();
    let mut survivors: Vec<Survivor> = Vec::new();
    // Output order: passthrough entries keep their position between the
    // survivor entries. Survivor slots are patched in at the end.
    enum Entry {
        Pass(usize),
        Surv(usize),
    }
    let mut entries: Vec<Entry> = Vec::new();

    for &ix in bucket {
        let Some(item) = store.get_item(ix) else {
            continue;
        };

        if !item.is_hash_bearing() {
            entries.push(Entry::Pass(ix));
            continue;
        }
        // Nodump entries are never merged and do not count as the bucket's
        // first real item.
        if item.status() == Some(DumpStatus::Nodump)
            && matches!(item.item_type(), ItemType::Rom | ItemType::Disk)
        {
            entries.push(Entry::Pass(ix));
            continue;
        }

        let machine_ix = store.machine_of(ix);
        let input = store.input_of(ix);

        let mut merged = false;
        for surv in survivors.iter_mut() {
            let Some(dupe) = duplicate_status(&surv.item, item, surv.input, input) else {
                continue;
            };

            // Fill missing information: the survivor keeps every populated
            // field and gains whatever the incoming item adds.
            if let (Some(dst), Some(src)) = (surv.item.hashes_mut(), item.hashes()) {
                dst.fill_missing_from(src);
            }
            if surv.item.size().is_none() {
                surv.item.set_size(item.size());
            }
            surv.item.dupe_type = dupe;

            // Tie-breaks, in this order: the lower input ordinal wins the
            // survivor's identity; otherwise a clone child collapses toward
            // its parent machine.
            if input.unwrap_or(usize::MAX) < surv.input.unwrap_or(usize::MAX) {
                surv.item.name = item.name.clone();
                if surv.machine_ix != machine_ix {
                    surv.machine_ix = machine_ix;
                    surv.moved = true;
                }
            } else if machine_is_child_of(store, surv.machine_ix, machine_ix) {
                surv.machine_ix = machine_ix;
                surv.moved = true;
            }
            surv.changed = true;
            outcome.removed.push(ix);
            merged = true;
            break;
        }

        if !merged {
            entries.push(Entry::Surv(survivors.len()));
            survivors.push(Survivor {
                ix,
                item: item.clone(),
                machine_ix,
                input,
                changed: false,
                moved: false,
            });
        }
    }

    for entry in entries {
        match entry {
            Entry::Pass(ix) => outcome.order.push(ix),
            Entry::Surv(si) => outcome.order.push(survivors[si].ix),
        }
    }
    for surv in survivors {
        if surv.changed {
            outcome.rewrites.push((surv.ix, surv.item));
        }
        if surv.moved {
            if let Some(mix) = surv.machine_ix {
                outcome.moves.push((surv.ix, mix));
            }
        }
    }
    outcome
}

/// The duplicate-status predicate: `None` means no match; otherwise the
/// classification the survivor should carry (internal when both items come
/// from the same input, external when they do not).
pub(crate) fn duplicate_status(
    a: &DatItem,
    b: &DatItem,
    a_input: Option<usize>,
    b_input: Option<usize>,
) -> Option<DupeType> {
    if !items_match(a, b) {
        return None;
    }
    if a_input == b_input {
        Some(DupeType::Internal)
    } else {
        Some(DupeType::External)
    }
}

/// Content equivalence for merge purposes. Only the hash-bearing kinds
/// participate; Nodump entries never match anything.
pub(crate) fn items_match(a: &DatItem, b: &DatItem) -> bool {
    if a.item_type() != b.item_type() || !a.is_hash_bearing() {
        return false;
    }
    if a.status() == Some(DumpStatus::Nodump) || b.status() == Some(DumpStatus::Nodump) {
        return false;
    }
    // Exact equality short-circuits the hash comparison
    if a.same_content(b) {
        return true;
    }
    // Declared sizes must agree when both are present
    if let (Some(sa), Some(sb)) = (a.size(), b.size()) {
        if sa != sb {
            return false;
        }
    }
    match (a.hashes(), b.hashes()) {
        (Some(ha), Some(hb)) => ha.compatible_with(hb),
        _ => false,
    }
}

/// True when `child` declares `parent` as its clone-of or rom-of target.
fn machine_is_child_of(
    store: &ItemStore,
    child: Option<usize>,
    parent: Option<usize>,
) -> bool {
    let (Some(child_ix), Some(parent_ix)) = (child, parent) else {
        return false;
    };
    if child_ix == parent_ix {
        return false;
    }
    let (Some(child_m), Some(parent_m)) = (store.get_machine(child_ix), store.get_machine(parent_ix))
    else {
        return false;
    };
    let Some(parent_name) = parent_m.name.as_deref() else {
        return false;
    };
    child_m.clone_of.as_deref() == Some(parent_name)
        || child_m.rom_of.as_deref() == Some(parent_name)
}

// ---------------------------------------------------------------------------
// Bucket ordering
// ---------------------------------------------------------------------------

/// Deterministic bucket ordering used when a bucket is sorted without
/// merging: machine name, then item kind, then the directory and file
/// portions of the sanitized item name (natural order throughout), with the
/// machine name or input ordinal as the final tie-break.
pub(crate) fn compare_items(
    store: &ItemStore,
    a_ix: usize,
    b_ix: usize,
    norename: bool,
) -> Ordering {
    let (Some(a), Some(b)) = (store.get_item(a_ix), store.get_item(b_ix)) else {
        return a_ix.cmp(&b_ix);
    };
    let a_machine = machine_name(store, a_ix);
    let b_machine = machine_name(store, b_ix);

    let (a_dir, a_file) = split_sanitized(a.name.as_deref().unwrap_or(""));
    let (b_dir, b_file) = split_sanitized(b.name.as_deref().unwrap_or(""));

    natural_cmp(a_machine, b_machine)
        .then_with(|| a.item_type().cmp(&b.item_type()))
        .then_with(|| natural_cmp(&a_dir, &b_dir))
        .then_with(|| natural_cmp(&a_file, &b_file))
        .then_with(|| {
            if norename {
                a_machine.cmp(b_machine)
            } else {
                let a_input = store.input_of(a_ix).unwrap_or(usize::MAX);
                let b_input = store.input_of(b_ix).unwrap_or(usize::MAX);
                a_input.cmp(&b_input)
            }
        })
        .then_with(|| a_ix.cmp(&b_ix))
}

fn machine_name(store: &ItemStore, item_ix: usize) -> &str {
    store
        .machine_of(item_ix)
        .and_then(|mix| store.get_machine(mix))
        .map(|m| m.name_or_default())
        .unwrap_or(DEFAULT_MACHINE_NAME)
}

/// Split an item name into (directory, file) after folding backslashes to
/// forward slashes.
fn split_sanitized(name: &str) -> (String, String) {
    let sanitized = name.replace('\\', "/");
    match sanitized.rfind('/') {
        Some(pos) => (
            sanitized[..pos].to_string(),
            sanitized[pos + 1..].to_string(),
        ),
        None => (String::new(), sanitized),
    }
}
