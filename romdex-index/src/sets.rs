//! Parent/clone graph rewrites: BIOS/device/slot inheritance, split/merge
//! of clone sets, 1G1R filtering, and the name-normalization passes.
//!
//! Every operation iterates machines in name-sorted order over a
//! machine-keyed bucket index. Clone/rom/sample relations are weak name
//! references; a reference to an absent machine is silently a no-op.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

use log::warn;
use regex::Regex;

use romdex_core::item::{Slot, SlotOption};
use romdex_core::{DatItem, ItemKind, ItemType, natural_cmp};

use crate::dedup;
use crate::index::{DatIndex, DedupeMode};
use crate::key::BucketKey;

/// Leading scene-release date token: `DD.DD.DD-` followed by a
/// `group-title` remainder. Group 2 is what survives the strip.
static SCENE_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2}\.\d{2}\.\d{2}-)(.*?-.*)$").expect("valid regex"));

fn machine_bucket_key(name: &str) -> String {
    name.to_lowercase()
}

impl DatIndex {
    /// Machine indices paired with their names, in natural name order.
    fn sorted_machines(&self) -> Vec<(String, usize)> {
        let mut machines: Vec<(String, usize)> = self
            .store
            .machine_indices()
            .into_iter()
            .filter_map(|ix| {
                self.store
                    .get_machine(ix)
                    .map(|m| (m.name_or_default().to_string(), ix))
            })
            .collect();
        machines.sort_by(|a, b| natural_cmp(&a.0, &b.0).then(a.1.cmp(&b.1)));
        machines
    }

    fn items_of_machine(&self, machine_name: &str) -> Vec<usize> {
        self.get_items_for_bucket(&machine_bucket_key(machine_name), false)
    }

    /// Delete a machine together with its items and its bucket.
    fn delete_machine_by_name(&mut self, name: &str) {
        for ix in self.items_of_machine(name) {
            self.remove_item(ix);
        }
        if let Some(mix) = self.store.get_machine_by_name(name) {
            self.store.remove_machine(mix);
        }
        self.buckets.remove(&machine_bucket_key(name));
    }

    // -- inheritance: pulling items downward --

    /// Copy each BIOS parent's items into the machines that `rom_of` it,
    /// skipping items the child already has by name.
    pub fn add_roms_from_bios(&mut self) {
        self.bucket_by_opts(BucketKey::Machine, DedupeMode::None, true, true);

        for (name, mix) in self.sorted_machines() {
            let Some(parent_name) = self
                .store
                .get_machine(mix)
                .and_then(|m| m.rom_of.clone())
            else {
                continue;
            };
            if self.store.get_machine_by_name(&parent_name).is_none() {
                continue;
            }

            let mut child_names: HashSet<Option<String>> = self
                .items_of_machine(&name)
                .into_iter()
                .filter_map(|ix| self.store.get_item(ix).map(|item| item.name.clone()))
                .collect();

            for pix in self.items_of_machine(&parent_name) {
                let Some(item) = self.store.get_item(pix).cloned() else {
                    continue;
                };
                if child_names.contains(&item.name) {
                    continue;
                }
                child_names.insert(item.name.clone());
                let source = self.store.source_of(pix);
                self.add_item(item, mix, source);
            }
        }
    }

    /// Follow `DeviceRef` (and optionally slot-option) names to pull the
    /// referenced device machines' items in, recording newly discovered
    /// transitive references as fresh `DeviceRef` items. Loops until no
    /// machine gains anything.
    pub fn add_roms_from_devices(&mut self, dev_only: bool, use_slot_options: bool) {
        self.bucket_by_opts(BucketKey::Machine, DedupeMode::None, true, true);

        let mut found_new = true;
        while found_new {
            found_new = false;
            for (name, mix) in self.sorted_machines() {
                let is_device = self
                    .store
                    .get_machine(mix)
                    .map(|m| m.is_device)
                    .unwrap_or(false);
                if dev_only && !is_device {
                    continue;
                }

                let mut refs: Vec<String> = Vec::new();
                let mut have_ref: HashSet<String> = HashSet::new();
                let mut existing: HashSet<(ItemType, Option<String>)> = HashSet::new();
                for ix in self.items_of_machine(&name) {
                    let Some(item) = self.store.get_item(ix) else {
                        continue;
                    };
                    existing.insert((item.item_type(), item.name.clone()));
                    collect_device_refs(item, use_slot_options, &mut have_ref, &mut refs);
                }

                // Transitive discoveries, tagged with whether they came in
                // through a slot option so the recorded item keeps the same
                // relation kind.
                let mut new_refs: Vec<(String, bool)> = Vec::new();
                for ref_name in &refs {
                    if self.store.get_machine_by_name(ref_name).is_none() {
                        continue;
                    }
                    for dix in self.items_of_machine(ref_name) {
                        let Some(item) = self.store.get_item(dix).cloned() else {
                            continue;
                        };
                        match &item.kind {
                            ItemKind::DeviceRef => {
                                if let Some(n) = &item.name {
                                    if !have_ref.contains(n)
                                        && new_refs.iter().all(|(r, _)| r != n)
                                    {
                                        new_refs.push((n.clone(), false));
                                    }
                                }
                            }
                            ItemKind::Slot(slot) if use_slot_options => {
                                for opt in &slot.options {
                                    if let Some(d) = &opt.dev_name {
                                        if !have_ref.contains(d)
                                            && new_refs.iter().all(|(r, _)| r != d)
                                        {
                                            new_refs.push((d.clone(), true));
                                        }
                                    }
                                }
                            }
                            _ => {
                                let sig = (item.item_type(), item.name.clone());
                                if !existing.contains(&sig) {
                                    existing.insert(sig);
                                    let source = self.store.source_of(dix);
                                    self.add_item(item, mix, source);
                                    found_new = true;
                                }
                            }
                        }
                    }
                }

                // Record the transitive references so the relation survives
                // on the machine itself, as the kind it was discovered
                // through.
                for (new_ref, via_slot) in new_refs {
                    let kind = if via_slot {
                        ItemKind::Slot(Slot {
                            options: vec![SlotOption {
                                name: None,
                                dev_name: Some(new_ref.clone()),
                                default: None,
                            }],
                        })
                    } else {
                        ItemKind::DeviceRef
                    };
                    let sig = (
                        if via_slot {
                            ItemType::Slot
                        } else {
                            ItemType::DeviceRef
                        },
                        Some(new_ref.clone()),
                    );
                    if !existing.contains(&sig) {
                        existing.insert(sig);
                        self.add_item(DatItem::new(new_ref, kind), mix, None);
                        found_new = true;
                    }
                }
            }
        }
    }

    /// Clone-of propagation: copy the parent's items into each clone child
    /// and flatten the hierarchy one level by rewriting the child's
    /// `rom_of` to the parent's `rom_of`.
    pub fn add_roms_from_parent(&mut self) {
        self.bucket_by_opts(BucketKey::Machine, DedupeMode::None, true, true);

        for (name, mix) in self.sorted_machines() {
            let Some(parent_name) = self
                .store
                .get_machine(mix)
                .and_then(|m| m.clone_of.clone())
            else {
                continue;
            };
            let Some(pmix) = self.store.get_machine_by_name(&parent_name) else {
                continue;
            };

            let mut child_names: HashSet<Option<String>> = self
                .items_of_machine(&name)
                .into_iter()
                .filter_map(|ix| self.store.get_item(ix).map(|item| item.name.clone()))
                .collect();

            for pix in self.items_of_machine(&parent_name) {
                let Some(item) = self.store.get_item(pix).cloned() else {
                    continue;
                };
                if child_names.contains(&item.name) {
                    continue;
                }
                child_names.insert(item.name.clone());
                let source = self.store.source_of(pix);
                self.add_item(item, mix, source);
            }

            let parent_rom_of = self
                .store
                .get_machine(pmix)
                .and_then(|p| p.rom_of.clone());
            if let Some(child) = self.store.get_machine_mut(mix) {
                child.rom_of = parent_rom_of;
            }
        }
    }

    /// Inverse direction: hoist each clone child's items up into its
    /// parent, honoring merge tags, then drop the emptied child bucket.
    ///
    /// With `subfolder`, hoisted item names are prefixed with the child
    /// machine's name. Unless `skip_dedup`, items the parent already holds
    /// an equivalent of are not duplicated.
    pub fn add_roms_from_children(&mut self, subfolder: bool, skip_dedup: bool) {
        self.bucket_by_opts(BucketKey::Machine, DedupeMode::None, true, true);

        for (name, _mix) in self.sorted_machines() {
            let Some(parent_name) = self
                .store
                .get_machine_by_name(&name)
                .and_then(|mix| self.store.get_machine(mix))
                .and_then(|m| m.clone_of.clone())
            else {
                continue;
            };
            let Some(pmix) = self.store.get_machine_by_name(&parent_name) else {
                continue;
            };

            let mut parent_items: Vec<DatItem> = self
                .items_of_machine(&parent_name)
                .into_iter()
                .filter_map(|ix| self.store.get_item(ix).cloned())
                .collect();

            for cix in self.items_of_machine(&name) {
                let Some(item) = self.store.get_item(cix).cloned() else {
                    continue;
                };

                // A merge tag naming an item the parent already has means
                // the parent copy is authoritative.
                let merged_away = item.merge.as_ref().is_some_and(|tag| {
                    parent_items
                        .iter()
                        .any(|p| p.name.as_deref() == Some(tag.as_str()))
                });
                let already_present = !skip_dedup
                    && parent_items.iter().any(|p| dedup::items_match(p, &item));

                if !merged_away && !already_present {
                    let mut hoisted = item;
                    if subfolder {
                        if let Some(n) = &hoisted.name {
                            hoisted.name = Some(format!("{name}/{n}"));
                        }
                    }
                    let source = self.store.source_of(cix);
                    parent_items.push(hoisted.clone());
                    self.add_item(hoisted, pmix, source);
                }
                self.remove_item(cix);
            }
            self.buckets.remove(&machine_bucket_key(&name));
        }
    }

    // -- inverse operations: stripping inherited items --

    /// Delete child items that are exact copies of their `rom_of` parent's
    /// items. With `bios_only`, only parents flagged as BIOS are considered.
    pub fn remove_bios_roms_from_child(&mut self, bios_only: bool) {
        self.bucket_by_opts(BucketKey::Machine, DedupeMode::None, true, true);

        for (name, mix) in self.sorted_machines() {
            let Some(parent_name) = self
                .store
                .get_machine(mix)
                .and_then(|m| m.rom_of.clone())
            else {
                continue;
            };
            let Some(pmix) = self.store.get_machine_by_name(&parent_name) else {
                continue;
            };
            if bios_only
                && !self
                    .store
                    .get_machine(pmix)
                    .map(|p| p.is_bios)
                    .unwrap_or(false)
            {
                continue;
            }
            self.remove_items_duplicated_from(&name, &parent_name);
        }
    }

    /// Delete child items duplicated from the clone-of parent and propagate
    /// the parent's `rom_of` down to the child.
    pub fn remove_roms_from_child(&mut self) {
        self.bucket_by_opts(BucketKey::Machine, DedupeMode::None, true, true);

        for (name, mix) in self.sorted_machines() {
            let Some(parent_name) = self
                .store
                .get_machine(mix)
                .and_then(|m| m.clone_of.clone())
            else {
                continue;
            };
            let Some(pmix) = self.store.get_machine_by_name(&parent_name) else {
                continue;
            };
            self.remove_items_duplicated_from(&name, &parent_name);

            let parent_rom_of = self
                .store
                .get_machine(pmix)
                .and_then(|p| p.rom_of.clone());
            if let Some(child) = self.store.get_machine_mut(mix) {
                child.rom_of = parent_rom_of;
            }
        }
    }

    fn remove_items_duplicated_from(&mut self, child_name: &str, parent_name: &str) {
        let parent_items: Vec<DatItem> = self
            .items_of_machine(parent_name)
            .into_iter()
            .filter_map(|ix| self.store.get_item(ix).cloned())
            .collect();
        for cix in self.items_of_machine(child_name) {
            let duplicated = self
                .store
                .get_item(cix)
                .is_some_and(|item| parent_items.iter().any(|p| p.same_content(item)));
            if duplicated {
                self.remove_item(cix);
            }
        }
    }

    /// Delete every machine flagged as a BIOS or device set, items and all.
    pub fn remove_bios_and_device_sets(&mut self) {
        self.bucket_by_opts(BucketKey::Machine, DedupeMode::None, true, true);

        for (name, mix) in self.sorted_machines() {
            let flagged = self
                .store
                .get_machine(mix)
                .map(|m| m.is_bios || m.is_device)
                .unwrap_or(false);
            if flagged {
                self.delete_machine_by_name(&name);
            }
        }
    }

    /// Clear clone-of/rom-of/sample-of on every machine.
    pub fn remove_tags_from_child(&mut self) {
        for mix in self.store.machine_indices() {
            if let Some(machine) = self.store.get_machine_mut(mix) {
                machine.clone_of = None;
                machine.rom_of = None;
                machine.sample_of = None;
            }
        }
    }

    // -- 1G1R and normalization passes --

    /// One game per region: within each clone family keep the first machine
    /// whose name carries a parenthesized region tag matching `regions` in
    /// priority order (defaulting to the parent itself), delete the rest,
    /// then strip all clone relations.
    pub fn set_one_game_per_region(&mut self, regions: &[String]) {
        self.bucket_by_opts(BucketKey::Machine, DedupeMode::None, true, true);

        // Clone family: parent name (clone-of, else rom-of, else self) to
        // candidate machine names.
        let mut families: BTreeMap<String, (String, Vec<String>)> = BTreeMap::new();
        for (name, mix) in self.sorted_machines() {
            let Some(machine) = self.store.get_machine(mix) else {
                continue;
            };
            let parent = machine
                .clone_of
                .clone()
                .or_else(|| machine.rom_of.clone())
                .unwrap_or_else(|| name.clone());
            let family = families
                .entry(parent.to_lowercase())
                .or_insert_with(|| (parent.clone(), Vec::new()));
            family.1.push(name);
        }

        let patterns: Vec<Regex> = regions
            .iter()
            .filter_map(|region| {
                Regex::new(&format!(r"(?i)\(.*{}.*\)", regex::escape(region))).ok()
            })
            .collect();

        for (parent_name, candidates) in families.into_values() {
            let mut keep: Option<&String> = None;
            'regions: for pattern in &patterns {
                for candidate in &candidates {
                    if pattern.is_match(candidate) {
                        keep = Some(candidate);
                        break 'regions;
                    }
                }
            }
            let keep_name = keep.cloned().unwrap_or(parent_name);
            for candidate in &candidates {
                if !candidate.eq_ignore_ascii_case(&keep_name) {
                    self.delete_machine_by_name(candidate);
                }
            }
        }

        self.remove_tags_from_child();
    }

    /// One rom per game: move every Rom item into a machine named
    /// `<machine>/<rom name without its final extension>` and reduce each
    /// item's own name to its file-name component.
    pub fn set_one_rom_per_game(&mut self) {
        for ix in self.store.live_indices() {
            let Some(item) = self.store.get_item(ix) else {
                continue;
            };
            let machine_name = self
                .store
                .machine_of(ix)
                .and_then(|mix| self.store.get_machine(mix))
                .map(|m| m.name_or_default().to_string())
                .unwrap_or_default();
            let item_name = item.name.clone().unwrap_or_default();

            let mut new_machine_name = if matches!(item.kind, ItemKind::Rom(_)) {
                let stem = match item_name.rsplit_once('.') {
                    Some((stem, _ext)) => stem,
                    None => item_name.as_str(),
                };
                format!("{machine_name}/{stem}")
            } else {
                machine_name.clone()
            };
            if let Some(stripped) = new_machine_name.strip_prefix("Default") {
                new_machine_name = stripped.to_string();
            }

            if let Some(item) = self.store.get_item_mut(ix) {
                item.name = Some(file_component(&item_name));
            }

            if new_machine_name != machine_name {
                let target = match self.store.get_machine_by_name(&new_machine_name) {
                    Some(mix) => mix,
                    None => {
                        let mut machine = self
                            .store
                            .machine_of(ix)
                            .and_then(|mix| self.store.get_machine(mix))
                            .cloned()
                            .unwrap_or_default();
                        machine.name = Some(new_machine_name.clone());
                        self.store.add_machine(machine)
                    }
                };
                self.store.set_machine_of(ix, target);
            }
        }
        self.invalidate_buckets();
    }

    /// Strip a leading `DD.DD.DD-` scene-release date token from machine
    /// names and descriptions.
    pub fn strip_scene_dates_from_items(&mut self) {
        for mix in self.store.machine_indices() {
            let Some(machine) = self.store.get_machine_mut(mix) else {
                continue;
            };
            if let Some(name) = &machine.name {
                if let Some(caps) = SCENE_DATE.captures(name) {
                    machine.name = Some(caps[2].to_string());
                }
            }
            if let Some(description) = &machine.description {
                if let Some(caps) = SCENE_DATE.captures(description) {
                    machine.description = Some(caps[2].to_string());
                }
            }
        }
        self.invalidate_buckets();
    }

    /// Rewrite every machine name (and clone/rom/sample references) to the
    /// machine's sanitized description.
    pub fn machine_description_to_name(&mut self) {
        let mut renames: HashMap<String, String> = HashMap::new();
        for mix in self.store.machine_indices() {
            let Some(machine) = self.store.get_machine(mix) else {
                continue;
            };
            match (&machine.name, &machine.description) {
                (Some(name), Some(description)) => {
                    renames.insert(name.clone(), sanitize_description(description));
                }
                (Some(name), None) => {
                    warn!("machine {name:?} has no description, keeping its name");
                }
                _ => {}
            }
        }

        for mix in self.store.machine_indices() {
            let Some(machine) = self.store.get_machine_mut(mix) else {
                continue;
            };
            for field in [
                &mut machine.name,
                &mut machine.clone_of,
                &mut machine.rom_of,
                &mut machine.sample_of,
            ] {
                if let Some(value) = field {
                    if let Some(renamed) = renames.get(value) {
                        *field = Some(renamed.clone());
                    }
                }
            }
        }
        self.invalidate_buckets();
    }
}

/// Pull `DeviceRef` names (and slot-option device names) out of an item.
fn collect_device_refs(
    item: &DatItem,
    use_slot_options: bool,
    seen: &mut HashSet<String>,
    out: &mut Vec<String>,
) {
    match &item.kind {
        ItemKind::DeviceRef => {
            if let Some(name) = &item.name {
                if seen.insert(name.clone()) {
                    out.push(name.clone());
                }
            }
        }
        ItemKind::Slot(slot) if use_slot_options => {
            for opt in &slot.options {
                if let Some(dev) = &opt.dev_name {
                    if seen.insert(dev.clone()) {
                        out.push(dev.clone());
                    }
                }
            }
        }
        _ => {}
    }
}

/// Description sanitization used when descriptions become names: path
/// separators fold to underscores, double quotes to two single quotes,
/// colons to ` -`.
fn sanitize_description(description: &str) -> String {
    description
        .replace('/', "_")
        .replace('"', "''")
        .replace(':', " -")
}

/// The file-name component of a possibly path-shaped item name.
fn file_component(name: &str) -> String {
    let sanitized = name.replace('\\', "/");
    match sanitized.rfind('/') {
        Some(pos) => sanitized[pos + 1..].to_string(),
        None => sanitized,
    }
}
