use serde::{Deserialize, Serialize};

use crate::hashes::ItemHashes;

/// Dump verification status for ROM and disk entries.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum DumpStatus {
    /// A normal, presumed-good dump.
    #[default]
    Good,
    /// Known-bad dump.
    BadDump,
    /// Content is known to be missing or unverifiable. Nodump entries are
    /// exempt from hash-based merging and from hash-presence statistics.
    Nodump,
    /// Verified against multiple sources.
    Verified,
}

/// How an item was classified during deduplication.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DupeType {
    /// Not (yet) identified as a duplicate.
    #[default]
    None,
    /// Duplicate of an item from the same provenance source.
    Internal,
    /// Duplicate of an item from a different provenance source.
    External,
}

/// Fieldless mirror of [`ItemKind`].
///
/// Variant order is canonical: the dedup sort comparator orders items of the
/// same machine by this enum's derived `Ord`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ItemType {
    Adjuster,
    BiosSet,
    Blank,
    Chip,
    Configuration,
    Device,
    DeviceRef,
    DipSwitch,
    Disk,
    Display,
    Driver,
    Feature,
    File,
    Info,
    Input,
    Media,
    Part,
    PartFeature,
    Port,
    RamOption,
    Release,
    Rom,
    Sample,
    SharedFeat,
    Slot,
    SoftwareList,
    Sound,
}

// ---------------------------------------------------------------------------
// Kind payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rom {
    pub size: Option<u64>,
    pub status: DumpStatus,
    pub hashes: ItemHashes,
    /// Load offset within the machine's address space, if declared.
    pub offset: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disk {
    pub status: DumpStatus,
    pub hashes: ItemHashes,
    pub region: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub hashes: ItemHashes,
}

/// A generic (non-ROM) file entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileItem {
    pub size: Option<u64>,
    pub hashes: ItemHashes,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjuster {
    pub default: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiosSet {
    pub description: Option<String>,
    pub default: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chip {
    pub tag: Option<String>,
    pub chip_type: Option<String>,
    pub clock: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    pub tag: Option<String>,
    pub mask: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub device_type: Option<String>,
    pub tag: Option<String>,
    pub interface: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DipSwitch {
    pub tag: Option<String>,
    pub mask: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Display {
    pub tag: Option<String>,
    pub display_type: Option<String>,
    pub width: Option<u64>,
    pub height: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Driver {
    pub status: Option<String>,
    pub emulation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub feature_type: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Info {
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    pub players: Option<u64>,
    pub coins: Option<u64>,
    pub service: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub interface: Option<String>,
    pub features: Vec<PartFeature>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartFeature {
    pub name: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RamOption {
    pub default: Option<bool>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub region: Option<String>,
    pub language: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedFeat {
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub options: Vec<SlotOption>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotOption {
    pub name: Option<String>,
    /// Name of the device machine this option plugs in.
    pub dev_name: Option<String>,
    pub default: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftwareList {
    pub status: Option<String>,
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sound {
    pub channels: Option<u64>,
}

/// The kind-specific payload of a [`DatItem`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    Adjuster(Adjuster),
    BiosSet(BiosSet),
    Blank,
    Chip(Chip),
    Configuration(Configuration),
    Device(Device),
    DeviceRef,
    DipSwitch(DipSwitch),
    Disk(Disk),
    Display(Display),
    Driver(Driver),
    Feature(Feature),
    File(FileItem),
    Info(Info),
    Input(Input),
    Media(Media),
    Part(Part),
    PartFeature(PartFeature),
    Port(Port),
    RamOption(RamOption),
    Release(Release),
    Rom(Rom),
    Sample,
    SharedFeat(SharedFeat),
    Slot(Slot),
    SoftwareList(SoftwareList),
    Sound(Sound),
}

/// One item owned by a machine: a ROM, disk, or any of the auxiliary
/// metadata entries a DAT can declare.
///
/// The envelope fields (`name`, `remove`, `dupe_type`, `merge`) are shared by
/// every kind; everything else lives in the [`ItemKind`] payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatItem {
    pub name: Option<String>,
    /// Soft-delete marker. Marked items survive until an explicit
    /// compaction pass and are excluded from filtered views.
    pub remove: bool,
    pub dupe_type: DupeType,
    /// Merge tag: the name of the parent item this entry merges into.
    pub merge: Option<String>,
    pub kind: ItemKind,
}

impl DatItem {
    pub fn new(name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            name: Some(name.into()),
            remove: false,
            dupe_type: DupeType::None,
            merge: None,
            kind,
        }
    }

    /// An unnamed item of the given kind.
    pub fn unnamed(kind: ItemKind) -> Self {
        Self {
            name: None,
            remove: false,
            dupe_type: DupeType::None,
            merge: None,
            kind,
        }
    }

    pub fn rom(name: impl Into<String>, rom: Rom) -> Self {
        Self::new(name, ItemKind::Rom(rom))
    }

    pub fn disk(name: impl Into<String>, disk: Disk) -> Self {
        Self::new(name, ItemKind::Disk(disk))
    }

    pub fn item_type(&self) -> ItemType {
        match &self.kind {
            ItemKind::Adjuster(_) => ItemType::Adjuster,
            ItemKind::BiosSet(_) => ItemType::BiosSet,
            ItemKind::Blank => ItemType::Blank,
            ItemKind::Chip(_) => ItemType::Chip,
            ItemKind::Configuration(_) => ItemType::Configuration,
            ItemKind::Device(_) => ItemType::Device,
            ItemKind::DeviceRef => ItemType::DeviceRef,
            ItemKind::DipSwitch(_) => ItemType::DipSwitch,
            ItemKind::Disk(_) => ItemType::Disk,
            ItemKind::Display(_) => ItemType::Display,
            ItemKind::Driver(_) => ItemType::Driver,
            ItemKind::Feature(_) => ItemType::Feature,
            ItemKind::File(_) => ItemType::File,
            ItemKind::Info(_) => ItemType::Info,
            ItemKind::Input(_) => ItemType::Input,
            ItemKind::Media(_) => ItemType::Media,
            ItemKind::Part(_) => ItemType::Part,
            ItemKind::PartFeature(_) => ItemType::PartFeature,
            ItemKind::Port(_) => ItemType::Port,
            ItemKind::RamOption(_) => ItemType::RamOption,
            ItemKind::Release(_) => ItemType::Release,
            ItemKind::Rom(_) => ItemType::Rom,
            ItemKind::Sample => ItemType::Sample,
            ItemKind::SharedFeat(_) => ItemType::SharedFeat,
            ItemKind::Slot(_) => ItemType::Slot,
            ItemKind::SoftwareList(_) => ItemType::SoftwareList,
            ItemKind::Sound(_) => ItemType::Sound,
        }
    }

    /// Returns true for the kinds that carry content hashes
    /// (Disk, File, Media, Rom) and therefore participate in dedup.
    pub fn is_hash_bearing(&self) -> bool {
        matches!(
            self.kind,
            ItemKind::Disk(_) | ItemKind::File(_) | ItemKind::Media(_) | ItemKind::Rom(_)
        )
    }

    pub fn hashes(&self) -> Option<&ItemHashes> {
        match &self.kind {
            ItemKind::Disk(d) => Some(&d.hashes),
            ItemKind::File(f) => Some(&f.hashes),
            ItemKind::Media(m) => Some(&m.hashes),
            ItemKind::Rom(r) => Some(&r.hashes),
            _ => None,
        }
    }

    pub fn hashes_mut(&mut self) -> Option<&mut ItemHashes> {
        match &mut self.kind {
            ItemKind::Disk(d) => Some(&mut d.hashes),
            ItemKind::File(f) => Some(&mut f.hashes),
            ItemKind::Media(m) => Some(&mut m.hashes),
            ItemKind::Rom(r) => Some(&mut r.hashes),
            _ => None,
        }
    }

    /// Declared size, for the kinds that have one (Rom, File).
    pub fn size(&self) -> Option<u64> {
        match &self.kind {
            ItemKind::Rom(r) => r.size,
            ItemKind::File(f) => f.size,
            _ => None,
        }
    }

    pub fn set_size(&mut self, size: Option<u64>) {
        match &mut self.kind {
            ItemKind::Rom(r) => r.size = size,
            ItemKind::File(f) => f.size = size,
            _ => {}
        }
    }

    /// Dump status, for the kinds that have one (Rom, Disk).
    pub fn status(&self) -> Option<DumpStatus> {
        match &self.kind {
            ItemKind::Rom(r) => Some(r.status),
            ItemKind::Disk(d) => Some(d.status),
            _ => None,
        }
    }

    pub fn set_status(&mut self, status: DumpStatus) {
        match &mut self.kind {
            ItemKind::Rom(r) => r.status = status,
            ItemKind::Disk(d) => d.status = status,
            _ => {}
        }
    }

    /// Content equality, ignoring the bookkeeping flags
    /// (`remove`, `dupe_type`).
    pub fn same_content(&self, other: &DatItem) -> bool {
        self.name == other.name && self.merge == other.merge && self.kind == other.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_type_order_is_canonical() {
        assert!(ItemType::Adjuster < ItemType::BiosSet);
        assert!(ItemType::Disk < ItemType::Rom);
        assert!(ItemType::Rom < ItemType::Sample);
        assert!(ItemType::SoftwareList < ItemType::Sound);
    }

    #[test]
    fn test_hash_bearing_kinds() {
        let rom = DatItem::rom("a.bin", Rom::default());
        let chip = DatItem::new("cpu", ItemKind::Chip(Chip::default()));
        assert!(rom.is_hash_bearing());
        assert!(rom.hashes().is_some());
        assert!(!chip.is_hash_bearing());
        assert!(chip.hashes().is_none());
    }

    #[test]
    fn test_size_and_status_accessors() {
        let mut rom = DatItem::rom(
            "a.bin",
            Rom {
                size: Some(16),
                ..Default::default()
            },
        );
        assert_eq!(rom.size(), Some(16));
        assert_eq!(rom.status(), Some(DumpStatus::Good));
        rom.set_status(DumpStatus::Nodump);
        assert_eq!(rom.status(), Some(DumpStatus::Nodump));

        let blank = DatItem::unnamed(ItemKind::Blank);
        assert_eq!(blank.size(), None);
        assert_eq!(blank.status(), None);
    }

    #[test]
    fn test_same_content_ignores_flags() {
        let a = DatItem::rom("a.bin", Rom::default());
        let mut b = a.clone();
        b.remove = true;
        b.dupe_type = DupeType::External;
        assert!(a.same_content(&b));

        let c = DatItem::rom("c.bin", Rom::default());
        assert!(!a.same_content(&c));
    }
}
