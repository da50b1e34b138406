//! Bucket-key derivation.
//!
//! Pure functions mapping an item to the string key it buckets under for a
//! chosen key kind: one of its content hashes, or its owning machine's name
//! with an optional provenance prefix.

use serde::{Deserialize, Serialize};

use romdex_core::{DEFAULT_MACHINE_NAME, DatItem, HashKind};

use crate::store::ItemStore;

/// The key kinds an item index can be bucketed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BucketKey {
    /// Owning machine name (optionally prefixed by the source index).
    Machine,
    Crc,
    Md5,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
    SpamSum,
}

impl BucketKey {
    /// The hash algorithm behind this key kind, if it is hash-based.
    pub fn hash_kind(self) -> Option<HashKind> {
        match self {
            Self::Machine => None,
            Self::Crc => Some(HashKind::Crc),
            Self::Md5 => Some(HashKind::Md5),
            Self::Sha1 => Some(HashKind::Sha1),
            Self::Sha256 => Some(HashKind::Sha256),
            Self::Sha384 => Some(HashKind::Sha384),
            Self::Sha512 => Some(HashKind::Sha512),
            Self::SpamSum => Some(HashKind::SpamSum),
        }
    }
}

/// Derive the bucket key for a stored item. Returns `None` for indices that
/// no longer hold a live item.
pub(crate) fn bucket_key(
    store: &ItemStore,
    item_ix: usize,
    key: BucketKey,
    lowercase: bool,
    norename: bool,
) -> Option<String> {
    let item = store.get_item(item_ix)?;

    let raw = match key.hash_kind() {
        Some(kind) => hash_key(item, kind),
        None => {
            let mut k = String::new();
            if !norename {
                let input = store.input_of(item_ix).unwrap_or(0);
                k.push_str(&format!("{input:010}-"));
            }
            let name = store
                .machine_of(item_ix)
                .and_then(|mix| store.get_machine(mix))
                .map(|m| m.name_or_default().to_string())
                .unwrap_or_else(|| DEFAULT_MACHINE_NAME.to_string());
            k.push_str(&name);
            k
        }
    };

    Some(if lowercase { raw.to_lowercase() } else { raw })
}

/// Derive the key a free-standing probe item (not in any store) would bucket
/// under. Machine-keyed probes use the item's own name.
pub(crate) fn probe_key(item: &DatItem, key: BucketKey, lowercase: bool) -> String {
    let raw = match key.hash_kind() {
        Some(kind) => hash_key(item, kind),
        None => item
            .name
            .clone()
            .unwrap_or_else(|| DEFAULT_MACHINE_NAME.to_string()),
    };
    if lowercase { raw.to_lowercase() } else { raw }
}

/// The hash-derived key: the item's digest for that algorithm, or the
/// canonical zero-length digest when the hash is absent or the kind does not
/// apply. Hash-less and inapplicable items deliberately share a bucket with
/// genuine empty files.
fn hash_key(item: &DatItem, kind: HashKind) -> String {
    item.hashes()
        .and_then(|h| h.get(kind))
        .unwrap_or(kind.empty_digest())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use romdex_core::item::{ItemKind, Rom, Sound};
    use romdex_core::{ItemHashes, Machine, Source};

    fn store_with_one_rom(machine_name: Option<&str>) -> (ItemStore, usize) {
        let mut store = ItemStore::new();
        let mut machine = Machine::default();
        machine.name = machine_name.map(String::from);
        let mix = store.add_machine(machine);
        let six = store.add_source(Source::new(0));
        let rom = DatItem::rom(
            "game.bin",
            Rom {
                size: Some(4),
                hashes: ItemHashes {
                    crc: Some("cafebabe".into()),
                    sha1: Some("AA00".repeat(10).to_lowercase()),
                    ..Default::default()
                },
                ..Default::default()
            },
        );
        let ix = store.add_item(rom, mix, Some(six));
        (store, ix)
    }

    #[test]
    fn test_machine_key_with_source_prefix() {
        let (store, ix) = store_with_one_rom(Some("Pacman"));
        let key = bucket_key(&store, ix, BucketKey::Machine, false, false).unwrap();
        assert_eq!(key, "0000000000-Pacman");

        let norename = bucket_key(&store, ix, BucketKey::Machine, false, true).unwrap();
        assert_eq!(norename, "Pacman");
    }

    #[test]
    fn test_machine_key_lowercases_and_defaults() {
        let (store, ix) = store_with_one_rom(Some("PacMan"));
        let key = bucket_key(&store, ix, BucketKey::Machine, true, true).unwrap();
        assert_eq!(key, "pacman");

        let (store, ix) = store_with_one_rom(None);
        let key = bucket_key(&store, ix, BucketKey::Machine, true, true).unwrap();
        assert_eq!(key, "default");
    }

    #[test]
    fn test_machine_key_prefix_uses_input_ordinal() {
        let mut store = ItemStore::new();
        let mix = store.add_machine(Machine::named("Pacman"));
        // Registered first, but carries a later input ordinal
        let six = store.add_source(Source::new(7));
        let ix = store.add_item(
            DatItem::rom("game.bin", Rom::default()),
            mix,
            Some(six),
        );
        let key = bucket_key(&store, ix, BucketKey::Machine, false, false).unwrap();
        assert_eq!(key, "0000000007-Pacman");
    }

    #[test]
    fn test_hash_key_present() {
        let (store, ix) = store_with_one_rom(Some("Pacman"));
        let key = bucket_key(&store, ix, BucketKey::Crc, true, true).unwrap();
        assert_eq!(key, "cafebabe");
    }

    #[test]
    fn test_hash_key_missing_falls_back_to_empty_digest() {
        let (store, ix) = store_with_one_rom(Some("Pacman"));
        // No MD5 on the item: buckets with the canonical empty digest
        let key = bucket_key(&store, ix, BucketKey::Md5, true, true).unwrap();
        assert_eq!(key, HashKind::Md5.empty_digest());
    }

    #[test]
    fn test_hashless_kind_buckets_with_empty_files() {
        let mut store = ItemStore::new();
        let mix = store.add_machine(Machine::named("pacman"));
        let ix = store.add_item(
            DatItem::new("mono", ItemKind::Sound(Sound::default())),
            mix,
            None,
        );
        let key = bucket_key(&store, ix, BucketKey::Sha1, true, true).unwrap();
        assert_eq!(key, HashKind::Sha1.empty_digest());
    }

    #[test]
    fn test_removed_item_has_no_key() {
        let (mut store, ix) = store_with_one_rom(Some("Pacman"));
        store.remove_item(ix);
        assert!(bucket_key(&store, ix, BucketKey::Crc, true, true).is_none());
    }
}
