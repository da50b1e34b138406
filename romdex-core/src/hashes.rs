use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Hash algorithms that DAT entries may carry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum HashKind {
    /// CRC-32 (the historical baseline, present in almost every DAT)
    Crc,
    /// MD2 (128-bit, rare legacy DATs)
    Md2,
    /// MD4 (128-bit, rare legacy DATs)
    Md4,
    /// MD5 (128-bit)
    Md5,
    /// RIPEMD-128
    Ripemd128,
    /// RIPEMD-160
    Ripemd160,
    /// SHA-1 (160-bit)
    Sha1,
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
    /// ssdeep fuzzy hash
    SpamSum,
}

impl HashKind {
    /// All hash kinds, weakest to strongest collision resistance
    /// (SpamSum last since it is fuzzy, not cryptographic).
    pub const ALL: [HashKind; 11] = [
        Self::Crc,
        Self::Md2,
        Self::Md4,
        Self::Md5,
        Self::Ripemd128,
        Self::Ripemd160,
        Self::Sha1,
        Self::Sha256,
        Self::Sha384,
        Self::Sha512,
        Self::SpamSum,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Crc => "CRC-32",
            Self::Md2 => "MD2",
            Self::Md4 => "MD4",
            Self::Md5 => "MD5",
            Self::Ripemd128 => "RIPEMD-128",
            Self::Ripemd160 => "RIPEMD-160",
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
            Self::SpamSum => "SpamSum",
        }
    }

    /// The digest of zero-length input for this algorithm.
    ///
    /// Hash-less items are bucketed under these values, which deliberately
    /// groups them together with genuine empty files.
    pub fn empty_digest(&self) -> &'static str {
        match self {
            Self::Crc => "00000000",
            Self::Md2 => "8350e5a3e24c153df2275c9f80692773",
            Self::Md4 => "31d6cfe0d16ae931b73c59d7e0c089c0",
            Self::Md5 => "d41d8cd98f00b204e9800998ecf8427e",
            Self::Ripemd128 => "cdf26213a150dc3ecb610f18f6b38b46",
            Self::Ripemd160 => "9c1185a5c5e9fc54612808977ee8f548b2258d31",
            Self::Sha1 => "da39a3ee5e6b4b0d3255bfef95601890afd80709",
            Self::Sha256 => "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
            Self::Sha384 => {
                "38b060a751ac96384cd9327eb1b1e36a21fdb71114be07434c0cc7bf63f6e1da274edebfe76f65fbd51ad2f14898b95b"
            }
            Self::Sha512 => {
                "cf83e1357eefb8bdf1542850d66d8007d620e4050b5715dc83f4a921d36ce9ce47d0d13c5d85f2b0ff8318d2877eec2f63b931bd47417a81a538327af927da3e"
            }
            Self::SpamSum => "3::",
        }
    }

    /// Expected hex digest length, or `None` for SpamSum (variable length).
    pub fn hex_len(&self) -> Option<usize> {
        match self {
            Self::Crc => Some(8),
            Self::Md2 | Self::Md4 | Self::Md5 | Self::Ripemd128 => Some(32),
            Self::Ripemd160 | Self::Sha1 => Some(40),
            Self::Sha256 => Some(64),
            Self::Sha384 => Some(96),
            Self::Sha512 => Some(128),
            Self::SpamSum => None,
        }
    }
}

impl std::fmt::Display for HashKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The set of content hashes attached to a hash-bearing item.
///
/// All digests are stored as lowercase hex (SpamSum as the raw ssdeep
/// string). Absent fields mean the originating DAT did not declare them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemHashes {
    pub crc: Option<String>,
    pub md2: Option<String>,
    pub md4: Option<String>,
    pub md5: Option<String>,
    pub ripemd128: Option<String>,
    pub ripemd160: Option<String>,
    pub sha1: Option<String>,
    pub sha256: Option<String>,
    pub sha384: Option<String>,
    pub sha512: Option<String>,
    pub spamsum: Option<String>,
}

impl ItemHashes {
    pub fn get(&self, kind: HashKind) -> Option<&str> {
        let field = match kind {
            HashKind::Crc => &self.crc,
            HashKind::Md2 => &self.md2,
            HashKind::Md4 => &self.md4,
            HashKind::Md5 => &self.md5,
            HashKind::Ripemd128 => &self.ripemd128,
            HashKind::Ripemd160 => &self.ripemd160,
            HashKind::Sha1 => &self.sha1,
            HashKind::Sha256 => &self.sha256,
            HashKind::Sha384 => &self.sha384,
            HashKind::Sha512 => &self.sha512,
            HashKind::SpamSum => &self.spamsum,
        };
        field.as_deref()
    }

    pub fn set(&mut self, kind: HashKind, value: Option<String>) {
        let field = match kind {
            HashKind::Crc => &mut self.crc,
            HashKind::Md2 => &mut self.md2,
            HashKind::Md4 => &mut self.md4,
            HashKind::Md5 => &mut self.md5,
            HashKind::Ripemd128 => &mut self.ripemd128,
            HashKind::Ripemd160 => &mut self.ripemd160,
            HashKind::Sha1 => &mut self.sha1,
            HashKind::Sha256 => &mut self.sha256,
            HashKind::Sha384 => &mut self.sha384,
            HashKind::Sha512 => &mut self.sha512,
            HashKind::SpamSum => &mut self.spamsum,
        };
        *field = value;
    }

    /// Normalize and store a raw digest string from a DAT field.
    ///
    /// Lowercases hex digests and validates their length and character set.
    /// SpamSum values are stored verbatim.
    pub fn set_checked(&mut self, kind: HashKind, raw: &str) -> Result<(), CoreError> {
        let raw = raw.trim();
        if raw.is_empty() {
            self.set(kind, None);
            return Ok(());
        }
        if let Some(expected) = kind.hex_len() {
            if raw.len() != expected || !raw.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(CoreError::invalid_digest(format!(
                    "{} digest {raw:?} is not {expected} hex characters",
                    kind.name()
                )));
            }
            self.set(kind, Some(raw.to_lowercase()));
        } else {
            self.set(kind, Some(raw.to_string()));
        }
        Ok(())
    }

    /// Returns true if no hash field is populated.
    pub fn is_empty(&self) -> bool {
        HashKind::ALL.iter().all(|&k| self.get(k).is_none())
    }

    /// Returns true if every populated field equals the empty-input digest
    /// for its algorithm, and at least one field is populated.
    pub fn matches_empty_file(&self) -> bool {
        let mut any = false;
        for &kind in &HashKind::ALL {
            match self.get(kind) {
                Some(v) if v == kind.empty_digest() => any = true,
                Some(_) => return false,
                None => {}
            }
        }
        any
    }

    /// Rewrite to the canonical zero-byte file: CRC/MD5/SHA1 set to their
    /// empty-input digests, everything else cleared.
    pub fn normalize_to_empty_file(&mut self) {
        *self = Self::default();
        self.crc = Some(HashKind::Crc.empty_digest().to_string());
        self.md5 = Some(HashKind::Md5.empty_digest().to_string());
        self.sha1 = Some(HashKind::Sha1.empty_digest().to_string());
    }

    /// Copy every hash the other set has that this one is missing.
    /// Populated fields are never overwritten.
    pub fn fill_missing_from(&mut self, other: &ItemHashes) {
        for &kind in &HashKind::ALL {
            if self.get(kind).is_none() {
                self.set(kind, other.get(kind).map(str::to_string));
            }
        }
    }

    /// Hash-subset compatibility: every algorithm populated on both sides
    /// agrees, and at least one algorithm is populated on both sides.
    pub fn compatible_with(&self, other: &ItemHashes) -> bool {
        let mut common = false;
        for &kind in &HashKind::ALL {
            match (self.get(kind), other.get(kind)) {
                (Some(a), Some(b)) if a == b => common = true,
                (Some(_), Some(_)) => return false,
                _ => {}
            }
        }
        common
    }
}
