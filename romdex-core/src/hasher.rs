//! Streaming hasher for verification workflows.
//!
//! Reads a file once and produces the hash envelope (CRC32, MD5, SHA-1,
//! SHA-256) a caller needs to build a probe item for duplicate lookups
//! against an item index.

use std::io::Read;

use sha1::Digest;

use crate::error::CoreError;
use crate::hashes::{HashKind, ItemHashes};

const CHUNK_SIZE: usize = 64 * 1024; // 64 KB

/// Compute CRC32, MD5, SHA-1 and SHA-256 of a stream in 64KB chunks.
///
/// Returns the number of bytes read together with the populated hash set.
pub fn hash_reader<R: Read>(reader: &mut R) -> Result<(u64, ItemHashes), CoreError> {
    let mut crc = crc32fast::Hasher::new();
    let mut md5 = md5::Context::new();
    let mut sha1 = sha1::Sha1::new();
    let mut sha256 = sha2::Sha256::new();

    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut size: u64 = 0;

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        crc.update(&buf[..n]);
        md5.consume(&buf[..n]);
        sha1.update(&buf[..n]);
        sha256.update(&buf[..n]);
        size += n as u64;
    }

    let mut hashes = ItemHashes::default();
    hashes.set(HashKind::Crc, Some(format!("{:08x}", crc.finalize())));
    hashes.set(HashKind::Md5, Some(format!("{:x}", md5.compute())));
    hashes.set(HashKind::Sha1, Some(format!("{:x}", sha1.finalize())));
    hashes.set(HashKind::Sha256, Some(format!("{:x}", sha256.finalize())));

    Ok((size, hashes))
}

/// Hash an in-memory buffer. Convenience wrapper over [`hash_reader`].
pub fn hash_bytes(data: &[u8]) -> (u64, ItemHashes) {
    let mut cursor = std::io::Cursor::new(data);
    // Reading from a cursor cannot fail
    match hash_reader(&mut cursor) {
        Ok(result) => result,
        Err(_) => (0, ItemHashes::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_matches_canonical_digests() {
        let (size, hashes) = hash_bytes(b"");
        assert_eq!(size, 0);
        assert_eq!(
            hashes.get(HashKind::Crc),
            Some(HashKind::Crc.empty_digest())
        );
        assert_eq!(
            hashes.get(HashKind::Md5),
            Some(HashKind::Md5.empty_digest())
        );
        assert_eq!(
            hashes.get(HashKind::Sha1),
            Some(HashKind::Sha1.empty_digest())
        );
        assert_eq!(
            hashes.get(HashKind::Sha256),
            Some(HashKind::Sha256.empty_digest())
        );
    }

    #[test]
    fn test_known_digests() {
        let (size, hashes) = hash_bytes(b"abc");
        assert_eq!(size, 3);
        assert_eq!(hashes.get(HashKind::Crc), Some("352441c2"));
        assert_eq!(
            hashes.get(HashKind::Md5),
            Some("900150983cd24fb0d6963f7d28e17f72")
        );
        assert_eq!(
            hashes.get(HashKind::Sha1),
            Some("a9993e364706816aba3e25717850c26c9cd0d89d")
        );
        assert_eq!(
            hashes.get(HashKind::Sha256),
            Some("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }

    #[test]
    fn test_chunked_reads_match_single_read() {
        let data = vec![0x42u8; 3 * CHUNK_SIZE + 17];
        let (size, hashes) = hash_bytes(&data);
        assert_eq!(size, data.len() as u64);
        assert!(hashes.get(HashKind::Sha1).is_some());
        // An empty envelope stays distinguishable
        assert!(!hashes.matches_empty_file());
    }
}
