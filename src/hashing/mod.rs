//! Centralized module for cryptographic hashing algorithms.

use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::core::static_report::FileHashes;

/// Computes the MD5 digest of the given data and returns it as a hex string.
pub fn md5_digest(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

/// Computes the SHA-1 digest of the given data and returns it as a hex string.
pub fn sha1_digest(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Computes the SHA-256 digest of the given data and returns it as a hex string.
pub fn sha256_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Computes the full md5/sha1/sha256 triple over one byte view.
pub fn compute_hashes(data: &[u8]) -> FileHashes {
    FileHashes {
        md5: md5_digest(data),
        sha1: sha1_digest(data),
        sha256: sha256_digest(data),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_DATA: &[u8] = b"abc";

    #[test]
    fn test_md5_digest() {
        assert_eq!(md5_digest(TEST_DATA), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_sha1_digest() {
        assert_eq!(sha1_digest(TEST_DATA), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn test_sha256_digest() {
        assert_eq!(
            sha256_digest(TEST_DATA),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_empty_input() {
        let h = compute_hashes(b"");
        assert_eq!(h.md5, "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(h.sha1, "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(
            h.sha256,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_deterministic() {
        let data: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        assert_eq!(compute_hashes(&data), compute_hashes(&data));
    }
}
