//! Content hashing for published package versions

use sha2::{Digest, Sha256};

/// Calculate SHA256 hash of data.
///
/// Returns the digest as a lowercase hexadecimal string. Every write to the
/// registry reports this value for the exact content that was stored.
///
/// # Examples
///
/// ```
/// # use stamper_registry::hash_utils::sha256_hash;
/// let hash = sha256_hash(b"hello");
/// assert_eq!(hash.len(), 64);
/// assert!(hash.starts_with("2cf24dba5fb0a30e"));
/// ```
pub fn sha256_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
