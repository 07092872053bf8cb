//! SHA-256 hashing for document payloads.
//!
//! The CPM wire contract pins the digest algorithm name to `"SHA256"` and
//! transports digests as lower-case hex strings. Comparison of claimed
//! against fetched digests is constant-time.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Algorithm name carried in `cpm:hashAlg` and token `hashFunction` fields.
pub const SHA256_ALGORITHM: &str = "SHA256";

/// Length of a hex-encoded SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Hex-encoded SHA-256 digest of `content`.
#[must_use]
pub fn sha256_hex(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Constant-time comparison of two hex digest strings.
///
/// Length is not secret; unequal lengths return `false` immediately.
#[must_use]
pub fn digests_match(claimed: &str, actual: &str) -> bool {
    if claimed.len() != actual.len() {
        return false;
    }
    claimed.as_bytes().ct_eq(actual.as_bytes()).into()
}
