//! Document digests.

mod digest;

pub use digest::{digests_match, sha256_hex, DIGEST_HEX_LEN, SHA256_ALGORITHM};
