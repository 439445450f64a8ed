// hasher.rs — SHA-256 chain links.
//
// Each log line is hashed as written; the next entry stores that hash as
// `previousHash`. Hashes are lowercase hex.

use sha2::{Digest, Sha256};

/// Hash a log line, returning a lowercase hex-encoded SHA-256 string.
pub fn hash_line(line: &str) -> String {
    let digest = Sha256::digest(line.as_bytes());
    format!("{:x}", digest)
}
