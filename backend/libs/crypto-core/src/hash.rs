/// Content digests
use sha2::{Digest, Sha256};

/// Lower-case hex SHA-256 of `input`
pub fn sha256_hex(input: &[u8]) -> String {
    hex::encode(Sha256::digest(input))
}

/// Strong HTTP entity tag for a body: the quoted SHA-256 hex digest
pub fn content_etag(body: &[u8]) -> String {
    format!("\"{}\"", sha256_hex(body))
}
