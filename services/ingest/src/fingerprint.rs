use sha2::{Digest, Sha256};

/// Content hash used for change detection: SHA-256 over the canonical
/// JSON encoding, hex-encoded. serde_json keeps object keys sorted, so
/// logically identical payloads always hash the same.
pub fn fingerprint(payload: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.to_string().as_bytes());
    hex::encode(hasher.finalize())
}
