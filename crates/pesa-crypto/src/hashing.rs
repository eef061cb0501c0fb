/// BLAKE3 digest (32 bytes).
pub type Digest = [u8; 32];

/// Digest arbitrary data with BLAKE3.
///
/// Used to store session tokens one-way: only the digest of a token's
/// plaintext ever reaches the store.
pub fn digest(data: &[u8]) -> Digest {
    *blake3::hash(data).as_bytes()
}
