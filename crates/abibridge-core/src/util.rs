use sha2::{Digest, Sha256};

/// Lowercase hex sha256, used to stamp generated bindings with their source ABI.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{b:02x}"));
    }
    out
}
