//! Digest utilities
//!
//! - `content_digest` — stable identifier for serialized key material
//! - `password_digest` — fixed-length symmetric-key derivation from a password
//!
//! The content digest is MD5 of the DER bytes, rendered uppercase-hex. It is
//! an identifier, not an integrity check: two runs over the same public key
//! must produce the same ID, and the trailing characters are shown to users.

use md5::Md5;
use sha2::{Digest, Sha256};

/// 32-character uppercase hex digest of DER-serialized key material.
pub fn content_digest(der: &[u8]) -> String {
    hex::encode(Md5::digest(der)).to_uppercase()
}

/// SHA-256 of the password — the 32-byte key for the symmetric wrap layer.
/// Deterministic: the same password always yields the same key.
pub fn password_digest(password: &[u8]) -> [u8; 32] {
    Sha256::digest(password).into()
}
