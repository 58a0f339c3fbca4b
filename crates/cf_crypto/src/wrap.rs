//! Symmetric wrap layer: protect a small secret under a password-derived key.
//!
//! The wrapped secret is the 256-byte *unlock passphrase* of a key's
//! private-key container, never a bulk payload. The wrap key is the SHA-256
//! digest of the user's login password; the cipher is AES-256 applied block
//! by block (ECB), with no authentication tag.
//!
//! A wrong password therefore does NOT fail here: `unwrap` deterministically
//! yields garbage bytes, and the mistake surfaces only when the private-key
//! container refuses to open with them. That indirect detection is a pinned
//! compatibility behavior — do not add an AEAD without also changing the
//! error-surface tests in `key`.

use aes::cipher::{generic_array::GenericArray, BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes256;
use rand::{CryptoRng, Rng};
use zeroize::{ZeroizeOnDrop, Zeroizing};

use crate::{digest, error::CryptoError};

/// Length of the generated unlock passphrase, in bytes. A multiple of the
/// AES block size, so the wrap needs no padding.
pub const PASSPHRASE_LEN: usize = 256;

const BLOCK_SIZE: usize = 16;

/// Letters + digits + ASCII punctuation (94 symbols).
const PASSPHRASE_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789\
      !\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

/// 32-byte wrap key derived from the user password. Zeroized on drop.
#[derive(ZeroizeOnDrop)]
pub struct WrapKey([u8; 32]);

impl WrapKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Derive the symmetric wrap key from a password. Deterministic.
pub fn derive_wrap_key(password: &[u8]) -> WrapKey {
    WrapKey(digest::password_digest(password))
}

/// High-entropy unlock passphrase. Zeroized on drop; never persisted raw.
#[derive(Clone, ZeroizeOnDrop)]
pub struct Passphrase(Vec<u8>);

impl Passphrase {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Generate a fresh unlock passphrase from a caller-supplied CSPRNG.
///
/// The randomness source is an explicit dependency so tests can substitute
/// a seeded generator.
pub fn generate_passphrase<R: Rng + CryptoRng>(rng: &mut R) -> Passphrase {
    let bytes = (0..PASSPHRASE_LEN)
        .map(|_| PASSPHRASE_CHARSET[rng.gen_range(0..PASSPHRASE_CHARSET.len())])
        .collect();
    Passphrase(bytes)
}

/// Wrap `secret` under the key derived from `password`.
/// `secret` must be a multiple of the 16-byte AES block size.
pub fn wrap(secret: &[u8], password: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let key = derive_wrap_key(password);
    let cipher = Aes256::new(GenericArray::from_slice(key.as_bytes()));

    let mut out = check_block_aligned(secret)?;
    for block in out.chunks_exact_mut(BLOCK_SIZE) {
        cipher.encrypt_block(GenericArray::from_mut_slice(block));
    }
    Ok(out)
}

/// Unwrap `ciphertext` with the key derived from `password`.
///
/// Never fails for a wrong password — the result is then garbage that
/// downstream key parsing rejects.
pub fn unwrap(ciphertext: &[u8], password: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let key = derive_wrap_key(password);
    let cipher = Aes256::new(GenericArray::from_slice(key.as_bytes()));

    let mut out = Zeroizing::new(check_block_aligned(ciphertext)?);
    for block in out.chunks_exact_mut(BLOCK_SIZE) {
        cipher.decrypt_block(GenericArray::from_mut_slice(block));
    }
    Ok(out)
}

fn check_block_aligned(data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if data.is_empty() || data.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::InvalidKey(format!(
            "wrap input must be a non-empty multiple of {BLOCK_SIZE} bytes, got {}",
            data.len()
        )));
    }
    Ok(data.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::OsRng, SeedableRng};

    #[test]
    fn wrap_round_trip() {
        let secret = generate_passphrase(&mut OsRng);
        let ct = wrap(secret.as_bytes(), b"login-password").unwrap();
        assert_ne!(&ct[..], secret.as_bytes());

        let back = unwrap(&ct, b"login-password").unwrap();
        assert_eq!(&back[..], secret.as_bytes());
    }

    #[test]
    fn wrong_password_yields_garbage_not_error() {
        let secret = generate_passphrase(&mut OsRng);
        let ct = wrap(secret.as_bytes(), b"right").unwrap();

        let garbage = unwrap(&ct, b"wrong").unwrap();
        assert_ne!(&garbage[..], secret.as_bytes());

        // Deterministic garbage: same wrong password, same bytes.
        let again = unwrap(&ct, b"wrong").unwrap();
        assert_eq!(&garbage[..], &again[..]);
    }

    #[test]
    fn rejects_unaligned_input() {
        assert!(wrap(b"short", b"pw").is_err());
        assert!(unwrap(b"0123456789", b"pw").is_err());
        assert!(wrap(b"", b"pw").is_err());
    }

    #[test]
    fn passphrase_has_documented_length_and_charset() {
        let p = generate_passphrase(&mut OsRng);
        assert_eq!(p.as_bytes().len(), PASSPHRASE_LEN);
        assert!(p
            .as_bytes()
            .iter()
            .all(|b| PASSPHRASE_CHARSET.contains(b)));
    }

    #[test]
    fn passphrase_generation_is_driven_by_the_rng() {
        let mut a = rand::rngs::StdRng::seed_from_u64(7);
        let mut b = rand::rngs::StdRng::seed_from_u64(7);
        assert_eq!(
            generate_passphrase(&mut a).as_bytes(),
            generate_passphrase(&mut b).as_bytes()
        );

        let mut c = rand::rngs::StdRng::seed_from_u64(8);
        assert_ne!(
            generate_passphrase(&mut a).as_bytes(),
            generate_passphrase(&mut c).as_bytes()
        );
    }
}
