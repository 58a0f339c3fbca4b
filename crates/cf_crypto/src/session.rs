//! Ephemeral session handshake: two one-time asymmetric channels.
//!
//! `create` generates two independent short-lived key pairs. The server keeps
//! `server_private_key` (so the client can send to it) and publishes
//! `client_public_key` (so it can send to the client). The counterpart
//! `client_private_key` exists only in the returned value; the caller hands it
//! to the client out-of-band exactly once, and the store strips it before the
//! record is persisted.
//!
//! Validity is a passive 24-hour window. `encrypt_for_client` and
//! `decrypt_from_client` do NOT gate on it — the collaborator layer consults
//! `is_valid` before invoking either channel (pass-through by design).

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rsa::pkcs8::{
    DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding,
};
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::{digest, CryptoError};

/// Modulus size for ephemeral session keys — short-lived by contract, so
/// smaller and cheaper than user keys.
pub const SESSION_KEY_BITS: usize = 1024;

/// Hex characters taken from each key digest when composing the session id.
const ID_PREFIX_LEN: usize = 10;

pub struct SessionKey {
    /// Server digest prefix ++ client digest prefix, 20 characters.
    pub session_id: String,
    pub owner_id: String,
    /// SPKI PEM — the server encrypts for the client under this.
    pub client_public_key: String,
    /// PKCS#8 PEM, stored without password protection — accepted exposure,
    /// the key lives for 24 hours.
    pub server_private_key: String,
    pub created_at: DateTime<Utc>,
    /// Present only between `create` and the first save. Zeroized on drop.
    client_private_key: Option<Zeroizing<String>>,
}

impl SessionKey {
    /// Generate both channel key pairs for `owner_id`.
    ///
    /// The returned value still carries the client private key; transmit it
    /// to the client before saving, it is unrecoverable afterwards.
    pub fn create(owner_id: &str) -> Result<Self, CryptoError> {
        let client = RsaPrivateKey::new(&mut OsRng, SESSION_KEY_BITS)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        let server = RsaPrivateKey::new(&mut OsRng, SESSION_KEY_BITS)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;

        let client_public_key = client
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        let server_private_key = server
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?
            .to_string();
        let client_private_key = client
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;

        let mut session = Self {
            session_id: String::new(),
            owner_id: owner_id.to_string(),
            client_public_key,
            server_private_key,
            created_at: Utc::now(),
            client_private_key: Some(client_private_key),
        };
        session.session_id = format!(
            "{}{}",
            &session.server_key_id()?[..ID_PREFIX_LEN],
            &session.client_key_id()?[..ID_PREFIX_LEN],
        );
        Ok(session)
    }

    /// Rebuild a session from persisted fields — the client private key is
    /// gone by definition.
    pub fn from_parts(
        session_id: String,
        owner_id: String,
        client_public_key: String,
        server_private_key: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id,
            owner_id,
            client_public_key,
            server_private_key,
            created_at,
            client_private_key: None,
        }
    }

    /// Encrypt a payload only the holder of the client private key can read.
    pub fn encrypt_for_client(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let public = RsaPublicKey::from_public_key_pem(&self.client_public_key)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        oaep_encrypt(&public, plaintext)
    }

    /// Decrypt a payload the client encrypted under the server's public key.
    pub fn decrypt_from_client(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let private = RsaPrivateKey::from_pkcs8_pem(&self.server_private_key)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let plaintext = private
            .decrypt(Oaep::new::<Sha256>(), ciphertext)
            .map_err(|_| CryptoError::DecryptFailed)?;
        Ok(Zeroizing::new(plaintext))
    }

    /// The server's public component, derivable from its stored private key.
    /// This is what a client encrypts under for `decrypt_from_client`.
    pub fn server_public_key(&self) -> Result<String, CryptoError> {
        let private = RsaPrivateKey::from_pkcs8_pem(&self.server_private_key)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        private
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))
    }

    /// Strict 24-hour window from creation. `now` is explicit so boundary
    /// behavior is testable.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at < Duration::hours(24)
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// The client's private key PEM, available only before the session is
    /// saved.
    pub fn client_private_key(&self) -> Result<&str, CryptoError> {
        self.client_private_key
            .as_deref()
            .map(|s| s.as_str())
            .ok_or(CryptoError::ClientKeyConsumed)
    }

    /// Drop the in-memory client private key. Invoked by the store on save.
    pub fn strip_client_key(&mut self) {
        self.client_private_key = None;
    }

    /// Digest of the server key, derived through the private key's public
    /// export path — identical to digesting the public key directly.
    pub fn server_key_id(&self) -> Result<String, CryptoError> {
        let private = RsaPrivateKey::from_pkcs8_pem(&self.server_private_key)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        public_key_id(&private.to_public_key())
    }

    pub fn client_key_id(&self) -> Result<String, CryptoError> {
        let public = RsaPublicKey::from_public_key_pem(&self.client_public_key)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        public_key_id(&public)
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.owner_id, self.session_id)
    }
}

fn public_key_id(public: &RsaPublicKey) -> Result<String, CryptoError> {
    let der = public
        .to_public_key_der()
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    Ok(digest::content_digest(der.as_bytes()))
}

fn oaep_encrypt(public: &RsaPublicKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let max = public.size() - 2 * Sha256::output_size() - 2;
    if plaintext.len() > max {
        return Err(CryptoError::PayloadTooLarge {
            len: plaintext.len(),
            max,
        });
    }
    public
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext)
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))
}
