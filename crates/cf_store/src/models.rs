//! Database row models — these map to/from SQL rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cf_crypto::{Key, Record, SessionKey};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct KeyRow {
    /// Content digest of the public component — stable across the key's life.
    pub key_id: String,
    pub owner_id: String,
    /// SPKI PEM. Immutable.
    pub public_key: String,
    /// Passphrase-protected PKCS#8 container. Immutable.
    pub encrypted_private_key: String,
    /// Base64 wrapped passphrase. The only column rotation rewrites.
    pub wrapped_passphrase: String,
    pub created_at: DateTime<Utc>,
}

impl KeyRow {
    pub fn into_key(self) -> Key {
        Key::from_parts(
            self.owner_id,
            self.public_key,
            self.encrypted_private_key,
            self.wrapped_passphrase,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DataRow {
    pub id: String,
    pub owner_id: String,
    /// FK to `keys.key_id`, ON DELETE CASCADE.
    pub key_id: String,
    pub name: String,
    pub comment: String,
    pub ciphertext: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DataRow {
    pub fn into_record(self) -> Record {
        Record {
            owner_id: self.owner_id,
            key_id: self.key_id,
            ciphertext: self.ciphertext,
            name: self.name,
            comment: self.comment,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SessionRow {
    pub session_id: String,
    pub owner_id: String,
    pub client_public_key: String,
    /// Unprotected by design — see cf_crypto::session.
    pub server_private_key: String,
    pub created_at: DateTime<Utc>,
}

impl SessionRow {
    /// Rebuild the session. The client private key is not a column, so the
    /// result can never expose one.
    pub fn into_session(self) -> SessionKey {
        SessionKey::from_parts(
            self.session_id,
            self.owner_id,
            self.client_public_key,
            self.server_private_key,
            self.created_at,
        )
    }
}
