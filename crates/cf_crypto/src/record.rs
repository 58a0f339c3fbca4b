//! Encrypted record: an opaque payload bound to exactly one key.
//!
//! Content is replaced wholesale on every update — no diffing, no versioning.
//! Reading requires unlocking the referenced key, so all failure modes of
//! `Key::decrypt` propagate unchanged.

use serde::{Deserialize, Serialize};

use crate::{CryptoError, Key};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub owner_id: String,
    /// `key_id` of the key this record is encrypted under.
    pub key_id: String,
    pub ciphertext: Vec<u8>,
    pub name: String,
    pub comment: String,
}

impl Record {
    pub fn new(owner_id: &str, key: &Key, name: &str) -> Result<Self, CryptoError> {
        Ok(Self {
            owner_id: owner_id.to_string(),
            key_id: key.key_id()?,
            ciphertext: Vec::new(),
            name: name.to_string(),
            comment: String::new(),
        })
    }

    /// Replace the content with `text` encrypted under `key`.
    pub fn update_content(&mut self, text: &str, key: &Key) -> Result<(), CryptoError> {
        self.ciphertext = key.encrypt(text.as_bytes())?;
        Ok(())
    }

    /// Decrypt the content with the referenced key and decode it as text.
    pub fn read_content(&self, key: &mut Key, password: &str) -> Result<String, CryptoError> {
        let plaintext = key.decrypt(&self.ciphertext, password)?;
        String::from_utf8(plaintext.to_vec()).map_err(|_| CryptoError::Utf8)
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let short = if self.key_id.len() >= 7 {
            &self.key_id[self.key_id.len() - 7..]
        } else {
            &self.key_id
        };
        write!(f, "{} - {} - {}", self.owner_id, short, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;

    fn fixture() -> &'static Key {
        static KEY: OnceLock<Key> = OnceLock::new();
        KEY.get_or_init(|| Key::create("user-1", "pw1").expect("create key"))
    }

    #[test]
    fn update_and_read_round_trip() {
        let mut key = fixture().clone();
        let mut record = Record::new("user-1", &key, "mail password").unwrap();
        record.update_content("secret data", &key).unwrap();

        assert_eq!(record.read_content(&mut key, "pw1").unwrap(), "secret data");
    }

    #[test]
    fn update_replaces_content_wholesale() {
        let mut key = fixture().clone();
        let mut record = Record::new("user-1", &key, "note").unwrap();
        record.update_content("first", &key).unwrap();
        let old_ciphertext = record.ciphertext.clone();

        record.update_content("second", &key).unwrap();
        assert_ne!(record.ciphertext, old_ciphertext);
        assert_eq!(record.read_content(&mut key, "pw1").unwrap(), "second");
    }

    #[test]
    fn wrong_password_propagates_unchanged() {
        let mut key = fixture().clone();
        let mut record = Record::new("user-1", &key, "note").unwrap();
        record.update_content("secret data", &key).unwrap();

        assert!(matches!(
            record.read_content(&mut key, "wrong"),
            Err(CryptoError::InvalidPassword)
        ));
    }

    #[test]
    fn display_uses_owner_short_id_and_name() {
        let key = fixture().clone();
        let record = Record::new("user-1", &key, "note").unwrap();
        let shown = record.to_string();
        assert_eq!(
            shown,
            format!("user-1 - {} - note", key.key_id_short().unwrap())
        );
    }
}
