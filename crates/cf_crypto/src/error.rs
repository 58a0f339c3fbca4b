use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Cannot create key material for an unknown owner")]
    InvalidOwner,

    #[error("No passphrase loaded — unlock with the user password first")]
    NoPasswordLoaded,

    #[error("Invalid password — the private-key container refused to open")]
    InvalidPassword,

    #[error("Decryption failed (corrupt ciphertext or mismatched key)")]
    DecryptFailed,

    #[error("Payload of {len} bytes exceeds the {max}-byte OAEP bound")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("Client private key is only available before the session is saved")]
    ClientKeyConsumed,

    #[error("Decrypted content is not valid UTF-8")]
    Utf8,

    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}
