use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Crypto error: {0}")]
    Crypto(#[from] cf_crypto::CryptoError),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Session {0} already saved — session rows are immutable")]
    SessionExists(String),

    #[error("Migration error: {0}")]
    Migration(String),
}
