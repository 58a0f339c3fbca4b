//! Database abstraction over SQLite via sqlx.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use cf_crypto::{Key, Record, SessionKey};

use crate::error::StoreError;
use crate::models::{DataRow, KeyRow, SessionRow};

/// Handle to the vault database. Clones share one connection pool.
#[derive(Clone)]
pub struct Store {
    pub pool: SqlitePool,
}

impl Store {
    /// Open the SQLite file at `db_path`, creating it on first use, and
    /// bring the schema up to date.
    ///
    /// Journal mode and foreign-key enforcement are connection options here
    /// rather than migration statements: sqlx wraps each migration in a
    /// transaction, where SQLite rejects a `journal_mode` change. The
    /// key→data cascade only fires while foreign keys are on.
    pub async fn open(db_path: &Path) -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(opts).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;

        Ok(Self { pool })
    }

    // ── Keys ─────────────────────────────────────────────────────────────────

    /// Persist a key; returns its `key_id`.
    ///
    /// Insert-or-update, where the update path only rewrites the wrapped
    /// passphrase — the container and public key columns are immutable, so a
    /// resave after `rotate_password` touches exactly the outer wrap.
    pub async fn save_key(&self, key: &Key) -> Result<String, StoreError> {
        let key_id = key.key_id()?;
        sqlx::query(
            "INSERT INTO keys (key_id, owner_id, public_key, encrypted_private_key, wrapped_passphrase, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(key_id) DO UPDATE SET wrapped_passphrase = excluded.wrapped_passphrase",
        )
        .bind(&key_id)
        .bind(&key.owner_id)
        .bind(&key.public_key)
        .bind(&key.encrypted_private_key)
        .bind(&key.wrapped_passphrase)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        debug!(key_id = %key_id, owner = %key.owner_id, "key saved");
        Ok(key_id)
    }

    pub async fn load_key(&self, owner_id: &str, key_id: &str) -> Result<Key, StoreError> {
        let row: Option<KeyRow> =
            sqlx::query_as("SELECT * FROM keys WHERE key_id = ? AND owner_id = ?")
                .bind(key_id)
                .bind(owner_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(KeyRow::into_key)
            .ok_or_else(|| StoreError::NotFound(format!("key {key_id}")))
    }

    pub async fn list_keys(&self, owner_id: &str) -> Result<Vec<KeyRow>, StoreError> {
        Ok(
            sqlx::query_as("SELECT * FROM keys WHERE owner_id = ? ORDER BY created_at")
                .bind(owner_id)
                .fetch_all(&self.pool)
                .await?,
        )
    }

    /// Delete a key. Its records go with it (FK cascade).
    pub async fn delete_key(&self, owner_id: &str, key_id: &str) -> Result<(), StoreError> {
        let affected = sqlx::query("DELETE FROM keys WHERE key_id = ? AND owner_id = ?")
            .bind(key_id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if affected == 0 {
            return Err(StoreError::NotFound(format!("key {key_id}")));
        }
        info!(key_id = %key_id, owner = %owner_id, "key deleted (records cascaded)");
        Ok(())
    }

    // ── Encrypted records ────────────────────────────────────────────────────

    /// Insert a record; returns its generated row id.
    pub async fn insert_data(&self, record: &Record) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO data (id, owner_id, key_id, name, comment, ciphertext, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&record.owner_id)
        .bind(&record.key_id)
        .bind(&record.name)
        .bind(&record.comment)
        .bind(&record.ciphertext)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(id = %id, owner = %record.owner_id, "record inserted");
        Ok(id)
    }

    /// Replace a record's content wholesale (no partial updates).
    /// Owner-scoped like every other mutation: a record id alone is not
    /// enough to touch another owner's row.
    pub async fn update_data(
        &self,
        owner_id: &str,
        id: &str,
        record: &Record,
    ) -> Result<(), StoreError> {
        let affected = sqlx::query(
            "UPDATE data SET name = ?, comment = ?, ciphertext = ?, updated_at = ?
             WHERE id = ? AND owner_id = ?",
        )
        .bind(&record.name)
        .bind(&record.comment)
        .bind(&record.ciphertext)
        .bind(Utc::now())
        .bind(id)
        .bind(owner_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            return Err(StoreError::NotFound(format!("record {id}")));
        }
        Ok(())
    }

    pub async fn load_data(&self, owner_id: &str, id: &str) -> Result<DataRow, StoreError> {
        let row: Option<DataRow> =
            sqlx::query_as("SELECT * FROM data WHERE id = ? AND owner_id = ?")
                .bind(id)
                .bind(owner_id)
                .fetch_optional(&self.pool)
                .await?;

        row.ok_or_else(|| StoreError::NotFound(format!("record {id}")))
    }

    pub async fn list_data(&self, owner_id: &str) -> Result<Vec<DataRow>, StoreError> {
        Ok(
            sqlx::query_as("SELECT * FROM data WHERE owner_id = ? ORDER BY updated_at DESC")
                .bind(owner_id)
                .fetch_all(&self.pool)
                .await?,
        )
    }

    /// Records can be deleted independently of their key.
    pub async fn delete_data(&self, owner_id: &str, id: &str) -> Result<(), StoreError> {
        let affected = sqlx::query("DELETE FROM data WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if affected == 0 {
            return Err(StoreError::NotFound(format!("record {id}")));
        }
        Ok(())
    }

    // ── Sessions ─────────────────────────────────────────────────────────────

    /// Persist a session. The in-memory client private key is stripped before
    /// the insert; the schema has no column for it.
    ///
    /// Sessions are insert-only: saving an existing `session_id` is an error.
    pub async fn save_session(&self, session: &mut SessionKey) -> Result<(), StoreError> {
        session.strip_client_key();

        let result = sqlx::query(
            "INSERT INTO sessions (session_id, owner_id, client_public_key, server_private_key, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&session.session_id)
        .bind(&session.owner_id)
        .bind(&session.client_public_key)
        .bind(&session.server_private_key)
        .bind(session.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                debug!(session_id = %session.session_id, owner = %session.owner_id, "session saved");
                Ok(())
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::SessionExists(session.session_id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Load a session regardless of age — callers consult `is_valid` before
    /// using either channel.
    pub async fn load_session(
        &self,
        owner_id: &str,
        session_id: &str,
    ) -> Result<SessionKey, StoreError> {
        let row: Option<SessionRow> =
            sqlx::query_as("SELECT * FROM sessions WHERE session_id = ? AND owner_id = ?")
                .bind(session_id)
                .bind(owner_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(SessionRow::into_session)
            .ok_or_else(|| StoreError::NotFound(format!("session {session_id}")))
    }

    pub async fn list_sessions(&self, owner_id: &str) -> Result<Vec<SessionRow>, StoreError> {
        Ok(
            sqlx::query_as("SELECT * FROM sessions WHERE owner_id = ? ORDER BY created_at DESC")
                .bind(owner_id)
                .fetch_all(&self.pool)
                .await?,
        )
    }

    /// Remove sessions whose 24-hour window closed before `now`.
    /// Returns the number of rows purged.
    ///
    /// Compared as text: both sides go through the driver's own timestamp
    /// encoding (fixed `+00:00` offset), which sorts chronologically at full
    /// sub-second precision. SQLite's `datetime()` would truncate fractional
    /// seconds and purge sessions `is_valid` still accepts.
    pub async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let cutoff = now - Duration::hours(24);
        let purged = sqlx::query("DELETE FROM sessions WHERE created_at <= ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if purged > 0 {
            info!(purged, "expired sessions purged");
        }
        Ok(purged)
    }
}
