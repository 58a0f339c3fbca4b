//! cf_store — SQLite persistence for Coffre
//!
//! The cryptographic core (`cf_crypto`) treats this crate as an opaque
//! collaborator: durable storage for wrapped key material, encrypted records,
//! and session rows, keyed by an owner identity that an external
//! authentication system supplies.
//!
//! # What this layer enforces
//! - Key containers and public keys are immutable after creation; only the
//!   wrapped passphrase column changes (password rotation).
//! - Record content is replaced wholesale on update.
//! - Sessions are insert-only, and the in-memory client private key is
//!   stripped before the row is written — it has no column to land in.
//! - Deleting a key cascades to its records (explicit FK policy).

pub mod db;
pub mod error;
pub mod models;

pub use db::Store;
pub use error::StoreError;
