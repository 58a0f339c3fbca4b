//! cf_crypto — Coffre key-lifecycle cryptography
//!
//! # Design principles
//! - NO custom crypto; all primitives come from audited Rust crates.
//! - Zeroize all secret material on drop.
//! - Every failure is local, deterministic, and non-retryable — a wrong
//!   password or corrupt ciphertext will stay wrong on retry.
//!
//! # Module layout
//! - `key`     — per-user RSA key pair whose private half only exists inside a
//!               passphrase-protected PKCS#8 container; the passphrase itself
//!               is wrapped under the user's login password
//! - `record`  — opaque payload encrypted under a key's public component
//! - `session` — ephemeral two-pair handshake for one-time client/server channels
//! - `wrap`    — password-derived symmetric wrap of the unlock passphrase
//! - `digest`  — content digest (key IDs) and password digest (wrap keys)
//! - `codec`   — base64 helpers for persisted ciphertext fields
//! - `error`   — unified error type

pub mod codec;
pub mod digest;
pub mod error;
pub mod key;
pub mod record;
pub mod session;
pub mod wrap;

pub use error::CryptoError;
pub use key::Key;
pub use record::Record;
pub use session::SessionKey;
