//! Base64 helpers for persisted ciphertext fields.
//!
//! Classic padded base64 (RFC 4648), because the wrapped-passphrase column
//! is stored and compared as standard base64 text.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::CryptoError;

pub fn b64e(data: &[u8]) -> String {
    STANDARD.encode(data)
}

pub fn b64d(s: &str) -> Result<Vec<u8>, CryptoError> {
    Ok(STANDARD.decode(s)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let data = b"coffre codec bytes \x00\xff";
        assert_eq!(b64d(&b64e(data)).unwrap(), data);
    }

    #[test]
    fn rejects_invalid_input() {
        assert!(matches!(
            b64d("not!!base64"),
            Err(CryptoError::Base64Decode(_))
        ));
    }
}
