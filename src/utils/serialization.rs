// src/utils/serialization.rs
//! Serialization utilities for record payloads and labels.
//!
//! Provides serialization and deserialization functions for:
//! - JSON record payloads (attributes, credentials, presentations, tickets)
//! - The canonical text encoding used to turn identifiers into zone labels

use crate::errors::{Result, TicketError};
use serde::{de::DeserializeOwned, Serialize};

/// Serializes a value into a JSON record payload.
///
/// # Arguments
/// * `data` - The value to serialize (must implement `Serialize`)
///
/// # Returns
/// - `Ok(Vec<u8>)` with the JSON bytes on success
/// - `Err(TicketError::Serialization)` if serialization fails
pub fn serialize<T: Serialize>(data: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(data).map_err(Into::into)
}

/// Deserializes a value from a JSON record payload.
///
/// # Arguments
/// * `data` - JSON bytes taken from a record
///
/// # Returns
/// - `Ok(T)` with the deserialized value on success
/// - `Err(TicketError::Serialization)` if the payload is malformed
pub fn deserialize<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    serde_json::from_slice(data).map_err(Into::into)
}

/// Encodes raw bytes into label text (URL-safe base64, no padding).
///
/// The output contains no `.` or `/`, so it is always a single label.
pub fn encode_label(bytes: &[u8]) -> String {
    base64::encode_config(bytes, base64::URL_SAFE_NO_PAD)
}

/// Decodes label text produced by [`encode_label`].
pub fn decode_label(label: &str) -> Result<Vec<u8>> {
    base64::decode_config(label, base64::URL_SAFE_NO_PAD)
        .map_err(|e| TicketError::Serialization(format!("Invalid label {}: {}", label, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_has_no_separators() {
        let label = encode_label(&[0xff; 32]);
        assert!(!label.contains('.'));
        assert!(!label.contains('/'));
        assert!(!label.contains('='));
        assert_eq!(decode_label(&label).unwrap(), vec![0xff; 32]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_label("not a label!").is_err());
    }

    #[test]
    fn test_deserialize_rejects_truncated_json() {
        let bytes = serialize(&vec!["email", "a@b.com"]).unwrap();
        let result: Result<Vec<String>> = deserialize(&bytes[..bytes.len() - 1]);
        assert!(matches!(result, Err(TicketError::Serialization(_))));
    }
}
