// src/models/identifier.rs
//! Random identifiers for attributes, credentials and ticket nonces.
//!
//! An identifier doubles as an address: its label encoding is the zone label
//! under which the identified record set lives.

use crate::errors::{Result, TicketError};
use crate::utils::crypto::random_bytes;
use crate::utils::serialization::{decode_label, encode_label};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of an identifier in bytes (256 bits).
pub const IDENTIFIER_LEN: usize = 32;

/// A 256-bit random identifier.
///
/// The all-zero value is reserved and means "no identifier", for example an
/// attribute that is not backed by a credential.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Identifier([u8; IDENTIFIER_LEN]);

impl Identifier {
    /// The reserved "none" identifier.
    pub const ZERO: Identifier = Identifier([0u8; IDENTIFIER_LEN]);

    /// Generates a fresh identifier from the OS CSPRNG.
    pub fn random() -> Self {
        Identifier(random_bytes())
    }

    pub fn from_bytes(bytes: [u8; IDENTIFIER_LEN]) -> Self {
        Identifier(bytes)
    }

    /// Parses an identifier from a record payload (exactly 32 bytes).
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; IDENTIFIER_LEN] = bytes.try_into().map_err(|_| {
            TicketError::Serialization(format!(
                "Identifier must be {} bytes, got {}",
                IDENTIFIER_LEN,
                bytes.len()
            ))
        })?;
        Ok(Identifier(array))
    }

    pub fn as_bytes(&self) -> &[u8; IDENTIFIER_LEN] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; IDENTIFIER_LEN]
    }

    /// Returns the zone label addressing this identifier.
    pub fn to_label(&self) -> String {
        encode_label(&self.0)
    }

    /// Parses a zone label back into the identifier it encodes.
    pub fn from_label(label: &str) -> Result<Self> {
        Self::from_slice(&decode_label(label)?)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_label())
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self.to_label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_identifiers_differ() {
        let a = Identifier::random();
        let b = Identifier::random();
        assert_ne!(a, b);
        assert!(!a.is_zero());
    }

    #[test]
    fn test_label_parses_back() {
        let id = Identifier::random();
        assert_eq!(Identifier::from_label(&id.to_label()).unwrap(), id);
    }

    #[test]
    fn test_from_slice_rejects_wrong_length() {
        assert!(Identifier::from_slice(&[1u8; 31]).is_err());
        assert!(Identifier::from_slice(&[1u8; 33]).is_err());
    }

    #[test]
    fn test_zero_is_default() {
        assert!(Identifier::default().is_zero());
        assert_eq!(Identifier::default(), Identifier::ZERO);
    }
}
