// src/models/identity.rs
//! Identity key material.
//!
//! A zone is owned by an identity: the private key authorizes writes to the
//! zone store, the public key addresses the zone for resolution. Keys are
//! secp256k1 (via the `k256` crate).

use crate::errors::{Result, TicketError};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{PublicKey, SecretKey};
use rand::rngs::OsRng;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Private key of an identity (zone owner).
///
/// # Security Notes
/// - The `Debug` output never contains key material
/// - Clones share nothing; each clone holds its own copy of the scalar
#[derive(Clone)]
pub struct IdentityPrivateKey {
    secret_key: SecretKey,
}

impl IdentityPrivateKey {
    /// Generates a fresh identity key using the OS CSPRNG.
    pub fn generate() -> Self {
        IdentityPrivateKey {
            secret_key: SecretKey::random(&mut OsRng),
        }
    }

    /// Restores a private key from its 32-byte big-endian scalar.
    ///
    /// # Errors
    /// Returns `TicketError::Serialization` if the bytes are not a valid scalar.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let secret_key = SecretKey::from_slice(bytes)
            .map_err(|e| TicketError::Serialization(format!("Invalid private key: {}", e)))?;
        Ok(IdentityPrivateKey { secret_key })
    }

    /// Derives the public key addressing this identity's zone.
    pub fn public_key(&self) -> IdentityPublicKey {
        IdentityPublicKey::from_key(&self.secret_key.public_key())
    }
}

impl fmt::Debug for IdentityPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdentityPrivateKey(pub={})", self.public_key())
    }
}

/// Public key of an identity; addresses its zone.
///
/// Held as the compressed SEC1 point, which is validated on construction.
/// Serialized as URL-safe base64 of those bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdentityPublicKey {
    compressed: [u8; COMPRESSED_LEN],
}

const COMPRESSED_LEN: usize = 33;

impl IdentityPublicKey {
    fn from_key(key: &PublicKey) -> Self {
        let mut compressed = [0u8; COMPRESSED_LEN];
        compressed.copy_from_slice(key.to_encoded_point(true).as_bytes());
        IdentityPublicKey { compressed }
    }

    /// Returns the 33-byte compressed SEC1 encoding.
    pub fn to_compressed(&self) -> Vec<u8> {
        self.compressed.to_vec()
    }

    /// Parses a SEC1-encoded (compressed or uncompressed) public key.
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self> {
        let key = PublicKey::from_sec1_bytes(bytes)
            .map_err(|e| TicketError::Serialization(format!("Invalid public key: {}", e)))?;
        Ok(Self::from_key(&key))
    }

    fn encode(&self) -> String {
        base64::encode_config(self.to_compressed(), base64::URL_SAFE_NO_PAD)
    }
}

impl fmt::Display for IdentityPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl fmt::Debug for IdentityPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdentityPublicKey({})", self.encode())
    }
}

impl Serialize for IdentityPublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for IdentityPublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        let bytes = base64::decode_config(&text, base64::URL_SAFE_NO_PAD).map_err(de::Error::custom)?;
        IdentityPublicKey::from_sec1_bytes(&bytes).map_err(de::Error::custom)
    }
}
