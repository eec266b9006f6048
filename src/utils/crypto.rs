// src/utils/crypto.rs
//! Randomness for identifiers and ticket nonces.
//!
//! All values come from the operating system CSPRNG.

use rand::rngs::OsRng;
use rand::RngCore;

/// Fills a fixed-size array with bytes from the OS CSPRNG.
///
/// # Returns
/// Fixed-size 32-byte array (`[u8; 32]`) of random data.
pub fn random_bytes() -> [u8; 32] {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    bytes
}
