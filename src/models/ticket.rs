// src/models/ticket.rs
//! The ticket capability.

use crate::errors::Result;
use crate::models::identifier::Identifier;
use crate::models::identity::IdentityPublicKey;
use crate::utils::serialization::{deserialize, serialize};
use serde::{Deserialize, Serialize};

/// A capability granting `audience` read access to attributes shared by
/// `identity`.
///
/// The record set lives in the issuer's zone at the label of `rnd`. Anyone
/// holding `(identity, rnd)` can resolve it, so `rnd` must come from a CSPRNG
/// and is never reused.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    /// Issuer's zone
    pub identity: IdentityPublicKey,
    /// The identity the ticket was issued to
    pub audience: IdentityPublicKey,
    pub rnd: Identifier,
}

impl Ticket {
    /// Creates a ticket with a fresh random nonce.
    pub fn new(identity: IdentityPublicKey, audience: IdentityPublicKey) -> Self {
        Ticket {
            identity,
            audience,
            rnd: Identifier::random(),
        }
    }

    /// Label of the ticket's record set within the issuer's zone.
    pub fn label(&self) -> String {
        self.rnd.to_label()
    }

    /// Serializes into a TICKET record payload.
    pub fn to_record_data(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn from_record_data(data: &[u8]) -> Result<Self> {
        deserialize(data)
    }
}
