// src/models/record.rs
//! Typed records as understood by the zone store and resolver.
//!
//! A label maps to a record set: zero or more typed, opaque-but-typed blobs.
//! Storing an empty record set under a label deletes the label.

use crate::errors::{Result, TicketError};
use crate::models::identifier::Identifier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Stable record type codes.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    /// A personal attribute, stored at the label of its id
    Attribute,
    /// The ticket itself; always private
    Ticket,
    /// Pointer from a ticket record set to an attribute label
    AttributeRef,
    /// An issuer-held credential
    Credential,
    /// A shareable proof derived from a credential
    Presentation,
}

impl RecordType {
    pub const fn code(self) -> u32 {
        match self {
            RecordType::Attribute => 65544,
            RecordType::Ticket => 65545,
            RecordType::AttributeRef => 65546,
            RecordType::Credential => 65554,
            RecordType::Presentation => 65555,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            65544 => Some(RecordType::Attribute),
            65545 => Some(RecordType::Ticket),
            65546 => Some(RecordType::AttributeRef),
            65554 => Some(RecordType::Credential),
            65555 => Some(RecordType::Presentation),
            _ => None,
        }
    }
}

/// When a record stops being served by the resolver.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    /// Valid for this long after each publication
    Relative(Duration),
    /// Valid until a fixed point in time
    Absolute(DateTime<Utc>),
}

impl Expiration {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self {
            Expiration::Relative(_) => false,
            Expiration::Absolute(at) => *at <= now,
        }
    }
}

/// A single typed record.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub record_type: RecordType,
    pub data: Vec<u8>,
    pub expiration: Expiration,
    /// Private records are visible to the zone owner only, never resolved
    pub private: bool,
}

impl Record {
    pub fn new(record_type: RecordType, data: Vec<u8>, expiration: Expiration) -> Self {
        Record {
            record_type,
            data,
            expiration,
            private: false,
        }
    }

    /// Marks the record as private.
    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }

    /// Builds an ATTRIBUTE_REF record pointing at `attribute_id`.
    pub fn attribute_ref(attribute_id: &Identifier, expiration: Expiration) -> Self {
        Record::new(
            RecordType::AttributeRef,
            attribute_id.as_bytes().to_vec(),
            expiration,
        )
    }

    /// Reads the attribute id out of an ATTRIBUTE_REF record.
    pub fn referenced_attribute(&self) -> Result<Identifier> {
        if self.record_type != RecordType::AttributeRef {
            return Err(TicketError::Serialization(format!(
                "Expected ATTRIBUTE_REF record, found {:?}",
                self.record_type
            )));
        }
        Identifier::from_slice(&self.data)
    }
}

/// Which record types a resolver lookup should return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeFilter {
    Any,
    Only(Vec<RecordType>),
}

impl TypeFilter {
    pub fn matches(&self, record_type: RecordType) -> bool {
        match self {
            TypeFilter::Any => true,
            TypeFilter::Only(types) => types.contains(&record_type),
        }
    }
}
