// src/models/mod.rs
//! Identifier and record model: immutable value types exchanged between the
//! ticket services and the zone store.

pub mod credential;
pub mod identifier;
pub mod identity;
pub mod record;
pub mod ticket;

pub use credential::{Attribute, AttributeList, Credential, Presentation, PresentationList};
pub use identifier::Identifier;
pub use identity::{IdentityPrivateKey, IdentityPublicKey};
pub use record::{Expiration, Record, RecordType, TypeFilter};
pub use ticket::Ticket;
