// src/lib.rs
//! # Reclaim Tickets
//!
//! Ticket lifecycle manager for decentralized attribute sharing. An issuer
//! grants an audience capability-style read access to a subset of its
//! attributes, the audience resolves that access later, and the issuer can
//! revoke it without the audience's cooperation.
//!
//! ## Architecture Overview
//! 1. **Models**: identifiers, keys, attributes, presentations, tickets, records
//! 2. **Storage**: contracts for the zone store, the resolver and the metrics
//!    sink, with in-memory implementations
//! 3. **Services**: the issue, consume, revoke and iterate operations
//!
//! A ticket is a record set in the issuer's zone stored under an
//! unguessable label. Knowing the label is the capability; revoking moves the
//! shared attributes to fresh labels the revoked audience never learned.

pub mod config;
pub mod errors;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use crate::config::ReclaimConfig;
pub use errors::{Result, TicketError};
pub use models::{
    Attribute, AttributeList, Credential, Identifier, IdentityPrivateKey, IdentityPublicKey,
    Presentation, PresentationList, Ticket,
};
pub use services::{ConsumeResult, IssueResult, OperationHandle, Services, TicketIterator, TicketService};
