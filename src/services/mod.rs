// src/services/mod.rs
//! Ticket lifecycle services: issue, consume, revoke and iterate.

pub mod consumer;
pub mod handle;
pub mod issuer;
pub mod lifecycle;
pub mod revoker;
pub mod ticket_iterator;

pub use consumer::ConsumeResult;
pub use handle::OperationHandle;
pub use issuer::IssueResult;
pub use lifecycle::{Services, TicketService};
pub use ticket_iterator::TicketIterator;
