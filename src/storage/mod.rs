// src/storage/mod.rs
//! Collaborator contracts consumed by the ticket services, plus in-memory
//! implementations of them.

pub mod memory;
pub mod namestore;
pub mod resolver;
pub mod statistics;

pub use memory::{MemoryNamestore, MemoryResolver};
pub use namestore::{Namestore, NamestoreError, ZoneEntry, ZoneIterator};
pub use resolver::{Resolver, ResolverError};
pub use statistics::{MemoryStatistics, NoopStatistics, Statistics};
