// src/services/revoker.rs
//! Ticket revocation.
//!
//! A label is a capability, so revoking cannot flip a permission. Instead the
//! ticket's record set is deleted and every attribute it referenced is moved
//! to a fresh label. Other tickets that still reference a moved attribute are
//! then rewritten to point at the new label, so their audiences keep access.
//!
//! Stages run strictly one after another:
//! 1. Collect the attribute ids the ticket references
//! 2. Delete the ticket's record set
//! 3. Move each attribute to a new id, one at a time
//! 4. Scan the zone for record sets referencing a moved id
//! 5. Rewrite those record sets, one at a time
//!
//! The stages are not atomic as a whole. A failure in stage 3 or 5 aborts the
//! operation and leaves already-moved attributes and already-rewritten
//! tickets in their new state.

use crate::errors::{Result, TicketError};
use crate::models::credential::{Attribute, Credential};
use crate::models::identifier::Identifier;
use crate::models::identity::IdentityPrivateKey;
use crate::models::record::{Record, RecordType};
use crate::models::ticket::Ticket;
use crate::services::lifecycle::Services;
use crate::storage::namestore::ZoneEntry;
use crate::storage::statistics::STAT_TICKETS_REVOKED;
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RevokeStage {
    Collect,
    DeleteTicket,
    MoveAttributes,
    Propagate,
    Rewrite,
    Done,
}

pub(crate) struct RevokeOperation {
    services: Arc<Services>,
    identity: IdentityPrivateKey,
    ticket: Ticket,
    stage: RevokeStage,
    attributes_to_move: VecDeque<Identifier>,
    /// old id -> new id
    moved: BTreeMap<Identifier, Identifier>,
    tickets_to_update: VecDeque<ZoneEntry>,
}

impl RevokeOperation {
    pub(crate) fn new(services: Arc<Services>, identity: IdentityPrivateKey, ticket: Ticket) -> Self {
        RevokeOperation {
            services,
            identity,
            ticket,
            stage: RevokeStage::Collect,
            attributes_to_move: VecDeque::new(),
            moved: BTreeMap::new(),
            tickets_to_update: VecDeque::new(),
        }
    }

    pub(crate) async fn run(mut self) -> Result<()> {
        loop {
            debug!("Revoke of ticket {}: {:?}", self.ticket.rnd, self.stage);
            let result = match self.stage {
                RevokeStage::Collect => self.collect().await,
                RevokeStage::DeleteTicket => self.delete_ticket().await,
                RevokeStage::MoveAttributes => self.move_next_attribute().await,
                RevokeStage::Propagate => self.propagate().await,
                RevokeStage::Rewrite => self.rewrite_next_ticket().await,
                RevokeStage::Done => {
                    self.services.statistics.update(STAT_TICKETS_REVOKED, 1);
                    info!(
                        "Revoked ticket {} ({} attributes moved)",
                        self.ticket.rnd,
                        self.moved.len()
                    );
                    return Ok(());
                }
            };
            self.stage = match result {
                Ok(next) => next,
                Err(e) => {
                    warn!(
                        "Revoke of ticket {} failed during {:?}: {}",
                        self.ticket.rnd, self.stage, e
                    );
                    return Err(e);
                }
            };
        }
    }

    async fn collect(&mut self) -> Result<RevokeStage> {
        let records = self
            .services
            .namestore
            .lookup(&self.identity, &self.ticket.label())
            .await
            .map_err(TicketError::lookup)?;

        let mut referenced = BTreeSet::new();
        for record in records.iter().filter(|r| r.record_type == RecordType::AttributeRef) {
            referenced.insert(record.referenced_attribute()?);
        }
        if referenced.is_empty() {
            warn!("Ticket {} references no attributes", self.ticket.rnd);
            if records.is_empty() {
                return Ok(RevokeStage::Done);
            }
        }
        self.attributes_to_move = referenced.into_iter().collect();
        Ok(RevokeStage::DeleteTicket)
    }

    async fn delete_ticket(&mut self) -> Result<RevokeStage> {
        self.services
            .namestore
            .store(&self.identity, &self.ticket.label(), Vec::new())
            .await
            .map_err(TicketError::store)?;
        Ok(self.after_move())
    }

    async fn move_next_attribute(&mut self) -> Result<RevokeStage> {
        let old_id = match self.attributes_to_move.pop_front() {
            Some(old_id) => old_id,
            None => return Ok(self.after_move()),
        };
        let records = self
            .services
            .namestore
            .lookup(&self.identity, &old_id.to_label())
            .await
            .map_err(TicketError::lookup)?;
        if records.is_empty() {
            warn!("Attribute {} not found, not moving it", old_id);
            return Ok(self.after_move());
        }

        let new_id = Identifier::random();
        let rewritten = records
            .into_iter()
            .map(|record| reassign_id(record, new_id))
            .collect::<Result<Vec<_>>>()?;
        self.services
            .namestore
            .store(&self.identity, &new_id.to_label(), rewritten)
            .await
            .map_err(TicketError::store)?;
        self.services
            .namestore
            .store(&self.identity, &old_id.to_label(), Vec::new())
            .await
            .map_err(TicketError::store)?;
        debug!("Moved attribute {} to {}", old_id, new_id);
        self.moved.insert(old_id, new_id);
        Ok(self.after_move())
    }

    fn after_move(&self) -> RevokeStage {
        if !self.attributes_to_move.is_empty() {
            RevokeStage::MoveAttributes
        } else if self.moved.is_empty() {
            RevokeStage::Done
        } else {
            RevokeStage::Propagate
        }
    }

    /// Buffers every record set referencing a moved attribute. Nothing is
    /// written while the zone iteration is running.
    async fn propagate(&mut self) -> Result<RevokeStage> {
        let mut iter = self
            .services
            .namestore
            .zone_iteration_start(&self.identity)
            .await
            .map_err(TicketError::lookup)?;
        while let Some(entry) = iter.next().await {
            let entry = entry.map_err(TicketError::lookup)?;
            if self.references_moved_attribute(&entry) {
                self.tickets_to_update.push_back(entry);
            }
        }
        debug!(
            "{} tickets reference attributes moved by revoke of {}",
            self.tickets_to_update.len(),
            self.ticket.rnd
        );
        Ok(self.after_rewrite())
    }

    async fn rewrite_next_ticket(&mut self) -> Result<RevokeStage> {
        let entry = match self.tickets_to_update.pop_front() {
            Some(entry) => entry,
            None => return Ok(RevokeStage::Done),
        };
        let records = entry
            .records
            .into_iter()
            .map(|record| self.redirect_reference(record))
            .collect::<Vec<_>>();
        self.services
            .namestore
            .store(&self.identity, &entry.label, records)
            .await
            .map_err(TicketError::store)?;
        debug!("Updated attribute references under {}", entry.label);
        Ok(self.after_rewrite())
    }

    fn after_rewrite(&self) -> RevokeStage {
        if self.tickets_to_update.is_empty() {
            RevokeStage::Done
        } else {
            RevokeStage::Rewrite
        }
    }

    fn references_moved_attribute(&self, entry: &ZoneEntry) -> bool {
        entry
            .records
            .iter()
            .filter(|r| r.record_type == RecordType::AttributeRef)
            .filter_map(|r| r.referenced_attribute().ok())
            .any(|id| self.moved.contains_key(&id))
    }

    fn redirect_reference(&self, mut record: Record) -> Record {
        if record.record_type != RecordType::AttributeRef {
            return record;
        }
        if let Some(new_id) = record
            .referenced_attribute()
            .ok()
            .and_then(|old_id| self.moved.get(&old_id))
        {
            record.data = new_id.as_bytes().to_vec();
        }
        record
    }
}

/// Re-encodes ATTRIBUTE and CREDENTIAL records with `new_id`; other records
/// are carried over unchanged.
fn reassign_id(mut record: Record, new_id: Identifier) -> Result<Record> {
    let data = match record.record_type {
        RecordType::Attribute => Attribute::from_record_data(&record.data)?
            .with_id(new_id)
            .to_record_data()?,
        RecordType::Credential => Credential::from_record_data(&record.data)?
            .with_id(new_id)
            .to_record_data()?,
        _ => return Ok(record),
    };
    record.data = data;
    Ok(record)
}
