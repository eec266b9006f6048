// src/storage/memory.rs
//! In-memory zone store and resolver.
//!
//! Provides an in-process backend for the collaborator traits:
//! - `MemoryNamestore`: record sets in a hashmap, keyed by zone and label
//! - `MemoryResolver`: public resolution against a `MemoryNamestore`
//!
//! # Note
//! Nothing is persisted. Clones share the same underlying zones, so a
//! resolver built from a store observes every write made through it.

use crate::models::identity::{IdentityPrivateKey, IdentityPublicKey};
use crate::models::record::{Record, TypeFilter};
use crate::storage::namestore::{Namestore, NamestoreError, ZoneEntry, ZoneIterator};
use crate::storage::resolver::{Resolver, ResolverError};
use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Zone = BTreeMap<String, Vec<Record>>;

/// Thread-safe in-memory zone store.
#[derive(Clone)]
pub struct MemoryNamestore {
    zones: Arc<Mutex<HashMap<IdentityPublicKey, Zone>>>,
    /// Remaining successful stores before writes start failing; negative = never fail
    stores_until_failure: Arc<AtomicI64>,
    fail_lookups: Arc<AtomicBool>,
    fail_iterations: Arc<AtomicBool>,
}

impl Default for MemoryNamestore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryNamestore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        MemoryNamestore {
            zones: Arc::new(Mutex::new(HashMap::new())),
            stores_until_failure: Arc::new(AtomicI64::new(-1)),
            fail_lookups: Arc::new(AtomicBool::new(false)),
            fail_iterations: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Lets the next `n` stores succeed, then rejects every later store.
    pub fn fail_stores_after(&self, n: i64) {
        self.stores_until_failure.store(n, Ordering::SeqCst);
    }

    /// Makes every lookup fail (or succeed again).
    pub fn fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }

    /// Makes every zone iteration fail immediately (or succeed again).
    pub fn fail_iterations(&self, fail: bool) {
        self.fail_iterations.store(fail, Ordering::SeqCst);
    }

    /// Returns the record set at `label` in the zone addressed by `zone`.
    pub fn record_set(&self, zone: &IdentityPublicKey, label: &str) -> Vec<Record> {
        self.with_zones(|zones| {
            zones
                .get(zone)
                .and_then(|records| records.get(label))
                .cloned()
                .unwrap_or_default()
        })
        .unwrap_or_default()
    }

    /// Returns every non-empty label in the zone addressed by `zone`.
    pub fn labels(&self, zone: &IdentityPublicKey) -> Vec<String> {
        self.with_zones(|zones| {
            zones
                .get(zone)
                .map(|records| records.keys().cloned().collect())
                .unwrap_or_default()
        })
        .unwrap_or_default()
    }

    fn with_zones<T>(
        &self,
        f: impl FnOnce(&mut HashMap<IdentityPublicKey, Zone>) -> T,
    ) -> Result<T, NamestoreError> {
        let mut zones = self
            .zones
            .lock()
            .map_err(|_| NamestoreError::ReadFailed("zone map poisoned".to_string()))?;
        Ok(f(&mut zones))
    }

    fn take_store_permit(&self) -> bool {
        self.stores_until_failure
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| match remaining {
                r if r < 0 => Some(r),
                0 => None,
                r => Some(r - 1),
            })
            .is_ok()
    }
}

#[async_trait]
impl Namestore for MemoryNamestore {
    async fn store(
        &self,
        zone: &IdentityPrivateKey,
        label: &str,
        records: Vec<Record>,
    ) -> Result<(), NamestoreError> {
        if !self.take_store_permit() {
            return Err(NamestoreError::WriteRejected {
                label: label.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        let zone = zone.public_key();
        debug!("Storing {} records under {}", records.len(), label);
        self.with_zones(|zones| {
            let records_by_label = zones.entry(zone).or_default();
            if records.is_empty() {
                records_by_label.remove(label);
            } else {
                records_by_label.insert(label.to_string(), records);
            }
        })
    }

    async fn lookup(&self, zone: &IdentityPrivateKey, label: &str) -> Result<Vec<Record>, NamestoreError> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(NamestoreError::ReadFailed(format!("injected failure for {}", label)));
        }
        Ok(self.record_set(&zone.public_key(), label))
    }

    async fn zone_iteration_start(
        &self,
        zone: &IdentityPrivateKey,
    ) -> Result<Box<dyn ZoneIterator>, NamestoreError> {
        let failing = self.fail_iterations.load(Ordering::SeqCst);
        let zone = zone.public_key();
        let entries = self.with_zones(|zones| {
            zones
                .get(&zone)
                .map(|records| {
                    records
                        .iter()
                        .map(|(label, records)| ZoneEntry {
                            label: label.clone(),
                            records: records.clone(),
                        })
                        .collect::<VecDeque<_>>()
                })
                .unwrap_or_default()
        })?;
        Ok(Box::new(MemoryZoneIterator { entries, failing }))
    }
}

/// Iterates over a snapshot of a zone taken when iteration started.
struct MemoryZoneIterator {
    entries: VecDeque<ZoneEntry>,
    failing: bool,
}

#[async_trait]
impl ZoneIterator for MemoryZoneIterator {
    async fn next(&mut self) -> Option<Result<ZoneEntry, NamestoreError>> {
        if self.failing {
            self.failing = false;
            self.entries.clear();
            return Some(Err(NamestoreError::ReadFailed("injected iteration failure".to_string())));
        }
        self.entries.pop_front().map(Ok)
    }
}

/// Resolver serving the public records of a `MemoryNamestore`.
#[derive(Clone)]
pub struct MemoryResolver {
    namestore: MemoryNamestore,
    latency: Option<Duration>,
}

impl MemoryResolver {
    pub fn new(namestore: MemoryNamestore) -> Self {
        MemoryResolver {
            namestore,
            latency: None,
        }
    }

    /// Delays every lookup by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

#[async_trait]
impl Resolver for MemoryResolver {
    async fn lookup(
        &self,
        zone: &IdentityPublicKey,
        label: &str,
        filter: TypeFilter,
    ) -> Result<Vec<Record>, ResolverError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let now = Utc::now();
        Ok(self
            .namestore
            .record_set(zone, label)
            .into_iter()
            .filter(|record| !record.private)
            .filter(|record| !record.expiration.is_expired_at(now))
            .filter(|record| filter.matches(record.record_type))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::{Expiration, RecordType};

    fn record(record_type: RecordType, data: &[u8]) -> Record {
        Record::new(record_type, data.to_vec(), Expiration::Relative(Duration::from_secs(60)))
    }

    #[tokio::test]
    async fn test_store_and_lookup() {
        let store = MemoryNamestore::new();
        let zone = IdentityPrivateKey::generate();
        store
            .store(&zone, "label", vec![record(RecordType::Attribute, b"x")])
            .await
            .unwrap();
        let records = store.lookup(&zone, "label").await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(store.lookup(&zone, "other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_store_deletes_label() {
        let store = MemoryNamestore::new();
        let zone = IdentityPrivateKey::generate();
        store
            .store(&zone, "label", vec![record(RecordType::Attribute, b"x")])
            .await
            .unwrap();
        store.store(&zone, "label", vec![]).await.unwrap();
        assert!(store.labels(&zone.public_key()).is_empty());
    }

    #[tokio::test]
    async fn test_zones_are_isolated() {
        let store = MemoryNamestore::new();
        let alice = IdentityPrivateKey::generate();
        let bob = IdentityPrivateKey::generate();
        store
            .store(&alice, "label", vec![record(RecordType::Attribute, b"x")])
            .await
            .unwrap();
        assert!(store.lookup(&bob, "label").await.unwrap().is_empty());
        let mut iter = store.zone_iteration_start(&bob).await.unwrap();
        assert!(iter.next().await.is_none());
    }

    #[tokio::test]
    async fn test_zone_iteration_visits_every_label() {
        let store = MemoryNamestore::new();
        let zone = IdentityPrivateKey::generate();
        for label in ["a", "b", "c"] {
            store
                .store(&zone, label, vec![record(RecordType::Attribute, b"x")])
                .await
                .unwrap();
        }
        let mut iter = store.zone_iteration_start(&zone).await.unwrap();
        let mut seen = Vec::new();
        while let Some(entry) = iter.next().await {
            seen.push(entry.unwrap().label);
        }
        assert_eq!(seen, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_injected_store_failure() {
        let store = MemoryNamestore::new();
        let zone = IdentityPrivateKey::generate();
        store.fail_stores_after(1);
        assert!(store.store(&zone, "a", vec![]).await.is_ok());
        assert!(store.store(&zone, "b", vec![]).await.is_err());
        store.fail_stores_after(-1);
        assert!(store.store(&zone, "c", vec![]).await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_injected_failure_count_holds_under_concurrency() {
        let store = MemoryNamestore::new();
        let zone = IdentityPrivateKey::generate();
        store.fail_stores_after(5);
        let mut writers = tokio::task::JoinSet::new();
        for i in 0..32 {
            let store = store.clone();
            let zone = zone.clone();
            writers.spawn(async move { store.store(&zone, &format!("label-{}", i), vec![]).await.is_ok() });
        }
        let mut succeeded = 0;
        while let Some(ok) = writers.join_next().await {
            if ok.unwrap() {
                succeeded += 1;
            }
        }
        assert_eq!(succeeded, 5);
    }

    #[tokio::test]
    async fn test_resolver_hides_private_and_filters() {
        let store = MemoryNamestore::new();
        let zone = IdentityPrivateKey::generate();
        store
            .store(
                &zone,
                "label",
                vec![
                    record(RecordType::AttributeRef, &[1u8; 32]),
                    record(RecordType::Presentation, b"p"),
                    record(RecordType::Ticket, b"t").private(),
                ],
            )
            .await
            .unwrap();
        let resolver = MemoryResolver::new(store);
        let all = resolver
            .lookup(&zone.public_key(), "label", TypeFilter::Any)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        let refs = resolver
            .lookup(
                &zone.public_key(),
                "label",
                TypeFilter::Only(vec![RecordType::AttributeRef]),
            )
            .await
            .unwrap();
        assert_eq!(refs.len(), 1);
    }

    #[tokio::test]
    async fn test_resolver_drops_expired_records() {
        let store = MemoryNamestore::new();
        let zone = IdentityPrivateKey::generate();
        let expired = Record::new(
            RecordType::Attribute,
            b"old".to_vec(),
            Expiration::Absolute(Utc::now() - chrono::Duration::seconds(5)),
        );
        store.store(&zone, "label", vec![expired]).await.unwrap();
        let resolver = MemoryResolver::new(store);
        let records = resolver
            .lookup(&zone.public_key(), "label", TypeFilter::Any)
            .await
            .unwrap();
        assert!(records.is_empty());
    }
}
