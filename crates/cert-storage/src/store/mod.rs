mod certifications;
mod dashboards;
mod workflows;

pub use certifications::CertificationFilter;

use crate::backend::{KeyValueStore, MemoryStore, SqliteStore};
use crate::envelope::{decode_collection, encode_collection};
use crate::{Collection, StorageError, DATABASE_FILE};
use cert_core::catalog::{seed_certifications, seed_dashboards, seed_workflows};
use cert_core::dashboard::Dashboard;
use cert_core::{now_timestamp, CertificationRequest, Workflow};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// A record kind persisted as one collection.
pub trait Record: Serialize + DeserializeOwned + Clone {
    const COLLECTION: Collection;

    fn id(&self) -> &str;

    /// Written on the first read of an absent collection.
    fn seed() -> Vec<Self>;

    fn cache(caches: &mut Caches) -> &mut Option<Vec<Self>>;
}

/// Decoded collections, filled on first read.
#[derive(Default)]
pub struct Caches {
    certifications: Option<Vec<CertificationRequest>>,
    workflows: Option<Vec<Workflow>>,
    dashboards: Option<Vec<Dashboard>>,
}

impl Record for CertificationRequest {
    const COLLECTION: Collection = Collection::Certifications;

    fn id(&self) -> &str {
        &self.id
    }

    fn seed() -> Vec<Self> {
        seed_certifications()
    }

    fn cache(caches: &mut Caches) -> &mut Option<Vec<Self>> {
        &mut caches.certifications
    }
}

impl Record for Workflow {
    const COLLECTION: Collection = Collection::Workflows;

    fn id(&self) -> &str {
        &self.id
    }

    fn seed() -> Vec<Self> {
        seed_workflows()
    }

    fn cache(caches: &mut Caches) -> &mut Option<Vec<Self>> {
        &mut caches.workflows
    }
}

impl Record for Dashboard {
    const COLLECTION: Collection = Collection::Dashboards;

    fn id(&self) -> &str {
        &self.id
    }

    fn seed() -> Vec<Self> {
        seed_dashboards(&now_timestamp())
    }

    fn cache(caches: &mut Caches) -> &mut Option<Vec<Self>> {
        &mut caches.dashboards
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Delivered to subscribers after every collection write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionChange {
    pub collection: Collection,
    pub records: usize,
}

type Observer = Box<dyn FnMut(&CollectionChange)>;

pub struct Store<B: KeyValueStore> {
    backend: B,
    caches: Caches,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

impl Store<SqliteStore> {
    /// Opens `<data_dir>/certdash.db`, creating the directory when missing.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir)?;
        let backend = SqliteStore::open(data_dir.join(DATABASE_FILE))?;
        Ok(Self::new(backend))
    }
}

impl Store<MemoryStore> {
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }
}

impl<B: KeyValueStore> Store<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            caches: Caches::default(),
            observers: Vec::new(),
            next_subscription: 1,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Drops decoded collections so the next read goes to the backend.
    pub fn invalidate(&mut self) {
        self.caches = Caches::default();
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&CollectionChange) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    pub fn read_collection<T: Record>(&mut self) -> Result<Vec<T>, StorageError> {
        Ok(self.records::<T>()?.to_vec())
    }

    pub fn write_collection<T: Record>(&mut self, records: Vec<T>) -> Result<(), StorageError> {
        let collection = T::COLLECTION;
        let payload = encode_collection(collection, &records)?;
        self.backend.set(collection.as_str(), &payload)?;
        tracing::debug!(collection = %collection, records = records.len(), "collection written");

        let change = CollectionChange {
            collection,
            records: records.len(),
        };
        *T::cache(&mut self.caches) = Some(records);
        for (_, observer) in self.observers.iter_mut() {
            observer(&change);
        }
        Ok(())
    }

    /// Replaces the stored collection with its built-in seed.
    pub fn reset<T: Record>(&mut self) -> Result<usize, StorageError> {
        let seed = T::seed();
        let count = seed.len();
        self.write_collection(seed)?;
        tracing::info!(collection = %T::COLLECTION, records = count, "collection reset to seed");
        Ok(count)
    }

    pub fn find<T: Record>(&mut self, id: &str) -> Result<Option<T>, StorageError> {
        Ok(self
            .records::<T>()?
            .iter()
            .find(|record| record.id() == id)
            .cloned())
    }

    pub fn require<T: Record>(&mut self, id: &str) -> Result<T, StorageError> {
        self.find(id)?.ok_or_else(|| StorageError::NotFound {
            collection: T::COLLECTION,
            id: id.to_string(),
        })
    }

    pub fn insert<T: Record>(&mut self, record: T) -> Result<(), StorageError> {
        let mut records = self.read_collection::<T>()?;
        if records.iter().any(|existing| existing.id() == record.id()) {
            return Err(StorageError::AlreadyExists {
                collection: T::COLLECTION,
                id: record.id().to_string(),
            });
        }
        records.push(record);
        self.write_collection(records)
    }

    /// Whole-record replacement by id. Unknown ids leave the collection untouched.
    pub fn replace<T: Record>(&mut self, record: T) -> Result<(), StorageError> {
        let mut records = self.read_collection::<T>()?;
        let slot = records
            .iter_mut()
            .find(|existing| existing.id() == record.id())
            .ok_or_else(|| StorageError::NotFound {
                collection: T::COLLECTION,
                id: record.id().to_string(),
            })?;
        *slot = record;
        self.write_collection(records)
    }

    pub fn remove<T: Record>(&mut self, id: &str) -> Result<T, StorageError> {
        let mut records = self.read_collection::<T>()?;
        let idx = records
            .iter()
            .position(|record| record.id() == id)
            .ok_or_else(|| StorageError::NotFound {
                collection: T::COLLECTION,
                id: id.to_string(),
            })?;
        let removed = records.remove(idx);
        self.write_collection(records)?;
        Ok(removed)
    }

    /// Loads one record, lets `mutate` edit it, then writes it back by id.
    pub fn update<T, R, E>(
        &mut self,
        id: &str,
        mutate: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Result<R, StorageError>
    where
        T: Record,
        StorageError: From<E>,
    {
        let mut record = self.require::<T>(id)?;
        let outcome = mutate(&mut record)?;
        self.replace(record)?;
        Ok(outcome)
    }

    fn records<T: Record>(&mut self) -> Result<&[T], StorageError> {
        if T::cache(&mut self.caches).is_none() {
            let loaded = self.load::<T>()?;
            *T::cache(&mut self.caches) = Some(loaded);
        }
        Ok(T::cache(&mut self.caches).as_deref().unwrap_or_default())
    }

    fn load<T: Record>(&mut self) -> Result<Vec<T>, StorageError> {
        let collection = T::COLLECTION;
        let Some(payload) = self.backend.get(collection.as_str())? else {
            let seed = T::seed();
            let payload = encode_collection(collection, &seed)?;
            self.backend.set(collection.as_str(), &payload)?;
            tracing::info!(collection = %collection, records = seed.len(), "seeded empty collection");
            return Ok(seed);
        };

        let decoded = decode_collection::<T>(collection, &payload).map_err(|err| {
            tracing::warn!(collection = %collection, error = %err, "stored collection rejected");
            err
        })?;
        if decoded.migrated {
            let payload = encode_collection(collection, &decoded.records)?;
            self.backend.set(collection.as_str(), &payload)?;
            tracing::info!(collection = %collection, "migrated legacy collection to envelope");
        }
        tracing::debug!(collection = %collection, records = decoded.records.len(), "collection loaded");
        Ok(decoded.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn first_read_seeds_and_persists() {
        let mut store = Store::in_memory();
        let workflows = store.read_collection::<Workflow>().expect("read");
        assert_eq!(workflows, seed_workflows());
        assert!(store.backend().get("workflows").expect("get").is_some());
    }

    #[test]
    fn observers_see_every_write_until_unsubscribed() {
        let mut store = Store::in_memory();
        let seen: Rc<RefCell<Vec<CollectionChange>>> = Rc::default();
        let sink = Rc::clone(&seen);
        let id = store.subscribe(move |change| sink.borrow_mut().push(change.clone()));

        // seeding is not a write
        let mut workflows = store.read_collection::<Workflow>().expect("read");
        assert!(seen.borrow().is_empty());

        store.write_collection(workflows.clone()).expect("write");
        workflows.clear();
        store.write_collection(workflows).expect("write");
        assert_eq!(
            *seen.borrow(),
            vec![
                CollectionChange {
                    collection: Collection::Workflows,
                    records: 1,
                },
                CollectionChange {
                    collection: Collection::Workflows,
                    records: 0,
                },
            ]
        );

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.reset::<Workflow>().expect("reset");
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn replace_unknown_id_is_not_found() {
        let mut store = Store::in_memory();
        let mut ghost = cert_core::catalog::default_workflow();
        ghost.id = "ghost".to_string();
        let err = store.replace(ghost).expect_err("unknown id");
        assert!(err.is_not_found());
        assert_eq!(store.read_collection::<Workflow>().expect("read").len(), 1);
    }

    #[test]
    fn insert_rejects_duplicate_ids() {
        let mut store = Store::in_memory();
        let err = store
            .insert(cert_core::catalog::default_workflow())
            .expect_err("duplicate");
        assert!(matches!(err, StorageError::AlreadyExists { .. }));
    }
}
