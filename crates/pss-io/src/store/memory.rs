//! In-memory document store for tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};

use pss_core::{Document, FieldPath, FieldValue, Fields, StoreError, StoreErrorKind};

use super::DocumentStore;
use crate::wire::insert_path;

/// A write that reached the store.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRecord {
    pub collection: String,
    pub id: String,
    /// `None` for a full upsert, else the patched paths
    pub paths: Option<Vec<String>>,
}

#[derive(Default)]
struct Inner {
    collections: BTreeMap<String, BTreeMap<String, Document>>,
    writes: Vec<WriteRecord>,
    attempted_writes: usize,
    reads: usize,
    /// Failures returned by the next calls, in order
    queued: VecDeque<StoreError>,
    /// Failures returned by every write to one document
    sticky: HashMap<(String, String), StoreError>,
    read_only: bool,
}

/// Single-threaded fake of [`DocumentStore`] with write accounting and
/// fault injection.
#[derive(Default)]
pub struct MemoryStore {
    inner: RefCell<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that rejects every write; reads still work.
    pub fn read_only() -> Self {
        let store = Self::default();
        store.inner.borrow_mut().read_only = true;
        store
    }

    pub fn with_document(self, collection: &str, document: Document) -> Self {
        self.insert(collection, document);
        self
    }

    /// Seed a document without counting it as a write.
    pub fn insert(&self, collection: &str, document: Document) {
        self.inner
            .borrow_mut()
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(document.id.clone(), document);
    }

    pub fn document(&self, collection: &str, id: &str) -> Option<Document> {
        self.inner
            .borrow()
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned()
    }

    pub fn len(&self, collection: &str) -> usize {
        self.inner
            .borrow()
            .collections
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    /// Successful writes so far.
    pub fn write_count(&self) -> usize {
        self.inner.borrow().writes.len()
    }

    /// Every write call, including failed and rejected ones.
    pub fn attempted_writes(&self) -> usize {
        self.inner.borrow().attempted_writes
    }

    pub fn read_count(&self) -> usize {
        self.inner.borrow().reads
    }

    pub fn writes(&self) -> Vec<WriteRecord> {
        self.inner.borrow().writes.clone()
    }

    /// Fail the next call (read or write) with `kind`.
    pub fn fail_next(&self, kind: StoreErrorKind) {
        self.inner
            .borrow_mut()
            .queued
            .push_back(StoreError::new(kind, "injected failure"));
    }

    /// Fail every write to one document with `kind`.
    pub fn fail_writes_to(&self, collection: &str, id: &str, kind: StoreErrorKind) {
        self.inner.borrow_mut().sticky.insert(
            (collection.to_string(), id.to_string()),
            StoreError::new(kind, format!("injected failure for {collection}/{id}")),
        );
    }

    fn begin_read(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.borrow_mut();
        inner.reads += 1;
        match inner.queued.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn begin_write(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.borrow_mut();
        inner.attempted_writes += 1;
        if inner.read_only {
            return Err(StoreError::new(
                StoreErrorKind::Rejected,
                format!("write to {collection}/{id} on a read-only store"),
            ));
        }
        if let Some(err) = inner.queued.pop_front() {
            return Err(err);
        }
        if let Some(err) = inner.sticky.get(&(collection.to_string(), id.to_string())) {
            return Err(err.clone());
        }
        Ok(())
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.begin_read()?;
        Ok(self.document(collection, id))
    }

    fn upsert(&self, collection: &str, id: &str, fields: &Fields) -> Result<(), StoreError> {
        self.begin_write(collection, id)?;
        let mut inner = self.inner.borrow_mut();
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), Document::new(id, fields.clone()));
        inner.writes.push(WriteRecord {
            collection: collection.to_string(),
            id: id.to_string(),
            paths: None,
        });
        Ok(())
    }

    fn patch(
        &self,
        collection: &str,
        id: &str,
        updates: &[(FieldPath, FieldValue)],
    ) -> Result<(), StoreError> {
        if updates.is_empty() {
            return Ok(());
        }
        self.begin_write(collection, id)?;
        let mut inner = self.inner.borrow_mut();
        let doc = inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| {
                StoreError::new(
                    StoreErrorKind::NotFound,
                    format!("{collection}/{id} does not exist"),
                )
            })?;
        for (path, value) in updates {
            if let Some(top) = path.segments().first() {
                doc.unsupported.retain(|name| name != top);
            }
            insert_path(&mut doc.fields, path.segments(), value.clone());
        }
        inner.writes.push(WriteRecord {
            collection: collection.to_string(),
            id: id.to_string(),
            paths: Some(updates.iter().map(|(path, _)| path.to_string()).collect()),
        });
        Ok(())
    }

    fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.begin_read()?;
        Ok(self
            .inner
            .borrow()
            .collections
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    fn ping(&self, _collection: &str) -> Result<(), StoreError> {
        self.begin_read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(id: &str, feeders: i64) -> Document {
        let mut fields = Fields::new();
        fields.insert("feeders".into(), FieldValue::Integer(feeders));
        fields.insert("name".into(), FieldValue::string(id.to_uppercase()));
        Document::new(id, fields)
    }

    #[test]
    fn patch_touches_only_listed_paths() {
        let store = MemoryStore::new().with_document("stations", station("darlipali", 4));
        store
            .patch(
                "stations",
                "darlipali",
                &[(FieldPath::field("ptrCount"), FieldValue::Integer(2))],
            )
            .unwrap();
        let doc = store.document("stations", "darlipali").unwrap();
        assert_eq!(doc.get("feeders"), Some(&FieldValue::Integer(4)));
        assert_eq!(doc.get("ptrCount"), Some(&FieldValue::Integer(2)));
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn patch_of_missing_document_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .patch(
                "stations",
                "ghost",
                &[(FieldPath::field("ptrCount"), FieldValue::Integer(2))],
            )
            .unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::NotFound);
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn injected_failures_are_consumed_in_order() {
        let store = MemoryStore::new();
        store.fail_next(StoreErrorKind::Timeout);
        let fields = Fields::new();
        assert_eq!(
            store.upsert("people", "9100000000", &fields).unwrap_err().kind,
            StoreErrorKind::Timeout
        );
        store.upsert("people", "9100000000", &fields).unwrap();
        assert_eq!(store.attempted_writes(), 2);
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn read_only_store_rejects_writes() {
        let store = MemoryStore::read_only().with_document("stations", station("sadar", 2));
        assert!(store.get("stations", "sadar").unwrap().is_some());
        assert!(store.upsert("stations", "sadar", &Fields::new()).is_err());
        assert_eq!(store.attempted_writes(), 1);
        assert_eq!(store.write_count(), 0);
    }
}
