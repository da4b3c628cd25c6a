//! Document store clients.
//!
//! [`DocumentStore`] is the only seam between the orchestrators and the
//! remote database. Every call is a single round trip (listing aside, which
//! follows page tokens) and never retries on its own; retry policy belongs to
//! the caller.

mod firestore;
mod memory;

use pss_core::{Document, FieldPath, FieldValue, Fields, StoreError};

pub use firestore::{FirestoreConfig, FirestoreStore, StoreAuth};
pub use memory::{MemoryStore, WriteRecord};

pub trait DocumentStore {
    /// Fetch one document; `Ok(None)` when it does not exist.
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Create or fully replace a document.
    fn upsert(&self, collection: &str, id: &str, fields: &Fields) -> Result<(), StoreError>;

    /// Update only the given field paths of an existing document.
    ///
    /// Fails with `NotFound` when the document does not exist.
    fn patch(
        &self,
        collection: &str,
        id: &str,
        updates: &[(FieldPath, FieldValue)],
    ) -> Result<(), StoreError>;

    /// Every document of a collection.
    fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// One cheap authorized read against `collection`; proves the store is
    /// reachable and accepts the credentials.
    fn ping(&self, collection: &str) -> Result<(), StoreError>;
}

impl<S: DocumentStore + ?Sized> DocumentStore for &S {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        (**self).get(collection, id)
    }

    fn upsert(&self, collection: &str, id: &str, fields: &Fields) -> Result<(), StoreError> {
        (**self).upsert(collection, id, fields)
    }

    fn patch(
        &self,
        collection: &str,
        id: &str,
        updates: &[(FieldPath, FieldValue)],
    ) -> Result<(), StoreError> {
        (**self).patch(collection, id, updates)
    }

    fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        (**self).list(collection)
    }

    fn ping(&self, collection: &str) -> Result<(), StoreError> {
        (**self).ping(collection)
    }
}
