//! Persistence for events.
//!
//! [`EventStore`] is the only seam between the service and the database.
//! [`MongoEventStore`] is used in production, [`InMemoryEventStore`] in tests
//! and for running the server without a database.

mod memory;
mod mongo;

pub use memory::InMemoryEventStore;
pub use mongo::MongoEventStore;

use async_trait::async_trait;
use bson::oid::ObjectId;

use crate::models::{Event, EventPatch, NewEvent};

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The database rejected or failed the operation
    #[error("{0}")]
    Database(String),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(e: mongodb::error::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// A window over the latest listing.
///
/// `skip` has already been clamped to zero. `limit` follows MongoDB
/// semantics: `0` means no limit and a negative value is read as its absolute
/// value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatestWindow {
    pub skip: u64,
    pub limit: i64,
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn find_by_id(&self, id: ObjectId) -> Result<Option<Event>, StoreError>;

    /// Events ordered by `schedule` descending, restricted to `window`.
    async fn list_latest(&self, window: LatestWindow) -> Result<Vec<Event>, StoreError>;

    /// Persists a new event and returns its assigned id.
    async fn insert(&self, event: NewEvent) -> Result<ObjectId, StoreError>;

    /// Sets the supplied fields. Returns false when no event matched `id`.
    async fn update(&self, id: ObjectId, patch: EventPatch) -> Result<bool, StoreError>;

    /// Returns false when no event matched `id`.
    async fn delete(&self, id: ObjectId) -> Result<bool, StoreError>;
}
