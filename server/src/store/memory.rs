use async_trait::async_trait;
use bson::oid::ObjectId;
use tokio::sync::RwLock;

use super::{EventStore, LatestWindow, StoreError};
use crate::models::{Event, EventPatch, NewEvent};

/// In-memory implementation of [`EventStore`].
///
/// Mirrors the MongoDB query semantics the service relies on: `schedule`
/// sorts descending with missing values last, ties keep insertion order.
#[derive(Default)]
pub struct InMemoryEventStore {
    events: RwLock<Vec<Event>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn find_by_id(&self, id: ObjectId) -> Result<Option<Event>, StoreError> {
        let events = self.events.read().await;
        Ok(events.iter().find(|event| event.id == id).cloned())
    }

    async fn list_latest(&self, window: LatestWindow) -> Result<Vec<Event>, StoreError> {
        let mut events = self.events.read().await.clone();
        // Stable, so equal schedules stay in insertion order. None < Some,
        // which puts events without a schedule at the end.
        events.sort_by(|a, b| b.schedule.cmp(&a.schedule));

        let skipped = events.into_iter().skip(window.skip as usize);
        let events = match window.limit.unsigned_abs() {
            0 => skipped.collect(),
            limit => skipped.take(limit as usize).collect(),
        };
        Ok(events)
    }

    async fn insert(&self, event: NewEvent) -> Result<ObjectId, StoreError> {
        let id = ObjectId::new();
        self.events.write().await.push(event.into_event(id));
        Ok(id)
    }

    async fn update(&self, id: ObjectId, patch: EventPatch) -> Result<bool, StoreError> {
        let mut events = self.events.write().await;
        match events.iter_mut().find(|event| event.id == id) {
            Some(event) => {
                event.apply(&patch);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: ObjectId) -> Result<bool, StoreError> {
        let mut events = self.events.write().await;
        let before = events.len();
        events.retain(|event| event.id != id);
        Ok(events.len() < before)
    }
}
