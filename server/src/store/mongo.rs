use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson, Document};
use futures::TryStreamExt;
use mongodb::options::FindOptions;
use mongodb::{Client, Collection};

use super::{EventStore, LatestWindow, StoreError};
use crate::config::Config;
use crate::models::{Event, EventPatch, NewEvent};

#[derive(Clone)]
pub struct MongoEventStore {
    collection: Collection<Event>,
}

impl MongoEventStore {
    pub fn new(collection: Collection<Event>) -> Self {
        Self { collection }
    }

    /// Connects, pings the server once and binds the configured collection.
    pub async fn connect(config: &Config) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(&config.mongodb_uri).await?;
        let database = client.database(&config.database_name);
        database.run_command(doc! { "ping": 1 }, None).await?;

        tracing::info!(
            database = %config.database_name,
            collection = %config.collection_name,
            "MongoDB connected"
        );

        Ok(Self::new(database.collection(&config.collection_name)))
    }
}

#[async_trait]
impl EventStore for MongoEventStore {
    async fn find_by_id(&self, id: ObjectId) -> Result<Option<Event>, StoreError> {
        Ok(self.collection.find_one(doc! { "_id": id }, None).await?)
    }

    async fn list_latest(&self, window: LatestWindow) -> Result<Vec<Event>, StoreError> {
        let options = FindOptions::builder()
            .sort(doc! { "schedule": -1 })
            .skip(window.skip)
            .limit(window.limit)
            .build();

        let cursor = self.collection.find(doc! {}, options).await?;
        let events: Vec<Event> = cursor.try_collect().await?;

        tracing::debug!(
            skip = window.skip,
            limit = window.limit,
            count = events.len(),
            "Listed latest events"
        );
        Ok(events)
    }

    async fn insert(&self, event: NewEvent) -> Result<ObjectId, StoreError> {
        let event = event.into_event(ObjectId::new());
        self.collection.insert_one(&event, None).await?;

        tracing::debug!(id = %event.id, "Inserted event");
        Ok(event.id)
    }

    async fn update(&self, id: ObjectId, patch: EventPatch) -> Result<bool, StoreError> {
        let result = self
            .collection
            .update_one(doc! { "_id": id }, doc! { "$set": set_document(patch) }, None)
            .await?;

        tracing::debug!(%id, matched = result.matched_count, "Updated event");
        Ok(result.matched_count > 0)
    }

    async fn delete(&self, id: ObjectId) -> Result<bool, StoreError> {
        let result = self.collection.delete_one(doc! { "_id": id }, None).await?;

        tracing::debug!(%id, deleted = result.deleted_count, "Deleted event");
        Ok(result.deleted_count > 0)
    }
}

/// The `$set` body for a patch: one entry per supplied field.
fn set_document(patch: EventPatch) -> Document {
    let mut set = Document::new();
    let mut put = |key: &str, value: Option<Bson>| {
        if let Some(value) = value {
            set.insert(key, value);
        }
    };

    put("type", patch.event_type.map(Bson::String));
    put("uid", patch.uid.map(Bson::String));
    put("name", patch.name.map(Bson::String));
    put("tagline", patch.tagline.map(Bson::String));
    put("schedule", patch.schedule.map(Bson::String));
    put("description", patch.description.map(Bson::String));
    put("moderator", patch.moderator.map(Bson::String));
    put("category", patch.category.map(Bson::String));
    put("sub_category", patch.sub_category.map(Bson::String));
    put("rigor_rank", patch.rigor_rank.map(Bson::Int64));
    put(
        "attendees",
        patch
            .attendees
            .map(|names| Bson::Array(names.into_iter().map(Bson::String).collect())),
    );
    put("image", patch.image.map(Bson::String));

    set
}
