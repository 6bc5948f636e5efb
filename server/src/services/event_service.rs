//! Event resource operations.

use std::sync::Arc;

use bson::oid::ObjectId;

use crate::models::{Event, EventFields, NewEvent};
use crate::store::{EventStore, LatestWindow};
use crate::utils::error::AppError;

pub const LATEST_TYPE: &str = "latest";
pub const DEFAULT_LIMIT: i64 = 5;
pub const DEFAULT_PAGE: i64 = 1;

/// Pagination of the latest listing, as supplied by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: i64,
    pub page: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            page: DEFAULT_PAGE,
        }
    }
}

impl Pagination {
    /// Parses optional query-string values, applying the defaults for
    /// missing ones. Magnitudes are not checked.
    pub fn parse(limit: Option<&str>, page: Option<&str>) -> Result<Self, AppError> {
        Ok(Self {
            limit: parse_number("limit", limit, DEFAULT_LIMIT)?,
            page: parse_number("page", page, DEFAULT_PAGE)?,
        })
    }

    /// `(page - 1) * limit`, clamped to zero for pages below one and negative
    /// limits. The limit is kept negatable, since MongoDB sends its absolute
    /// value.
    pub fn window(&self) -> LatestWindow {
        let limit = self.limit.max(-i64::MAX);
        let skip = self.page.saturating_sub(1).saturating_mul(limit).max(0);
        LatestWindow {
            skip: skip as u64,
            limit,
        }
    }
}

fn parse_number(name: &str, value: Option<&str>, default: i64) -> Result<i64, AppError> {
    match value {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            AppError::invalid(format!("{} must be an integer, got '{}'", name, raw))
        }),
    }
}

/// Service layer for event operations. Each call issues at most one store
/// operation.
#[derive(Clone)]
pub struct EventService {
    store: Arc<dyn EventStore>,
}

impl EventService {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    pub async fn get_by_id(&self, id: Option<&str>) -> Result<Event, AppError> {
        let id = match id {
            Some(id) if !id.is_empty() => parse_id(id)?,
            _ => return Err(AppError::invalid("Event ID required")),
        };

        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(AppError::event_not_found)
    }

    pub async fn list_latest(
        &self,
        event_type: Option<&str>,
        pagination: Pagination,
    ) -> Result<Vec<Event>, AppError> {
        if event_type != Some(LATEST_TYPE) {
            return Err(AppError::invalid("Invalid type. Use type=latest"));
        }

        Ok(self.store.list_latest(pagination.window()).await?)
    }

    pub async fn create(&self, fields: EventFields) -> Result<ObjectId, AppError> {
        let patch = fields.into_patch()?;
        // BSON datetimes are millisecond precision; take the timestamp at that
        // precision so every store returns the same value.
        let created_at = bson::DateTime::now().to_chrono();

        let id = self
            .store
            .insert(NewEvent::from_patch(patch, created_at))
            .await?;

        tracing::info!(%id, "Event created");
        Ok(id)
    }

    pub async fn update(&self, id: &str, fields: EventFields) -> Result<(), AppError> {
        let id = parse_id(id)?;
        let patch = fields.into_patch()?;

        // MongoDB rejects an empty $set, so an empty patch only checks that
        // the event exists.
        let matched = if patch.is_empty() {
            self.store.find_by_id(id).await?.is_some()
        } else {
            self.store.update(id, patch).await?
        };

        if !matched {
            return Err(AppError::event_not_found());
        }

        tracing::info!(%id, "Event updated");
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let id = parse_id(id)?;

        if !self.store.delete(id).await? {
            return Err(AppError::event_not_found());
        }

        tracing::info!(%id, "Event deleted");
        Ok(())
    }
}

fn parse_id(id: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(id).map_err(|_| AppError::MalformedId(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventPatch;
    use crate::store::{InMemoryEventStore, StoreError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts every call that reaches the store.
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryEventStore,
        calls: AtomicUsize,
    }

    impl CountingStore {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn hit(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl EventStore for CountingStore {
        async fn find_by_id(&self, id: ObjectId) -> Result<Option<Event>, StoreError> {
            self.hit();
            self.inner.find_by_id(id).await
        }

        async fn list_latest(&self, window: LatestWindow) -> Result<Vec<Event>, StoreError> {
            self.hit();
            self.inner.list_latest(window).await
        }

        async fn insert(&self, event: NewEvent) -> Result<ObjectId, StoreError> {
            self.hit();
            self.inner.insert(event).await
        }

        async fn update(&self, id: ObjectId, patch: EventPatch) -> Result<bool, StoreError> {
            self.hit();
            self.inner.update(id, patch).await
        }

        async fn delete(&self, id: ObjectId) -> Result<bool, StoreError> {
            self.hit();
            self.inner.delete(id).await
        }
    }

    /// A store whose every operation fails.
    struct BrokenStore;

    #[async_trait]
    impl EventStore for BrokenStore {
        async fn find_by_id(&self, _: ObjectId) -> Result<Option<Event>, StoreError> {
            Err(StoreError::Database("connection refused".into()))
        }

        async fn list_latest(&self, _: LatestWindow) -> Result<Vec<Event>, StoreError> {
            Err(StoreError::Database("connection refused".into()))
        }

        async fn insert(&self, _: NewEvent) -> Result<ObjectId, StoreError> {
            Err(StoreError::Database("connection refused".into()))
        }

        async fn update(&self, _: ObjectId, _: EventPatch) -> Result<bool, StoreError> {
            Err(StoreError::Database("connection refused".into()))
        }

        async fn delete(&self, _: ObjectId) -> Result<bool, StoreError> {
            Err(StoreError::Database("connection refused".into()))
        }
    }

    fn fields(pairs: &[(&str, &str)]) -> EventFields {
        let mut fields = EventFields::new();
        for (key, value) in pairs {
            fields.insert(*key, *value);
        }
        fields
    }

    fn setup() -> (Arc<CountingStore>, EventService) {
        let store = Arc::new(CountingStore::default());
        let service = EventService::new(store.clone());
        (store, service)
    }

    async fn create_scheduled(service: &EventService, schedules: &[&str]) {
        for &schedule in schedules {
            service
                .create(fields(&[("schedule", schedule), ("name", schedule)]))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let (_, service) = setup();
        let id = service
            .create(fields(&[
                ("type", "meetup"),
                ("uid", "u-1"),
                ("name", "Rust Night"),
                ("schedule", "2024-05-01T18:00:00Z"),
                ("rigor_rank", "3"),
                ("attendees", "a,b,c"),
            ]))
            .await
            .unwrap();

        let event = service.get_by_id(Some(id.to_hex().as_str())).await.unwrap();
        assert_eq!(event.id, id);
        assert_eq!(event.event_type.as_deref(), Some("meetup"));
        assert_eq!(event.uid.as_deref(), Some("u-1"));
        assert_eq!(event.name.as_deref(), Some("Rust Night"));
        assert_eq!(event.rigor_rank, Some(3));
        assert_eq!(event.attendees, vec!["a", "b", "c"]);
        assert_eq!(event.image, None);
        assert!(event.created_at <= chrono::Utc::now());
    }

    #[tokio::test]
    async fn test_create_with_image_keeps_filename() {
        let (_, service) = setup();
        let mut upload = fields(&[("name", "Poster")]);
        upload.set_image("poster.png");

        let id = service.create(upload).await.unwrap();
        let event = service.get_by_id(Some(id.to_hex().as_str())).await.unwrap();
        assert_eq!(event.image.as_deref(), Some("poster.png"));
        assert!(event.attendees.is_empty());
    }

    #[tokio::test]
    async fn test_get_without_id_never_reaches_store() {
        let (store, service) = setup();

        for id in [None, Some("")] {
            let err = service.get_by_id(id).await.unwrap_err();
            assert!(matches!(err, AppError::InvalidArgument(_)));
        }
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_malformed_and_missing_ids() {
        let (_, service) = setup();

        let err = service.get_by_id(Some("not-an-id")).await.unwrap_err();
        assert!(matches!(err, AppError::MalformedId(_)));

        let err = service
            .get_by_id(Some(ObjectId::new().to_hex().as_str()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_requires_latest_type() {
        let (store, service) = setup();

        for kind in [None, Some("oldest"), Some("Latest"), Some("")] {
            let err = service
                .list_latest(kind, Pagination::default())
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::InvalidArgument(_)));
        }
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_first_page_is_five_most_recent() {
        let (_, service) = setup();
        create_scheduled(
            &service,
            &[
                "2024-01-03",
                "2024-01-07",
                "2024-01-01",
                "2024-01-05",
                "2024-01-02",
                "2024-01-06",
                "2024-01-04",
            ],
        )
        .await;

        let events = service
            .list_latest(Some("latest"), Pagination::default())
            .await
            .unwrap();
        let schedules: Vec<_> = events.iter().map(|e| e.schedule.clone().unwrap()).collect();
        assert_eq!(
            schedules,
            vec!["2024-01-07", "2024-01-06", "2024-01-05", "2024-01-04", "2024-01-03"]
        );
    }

    #[tokio::test]
    async fn test_second_page_skips_first() {
        let (_, service) = setup();
        let days: Vec<String> = (1..=12).map(|d| format!("2024-02-{:02}", d)).collect();
        let days: Vec<&str> = days.iter().map(String::as_str).collect();
        create_scheduled(&service, &days).await;

        let all = service
            .list_latest(Some("latest"), Pagination { limit: 0, page: 1 })
            .await
            .unwrap();
        let page_two = service
            .list_latest(Some("latest"), Pagination { limit: 5, page: 2 })
            .await
            .unwrap();

        assert_eq!(page_two, all[5..10].to_vec());
    }

    #[test]
    fn test_window_clamps_negative_skip() {
        assert_eq!(
            Pagination { limit: 5, page: 0 }.window(),
            LatestWindow { skip: 0, limit: 5 }
        );
        assert_eq!(
            Pagination { limit: -5, page: 3 }.window(),
            LatestWindow { skip: 0, limit: -5 }
        );
        assert_eq!(
            Pagination { limit: 5, page: 3 }.window(),
            LatestWindow { skip: 10, limit: 5 }
        );
    }

    #[test]
    fn test_window_limit_stays_negatable() {
        let window = Pagination {
            limit: i64::MIN,
            page: 1,
        }
        .window();
        assert_eq!(window, LatestWindow { skip: 0, limit: -i64::MAX });
        assert_eq!(window.limit.checked_abs(), Some(i64::MAX));
    }

    #[tokio::test]
    async fn test_list_with_minimum_limit() {
        let (_, service) = setup();
        create_scheduled(&service, &["2024-01-01", "2024-01-02"]).await;

        let pagination = Pagination::parse(Some("-9223372036854775808"), None).unwrap();
        let events = service
            .list_latest(Some("latest"), pagination)
            .await
            .unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_pagination_parse() {
        assert_eq!(Pagination::parse(None, None).unwrap(), Pagination::default());
        assert_eq!(
            Pagination::parse(Some("10"), Some("-1")).unwrap(),
            Pagination { limit: 10, page: -1 }
        );
        assert!(Pagination::parse(Some("ten"), None).is_err());
        assert!(Pagination::parse(None, Some("")).is_err());
    }

    #[tokio::test]
    async fn test_partial_update_changes_only_supplied_fields() {
        let (_, service) = setup();
        let id = service
            .create(fields(&[
                ("name", "Old Name"),
                ("tagline", "Stays"),
                ("rigor_rank", "4"),
                ("attendees", "x,y"),
            ]))
            .await
            .unwrap();
        let before = service.get_by_id(Some(id.to_hex().as_str())).await.unwrap();

        service
            .update(&id.to_hex(), fields(&[("name", "New Name")]))
            .await
            .unwrap();

        let after = service.get_by_id(Some(id.to_hex().as_str())).await.unwrap();
        assert_eq!(after.name.as_deref(), Some("New Name"));
        assert_eq!(
            Event {
                name: before.name.clone(),
                ..after
            },
            before
        );
    }

    #[tokio::test]
    async fn test_update_parses_like_create() {
        let (_, service) = setup();
        let id = service.create(fields(&[])).await.unwrap();

        let mut upload = fields(&[("attendees", "p,q"), ("rigor_rank", "9")]);
        upload.set_image("new.jpg");
        service.update(&id.to_hex(), upload).await.unwrap();

        let event = service.get_by_id(Some(id.to_hex().as_str())).await.unwrap();
        assert_eq!(event.attendees, vec!["p", "q"]);
        assert_eq!(event.rigor_rank, Some(9));
        assert_eq!(event.image.as_deref(), Some("new.jpg"));

        let err = service
            .update(&id.to_hex(), fields(&[("rigor_rank", "high")]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_update_missing_event() {
        let (_, service) = setup();
        let missing = ObjectId::new().to_hex();

        let err = service
            .update(&missing, fields(&[("name", "x")]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = service.update(&missing, fields(&[])).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_empty_update_of_existing_event_succeeds() {
        let (_, service) = setup();
        let id = service.create(fields(&[("name", "Same")])).await.unwrap();

        service.update(&id.to_hex(), fields(&[])).await.unwrap();
        let event = service.get_by_id(Some(id.to_hex().as_str())).await.unwrap();
        assert_eq!(event.name.as_deref(), Some("Same"));
    }

    #[tokio::test]
    async fn test_delete_missing_leaves_count_unchanged() {
        let (store, service) = setup();
        service.create(fields(&[("name", "keep")])).await.unwrap();

        let err = service.delete(&ObjectId::new().to_hex()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(store.inner.len().await, 1);
    }

    #[tokio::test]
    async fn test_delete_removes_event() {
        let (_, service) = setup();
        let id = service.create(fields(&[])).await.unwrap();

        service.delete(&id.to_hex()).await.unwrap();
        let err = service.get_by_id(Some(id.to_hex().as_str())).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_store_failures_propagate() {
        let service = EventService::new(Arc::new(BrokenStore));

        let err = service.create(fields(&[])).await.unwrap_err();
        assert!(matches!(err, AppError::StoreFailure(_)));
        assert_eq!(err.public_message(), "connection refused");

        let err = service
            .list_latest(Some("latest"), Pagination::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StoreFailure(_)));
    }
}
