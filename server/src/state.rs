use std::sync::Arc;

use crate::services::EventService;
use crate::store::EventStore;

/// Shared by every handler. Cloning is cheap: the store sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub events: EventService,
}

impl AppState {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self {
            events: EventService::new(store),
        }
    }
}
