pub mod event;

pub use event::{Event, EventFields, EventPatch, EventResponse, NewEvent};
