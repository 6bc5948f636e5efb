use std::collections::BTreeMap;

use bson::oid::ObjectId;
use bson::Bson;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::utils::error::AppError;

/// A stored event document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub uid: Option<String>,
    pub name: Option<String>,
    pub tagline: Option<String>,
    /// Sort key of the latest listing.
    pub schedule: Option<String>,
    pub description: Option<String>,
    pub moderator: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    #[serde(default, deserialize_with = "lenient_rank")]
    pub rigor_rank: Option<i64>,
    #[serde(default, deserialize_with = "lenient_attendees")]
    pub attendees: Vec<String>,
    /// Original filename of the uploaded image. The bytes are never kept.
    pub image: Option<String>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Applies a partial update. `id` and `created_at` are not part of a
    /// patch and never change.
    pub fn apply(&mut self, patch: &EventPatch) {
        let EventPatch {
            event_type,
            uid,
            name,
            tagline,
            schedule,
            description,
            moderator,
            category,
            sub_category,
            rigor_rank,
            attendees,
            image,
        } = patch.clone();

        merge(&mut self.event_type, event_type);
        merge(&mut self.uid, uid);
        merge(&mut self.name, name);
        merge(&mut self.tagline, tagline);
        merge(&mut self.schedule, schedule);
        merge(&mut self.description, description);
        merge(&mut self.moderator, moderator);
        merge(&mut self.category, category);
        merge(&mut self.sub_category, sub_category);
        merge(&mut self.rigor_rank, rigor_rank);
        merge(&mut self.image, image);
        if let Some(attendees) = attendees {
            self.attendees = attendees;
        }
    }
}

// Older documents in the collection may hold NaN (a double) or a string
// here. Anything that is not a whole number reads as "no rank".
fn lenient_rank<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Bson::deserialize(deserializer)? {
        Bson::Int32(n) => Some(i64::from(n)),
        Bson::Int64(n) => Some(n),
        Bson::Double(f) if is_whole_i64(f) => Some(f as i64),
        _ => None,
    })
}

fn is_whole_i64(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64
}

// Attendees may have been stored as the raw comma-separated string.
fn lenient_attendees<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Bson::deserialize(deserializer)? {
        Bson::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Bson::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        Bson::String(s) => split_attendees(&s),
        _ => Vec::new(),
    })
}

fn merge<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

/// Everything needed to insert an event; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub event_type: Option<String>,
    pub uid: Option<String>,
    pub name: Option<String>,
    pub tagline: Option<String>,
    pub schedule: Option<String>,
    pub description: Option<String>,
    pub moderator: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub rigor_rank: Option<i64>,
    pub attendees: Vec<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewEvent {
    pub fn from_patch(patch: EventPatch, created_at: DateTime<Utc>) -> Self {
        Self {
            event_type: patch.event_type,
            uid: patch.uid,
            name: patch.name,
            tagline: patch.tagline,
            schedule: patch.schedule,
            description: patch.description,
            moderator: patch.moderator,
            category: patch.category,
            sub_category: patch.sub_category,
            rigor_rank: patch.rigor_rank,
            attendees: patch.attendees.unwrap_or_default(),
            image: patch.image,
            created_at,
        }
    }

    pub fn into_event(self, id: ObjectId) -> Event {
        Event {
            id,
            event_type: self.event_type,
            uid: self.uid,
            name: self.name,
            tagline: self.tagline,
            schedule: self.schedule,
            description: self.description,
            moderator: self.moderator,
            category: self.category,
            sub_category: self.sub_category,
            rigor_rank: self.rigor_rank,
            attendees: self.attendees,
            image: self.image,
            created_at: self.created_at,
        }
    }
}

/// The fields supplied by a create or update request. `None` means "not
/// supplied".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPatch {
    pub event_type: Option<String>,
    pub uid: Option<String>,
    pub name: Option<String>,
    pub tagline: Option<String>,
    pub schedule: Option<String>,
    pub description: Option<String>,
    pub moderator: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub rigor_rank: Option<i64>,
    pub attendees: Option<Vec<String>>,
    pub image: Option<String>,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Raw text fields of a request body plus the filename of an uploaded image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFields {
    values: BTreeMap<String, String>,
    image: Option<String>,
}

impl EventFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later values for the same key replace earlier ones.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn set_image(&mut self, filename: impl Into<String>) {
        self.image = Some(filename.into());
    }

    /// Decodes the fields against the fixed event schema.
    pub fn into_patch(self) -> Result<EventPatch, AppError> {
        let mut patch = EventPatch::default();

        for (key, value) in self.values {
            match key.as_str() {
                "type" => patch.event_type = Some(value),
                "uid" => patch.uid = Some(value),
                "name" => patch.name = Some(value),
                "tagline" => patch.tagline = Some(value),
                "schedule" => patch.schedule = Some(value),
                "description" => patch.description = Some(value),
                "moderator" => patch.moderator = Some(value),
                "category" => patch.category = Some(value),
                "sub_category" => patch.sub_category = Some(value),
                "rigor_rank" => patch.rigor_rank = Some(parse_rigor_rank(&value)?),
                "attendees" => patch.attendees = Some(split_attendees(&value)),
                "image" => {
                    return Err(AppError::invalid("image must be uploaded as a file"));
                }
                other => return Err(AppError::invalid(format!("Unknown field: {}", other))),
            }
        }

        patch.image = self.image;
        Ok(patch)
    }
}

fn parse_rigor_rank(value: &str) -> Result<i64, AppError> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::invalid(format!("rigor_rank must be an integer, got '{}'", value)))
}

fn split_attendees(value: &str) -> Vec<String> {
    if value.is_empty() {
        return Vec::new();
    }
    value.split(',').map(String::from).collect()
}

/// JSON view of an [`Event`]: hex id, RFC 3339 timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventResponse {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub uid: Option<String>,
    pub name: Option<String>,
    pub tagline: Option<String>,
    pub schedule: Option<String>,
    pub description: Option<String>,
    pub moderator: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub rigor_rank: Option<i64>,
    pub attendees: Vec<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        Self {
            id: event.id.to_hex(),
            event_type: event.event_type,
            uid: event.uid,
            name: event.name,
            tagline: event.tagline,
            schedule: event.schedule,
            description: event.description,
            moderator: event.moderator,
            category: event.category,
            sub_category: event.sub_category,
            rigor_rank: event.rigor_rank,
            attendees: event.attendees,
            image: event.image,
            created_at: event.created_at,
        }
    }
}
