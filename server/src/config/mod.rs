use std::env;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_MONGODB_URI: &str = "mongodb://127.0.0.1:27017";
const DEFAULT_DATABASE: &str = "dt_events_db";
const DEFAULT_COLLECTION: &str = "events";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_API_PREFIX: &str = "/api/v3/app";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

/// Which [`EventStore`](crate::store::EventStore) backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

impl StoreBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "mongo" | "mongodb" => Some(Self::Mongo),
            "memory" | "in-memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mongodb_uri: String,
    pub database_name: String,
    pub collection_name: String,
    pub store_backend: StoreBackend,
    pub port: u16,
    pub api_prefix: String,
    pub max_upload_bytes: usize,
    pub cors_allowed_origins: String,
    pub production: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source. Missing or
    /// unparsable values fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let store_backend = match lookup("EVENTS_STORE") {
            Some(value) => StoreBackend::parse(&value).unwrap_or_else(|| {
                tracing::warn!("Config: unknown EVENTS_STORE '{}', using mongo", value);
                StoreBackend::Mongo
            }),
            None => StoreBackend::Mongo,
        };

        Self {
            mongodb_uri: lookup("MONGODB_URI").unwrap_or_else(|| DEFAULT_MONGODB_URI.to_string()),
            database_name: lookup("MONGODB_DATABASE")
                .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            collection_name: lookup("EVENTS_COLLECTION")
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            store_backend,
            port: lookup("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            api_prefix: normalize_prefix(
                &lookup("API_PREFIX").unwrap_or_else(|| DEFAULT_API_PREFIX.to_string()),
            ),
            max_upload_bytes: lookup("MAX_UPLOAD_BYTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string()),
            production: lookup("RUST_ENV")
                .map(|v| v.to_lowercase() == "production")
                .unwrap_or(false),
        }
    }
}

// "" and "/" both mean "mount at the root"; anything else gets exactly one
// leading slash and no trailing one, which is what Router::nest expects.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}
