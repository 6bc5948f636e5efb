use std::net::SocketAddr;
use std::sync::Arc;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use events_server::config::{Config, StoreBackend};
use events_server::routes::create_routes;
use events_server::state::AppState;
use events_server::store::{EventStore, InMemoryEventStore, MongoEventStore};

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let config = Config::from_env();

    let store: Arc<dyn EventStore> = match config.store_backend {
        StoreBackend::Mongo => Arc::new(
            MongoEventStore::connect(&config)
                .await
                .expect("Failed to connect to MongoDB"),
        ),
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory event store; data is lost on exit");
            Arc::new(InMemoryEventStore::new())
        }
    };

    let app = create_routes(AppState::new(store), &config);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server running at http://{}{}", addr, config.api_prefix);

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}
