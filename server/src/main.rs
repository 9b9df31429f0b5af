use std::error::Error;
use std::sync::Arc;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use ticketing_server::config::{Config, StorageBackend};
use ticketing_server::payments::{CheckoutProvider, StripeCheckoutProvider};
use ticketing_server::routes::create_routes;
use ticketing_server::state::AppState;
use ticketing_server::store::{MemoryStore, PgStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ticketing_server=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn Store> = match config.storage_backend {
        StorageBackend::Postgres => {
            let store = PgStore::connect(&config).await?;
            store.run_migrations().await?;
            Arc::new(store)
        }
        StorageBackend::Memory => {
            let store = MemoryStore::new();
            let (event, ticket_types) = store.seed_demo_catalog().await;
            tracing::warn!(
                event_id = %event.id,
                ticket_types = ticket_types.len(),
                "Using in-memory store; data is lost on shutdown"
            );
            Arc::new(store)
        }
    };

    let provider: Option<Arc<dyn CheckoutProvider>> =
        match StripeCheckoutProvider::from_config(&config.payments)? {
            Some(provider) => Some(Arc::new(provider)),
            None => {
                tracing::warn!("STRIPE_SECRET_KEY not set; paid checkout is disabled");
                None
            }
        };
    if config.payments.webhook_secret.is_none() {
        tracing::warn!("STRIPE_WEBHOOK_SECRET not set; payment webhooks will be refused");
    }

    let state = AppState::new(&config, store, provider);
    let app = create_routes(state, &config);

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("🚀 Server running at http://{}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
