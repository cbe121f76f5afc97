//! Stationery Cart - cart API server

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use stationery_cart::api::{router, AppState};
use stationery_cart::catalog::{MemoryCatalog, PgCatalog, ProductCatalog};
use stationery_cart::config::AppConfig;
use stationery_cart::events::EventPublisher;
use stationery_cart::store::{CartRepository, MemoryCartStore, PgCartStore};
use stationery_cart::CartService;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = AppConfig::from_env()?;

    let (repo, catalog): (Arc<dyn CartRepository>, Arc<dyn ProductCatalog>) = match &config.database_url {
        Some(url) => {
            let db = PgPoolOptions::new().max_connections(config.db_max_connections).connect(url).await?;
            sqlx::migrate!("./migrations").run(&db).await?;
            tracing::info!("connected to postgres, migrations applied");
            (Arc::new(PgCartStore::new(db.clone())), Arc::new(PgCatalog::new(db)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; carts and catalog are held in memory and lost on restart");
            (Arc::new(MemoryCartStore::new()), Arc::new(MemoryCatalog::new()))
        }
    };

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => { tracing::warn!(error = %e, "NATS unavailable; cart events disabled"); None }
        },
        None => None,
    };

    let state = AppState { cart: CartService::new(repo, catalog, EventPublisher::new(nats)) };
    let app = router(state);

    let addr = config.bind_addr();
    tracing::info!("stationery-cart listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app)
        .with_graceful_shutdown(async { tokio::signal::ctrl_c().await.ok(); })
        .await?;
    Ok(())
}
