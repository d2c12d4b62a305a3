//! Catalog API - product catalog REST server

use axum_helpers::server::{create_production_app, create_router, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_products::{Datastore, MemoryDatastore, MongoDatastore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    info!(
        app = config.app.name,
        version = config.app.version,
        backend = %config.backend,
        "Starting catalog API"
    );

    let mut mongo_client = None;
    let datastore: Arc<dyn Datastore> = match &config.mongodb {
        Some(mongo_config) => {
            info!("Connecting to MongoDB at {}", mongo_config.url());

            let client =
                database::mongodb::connect_from_config_with_retry(mongo_config, None).await?;
            let db = client.database(mongo_config.database());

            info!(
                "Successfully connected to MongoDB database: {}",
                mongo_config.database()
            );
            mongo_client = Some(client);
            Arc::new(MongoDatastore::new(&db))
        }
        None => {
            warn!("Using the in-memory datastore; products are lost on restart");
            Arc::new(MemoryDatastore::new())
        }
    };

    let state = AppState {
        config: config.clone(),
        datastore,
        mongo_client,
    };

    let api_routes = api::routes(&state);
    let router =
        create_router::<openapi::ApiDoc>(api_routes, &config.server, &config.environment).await?;
    let app = router
        .merge(health_router())
        .merge(api::health::router(state.clone()));

    info!("Starting catalog API on port {}", config.server.port);

    create_production_app(
        app,
        &config.server,
        Duration::from_secs(30),
        async move {
            if let Some(client) = state.mongo_client {
                info!("Shutting down: closing MongoDB connections");
                client.shutdown().await;
                info!("MongoDB connection closed");
            }
        },
    )
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Catalog API shutdown complete");
    Ok(())
}
