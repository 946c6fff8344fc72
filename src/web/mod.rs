//! HTTP surface
use std::num::NonZeroU16;
use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use sea_orm::DatabaseConnection;
use std::path::PathBuf;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::catalog::Catalog;
use crate::gemini::GeminiClient;
use crate::keys::KeyLoader;
use crate::store::ImageStore;

mod api;
mod images;
mod views;

/// Shared handler state
#[derive(Clone, Debug)]
pub struct AppState {
    store: Arc<ImageStore>,
    catalog: Catalog,
    gemini: GeminiClient,
    keys: KeyLoader,
}

impl AppState {
    /// Wires the store, catalog and client over one database and image directory
    pub fn new(
        db: DatabaseConnection,
        image_dir: impl Into<PathBuf>,
        gemini: GeminiClient,
        keys: KeyLoader,
    ) -> Self {
        let store = Arc::new(ImageStore::new(db, image_dir));
        let catalog = store.catalog();
        Self {
            store,
            catalog,
            gemini,
            keys,
        }
    }
}

fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(views::index_handler))
        .route("/static/styles.css", get(views::styles_handler))
        .route("/static/app.js", get(views::script_handler))
        .route("/get-api-key", get(api::get_api_key_handler))
        .route("/generate", post(api::generate_handler))
        .route("/images", get(api::images_handler))
        .route("/image/{filename}", get(images::serve_image_handler))
        .route("/delete/{filename}", delete(api::delete_handler))
        .route("/metadata", get(api::metadata_handler))
        .route("/reconcile", get(api::reconcile_handler))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

/// Binds `listen_addr:port` and serves until ctrl-c
pub async fn setup_server(
    listen_addr: &str,
    port: NonZeroU16,
    state: AppState,
) -> Result<(), anyhow::Error> {
    let app = create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", listen_addr, port);
    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", err);
    }
    Ok(())
}
