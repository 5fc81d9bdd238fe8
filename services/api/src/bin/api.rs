//! services/api/src/bin/api.rs

use api_lib::{
    adapters::scripture::ScriptureApiAdapter,
    config::Config,
    error::ApiError,
    web::{
        get_edition_handler, get_verses_after_handler, get_verses_before_handler,
        get_verses_handler, list_editions_handler, rest::ApiDoc, state::AppState,
    },
};
use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Initialize the Scripture API Adapter ---
    let client = reqwest::Client::new();
    let repository = Arc::new(ScriptureApiAdapter::new(
        client,
        config.bible_api_base_url.clone(),
        config.bible_api_key.clone(),
    ));
    info!("Using scripture API at {}", config.bible_api_base_url);

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        repository,
        config: config.clone(),
    });

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .allowed_origin
                .parse::<HeaderValue>()
                .map_err(|e| ApiError::Internal(format!("Invalid ALLOWED_ORIGIN: {e}")))?,
        )
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([ACCEPT, CONTENT_TYPE]);

    // --- 4. Create the Web Router ---
    let api_router = Router::new()
        .route("/editions", get(list_editions_handler))
        .route("/editions/{edition_id}", get(get_edition_handler))
        .route("/verses/{edition_id}", get(get_verses_handler))
        .route(
            "/verses/{edition_id}/after/{verse_id}",
            get(get_verses_after_handler),
        )
        .route(
            "/verses/{edition_id}/before/{verse_id}",
            get(get_verses_before_handler),
        )
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
