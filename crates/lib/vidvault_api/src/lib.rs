//! # vidvault_api
//!
//! HTTP API library for vidvault.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::handler::Handler;
use axum::http::HeaderValue;
use axum::http::header::CACHE_CONTROL;
use axum::routing::{get, post};
use sqlx::SqlitePool;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use vidvault_core::ingest::{IngestionOrchestrator, UploadKind};
use vidvault_core::storage::ObjectStore;

use crate::config::ApiConfig;
use crate::handlers::{admin, auth, uploads, users, videos};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection pool.
    pub pool: SqlitePool,
    /// API configuration.
    pub config: Arc<ApiConfig>,
    /// Upload pipeline.
    pub ingest: Arc<IngestionOrchestrator>,
    /// Store holding video objects, used to sign retrieval URLs.
    pub video_store: Arc<dyn ObjectStore>,
}

/// Run embedded database migrations.
pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    vidvault_core::migrate::migrate(pool).await
}

/// Request body ceiling for an upload route.
fn body_limit(state: &AppState, kind: UploadKind) -> DefaultBodyLimit {
    let limit = state.ingest.max_bytes(kind);
    DefaultBodyLimit::max(usize::try_from(limit).unwrap_or(usize::MAX))
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route("/api/users", post(users::create_user_handler))
        .route("/api/login", post(auth::login_handler))
        .route("/api/refresh", post(auth::refresh_handler))
        .route("/api/revoke", post(auth::revoke_handler))
        .route("/admin/reset", post(admin::reset_handler));

    // Protected routes (require an access token)
    let protected = Router::new()
        .route(
            "/api/videos",
            get(videos::list_videos_handler).post(videos::create_video_handler),
        )
        .route(
            "/api/videos/{id}",
            get(videos::get_video_handler)
                .delete(videos::delete_video_handler)
                .put(
                    uploads::upload_thumbnail_handler
                        .layer(body_limit(&state, UploadKind::Thumbnail)),
                ),
        )
        .route(
            "/api/video_upload/{id}",
            post(uploads::upload_video_handler.layer(body_limit(&state, UploadKind::Video))),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    let app_files = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .service(ServeDir::new(&state.config.app_dir));

    let asset_files = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("max-age=3600"),
        ))
        .service(ServeDir::new(&state.config.assets_dir));

    Router::new()
        .merge(public)
        .merge(protected)
        .nest_service("/app", app_files)
        .nest_service("/assets", asset_files)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
