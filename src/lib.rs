pub mod api;
pub mod config;
pub mod models;
pub mod services;
pub mod utils;

use crate::api::middleware::request_id::{X_REQUEST_ID, request_id_middleware};
use crate::api::middleware::upload::upload_middleware;
use crate::config::UploadConfig;
use crate::services::upload::Uploader;
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::upload::upload_files,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            models::Uploads,
            models::AcceptedFile,
            models::FileError,
            models::SkippedFile,
            models::SkipReason,
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "uploads", description = "Multipart file uploads"),
        (name = "system", description = "Service status")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub uploader: Arc<Uploader>,
    pub config: UploadConfig,
}

impl AppState {
    pub fn new(config: UploadConfig) -> Result<Self, api::error::AppError> {
        let uploader = Uploader::from_config(&config)?;
        Ok(Self {
            uploader: Arc::new(uploader),
            config,
        })
    }
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn create_app(state: AppState) -> Router {
    let public_path = format!("/{}", state.uploader.upload_path());

    let trace_layer = TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
        let request_id = request
            .headers()
            .get(&X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown");
        tracing::info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    });

    let mut router = Router::new()
        .route("/health", get(api::handlers::health::health_check))
        .route("/api-docs/openapi.json", get(openapi_json))
        .route(
            "/upload",
            post(api::handlers::upload::upload_files).layer(from_fn_with_state(
                state.uploader.clone(),
                upload_middleware,
            )),
        );

    if public_path != "/" {
        router = router.nest_service(&public_path, ServeDir::new(state.uploader.upload_dir()));
    }

    router
        .layer(DefaultBodyLimit::max(state.config.body_limit))
        .layer(trace_layer)
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}
