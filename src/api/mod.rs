//! HTTP surface: JSON API under `/api` plus the optional prebuilt frontend.

mod error;
mod handlers;
mod request_id;

use std::path::Path;

use axum::Router;
use axum::http::{HeaderName, HeaderValue};
use axum::middleware;
use axum::routing::{get, post};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tracing::{info, warn};

use crate::app::SongService;

pub use error::ApiError;
pub use handlers::HealthResponse;
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub service: SongService,
}

impl AppState {
    pub fn new(service: SongService) -> Self {
        Self { service }
    }
}

pub fn build_router(
    state: AppState,
    static_dir: Option<&Path>,
    cors_origins: &[String],
) -> Router {
    let api = Router::new()
        .route("/health", get(handlers::health))
        .route("/song/generate", post(handlers::generate_song))
        .route("/song/extend", post(handlers::extend_song))
        .route("/song/providers", get(handlers::list_providers))
        .fallback(handlers::api_not_found);

    let mut router = Router::new().nest("/api", api).with_state(state);

    match static_dir {
        Some(dir) if dir.is_dir() => {
            info!("serving frontend from {}", dir.display());
            let index = ServeFile::new(dir.join("index.html"));
            router = router.fallback_service(ServeDir::new(dir).fallback(index));
        }
        Some(dir) => warn!("static directory {} not found, frontend disabled", dir.display()),
        None => {}
    }

    router
        .layer(cors_layer(cors_origins))
        .layer(middleware::from_fn(request_id_middleware))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("ignoring invalid CORS origin {origin:?}");
                None
            }
        })
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
}
