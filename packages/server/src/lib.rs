pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod ratelimit;
pub mod routes;
pub mod service;
pub mod state;

use axum::http::{HeaderName, HeaderValue, Method};
use axum::routing::get;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::CorsConfig;
use crate::state::AppState;

/// Build the application router with the full middleware stack.
///
/// Request flow: request id -> CORS -> per-IP rate limit -> routes. API-key
/// auth is enforced per-handler under `/api/v1`; `/health` stays public.
pub fn build_router(state: AppState) -> axum::Router {
    let cors = cors_layer(&state.config.cors);
    let (api_router, _openapi) = routes::api_routes().split_for_parts();

    axum::Router::new()
        .route("/health", get(handlers::health::health))
        .nest("/api", api_router)
        .with_state(state.clone())
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::ip_rate_limit,
        ))
        .layer(cors)
        .layer(axum::middleware::from_fn(middleware::request_id))
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins = if config.allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            config
                .allowed_origins
                .iter()
                .filter_map(|o| o.parse::<HeaderValue>().ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(
            config
                .allowed_methods
                .iter()
                .filter_map(|m| m.parse::<Method>().ok())
                .collect::<Vec<_>>(),
        )
        .allow_headers(
            config
                .allowed_headers
                .iter()
                .filter_map(|h| h.parse::<HeaderName>().ok())
                .collect::<Vec<_>>(),
        )
}
