use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{encode_handler, health_handler, redirect_handler};
use crate::state::AppState;

pub struct App {}

impl App {
    /// Single-segment paths routed ahead of `/{alias}`.
    pub const RESERVED_PATHS: &'static [&'static str] = &["health", "encode"];

    /// Aliases that would be shadowed by a fixed route.
    pub fn reserved_aliases() -> Vec<String> {
        Self::RESERVED_PATHS.iter().map(ToString::to_string).collect()
    }

    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/encode", post(encode_handler))
            .route("/{alias}", get(redirect_handler))
            .layer(Self::cors())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    fn cors() -> CorsLayer {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::ORIGIN, header::CONTENT_TYPE])
            .expose_headers([header::CONTENT_LENGTH])
    }
}
