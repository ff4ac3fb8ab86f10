use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{auth, events};

/// Assembles every route with CORS and request tracing.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.frontend_origin);

    Router::new()
        .route("/health", get(health))
        .nest("/auth", auth::router())
        .merge(events::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// The frontend sends the session cookie cross-origin, so the origin has to be exact.
fn cors_layer(frontend_origin: &str) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    match HeaderValue::from_str(frontend_origin) {
        Ok(origin) => base.allow_origin(origin).allow_credentials(true),
        Err(_) => {
            tracing::warn!("FRONTEND_ORIGIN {} is not a valid header value", frontend_origin);
            base
        }
    }
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}
