//! Rolodex API - REST server
//!
//! Authentication (signup, login, rotating refresh tokens, email
//! confirmation) and per-account contact management over HTTP.

pub mod audit;
pub mod auth;
pub mod clock;
pub mod contacts;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::{http::HeaderValue, routing::get, Router};
use state::AppState;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Build the full application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/api-docs/openapi.json", get(openapi::openapi_json))
        .nest("/api", routes::api_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS policy from configured origins; empty or `*` allows any origin
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(parsed))
}

#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    //! Helpers for building an in-memory application in tests

    use crate::auth::mailer::RecordingMailer;
    use crate::auth::PasswordConfig;
    use crate::clock::FixedClock;
    use crate::state::AppState;
    use rolodex_core::{AppConfig, MemoryStore};
    use std::sync::Arc;

    /// In-memory state with a recording mailer and cheap password hashing
    pub fn memory_state(clock: FixedClock) -> (Arc<AppState>, Arc<RecordingMailer>) {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::new());

        let state = AppState::with_password_config(
            AppConfig::default(),
            store.clone(),
            store,
            mailer.clone(),
            Arc::new(clock),
            PasswordConfig::light(),
        )
        .expect("light password parameters are valid");

        (Arc::new(state), mailer)
    }
}

/// Router over in-memory storage, pinned to 8 June 2024
#[cfg(any(test, feature = "test-utils"))]
pub fn create_router_for_testing() -> Router {
    let date = chrono::NaiveDate::from_ymd_opt(2024, 6, 8).unwrap_or_default();
    let (state, _) = testing::memory_state(clock::FixedClock::on(date));
    create_router(state)
}
