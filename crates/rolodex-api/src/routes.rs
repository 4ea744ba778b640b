//! API route definitions

use crate::auth::middleware::auth_middleware;
use crate::handlers::{auth, contacts, users};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;

/// Routes mounted under `/api`
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no access token required)
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/refresh", post(auth::refresh_handler))
        .route(
            "/auth/confirmed_email/:token",
            get(auth::confirmed_email_handler),
        )
        .route("/auth/request_email", post(auth::request_email_handler))
        .route(
            "/auth/request_password_reset",
            post(auth::request_password_reset_handler),
        )
        .route("/auth/reset_password", post(auth::reset_password_handler));

    // Protected routes (access token required)
    let protected_routes = Router::new()
        .route("/auth/logout", post(auth::logout_handler))
        .route("/users/me", get(users::me_handler))
        .route("/users/avatar", patch(users::update_avatar_handler))
        .route(
            "/contacts",
            get(contacts::list_contacts).post(contacts::create_contact),
        )
        .route("/contacts/filter/search", get(contacts::search_contacts))
        .route(
            "/contacts/:id",
            get(contacts::get_contact)
                .put(contacts::update_contact)
                .delete(contacts::delete_contact),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}
