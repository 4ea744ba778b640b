//! OpenAPI document

use crate::auth::{
    AvatarRequest, EmailRequest, LoginRequest, ResetPasswordRequest, SignupRequest, TokenPair,
};
use crate::error::ApiError;
use crate::handlers::{auth, auth::MessageResponse, contacts, health, health::HealthResponse, users};
use axum::Json;
use rolodex_core::{AccountPublic, Contact, ContactFields, CreateContact, UpdateContact};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(title = "Rolodex API", description = "Multi-tenant contact directory"),
    paths(
        health::health_check,
        auth::signup_handler,
        auth::login_handler,
        auth::refresh_handler,
        auth::logout_handler,
        auth::confirmed_email_handler,
        auth::request_email_handler,
        auth::request_password_reset_handler,
        auth::reset_password_handler,
        users::me_handler,
        users::update_avatar_handler,
        contacts::list_contacts,
        contacts::get_contact,
        contacts::create_contact,
        contacts::update_contact,
        contacts::delete_contact,
        contacts::search_contacts,
    ),
    components(schemas(
        ApiError,
        AccountPublic,
        Contact,
        ContactFields,
        CreateContact,
        UpdateContact,
        SignupRequest,
        LoginRequest,
        EmailRequest,
        ResetPasswordRequest,
        AvatarRequest,
        TokenPair,
        MessageResponse,
        HealthResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Signup, login and token management"),
        (name = "users", description = "Current account profile"),
        (name = "contacts", description = "Contacts owned by the current account"),
        (name = "health", description = "Service health"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Serve the OpenAPI document as JSON
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
