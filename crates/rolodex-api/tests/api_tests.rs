//! API Integration Tests
//!
//! Every test drives the full router over in-memory storage with the clock
//! pinned to 8 June 2024.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use rolodex_api::auth::mailer::RecordingMailer;
use rolodex_api::clock::FixedClock;
use rolodex_api::{create_router, create_router_for_testing, testing::memory_state};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    mailer: Arc<RecordingMailer>,
}

impl TestApp {
    fn new() -> Self {
        let today = NaiveDate::from_ymd_opt(2024, 6, 8).unwrap();
        let (state, mailer) = memory_state(FixedClock::on(today));
        Self {
            router: create_router(state),
            mailer,
        }
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(json_body) => builder
                .body(Body::from(serde_json::to_string(&json_body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn signup(&self, email: &str) -> (StatusCode, Value) {
        self.send(
            "POST",
            "/api/auth/signup",
            None,
            Some(json!({
                "email": email,
                "display_name": "Tester",
                "password": "secret123"
            })),
        )
        .await
    }

    async fn confirm(&self, email: &str) {
        let token = self.mailer.verification_token(email).unwrap();
        let (status, _) = self
            .send("GET", &format!("/api/auth/confirmed_email/{token}"), None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.send(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    /// Sign up, confirm and log in; returns (access, refresh)
    async fn account(&self, email: &str) -> (String, String) {
        let (status, _) = self.signup(email).await;
        assert_eq!(status, StatusCode::CREATED);
        self.confirm(email).await;

        let (status, body) = self.login(email, "secret123").await;
        assert_eq!(status, StatusCode::OK);
        (
            body["access_token"].as_str().unwrap().to_string(),
            body["refresh_token"].as_str().unwrap().to_string(),
        )
    }
}

fn contact(name: &str, email: &str, date_of_birth: &str) -> Value {
    json!({
        "name": name,
        "last_name": "Doe",
        "email": email,
        "phone_number": "+380501234567",
        "date_of_birth": date_of_birth,
        "additional_data": "met at conference"
    })
}

// =============================================================================
// Health and docs
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["status"], "ok");
    assert_eq!(json["store"], "memory");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_openapi_document_served() {
    let app = TestApp::new();
    let (status, body) = app.send("GET", "/api-docs/openapi.json", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/auth/signup"]["post"].is_object());
}

// =============================================================================
// Signup and login
// =============================================================================

#[tokio::test]
async fn test_signup_returns_unconfirmed_public_account() {
    let app = TestApp::new();
    let (status, body) = app.signup("john@example.com").await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], "john@example.com");
    assert_eq!(body["confirmed"], false);
    assert!(body.get("password_hash").is_none());
    assert!(body.get("refresh_token").is_none());
    assert!(app.mailer.verification_token("john@example.com").is_some());
}

#[tokio::test]
async fn test_signup_duplicate_email_any_case() {
    let app = TestApp::new();
    app.signup("john@example.com").await;

    let (status, body) = app.signup("John@EXAMPLE.com").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "EMAIL_ALREADY_REGISTERED");
}

#[tokio::test]
async fn test_signup_validation_error() {
    let app = TestApp::new();
    let (status, body) = app
        .send(
            "POST",
            "/api/auth/signup",
            None,
            Some(json!({
                "email": "john@example.com",
                "display_name": "Tester",
                "password": "123"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["details"].as_str().unwrap().starts_with("password"));
}

#[tokio::test]
async fn test_login_before_confirmation() {
    let app = TestApp::new();
    app.signup("john@example.com").await;

    let (status, body) = app.login("john@example.com", "secret123").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "EMAIL_NOT_CONFIRMED");
}

#[tokio::test]
async fn test_login_wrong_password_and_unknown_email() {
    let app = TestApp::new();
    app.account("john@example.com").await;

    let (status, body) = app.login("john@example.com", "wrong-pass").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_CREDENTIALS");

    let (status, body) = app.login("nobody@example.com", "secret123").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_login_returns_bearer_pair() {
    let app = TestApp::new();
    app.signup("john@example.com").await;
    app.confirm("john@example.com").await;

    let (status, body) = app.login("john@example.com", "secret123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    assert_ne!(body["access_token"], body["refresh_token"]);

    let access = body["access_token"].as_str().unwrap();
    let (status, me) = app.send("GET", "/api/users/me", Some(access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "john@example.com");
    assert_eq!(me["confirmed"], true);
}

#[tokio::test]
async fn test_confirm_email_twice() {
    let app = TestApp::new();
    app.signup("john@example.com").await;
    let token = app.mailer.verification_token("john@example.com").unwrap();
    let uri = format!("/api/auth/confirmed_email/{token}");

    let (_, first) = app.send("GET", &uri, None, None).await;
    let (status, second) = app.send("GET", &uri, None, None).await;

    assert_eq!(first["message"], "Email confirmed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["message"], "Your email is already confirmed");
}

#[tokio::test]
async fn test_request_email_resends_only_when_unconfirmed() {
    let app = TestApp::new();
    app.signup("john@example.com").await;

    let (status, _) = app
        .send(
            "POST",
            "/api/auth/request_email",
            None,
            Some(json!({ "email": "john@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.mailer.sent().len(), 2);

    let (status, _) = app
        .send(
            "POST",
            "/api/auth/request_email",
            None,
            Some(json!({ "email": "nobody@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.mailer.sent().len(), 2);
}

// =============================================================================
// Tokens
// =============================================================================

#[tokio::test]
async fn test_refresh_rotates_tokens() {
    let app = TestApp::new();
    let (_, refresh) = app.account("john@example.com").await;

    let (status, body) = app
        .send("POST", "/api/auth/refresh", Some(&refresh), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let rotated = body["refresh_token"].as_str().unwrap().to_string();
    assert_ne!(rotated, refresh);

    let (status, body) = app
        .send("POST", "/api/auth/refresh", Some(&refresh), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "REFRESH_TOKEN_REVOKED");

    let (status, _) = app
        .send("POST", "/api/auth/refresh", Some(&rotated), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_token_kinds_are_not_interchangeable() {
    let app = TestApp::new();
    let (access, refresh) = app.account("john@example.com").await;

    let (status, body) = app
        .send("POST", "/api/auth/refresh", Some(&access), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "TOKEN_KIND_MISMATCH");

    let (status, _) = app.send("GET", "/api/users/me", Some(&refresh), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_without_token() {
    let app = TestApp::new();
    let (status, body) = app.send("POST", "/api/auth/refresh", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_logout_revokes_refresh_token() {
    let app = TestApp::new();
    let (access, refresh) = app.account("john@example.com").await;

    let (status, _) = app
        .send("POST", "/api/auth/logout", Some(&access), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app
        .send("POST", "/api/auth/refresh", Some(&refresh), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "REFRESH_TOKEN_REVOKED");
}

#[tokio::test]
async fn test_password_reset_flow() {
    let app = TestApp::new();
    let (_, refresh) = app.account("john@example.com").await;

    let (status, _) = app
        .send(
            "POST",
            "/api/auth/request_password_reset",
            None,
            Some(json!({ "email": "john@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = app.mailer.reset_token("john@example.com").unwrap();

    let (status, _) = app
        .send(
            "POST",
            "/api/auth/reset_password",
            None,
            Some(json!({ "token": token, "new_password": "another-secret" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(
            "POST",
            "/api/auth/reset_password",
            None,
            Some(json!({ "token": token, "new_password": "replayed-secret" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send("POST", "/api/auth/refresh", Some(&refresh), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.login("john@example.com", "another-secret").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_update_avatar() {
    let app = TestApp::new();
    let (access, _) = app.account("john@example.com").await;

    let (status, body) = app
        .send(
            "PATCH",
            "/api/users/avatar",
            Some(&access),
            Some(json!({ "avatar": "https://img.example.com/john.png" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["avatar"], "https://img.example.com/john.png");

    let (status, _) = app
        .send(
            "PATCH",
            "/api/users/avatar",
            Some(&access),
            Some(json!({ "avatar": "ftp-ish nonsense" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// =============================================================================
// Contacts
// =============================================================================

#[tokio::test]
async fn test_contacts_require_authentication() {
    let app = TestApp::new();

    let (status, _) = app.send("GET", "/api/contacts", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send("GET", "/api/contacts", Some("garbage.token.value"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_then_get_returns_identical_fields() {
    let app = TestApp::new();
    let (access, _) = app.account("owner@example.com").await;
    let payload = contact("John", "john@example.com", "1990-06-10");

    let (status, created) = app
        .send("POST", "/api/contacts", Some(&access), Some(payload.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created.get("owner_id").is_none());

    let id = created["id"].as_i64().unwrap();
    let (status, fetched) = app
        .send("GET", &format!("/api/contacts/{id}"), Some(&access), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    for field in [
        "name",
        "last_name",
        "email",
        "phone_number",
        "date_of_birth",
        "additional_data",
    ] {
        assert_eq!(fetched[field], payload[field], "field {field}");
    }
}

#[tokio::test]
async fn test_contact_update_and_delete() {
    let app = TestApp::new();
    let (access, _) = app.account("owner@example.com").await;

    let (_, created) = app
        .send(
            "POST",
            "/api/contacts",
            Some(&access),
            Some(contact("John", "john@example.com", "1990-06-10")),
        )
        .await;
    let uri = format!("/api/contacts/{}", created["id"]);

    let (status, updated) = app
        .send(
            "PUT",
            &uri,
            Some(&access),
            Some(contact("Johnny", "johnny@example.com", "1990-06-11")),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Johnny");
    assert_eq!(updated["id"], created["id"]);

    let (status, deleted) = app.send("DELETE", &uri, Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["email"], "johnny@example.com");

    let (status, body) = app.send("GET", &uri, Some(&access), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_contacts_are_isolated_between_accounts() {
    let app = TestApp::new();
    let (alice, _) = app.account("alice@example.com").await;
    let (bob, _) = app.account("bob@example.com").await;

    let (_, created) = app
        .send(
            "POST",
            "/api/contacts",
            Some(&bob),
            Some(contact("Carol", "carol@example.com", "1985-03-03")),
        )
        .await;
    let uri = format!("/api/contacts/{}", created["id"]);

    let (status, _) = app.send("GET", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(
            "PUT",
            &uri,
            Some(&alice),
            Some(contact("Mallory", "carol@example.com", "1985-03-03")),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.send("DELETE", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listed) = app.send("GET", "/api/contacts", Some(&alice), None).await;
    assert_eq!(listed, json!([]));

    let (status, still) = app.send("GET", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(still["name"], "Carol");
}

#[tokio::test]
async fn test_contact_validation_and_duplicates() {
    let app = TestApp::new();
    let (access, _) = app.account("owner@example.com").await;

    let mut bad_phone = contact("John", "john@example.com", "1990-06-10");
    bad_phone["phone_number"] = json!("0123");
    let (status, body) = app
        .send("POST", "/api/contacts", Some(&access), Some(bad_phone))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["details"].as_str().unwrap().starts_with("phone_number"));

    let (status, body) = app
        .send(
            "POST",
            "/api/contacts",
            Some(&access),
            Some(contact("Future", "future@example.com", "2024-06-09")),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["details"].as_str().unwrap().starts_with("date_of_birth"));

    app.send(
        "POST",
        "/api/contacts",
        Some(&access),
        Some(contact("John", "john@example.com", "1990-06-10")),
    )
    .await;
    let (status, body) = app
        .send(
            "POST",
            "/api/contacts",
            Some(&access),
            Some(contact("Other", "JOHN@example.com", "1990-06-10")),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "DUPLICATE_CONTACT_EMAIL");
}

#[tokio::test]
async fn test_list_pagination() {
    let app = TestApp::new();
    let (access, _) = app.account("owner@example.com").await;

    for i in 0..4 {
        app.send(
            "POST",
            "/api/contacts",
            Some(&access),
            Some(contact(&format!("c{i}"), &format!("c{i}@example.com"), "1990-01-01")),
        )
        .await;
    }

    let (status, page) = app
        .send("GET", "/api/contacts?skip=1&limit=2", Some(&access), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = page
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["c1", "c2"]);
}

#[tokio::test]
async fn test_search_filters() {
    let app = TestApp::new();
    let (access, _) = app.account("owner@example.com").await;

    for (name, email, dob) in [
        ("John", "john@example.com", "1990-06-10"),
        ("Jane", "jane@example.com", "1990-06-20"),
        ("Bob", "bob@example.com", "1980-12-01"),
    ] {
        app.send(
            "POST",
            "/api/contacts",
            Some(&access),
            Some(contact(name, email, dob)),
        )
        .await;
    }

    let names = |body: &Value| -> Vec<String> {
        body.as_array()
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap().to_string())
            .collect()
    };

    let (_, body) = app
        .send(
            "GET",
            "/api/contacts/filter/search?email=JOHN%40EXAMPLE.COM",
            Some(&access),
            None,
        )
        .await;
    assert_eq!(names(&body), vec!["John"]);

    let (_, body) = app
        .send(
            "GET",
            "/api/contacts/filter/search?upcoming_birthdays=true",
            Some(&access),
            None,
        )
        .await;
    assert_eq!(names(&body), vec!["John"]);

    let (_, body) = app
        .send(
            "GET",
            "/api/contacts/filter/search?name=j&surname=doe",
            Some(&access),
            None,
        )
        .await;
    assert_eq!(names(&body), vec!["John", "Jane"]);

    let (_, body) = app
        .send(
            "GET",
            "/api/contacts/filter/search?name=%25",
            Some(&access),
            None,
        )
        .await;
    assert!(names(&body).is_empty());
}
