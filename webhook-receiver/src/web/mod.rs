//! Web server module for receiving BitGo webhooks.
//!
//! This module provides a thin web server that:
//! - Checks content type, size and HMAC signature of inbound webhooks
//! - Classifies and logs the event
//! - Returns 200 OK immediately so the sender does not retry
//!
//! Routes:
//! - `GET /` plain-text liveness message
//! - `GET /health` JSON health check
//! - `POST /webhook/bitgo` webhook receiver

pub mod error;
pub mod handlers;
pub mod signature;

use std::any::Any;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::error;

pub use error::{ErrorResponse, WebhookError};
pub use handlers::{bitgo_webhook, health, root, AppState, HealthResponse, WebhookResponse};
pub use signature::{compute_signature, is_signature_verification_enabled, verify_signature};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_content_length;

    let routes = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/webhook/bitgo", post(bitgo_webhook));

    with_middleware(routes, body_limit).with_state(state)
}

/// Body limit, panic recovery and request tracing, innermost first.
fn with_middleware<S>(routes: Router<S>, body_limit: usize) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    routes
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
}

/// Turn a handler panic into a generic 500.
fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    error!(detail = %detail, "handler_panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "Internal server error".to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;
    use axum::{
        body::Body,
        http::{header, Request},
    };
    use chrono::{DateTime, Utc};
    use serde_json::Value;
    use tower::ServiceExt;

    const SECRET: &str = "bitgo-shared-secret";
    const DEPOSIT: &str = r#"{"type":"transfer","state":"confirmed","value":{"amount":"1.5","currency":"BTC"},"hash":"abc123"}"#;

    fn sign(secret: &str, body: &[u8]) -> String {
        compute_signature(secret, body).unwrap()
    }

    fn app(config: Config) -> Router {
        router(AppState::new(config))
    }

    fn signed_app() -> Router {
        app(Config {
            hmac_secret: Some(SECRET.to_string()),
            ..Config::default()
        })
    }

    fn webhook() -> axum::http::request::Builder {
        Request::builder()
            .method("POST")
            .uri("/webhook/bitgo")
            .header(header::CONTENT_TYPE, "application/json")
    }

    fn post_json(body: &'static str) -> Request<Body> {
        webhook().body(Body::from(body)).unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    fn json(body: &[u8]) -> Value {
        serde_json::from_slice(body).unwrap()
    }

    #[tokio::test]
    async fn test_root() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let (status, body) = send(app(Config::default()), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(String::from_utf8(body).unwrap(), "Finora backend is running 🚀");
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(Config::default()), request).await;

        assert_eq!(status, StatusCode::OK);
        let body = json(&body);
        assert_eq!(body["status"], "ok");

        let time = body["time"].as_str().unwrap();
        let parsed = DateTime::parse_from_rfc3339(time).unwrap();
        assert_eq!(parsed.offset().local_minus_utc(), 0);
        let age = Utc::now().signed_duration_since(parsed.with_timezone(&Utc));
        assert!(age.num_seconds().abs() < 60);
    }

    #[tokio::test]
    async fn test_deposit_without_secret() {
        let (status, body) = send(app(Config::default()), post_json(DEPOSIT)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body), serde_json::json!({"status": "OK"}));
    }

    #[tokio::test]
    async fn test_deposit_with_valid_signature() {
        let signature = sign(SECRET, DEPOSIT.as_bytes());
        let request = webhook()
            .header("X-Signature-SHA256", signature)
            .body(Body::from(DEPOSIT))
            .unwrap();
        let (status, body) = send(signed_app(), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["status"], "OK");
    }

    #[tokio::test]
    async fn test_fallback_header_with_prefix() {
        let signature = format!("sha256={}", sign(SECRET, DEPOSIT.as_bytes()));
        let request = webhook()
            .header("X-Hub-Signature-256", signature)
            .body(Body::from(DEPOSIT))
            .unwrap();
        let (status, _) = send(signed_app(), request).await;

        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_invalid_signature() {
        let request = webhook()
            .header("X-Signature-SHA256", sign("wrong", DEPOSIT.as_bytes()))
            .body(Body::from(DEPOSIT))
            .unwrap();
        let (status, body) = send(signed_app(), request).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json(&body)["error"], "Invalid signature");
    }

    #[tokio::test]
    async fn test_missing_signature() {
        let (status, _) = send(signed_app(), post_json(DEPOSIT)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_signature_covers_raw_bytes() {
        // Same JSON, different whitespace: the signature of the compact form must not match
        let spaced = r#"{ "type": "transfer", "state": "confirmed" }"#;
        let compact = r#"{"type":"transfer","state":"confirmed"}"#;
        let request = webhook()
            .header("X-Signature-SHA256", sign(SECRET, compact.as_bytes()))
            .body(Body::from(spaced))
            .unwrap();
        let (status, _) = send(signed_app(), request).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_wrong_content_type() {
        let request = Request::builder()
            .method("POST")
            .uri("/webhook/bitgo")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from(DEPOSIT))
            .unwrap();
        let (status, body) = send(app(Config::default()), request).await;

        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(
            json(&body)["error"],
            "Unsupported media type; send application/json"
        );
    }

    #[tokio::test]
    async fn test_missing_content_type() {
        let request = Request::builder()
            .method("POST")
            .uri("/webhook/bitgo")
            .body(Body::from(DEPOSIT))
            .unwrap();
        let (status, _) = send(app(Config::default()), request).await;

        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_content_type_with_charset() {
        let request = Request::builder()
            .method("POST")
            .uri("/webhook/bitgo")
            .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
            .body(Body::from(DEPOSIT))
            .unwrap();
        let (status, _) = send(app(Config::default()), request).await;

        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_declared_length_too_large() {
        let config = Config {
            max_content_length: 16,
            ..Config::default()
        };
        let request = webhook()
            .header(header::CONTENT_LENGTH, DEPOSIT.len())
            .body(Body::from(DEPOSIT))
            .unwrap();
        let (status, body) = send(app(config), request).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json(&body)["error"], "Payload too large");
    }

    #[tokio::test]
    async fn test_undeclared_body_too_large() {
        let config = Config {
            max_content_length: 16,
            ..Config::default()
        };
        let (status, body) = send(app(config), post_json(DEPOSIT)).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json(&body)["error"], "Payload too large");
    }

    #[tokio::test]
    async fn test_overflowing_content_length() {
        let request = webhook()
            .header(header::CONTENT_LENGTH, "99999999999999999999999")
            .body(Body::from("{}"))
            .unwrap();
        let (status, body) = send(app(Config::default()), request).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json(&body)["error"], "Payload too large");
    }

    #[tokio::test]
    async fn test_malformed_json() {
        let (status, body) = send(app(Config::default()), post_json("{not json")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json(&body)["error"], "Invalid JSON format");
    }

    #[tokio::test]
    async fn test_invalid_utf8() {
        let request = webhook()
            .body(Body::from(vec![b'{', 0xff, 0xfe, b'}']))
            .unwrap();
        let (status, _) = send(app(Config::default()), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_array_is_rejected() {
        let (status, body) = send(app(Config::default()), post_json("[1,2,3]")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json(&body)["error"], "JSON object required");
    }

    #[tokio::test]
    async fn test_number_is_rejected() {
        let (status, _) = send(app(Config::default()), post_json("42")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_empty_body_is_empty_object() {
        let (status, body) = send(app(Config::default()), post_json("")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["status"], "OK");
    }

    #[tokio::test]
    async fn test_other_event_types_are_acknowledged() {
        for payload in [
            r#"{"type":"wallet_confirmation"}"#,
            r#"{"type":"block","height":800000}"#,
            r#"{"type":"transfer","state":"unconfirmed"}"#,
            r#"{"type":12,"value":"odd"}"#,
        ] {
            let (status, body) = send(app(Config::default()), post_json(payload)).await;
            assert_eq!(status, StatusCode::OK, "payload: {}", payload);
            assert_eq!(json(&body)["status"], "OK");
        }
    }

    #[tokio::test]
    async fn test_get_on_webhook_not_allowed() {
        let request = Request::builder()
            .uri("/webhook/bitgo")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app(Config::default()), request).await;

        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    async fn boom() -> &'static str {
        panic!("secret detail")
    }

    #[tokio::test]
    async fn test_panic_becomes_500() {
        let state = AppState::new(Config::default());
        let routes = Router::new().route("/boom", get(boom));
        let app = with_middleware(routes, 1024).with_state(state);
        let request = Request::builder().uri("/boom").body(Body::empty()).unwrap();
        let (status, body) = send(app, request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let body = json(&body);
        assert_eq!(body["error"], "Internal server error");
        assert!(!body.to_string().contains("secret detail"));
    }
}
