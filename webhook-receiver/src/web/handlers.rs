//! HTTP endpoint handlers.
//!
//! The webhook handler runs its checks in a fixed order and returns as soon
//! as one fails:
//! 1. Content type
//! 2. Declared size
//! 3. Raw body read (bounded)
//! 4. Signature over the raw bytes
//! 5. JSON parse
//!
//! Once all checks pass the event is classified, logged and acknowledged
//! with 200 regardless of its type, so the sender never retries.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, warn};

use crate::event::{parse_event, process_event};
use crate::web::error::WebhookError;
use crate::web::signature::verify_signature;
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

// =============================================================================
// Root and Health Check
// =============================================================================

/// Plain-text liveness message.
pub async fn root() -> &'static str {
    "Finora backend is running 🚀"
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Current UTC time, RFC 3339
    pub time: String,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        time: Utc::now().to_rfc3339(),
    })
}

// =============================================================================
// BitGo Webhook
// =============================================================================

/// Webhook acknowledgment.
#[derive(Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
}

/// BitGo webhook endpoint.
///
/// The body is taken as raw bytes because the signature covers the exact
/// bytes sent, not a re-serialisation of the parsed JSON.
pub async fn bitgo_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<WebhookResponse>, WebhookError> {
    let config = &state.config;

    if !is_json_content_type(&headers) {
        warn!(
            content_type = ?headers.get(header::CONTENT_TYPE),
            "webhook_unsupported_media_type"
        );
        return Err(WebhookError::UnsupportedMediaType);
    }

    if let Some(declared) = declared_content_length(&headers) {
        if declared > config.max_content_length as u64 {
            warn!(
                content_length = declared,
                max_content_length = config.max_content_length,
                "webhook_payload_too_large"
            );
            return Err(WebhookError::PayloadTooLarge);
        }
    }

    let body = match body {
        Ok(bytes) => bytes,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            warn!(
                max_content_length = config.max_content_length,
                "webhook_payload_too_large"
            );
            return Err(WebhookError::PayloadTooLarge);
        }
        Err(rejection) => {
            warn!(error = %rejection, "webhook_body_read_failed");
            return Err(WebhookError::BodyRead);
        }
    };

    let signature = find_signature(&headers, &config.signature_headers);
    let secret = config.hmac_secret.as_deref().unwrap_or("");
    if !verify_signature(secret, &body, signature.unwrap_or("")) {
        warn!(
            has_signature = signature.is_some(),
            signature_length = signature.map(str::len).unwrap_or(0),
            body_length = body.len(),
            "webhook_signature_invalid"
        );
        return Err(WebhookError::InvalidSignature);
    }

    let value: Value = if body.is_empty() {
        Value::Object(Map::new())
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            error!(error = %e, body_length = body.len(), "webhook_json_invalid");
            WebhookError::InvalidJson(e)
        })?
    };

    let Value::Object(object) = value else {
        warn!("webhook_json_not_object");
        return Err(WebhookError::NotAnObject);
    };

    let event = parse_event(object).map_err(|e| WebhookError::Internal(e.to_string()))?;
    process_event(&event);

    Ok(Json(WebhookResponse { status: "OK" }))
}

/// Whether the `Content-Type` header mentions `application/json`.
fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false)
}

/// Parse `Content-Length`. A digit string too long for `u64` saturates
/// instead of counting as undeclared.
fn declared_content_length(headers: &HeaderMap) -> Option<u64> {
    let raw = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())?
        .trim();

    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    Some(raw.parse().unwrap_or(u64::MAX))
}

/// Return the first configured signature header that is present and non-empty.
fn find_signature<'a>(headers: &'a HeaderMap, names: &[String]) -> Option<&'a str> {
    names.iter().find_map(|name| {
        headers
            .get(name.as_str())
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    })
}
