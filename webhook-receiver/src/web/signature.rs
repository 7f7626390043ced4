//! Webhook body signature verification.
//!
//! The sender signs the raw request body with HMAC-SHA256 using a shared
//! secret and sends the hex digest in a header. The provider's exact header
//! format is not pinned down, so both a bare hex digest and an `<algo>=<hex>`
//! form (e.g. `sha256=...`) are accepted.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Verify an HMAC-SHA256 signature over the raw request body.
///
/// # Arguments
///
/// * `secret` - The shared webhook secret. Empty disables verification.
/// * `body` - The exact bytes received on the wire
/// * `received` - The signature header value, possibly empty or prefixed
///
/// # Returns
///
/// `true` when verification is disabled or the signature matches,
/// `false` otherwise.
pub fn verify_signature(secret: &str, body: &[u8], received: &str) -> bool {
    if secret.is_empty() {
        return true;
    }

    let received = strip_algorithm_prefix(received.trim()).trim();
    if received.is_empty() {
        return false;
    }

    let expected = match compute_signature(secret, body) {
        Some(sig) => sig,
        None => {
            warn!("webhook_signature_invalid_key");
            return false;
        }
    };

    constant_time_compare(&expected, &received.to_ascii_lowercase())
}

/// Compute the lowercase hex HMAC-SHA256 of `body` keyed with `secret`.
///
/// Returns `None` only if the key is rejected by the MAC implementation.
pub fn compute_signature(secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Drop an `<algo>=` prefix, keeping everything after the first `=`.
fn strip_algorithm_prefix(signature: &str) -> &str {
    match signature.split_once('=') {
        Some((_, digest)) => digest,
        None => signature,
    }
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Check if signature verification is enabled.
pub fn is_signature_verification_enabled(secret: &Option<String>) -> bool {
    secret
        .as_ref()
        .map(|k| !k.trim().is_empty())
        .unwrap_or(false)
}
