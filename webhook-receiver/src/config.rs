//! Configuration module for environment variable parsing.
//!
//! All settings are read once at startup and stay immutable for the
//! lifetime of the process.

use std::env;
use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;

use anyhow::{Context, Result};
use tracing::warn;

/// Default cap on the request body, 1 MiB.
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 1024 * 1024;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 4000;

/// Headers checked for the webhook signature, in lookup order.
pub const DEFAULT_SIGNATURE_HEADERS: [&str; 2] = ["X-Signature-SHA256", "X-Hub-Signature-256"];

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum accepted request body size in bytes
    pub max_content_length: usize,

    /// Shared secret for HMAC-SHA256 body signatures. `None` disables the check.
    pub hmac_secret: Option<String>,

    /// Address the web server binds to
    pub host: String,

    /// Port the web server listens on
    pub port: u16,

    /// Header names that may carry the signature; the first non-empty one wins
    pub signature_headers: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            hmac_secret: None,
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            signature_headers: DEFAULT_SIGNATURE_HEADERS
                .iter()
                .map(|h| h.to_string())
                .collect(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            max_content_length: parse_or("MAX_CONTENT_LENGTH", defaults.max_content_length),

            hmac_secret: parse_secret("WEBHOOK_HMAC_SECRET"),

            host: env::var("HOST")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.host),

            port: parse_or("PORT", defaults.port),

            signature_headers: parse_csv("WEBHOOK_SIGNATURE_HEADERS")
                .filter(|headers| !headers.is_empty())
                .unwrap_or(defaults.signature_headers),
        }
    }

    /// Resolve `host:port` into a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .with_context(|| format!("Invalid HOST address: {}", self.host))?
            .next()
            .with_context(|| format!("HOST resolved to no addresses: {}", self.host))
    }
}

/// Parse a variable, falling back to `default` when missing or malformed.
fn parse_or<T: FromStr>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

/// Read a secret, treating empty or whitespace-only values as unset.
fn parse_secret(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a comma-separated list of strings.
fn parse_csv(name: &str) -> Option<Vec<String>> {
    env::var(name).ok().map(|raw| {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}
