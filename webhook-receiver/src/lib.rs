//! Finora - BitGo webhook receiver.
//!
//! A small web service that accepts wallet notifications from BitGo,
//! optionally verifies their HMAC-SHA256 signature, logs what arrived and
//! acknowledges receipt.
//!
//! ## Request Flow
//!
//! ```text
//! POST /webhook/bitgo → content type → size → signature → JSON → classify → 200
//! ```

pub mod config;
pub mod event;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use event::{process_event, EventKind, WebhookEvent};
pub use web::{router, AppState, WebhookError};
