//! Webhook event classification.
//!
//! ## Processing Flow
//!
//! ```text
//! JSON object → WebhookEvent → process_event() → EventKind (logged)
//! ```
//!
//! Classification cannot fail: anything that is not a recognised event
//! falls through to [`EventKind::Other`].

pub mod types;

use serde_json::{Map, Value};
use tracing::info;

pub use types::{TransferValue, WebhookEvent};

use types::{STATE_CONFIRMED, TYPE_BLOCK, TYPE_TRANSFER, TYPE_WALLET_CONFIRMATION};

/// What the receiver recognised an event as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// A transfer that reached the `confirmed` state
    ConfirmedDeposit {
        amount: Option<String>,
        currency: Option<String>,
        txid: Option<String>,
    },
    WalletConfirmation,
    Block,
    /// Anything else, carrying the raw `type` value if there was one
    Other { event_type: Option<String> },
}

impl EventKind {
    /// Classify a parsed event.
    pub fn classify(event: &WebhookEvent) -> Self {
        match (event.event_type.as_deref(), event.state.as_deref()) {
            (Some(TYPE_TRANSFER), Some(STATE_CONFIRMED)) => EventKind::ConfirmedDeposit {
                amount: event.amount().map(str::to_string),
                currency: event.currency().map(str::to_string),
                txid: event.hash.clone(),
            },
            (Some(TYPE_WALLET_CONFIRMATION), _) => EventKind::WalletConfirmation,
            (Some(TYPE_BLOCK), _) => EventKind::Block,
            (event_type, _) => EventKind::Other {
                event_type: event_type.map(str::to_string),
            },
        }
    }
}

/// Build a [`WebhookEvent`] from a JSON object.
///
/// Every field is optional and lenient, so this only fails if serde itself
/// misbehaves.
pub fn parse_event(object: Map<String, Value>) -> serde_json::Result<WebhookEvent> {
    serde_json::from_value(Value::Object(object))
}

/// Classify and log an event.
///
/// This is where downstream work for confirmed deposits would be scheduled.
pub fn process_event(event: &WebhookEvent) -> EventKind {
    info!(
        event_type = event.event_type.as_deref(),
        state = event.state.as_deref(),
        "webhook_received"
    );

    let kind = EventKind::classify(event);

    match &kind {
        EventKind::ConfirmedDeposit {
            amount,
            currency,
            txid,
        } => {
            info!(
                amount = amount.as_deref(),
                currency = currency.as_deref(),
                txid = txid.as_deref(),
                "deposit_confirmed"
            );
            // TODO: hand confirmed deposits to a job queue once crediting is built
        }
        EventKind::WalletConfirmation => info!("wallet_confirmation_received"),
        EventKind::Block => info!("block_notification_received"),
        EventKind::Other { event_type } => {
            info!(event_type = event_type.as_deref(), "webhook_type_unhandled")
        }
    }

    kind
}
