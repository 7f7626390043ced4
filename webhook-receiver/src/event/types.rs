//! BitGo webhook payload types.
//!
//! Only the handful of fields the receiver looks at are modelled, and every
//! one of them is optional. Scalars are accepted leniently so that a sender
//! putting a number where a string was expected still gets classified
//! instead of rejected.

use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;

/// Event type for transfer notifications.
pub const TYPE_TRANSFER: &str = "transfer";

/// Event type for wallet confirmation notifications.
pub const TYPE_WALLET_CONFIRMATION: &str = "wallet_confirmation";

/// Event type for new block notifications.
pub const TYPE_BLOCK: &str = "block";

/// Transfer state once the transaction has confirmed.
pub const STATE_CONFIRMED: &str = "confirmed";

/// Partial view of an incoming webhook event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookEvent {
    /// Event type, e.g. `transfer`
    #[serde(default, rename = "type", deserialize_with = "lenient_string")]
    pub event_type: Option<String>,

    /// Transfer state; only meaningful for `transfer` events
    #[serde(default, deserialize_with = "lenient_string")]
    pub state: Option<String>,

    /// Transferred value
    #[serde(default, deserialize_with = "lenient_object")]
    pub value: Option<TransferValue>,

    /// Transaction id
    #[serde(default, deserialize_with = "lenient_string")]
    pub hash: Option<String>,
}

/// Amount and currency of a transfer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransferValue {
    #[serde(default, deserialize_with = "lenient_string")]
    pub amount: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub currency: Option<String>,
}

impl WebhookEvent {
    pub fn amount(&self) -> Option<&str> {
        self.value.as_ref().and_then(|v| v.amount.as_deref())
    }

    pub fn currency(&self) -> Option<&str> {
        self.value.as_ref().and_then(|v| v.currency.as_deref())
    }
}

/// Accept any JSON scalar as a string. `null` becomes `None`, numbers and
/// booleans keep their JSON text.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Accept a nested object, treating anything else as missing.
fn lenient_object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .filter(Value::is_object)
        .and_then(|v| serde_json::from_value(v).ok()))
}
