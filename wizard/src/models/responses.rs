// API response models
// Every backend response is a JSON object with a `status` field ("success" | "error") and an
// optional `message`; payload fields sit next to them.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const STATUS_SUCCESS: &str = "success";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusEnvelope {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl StatusEnvelope {
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some(STATUS_SUCCESS)
    }

    /// Backend message, if present and non-blank.
    pub fn message(&self) -> Option<&str> {
        self.message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TablesPayload {
    #[serde(default)]
    pub tables: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsPayload {
    #[serde(default)]
    pub data: Option<Vec<AnalyticsRow>>,
}

/// One analysed customer, as computed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsRow {
    #[serde(deserialize_with = "text_or_number")]
    pub customer_id: String,
    #[serde(default, deserialize_with = "optional_text_or_number")]
    pub customer_name: Option<String>,
    pub total_orders: i64,
    #[serde(default)]
    pub avg_order_gap: Option<f64>,
    #[serde(default)]
    pub last_order_date: Option<String>,
    #[serde(default)]
    pub predicted_next_order_date: Option<String>,
    pub customer_classification: String,
}

fn value_as_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

// Identifier columns come straight out of the source table, so they may be numeric.
fn text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_as_text(value).ok_or_else(|| de::Error::custom("customer_id must not be null"))
}

fn optional_text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_as_text(value))
}
