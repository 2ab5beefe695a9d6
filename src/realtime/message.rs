//! Phoenix channel frames and table change payloads

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// A frame sent or received over the realtime socket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeMessage {
    pub topic: String,
    pub event: ChannelEvent,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub message_ref: Option<String>,
}

impl RealtimeMessage {
    pub fn new(topic: &str, event: ChannelEvent, payload: Value, message_ref: Option<String>) -> Self {
        Self {
            topic: topic.to_string(),
            event,
            payload,
            message_ref,
        }
    }

    /// Reply status of a `phx_reply` frame
    pub fn reply_status(&self) -> Option<&str> {
        self.payload.get("status").and_then(Value::as_str)
    }
}

/// Channel events this client understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelEvent {
    PostgresChanges,

    #[serde(rename = "phx_join")]
    PhoenixJoin,
    #[serde(rename = "phx_reply")]
    PhoenixReply,
    #[serde(rename = "phx_error")]
    PhoenixError,
    #[serde(rename = "phx_close")]
    PhoenixClose,

    Heartbeat,
    System,

    /// Presence, broadcast and anything newer
    #[serde(other)]
    Other,
}

/// Kind of row change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A row change on a subscribed table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub schema: String,
    pub table: String,

    /// Row after the change; absent for deletes
    #[serde(default)]
    pub record: Option<Value>,

    /// Row before the change, as far as the replica identity allows
    #[serde(default)]
    pub old_record: Option<Value>,

    #[serde(default)]
    pub commit_timestamp: Option<String>,
}

impl ChangeEvent {
    /// Read the change out of a `postgres_changes` payload
    pub fn from_payload(payload: &Value) -> Result<Self, Error> {
        let data = payload
            .get("data")
            .ok_or_else(|| Error::realtime("postgres_changes payload without data"))?;
        serde_json::from_value(data.clone())
            .map_err(|e| Error::realtime(format!("malformed change payload: {}", e)))
    }
}
