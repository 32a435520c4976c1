//! Wire format for persisted undo history.
//!
//! A persisted stack is an ordered JSON array of [`SerializedCommand`]
//! objects. Each entry names its variant with a string tag and carries a
//! tag-specific payload object. Readers must skip tags they do not know.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

/// Stable type tags.
pub mod tag {
    pub const INSERT: &str = "insert";
    pub const TYPING: &str = "typing";
    pub const DELETE: &str = "delete";
    pub const FORMAT: &str = "format";
}

/// One persisted command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedCommand {
    #[serde(rename = "type")]
    pub tag: String,
    /// Identifier of the document the command was recorded against.
    pub document: String,
    /// ISO-8601 creation time.
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub payload: Value,
}

impl SerializedCommand {
    /// Build an entry from a typed payload.
    pub fn new<P: Serialize>(
        tag: &str,
        document: impl Into<String>,
        timestamp: DateTime<Utc>,
        payload: &P,
    ) -> serde_json::Result<Self> {
        Ok(Self {
            tag: tag.to_string(),
            document: document.into(),
            timestamp,
            payload: serde_json::to_value(payload)?,
        })
    }

    /// Interpret the payload as `P`.
    pub fn payload<P: DeserializeOwned>(&self) -> serde_json::Result<P> {
        P::deserialize(&self.payload)
    }
}

/// Style run: `len` characters sharing the named attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunPayload {
    pub len: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attrs: Vec<String>,
}

/// Payload of `insert` and `typing` entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertPayload {
    pub at: usize,
    pub text: String,
}

/// Payload of `delete` entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletePayload {
    pub at: usize,
    pub text: String,
    #[serde(default)]
    pub runs: Vec<RunPayload>,
}

/// Payload of `format` entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatPayload {
    pub at: usize,
    #[serde(default)]
    pub add: Vec<String>,
    #[serde(default)]
    pub remove: Vec<String>,
    pub prior: Vec<RunPayload>,
}

/// Encode an ordered stack, oldest entry first.
pub fn encode_stack(entries: &[SerializedCommand]) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(entries)
}

/// Split a persisted stack into raw entries.
///
/// Only the outer array has to be well formed; each element is parsed
/// separately with [`decode_entry`] so one bad entry cannot poison the rest.
pub fn decode_stack(bytes: &[u8]) -> serde_json::Result<Vec<Value>> {
    serde_json::from_slice(bytes)
}

/// Parse a single raw entry.
pub fn decode_entry(value: Value) -> serde_json::Result<SerializedCommand> {
    serde_json::from_value(value)
}
