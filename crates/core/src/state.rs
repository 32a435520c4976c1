use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_MAX_STACK_SIZE;

/// Undo storage slots kept on a document record.
///
/// The byte fields hold encoded history and are written as base64 strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoState {
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Option::is_none")]
    pub undo_stack_data: Option<Vec<u8>>,
    /// Always `None` once saved; redo does not outlive a session.
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Option::is_none")]
    pub redo_stack_data: Option<Vec<u8>>,
    #[serde(default = "default_max_stack_size")]
    pub max_stack_size: usize,
    #[serde(default)]
    pub last_undo_save_date: Option<DateTime<Utc>>,
}

fn default_max_stack_size() -> usize {
    DEFAULT_MAX_STACK_SIZE
}

impl Default for UndoState {
    fn default() -> Self {
        Self {
            undo_stack_data: None,
            redo_stack_data: None,
            max_stack_size: DEFAULT_MAX_STACK_SIZE,
            last_undo_save_date: None,
        }
    }
}

impl UndoState {
    /// Drop stored history. The capacity setting is kept.
    pub fn clear(&mut self) {
        self.undo_stack_data = None;
        self.redo_stack_data = None;
        self.last_undo_save_date = None;
    }

    pub fn has_history(&self) -> bool {
        self.undo_stack_data.is_some()
    }
}

mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => s.serialize_some(&STANDARD.encode(bytes)),
            None => s.serialize_none(),
        }
    }

    /// Undecodable base64 reads as "no history" so one bad slot cannot make
    /// the whole record unreadable.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        let Some(text) = Option::<String>::deserialize(d)? else {
            return Ok(None);
        };
        match STANDARD.decode(text) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) => {
                tracing::warn!(%err, "undo slot is not valid base64, ignoring");
                Ok(None)
            }
        }
    }
}
