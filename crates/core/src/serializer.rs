//! Persisting undo history.
//!
//! Only [`Retention::Persistent`] commands are written, which keeps the
//! payload proportional to deliberate structural edits rather than to the
//! amount of text typed. Redo history is never written. Loading is
//! infallible from the caller's point of view: anything unreadable yields an
//! empty engine.

use chrono::Utc;
use inkwell_proto::{SerializedCommand, decode_entry, decode_stack, encode_stack};
use tracing::{debug, warn};

use crate::command::{Command, Retention};
use crate::config::EngineConfig;
use crate::document::TextDocument;
use crate::engine::UndoEngine;
use crate::error::{DecodeError, InkwellError, RebindError, Result};
use crate::state::UndoState;

/// Commands that survive a save, in order.
pub fn retained<'a>(
    commands: impl IntoIterator<Item = &'a Command>,
) -> impl Iterator<Item = &'a Command> {
    commands
        .into_iter()
        .filter(|command| command.retention() == Retention::Persistent)
}

/// Encodes and restores an engine's undo stack.
#[derive(Debug, Clone, Default)]
pub struct Serializer {
    config: EngineConfig,
}

impl Serializer {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Encode `commands` (oldest first) as a JSON array.
    ///
    /// If the result would exceed the size guard the oldest entries are left
    /// out, so a saved payload is always loadable. Fails if even the newest
    /// entry alone is over the guard.
    pub fn encode<'a>(&self, commands: impl IntoIterator<Item = &'a Command>) -> Result<Vec<u8>> {
        let entries = commands
            .into_iter()
            .map(Command::encode)
            .collect::<serde_json::Result<Vec<SerializedCommand>>>()?;
        let sizes = entries
            .iter()
            .map(|entry| serde_json::to_vec(entry).map(|bytes| bytes.len()))
            .collect::<serde_json::Result<Vec<usize>>>()?;
        // "[" + "]" + one comma between entries
        let mut total = 2 + sizes.iter().sum::<usize>() + sizes.len().saturating_sub(1);
        let mut skip = 0;
        while total > self.config.size_guard && skip < entries.len() {
            total -= sizes[skip] + usize::from(skip + 1 < entries.len());
            skip += 1;
        }
        if skip > 0 && skip == entries.len() {
            return Err(InkwellError::Encode(format!(
                "newest undo entry exceeds {} byte limit",
                self.config.size_guard
            )));
        }
        if skip > 0 {
            warn!(
                dropped = skip,
                limit = self.config.size_guard,
                "undo history too large, leaving out oldest entries"
            );
        }
        Ok(encode_stack(&entries[skip..])?)
    }

    /// Decode a payload and bind every entry to `doc`.
    ///
    /// Entries with unknown tags, malformed fields or references the live
    /// document no longer satisfies are skipped individually.
    pub fn decode<D: TextDocument>(
        &self,
        bytes: &[u8],
        doc: &D,
    ) -> std::result::Result<Vec<Command>, DecodeError> {
        if bytes.len() > self.config.size_guard {
            return Err(DecodeError::Oversized {
                len: bytes.len(),
                limit: self.config.size_guard,
            });
        }
        let raw = decode_stack(bytes)?;
        let mut commands = Vec::with_capacity(raw.len());
        for (index, value) in raw.into_iter().enumerate() {
            let decoded = decode_entry(value)
                .map_err(RebindError::from)
                .and_then(|entry| Command::decode(entry, doc));
            match decoded {
                Ok(command) => commands.push(command),
                Err(RebindError::UnknownTag(tag)) => {
                    debug!(index, %tag, "skipping persisted command of unknown type");
                }
                Err(err) => warn!(index, %err, "dropping persisted command"),
            }
        }
        Ok(commands)
    }

    /// Write `engine`'s retained history into `state`.
    ///
    /// The open typing run is flushed first. On error `state` is left as it
    /// was. Returns the number of commands written.
    pub fn save(&self, engine: &mut UndoEngine, state: &mut UndoState) -> Result<usize> {
        engine.flush_typing_buffer();
        let keep: Vec<&Command> = retained(engine.undo_entries()).collect();
        let data = if keep.is_empty() {
            None
        } else {
            Some(self.encode(keep.iter().copied())?)
        };
        debug!(
            retained = keep.len(),
            live = engine.undo_depth(),
            bytes = data.as_ref().map_or(0, Vec::len),
            "saving undo history"
        );
        state.undo_stack_data = data;
        state.redo_stack_data = None;
        state.max_stack_size = engine.capacity();
        state.last_undo_save_date = Some(Utc::now());
        Ok(keep.len())
    }

    /// Rebuild an engine for `doc` from `state`. The redo stack always starts
    /// empty.
    ///
    /// An oversized payload is discarded and the stored fields are cleared
    /// so the next load does not hit it again.
    pub fn restore<D: TextDocument>(&self, state: &mut UndoState, doc: &D) -> UndoEngine {
        let mut config = self.config;
        if state.max_stack_size > 0 {
            config.max_stack_size = state.max_stack_size;
        }
        let Some(bytes) = state.undo_stack_data.as_deref() else {
            return UndoEngine::new(&config);
        };
        match self.decode(bytes, doc) {
            Ok(entries) => {
                let total = entries.len();
                let entries: Vec<Command> = entries
                    .into_iter()
                    .filter(|command| command.retention() == Retention::Persistent)
                    .collect();
                if entries.len() < total {
                    debug!(
                        skipped = total - entries.len(),
                        "ignoring session-only commands in stored history"
                    );
                }
                UndoEngine::with_history(&config, entries)
            }
            Err(err @ DecodeError::Oversized { .. }) => {
                warn!(document = %doc.id(), %err, "discarding stored undo history");
                state.clear();
                UndoEngine::new(&config)
            }
            Err(err) => {
                warn!(document = %doc.id(), %err, "stored undo history unreadable, starting fresh");
                UndoEngine::new(&config)
            }
        }
    }
}
