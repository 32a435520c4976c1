use std::ops::Range;

use crate::command::Command;
use crate::config::EngineConfig;
use crate::document::{DocumentError, RichText, TextDocument};
use crate::engine::{StepOutcome, UndoEngine};
use crate::error::Result;
use crate::serializer::Serializer;
use crate::store::DocumentRecord;
use crate::style::FormatDelta;

/// One open document: live content plus its undo engine.
#[derive(Debug)]
pub struct Session {
    doc: RichText,
    engine: UndoEngine,
    serializer: Serializer,
}

impl Session {
    /// Open `record`, restoring whatever undo history it has stored.
    ///
    /// Unreadable history is never an error here; the session simply starts
    /// with an empty undo stack.
    pub fn open(record: &mut DocumentRecord, config: EngineConfig) -> Self {
        let doc = record.document();
        let serializer = Serializer::new(config);
        let engine = match record.undo.as_mut() {
            Some(state) => serializer.restore(state, &doc),
            None => UndoEngine::new(&config),
        };
        Self {
            doc,
            engine,
            serializer,
        }
    }

    pub fn document(&self) -> &RichText {
        &self.doc
    }

    pub fn engine(&self) -> &UndoEngine {
        &self.engine
    }

    pub fn execute(&mut self, command: Command) -> std::result::Result<(), DocumentError> {
        self.engine.execute(&mut self.doc, command)
    }

    /// One keystroke at `at`.
    pub fn keystroke(&mut self, at: usize, ch: char) -> std::result::Result<(), DocumentError> {
        let command = Command::insert(&self.doc, at, ch.to_string());
        self.execute(command)
    }

    /// Insert `text` in a single step, as a paste would.
    pub fn insert(&mut self, at: usize, text: &str) -> std::result::Result<(), DocumentError> {
        let command = Command::insert(&self.doc, at, text);
        self.execute(command)
    }

    pub fn delete(&mut self, range: Range<usize>) -> std::result::Result<(), DocumentError> {
        let command = Command::delete(&self.doc, range)?;
        self.execute(command)
    }

    pub fn format(
        &mut self,
        range: Range<usize>,
        delta: FormatDelta,
    ) -> std::result::Result<(), DocumentError> {
        let command = Command::format(&self.doc, range, delta)?;
        self.execute(command)
    }

    /// Change the undo capacity, trimming the oldest entries. The new value is
    /// stored with the next save.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.engine.set_capacity(capacity);
    }

    pub fn undo(&mut self) -> StepOutcome {
        self.engine.undo(&mut self.doc)
    }

    pub fn redo(&mut self) -> StepOutcome {
        self.engine.redo(&mut self.doc)
    }

    pub fn flush(&mut self) {
        self.engine.flush_typing_buffer();
    }

    /// Focus left the editor.
    pub fn blur(&mut self) {
        self.engine.end_session();
    }

    /// Write content and retained history back to `record`.
    ///
    /// If history cannot be encoded the record is left untouched. Returns the
    /// number of history entries persisted.
    pub fn save(&mut self, record: &mut DocumentRecord) -> Result<usize> {
        let mut state = record.undo.clone().unwrap_or_default();
        let retained = self.serializer.save(&mut self.engine, &mut state)?;
        record.store_document(&self.doc);
        if record.undo.is_some() || retained > 0 {
            record.undo = Some(state);
        }
        tracing::info!(document = %self.doc.id(), retained, "saved document");
        Ok(retained)
    }

    /// Forget all history, live and stored.
    pub fn clear_history(&mut self, record: &mut DocumentRecord) {
        self.engine.clear();
        record.clear_undo_state();
    }
}
