use tracing::{debug, trace, warn};

use crate::coalesce::{Offer, TypingCoalescer};
use crate::command::Command;
use crate::config::EngineConfig;
use crate::document::{DocumentDelta, DocumentError, TextDocument};
use crate::stack::BoundedStack;

/// What an undo or redo request did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The command with this label was undone/redone.
    Applied { label: String },
    /// Nothing to undo/redo.
    Empty,
    /// The command no longer fits the document and was discarded.
    Dropped { label: String, error: DocumentError },
}

impl StepOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, StepOutcome::Applied { .. })
    }
}

/// Undo and redo stacks for one document.
///
/// Keystrokes pass through a [`TypingCoalescer`] first, so an open typing run
/// is not on the undo stack until it is flushed.
#[derive(Debug)]
pub struct UndoEngine {
    undo: BoundedStack,
    redo: BoundedStack,
    coalescer: TypingCoalescer,
}

impl UndoEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            undo: BoundedStack::new(config.max_stack_size),
            redo: BoundedStack::new(config.max_stack_size),
            coalescer: TypingCoalescer::new(config.coalesce),
        }
    }

    /// Engine whose undo stack holds `entries` (oldest first) and whose redo
    /// stack is empty. Only the newest entries that fit are kept.
    pub fn with_history(config: &EngineConfig, entries: Vec<Command>) -> Self {
        let mut engine = Self::new(config);
        let skip = entries.len().saturating_sub(engine.undo.capacity());
        for command in entries.into_iter().skip(skip) {
            engine.undo.push(command);
        }
        engine
    }

    /// Record an edit that has already been applied to the document.
    ///
    /// Any new edit invalidates redo history.
    pub fn push(&mut self, command: Command) {
        if !self.redo.is_empty() {
            trace!(dropped = self.redo.len(), "new edit clears redo stack");
            self.redo.clear();
        }
        match self.coalescer.offer(command) {
            Offer::Absorbed { closed } => {
                if let Some(run) = closed {
                    self.commit(run);
                }
            }
            Offer::Passed { closed, command } => {
                if let Some(run) = closed {
                    self.commit(run);
                }
                self.commit(command);
            }
        }
    }

    /// Apply `command` to `doc` and record it.
    pub fn execute<D: TextDocument + ?Sized>(
        &mut self,
        doc: &mut D,
        command: Command,
    ) -> Result<(), DocumentError> {
        apply_to(doc, &command, &command.apply())?;
        self.push(command);
        Ok(())
    }

    /// Undo the most recent edit, closing any open typing run first.
    pub fn undo<D: TextDocument + ?Sized>(&mut self, doc: &mut D) -> StepOutcome {
        self.flush_typing_buffer();
        let Some(command) = self.undo.pop() else {
            debug!("undo requested with empty undo stack");
            return StepOutcome::Empty;
        };
        let label = command.label();
        match apply_to(doc, &command, &command.revert()) {
            Ok(()) => {
                self.redo.push(command);
                StepOutcome::Applied { label }
            }
            Err(error) => {
                warn!(%label, %error, "dropping undo entry that no longer applies");
                StepOutcome::Dropped { label, error }
            }
        }
    }

    /// Redo the most recently undone edit.
    pub fn redo<D: TextDocument + ?Sized>(&mut self, doc: &mut D) -> StepOutcome {
        let Some(command) = self.redo.pop() else {
            debug!("redo requested with empty redo stack");
            return StepOutcome::Empty;
        };
        let label = command.label();
        match apply_to(doc, &command, &command.apply()) {
            Ok(()) => {
                self.commit(command);
                StepOutcome::Applied { label }
            }
            Err(error) => {
                warn!(%label, %error, "dropping redo entry that no longer applies");
                StepOutcome::Dropped { label, error }
            }
        }
    }

    /// Commit the open typing run, if any.
    pub fn flush_typing_buffer(&mut self) {
        if let Some(run) = self.coalescer.flush() {
            self.commit(run);
        }
    }

    /// The editor lost focus or the session is ending.
    pub fn end_session(&mut self) {
        self.flush_typing_buffer();
    }

    /// Forget all history, including an open typing run.
    pub fn clear(&mut self) {
        self.coalescer.flush();
        self.undo.clear();
        self.redo.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty() || self.coalescer.is_accumulating()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Committed undo entries; an open typing run is not counted.
    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    pub fn is_accumulating(&self) -> bool {
        self.coalescer.is_accumulating()
    }

    /// Labels of committed undo entries, most recent first.
    pub fn undo_labels(&self) -> Vec<String> {
        self.undo.iter().rev().map(Command::label).collect()
    }

    /// Committed undo entries, oldest first.
    pub fn undo_entries(&self) -> impl DoubleEndedIterator<Item = &Command> {
        self.undo.iter()
    }

    pub fn capacity(&self) -> usize {
        self.undo.capacity()
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        let evicted = self.undo.set_capacity(capacity) + self.redo.set_capacity(capacity);
        if evicted > 0 {
            debug!(evicted, capacity, "undo capacity lowered");
        }
    }

    fn commit(&mut self, command: Command) {
        if let Some(evicted) = self.undo.push(command) {
            trace!(label = %evicted.label(), "undo stack full, evicted oldest entry");
        }
    }
}

impl Default for UndoEngine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

fn apply_to<D: TextDocument + ?Sized>(
    doc: &mut D,
    command: &Command,
    delta: &DocumentDelta,
) -> Result<(), DocumentError> {
    if command.document() != doc.id() {
        return Err(DocumentError::ForeignDocument {
            expected: command.document(),
            actual: doc.id(),
        });
    }
    doc.apply_delta(delta)
}
