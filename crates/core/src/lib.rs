//! Persistent undo/redo for rich-text documents.
//!
//! Edits are recorded as [`Command`]s on a bounded [`UndoEngine`]. Keystrokes
//! are folded into typing runs by a [`TypingCoalescer`]. The [`Serializer`]
//! writes the structural part of the undo stack into a document's
//! [`UndoState`] slots and rebuilds an engine from them on reopen.

pub mod coalesce;
pub mod command;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod fs;
pub mod serializer;
pub mod session;
pub mod stack;
pub mod state;
pub mod store;
pub mod style;

pub use coalesce::TypingCoalescer;
pub use command::{Command, CommandTag, Edit, Retention};
pub use config::{CoalesceConfig, EngineConfig};
pub use document::{DocumentDelta, DocumentError, DocumentId, RichText, TextDocument};
pub use engine::{StepOutcome, UndoEngine};
pub use error::{InkwellError, Result};
pub use serializer::Serializer;
pub use session::Session;
pub use stack::BoundedStack;
pub use state::UndoState;
pub use store::{DocumentRecord, Library};
pub use style::{Attributes, FormatDelta, StyleRun};
