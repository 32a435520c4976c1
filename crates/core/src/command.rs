//! Undoable edits.
//!
//! A [`Command`] is plain data: the document it belongs to, when it was
//! made, and an [`Edit`] holding everything needed to replay or revert it.
//! Commands never touch a document themselves. [`Command::apply`] and
//! [`Command::revert`] describe the change as a [`DocumentDelta`] and the
//! caller feeds that to [`TextDocument::apply_delta`].

use std::ops::Range;

use chrono::{DateTime, Utc};
use inkwell_proto::{DeletePayload, FormatPayload, InsertPayload, RunPayload, SerializedCommand, tag};
use unicode_segmentation::UnicodeSegmentation;

use crate::document::{DocumentDelta, DocumentError, DocumentId, TextDocument};
use crate::error::RebindError;
use crate::style::{Attributes, FormatDelta, StyleRun, total_len};

/// Whether a command outlives the editing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// Dropped when history is saved.
    Session,
    /// Written to persisted history.
    Persistent,
}

/// Discriminant of a command, stable across builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandTag {
    Insert,
    Typing,
    Delete,
    Format,
}

impl CommandTag {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandTag::Insert => tag::INSERT,
            CommandTag::Typing => tag::TYPING,
            CommandTag::Delete => tag::DELETE,
            CommandTag::Format => tag::FORMAT,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            tag::INSERT => Some(CommandTag::Insert),
            tag::TYPING => Some(CommandTag::Typing),
            tag::DELETE => Some(CommandTag::Delete),
            tag::FORMAT => Some(CommandTag::Format),
            _ => None,
        }
    }

    /// Text insertion is cheap to redo by hand and unbounded in volume, so it
    /// only lives as long as the session.
    pub fn retention(self) -> Retention {
        match self {
            CommandTag::Insert | CommandTag::Typing => Retention::Session,
            CommandTag::Delete | CommandTag::Format => Retention::Persistent,
        }
    }
}

/// Edit operation that can be undone/redone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    /// Text inserted in one step, e.g. a keystroke or a paste.
    Insert { at: usize, text: String },
    /// A coalesced run of keystrokes.
    Typing { at: usize, text: String },
    /// Removed text together with the formatting it had.
    Delete {
        at: usize,
        text: String,
        runs: Vec<StyleRun>,
    },
    /// Attribute change over `at..at + len(prior)`; `prior` is the formatting
    /// before the change.
    Format {
        at: usize,
        delta: FormatDelta,
        prior: Vec<StyleRun>,
    },
}

/// An undoable edit bound to a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    document: DocumentId,
    timestamp: DateTime<Utc>,
    edit: Edit,
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

impl Command {
    pub fn new(document: DocumentId, edit: Edit) -> Self {
        Self {
            document,
            timestamp: Utc::now(),
            edit,
        }
    }

    /// Insert `text` at character position `at`.
    pub fn insert(doc: &impl TextDocument, at: usize, text: impl Into<String>) -> Self {
        Self::new(
            doc.id(),
            Edit::Insert {
                at,
                text: text.into(),
            },
        )
    }

    /// Delete `range`, capturing its text and formatting.
    pub fn delete(doc: &impl TextDocument, range: Range<usize>) -> Result<Self, DocumentError> {
        let text = doc.slice(range.clone())?;
        let runs = doc.runs(range.clone())?;
        Ok(Self::new(
            doc.id(),
            Edit::Delete {
                at: range.start,
                text,
                runs,
            },
        ))
    }

    /// Apply `delta` over `range`, capturing the formatting it replaces.
    pub fn format(
        doc: &impl TextDocument,
        range: Range<usize>,
        delta: FormatDelta,
    ) -> Result<Self, DocumentError> {
        let prior = doc.runs(range.clone())?;
        Ok(Self::new(
            doc.id(),
            Edit::Format {
                at: range.start,
                delta,
                prior,
            },
        ))
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn document(&self) -> DocumentId {
        self.document
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn edit(&self) -> &Edit {
        &self.edit
    }

    pub fn tag(&self) -> CommandTag {
        match self.edit {
            Edit::Insert { .. } => CommandTag::Insert,
            Edit::Typing { .. } => CommandTag::Typing,
            Edit::Delete { .. } => CommandTag::Delete,
            Edit::Format { .. } => CommandTag::Format,
        }
    }

    pub fn retention(&self) -> Retention {
        self.tag().retention()
    }

    /// Label for menus and history listings.
    pub fn label(&self) -> String {
        match &self.edit {
            Edit::Insert { .. } => "Insert Text".to_string(),
            Edit::Typing { .. } => "Typing".to_string(),
            Edit::Delete { .. } => "Delete".to_string(),
            Edit::Format { delta, .. } => delta.label(),
        }
    }

    /// A single-grapheme insertion, eligible for typing coalescing.
    pub fn is_keystroke(&self) -> bool {
        match &self.edit {
            Edit::Insert { text, .. } => text.graphemes(true).count() == 1,
            _ => false,
        }
    }

    /// The change that performs this edit.
    pub fn apply(&self) -> DocumentDelta {
        match &self.edit {
            Edit::Insert { at, text } | Edit::Typing { at, text } => DocumentDelta::Insert {
                at: *at,
                text: text.clone(),
                runs: None,
            },
            Edit::Delete { at, text, .. } => DocumentDelta::Remove {
                range: *at..*at + char_len(text),
            },
            Edit::Format { at, delta, prior } => DocumentDelta::Restyle {
                at: *at,
                runs: prior
                    .iter()
                    .map(|run| StyleRun::new(run.len, delta.apply(run.attrs)))
                    .collect(),
            },
        }
    }

    /// The change that takes this edit back.
    pub fn revert(&self) -> DocumentDelta {
        match &self.edit {
            Edit::Insert { at, text } | Edit::Typing { at, text } => DocumentDelta::Remove {
                range: *at..*at + char_len(text),
            },
            Edit::Delete { at, text, runs } => DocumentDelta::Insert {
                at: *at,
                text: text.clone(),
                runs: Some(runs.clone()),
            },
            Edit::Format { at, prior, .. } => DocumentDelta::Restyle {
                at: *at,
                runs: prior.clone(),
            },
        }
    }

    /// Wire form of this command.
    pub fn encode(&self) -> serde_json::Result<SerializedCommand> {
        let tag = self.tag().as_str();
        let document = self.document.to_string();
        match &self.edit {
            Edit::Insert { at, text } | Edit::Typing { at, text } => SerializedCommand::new(
                tag,
                document,
                self.timestamp,
                &InsertPayload {
                    at: *at,
                    text: text.clone(),
                },
            ),
            Edit::Delete { at, text, runs } => SerializedCommand::new(
                tag,
                document,
                self.timestamp,
                &DeletePayload {
                    at: *at,
                    text: text.clone(),
                    runs: runs.iter().map(RunPayload::from).collect(),
                },
            ),
            Edit::Format { at, delta, prior } => SerializedCommand::new(
                tag,
                document,
                self.timestamp,
                &FormatPayload {
                    at: *at,
                    add: delta.add.to_names(),
                    remove: delta.remove.to_names(),
                    prior: prior.iter().map(RunPayload::from).collect(),
                },
            ),
        }
    }

    /// Rebuild a command from its wire form and bind it to `doc`.
    ///
    /// The command must have been recorded against `doc` and everything its
    /// inverse touches must still exist in the live content.
    pub fn decode(entry: SerializedCommand, doc: &impl TextDocument) -> Result<Self, RebindError> {
        let Some(kind) = CommandTag::parse(&entry.tag) else {
            return Err(RebindError::UnknownTag(entry.tag));
        };
        if entry.document.parse::<DocumentId>().ok() != Some(doc.id()) {
            return Err(RebindError::ForeignDocument(entry.document));
        }
        let (edit, end) = match kind {
            CommandTag::Insert | CommandTag::Typing => {
                let p: InsertPayload = entry.payload()?;
                let end = p.at.checked_add(char_len(&p.text));
                let edit = if kind == CommandTag::Insert {
                    Edit::Insert {
                        at: p.at,
                        text: p.text,
                    }
                } else {
                    Edit::Typing {
                        at: p.at,
                        text: p.text,
                    }
                };
                (edit, end)
            }
            CommandTag::Delete => {
                let p: DeletePayload = entry.payload()?;
                let count = char_len(&p.text);
                let mut runs: Vec<StyleRun> = p.runs.iter().map(StyleRun::from).collect();
                if runs.is_empty() {
                    runs.push(StyleRun::new(count, Attributes::empty()));
                }
                if total_len(&runs) != Some(count) {
                    return Err(RebindError::Malformed(serde::de::Error::custom(
                        "delete runs do not cover deleted text",
                    )));
                }
                let edit = Edit::Delete {
                    at: p.at,
                    text: p.text,
                    runs,
                };
                (edit, Some(p.at))
            }
            CommandTag::Format => {
                let p: FormatPayload = entry.payload()?;
                let prior: Vec<StyleRun> = p.prior.iter().map(StyleRun::from).collect();
                let end = total_len(&prior).and_then(|len| p.at.checked_add(len));
                let delta = FormatDelta {
                    add: Attributes::from_names(&p.add),
                    remove: Attributes::from_names(&p.remove),
                };
                (
                    Edit::Format {
                        at: p.at,
                        delta,
                        prior,
                    },
                    end,
                )
            }
        };
        let len = doc.len_chars();
        match end {
            Some(end) if end <= len => {}
            end => {
                return Err(RebindError::OutOfRange {
                    end: end.unwrap_or(usize::MAX),
                    len,
                });
            }
        }
        Ok(Self {
            document: doc.id(),
            timestamp: entry.timestamp,
            edit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::RichText;

    fn bold_hello() -> (RichText, Command) {
        let mut doc = RichText::from_text("Hello");
        let cmd = Command::format(&doc, 0..5, FormatDelta::set(Attributes::BOLD)).unwrap();
        doc.apply_delta(&cmd.apply()).unwrap();
        (doc, cmd)
    }

    #[test]
    fn constructing_does_not_mutate() {
        let doc = RichText::from_text("Hello");
        let _ = Command::delete(&doc, 1..3).unwrap();
        let _ = Command::format(&doc, 0..5, FormatDelta::set(Attributes::BOLD)).unwrap();
        let _ = Command::insert(&doc, 5, "!");
        assert_eq!(doc.text(), "Hello");
        assert_eq!(doc.styles(), &[StyleRun::new(5, Attributes::empty())]);
    }

    #[test]
    fn delete_revert_restores_text_and_formatting() {
        let (mut doc, _) = bold_hello();
        let cmd = Command::delete(&doc, 1..4).unwrap();
        doc.apply_delta(&cmd.apply()).unwrap();
        assert_eq!(doc.text(), "Ho");
        doc.apply_delta(&cmd.revert()).unwrap();
        assert_eq!(doc.text(), "Hello");
        assert_eq!(doc.styles(), &[StyleRun::new(5, Attributes::BOLD)]);
    }

    #[test]
    fn format_revert_restores_prior_runs() {
        let (mut doc, cmd) = bold_hello();
        assert_eq!(doc.styles(), &[StyleRun::new(5, Attributes::BOLD)]);
        doc.apply_delta(&cmd.revert()).unwrap();
        assert_eq!(doc.styles(), &[StyleRun::new(5, Attributes::empty())]);
        assert_eq!(doc.text(), "Hello");
    }

    #[test]
    fn labels_and_tags() {
        let doc = RichText::from_text("abc");
        let cmd = Command::insert(&doc, 0, "x");
        assert_eq!(cmd.label(), "Insert Text");
        assert_eq!(cmd.retention(), Retention::Session);
        let cmd = Command::format(&doc, 0..1, FormatDelta::clear(Attributes::ITALIC)).unwrap();
        assert_eq!(cmd.label(), "Remove Italic");
        assert_eq!(cmd.tag(), CommandTag::Format);
        assert_eq!(cmd.retention(), Retention::Persistent);
    }

    #[test]
    fn keystroke_is_one_grapheme() {
        let doc = RichText::from_text("");
        assert!(Command::insert(&doc, 0, "a").is_keystroke());
        assert!(Command::insert(&doc, 0, "e\u{301}").is_keystroke());
        assert!(!Command::insert(&doc, 0, "ab").is_keystroke());
        assert!(!Command::insert(&doc, 0, "").is_keystroke());
    }

    #[test]
    fn format_roundtrips_through_wire_form() {
        let (doc, cmd) = bold_hello();
        let decoded = Command::decode(cmd.encode().unwrap(), &doc).unwrap();
        assert_eq!(decoded, cmd);
        assert_eq!(decoded.revert(), cmd.revert());
    }

    #[test]
    fn delete_roundtrips_through_wire_form() {
        let (mut doc, _) = bold_hello();
        let cmd = Command::delete(&doc, 0..2).unwrap();
        doc.apply_delta(&cmd.apply()).unwrap();
        let decoded = Command::decode(cmd.encode().unwrap(), &doc).unwrap();
        assert_eq!(decoded, cmd);
    }

    #[test]
    fn decode_rejects_other_document() {
        let (_, cmd) = bold_hello();
        let other = RichText::from_text("Hello");
        let err = Command::decode(cmd.encode().unwrap(), &other).unwrap_err();
        assert!(matches!(err, RebindError::ForeignDocument(_)));
    }

    #[test]
    fn decode_rejects_range_past_live_content() {
        let (doc, cmd) = bold_hello();
        let shorter = RichText::with_id(doc.id(), "Hi");
        let err = Command::decode(cmd.encode().unwrap(), &shorter).unwrap_err();
        assert!(matches!(err, RebindError::OutOfRange { end: 5, len: 2 }));
    }

    #[test]
    fn decode_reports_unknown_tag() {
        let (doc, cmd) = bold_hello();
        let mut entry = cmd.encode().unwrap();
        entry.tag = "paragraph-style".into();
        let err = Command::decode(entry, &doc).unwrap_err();
        assert!(matches!(err, RebindError::UnknownTag(t) if t == "paragraph-style"));
    }
}
