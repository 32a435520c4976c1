use ropey::Rope;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use uuid::Uuid;

use crate::style::{Attributes, StyleRun, StyleRuns, total_len};

/// Stable identifier of a document. Commands refer to their document by id
/// and are rebound to the live document when history is restored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocumentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A single change to document content. Positions count characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentDelta {
    /// Insert `text` at `at`. Without explicit runs the new text takes the
    /// attributes of the character before it.
    Insert {
        at: usize,
        text: String,
        runs: Option<Vec<StyleRun>>,
    },
    Remove {
        range: Range<usize>,
    },
    /// Overwrite formatting starting at `at` with `runs`.
    Restyle {
        at: usize,
        runs: Vec<StyleRun>,
    },
}

/// Reasons a delta cannot be applied to a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    OutOfBounds { end: usize, len: usize },
    RunMismatch { runs: usize, text: usize },
    ForeignDocument { expected: DocumentId, actual: DocumentId },
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentError::OutOfBounds { end, len } => {
                write!(f, "position {end} out of bounds (length {len})")
            }
            DocumentError::RunMismatch { runs, text } => {
                write!(f, "style runs cover {runs} chars but text has {text}")
            }
            DocumentError::ForeignDocument { expected, actual } => {
                write!(f, "command targets document {expected}, not {actual}")
            }
        }
    }
}

impl std::error::Error for DocumentError {}

/// What the undo engine needs from a document.
pub trait TextDocument {
    fn id(&self) -> DocumentId;

    /// Length in characters.
    fn len_chars(&self) -> usize;

    fn text(&self) -> String;

    /// Text within a character range.
    fn slice(&self, range: Range<usize>) -> Result<String, DocumentError>;

    /// Formatting within a character range.
    fn runs(&self, range: Range<usize>) -> Result<Vec<StyleRun>, DocumentError>;

    /// The single mutation point for undoable edits.
    fn apply_delta(&mut self, delta: &DocumentDelta) -> Result<(), DocumentError>;
}

/// Rope-backed rich text: characters plus run-length formatting.
#[derive(Debug, Clone)]
pub struct RichText {
    id: DocumentId,
    rope: Rope,
    styles: StyleRuns,
}

impl RichText {
    /// Create a new unformatted document with a fresh id.
    pub fn from_text(text: &str) -> Self {
        Self::with_id(DocumentId::new(), text)
    }

    pub fn with_id(id: DocumentId, text: &str) -> Self {
        let rope = Rope::from_str(text);
        let styles = StyleRuns::plain(rope.len_chars());
        Self { id, rope, styles }
    }

    /// Rebuild a document from stored text and runs. Runs that do not cover
    /// the text exactly are replaced with plain formatting.
    pub fn from_parts(id: DocumentId, text: &str, runs: Vec<StyleRun>) -> Self {
        let rope = Rope::from_str(text);
        let len = rope.len_chars();
        let styles = if total_len(&runs) == Some(len) {
            StyleRuns::from_runs(runs)
        } else {
            tracing::warn!(document = %id, "stored style runs do not match text, dropping formatting");
            StyleRuns::plain(len)
        };
        Self { id, rope, styles }
    }

    pub fn styles(&self) -> &[StyleRun] {
        self.styles.as_slice()
    }

    pub fn attrs_at(&self, pos: usize) -> Attributes {
        self.styles.attrs_at(pos)
    }

    fn check_range(&self, range: &Range<usize>) -> Result<(), DocumentError> {
        let len = self.len_chars();
        if range.start > range.end || range.end > len {
            return Err(DocumentError::OutOfBounds {
                end: range.end.max(range.start),
                len,
            });
        }
        Ok(())
    }

    fn insert(&mut self, at: usize, text: &str, runs: Option<&[StyleRun]>) -> Result<(), DocumentError> {
        self.check_range(&(at..at))?;
        let count = text.chars().count();
        let runs = match runs {
            Some(runs) => {
                let covered = total_len(runs);
                if covered != Some(count) {
                    return Err(DocumentError::RunMismatch {
                        runs: covered.unwrap_or(usize::MAX),
                        text: count,
                    });
                }
                runs.to_vec()
            }
            None => {
                let inherit = if at > 0 {
                    self.styles.attrs_at(at - 1)
                } else {
                    self.styles.attrs_at(0)
                };
                vec![StyleRun::new(count, inherit)]
            }
        };
        self.rope.insert(at, text);
        self.styles.insert(at, &runs);
        Ok(())
    }
}

impl TextDocument for RichText {
    fn id(&self) -> DocumentId {
        self.id
    }

    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn text(&self) -> String {
        self.rope.to_string()
    }

    fn slice(&self, range: Range<usize>) -> Result<String, DocumentError> {
        self.check_range(&range)?;
        Ok(self.rope.slice(range).to_string())
    }

    fn runs(&self, range: Range<usize>) -> Result<Vec<StyleRun>, DocumentError> {
        self.check_range(&range)?;
        Ok(self.styles.slice(range))
    }

    fn apply_delta(&mut self, delta: &DocumentDelta) -> Result<(), DocumentError> {
        match delta {
            DocumentDelta::Insert { at, text, runs } => self.insert(*at, text, runs.as_deref()),
            DocumentDelta::Remove { range } => {
                self.check_range(range)?;
                self.rope.remove(range.clone());
                self.styles.remove(range.clone());
                Ok(())
            }
            DocumentDelta::Restyle { at, runs } => {
                let end = total_len(runs)
                    .and_then(|len| at.checked_add(len))
                    .ok_or(DocumentError::OutOfBounds {
                        end: usize::MAX,
                        len: self.len_chars(),
                    })?;
                self.check_range(&(*at..end))?;
                self.styles.replace(*at, runs);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflowing_run_lengths_are_rejected() {
        let mut doc = RichText::from_text("abc");
        let err = doc
            .apply_delta(&DocumentDelta::Restyle {
                at: 2,
                runs: vec![StyleRun::new(usize::MAX, Attributes::BOLD)],
            })
            .unwrap_err();
        assert!(matches!(err, DocumentError::OutOfBounds { .. }));
        let err = doc
            .apply_delta(&DocumentDelta::Insert {
                at: 0,
                text: "xy".into(),
                runs: Some(vec![
                    StyleRun::new(usize::MAX, Attributes::BOLD),
                    StyleRun::new(3, Attributes::empty()),
                ]),
            })
            .unwrap_err();
        assert!(matches!(err, DocumentError::RunMismatch { .. }));
        assert_eq!(doc.text(), "abc");
        assert_eq!(doc.styles(), &[StyleRun::new(3, Attributes::empty())]);

        let restored = RichText::from_parts(
            DocumentId::new(),
            "ab",
            vec![StyleRun::new(usize::MAX, Attributes::BOLD), StyleRun::new(3, Attributes::BOLD)],
        );
        assert_eq!(restored.styles(), &[StyleRun::new(2, Attributes::empty())]);
    }

    #[test]
    fn insert_inherits_preceding_attributes() {
        let mut doc = RichText::from_text("ab");
        doc.apply_delta(&DocumentDelta::Restyle {
            at: 0,
            runs: vec![StyleRun::new(2, Attributes::BOLD)],
        })
        .unwrap();
        doc.apply_delta(&DocumentDelta::Insert {
            at: 2,
            text: "c".into(),
            runs: None,
        })
        .unwrap();
        assert_eq!(doc.text(), "abc");
        assert_eq!(doc.styles(), &[StyleRun::new(3, Attributes::BOLD)]);
    }

    #[test]
    fn positions_count_characters() {
        let mut doc = RichText::from_text("h\u{e9}llo");
        doc.apply_delta(&DocumentDelta::Remove { range: 1..2 }).unwrap();
        assert_eq!(doc.text(), "hllo");
        assert_eq!(doc.len_chars(), 4);
        assert_eq!(doc.slice(1..3).unwrap(), "ll");
    }

    #[test]
    fn out_of_bounds_deltas_are_rejected() {
        let mut doc = RichText::from_text("abc");
        let err = doc
            .apply_delta(&DocumentDelta::Remove { range: 2..9 })
            .unwrap_err();
        assert_eq!(err, DocumentError::OutOfBounds { end: 9, len: 3 });
        assert!(
            doc.apply_delta(&DocumentDelta::Insert {
                at: 4,
                text: "x".into(),
                runs: None,
            })
            .is_err()
        );
        assert!(
            doc.apply_delta(&DocumentDelta::Restyle {
                at: 2,
                runs: vec![StyleRun::new(2, Attributes::BOLD)],
            })
            .is_err()
        );
        assert_eq!(doc.text(), "abc");
        assert_eq!(doc.styles(), &[StyleRun::new(3, Attributes::empty())]);
    }

    #[test]
    fn insert_with_explicit_runs_must_cover_text() {
        let mut doc = RichText::from_text("");
        let err = doc
            .apply_delta(&DocumentDelta::Insert {
                at: 0,
                text: "abc".into(),
                runs: Some(vec![StyleRun::new(2, Attributes::ITALIC)]),
            })
            .unwrap_err();
        assert_eq!(err, DocumentError::RunMismatch { runs: 2, text: 3 });
    }

    #[test]
    fn mismatched_stored_runs_fall_back_to_plain() {
        let doc = RichText::from_parts(
            DocumentId::new(),
            "hello",
            vec![StyleRun::new(9, Attributes::BOLD)],
        );
        assert_eq!(doc.styles(), &[StyleRun::new(5, Attributes::empty())]);
    }

    #[test]
    fn document_id_parses_from_display() {
        let id = DocumentId::new();
        assert_eq!(id.to_string().parse::<DocumentId>().unwrap(), id);
    }
}
