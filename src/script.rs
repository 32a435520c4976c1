//! Edit scripts: one action per line, replayed against a [`Session`].
//!
//! ```text
//! type Hello
//! flush
//! bold 0 5
//! undo
//! save
//! ```

use anyhow::{Context, Result, anyhow, bail};
use std::ops::Range;
use std::str::FromStr;

use inkwell_core::{
    Attributes, DocumentRecord, EngineConfig, FormatDelta, Session, StepOutcome, TextDocument,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Move the caret.
    Caret(usize),
    /// Keystrokes at the caret, one per character.
    Type(String),
    /// A single insertion at the caret.
    Paste(String),
    Insert(usize, String),
    Delete(Range<usize>),
    Backspace,
    Format(Range<usize>, FormatDelta),
    Undo,
    Redo,
    Flush,
    Blur,
    Save,
}

impl FromStr for Action {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let (word, rest) = match line.split_once(' ') {
            Some((word, rest)) => (word, rest),
            None => (line, ""),
        };
        let action = match word {
            "caret" => Action::Caret(number(rest)?),
            "type" => Action::Type(unescape(rest)),
            "paste" => Action::Paste(unescape(rest)),
            "insert" => {
                let (at, text) = rest
                    .split_once(' ')
                    .ok_or_else(|| anyhow!("insert needs a position and text"))?;
                Action::Insert(number(at)?, unescape(text))
            }
            "delete" => Action::Delete(range(rest)?),
            "backspace" => Action::Backspace,
            "undo" => Action::Undo,
            "redo" => Action::Redo,
            "flush" => Action::Flush,
            "blur" => Action::Blur,
            "save" => Action::Save,
            other => {
                let delta = match (attribute(other), other.strip_prefix("un").and_then(attribute)) {
                    (Some(attrs), _) => FormatDelta::set(attrs),
                    (None, Some(attrs)) => FormatDelta::clear(attrs),
                    (None, None) => bail!("unknown action `{other}`"),
                };
                Action::Format(range(rest)?, delta)
            }
        };
        Ok(action)
    }
}

fn attribute(name: &str) -> Option<Attributes> {
    match name {
        "bold" => Some(Attributes::BOLD),
        "italic" => Some(Attributes::ITALIC),
        "underline" => Some(Attributes::UNDERLINE),
        "strike" => Some(Attributes::STRIKETHROUGH),
        _ => None,
    }
}

fn number(s: &str) -> Result<usize> {
    s.trim()
        .parse()
        .with_context(|| format!("expected a position, got `{}`", s.trim()))
}

fn range(s: &str) -> Result<Range<usize>> {
    let mut parts = s.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(a), Some(b), None) => {
            let (start, end) = (number(a)?, number(b)?);
            if start > end {
                bail!("range {start}..{end} is reversed");
            }
            Ok(start..end)
        }
        _ => bail!("expected a range `START END`, got `{}`", s.trim()),
    }
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Parse a whole script. Blank lines and `#` comments are ignored.
pub fn parse(script: &str) -> Result<Vec<Action>> {
    script
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(i, line)| {
            line.trim_start()
                .parse()
                .with_context(|| format!("line {}", i + 1))
        })
        .collect()
}

/// Replays actions against one document.
pub struct Runner<'a> {
    record: &'a mut DocumentRecord,
    session: Session,
    caret: usize,
    transcript: Vec<String>,
}

impl<'a> Runner<'a> {
    /// Open `record` with its stored history and park the caret at the end.
    pub fn new(record: &'a mut DocumentRecord, config: EngineConfig) -> Self {
        let session = Session::open(record, config);
        let caret = session.document().len_chars();
        Self {
            record,
            session,
            caret,
            transcript: Vec::new(),
        }
    }

    pub fn caret(&self) -> usize {
        self.caret
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.session.set_capacity(capacity);
    }

    pub fn apply(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::Caret(at) => {
                let len = self.session.document().len_chars();
                if *at > len {
                    bail!("caret {at} is past the end ({len})");
                }
                self.caret = *at;
            }
            Action::Type(text) => {
                for ch in text.chars() {
                    self.session.keystroke(self.caret, ch)?;
                    self.caret += 1;
                }
            }
            Action::Paste(text) => {
                self.session.insert(self.caret, text)?;
                self.caret += text.chars().count();
            }
            Action::Insert(at, text) => {
                self.session.insert(*at, text)?;
                if *at <= self.caret {
                    self.caret += text.chars().count();
                }
            }
            Action::Delete(range) => {
                self.session.delete(range.clone())?;
                self.caret = shift_for_delete(self.caret, range);
            }
            Action::Backspace => {
                if self.caret > 0 {
                    self.session.delete(self.caret - 1..self.caret)?;
                    self.caret -= 1;
                }
            }
            Action::Format(range, delta) => self.session.format(range.clone(), *delta)?,
            Action::Undo => {
                let outcome = self.session.undo();
                self.report("undo", outcome);
            }
            Action::Redo => {
                let outcome = self.session.redo();
                self.report("redo", outcome);
            }
            Action::Flush => self.session.flush(),
            Action::Blur => self.session.blur(),
            Action::Save => {
                let retained = self.session.save(self.record)?;
                self.transcript
                    .push(format!("saved ({retained} history entries kept)"));
            }
        }
        Ok(())
    }

    fn report(&mut self, verb: &str, outcome: StepOutcome) {
        let line = match outcome {
            StepOutcome::Applied { label } => format!("{verb}: {label}"),
            StepOutcome::Empty => format!("{verb}: nothing to {verb}"),
            StepOutcome::Dropped { label, error } => {
                format!("{verb}: dropped stale `{label}` ({error})")
            }
        };
        self.transcript.push(line);
        self.caret = self.caret.min(self.session.document().len_chars());
    }

    /// Run every action then save. Returns the transcript.
    pub fn run(mut self, actions: &[Action]) -> Result<Vec<String>> {
        for (i, action) in actions.iter().enumerate() {
            self.apply(action)
                .with_context(|| format!("action {} ({action:?})", i + 1))?;
        }
        self.apply(&Action::Save)?;
        Ok(self.transcript)
    }
}

fn shift_for_delete(caret: usize, range: &Range<usize>) -> usize {
    if caret >= range.end {
        caret - range.len()
    } else if caret > range.start {
        range.start
    } else {
        caret
    }
}
