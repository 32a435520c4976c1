//! Typing coalescer.
//!
//! Keystrokes arrive as one-grapheme insert commands. While they keep landing
//! right after the previous one they are folded into an open run; anything
//! else closes the run and hands it back as a single `Typing` command.

use chrono::{DateTime, TimeDelta, Utc};

use crate::command::{Command, Edit};
use crate::config::CoalesceConfig;
use crate::document::DocumentId;

/// Result of offering a command to the coalescer.
#[derive(Debug)]
pub enum Offer {
    /// The keystroke now belongs to the open run. `closed` is a previous run
    /// the keystroke did not continue; it must be committed first.
    Absorbed { closed: Option<Command> },
    /// Not a keystroke. Any open run was closed and is returned in `closed`,
    /// ahead of the command itself.
    Passed {
        closed: Option<Command>,
        command: Command,
    },
}

#[derive(Debug)]
struct TypingRun {
    document: DocumentId,
    at: usize,
    text: String,
    chars: usize,
    last: DateTime<Utc>,
}

impl TypingRun {
    fn start(document: DocumentId, at: usize, text: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            document,
            at,
            text: text.to_string(),
            chars: text.chars().count(),
            last: timestamp,
        }
    }

    fn continues(&self, command: &Command, at: usize, config: &CoalesceConfig) -> bool {
        let idle = TimeDelta::from_std(config.idle_timeout).unwrap_or(TimeDelta::MAX);
        command.document() == self.document
            && at == self.at + self.chars
            && self.chars < config.max_run_chars
            && command.timestamp() - self.last <= idle
    }

    fn extend(&mut self, text: &str, timestamp: DateTime<Utc>) {
        self.text.push_str(text);
        self.chars += text.chars().count();
        self.last = timestamp;
    }

    fn into_command(self) -> Command {
        Command::new(
            self.document,
            Edit::Typing {
                at: self.at,
                text: self.text,
            },
        )
        .with_timestamp(self.last)
    }
}

/// Folds consecutive keystrokes into typing runs.
#[derive(Debug, Default)]
pub struct TypingCoalescer {
    config: CoalesceConfig,
    run: Option<TypingRun>,
}

impl TypingCoalescer {
    pub fn new(config: CoalesceConfig) -> Self {
        Self { config, run: None }
    }

    /// True while a run is open.
    pub fn is_accumulating(&self) -> bool {
        self.run.is_some()
    }

    /// Text of the open run, if any.
    pub fn pending(&self) -> Option<&str> {
        self.run.as_ref().map(|run| run.text.as_str())
    }

    pub fn offer(&mut self, command: Command) -> Offer {
        let (at, text) = match command.edit() {
            Edit::Insert { at, text } if command.is_keystroke() => (*at, text.clone()),
            _ => {
                return Offer::Passed {
                    closed: self.flush(),
                    command,
                };
            }
        };
        if let Some(run) = self.run.as_mut() {
            if run.continues(&command, at, &self.config) {
                run.extend(&text, command.timestamp());
                return Offer::Absorbed { closed: None };
            }
        }
        let closed = self.flush();
        self.run = Some(TypingRun::start(
            command.document(),
            at,
            &text,
            command.timestamp(),
        ));
        Offer::Absorbed { closed }
    }

    /// Close the open run. Calling this with no run open does nothing.
    pub fn flush(&mut self) -> Option<Command> {
        self.run.take().map(TypingRun::into_command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandTag;
    use crate::document::RichText;
    use chrono::TimeZone;
    use std::time::Duration;

    fn at_ms(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000 + ms).unwrap()
    }

    fn key(doc: &RichText, at: usize, ch: &str, ms: i64) -> Command {
        Command::insert(doc, at, ch).with_timestamp(at_ms(ms))
    }

    #[test]
    fn consecutive_keystrokes_form_one_run() {
        let doc = RichText::from_text("");
        let mut c = TypingCoalescer::default();
        for (i, ch) in ["a", "b", "c"].into_iter().enumerate() {
            let offer = c.offer(key(&doc, i, ch, i as i64 * 10));
            assert!(matches!(offer, Offer::Absorbed { closed: None }));
        }
        assert!(c.is_accumulating());
        assert_eq!(c.pending(), Some("abc"));
        let run = c.flush().unwrap();
        assert_eq!(run.tag(), CommandTag::Typing);
        assert_eq!(
            run.edit(),
            &Edit::Typing {
                at: 0,
                text: "abc".into()
            }
        );
        assert_eq!(run.timestamp(), at_ms(20));
        assert!(c.flush().is_none());
    }

    #[test]
    fn jump_closes_run_and_opens_another() {
        let doc = RichText::from_text("xxxxxxxxxx");
        let mut c = TypingCoalescer::default();
        c.offer(key(&doc, 0, "a", 0));
        c.offer(key(&doc, 1, "b", 1));
        let Offer::Absorbed { closed: Some(run) } = c.offer(key(&doc, 7, "z", 2)) else {
            panic!("expected the first run to close");
        };
        assert_eq!(run.edit(), &Edit::Typing { at: 0, text: "ab".into() });
        assert_eq!(c.pending(), Some("z"));
    }

    #[test]
    fn pause_longer_than_idle_timeout_splits_runs() {
        let doc = RichText::from_text("");
        let mut c = TypingCoalescer::new(CoalesceConfig {
            idle_timeout: Duration::from_millis(500),
            ..CoalesceConfig::default()
        });
        c.offer(key(&doc, 0, "a", 0));
        c.offer(key(&doc, 1, "b", 400));
        let offer = c.offer(key(&doc, 2, "c", 1_000));
        assert!(matches!(offer, Offer::Absorbed { closed: Some(_) }));
        assert_eq!(c.pending(), Some("c"));
    }

    #[test]
    fn non_keystroke_passes_through_after_run() {
        let doc = RichText::from_text("");
        let mut c = TypingCoalescer::default();
        c.offer(key(&doc, 0, "a", 0));
        match c.offer(key(&doc, 1, "pasted", 1)) {
            Offer::Passed { closed, command } => {
                assert_eq!(closed.unwrap().label(), "Typing");
                assert_eq!(command.label(), "Insert Text");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!c.is_accumulating());
    }

    #[test]
    fn run_is_capped() {
        let doc = RichText::from_text("");
        let mut c = TypingCoalescer::new(CoalesceConfig {
            max_run_chars: 2,
            ..CoalesceConfig::default()
        });
        c.offer(key(&doc, 0, "a", 0));
        c.offer(key(&doc, 1, "b", 1));
        let offer = c.offer(key(&doc, 2, "c", 2));
        assert!(matches!(offer, Offer::Absorbed { closed: Some(_) }));
    }
}
