use std::ops::Range;

use bitflags::bitflags;
use inkwell_proto::RunPayload;

bitflags! {
    /// Character formatting attributes.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Attributes: u8 {
        const BOLD = 1;
        const ITALIC = 1 << 1;
        const UNDERLINE = 1 << 2;
        const STRIKETHROUGH = 1 << 3;
    }
}

impl Attributes {
    /// Flag names, as written on the wire.
    pub fn to_names(self) -> Vec<String> {
        self.iter_names().map(|(name, _)| name.to_string()).collect()
    }

    /// Parse flag names. Names this build does not know are ignored.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        names
            .iter()
            .filter_map(|name| Self::from_name(name.as_ref()))
            .fold(Self::empty(), |acc, flag| acc | flag)
    }

    fn display_name(self) -> Option<&'static str> {
        if self == Self::BOLD {
            Some("Bold")
        } else if self == Self::ITALIC {
            Some("Italic")
        } else if self == Self::UNDERLINE {
            Some("Underline")
        } else if self == Self::STRIKETHROUGH {
            Some("Strikethrough")
        } else {
            None
        }
    }
}

/// Attribute change applied over a range. `remove` wins over `add`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FormatDelta {
    pub add: Attributes,
    pub remove: Attributes,
}

impl FormatDelta {
    pub fn set(attrs: Attributes) -> Self {
        Self {
            add: attrs,
            remove: Attributes::empty(),
        }
    }

    pub fn clear(attrs: Attributes) -> Self {
        Self {
            add: Attributes::empty(),
            remove: attrs,
        }
    }

    pub fn apply(&self, attrs: Attributes) -> Attributes {
        (attrs | self.add) - self.remove
    }

    /// Human-readable label, e.g. "Bold" or "Remove Italic".
    pub fn label(&self) -> String {
        let single = match (self.add.is_empty(), self.remove.is_empty()) {
            (false, true) => self.add.display_name().map(str::to_string),
            (true, false) => self.remove.display_name().map(|name| format!("Remove {name}")),
            _ => None,
        };
        single.unwrap_or_else(|| "Format".to_string())
    }
}

/// `len` consecutive characters sharing `attrs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleRun {
    pub len: usize,
    pub attrs: Attributes,
}

impl StyleRun {
    pub fn new(len: usize, attrs: Attributes) -> Self {
        Self { len, attrs }
    }
}

impl From<&StyleRun> for RunPayload {
    fn from(run: &StyleRun) -> Self {
        RunPayload {
            len: run.len,
            attrs: run.attrs.to_names(),
        }
    }
}

impl From<&RunPayload> for StyleRun {
    fn from(run: &RunPayload) -> Self {
        StyleRun::new(run.len, Attributes::from_names(&run.attrs))
    }
}

/// Total character count covered by `runs`, or `None` if it overflows.
pub fn total_len(runs: &[StyleRun]) -> Option<usize> {
    runs.iter().try_fold(0usize, |acc, r| acc.checked_add(r.len))
}

/// Run-length encoded formatting for a whole document.
///
/// Runs are never empty and adjacent runs never share attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleRuns {
    runs: Vec<StyleRun>,
}

impl StyleRuns {
    /// `len` unformatted characters.
    pub fn plain(len: usize) -> Self {
        Self::from_runs(vec![StyleRun::new(len, Attributes::empty())])
    }

    pub fn from_runs(runs: Vec<StyleRun>) -> Self {
        let mut out = Self { runs };
        out.normalize();
        out
    }

    pub fn len(&self) -> usize {
        self.runs.iter().map(|r| r.len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn as_slice(&self) -> &[StyleRun] {
        &self.runs
    }

    /// Attributes of the character at `pos`, or empty past the end.
    pub fn attrs_at(&self, pos: usize) -> Attributes {
        let mut start = 0;
        for run in &self.runs {
            if pos < start + run.len {
                return run.attrs;
            }
            start += run.len;
        }
        Attributes::empty()
    }

    /// Runs covering `range`, clipped to it.
    pub fn slice(&self, range: Range<usize>) -> Vec<StyleRun> {
        let mut out = Vec::new();
        let mut start = 0;
        for run in &self.runs {
            let end = start + run.len;
            let lo = start.max(range.start);
            let hi = end.min(range.end);
            if lo < hi {
                out.push(StyleRun::new(hi - lo, run.attrs));
            }
            if end >= range.end {
                break;
            }
            start = end;
        }
        out
    }

    pub fn insert(&mut self, at: usize, runs: &[StyleRun]) {
        let idx = self.split_at(at);
        self.runs.splice(idx..idx, runs.iter().copied());
        self.normalize();
    }

    pub fn remove(&mut self, range: Range<usize>) {
        let lo = self.split_at(range.start);
        let hi = self.split_at(range.end);
        self.runs.drain(lo..hi);
        self.normalize();
    }

    /// Overwrite the runs starting at `at` with `runs`.
    pub fn replace(&mut self, at: usize, runs: &[StyleRun]) {
        let len: usize = runs.iter().map(|r| r.len).sum();
        self.remove(at..at + len);
        self.insert(at, runs);
    }

    /// Ensure a run boundary at `pos` and return the index of the run that
    /// starts there.
    fn split_at(&mut self, pos: usize) -> usize {
        let mut start = 0;
        for i in 0..self.runs.len() {
            if pos == start {
                return i;
            }
            let len = self.runs[i].len;
            if pos < start + len {
                let head = pos - start;
                let attrs = self.runs[i].attrs;
                self.runs[i].len = head;
                self.runs.insert(i + 1, StyleRun::new(len - head, attrs));
                return i + 1;
            }
            start += len;
        }
        self.runs.len()
    }

    fn normalize(&mut self) {
        let mut merged: Vec<StyleRun> = Vec::with_capacity(self.runs.len());
        for run in self.runs.drain(..) {
            if run.len == 0 {
                continue;
            }
            match merged.last_mut() {
                Some(last) if last.attrs == run.attrs => last.len += run.len,
                _ => merged.push(run),
            }
        }
        self.runs = merged;
    }
}
