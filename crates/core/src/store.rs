//! JSON document library.
//!
//! Each [`DocumentRecord`] is the persisted entity a session edits: its text,
//! formatting, and the [`UndoState`] slots the serializer reads and writes.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use inkwell_proto::RunPayload;

use crate::document::{DocumentId, RichText, TextDocument};
use crate::error::Result;
use crate::state::UndoState;
use crate::style::StyleRun;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub runs: Vec<RunPayload>,
    /// Created the first time history is saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub undo: Option<UndoState>,
}

impl DocumentRecord {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: DocumentId::new(),
            title: title.into(),
            text: String::new(),
            runs: Vec::new(),
            undo: None,
        }
    }

    /// Materialize the live document.
    pub fn document(&self) -> RichText {
        let runs = self.runs.iter().map(StyleRun::from).collect();
        RichText::from_parts(self.id, &self.text, runs)
    }

    /// Copy content back from a live document.
    pub fn store_document(&mut self, doc: &RichText) {
        self.text = doc.text();
        self.runs = doc.styles().iter().map(RunPayload::from).collect();
    }

    pub fn undo_state_mut(&mut self) -> &mut UndoState {
        self.undo.get_or_insert_with(UndoState::default)
    }

    /// Forget persisted history.
    pub fn clear_undo_state(&mut self) {
        if let Some(state) = self.undo.as_mut() {
            state.clear();
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Library {
    pub documents: Vec<DocumentRecord>,
}

impl Library {
    /// Load the library at `path`. A missing file is an empty library, and so
    /// is a corrupt one; the corrupt file is first moved aside to
    /// `<name>.corrupt-<millis>` so a later save cannot overwrite it.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read(path) {
            Ok(data) => match serde_json::from_slice(&data) {
                Ok(library) => Ok(library),
                Err(err) => {
                    let backup = quarantine(path)?;
                    tracing::warn!(?path, ?backup, %err, "corrupted library file, starting empty");
                    Ok(Library::default())
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Library::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_vec_pretty(self)?;
        crate::fs::atomic_write(path, &data)?;
        Ok(())
    }

    /// Add an empty document and return it.
    pub fn create(&mut self, title: impl Into<String>) -> &DocumentRecord {
        self.documents.push(DocumentRecord::new(title));
        &self.documents[self.documents.len() - 1]
    }

    /// Find a document by id or, failing that, by exact title.
    pub fn find(&self, key: &str) -> Option<&DocumentRecord> {
        let index = self.position(key)?;
        self.documents.get(index)
    }

    pub fn find_mut(&mut self, key: &str) -> Option<&mut DocumentRecord> {
        let index = self.position(key)?;
        self.documents.get_mut(index)
    }

    fn position(&self, key: &str) -> Option<usize> {
        if let Ok(id) = key.parse::<DocumentId>() {
            if let Some(i) = self.documents.iter().position(|d| d.id == id) {
                return Some(i);
            }
        }
        self.documents.iter().position(|d| d.title == key)
    }
}

fn quarantine(path: &Path) -> Result<PathBuf> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "library".into());
    let backup = path.with_file_name(format!(
        "{name}.corrupt-{}",
        Utc::now().timestamp_millis()
    ));
    fs::rename(path, &backup)?;
    Ok(backup)
}
