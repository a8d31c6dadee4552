//! Virtual File System for document management.
//!
//! The VFS maintains the in-memory state of all open documents, keyed by
//! their URI, and applies full or incremental updates from the editor.

use lsp_types::{Position, TextDocumentContentChangeEvent};
use ropey::Rope;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors from document store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VfsError {
    /// The document is already open.
    #[error("document already open: {0}")]
    AlreadyOpen(String),
    /// The document is not open.
    #[error("document not open: {0}")]
    NotFound(String),
}

/// A document in the virtual file system.
#[derive(Debug)]
pub struct Document {
    /// The document content as a rope for efficient editing.
    content: Rope,
    /// The document version, strictly increasing on every change.
    version: i32,
}

impl Document {
    /// Create a new document with the given content.
    pub fn new(content: &str, version: i32) -> Self {
        Self {
            content: Rope::from_str(content),
            version,
        }
    }

    /// Get the document content as a string.
    pub fn text(&self) -> String {
        self.content.to_string()
    }

    /// Get the document version.
    pub const fn version(&self) -> i32 {
        self.version
    }

    /// Char index of an editor position, clamped to the line end and to the
    /// end of the document.
    fn char_index(&self, position: Position) -> usize {
        let rope = &self.content;
        let line = position.line as usize;
        if line >= rope.len_lines() {
            return rope.len_chars();
        }
        let line_start = rope.line_to_char(line);
        let slice = rope.line(line);
        let mut content_len = slice.len_chars();
        while content_len > 0 && matches!(slice.char(content_len - 1), '\n' | '\r') {
            content_len -= 1;
        }
        let line_end = line_start + content_len;
        let target = rope.char_to_utf16_cu(line_start) + position.character as usize;
        let target = target.min(rope.char_to_utf16_cu(line_end));
        rope.utf16_cu_to_char(target)
    }

    /// Apply one content change: a full replacement or a ranged edit.
    fn apply(&mut self, change: &TextDocumentContentChangeEvent) {
        match change.range {
            None => self.content = Rope::from_str(&change.text),
            Some(range) => {
                let start = self.char_index(range.start);
                let end = self.char_index(range.end).max(start);
                self.content.remove(start..end);
                self.content.insert(start, &change.text);
            }
        }
    }
}

/// One entry of a [`DocumentSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentEntry {
    /// Document URI.
    pub id: String,
    /// Full text at the time the set was taken.
    pub text: String,
    /// Version at the time the set was taken.
    pub version: i32,
}

/// A point-in-time copy of every open document, ordered by URI.
///
/// Cheap to clone and can be iterated any number of times.
#[derive(Debug, Clone, Default)]
pub struct DocumentSet {
    entries: Arc<[DocumentEntry]>,
}

impl DocumentSet {
    /// Iterate over the documents.
    pub fn iter(&self) -> std::slice::Iter<'_, DocumentEntry> {
        self.entries.iter()
    }

    /// Look a document up by URI.
    pub fn get(&self, id: &str) -> Option<&DocumentEntry> {
        self.entries
            .binary_search_by(|entry| entry.id.as_str().cmp(id))
            .ok()
            .map(|i| &self.entries[i])
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<DocumentEntry> for DocumentSet {
    fn from_iter<I: IntoIterator<Item = DocumentEntry>>(iter: I) -> Self {
        let mut entries: Vec<DocumentEntry> = iter.into_iter().collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        entries.dedup_by(|a, b| a.id == b.id);
        Self {
            entries: entries.into(),
        }
    }
}

impl<'a> IntoIterator for &'a DocumentSet {
    type Item = &'a DocumentEntry;
    type IntoIter = std::slice::Iter<'a, DocumentEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Virtual file system for managing open documents.
#[derive(Debug, Default)]
pub struct Vfs {
    /// Open documents indexed by URI.
    documents: BTreeMap<String, Document>,
}

impl Vfs {
    /// Create a new empty VFS.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a document at version 0.
    pub fn open(&mut self, id: &str, text: &str) -> Result<(), VfsError> {
        self.open_versioned(id, text, 0)
    }

    /// Open a document at the editor's version.
    pub fn open_versioned(&mut self, id: &str, text: &str, version: i32) -> Result<(), VfsError> {
        if self.documents.contains_key(id) {
            return Err(VfsError::AlreadyOpen(id.to_string()));
        }
        self.documents
            .insert(id.to_string(), Document::new(text, version));
        Ok(())
    }

    /// Replace a document's content and increment its version.
    pub fn change(&mut self, id: &str, text: &str) -> Result<i32, VfsError> {
        let change = TextDocumentContentChangeEvent {
            range: None,
            range_length: None,
            text: text.to_string(),
        };
        self.change_versioned(id, std::slice::from_ref(&change), None)
    }

    /// Apply a list of content changes in order.
    ///
    /// The editor's `version` is taken only if it moves the version forward;
    /// otherwise the stored version is incremented. Returns the new version.
    pub fn change_versioned(
        &mut self,
        id: &str,
        changes: &[TextDocumentContentChangeEvent],
        version: Option<i32>,
    ) -> Result<i32, VfsError> {
        let document = self
            .documents
            .get_mut(id)
            .ok_or_else(|| VfsError::NotFound(id.to_string()))?;
        for change in changes {
            document.apply(change);
        }
        let next = document.version.saturating_add(1);
        document.version = version.filter(|v| *v > document.version).unwrap_or(next);
        Ok(document.version)
    }

    /// Close a document.
    pub fn close(&mut self, id: &str) -> Result<(), VfsError> {
        self.documents
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| VfsError::NotFound(id.to_string()))
    }

    /// Get a document by URI.
    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.get(id)
    }

    /// Get document content as a string.
    pub fn get_content(&self, id: &str) -> Option<String> {
        self.documents.get(id).map(Document::text)
    }

    /// Get a document's version.
    pub fn version(&self, id: &str) -> Option<i32> {
        self.documents.get(id).map(Document::version)
    }

    /// Whether a document is open.
    pub fn is_open(&self, id: &str) -> bool {
        self.documents.contains_key(id)
    }

    /// Get all open document URIs, in order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    /// Number of open documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether no document is open.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Snapshot every open document.
    pub fn all(&self) -> DocumentSet {
        self.documents
            .iter()
            .map(|(id, document)| DocumentEntry {
                id: id.clone(),
                text: document.text(),
                version: document.version,
            })
            .collect()
    }
}
