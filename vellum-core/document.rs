//! Document identity and the in-memory state of the current document.

use chrono::{
  DateTime,
  Utc,
};

use crate::markup::Markup;

pub const DEFAULT_FILE_NAME: &str = "Untitled Document";

/// Opaque, stable document identifier. Generated once per document lifetime
/// and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId(String);

impl DocumentId {
  /// `doc_<millis>_<random>`, unique enough for a single-writer store.
  pub fn generate() -> Self {
    Self(format!(
      "doc_{}_{:08x}",
      Utc::now().timestamp_millis(),
      rand::random::<u32>()
    ))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl std::fmt::Display for DocumentId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<String> for DocumentId {
  fn from(value: String) -> Self {
    Self(value)
  }
}

impl From<&str> for DocumentId {
  fn from(value: &str) -> Self {
    Self(value.to_string())
  }
}

/// The single current document: content snapshot plus save bookkeeping.
///
/// `dirty` tracks divergence from the last persisted snapshot; `last_saved`
/// stays `None` until the first successful save of this document's lifetime.
#[derive(Debug, Clone)]
pub struct Document {
  id:         DocumentId,
  file_name:  String,
  content:    Markup,
  created_at: DateTime<Utc>,
  last_saved: Option<DateTime<Utc>>,
  dirty:      bool,
}

impl Document {
  pub fn new(id: DocumentId) -> Self {
    Self {
      id,
      file_name: DEFAULT_FILE_NAME.to_string(),
      content: Markup::new(),
      created_at: Utc::now(),
      last_saved: None,
      dirty: false,
    }
  }

  /// Reconstruct a document from its persisted parts.
  pub fn from_parts(
    id: DocumentId,
    file_name: String,
    content: Markup,
    created_at: DateTime<Utc>,
    last_saved: Option<DateTime<Utc>>,
  ) -> Self {
    Self {
      id,
      file_name,
      content,
      created_at,
      last_saved,
      dirty: false,
    }
  }

  pub fn id(&self) -> &DocumentId {
    &self.id
  }

  pub fn file_name(&self) -> &str {
    &self.file_name
  }

  pub fn set_file_name(&mut self, name: impl Into<String>) {
    self.file_name = name.into();
  }

  pub fn content(&self) -> &Markup {
    &self.content
  }

  pub fn set_content(&mut self, content: Markup) {
    self.content = content;
    self.dirty = true;
  }

  pub fn created_at(&self) -> DateTime<Utc> {
    self.created_at
  }

  pub fn last_saved(&self) -> Option<DateTime<Utc>> {
    self.last_saved
  }

  pub fn dirty(&self) -> bool {
    self.dirty
  }

  pub fn mark_saved(&mut self, at: DateTime<Utc>) {
    self.last_saved = Some(at);
    self.dirty = false;
  }

  pub fn word_count(&self) -> usize {
    self.content.word_count()
  }

  pub fn char_count(&self) -> usize {
    self.content.char_count()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn generated_ids_are_distinct() {
    let a = DocumentId::generate();
    let b = DocumentId::generate();
    assert_ne!(a, b);
    assert!(a.as_str().starts_with("doc_"));
  }

  #[test]
  fn content_mutation_marks_dirty_until_saved() {
    let mut doc = Document::new(DocumentId::generate());
    assert!(!doc.dirty());
    assert_eq!(doc.last_saved(), None);

    doc.set_content(Markup::plain("hello"));
    assert!(doc.dirty());

    doc.mark_saved(Utc::now());
    assert!(!doc.dirty());
    assert!(doc.last_saved().is_some());
  }
}
