//! Typed record layer over the raw key-value store.
//!
//! Key schema:
//! - `doc:<id>`        one JSON record per document
//! - `docs:index`      JSON array of every ever-saved document, upserted by
//!   id, never auto-pruned here (pruning is an external concern)
//! - `current-doc-id`  the active document id
//! - `theme`           `"light" | "dark" | "system"`

use chrono::{
  DateTime,
  Utc,
};
use serde::{
  Deserialize,
  Serialize,
};
use thiserror::Error;

use crate::{
  document::DocumentId,
  store::{
    DocumentStore,
    StoreError,
  },
};

pub const INDEX_KEY: &str = "docs:index";
pub const CURRENT_DOC_KEY: &str = "current-doc-id";
pub const THEME_KEY: &str = "theme";

pub fn document_key(id: &DocumentId) -> String {
  format!("doc:{id}")
}

#[derive(Debug, Error)]
pub enum CatalogError {
  #[error(transparent)]
  Store(#[from] StoreError),
  #[error("stored record for document {id} is corrupt")]
  CorruptDocument {
    id:     String,
    #[source]
    source: serde_json::Error,
  },
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// The JSON shape of a `doc:<id>` record. Field names stay camelCase for
/// compatibility with stores written by the original front-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedDocument {
  pub id:         String,
  pub content:    String,
  pub file_name:  String,
  pub last_saved: Option<DateTime<Utc>>,
  pub created:    DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
  pub id:         String,
  pub file_name:  String,
  pub last_saved: Option<DateTime<Utc>>,
}

/// `None` when the record is absent; `CorruptDocument` when it exists but
/// does not parse. Corruption is surfaced, never papered over.
pub fn read_document(store: &dyn DocumentStore, id: &DocumentId) -> Result<Option<PersistedDocument>> {
  let Some(raw) = store.get(&document_key(id))? else {
    return Ok(None);
  };
  serde_json::from_str(&raw)
    .map(Some)
    .map_err(|source| CatalogError::CorruptDocument {
      id: id.to_string(),
      source,
    })
}

pub fn write_document(store: &mut dyn DocumentStore, record: &PersistedDocument) -> Result<()> {
  let raw = serde_json::to_string(record).expect("document record serializes");
  store.set(&document_key(&DocumentId::from(record.id.as_str())), &raw)?;
  Ok(())
}

/// The index is advisory; a malformed one is logged and treated as empty
/// rather than wedging every save.
pub fn read_index(store: &dyn DocumentStore) -> Result<Vec<IndexEntry>> {
  let Some(raw) = store.get(INDEX_KEY)? else {
    return Ok(Vec::new());
  };
  match serde_json::from_str(&raw) {
    Ok(entries) => Ok(entries),
    Err(err) => {
      log::warn!("ignoring malformed document index: {err}");
      Ok(Vec::new())
    },
  }
}

pub fn upsert_index_entry(store: &mut dyn DocumentStore, entry: IndexEntry) -> Result<()> {
  let mut entries = read_index(store)?;
  match entries.iter_mut().find(|existing| existing.id == entry.id) {
    Some(existing) => *existing = entry,
    None => entries.push(entry),
  }
  let raw = serde_json::to_string(&entries).expect("index serializes");
  store.set(INDEX_KEY, &raw)?;
  Ok(())
}

pub fn current_document_id(store: &dyn DocumentStore) -> Result<Option<DocumentId>> {
  Ok(store.get(CURRENT_DOC_KEY)?.map(DocumentId::from))
}

pub fn set_current_document_id(store: &mut dyn DocumentStore, id: &DocumentId) -> Result<()> {
  store.set(CURRENT_DOC_KEY, id.as_str())?;
  Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
  Light,
  Dark,
  #[default]
  System,
}

impl std::fmt::Display for Theme {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      Theme::Light => "light",
      Theme::Dark => "dark",
      Theme::System => "system",
    };
    f.write_str(name)
  }
}

impl std::str::FromStr for Theme {
  type Err = String;

  fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
    match value {
      "light" => Ok(Theme::Light),
      "dark" => Ok(Theme::Dark),
      "system" => Ok(Theme::System),
      other => Err(format!("unknown theme {other:?}")),
    }
  }
}

/// Absent or unrecognized values fall back to the default theme.
pub fn theme(store: &dyn DocumentStore) -> Result<Theme> {
  let Some(raw) = store.get(THEME_KEY)? else {
    return Ok(Theme::default());
  };
  match raw.parse() {
    Ok(theme) => Ok(theme),
    Err(err) => {
      log::warn!("{err}, using default");
      Ok(Theme::default())
    },
  }
}

pub fn set_theme(store: &mut dyn DocumentStore, theme: Theme) -> Result<()> {
  store.set(THEME_KEY, &theme.to_string())?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::MemoryStore;

  fn record(id: &str, file_name: &str) -> PersistedDocument {
    PersistedDocument {
      id: id.to_string(),
      content: "hello".to_string(),
      file_name: file_name.to_string(),
      last_saved: Some(Utc::now()),
      created: Utc::now(),
    }
  }

  #[test]
  fn document_records_roundtrip() {
    let mut store = MemoryStore::new();
    let id = DocumentId::from("doc_1_a");
    write_document(&mut store, &record("doc_1_a", "Notes")).unwrap();

    let loaded = read_document(&store, &id).unwrap().unwrap();
    assert_eq!(loaded.id, "doc_1_a");
    assert_eq!(loaded.file_name, "Notes");
    assert_eq!(loaded.content, "hello");
  }

  #[test]
  fn records_use_camel_case_and_iso_timestamps() {
    let mut store = MemoryStore::new();
    write_document(&mut store, &record("doc_1_a", "Notes")).unwrap();

    let raw = store.get("doc:doc_1_a").unwrap().unwrap();
    assert!(raw.contains("\"fileName\":\"Notes\""));
    assert!(raw.contains("\"lastSaved\":\""));
    assert!(raw.contains('T'), "timestamps should be ISO-8601: {raw}");
  }

  #[test]
  fn missing_record_is_none_but_corrupt_record_is_an_error() {
    let mut store = MemoryStore::new();
    let id = DocumentId::from("doc_1_a");
    assert!(read_document(&store, &id).unwrap().is_none());

    store.set("doc:doc_1_a", "{not json").unwrap();
    assert!(matches!(
      read_document(&store, &id),
      Err(CatalogError::CorruptDocument { .. })
    ));
  }

  #[test]
  fn index_upserts_by_id() {
    let mut store = MemoryStore::new();
    upsert_index_entry(&mut store, IndexEntry {
      id:         "doc_1".into(),
      file_name:  "First".into(),
      last_saved: None,
    })
    .unwrap();
    upsert_index_entry(&mut store, IndexEntry {
      id:         "doc_2".into(),
      file_name:  "Second".into(),
      last_saved: None,
    })
    .unwrap();
    upsert_index_entry(&mut store, IndexEntry {
      id:         "doc_1".into(),
      file_name:  "First, renamed".into(),
      last_saved: None,
    })
    .unwrap();

    let entries = read_index(&store).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].file_name, "First, renamed");
    assert_eq!(entries[1].id, "doc_2");
  }

  #[test]
  fn malformed_index_reads_as_empty() {
    let mut store = MemoryStore::new();
    store.set(INDEX_KEY, "oops").unwrap();
    assert!(read_index(&store).unwrap().is_empty());
  }

  #[test]
  fn theme_defaults_and_roundtrips() {
    let mut store = MemoryStore::new();
    assert_eq!(theme(&store).unwrap(), Theme::System);

    set_theme(&mut store, Theme::Dark).unwrap();
    assert_eq!(theme(&store).unwrap(), Theme::Dark);

    store.set(THEME_KEY, "mauve").unwrap();
    assert_eq!(theme(&store).unwrap(), Theme::System);
  }
}
