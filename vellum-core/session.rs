//! The document session: identity, persistence, dirty-tracking, autosave.
//!
//! Exactly one document is current per session. Switching documents
//! (`create_new`, `open_document`) replaces id and content, resets
//! `last_saved`, and cancels the pending autosave deadline in the same
//! transition, so a stale timer can never save into the wrong document.
//!
//! Cooperative hosts drive the debounce by calling [`DocumentSession::tick`]
//! from their event loop; async hosts can use [`crate::autosave::spawn`] and
//! call [`DocumentSession::save`] when a document id comes due.

use std::time::Instant;

use chrono::Utc;
use thiserror::Error;

use crate::{
  autosave::AutosaveTimer,
  catalog::{
    self,
    CatalogError,
    IndexEntry,
    PersistedDocument,
  },
  document::{
    Document,
    DocumentId,
  },
  export::{
    self,
    ExportArtifact,
  },
  markup::Markup,
  store::{
    DocumentStore,
    StoreError,
  },
  surface::EditorSurface,
};

#[derive(Debug, Error)]
pub enum SessionError {
  #[error("failed to persist document {id}")]
  SaveFailed {
    id:     DocumentId,
    #[source]
    source: StoreError,
  },
  #[error("stored record for document {id} is corrupt")]
  CorruptDocument {
    id:     String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
  #[error("no stored document {id}")]
  DocumentNotFound { id: DocumentId },
  #[error(transparent)]
  Store(#[from] StoreError),
}

impl From<CatalogError> for SessionError {
  fn from(err: CatalogError) -> Self {
    match err {
      CatalogError::Store(source) => SessionError::Store(source),
      CatalogError::CorruptDocument { id, source } => {
        SessionError::CorruptDocument {
          id,
          source: Box::new(source),
        }
      },
    }
  }
}

pub type Result<T> = std::result::Result<T, SessionError>;

pub struct DocumentSession<S: DocumentStore> {
  store:    S,
  document: Document,
  autosave: AutosaveTimer,
}

impl<S: DocumentStore> DocumentSession<S> {
  /// Start a session against a store.
  ///
  /// Adopts the persisted current document when one exists (mirroring its
  /// content into the surface), otherwise generates a fresh id and records
  /// it as current. A current record that exists but does not parse is a
  /// [`SessionError::CorruptDocument`], surfaced rather than replaced.
  pub fn open(mut store: S, surface: &mut dyn EditorSurface) -> Result<Self> {
    let document = match catalog::current_document_id(&store)? {
      Some(id) => {
        match catalog::read_document(&store, &id)? {
          Some(record) => {
            let content = Markup::parse(&record.content).map_err(|err| {
              SessionError::CorruptDocument {
                id:     record.id.clone(),
                source: Box::new(err),
              }
            })?;
            if surface.attached() {
              surface.set_markup(content.clone());
            }
            Document::from_parts(id, record.file_name, content, record.created, record.last_saved)
          },
          // An id without a record just means the document was never saved.
          None => Document::new(id),
        }
      },
      None => {
        let id = DocumentId::generate();
        catalog::set_current_document_id(&mut store, &id)?;
        Document::new(id)
      },
    };

    Ok(Self {
      store,
      document,
      autosave: AutosaveTimer::new(),
    })
  }

  pub fn document(&self) -> &Document {
    &self.document
  }

  pub fn id(&self) -> &DocumentId {
    self.document.id()
  }

  pub fn file_name(&self) -> &str {
    self.document.file_name()
  }

  pub fn set_file_name(&mut self, name: impl Into<String>) {
    self.document.set_file_name(name);
  }

  pub fn last_saved(&self) -> Option<chrono::DateTime<Utc>> {
    self.document.last_saved()
  }

  pub fn dirty(&self) -> bool {
    self.document.dirty()
  }

  pub fn word_count(&self) -> usize {
    self.document.word_count()
  }

  pub fn char_count(&self) -> usize {
    self.document.char_count()
  }

  pub fn autosave_enabled(&self) -> bool {
    self.autosave.enabled()
  }

  pub fn set_autosave_delay(&mut self, delay: std::time::Duration) {
    self.autosave.set_delay(delay);
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  pub fn store_mut(&mut self) -> &mut S {
    &mut self.store
  }

  pub fn into_store(self) -> S {
    self.store
  }

  /// Replace the current document with a fresh empty one. Always succeeds;
  /// a store failure while recording the new current id is logged, not
  /// propagated.
  pub fn create_new(&mut self, surface: &mut dyn EditorSurface) {
    self.document = Document::new(DocumentId::generate());
    self.autosave.document_switched();
    if surface.attached() {
      surface.set_markup(Markup::new());
    }
    if let Err(err) = catalog::set_current_document_id(&mut self.store, self.document.id()) {
      log::warn!("could not record new current document id: {err}");
    }
  }

  /// Import content into the current document (same id, same `last_saved`),
  /// mirror it into the surface and mark the document dirty.
  ///
  /// Silently does nothing when the surface is detached. Content that is
  /// not valid markup is imported as plain text.
  pub fn load(
    &mut self,
    content: &str,
    file_name_hint: Option<&str>,
    surface: &mut dyn EditorSurface,
    now: Instant,
  ) {
    if !surface.attached() {
      return;
    }

    let markup = match Markup::parse(content) {
      Ok(markup) => markup,
      Err(err) => {
        log::warn!("imported content is not valid markup ({err}); importing as plain text");
        Markup::plain(content)
      },
    };

    surface.set_markup(markup.clone());
    self.document.set_content(markup);
    if let Some(name) = file_name_hint {
      self.document.set_file_name(name);
    }
    self.arm_autosave(now);
  }

  /// Switch to a previously saved document by id.
  pub fn open_document(&mut self, id: DocumentId, surface: &mut dyn EditorSurface) -> Result<()> {
    let record = catalog::read_document(&self.store, &id)?
      .ok_or_else(|| SessionError::DocumentNotFound { id: id.clone() })?;
    let content = Markup::parse(&record.content).map_err(|err| {
      SessionError::CorruptDocument {
        id:     record.id.clone(),
        source: Box::new(err),
      }
    })?;

    self.autosave.document_switched();
    if surface.attached() {
      surface.set_markup(content.clone());
    }
    self.document =
      Document::from_parts(id, record.file_name, content, record.created, record.last_saved);
    catalog::set_current_document_id(&mut self.store, self.document.id())?;
    Ok(())
  }

  /// Pull the surface's markup as the new authoritative content snapshot.
  /// Call on every edit. Overlay highlight flags are view state and are
  /// stripped from the snapshot.
  pub fn sync_from_surface(&mut self, surface: &dyn EditorSurface, now: Instant) {
    if !surface.attached() {
      return;
    }
    let mut markup = surface.markup().clone();
    markup.clear_highlights();
    self.document.set_content(markup);
    self.arm_autosave(now);
  }

  /// Persist the current document and upsert its index entry.
  ///
  /// Saving an empty document is a deliberate no-op (nothing to save), not
  /// an error. On store failure `last_saved` is left unchanged and the
  /// document stays dirty.
  pub fn save(&mut self) -> Result<()> {
    if self.document.content().is_empty() {
      return Ok(());
    }

    let now = Utc::now();
    let record = PersistedDocument {
      id:         self.document.id().to_string(),
      content:    self.document.content().render(),
      file_name:  self.document.file_name().to_string(),
      last_saved: Some(now),
      created:    self.document.created_at(),
    };

    catalog::write_document(&mut self.store, &record).map_err(|err| self.save_failed(err))?;
    catalog::upsert_index_entry(&mut self.store, IndexEntry {
      id:         record.id.clone(),
      file_name:  record.file_name.clone(),
      last_saved: record.last_saved,
    })
    .map_err(|err| self.save_failed(err))?;

    self.document.mark_saved(now);
    Ok(())
  }

  /// Enable or disable debounced autosave. Enabling with content present
  /// starts a window immediately; disabling cancels any pending one without
  /// saving.
  pub fn set_autosave(&mut self, enabled: bool, now: Instant) {
    self.autosave.set_enabled(enabled);
    if enabled {
      self.arm_autosave(now);
    }
  }

  /// Drive the debounce clock; returns whether a save fired.
  pub fn tick(&mut self, now: Instant) -> Result<bool> {
    let Some(due) = self.autosave.poll(now) else {
      return Ok(false);
    };
    if &due != self.document.id() {
      log::warn!("dropping stale autosave for {due}");
      return Ok(false);
    }
    self.save()?;
    Ok(true)
  }

  pub fn export_plain_text(&self) -> ExportArtifact {
    export::plain_text(self.document.file_name(), self.document.content())
  }

  pub fn export_html(&self) -> ExportArtifact {
    export::html(self.document.file_name(), self.document.content(), Utc::now())
  }

  fn arm_autosave(&mut self, now: Instant) {
    if !self.document.content().is_empty() {
      let id = self.document.id().clone();
      self.autosave.content_changed(&id, now);
    }
  }

  fn save_failed(&self, err: CatalogError) -> SessionError {
    match err {
      CatalogError::Store(source) => {
        SessionError::SaveFailed {
          id: self.document.id().clone(),
          source,
        }
      },
      other => other.into(),
    }
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;
  use crate::{
    store::MemoryStore,
    surface::BufferSurface,
  };

  fn start() -> (DocumentSession<MemoryStore>, BufferSurface) {
    let mut surface = BufferSurface::new();
    let session = DocumentSession::open(MemoryStore::new(), &mut surface).unwrap();
    (session, surface)
  }

  fn type_text(
    session: &mut DocumentSession<MemoryStore>,
    surface: &mut BufferSurface,
    text: &str,
    now: Instant,
  ) {
    surface.set_markup(Markup::plain(text));
    session.sync_from_surface(surface, now);
  }

  #[test]
  fn save_then_reopen_roundtrips_content() {
    let (mut session, mut surface) = start();
    let id = session.id().clone();
    type_text(&mut session, &mut surface, "hello there", Instant::now());
    session.set_file_name("Greeting");
    session.save().unwrap();
    assert!(session.last_saved().is_some());
    assert!(!session.dirty());

    let store = session.into_store();
    let mut surface = BufferSurface::new();
    let session = DocumentSession::open(store, &mut surface).unwrap();

    assert_eq!(session.id(), &id);
    assert_eq!(session.file_name(), "Greeting");
    assert_eq!(surface.plain_text(), "hello there");
    assert!(session.last_saved().is_some());
  }

  #[test]
  fn saving_an_empty_document_is_a_noop() {
    let (mut session, _surface) = start();
    session.save().unwrap();
    assert_eq!(session.last_saved(), None);
    assert!(catalog::read_index(session.store()).unwrap().is_empty());
  }

  #[test]
  fn save_upserts_the_index() {
    let (mut session, mut surface) = start();
    type_text(&mut session, &mut surface, "v1", Instant::now());
    session.save().unwrap();
    type_text(&mut session, &mut surface, "v2", Instant::now());
    session.save().unwrap();

    let index = catalog::read_index(session.store()).unwrap();
    assert_eq!(index.len(), 1);
    assert_eq!(index[0].id, session.id().to_string());
  }

  #[test]
  fn debounce_saves_once_after_the_quiet_period() {
    let (mut session, mut surface) = start();
    let t0 = Instant::now();
    session.set_autosave(true, t0);

    type_text(&mut session, &mut surface, "a", t0);
    type_text(&mut session, &mut surface, "ab", t0 + Duration::from_secs(1));
    type_text(&mut session, &mut surface, "abc", t0 + Duration::from_secs(2));

    // First deadline (t0 + 3s) was pushed out by the later edits.
    assert!(!session.tick(t0 + Duration::from_secs(4)).unwrap());
    assert_eq!(session.last_saved(), None);

    assert!(session.tick(t0 + Duration::from_secs(5)).unwrap());
    assert!(session.last_saved().is_some());
    assert!(!session.dirty());

    assert!(!session.tick(t0 + Duration::from_secs(60)).unwrap());
  }

  #[test]
  fn disabling_autosave_cancels_the_pending_save() {
    let (mut session, mut surface) = start();
    let t0 = Instant::now();
    session.set_autosave(true, t0);
    type_text(&mut session, &mut surface, "draft", t0);

    session.set_autosave(false, t0 + Duration::from_secs(1));
    assert!(!session.tick(t0 + Duration::from_secs(10)).unwrap());
    assert_eq!(session.last_saved(), None);
  }

  #[test]
  fn create_new_switches_identity_and_cancels_autosave() {
    let (mut session, mut surface) = start();
    let t0 = Instant::now();
    let old_id = session.id().clone();
    session.set_autosave(true, t0);
    type_text(&mut session, &mut surface, "old content", t0);

    session.create_new(&mut surface);
    assert_ne!(session.id(), &old_id);
    assert_eq!(session.last_saved(), None);
    assert!(surface.plain_text().is_empty());
    assert_eq!(
      catalog::current_document_id(session.store()).unwrap().as_ref(),
      Some(session.id())
    );

    // The old document's timer must not fire into the new one.
    assert!(!session.tick(t0 + Duration::from_secs(10)).unwrap());
    assert!(
      catalog::read_document(session.store(), &old_id)
        .unwrap()
        .is_none()
    );
  }

  #[test]
  fn load_marks_dirty_and_keeps_identity() {
    let (mut session, mut surface) = start();
    let id = session.id().clone();

    session.load("The <strong>plan</strong>", Some("Plan"), &mut surface, Instant::now());
    assert_eq!(session.id(), &id);
    assert_eq!(session.file_name(), "Plan");
    assert!(session.dirty());
    assert_eq!(session.last_saved(), None);
    assert_eq!(surface.plain_text(), "The plan");
  }

  #[test]
  fn load_with_detached_surface_is_a_noop() {
    let (mut session, mut surface) = start();
    surface.detach();

    session.load("content", Some("Name"), &mut surface, Instant::now());
    assert!(!session.dirty());
    assert_eq!(session.file_name(), crate::document::DEFAULT_FILE_NAME);
  }

  #[test]
  fn load_falls_back_to_plain_text_for_foreign_markup() {
    let (mut session, mut surface) = start();
    session.load("<div>not ours</div>", None, &mut surface, Instant::now());
    assert_eq!(surface.plain_text(), "<div>not ours</div>");
  }

  #[test]
  fn open_document_switches_to_a_saved_document() {
    let (mut session, mut surface) = start();
    let first_id = session.id().clone();
    type_text(&mut session, &mut surface, "first", Instant::now());
    session.save().unwrap();

    session.create_new(&mut surface);
    type_text(&mut session, &mut surface, "second", Instant::now());
    session.save().unwrap();

    session.open_document(first_id.clone(), &mut surface).unwrap();
    assert_eq!(session.id(), &first_id);
    assert_eq!(surface.plain_text(), "first");
    assert!(session.last_saved().is_some());

    let missing = DocumentId::from("doc_missing");
    assert!(matches!(
      session.open_document(missing, &mut surface),
      Err(SessionError::DocumentNotFound { .. })
    ));
  }

  #[test]
  fn corrupt_current_record_surfaces_instead_of_replacing() {
    let mut store = MemoryStore::new();
    store.set(catalog::CURRENT_DOC_KEY, "doc_bad").unwrap();
    store.set("doc:doc_bad", "{broken").unwrap();

    let mut surface = BufferSurface::new();
    assert!(matches!(
      DocumentSession::open(store, &mut surface),
      Err(SessionError::CorruptDocument { .. })
    ));
  }

  #[test]
  fn sync_strips_search_overlays_from_the_snapshot() {
    let (mut session, mut surface) = start();
    surface.set_markup(Markup::plain("fox fox"));

    let mut search = crate::search::SearchSession::new();
    search.set_query("fox", &mut surface).unwrap();
    assert!(surface.markup().render().contains("search-highlight"));

    session.sync_from_surface(&surface, Instant::now());
    assert!(!session.document().content().render().contains("search-highlight"));
    assert_eq!(session.document().content().plain_text(), "fox fox");
  }

  #[test]
  fn failed_save_leaves_save_state_untouched() {
    struct FailingStore(MemoryStore);

    impl DocumentStore for FailingStore {
      fn get(&self, key: &str) -> crate::store::Result<Option<String>> {
        self.0.get(key)
      }

      fn set(&mut self, _key: &str, _value: &str) -> crate::store::Result<()> {
        Err(StoreError::Io(std::io::Error::other("disk full")))
      }

      fn remove(&mut self, key: &str) -> crate::store::Result<()> {
        self.0.remove(key)
      }

      fn keys(&self) -> crate::store::Result<Vec<String>> {
        self.0.keys()
      }
    }

    let mut inner = MemoryStore::new();
    inner.set(catalog::CURRENT_DOC_KEY, "doc_keep").unwrap();

    let mut surface = BufferSurface::new();
    let mut session = DocumentSession::open(FailingStore(inner), &mut surface).unwrap();
    surface.set_markup(Markup::plain("precious"));
    session.sync_from_surface(&surface, Instant::now());

    assert!(matches!(session.save(), Err(SessionError::SaveFailed { .. })));
    assert_eq!(session.last_saved(), None);
    assert!(session.dirty());
  }

  #[test]
  fn counts_track_the_plain_projection() {
    let (mut session, mut surface) = start();
    assert_eq!(session.word_count(), 0);
    assert_eq!(session.char_count(), 0);

    type_text(&mut session, &mut surface, "  The quick fox  ", Instant::now());
    assert_eq!(session.word_count(), 3);
    assert_eq!(session.char_count(), "  The quick fox  ".chars().count());
  }
}
