//! Debounced autosave scheduling.
//!
//! [`AutosaveTimer`] is the state machine: at most one pending deadline,
//! keyed by the document it was armed for. Every content mutation restarts
//! the wait (debounce, not throttle), disabling clears it, and a document
//! switch clears it so a stale timer can never save into the wrong document.
//! The clock is passed in, which keeps cooperative hosts and tests fully
//! deterministic.
//!
//! [`spawn`] wraps the same machine in a background tokio task for hosts
//! that run an async loop: feed it [`AutosaveEvent`]s, receive due document
//! ids on the returned channel, and perform the actual save on the caller's
//! side exactly as a manual save.

use std::time::{
  Duration,
  Instant,
};

use tokio::sync::mpsc;

use crate::document::DocumentId;

/// Fixed debounce delay between the last content mutation and the save.
pub const AUTOSAVE_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
struct Pending {
  document: DocumentId,
  deadline: Instant,
}

#[derive(Debug)]
pub struct AutosaveTimer {
  enabled: bool,
  delay:   Duration,
  pending: Option<Pending>,
}

impl Default for AutosaveTimer {
  fn default() -> Self {
    Self::new()
  }
}

impl AutosaveTimer {
  pub fn new() -> Self {
    Self::with_delay(AUTOSAVE_DELAY)
  }

  pub fn with_delay(delay: Duration) -> Self {
    Self {
      enabled: false,
      delay,
      pending: None,
    }
  }

  pub fn enabled(&self) -> bool {
    self.enabled
  }

  pub fn delay(&self) -> Duration {
    self.delay
  }

  /// Applies to windows armed after the call; a pending one keeps its
  /// original deadline.
  pub fn set_delay(&mut self, delay: Duration) {
    self.delay = delay;
  }

  /// Disabling cancels any pending deadline without saving. Enabling does
  /// not arm by itself; the next content mutation does.
  pub fn set_enabled(&mut self, enabled: bool) {
    self.enabled = enabled;
    if !enabled {
      self.pending = None;
    }
  }

  /// (Re)start the debounce window for `document`. A no-op while disabled.
  pub fn content_changed(&mut self, document: &DocumentId, now: Instant) {
    if !self.enabled {
      return;
    }
    self.pending = Some(Pending {
      document: document.clone(),
      deadline: now + self.delay,
    });
  }

  /// The current document changed identity; any pending save belonged to the
  /// old one and must not fire.
  pub fn document_switched(&mut self) {
    self.pending = None;
  }

  pub fn deadline(&self) -> Option<Instant> {
    self.pending.as_ref().map(|pending| pending.deadline)
  }

  /// Take the due document, if the quiet period has elapsed.
  pub fn poll(&mut self, now: Instant) -> Option<DocumentId> {
    if self.deadline()? <= now {
      self.pending.take().map(|pending| pending.document)
    } else {
      None
    }
  }

  /// Take the pending document unconditionally; for drivers that already
  /// slept until the deadline.
  pub fn finish_debounce(&mut self) -> Option<DocumentId> {
    self.pending.take().map(|pending| pending.document)
  }
}

/// Events a host feeds the async driver.
#[derive(Debug)]
pub enum AutosaveEvent {
  ContentChanged(DocumentId),
  DocumentSwitched,
  SetEnabled(bool),
}

/// Run an [`AutosaveTimer`] as a background task.
///
/// Returns the event sender and the receiver of due document ids. The worker
/// is only spawned when called inside a tokio runtime, so constructing one
/// in unrelated unit tests stays cheap.
pub fn spawn(timer: AutosaveTimer) -> (mpsc::Sender<AutosaveEvent>, mpsc::Receiver<DocumentId>) {
  let (event_tx, event_rx) = mpsc::channel(256);
  let (due_tx, due_rx) = mpsc::channel(8);
  if tokio::runtime::Handle::try_current().is_ok() {
    tokio::spawn(run(timer, event_rx, due_tx));
  }
  (event_tx, due_rx)
}

async fn run(
  mut timer: AutosaveTimer,
  mut events: mpsc::Receiver<AutosaveEvent>,
  due: mpsc::Sender<DocumentId>,
) {
  loop {
    let event = match timer.deadline() {
      Some(deadline) => {
        let deadline = tokio::time::Instant::from_std(deadline);
        match tokio::time::timeout_at(deadline, events.recv()).await {
          Ok(event) => event,
          Err(_) => {
            if let Some(document) = timer.finish_debounce()
              && due.send(document).await.is_err()
            {
              break;
            }
            continue;
          },
        }
      },
      None => events.recv().await,
    };

    let Some(event) = event else {
      break;
    };
    match event {
      AutosaveEvent::ContentChanged(document) => {
        timer.content_changed(&document, Instant::now());
      },
      AutosaveEvent::DocumentSwitched => timer.document_switched(),
      AutosaveEvent::SetEnabled(enabled) => timer.set_enabled(enabled),
    }
  }
}
