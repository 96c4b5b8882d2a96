//! The editable surface the engines read from and write overlays into.
//!
//! The real surface is presentation-layer territory; the engines only need
//! the small contract below. [`BufferSurface`] is the in-memory
//! implementation used by headless hosts and by every test in this crate.

use crate::markup::{
  Markup,
  TextSpan,
};

/// What the engines require from a live editable surface.
///
/// A detached surface (`attached() == false`) turns every engine operation
/// that would touch it into a silent no-op; callers are expected to guard,
/// the engines merely stay safe.
pub trait EditorSurface {
  fn attached(&self) -> bool;

  /// The markup-free projection used for counting and match indexing.
  fn plain_text(&self) -> String;

  fn markup(&self) -> &Markup;

  fn markup_mut(&mut self) -> &mut Markup;

  fn set_markup(&mut self, markup: Markup);

  /// Scroll the given span into view. Purely advisory.
  fn reveal(&mut self, span: TextSpan);
}

/// An in-memory surface: a markup buffer plus enough bookkeeping to observe
/// reveal requests and to simulate detachment.
#[derive(Debug, Default)]
pub struct BufferSurface {
  markup:   Markup,
  detached: bool,
  revealed: Option<TextSpan>,
}

impl BufferSurface {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_markup(markup: Markup) -> Self {
    Self {
      markup,
      detached: false,
      revealed: None,
    }
  }

  /// Simulate the surface going away (e.g. an unmounted editor view).
  pub fn detach(&mut self) {
    self.detached = true;
  }

  pub fn last_revealed(&self) -> Option<TextSpan> {
    self.revealed
  }
}

impl EditorSurface for BufferSurface {
  fn attached(&self) -> bool {
    !self.detached
  }

  fn plain_text(&self) -> String {
    self.markup.plain_text()
  }

  fn markup(&self) -> &Markup {
    &self.markup
  }

  fn markup_mut(&mut self) -> &mut Markup {
    &mut self.markup
  }

  fn set_markup(&mut self, markup: Markup) {
    self.markup = markup;
  }

  fn reveal(&mut self, span: TextSpan) {
    self.revealed = Some(span);
  }
}
