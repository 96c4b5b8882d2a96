//! Literal substring search with a navigable match cursor.
//!
//! Every query is escaped before compilation, so the user never sees (or
//! accidentally writes) regular-expression syntax: searching for `a.b` finds
//! `a.b`, not `axb`. Matching runs against the plain-text projection;
//! highlighting is an overlay on the markup runs, which keeps the visible
//! text byte-for-byte unchanged.
//!
//! The cursor (`active`) is 1-based; 0 means "no active match" and only
//! occurs while the match list is empty. Matches are never navigated stale:
//! every operation that changes the document re-indexes before touching the
//! cursor again.

use regex::{
  Regex,
  RegexBuilder,
};
use thiserror::Error;

use crate::{
  markup::{
    MarkupError,
    TextSpan,
  },
  surface::EditorSurface,
};

#[derive(Debug, Error)]
pub enum SearchError {
  #[error("could not build search pattern")]
  Pattern(#[from] regex::Error),
  #[error(transparent)]
  Markup(#[from] MarkupError),
}

pub type Result<T> = std::result::Result<T, SearchError>;

/// Compile a raw user query into a literal-match pattern.
///
/// Escaping is total: every character the pattern language treats specially
/// is covered by [`regex::escape`]. Case-insensitive is the default mode.
pub fn build_pattern(query: &str, case_sensitive: bool) -> std::result::Result<Regex, regex::Error> {
  RegexBuilder::new(&regex::escape(query))
    .case_insensitive(!case_sensitive)
    .build()
}

/// Ordered, non-overlapping spans of every occurrence in `text`.
pub fn index_matches(text: &str, pattern: &Regex) -> Vec<TextSpan> {
  pattern
    .find_iter(text)
    .map(|m| TextSpan::new(m.start(), m.end()))
    .collect()
}

/// A live search over one document surface.
#[derive(Debug, Default)]
pub struct SearchSession {
  query:          String,
  case_sensitive: bool,
  matches:        Vec<TextSpan>,
  active:         usize,
}

impl SearchSession {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn query(&self) -> &str {
    &self.query
  }

  pub fn case_sensitive(&self) -> bool {
    self.case_sensitive
  }

  pub fn matches(&self) -> &[TextSpan] {
    &self.matches
  }

  pub fn match_count(&self) -> usize {
    self.matches.len()
  }

  /// 1-based index of the active match; 0 when there is none.
  pub fn active_index(&self) -> usize {
    self.active
  }

  /// Rebuild the match list for `query` against the surface's current text.
  ///
  /// Empty query, and a query with zero occurrences, both land in the same
  /// reset state: no matches, no cursor, no highlight overlay left behind.
  pub fn set_query(&mut self, query: &str, surface: &mut dyn EditorSurface) -> Result<()> {
    if !surface.attached() {
      return Ok(());
    }

    self.query = query.to_string();
    surface.markup_mut().clear_highlights();
    self.matches.clear();
    self.active = 0;

    if self.query.is_empty() {
      return Ok(());
    }

    let pattern = build_pattern(&self.query, self.case_sensitive)?;
    self.matches = index_matches(&surface.plain_text(), &pattern);
    if self.matches.is_empty() {
      return Ok(());
    }

    self.active = 1;
    self.focus(surface)
  }

  /// Switch matching policy and re-run the current query under it. The flag
  /// and the match list always change together, so a detached surface leaves
  /// both untouched.
  pub fn set_case_sensitive(&mut self, case_sensitive: bool, surface: &mut dyn EditorSurface) -> Result<()> {
    if !surface.attached() {
      return Ok(());
    }
    self.case_sensitive = case_sensitive;
    let query = self.query.clone();
    self.set_query(&query, surface)
  }

  /// Advance the cursor, wrapping from the last match back to the first.
  pub fn next(&mut self, surface: &mut dyn EditorSurface) -> Result<()> {
    if self.matches.is_empty() || !surface.attached() {
      return Ok(());
    }
    self.active = if self.active >= self.matches.len() {
      1
    } else {
      self.active + 1
    };
    self.focus(surface)
  }

  /// Retreat the cursor, wrapping from the first match back to the last.
  pub fn previous(&mut self, surface: &mut dyn EditorSurface) -> Result<()> {
    if self.matches.is_empty() || !surface.attached() {
      return Ok(());
    }
    self.active = if self.active <= 1 {
      self.matches.len()
    } else {
      self.active - 1
    };
    self.focus(surface)
  }

  /// Replace the active match with a literal string, then re-index.
  ///
  /// Post-replace cursor rule: land on the match that now occupies the old
  /// active index, wrapping to 1 when the old index exceeds the new count.
  pub fn replace_one(&mut self, replacement: &str, surface: &mut dyn EditorSurface) -> Result<()> {
    if self.query.is_empty() || self.matches.is_empty() || !surface.attached() {
      return Ok(());
    }

    let span = self.matches[self.active - 1];
    let old_active = self.active;

    let markup = surface.markup_mut();
    markup.clear_highlights();
    markup.replace_range(span, replacement)?;

    let pattern = build_pattern(&self.query, self.case_sensitive)?;
    self.matches = index_matches(&surface.plain_text(), &pattern);
    if self.matches.is_empty() {
      self.active = 0;
      return Ok(());
    }

    self.active = if old_active <= self.matches.len() {
      old_active
    } else {
      1
    };
    self.focus(surface)
  }

  /// Replace every occurrence of the query in a single right-to-left pass.
  ///
  /// Afterwards the match list is empty by construction; a replacement that
  /// reintroduces the query is accepted, not special-cased.
  pub fn replace_all(&mut self, replacement: &str, surface: &mut dyn EditorSurface) -> Result<()> {
    if self.query.is_empty() || !surface.attached() {
      return Ok(());
    }

    let pattern = build_pattern(&self.query, self.case_sensitive)?;
    let markup = surface.markup_mut();
    markup.clear_highlights();

    let spans = index_matches(&markup.plain_text(), &pattern);
    // Right to left so earlier spans stay valid as the text shrinks or grows.
    for span in spans.iter().rev() {
      markup.replace_range(*span, replacement)?;
    }

    self.matches.clear();
    self.active = 0;
    Ok(())
  }

  fn focus(&mut self, surface: &mut dyn EditorSurface) -> Result<()> {
    surface
      .markup_mut()
      .apply_highlights(&self.matches, self.active)?;
    surface.reveal(self.matches[self.active - 1]);
    Ok(())
  }
}
