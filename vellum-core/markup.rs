//! Rich text as a normalized run sequence.
//!
//! A document's content is a flat list of [`Run`]s, each pairing a text
//! fragment with a [`Styles`] set. Search highlights are transient overlay
//! flags on the same runs, so applying and stripping them round-trips the
//! markup exactly instead of splicing strings.
//!
//! # Normal form
//!
//! - no empty runs
//! - adjacent runs differ in style set
//!
//! All mutating operations restore normal form before returning, except
//! [`Markup::apply_highlights`], which deliberately keeps match boundaries as
//! run boundaries so the active match stays addressable.
//!
//! Offsets taken by [`Markup::replace_range`] and [`Markup::apply_highlights`]
//! are byte offsets into the plain-text projection.

use bitflags::bitflags;
use thiserror::Error;

bitflags! {
  /// Character styling for a single run.
  ///
  /// `HIGHLIGHT` and `ACTIVE` are overlay flags owned by the search engine;
  /// they never survive a snapshot or a save.
  #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
  pub struct Styles: u8 {
    const BOLD          = 1 << 0;
    const ITALIC        = 1 << 1;
    const UNDERLINE     = 1 << 2;
    const STRIKETHROUGH = 1 << 3;
    const HIGHLIGHT     = 1 << 4;
    const ACTIVE        = 1 << 5;
  }
}

impl Styles {
  pub const OVERLAY: Styles = Styles::HIGHLIGHT.union(Styles::ACTIVE);
}

/// A half-open `start..end` byte range over the plain-text projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSpan {
  pub start: usize,
  pub end:   usize,
}

impl TextSpan {
  pub const fn new(start: usize, end: usize) -> Self {
    Self { start, end }
  }

  pub const fn len(&self) -> usize {
    self.end - self.start
  }

  pub const fn is_empty(&self) -> bool {
    self.start == self.end
  }
}

#[derive(Debug, Error)]
pub enum MarkupError {
  #[error("unterminated tag starting at byte {0}")]
  UnterminatedTag(usize),
  #[error("unsupported tag <{0}>")]
  UnsupportedTag(String),
  #[error("closing tag </{0}> does not match the innermost open tag")]
  MismatchedClose(String),
  #[error("unclosed tag at end of input")]
  UnclosedTag,
  #[error("span {start}..{end} is outside the text (length {len})")]
  SpanOutOfBounds {
    start: usize,
    end:   usize,
    len:   usize,
  },
  #[error("span boundary falls inside a multi-byte character")]
  NotCharBoundary,
}

pub type Result<T> = std::result::Result<T, MarkupError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
  pub text:   String,
  pub styles: Styles,
}

impl Run {
  pub fn new(text: impl Into<String>, styles: Styles) -> Self {
    Self {
      text: text.into(),
      styles,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Markup {
  runs: Vec<Run>,
}

impl Markup {
  pub fn new() -> Self {
    Self::default()
  }

  /// A single unstyled run. The entry point for plain-text imports.
  pub fn plain(text: impl Into<String>) -> Self {
    let mut markup = Self {
      runs: vec![Run::new(text, Styles::empty())],
    };
    markup.normalize();
    markup
  }

  pub fn runs(&self) -> &[Run] {
    &self.runs
  }

  pub fn is_empty(&self) -> bool {
    self.runs.is_empty()
  }

  /// The markup-free text the search engine indexes against.
  pub fn plain_text(&self) -> String {
    self.runs.iter().map(|run| run.text.as_str()).collect()
  }

  pub fn len_bytes(&self) -> usize {
    self.runs.iter().map(|run| run.text.len()).sum()
  }

  pub fn char_count(&self) -> usize {
    self.runs.iter().map(|run| run.text.chars().count()).sum()
  }

  pub fn word_count(&self) -> usize {
    self.plain_text().split_whitespace().count()
  }

  /// Parse the serialized tag vocabulary back into runs.
  ///
  /// Only the fixed vocabulary produced by [`Markup::render`] is accepted;
  /// anything else is an error so corrupt persisted content is caught at the
  /// boundary instead of rendering garbage.
  pub fn parse(input: &str) -> Result<Self> {
    let mut stack: Vec<Styles> = Vec::new();
    let mut current = Styles::empty();
    let mut runs: Vec<Run> = Vec::new();
    let mut text = String::new();

    let flush = |text: &mut String, styles: Styles, runs: &mut Vec<Run>| {
      if !text.is_empty() {
        runs.push(Run::new(std::mem::take(text), styles));
      }
    };

    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
      match bytes[i] {
        b'<' => {
          let close = input[i..]
            .find('>')
            .map(|offset| i + offset)
            .ok_or(MarkupError::UnterminatedTag(i))?;
          let tag = &input[i + 1..close];
          i = close + 1;

          if let Some(name) = tag.strip_prefix('/') {
            let expected = tag_styles(name).ok_or_else(|| {
              MarkupError::UnsupportedTag(name.to_string())
            })?;
            match stack.last() {
              // `</mark>` closes both highlight variants.
              Some(&top) if top & !Styles::ACTIVE == expected => {
                flush(&mut text, current, &mut runs);
                stack.pop();
                current = stack.iter().fold(Styles::empty(), |acc, s| acc | *s);
              },
              _ => return Err(MarkupError::MismatchedClose(name.to_string())),
            }
          } else {
            let styles =
              open_tag_styles(tag).ok_or_else(|| MarkupError::UnsupportedTag(tag.to_string()))?;
            flush(&mut text, current, &mut runs);
            stack.push(styles);
            current |= styles;
          }
        },
        b'&' => {
          // Only the three entities the renderer emits; a bare ampersand is
          // taken literally.
          if input[i..].starts_with("&amp;") {
            text.push('&');
            i += 5;
          } else if input[i..].starts_with("&lt;") {
            text.push('<');
            i += 4;
          } else if input[i..].starts_with("&gt;") {
            text.push('>');
            i += 4;
          } else {
            text.push('&');
            i += 1;
          }
        },
        _ => {
          let ch = input[i..].chars().next().expect("byte inside input");
          text.push(ch);
          i += ch.len_utf8();
        },
      }
    }

    if !stack.is_empty() {
      return Err(MarkupError::UnclosedTag);
    }
    flush(&mut text, current, &mut runs);

    let mut markup = Self { runs };
    markup.normalize();
    Ok(markup)
  }

  /// Serialize to the fixed tag vocabulary.
  ///
  /// Each run opens its own tags in a fixed nesting order, so the output is
  /// canonical: `parse(render(m)) == m` for any normalized `m`.
  pub fn render(&self) -> String {
    let mut out = String::new();
    for run in &self.runs {
      let ordered = [
        (Styles::BOLD, "strong"),
        (Styles::ITALIC, "em"),
        (Styles::UNDERLINE, "u"),
        (Styles::STRIKETHROUGH, "s"),
      ];
      for (flag, name) in ordered {
        if run.styles.contains(flag) {
          out.push('<');
          out.push_str(name);
          out.push('>');
        }
      }
      if run.styles.contains(Styles::HIGHLIGHT) {
        if run.styles.contains(Styles::ACTIVE) {
          out.push_str("<mark class=\"search-highlight active\">");
        } else {
          out.push_str("<mark class=\"search-highlight\">");
        }
      }

      escape_into(&run.text, &mut out);

      if run.styles.contains(Styles::HIGHLIGHT) {
        out.push_str("</mark>");
      }
      for (flag, name) in ordered.iter().rev() {
        if run.styles.contains(*flag) {
          out.push_str("</");
          out.push_str(name);
          out.push('>');
        }
      }
    }
    out
  }

  /// Replace `start..end` of the plain-text projection with a literal string.
  ///
  /// The replacement adopts the (non-overlay) style of the run containing
  /// `start`, or of the last run when inserting at the very end.
  pub fn replace_range(&mut self, span: TextSpan, replacement: &str) -> Result<()> {
    let len = self.len_bytes();
    if span.start > span.end || span.end > len {
      return Err(MarkupError::SpanOutOfBounds {
        start: span.start,
        end: span.end,
        len,
      });
    }

    let mut before: Vec<Run> = Vec::new();
    let mut after: Vec<Run> = Vec::new();
    let mut style: Option<Styles> = None;
    let mut pos = 0;

    for run in &self.runs {
      let run_start = pos;
      let run_end = pos + run.text.len();
      pos = run_end;

      if style.is_none() && span.start < run_end {
        style = Some(run.styles & !Styles::OVERLAY);
      }

      if run_start < span.start {
        let cut = span.start.min(run_end) - run_start;
        if !run.text.is_char_boundary(cut) {
          return Err(MarkupError::NotCharBoundary);
        }
        before.push(Run::new(&run.text[..cut], run.styles));
      }
      if run_end > span.end {
        let from = span.end.max(run_start) - run_start;
        if !run.text.is_char_boundary(from) {
          return Err(MarkupError::NotCharBoundary);
        }
        after.push(Run::new(&run.text[from..], run.styles));
      }
    }

    let style = style
      .or_else(|| self.runs.last().map(|run| run.styles & !Styles::OVERLAY))
      .unwrap_or_default();

    let mut runs = before;
    if !replacement.is_empty() {
      runs.push(Run::new(replacement, style));
    }
    runs.extend(after);
    self.runs = runs;
    self.normalize();
    Ok(())
  }

  /// Overlay `HIGHLIGHT` on every span, and `ACTIVE` on the 1-based
  /// `active`-th one (0 for none). Spans must be ordered and non-overlapping.
  ///
  /// The visible text is unchanged; only run boundaries and overlay flags
  /// move. Existing overlays are stripped first, so this is idempotent.
  pub fn apply_highlights(&mut self, spans: &[TextSpan], active: usize) -> Result<()> {
    self.clear_highlights();

    let len = self.len_bytes();
    for span in spans {
      if span.start > span.end || span.end > len {
        return Err(MarkupError::SpanOutOfBounds {
          start: span.start,
          end: span.end,
          len,
        });
      }
    }

    let mut out: Vec<Run> = Vec::new();
    let mut pos = 0;

    for run in &self.runs {
      let run_start = pos;
      let run_end = pos + run.text.len();
      pos = run_end;
      let mut cursor = run_start;

      for (index, span) in spans.iter().enumerate() {
        if span.is_empty() || span.end <= run_start {
          continue;
        }
        if span.start >= run_end {
          break;
        }

        let seg_start = span.start.max(run_start);
        let seg_end = span.end.min(run_end);
        if !run.text.is_char_boundary(seg_start - run_start)
          || !run.text.is_char_boundary(seg_end - run_start)
        {
          return Err(MarkupError::NotCharBoundary);
        }

        if seg_start > cursor {
          out.push(Run::new(&run.text[cursor - run_start..seg_start - run_start], run.styles));
        }

        let mut styles = run.styles | Styles::HIGHLIGHT;
        if index + 1 == active {
          styles |= Styles::ACTIVE;
        }
        out.push(Run::new(&run.text[seg_start - run_start..seg_end - run_start], styles));
        cursor = seg_end;
      }

      if cursor < run_end {
        out.push(Run::new(&run.text[cursor - run_start..], run.styles));
      }
    }

    self.runs = out;
    Ok(())
  }

  /// Drop all overlay flags and coalesce back to normal form, restoring the
  /// markup that existed before highlighting.
  pub fn clear_highlights(&mut self) {
    for run in &mut self.runs {
      run.styles &= !Styles::OVERLAY;
    }
    self.normalize();
  }

  fn normalize(&mut self) {
    let runs = std::mem::take(&mut self.runs);
    for run in runs {
      if run.text.is_empty() {
        continue;
      }
      match self.runs.last_mut() {
        Some(last) if last.styles == run.styles => last.text.push_str(&run.text),
        _ => self.runs.push(run),
      }
    }
  }
}

fn tag_styles(name: &str) -> Option<Styles> {
  match name {
    "strong" => Some(Styles::BOLD),
    "em" => Some(Styles::ITALIC),
    "u" => Some(Styles::UNDERLINE),
    "s" => Some(Styles::STRIKETHROUGH),
    "mark" => Some(Styles::HIGHLIGHT),
    _ => None,
  }
}

fn open_tag_styles(tag: &str) -> Option<Styles> {
  match tag {
    "strong" | "em" | "u" | "s" => tag_styles(tag),
    "mark class=\"search-highlight\"" => Some(Styles::HIGHLIGHT),
    "mark class=\"search-highlight active\"" => Some(Styles::HIGHLIGHT | Styles::ACTIVE),
    _ => None,
  }
}

fn escape_into(text: &str, out: &mut String) {
  for ch in text.chars() {
    match ch {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      _ => out.push(ch),
    }
  }
}
