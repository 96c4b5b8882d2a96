//! Downloadable artifacts from the current document.
//!
//! Pure functions of document state; no mutation, no IO. The HTML template
//! is fixed: title heading, export-date line, content body.

use chrono::{
  DateTime,
  Utc,
};

use crate::markup::Markup;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
  pub file_name:  String,
  pub media_type: &'static str,
  pub contents:   String,
}

fn file_stem(file_name: &str) -> &str {
  let trimmed = file_name.trim();
  if trimmed.is_empty() { "document" } else { trimmed }
}

/// The raw plain-text projection as `<file_name or "document">.txt`.
pub fn plain_text(file_name: &str, content: &Markup) -> ExportArtifact {
  ExportArtifact {
    file_name:  format!("{}.txt", file_stem(file_name)),
    media_type: "text/plain",
    contents:   content.plain_text(),
  }
}

/// The markup wrapped in the fixed document template, as
/// `<file_name or "document">.html`.
pub fn html(file_name: &str, content: &Markup, exported_at: DateTime<Utc>) -> ExportArtifact {
  let trimmed = file_name.trim();
  let title = if trimmed.is_empty() { "Document" } else { trimmed };
  let heading = if trimmed.is_empty() {
    "Untitled Document"
  } else {
    trimmed
  };

  let contents = format!(
    r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
        body {{
            font-family: Arial, sans-serif;
            line-height: 1.6;
            max-width: 800px;
            margin: 0 auto;
            padding: 20px;
            color: #333;
        }}
        .document-title {{
            text-align: center;
            color: #666;
            margin-bottom: 30px;
        }}
        .content {{
            min-height: 400px;
        }}
    </style>
</head>
<body>
    <div class="document-title">
        <h1>{heading}</h1>
        <p>Exported on {date}</p>
    </div>
    <div class="content">
        {body}
    </div>
</body>
</html>
"#,
    date = exported_at.format("%F"),
    body = content.render(),
  );

  ExportArtifact {
    file_name: format!("{}.html", file_stem(file_name)),
    media_type: "text/html",
    contents,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn plain_text_export_strips_markup() {
    let content = Markup::parse("The <strong>quick</strong> fox").unwrap();
    let artifact = plain_text("Notes", &content);
    assert_eq!(artifact.file_name, "Notes.txt");
    assert_eq!(artifact.media_type, "text/plain");
    assert_eq!(artifact.contents, "The quick fox");
  }

  #[test]
  fn empty_file_name_falls_back_per_slot() {
    let content = Markup::plain("x");
    assert_eq!(plain_text("", &content).file_name, "document.txt");
    assert_eq!(plain_text("   ", &content).file_name, "document.txt");

    let artifact = html("", &content, Utc::now());
    assert_eq!(artifact.file_name, "document.html");
    assert!(artifact.contents.contains("<title>Document</title>"));
    assert!(artifact.contents.contains("<h1>Untitled Document</h1>"));
  }

  #[test]
  fn html_export_embeds_title_date_and_content() {
    let content = Markup::parse("hello <em>there</em>").unwrap();
    let exported_at = "2026-08-29T12:00:00Z".parse().unwrap();
    let artifact = html("Notes", &content, exported_at);

    assert_eq!(artifact.file_name, "Notes.html");
    assert!(artifact.contents.contains("<title>Notes</title>"));
    assert!(artifact.contents.contains("<h1>Notes</h1>"));
    assert!(artifact.contents.contains("Exported on 2026-08-29"));
    assert!(artifact.contents.contains("hello <em>there</em>"));
  }
}
