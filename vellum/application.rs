use std::{
  fs,
  path::PathBuf,
  time::Instant,
};

use anyhow::{
  Context,
  Result,
  anyhow,
};
use vellum_core::{
  BufferSurface,
  DocumentSession,
  EditorSurface,
  SearchSession,
  catalog::{
    self,
    Theme,
  },
  store::FsStore,
};

use crate::{
  cli::{
    Cli,
    Command,
    ExportFormat,
  },
  config::Config,
};

pub fn run(cli: Cli, config: Config) -> Result<()> {
  let store_dir = cli
    .store_dir
    .or(config.store_dir)
    .unwrap_or_else(default_store_dir);
  log::debug!("using store at {}", store_dir.display());

  let store = FsStore::open(&store_dir)
    .with_context(|| format!("could not open store at {}", store_dir.display()))?;
  let mut surface = BufferSurface::new();
  let mut session =
    DocumentSession::open(store, &mut surface).context("could not open document session")?;
  session.set_autosave_delay(config.autosave_delay);

  match cli.command {
    Command::New => {
      session.create_new(&mut surface);
      println!("{}", session.id());
    },
    Command::List => {
      let entries = catalog::read_index(session.store()).context("could not read document index")?;
      if entries.is_empty() {
        println!("no saved documents");
        return Ok(());
      }
      for entry in entries {
        let marker = if entry.id == session.id().as_str() { "*" } else { " " };
        let saved = entry
          .last_saved
          .map(|at| at.format("%F %R").to_string())
          .unwrap_or_else(|| "never".to_string());
        println!("{marker} {}  {}  {}", entry.id, saved, entry.file_name);
      }
    },
    Command::Open { id } => {
      session
        .open_document(id.as_str().into(), &mut surface)
        .with_context(|| format!("could not open document {id}"))?;
      println!("{}  {}", session.id(), session.file_name());
    },
    Command::Show { plain } => {
      let document = session.document();
      println!("{}  ({})", document.file_name(), document.id());
      let saved = document
        .last_saved()
        .map(|at| at.format("%F %R").to_string())
        .unwrap_or_else(|| "never".to_string());
      println!(
        "{} words, {} characters, saved {saved}",
        document.word_count(),
        document.char_count()
      );
      println!();
      if plain {
        println!("{}", document.content().plain_text());
      } else {
        println!("{}", document.content().render());
      }
    },
    Command::Import { file, name } => {
      let content = fs::read_to_string(&file)
        .with_context(|| format!("could not read {}", file.display()))?;
      let name = name.unwrap_or_else(|| {
        file
          .file_stem()
          .map(|stem| stem.to_string_lossy().into_owned())
          .unwrap_or_else(|| vellum_core::document::DEFAULT_FILE_NAME.to_string())
      });
      session.load(&content, Some(&name), &mut surface, Instant::now());
      session.save().context("could not save imported document")?;
      println!("imported {} as {}", file.display(), session.file_name());
    },
    Command::Rename { name } => {
      session.set_file_name(name);
      session.save().context("could not save document")?;
      println!("{}  {}", session.id(), session.file_name());
    },
    Command::Save => {
      if session.document().content().is_empty() {
        println!("nothing to save");
      } else {
        session.save().context("could not save document")?;
        println!("saved {}", session.id());
      }
    },
    Command::Search {
      query,
      case_sensitive,
    } => {
      let mut search = SearchSession::new();
      search
        .set_case_sensitive(case_sensitive, &mut surface)
        .context("could not configure search")?;
      search
        .set_query(&query, &mut surface)
        .context("could not run search")?;

      let text = surface.plain_text();
      println!("{} matches", search.match_count());
      for (i, span) in search.matches().iter().enumerate() {
        let marker = if i + 1 == search.active_index() { ">" } else { " " };
        println!("{marker} {}..{}  {}", span.start, span.end, &text[span.start..span.end]);
      }
    },
    Command::Replace {
      query,
      replacement,
      first,
      case_sensitive,
    } => {
      let mut search = SearchSession::new();
      search
        .set_case_sensitive(case_sensitive, &mut surface)
        .context("could not configure search")?;
      search
        .set_query(&query, &mut surface)
        .context("could not run search")?;
      let found = search.match_count();

      if first {
        search
          .replace_one(&replacement, &mut surface)
          .context("could not replace")?;
      } else {
        search
          .replace_all(&replacement, &mut surface)
          .context("could not replace")?;
      }

      session.sync_from_surface(&surface, Instant::now());
      session.save().context("could not save document")?;
      let replaced = if first { found.min(1) } else { found };
      println!("replaced {replaced} of {found}");
    },
    Command::Export { format, out } => {
      let artifact = match format {
        ExportFormat::Txt => session.export_plain_text(),
        ExportFormat::Html => session.export_html(),
      };
      let path = out.unwrap_or_else(|| PathBuf::from(&artifact.file_name));
      fs::write(&path, &artifact.contents)
        .with_context(|| format!("could not write {}", path.display()))?;
      println!("wrote {}", path.display());
    },
    Command::Theme { value } => {
      match value {
        None => {
          let theme = stored_or_default_theme(&session, config.theme)?;
          println!("{theme}");
        },
        Some(value) => {
          let theme: Theme = value.parse().map_err(|err: String| anyhow!(err))?;
          catalog::set_theme(session.store_mut(), theme).context("could not store theme")?;
          println!("{theme}");
        },
      }
    },
  }

  Ok(())
}

/// An explicitly stored theme wins over the config default.
fn stored_or_default_theme(session: &DocumentSession<FsStore>, fallback: Theme) -> Result<Theme> {
  use vellum_core::store::DocumentStore;
  match session.store().get(catalog::THEME_KEY).context("could not read theme")? {
    Some(raw) => raw.parse().map_err(|err: String| anyhow!(err)),
    None => Ok(fallback),
  }
}

fn default_store_dir() -> PathBuf {
  if let Some(dir) = std::env::var_os("VELLUM_STORE") {
    return PathBuf::from(dir);
  }
  let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_default();
  home.join(".vellum")
}
