use std::path::PathBuf;

use clap::{
  ArgAction,
  Parser,
  Subcommand,
  ValueEnum,
};

#[derive(Parser, Debug)]
#[command(name = "vellum", about = "Rich-text document engine", version)]
pub struct Cli {
  /// Directory holding the document store
  #[arg(long = "store-dir", value_name = "PATH", global = true)]
  pub store_dir: Option<PathBuf>,

  /// Load configuration from a specific file
  #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
  pub config_file: Option<PathBuf>,

  /// Increase logging verbosity (repeat for more detail)
  #[arg(short = 'v', action = ArgAction::Count, global = true)]
  pub verbosity: u8,

  /// Save logs to a specific file
  #[arg(long = "log", value_name = "FILE", global = true)]
  pub log_file: Option<PathBuf>,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Create a fresh document and make it current
  New,
  /// List every saved document
  List,
  /// Make a saved document current
  Open {
    /// Document id, as printed by `list`
    id: String,
  },
  /// Print the current document and its stats
  Show {
    /// Print the plain-text projection instead of the markup
    #[arg(long)]
    plain: bool,
  },
  /// Load a file's contents into the current document
  Import {
    file: PathBuf,
    /// Document name; defaults to the file stem
    #[arg(long, value_name = "NAME")]
    name: Option<String>,
  },
  /// Rename the current document
  Rename { name: String },
  /// Persist the current document
  Save,
  /// Find every occurrence of a literal query
  Search {
    query: String,
    /// Match case exactly
    #[arg(long = "case-sensitive")]
    case_sensitive: bool,
  },
  /// Replace occurrences of a literal query and save
  Replace {
    query:       String,
    replacement: String,
    /// Replace only the first occurrence
    #[arg(long)]
    first: bool,
    /// Match case exactly
    #[arg(long = "case-sensitive")]
    case_sensitive: bool,
  },
  /// Write the current document to a file
  Export {
    format: ExportFormat,
    /// Output path; defaults to the artifact's own file name
    #[arg(short = 'o', long = "out", value_name = "PATH")]
    out: Option<PathBuf>,
  },
  /// Print or set the UI theme
  Theme {
    /// `light`, `dark` or `system`; omit to print the current one
    value: Option<String>,
  },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum ExportFormat {
  Txt,
  Html,
}
