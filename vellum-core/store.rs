//! String-keyed key-value persistence.
//!
//! The engine only ever needs a single-writer, low-latency local store, so
//! the contract is deliberately tiny. [`MemoryStore`] backs tests and
//! embedders with their own persistence; [`FsStore`] maps each key to one
//! file under a root directory.

use std::{
  collections::HashMap,
  fs,
  io,
  path::{
    Path,
    PathBuf,
  },
};

use percent_encoding::{
  AsciiSet,
  NON_ALPHANUMERIC,
  percent_decode_str,
  utf8_percent_encode,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("store io failed")]
  Io(#[from] io::Error),
  #[error("malformed store entry name: {0}")]
  MalformedKey(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

pub trait DocumentStore {
  fn get(&self, key: &str) -> Result<Option<String>>;
  fn set(&mut self, key: &str, value: &str) -> Result<()>;
  fn remove(&mut self, key: &str) -> Result<()>;
  fn keys(&self) -> Result<Vec<String>>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
  entries: HashMap<String, String>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl DocumentStore for MemoryStore {
  fn get(&self, key: &str) -> Result<Option<String>> {
    Ok(self.entries.get(key).cloned())
  }

  fn set(&mut self, key: &str, value: &str) -> Result<()> {
    self.entries.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove(&mut self, key: &str) -> Result<()> {
    self.entries.remove(key);
    Ok(())
  }

  fn keys(&self) -> Result<Vec<String>> {
    let mut keys: Vec<_> = self.entries.keys().cloned().collect();
    keys.sort();
    Ok(keys)
  }
}

/// One file per key. Key bytes outside `[A-Za-z0-9._-]` are percent-encoded
/// in the file name, so keys like `doc:abc` are valid everywhere.
#[derive(Debug)]
pub struct FsStore {
  root: PathBuf,
}

impl FsStore {
  pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
    let root = root.into();
    fs::create_dir_all(&root)?;
    Ok(Self { root })
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  fn path_for(&self, key: &str) -> PathBuf {
    self.root.join(encode_key(key))
  }
}

impl DocumentStore for FsStore {
  fn get(&self, key: &str) -> Result<Option<String>> {
    match fs::read_to_string(self.path_for(key)) {
      Ok(value) => Ok(Some(value)),
      Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
      Err(err) => Err(err.into()),
    }
  }

  fn set(&mut self, key: &str, value: &str) -> Result<()> {
    fs::write(self.path_for(key), value)?;
    Ok(())
  }

  fn remove(&mut self, key: &str) -> Result<()> {
    match fs::remove_file(self.path_for(key)) {
      Ok(()) => Ok(()),
      Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
      Err(err) => Err(err.into()),
    }
  }

  fn keys(&self) -> Result<Vec<String>> {
    let mut keys = Vec::new();
    for entry in fs::read_dir(&self.root)? {
      let entry = entry?;
      if !entry.file_type()?.is_file() {
        continue;
      }
      let name = entry.file_name();
      let name = name
        .to_str()
        .ok_or_else(|| StoreError::MalformedKey(entry.path().display().to_string()))?;
      keys.push(decode_key(name)?);
    }
    keys.sort();
    Ok(keys)
  }
}

// Entry file names keep `[A-Za-z0-9._-]` literal; everything else is
// percent-escaped.
const KEY_ESCAPES: &AsciiSet = &NON_ALPHANUMERIC.remove(b'.').remove(b'_').remove(b'-');

fn encode_key(key: &str) -> String {
  utf8_percent_encode(key, KEY_ESCAPES).to_string()
}

fn decode_key(name: &str) -> Result<String> {
  percent_decode_str(name)
    .decode_utf8()
    .map(|decoded| decoded.into_owned())
    .map_err(|_| StoreError::MalformedKey(name.to_string()))
}
