pub mod autosave;
pub mod catalog;
pub mod document;
pub mod export;
pub mod markup;
pub mod search;
pub mod session;
pub mod store;
pub mod surface;

pub use document::{
  Document,
  DocumentId,
};
pub use markup::{
  Markup,
  Styles,
  TextSpan,
};
pub use search::SearchSession;
pub use session::DocumentSession;
pub use surface::{
  BufferSurface,
  EditorSurface,
};
