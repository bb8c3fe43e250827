//! Reading documents from files and in-memory text.
//!
//! Decoding is selected by file extension: `.yaml`/`.yml` through
//! `serde-saphyr`, `.json` through `serde_json` and `.toml` through `toml`.
//! The decoded value is ingested with the file path as its source name.

mod format;
mod helpers;
mod loader;

pub use format::{Format, decode_str};
pub use loader::{load_document, load_documents};
