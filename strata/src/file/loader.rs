//! Loading documents from disk.

use std::io;
use std::sync::Arc;

use camino::Utf8Path;
use tracing::debug;

use super::format::{Format, decode_str};
use super::helpers::read_text;
use crate::StrataResult;
use crate::error::StrataError;
use crate::node::Node;

/// Load one document, choosing the decoder from the file extension.
///
/// # Examples
///
/// ```rust,no_run
/// use strata::file::load_document;
///
/// # fn run() -> strata::StrataResult<()> {
/// let template = load_document("deploy/template.yml")?;
/// assert!(template.as_mapping().is_some());
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns [`StrataError::File`] when the extension is not recognised or
/// the file cannot be read, and [`StrataError::Decode`] when the contents
/// are malformed.
pub fn load_document(path: impl AsRef<Utf8Path>) -> StrataResult<Node> {
    let location = path.as_ref();
    let format = Format::from_path(location).ok_or_else(|| {
        Arc::new(StrataError::file(
            location,
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "unsupported extension; expected yaml, yml, json or toml",
            ),
        ))
    })?;
    let text = read_text(location).map_err(|err| Arc::new(StrataError::file(location, err)))?;
    debug!(path = %location, %format, "loading document");
    decode_str(location.as_str(), format, &text)
}

/// Load several documents, reporting every failure together.
///
/// # Errors
///
/// Returns the single failure, or [`StrataError::Aggregate`] when more than
/// one document failed to load.
pub fn load_documents<I, P>(paths: I) -> StrataResult<Vec<Node>>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Utf8Path>,
{
    let mut documents = Vec::new();
    let mut errors = Vec::new();
    for path in paths {
        match load_document(path) {
            Ok(document) => documents.push(document),
            Err(err) => errors.push(err),
        }
    }
    match StrataError::try_aggregate(errors) {
        None => Ok(documents),
        Some(err) => Err(Arc::new(err)),
    }
}
