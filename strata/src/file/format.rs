//! Format selection and text decoding.

use std::fmt;
use std::sync::Arc;

use camino::Utf8Path;

use crate::StrataResult;
use crate::error::StrataError;
use crate::ingest::{Native, ingest};
use crate::node::Node;

/// Serialisation format of a document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Format {
    /// YAML, decoded with strict booleans.
    Yaml,
    /// JSON.
    Json,
    /// TOML.
    Toml,
}

impl Format {
    /// Format implied by the extension of `path`, compared case-insensitively.
    ///
    /// ```
    /// use strata::file::Format;
    ///
    /// assert_eq!(Format::from_path("stub.YML".as_ref()), Some(Format::Yaml));
    /// assert_eq!(Format::from_path("notes.txt".as_ref()), None);
    /// ```
    #[must_use]
    pub fn from_path(path: &Utf8Path) -> Option<Self> {
        let ext = path.extension().map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("yaml" | "yml") => Some(Self::Yaml),
            Some("json") => Some(Self::Json),
            Some("toml") => Some(Self::Toml),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
            Self::Toml => "toml",
        })
    }
}

/// Decode `text` as `format` and ingest it as the document `source`.
///
/// # Errors
///
/// Returns [`StrataError::Decode`] when the text is malformed or the format
/// is disabled, and any ingestion error for the decoded value.
///
/// ```
/// use strata::file::{Format, decode_str};
///
/// let node = decode_str("inline", Format::Json, r#"{"a": "(( 1 + 2 ))"}"#)?;
/// assert!(node.get("a").is_some_and(strata::Node::is_pending));
/// # Ok::<_, std::sync::Arc<strata::StrataError>>(())
/// ```
pub fn decode_str(source: &str, format: Format, text: &str) -> StrataResult<Node> {
    let native = decode_native(format, text).map_err(|message| {
        Arc::new(StrataError::decode(source, message))
    })?;
    ingest(source, &native)
}

fn decode_native(format: Format, text: &str) -> Result<Native, String> {
    match format {
        Format::Json => serde_json::from_str(text).map_err(|err| err.to_string()),
        Format::Yaml => decode_yaml(text),
        Format::Toml => decode_toml(text),
    }
}

#[cfg(feature = "yaml")]
fn decode_yaml(text: &str) -> Result<Native, String> {
    serde_saphyr::from_str_with_options(
        text,
        serde_saphyr::Options {
            strict_booleans: true,
            ..serde_saphyr::Options::default()
        },
    )
    .map_err(|err| err.to_string())
}

#[cfg(not(feature = "yaml"))]
fn decode_yaml(_: &str) -> Result<Native, String> {
    Err("yaml feature disabled: enable the 'yaml' feature to support this format".to_owned())
}

#[cfg(feature = "toml")]
fn decode_toml(text: &str) -> Result<Native, String> {
    text.parse::<toml::Table>()
        .map(|table| Native::from(toml::Value::Table(table)))
        .map_err(|err| err.to_string())
}

#[cfg(not(feature = "toml"))]
fn decode_toml(_: &str) -> Result<Native, String> {
    Err("toml feature disabled: enable the 'toml' feature to support this format".to_owned())
}
