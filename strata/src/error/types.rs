//! Primary error enum for the document cascade.

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::node::NodePath;

use super::aggregate::AggregatedErrors;
use super::report::UnresolvedReport;

/// Errors surfaced by ingestion, file loading and resolution.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StrataError {
    /// A mapping key was not a string.
    #[error("non-string key {key} at '{path}'")]
    NonStringKey {
        /// Rendering of the offending key.
        key: String,
        /// Path of the mapping holding the key.
        path: NodePath,
    },

    /// A decoded value has no counterpart in the node model.
    #[error("unknown type {kind} at '{path}'")]
    UnknownType {
        /// Path of the offending value.
        path: NodePath,
        /// Reflected kind name of the decoded value.
        kind: String,
    },

    /// A `<<` entry carried something other than a merge directive.
    #[error("invalid merge directive at '{path}': {message}")]
    InvalidDirective {
        /// Path of the mapping or sequence holding the entry.
        path: NodePath,
        /// Explanation of the problem.
        message: String,
    },

    /// Text could not be decoded into native values.
    #[error("failed to decode '{source_name}': {message}")]
    Decode {
        /// Name of the document being decoded.
        source_name: String,
        /// Decoder message.
        message: String,
    },

    /// Error originating from a document file.
    #[error("document file error in '{path}': {source}")]
    File {
        /// Path that triggered the failure.
        path: Utf8PathBuf,
        /// Underlying error reported by the loader.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Resolution finished with nodes that could not be resolved.
    #[error("resolution failed:\n{0}")]
    Unresolved(Box<UnresolvedReport>),

    /// Multiple errors occurred.
    #[error("multiple errors:\n{0}")]
    Aggregate(Box<AggregatedErrors>),
}
