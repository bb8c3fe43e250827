//! Error types produced while ingesting, loading and resolving documents.

mod aggregate;
mod constructors;
mod report;
mod types;

pub use aggregate::AggregatedErrors;
pub use report::{Classification, ErrorKind, NodeError, UnresolvedReport};
pub use types::StrataError;
