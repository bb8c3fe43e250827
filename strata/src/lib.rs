//! Core crate for the `strata` document cascade.
//!
//! A *template* document is merged with an ordered stack of *stub* documents
//! and every embedded `(( … ))` expression is resolved to a fixpoint. Nodes
//! that cannot be resolved are classified as local failures (`*`),
//! dependency cycles (`@`) or propagated failures (`-`), and nodes marked
//! `&state` can be extracted into a subtree that feeds the next run.
//!
//! ```rust
//! use strata::{Cascade, Native, Registry, ingest};
//! use serde_json::json;
//!
//! let registry = Registry::standard()?;
//! let template = ingest("template", &Native::from(json!({"val": "(( a ))"})))?;
//! let first = ingest("stub1", &Native::from(json!({"a": 1})))?;
//! let second = ingest("stub2", &Native::from(json!({"a": 2})))?;
//!
//! let tree = Cascade::new(&registry, template)
//!     .push_stub(first)
//!     .push_stub(second)
//!     .resolve()
//!     .into_result()?;
//! assert_eq!(serde_json::to_value(&tree)?, json!({"val": 2}));
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```

pub mod binding;
mod error;
pub mod eval;
pub mod expr;
pub mod file;
pub mod flow;
mod ingest;
pub mod node;
pub mod registry;
pub mod scanner;

pub use binding::{Binding, Document, NodeRef};
pub use error::{
    AggregatedErrors, Classification, ErrorKind, NodeError, StrataError, UnresolvedReport,
};
pub use eval::{EvalError, EvalResult, Evaluation};
pub use flow::{Cascade, Resolution, ResolveOptions, Status, extract_state, resolve};
pub use ingest::{Native, ingest};
pub use node::{Flags, MergeKind, Node, NodePath, Segment, Value};
pub use registry::{Registry, RegistryBuilder, RegistryError};

use std::sync::Arc;

/// Result alias used across the crate; errors are shared so they can be
/// aggregated without cloning.
pub type StrataResult<T> = Result<T, Arc<StrataError>>;
