//! Constructors and aggregation helpers for `StrataError`.

use std::sync::Arc;

use camino::Utf8Path;

use super::{AggregatedErrors, StrataError};

impl StrataError {
    /// Tries to build a [`StrataError`] from an iterator of errors.
    ///
    /// The iterator is consumed eagerly. It returns:
    /// * `None` when no errors are supplied;
    /// * the inner error when a single [`Arc`] is uniquely owned;
    /// * [`Self::Aggregate`] containing that single [`Arc`] when it is shared;
    /// * [`Self::Aggregate`] combining every error for two or more inputs.
    #[must_use]
    pub fn try_aggregate<I, E>(errors: I) -> Option<Self>
    where
        I: IntoIterator<Item = E>,
        E: Into<Arc<Self>>,
    {
        let mut arcs: Vec<Arc<Self>> = errors.into_iter().map(Into::into).collect();
        if arcs.is_empty() {
            return None;
        }
        Some(if arcs.len() == 1 {
            let last = arcs.pop()?;
            match Arc::try_unwrap(last) {
                Ok(err) => err,
                Err(shared) => Self::Aggregate(Box::new(AggregatedErrors::new(vec![shared]))),
            }
        } else {
            Self::Aggregate(Box::new(AggregatedErrors::new(arcs)))
        })
    }

    /// Wrap a loader failure for `path`.
    ///
    /// ```
    /// use strata::StrataError;
    /// let err = StrataError::file("stub.yml", std::io::Error::other("gone"));
    /// assert!(err.to_string().contains("stub.yml"));
    /// ```
    #[must_use]
    pub fn file(
        path: impl AsRef<Utf8Path>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::File {
            path: path.as_ref().to_path_buf(),
            source: Box::new(source),
        }
    }

    /// Decoder failure for the document named `source_name`.
    #[must_use]
    pub fn decode(source_name: &str, message: impl ToString) -> Self {
        Self::Decode {
            source_name: source_name.to_owned(),
            message: message.to_string(),
        }
    }
}
