//! Aggregation container for multiple `StrataError` values.

use std::{error::Error, fmt, sync::Arc};

use super::StrataError;

/// Collection of [`StrataError`]s reported together, such as the failures
/// of several document files loaded in one call.
#[derive(Debug, Default)]
pub struct AggregatedErrors(Vec<Arc<StrataError>>);

impl AggregatedErrors {
    /// Create a new aggregation from a vector of errors.
    #[must_use]
    pub const fn new(errors: Vec<Arc<StrataError>>) -> Self {
        Self(errors)
    }

    /// Iterate over the contained errors.
    #[must_use = "iterators should be consumed to inspect errors"]
    pub fn iter(&self) -> impl Iterator<Item = &StrataError> {
        self.0.iter().map(Arc::as_ref)
    }

    /// Number of errors in the aggregation.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when the aggregation holds no errors.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AggregatedErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: {e}", i + 1)?;
        }
        Ok(())
    }
}

impl Error for AggregatedErrors {}

impl<'a> IntoIterator for &'a AggregatedErrors {
    type Item = &'a StrataError;
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, Arc<StrataError>>,
        fn(&'a Arc<StrataError>) -> &'a StrataError,
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter().map(Arc::as_ref)
    }
}

impl IntoIterator for AggregatedErrors {
    type Item = Arc<StrataError>;
    type IntoIter = std::vec::IntoIter<Arc<StrataError>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
