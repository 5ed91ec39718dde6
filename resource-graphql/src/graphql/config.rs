//! Global configuration of the resolution pipeline.

use super::operation::Pagination;

/// Settings shared by every resolver built from one set of [`Stages`](super::stage::Stages).
///
/// Per-operation settings on [`Operation`](super::operation::Operation) take precedence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Pagination of collection queries which do not configure their own.
    pub pagination: Pagination,
    /// The separator in filter argument names which stands for a `.` in a nested property path,
    /// e.g. `author__name` filters on `author.name`.
    pub nesting_separator: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            pagination: Pagination::default(),
            nesting_separator: "__".into(),
        }
    }
}

impl ResolverConfig {
    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn with_nesting_separator(mut self, separator: impl Into<String>) -> Self {
        self.nesting_separator = separator.into();
        self
    }
}
