//! The query handed to the host's resource search once a quiz completes.

use serde::{Deserialize, Serialize};

use crate::resolver::ResolvedFilter;

/// Smallest accepted result limit.
pub const MIN_RESULT_LIMIT: u32 = 1;
/// Largest accepted result limit.
pub const MAX_RESULT_LIMIT: u32 = 100;
/// Result limit when none is configured.
pub const DEFAULT_RESULT_LIMIT: u32 = 12;

/// How taxonomy buckets combine in the downstream search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RelationMode {
    /// A resource matching any bucket qualifies.
    #[default]
    Or,
    /// A resource must match every bucket.
    And,
}

/// Maximum number of resources to return, always within
/// [`MIN_RESULT_LIMIT`]..=[`MAX_RESULT_LIMIT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct ResultLimit(u32);

impl ResultLimit {
    /// Clamp a requested limit into range.
    pub fn new(limit: u32) -> Self {
        Self(limit.clamp(MIN_RESULT_LIMIT, MAX_RESULT_LIMIT))
    }

    /// The clamped value.
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl Default for ResultLimit {
    fn default() -> Self {
        Self(DEFAULT_RESULT_LIMIT)
    }
}

impl From<u32> for ResultLimit {
    fn from(limit: u32) -> Self {
        Self::new(limit)
    }
}

impl From<ResultLimit> for u32 {
    fn from(limit: ResultLimit) -> Self {
        limit.0
    }
}

/// Search request derived from a resolved filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultsQuery {
    /// Terms to match, per taxonomy.
    pub filter: ResolvedFilter,
    /// How buckets combine.
    #[serde(default)]
    pub relation: RelationMode,
    /// Terms to exclude, per taxonomy.
    #[serde(default)]
    pub exclude: ResolvedFilter,
    /// Result cap.
    #[serde(default)]
    pub limit: ResultLimit,
}

impl ResultsQuery {
    /// An `OR` query with nothing excluded.
    pub fn from_filter(filter: ResolvedFilter, limit: ResultLimit) -> Self {
        Self {
            filter,
            relation: RelationMode::default(),
            exclude: ResolvedFilter::default(),
            limit,
        }
    }

    /// Change how buckets combine.
    pub fn with_relation(mut self, relation: RelationMode) -> Self {
        self.relation = relation;
        self
    }

    /// Set the excluded terms.
    pub fn with_exclude(mut self, exclude: ResolvedFilter) -> Self {
        self.exclude = exclude;
        self
    }

    /// True when the filter selects nothing in particular.
    pub fn is_unfiltered(&self) -> bool {
        self.filter.is_empty()
    }
}
