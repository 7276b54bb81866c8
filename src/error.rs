use thiserror::Error;

/// Errors raised at the boundary of tree construction and search.
///
/// Degenerate data never produces an error: empty datasets give an empty tree and
/// partitions that cannot be split fall back to leaves.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    /// A point or query does not have the dimension of the tree.
    #[error("point has dimension {found}, expected {expected}")]
    InvalidDimension {
        /// Dimension of the tree.
        expected: usize,
        /// Dimension of the offending point.
        found: usize,
    },
    /// The number of requested neighbours is zero.
    #[error("k must be at least 1")]
    InvalidK,
    /// The leaf size is zero.
    #[error("leaf size must be at least 1")]
    InvalidLeafSize,
    /// Fewer than two pivots per node were requested.
    #[error("a node needs at least 2 pivots, got {0}")]
    InvalidPivotCount(usize),
    /// The dataset holds more points than the configured capacity.
    #[error("dataset of {found} points exceeds the capacity of {capacity}")]
    CapacityExceeded {
        /// Configured capacity.
        capacity: usize,
        /// Number of points passed to the builder.
        found: usize,
    },
    /// A dataset point has a NaN or infinite coordinate.
    #[error("point {point} has a non-finite coordinate")]
    NonFinite {
        /// Row index of the point.
        point: usize,
    },
    /// The query has a NaN or infinite coordinate.
    #[error("query has a non-finite coordinate")]
    NonFiniteQuery,
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
