//! A library for exact k-nearest neighbour search with pivot-based metric trees.
//!
//! Two tree shapes are available, chosen through [`PruningRule`]:
//!
//! * **GNAT** ([`PruningRule::RangeTable`]): every internal node partitions its points around
//!   up to `max_pivots` pivots and keeps, for each pivot and each child, the band of distances
//!   from the pivot to the child's points.
//! * **Generalised hyperplane tree** ([`PruningRule::BinaryRadius`]): two pivots per node,
//!   every point sent to the side of its nearer pivot.
//!
//! Pivots are drawn at random or by farthest-first traversal ([`PivotStrategy`]). Only
//! distances are used, so any of the [`Metric`]s works.
//!
//! ```
//! use ghtree::{Metric, PivotTreeBuilder, PruningRule};
//! use ndarray::array;
//!
//! let data = array![[0., 0.], [1., 0.], [0., 1.], [10., 10.], [11., 10.]];
//! let tree = PivotTreeBuilder::new()
//!     .metric(Metric::Euclidean)
//!     .pruning(PruningRule::RangeTable)
//!     .build(data)
//!     .unwrap();
//!
//! let result = tree.search(array![10.5, 10.].view(), 2).unwrap();
//! let mut found: Vec<usize> = result.neighbours().iter().map(|n| n.index()).collect();
//! found.sort();
//! assert_eq!(found, vec![3, 4]);
//! ```
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    rustdoc::broken_intra_doc_links
)]

type Scalar = f64;

mod error;
pub use error::{Error, Result};

mod metric;
pub use metric::Metric;

mod build;
mod candidates;
pub use candidates::Neighbour;

mod partition;

mod pivot;
pub use pivot::PivotStrategy;

mod range;

mod search;
pub use search::{PruningRule, QueryResult};


mod tree;
pub use tree::{BuildStats, PivotTree, PivotTreeBuilder};
