use log::debug;
use ndarray::{Array2, ArrayView1, ArrayView2};
use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};

use crate::build::TreeBuilder;
use crate::range::RangeTable;
use crate::search::{QueryResult, Searcher};
use crate::{Error, Metric, PivotStrategy, PruningRule, Result, Scalar};

/// Counters gathered while building a tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Distance evaluations spent on pivot selection, partitioning and range tables.
    pub distance_calls: usize,
    /// Pivots stored in the tree. Reused routing pivots are not counted twice.
    pub pivots: usize,
    /// Number of internal nodes.
    pub internal_nodes: usize,
    /// Number of leaves.
    pub leaves: usize,
    /// Depth of the deepest node; a tree made of a single leaf has depth 0.
    pub depth: usize,
    /// Nodes where partitioning fell back to a leaf or to a parity split.
    pub degenerate_splits: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Config {
    pub(crate) leaf_size: usize,
    pub(crate) max_pivots: usize,
    pub(crate) pivot_strategy: PivotStrategy,
    pub(crate) pruning: PruningRule,
    pub(crate) reuse_pivots: bool,
    pub(crate) seed: u64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Pivot {
    pub(crate) index: usize,
    /// `false` for a pivot reused from an ancestor; it routes the search but is reported by
    /// the ancestor only.
    pub(crate) owned: bool,
}

impl Pivot {
    pub(crate) fn owned(index: usize) -> Self {
        Self { index, owned: true }
    }

    pub(crate) fn routing(index: usize) -> Self {
        Self {
            index,
            owned: false,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Internal {
    pub(crate) pivots: Vec<Pivot>,
    /// Present for m-ary nodes, absent for binary ones.
    pub(crate) ranges: Option<RangeTable>,
    /// One child per pivot, `None` for an empty subset.
    pub(crate) children: Vec<Option<Box<Node>>>,
    pub(crate) bisected: bool,
}

#[derive(Clone, Debug)]
pub(crate) enum Node {
    Leaf { bucket: Vec<usize> },
    Internal(Internal),
}

/// A pivot-based metric tree answering exact k-nearest neighbour queries.
///
/// The tree owns a copy of the dataset and is immutable once built, so it can be queried from
/// several threads at once.
#[derive(Clone, Debug)]
pub struct PivotTree {
    metric: Metric,
    config: Config,
    data: Array2<Scalar>,
    root: Option<Box<Node>>,
    stats: BuildStats,
}

impl PivotTree {
    /// Performs the nearest neighbour search for a single query and returns ```k``` neighbours who
    /// are closest to the ```query``` point.
    ///
    /// If the tree holds fewer than `k` points, every point is returned once.
    pub fn search(&self, query: ArrayView1<'_, Scalar>, k: usize) -> Result<QueryResult> {
        if k == 0 {
            return Err(Error::InvalidK);
        }

        self.check_query(query)?;
        let root = match &self.root {
            Some(root) => root,
            None => return Ok(QueryResult::default()),
        };

        let mut searcher = Searcher::new(self.data.view(), self.metric, query, k.min(self.size()));
        searcher.visit(root, None);
        Ok(searcher.finish())
    }

    /// Performs the nearest neighbour search for an array of queries, one per row, and returns
    /// ```k``` neighbours for each of them. Queries run in parallel.
    pub fn search_batch(&self, queries: ArrayView2<'_, Scalar>, k: usize) -> Result<Vec<QueryResult>> {
        queries
            .outer_iter()
            .into_par_iter()
            .enumerate()
            .map(|(ii, query)| {
                self.search(query, k).map(|mut result| {
                    result.set_index(ii);
                    result
                })
            })
            .collect()
    }

    /// Brute-force k-NN over the whole dataset, with the same candidate bookkeeping as
    /// [`search`](Self::search). Useful as a reference answer.
    pub fn linear_search(&self, query: ArrayView1<'_, Scalar>, k: usize) -> Result<QueryResult> {
        if k == 0 {
            return Err(Error::InvalidK);
        }

        self.check_query(query)?;
        if self.is_empty() {
            return Ok(QueryResult::default());
        }

        let mut searcher = Searcher::new(self.data.view(), self.metric, query, k.min(self.size()));
        searcher.scan();
        Ok(searcher.finish())
    }

    /// An empty tree built without any row has no dimension and accepts queries of any length.
    fn check_query(&self, query: ArrayView1<'_, Scalar>) -> Result<()> {
        let unknown_dim = self.is_empty() && self.dim() == 0;
        if !unknown_dim && query.len() != self.dim() {
            return Err(Error::InvalidDimension {
                expected: self.dim(),
                found: query.len(),
            });
        }

        if query.iter().any(|x| !x.is_finite()) {
            return Err(Error::NonFiniteQuery);
        }

        Ok(())
    }

    /// Returns the point stored at row `index` of the dataset.
    pub fn point(&self, index: usize) -> Option<ArrayView1<'_, Scalar>> {
        if index < self.size() {
            Some(self.data.row(index))
        } else {
            None
        }
    }

    /// Returns the number of points in a tree.
    pub fn size(&self) -> usize {
        self.data.nrows()
    }

    /// Returns `true` if the tree holds no points.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Dimension of the points.
    pub fn dim(&self) -> usize {
        self.data.ncols()
    }

    /// Distance function of the tree.
    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Largest number of points stored in a leaf.
    pub fn leaf_size(&self) -> usize {
        self.config.leaf_size
    }

    /// Pivot selection strategy used while building.
    pub fn pivot_strategy(&self) -> PivotStrategy {
        self.config.pivot_strategy
    }

    /// Pruning rule, which also determines the shape of the nodes.
    pub fn pruning(&self) -> PruningRule {
        self.config.pruning
    }

    /// Counters gathered while building the tree.
    pub fn stats(&self) -> BuildStats {
        self.stats
    }

    #[cfg(test)]
    pub(crate) fn root(&self) -> Option<&Node> {
        self.root.as_deref()
    }

    /// Checks that every point sits in exactly one leaf or owned pivot slot and that every
    /// range table bounds the points below it.
    #[cfg(test)]
    pub(crate) fn verify(&self) {
        let mut seen = vec![0usize; self.size()];
        if let Some(root) = &self.root {
            self.verify_node(root, &mut seen);
        }

        for (idx, count) in seen.iter().enumerate() {
            assert_eq!(*count, 1, "point {} is stored {} times", idx, count);
        }
    }

    #[cfg(test)]
    fn verify_node(&self, node: &Node, seen: &mut [usize]) {
        match node {
            Node::Leaf { bucket } => {
                assert!(!bucket.is_empty());
                for &idx in bucket {
                    seen[idx] += 1;
                }
            }
            Node::Internal(inner) => {
                assert!(inner.pivots.len() >= 2);
                assert_eq!(inner.pivots.len(), inner.children.len());

                for pivot in inner.pivots.iter().filter(|p| p.owned) {
                    seen[pivot.index] += 1;
                }

                if let Some(ranges) = &inner.ranges {
                    assert_eq!(ranges.len(), inner.pivots.len());
                    for (jj, child) in inner.children.iter().enumerate() {
                        let mut members = vec![inner.pivots[jj].index];
                        if let Some(child) = child {
                            Self::members(child, &mut members);
                        }

                        for (ii, pivot) in inner.pivots.iter().enumerate() {
                            for &idx in &members {
                                let d = self
                                    .metric
                                    .distance(self.data.row(pivot.index), self.data.row(idx));
                                assert!(ranges.low(ii, jj) <= d && d <= ranges.high(ii, jj));
                            }
                        }
                    }
                }

                for child in inner.children.iter().flatten() {
                    self.verify_node(child, seen);
                }
            }
        }
    }

    /// Every point stored at or below `node`, owned pivots and leaf buckets.
    #[cfg(test)]
    pub(crate) fn members(node: &Node, out: &mut Vec<usize>) {
        match node {
            Node::Leaf { bucket } => out.extend_from_slice(bucket),
            Node::Internal(inner) => {
                out.extend(inner.pivots.iter().filter(|p| p.owned).map(|p| p.index));
                for child in inner.children.iter().flatten() {
                    Self::members(child, out);
                }
            }
        }
    }
}

/// A build struct for initialising a new pivot tree.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PivotTreeBuilder {
    metric: Option<Metric>,
    leaf_size: Option<usize>,
    max_pivots: Option<usize>,
    pivot_strategy: Option<PivotStrategy>,
    pruning: Option<PruningRule>,
    reuse_pivots: Option<bool>,
    seed: Option<u64>,
    capacity: Option<usize>,
}

impl PivotTreeBuilder {
    /// Leaf size used when none is given.
    pub const DEFAULT_LEAF_SIZE: usize = 4;
    /// Pivot cap for m-ary nodes used when none is given.
    pub const DEFAULT_MAX_PIVOTS: usize = 4;
    /// Seed of the pivot sampler used when none is given.
    pub const DEFAULT_SEED: u64 = 0x5eed;

    /// Creates a builder with default parameters.
    pub fn new() -> Self {
        Self {
            ..Default::default()
        }
    }

    /// Sets the distance function for a tree. Defaults to [`Metric::Euclidean`].
    pub fn metric(mut self, metric: Metric) -> Self {
        self.metric = Some(metric);
        self
    }

    /// Sets the number of points at or below which a subset becomes a leaf.
    pub fn leaf_size(mut self, leaf_size: usize) -> Self {
        self.leaf_size = Some(leaf_size);
        self
    }

    /// Sets the largest number of pivots in an m-ary node. Binary trees always use two.
    pub fn max_pivots(mut self, max_pivots: usize) -> Self {
        self.max_pivots = Some(max_pivots);
        self
    }

    /// Sets how the pivots of each node are chosen.
    pub fn pivot_strategy(mut self, strategy: PivotStrategy) -> Self {
        self.pivot_strategy = Some(strategy);
        self
    }

    /// Sets the pruning rule, and with it the shape of the tree.
    pub fn pruning(mut self, pruning: PruningRule) -> Self {
        self.pruning = Some(pruning);
        self
    }

    /// Lets each child of a binary node reuse the parent pivot of its side, so only one new
    /// pivot is drawn per node. Ignored by m-ary trees.
    pub fn reuse_pivots(mut self, reuse: bool) -> Self {
        self.reuse_pivots = Some(reuse);
        self
    }

    /// Sets the seed of the random pivot sampler. Equal seeds give equal trees.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Rejects datasets holding more than `capacity` points.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Constructs a pivot tree over the rows of `data`.
    pub fn build(self, data: Array2<Scalar>) -> Result<PivotTree> {
        let config = self.config()?;
        let metric = self.metric.unwrap_or_default();

        if let Some(capacity) = self.capacity {
            if data.nrows() > capacity {
                return Err(Error::CapacityExceeded {
                    capacity,
                    found: data.nrows(),
                });
            }
        }

        if data.nrows() > 0 && data.ncols() == 0 {
            return Err(Error::InvalidDimension {
                expected: 1,
                found: 0,
            });
        }

        if let Some(point) = data
            .outer_iter()
            .position(|row| row.iter().any(|x| !x.is_finite()))
        {
            return Err(Error::NonFinite { point });
        }

        let (root, stats) = TreeBuilder::new(data.view(), metric, config).run();
        debug!(
            "built {:?} tree over {} points of dimension {}: {:?}",
            config.pruning,
            data.nrows(),
            data.ncols(),
            stats
        );

        Ok(PivotTree {
            metric,
            config,
            data,
            root,
            stats,
        })
    }

    /// Constructs a pivot tree from a list of points, checking that they share one dimension.
    pub fn build_from_points(self, points: &[Vec<Scalar>]) -> Result<PivotTree> {
        let dim = points.first().map_or(0, Vec::len);
        let mut flat = Vec::with_capacity(points.len() * dim);

        for point in points {
            if point.len() != dim {
                return Err(Error::InvalidDimension {
                    expected: dim,
                    found: point.len(),
                });
            }
            flat.extend_from_slice(point);
        }

        let data = Array2::from_shape_vec((points.len(), dim), flat).map_err(|_| {
            Error::InvalidDimension {
                expected: dim,
                found: 0,
            }
        })?;

        self.build(data)
    }

    fn config(&self) -> Result<Config> {
        let leaf_size = self.leaf_size.unwrap_or(Self::DEFAULT_LEAF_SIZE);
        if leaf_size == 0 {
            return Err(Error::InvalidLeafSize);
        }

        let max_pivots = self.max_pivots.unwrap_or(Self::DEFAULT_MAX_PIVOTS);
        if max_pivots < 2 {
            return Err(Error::InvalidPivotCount(max_pivots));
        }

        Ok(Config {
            leaf_size,
            max_pivots,
            pivot_strategy: self.pivot_strategy.unwrap_or_default(),
            pruning: self.pruning.unwrap_or_default(),
            reuse_pivots: self.reuse_pivots.unwrap_or(false),
            seed: self.seed.unwrap_or(Self::DEFAULT_SEED),
        })
    }
}
