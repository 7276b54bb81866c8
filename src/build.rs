use log::trace;
use ndarray::ArrayView2;
use oorandom::Rand64;

use crate::partition::{self, Bisection};
use crate::range::RangeTable;
use crate::tree::{BuildStats, Config, Internal, Node, Pivot};
use crate::{Metric, PruningRule, Scalar};

/// Dataset rows paired with a metric, counting every distance evaluation.
#[derive(Debug)]
pub(crate) struct Space<'a> {
    data: ArrayView2<'a, Scalar>,
    metric: Metric,
    calls: usize,
}

impl<'a> Space<'a> {
    pub(crate) fn new(data: ArrayView2<'a, Scalar>, metric: Metric) -> Self {
        Self {
            data,
            metric,
            calls: 0,
        }
    }

    /// Distance between the dataset rows `a` and `b`.
    #[inline(always)]
    pub(crate) fn dist(&mut self, a: usize, b: usize) -> Scalar {
        self.calls += 1;
        self.metric.distance(self.data.row(a), self.data.row(b))
    }
}

/// Recursive construction of one pivot tree.
pub(crate) struct TreeBuilder<'a> {
    space: Space<'a>,
    config: Config,
    rng: Rand64,
    stats: BuildStats,
}

impl<'a> TreeBuilder<'a> {
    pub(crate) fn new(data: ArrayView2<'a, Scalar>, metric: Metric, config: Config) -> Self {
        Self {
            space: Space::new(data, metric),
            rng: Rand64::new(config.seed as u128),
            config,
            stats: BuildStats::default(),
        }
    }

    /// Builds the tree over every row of the dataset.
    pub(crate) fn run(mut self) -> (Option<Box<Node>>, BuildStats) {
        let points: Vec<usize> = (0..self.space.data.nrows()).collect();
        let root = self.node(points, 0, None);

        self.stats.distance_calls = self.space.calls;
        (root, self.stats)
    }

    /// `reused` is a pivot of the parent node that governs this subset. It is only taken up
    /// when pivot reuse is enabled for binary trees.
    fn node(&mut self, points: Vec<usize>, depth: usize, reused: Option<usize>) -> Option<Box<Node>> {
        if points.is_empty() {
            return None;
        }

        if depth > self.stats.depth {
            self.stats.depth = depth;
        }

        if points.len() <= self.config.leaf_size {
            return Some(self.leaf(points));
        }

        let node = match self.config.pruning {
            PruningRule::RangeTable => self.gnat(points, depth),
            PruningRule::BinaryRadius => self.ght(points, depth, reused),
        };

        Some(node)
    }

    fn leaf(&mut self, bucket: Vec<usize>) -> Box<Node> {
        self.stats.leaves += 1;
        Box::new(Node::Leaf { bucket })
    }

    /// m-ary node: nearest-pivot partition plus a range table.
    fn gnat(&mut self, points: Vec<usize>, depth: usize) -> Box<Node> {
        let strategy = self.config.pivot_strategy;
        let target = strategy.target(points.len(), self.config.max_pivots);
        let positions = strategy.select(&mut self.space, &points, target, &mut self.rng);

        if positions.len() < 2 {
            trace!("{} points yield fewer than 2 pivots, forcing a leaf", points.len());
            self.stats.degenerate_splits += 1;
            return self.leaf(points);
        }

        let pivots: Vec<usize> = positions.iter().map(|&pos| points[pos]).collect();
        let subsets = partition::nearest_pivot(&mut self.space, &points, &pivots);
        let ranges = RangeTable::build(&mut self.space, &pivots, &subsets);

        self.stats.internal_nodes += 1;
        self.stats.pivots += pivots.len();

        let children = subsets
            .into_iter()
            .map(|subset| self.node(subset, depth + 1, None))
            .collect();

        Box::new(Node::Internal(Internal {
            pivots: pivots.into_iter().map(Pivot::owned).collect(),
            ranges: Some(ranges),
            children,
            bisected: true,
        }))
    }

    /// Two-pivot node split by the generalised hyperplane.
    fn ght(&mut self, points: Vec<usize>, depth: usize, reused: Option<usize>) -> Box<Node> {
        let strategy = self.config.pivot_strategy;

        let pair = match reused.filter(|_| self.config.reuse_pivots) {
            Some(known) => strategy
                .select_partner(&mut self.space, &points, known, &mut self.rng)
                .map(|pos| (Pivot::routing(known), Pivot::owned(points[pos]))),
            None => {
                let positions = strategy.select(&mut self.space, &points, 2, &mut self.rng);
                match positions.as_slice() {
                    &[a, b] => Some((Pivot::owned(points[a]), Pivot::owned(points[b]))),
                    _ => None,
                }
            }
        };

        let (a, b) = match pair {
            Some(pair) => pair,
            None => {
                trace!("no pivot pair among {} points, forcing a leaf", points.len());
                self.stats.degenerate_splits += 1;
                return self.leaf(points);
            }
        };

        let Bisection {
            a_side,
            b_side,
            bisected,
        } = partition::bisect(&mut self.space, &points, a.index, b.index);

        if !bisected {
            trace!("hyperplane left a side empty, dealt {} points by parity", points.len());
            self.stats.degenerate_splits += 1;
        }

        if a_side.is_empty() && b_side.is_empty() {
            return self.leaf(points);
        }

        self.stats.internal_nodes += 1;
        self.stats.pivots += [a, b].iter().filter(|p| p.owned).count();

        let a_child = self.node(a_side, depth + 1, Some(a.index));
        let b_child = self.node(b_side, depth + 1, Some(b.index));

        Box::new(Node::Internal(Internal {
            pivots: vec![a, b],
            ranges: None,
            children: vec![a_child, b_child],
            bisected,
        }))
    }
}
