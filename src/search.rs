use ndarray::{ArrayView1, ArrayView2};

use crate::candidates::{CandidateList, Neighbour};
use crate::range::RangeTable;
use crate::tree::{Internal, Node};
use crate::{Metric, Scalar};

/// Rule used to skip subtrees during a search. It also fixes the shape of the tree: the
/// range-table rule builds m-ary nodes, the radius rule builds binary ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PruningRule {
    /// Geometric near-neighbour access tree (GNAT): every internal node stores, for each pivot
    /// and each child, the band of distances from the pivot to the child's points. A child is
    /// skipped when any pivot proves the query ball misses its band.
    RangeTable,
    /// Generalised hyperplane tree (GHT): two pivots per node, points sent to the side of the
    /// nearer pivot. A side is skipped when the query ball cannot cross the hyperplane.
    BinaryRadius,
}

impl Default for PruningRule {
    fn default() -> Self {
        PruningRule::RangeTable
    }
}

/// Query result containing k-nearest neighbours to a query point.
#[derive(Clone, Debug, Default)]
pub struct QueryResult {
    query_index: usize,
    neighbours: Vec<Neighbour>,
    distance_calls: usize,
    pruned: usize,
}

impl QueryResult {
    /// Returns the query index from batch query for this result.
    pub fn index(&self) -> usize {
        self.query_index
    }

    /// Sets the query index.
    pub fn set_index(&mut self, query_index: usize) {
        self.query_index = query_index;
    }

    /// Returns the nearest neighbours of a query, closest first. Neighbours at equal distance
    /// appear in the order the search accepted them.
    pub fn neighbours(&self) -> &[Neighbour] {
        &self.neighbours
    }

    /// Number of distance evaluations the query needed.
    pub fn distance_calls(&self) -> usize {
        self.distance_calls
    }

    /// Number of subtrees skipped by the pruning rule.
    pub fn pruned(&self) -> usize {
        self.pruned
    }

    /// Consumes ```self``` and returns the query index and the nearest neighbours of that query.
    pub fn take(self) -> (usize, Vec<Neighbour>) {
        (self.query_index, self.neighbours)
    }
}

/// Depth-first k-NN traversal for a single query.
#[derive(Debug)]
pub(crate) struct Searcher<'a, 'q> {
    data: ArrayView2<'a, Scalar>,
    metric: Metric,
    query: ArrayView1<'q, Scalar>,
    list: CandidateList,
    calls: usize,
    pruned: usize,
}

impl<'a, 'q> Searcher<'a, 'q> {
    pub(crate) fn new(
        data: ArrayView2<'a, Scalar>,
        metric: Metric,
        query: ArrayView1<'q, Scalar>,
        capacity: usize,
    ) -> Self {
        Self {
            data,
            metric,
            query,
            list: CandidateList::new(capacity),
            calls: 0,
            pruned: 0,
        }
    }

    #[inline(always)]
    fn dist(&mut self, idx: usize) -> Scalar {
        self.calls += 1;
        self.metric.distance(self.query, self.data.row(idx))
    }

    /// Offers every row of the dataset, without any pruning.
    pub(crate) fn scan(&mut self) {
        for idx in 0..self.data.nrows() {
            let d = self.dist(idx);
            self.list.offer(idx, d);
        }
    }

    /// `inherited` carries the parent's distance to a pivot this node reuses.
    pub(crate) fn visit(&mut self, node: &Node, inherited: Option<(usize, Scalar)>) {
        match node {
            Node::Leaf { bucket } => {
                for &idx in bucket {
                    let d = self.dist(idx);
                    self.list.offer(idx, d);
                }
            }
            Node::Internal(inner) => {
                let mut pivot_dists = Vec::with_capacity(inner.pivots.len());
                for pivot in &inner.pivots {
                    let d = match inherited {
                        Some((idx, d)) if !pivot.owned && idx == pivot.index => d,
                        _ => self.dist(pivot.index),
                    };

                    if pivot.owned {
                        self.list.offer(pivot.index, d);
                    }
                    pivot_dists.push(d);
                }

                match &inner.ranges {
                    Some(ranges) => self.visit_gnat(inner, ranges, &pivot_dists),
                    None => self.visit_ght(inner, &pivot_dists),
                }
            }
        }
    }

    fn visit_gnat(&mut self, inner: &Internal, ranges: &RangeTable, pivot_dists: &[Scalar]) {
        for (ii, child) in inner.children.iter().enumerate() {
            let child = match child {
                Some(child) => child,
                None => continue,
            };

            let radius = self.list.radius();
            if ranges.may_contain(ii, pivot_dists, radius) {
                self.visit(child, None);
            } else {
                self.pruned += 1;
            }
        }
    }

    fn visit_ght(&mut self, inner: &Internal, pivot_dists: &[Scalar]) {
        let (d_a, d_b) = (pivot_dists[0], pivot_dists[1]);
        // nearer side first, so the radius shrinks before the other side is judged
        let order = if d_a <= d_b { [0, 1] } else { [1, 0] };

        for &side in &order {
            let child = match &inner.children[side] {
                Some(child) => child,
                None => continue,
            };

            let (near, far) = if side == 0 { (d_a, d_b) } else { (d_b, d_a) };

            let radius = self.list.radius();
            if !inner.bisected || near - radius <= far + radius {
                self.visit(child, Some((inner.pivots[side].index, near)));
            } else {
                self.pruned += 1;
            }
        }
    }

    pub(crate) fn finish(self) -> QueryResult {
        QueryResult {
            query_index: 0,
            neighbours: self.list.into_sorted(),
            distance_calls: self.calls,
            pruned: self.pruned,
        }
    }
}
