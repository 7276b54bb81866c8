use ndarray::Array2;

use crate::build::Space;
use crate::Scalar;

/// Distance bands from every pivot of a node to every subset of that node.
///
/// Entry `(i, j)` holds the smallest and largest distance from pivot `i` to any point stored
/// under child `j`, pivot `j` included. On the diagonal the pivot itself contributes a zero
/// lower bound and the upper bound is the covering radius of the subset.
#[derive(Clone, Debug)]
pub(crate) struct RangeTable {
    low: Array2<Scalar>,
    high: Array2<Scalar>,
}

impl RangeTable {
    /// `subsets[j]` must hold the points assigned to `pivots[j]`, pivots excluded.
    pub(crate) fn build(space: &mut Space<'_>, pivots: &[usize], subsets: &[Vec<usize>]) -> Self {
        let m = pivots.len();
        let mut low = Array2::zeros((m, m));
        let mut high = Array2::zeros((m, m));

        for (ii, &pivot) in pivots.iter().enumerate() {
            for (jj, subset) in subsets.iter().enumerate() {
                let to_pivot = if ii == jj {
                    0.
                } else {
                    space.dist(pivot, pivots[jj])
                };

                let (mut min_d, mut max_d) = (to_pivot, to_pivot);
                for &idx in subset {
                    let d = space.dist(pivot, idx);
                    if d < min_d {
                        min_d = d;
                    }
                    if d > max_d {
                        max_d = d;
                    }
                }

                low[[ii, jj]] = min_d;
                high[[ii, jj]] = max_d;
            }
        }

        Self { low, high }
    }

    /// Number of pivots the table was built for.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.low.nrows()
    }

    pub(crate) fn low(&self, pivot: usize, subset: usize) -> Scalar {
        self.low[[pivot, subset]]
    }

    pub(crate) fn high(&self, pivot: usize, subset: usize) -> Scalar {
        self.high[[pivot, subset]]
    }

    /// Whether subset `child` may hold a point within `radius` of a query whose distances to
    /// the pivots are `pivot_dists`. A single pivot whose band cannot overlap the query ball
    /// rules the subset out.
    pub(crate) fn may_contain(&self, child: usize, pivot_dists: &[Scalar], radius: Scalar) -> bool {
        pivot_dists.iter().enumerate().all(|(jj, &d)| {
            d - radius <= self.high(jj, child) && d + radius >= self.low(jj, child)
        })
    }
}
