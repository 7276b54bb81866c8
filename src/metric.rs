use crate::{Error, Scalar};
use ndarray::ArrayView1;

use ndarray_stats::errors::MultiInputError;
use ndarray_stats::DeviationExt;

/// Enum for distance functions in a metric space.
///
/// All variants satisfy the triangle inequality, which every pruning rule of the tree
/// relies on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Metric {
    /// L-1 or Manhattan distance. See [\[Wikipedia\]](https://en.wikipedia.org/wiki/Taxicab_geometry).
    Manhattan,
    /// L-2 or Euclidean distance. See [\[Wikipedia\]](https://en.wikipedia.org/wiki/Euclidean_distance)
    Euclidean,
    /// L-inf or Chebyshev distance. See [\[Wikipedia\]](https://en.wikipedia.org/wiki/Chebyshev_distance)
    Chebyshev,
}

impl Default for Metric {
    fn default() -> Self {
        Metric::Euclidean
    }
}

impl Metric {
    /// Calculate the distance between two points.
    ///
    /// Returns [`Error::InvalidDimension`] if the points differ in length or are empty.
    pub fn try_distance(
        &self,
        a: ArrayView1<'_, Scalar>,
        b: ArrayView1<'_, Scalar>,
    ) -> Result<Scalar, Error> {
        let dist = match self {
            Metric::Manhattan => a.l1_dist(&b),
            Metric::Euclidean => a.l2_dist(&b),
            Metric::Chebyshev => a.linf_dist(&b),
        };

        dist.map_err(|e| match e {
            MultiInputError::EmptyInput => Error::InvalidDimension {
                expected: 1,
                found: 0,
            },
            _ => Error::InvalidDimension {
                expected: a.len(),
                found: b.len(),
            },
        })
    }

    /// Distance between two points already validated by the tree.
    ///
    /// A shape mismatch yields NaN instead of an error.
    #[inline(always)]
    pub(crate) fn distance(&self, a: ArrayView1<'_, Scalar>, b: ArrayView1<'_, Scalar>) -> Scalar {
        debug_assert_eq!(a.len(), b.len());
        self.try_distance(a, b).unwrap_or(Scalar::NAN)
    }
}
