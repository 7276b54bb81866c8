use oorandom::Rand64;

use crate::build::Space;
use crate::Scalar;

/// Strategy for choosing the pivots of a tree node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PivotStrategy {
    /// Draws pivots uniformly at random without replacement. An m-ary node gets
    /// `min(max_pivots, n)` pivots.
    Random,
    /// Greedy max-min selection: a random first pivot, then repeatedly the point farthest
    /// from its nearest chosen pivot. An m-ary node gets `max(2, min(max_pivots, n / 20))`
    /// pivots, so the fan-out grows with the size of the node.
    FarthestFirst,
}

impl Default for PivotStrategy {
    fn default() -> Self {
        PivotStrategy::Random
    }
}

impl PivotStrategy {
    /// Number of pivots to aim for in an m-ary node holding `n` points.
    pub(crate) fn target(&self, n: usize, max_pivots: usize) -> usize {
        match self {
            PivotStrategy::Random => max_pivots.min(n),
            PivotStrategy::FarthestFirst => (n / 20).min(max_pivots).max(2).min(n),
        }
    }

    /// Chooses up to `target` pivots among `points` and returns their positions in `points`,
    /// in selection order and without duplicates.
    pub(crate) fn select(
        &self,
        space: &mut Space<'_>,
        points: &[usize],
        target: usize,
        rng: &mut Rand64,
    ) -> Vec<usize> {
        match self {
            PivotStrategy::Random => random(points.len(), target, rng),
            PivotStrategy::FarthestFirst => farthest_first(space, points, target, rng),
        }
    }

    /// Chooses a partner for `known`, a pivot that is not itself a member of `points`.
    /// Returns its position in `points`.
    pub(crate) fn select_partner(
        &self,
        space: &mut Space<'_>,
        points: &[usize],
        known: usize,
        rng: &mut Rand64,
    ) -> Option<usize> {
        if points.is_empty() {
            return None;
        }

        match self {
            PivotStrategy::Random => Some(draw(rng, points.len())),
            PivotStrategy::FarthestFirst => {
                let mut best: Option<(usize, Scalar)> = None;
                for (pos, &idx) in points.iter().enumerate() {
                    let d = space.dist(idx, known);
                    match best {
                        Some((_, best_dist)) if d <= best_dist => {}
                        _ => best = Some((pos, d)),
                    }
                }
                best.map(|(pos, _)| pos)
            }
        }
    }
}

#[inline]
fn draw(rng: &mut Rand64, n: usize) -> usize {
    rng.rand_range(0..n as u64) as usize
}

/// Partial Fisher-Yates shuffle over the positions `0..n`.
fn random(n: usize, target: usize, rng: &mut Rand64) -> Vec<usize> {
    let m = target.min(n);
    let mut positions: Vec<usize> = (0..n).collect();

    for ii in 0..m {
        let jj = ii + draw(rng, n - ii);
        positions.swap(ii, jj);
    }

    positions.truncate(m);
    positions
}

fn farthest_first(
    space: &mut Space<'_>,
    points: &[usize],
    target: usize,
    rng: &mut Rand64,
) -> Vec<usize> {
    let n = points.len();
    if n == 0 || target == 0 {
        return Vec::with_capacity(0);
    }

    let mut chosen = vec![false; n];
    let mut pivots = Vec::with_capacity(target);
    // distance from every point to its nearest chosen pivot
    let mut nearest = vec![Scalar::INFINITY; n];

    let first = draw(rng, n);
    chosen[first] = true;
    pivots.push(first);

    while pivots.len() < target {
        let last = points[pivots[pivots.len() - 1]];
        let mut best: Option<(usize, Scalar)> = None;

        for (pos, &idx) in points.iter().enumerate() {
            if chosen[pos] {
                continue;
            }

            let d = space.dist(idx, last);
            if d < nearest[pos] {
                nearest[pos] = d;
            }

            match best {
                Some((_, best_dist)) if nearest[pos] <= best_dist => {}
                _ => best = Some((pos, nearest[pos])),
            }
        }

        match best {
            Some((pos, _)) => {
                chosen[pos] = true;
                pivots.push(pos);
            }
            None => break,
        }
    }

    pivots
}
