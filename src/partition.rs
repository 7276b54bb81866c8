use crate::build::Space;

/// Assigns every point of `points` that is not a pivot to its nearest pivot.
///
/// Returns one subset per pivot, holding dataset indices. Ties go to the pivot with the
/// lowest position in `pivots`. Subsets may be empty.
pub(crate) fn nearest_pivot(
    space: &mut Space<'_>,
    points: &[usize],
    pivots: &[usize],
) -> Vec<Vec<usize>> {
    let mut subsets: Vec<Vec<usize>> = vec![Vec::new(); pivots.len()];
    if pivots.is_empty() {
        return subsets;
    }

    for &idx in points {
        if pivots.contains(&idx) {
            continue;
        }

        let mut best = space.dist(idx, pivots[0]);
        let mut best_pivot = 0;
        for (jj, &pivot) in pivots.iter().enumerate().skip(1) {
            let d = space.dist(idx, pivot);
            if d < best {
                best = d;
                best_pivot = jj;
            }
        }

        subsets[best_pivot].push(idx);
    }

    subsets
}

/// Two-sided split of a binary node.
#[derive(Debug)]
pub(crate) struct Bisection {
    pub(crate) a_side: Vec<usize>,
    pub(crate) b_side: Vec<usize>,
    /// `false` if the generalised hyperplane left one side empty and the points were dealt
    /// out by position parity instead. Such a split carries no distance guarantee.
    pub(crate) bisected: bool,
}

/// Splits `points` by the hyperplane between pivots `a` and `b`: a point joins A's side when
/// `d(p, a) <= d(p, b)`.
pub(crate) fn bisect(space: &mut Space<'_>, points: &[usize], a: usize, b: usize) -> Bisection {
    let mut sides = nearest_pivot(space, points, &[a, b]).into_iter();
    let a_side = sides.next().unwrap_or_default();
    let b_side = sides.next().unwrap_or_default();

    if !a_side.is_empty() && !b_side.is_empty() {
        return Bisection {
            a_side,
            b_side,
            bisected: true,
        };
    }

    let mut split = Bisection {
        a_side: Vec::with_capacity(points.len() / 2 + 1),
        b_side: Vec::with_capacity(points.len() / 2 + 1),
        bisected: false,
    };

    for (pos, &idx) in points.iter().enumerate() {
        if idx == a || idx == b {
            continue;
        }

        if pos % 2 == 0 {
            split.a_side.push(idx);
        } else {
            split.b_side.push(idx);
        }
    }

    split
}
