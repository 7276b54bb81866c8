use crate::Scalar;

/// A neighbour resulted from a k-nearest neighbour search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbour {
    idx: usize,
    dist: Scalar,
}

impl Neighbour {
    pub(crate) fn new(idx: usize, dist: Scalar) -> Self {
        Self { idx, dist }
    }

    /// Returns the index of a neighbour, i.e. its row in the dataset the tree was built from.
    pub fn index(&self) -> usize {
        self.idx
    }

    /// Returns the distance for a neighbour to a query point.
    pub fn dist(&self) -> Scalar {
        self.dist
    }
}

#[derive(Clone, Copy, Debug)]
struct Slot {
    idx: Option<usize>,
    dist: Scalar,
    // arrival order, used to order equal distances on extraction
    seq: u64,
}

impl Slot {
    const EMPTY: Slot = Slot {
        idx: None,
        dist: Scalar::INFINITY,
        seq: u64::MAX,
    };
}

/// Fixed-capacity list of the best candidates seen so far during one query.
///
/// Unused slots hold an infinite distance, so the worst slot is found by a plain max-scan
/// whether or not the list is full. A candidate replaces the worst slot only when it is
/// strictly closer; on equal distances the candidate seen first stays.
#[derive(Debug)]
pub(crate) struct CandidateList {
    slots: Vec<Slot>,
    arrivals: u64,
}

impl CandidateList {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            slots: vec![Slot::EMPTY; capacity],
            arrivals: 0,
        }
    }

    /// Position of the worst slot. Among equal maxima the latest arrival is the worst, and an
    /// empty slot comes after every arrival.
    #[inline]
    fn worst(&self) -> usize {
        let mut worst = 0;
        for (ii, slot) in self.slots.iter().enumerate().skip(1) {
            let current = &self.slots[worst];
            if slot.dist > current.dist || (slot.dist == current.dist && slot.seq > current.seq) {
                worst = ii;
            }
        }
        worst
    }

    /// Current search radius: the distance of the worst candidate, or infinity while the list
    /// still has free slots.
    #[inline]
    pub(crate) fn radius(&self) -> Scalar {
        if self.slots.is_empty() {
            Scalar::INFINITY
        } else {
            self.slots[self.worst()].dist
        }
    }

    /// Offers a point to the list. Returns `true` if it was kept.
    pub(crate) fn offer(&mut self, idx: usize, dist: Scalar) -> bool {
        if self.slots.is_empty() {
            return false;
        }

        let worst = self.worst();
        // an empty slot takes any distance, infinite ones included
        if self.slots[worst].idx.is_none() || dist < self.slots[worst].dist {
            self.slots[worst] = Slot {
                idx: Some(idx),
                dist,
                seq: self.arrivals,
            };
            self.arrivals += 1;
            true
        } else {
            false
        }
    }

    /// Consumes the list and returns the filled slots sorted by distance, ties in arrival
    /// order.
    pub(crate) fn into_sorted(self) -> Vec<Neighbour> {
        let mut filled: Vec<Slot> = self.slots.into_iter().filter(|s| s.idx.is_some()).collect();
        filled.sort_by(|a, b| a.dist.total_cmp(&b.dist).then(a.seq.cmp(&b.seq)));

        filled
            .into_iter()
            .filter_map(|s| s.idx.map(|idx| Neighbour::new(idx, s.dist)))
            .collect()
    }
}
