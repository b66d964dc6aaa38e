//! k-d tree for nearest-neighbour queries over entity positions
//!
//! Built from a positional snapshot at the start of a tick and never updated
//! in place. Any position change needs a full rebuild.
//!
//! Distances are compared on exact squared integer values, so ordering is
//! stable. Equal distances are ordered by ascending entity id.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::game::state::EntityId;
use crate::util::ivec2::IVec2;

/// A query hit: entity id, its position at build time and its true
/// Euclidean distance from the query point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub id: EntityId,
    pub position: IVec2,
    pub distance: f32,
}

#[derive(Debug, Clone, Copy)]
struct IndexedPoint {
    position: IVec2,
    id: EntityId,
}

/// Heap entry ordered by `(dist_sq, id)`; the max-heap top is the current worst hit
#[derive(Debug, Clone, Copy)]
struct Candidate {
    dist_sq: i64,
    id: EntityId,
    position: IVec2,
}

impl Candidate {
    fn new(query: IVec2, point: IndexedPoint) -> Self {
        Self {
            dist_sq: query.distance_sq(point.position),
            id: point.id,
            position: point.position,
        }
    }

    fn into_neighbor(self) -> Neighbor {
        Neighbor {
            id: self.id,
            position: self.position,
            distance: (self.dist_sq as f64).sqrt() as f32,
        }
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist_sq
            .cmp(&other.dist_sq)
            .then(self.id.cmp(&other.id))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Implicit balanced k-d tree
///
/// `points` is permuted so that the middle element of every subrange splits
/// that subrange on the axis for its depth (x at even depths, y at odd).
#[derive(Debug, Clone, Default)]
pub struct SpatialIndex {
    points: Vec<IndexedPoint>,
}

impl SpatialIndex {
    /// Build the tree in O(n log n)
    pub fn build(points: &[(IVec2, EntityId)]) -> Self {
        let mut points: Vec<IndexedPoint> = points
            .iter()
            .map(|&(position, id)| IndexedPoint { position, id })
            .collect();
        partition(&mut points, 0);
        Self { points }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Position recorded for `id` at build time
    pub fn position_of(&self, id: EntityId) -> Option<IVec2> {
        self.points.iter().find(|p| p.id == id).map(|p| p.position)
    }

    /// Up to `k` nearest entities in ascending `(distance, id)` order
    ///
    /// Asking for more than the population returns everything.
    pub fn query_k_nearest(&self, point: IVec2, k: usize) -> Vec<Neighbor> {
        self.k_nearest_where(point, k, &|_| true)
    }

    /// Nearest entity accepted by `accept`, if any
    pub fn nearest_where<F>(&self, point: IVec2, accept: F) -> Option<Neighbor>
    where
        F: Fn(EntityId) -> bool,
    {
        self.k_nearest_where(point, 1, &accept).into_iter().next()
    }

    /// All entities strictly closer than `radius`, ascending `(distance, id)`
    pub fn within_radius(&self, point: IVec2, radius: f32) -> Vec<Neighbor> {
        if radius <= 0.0 {
            return Vec::new();
        }
        let mut hits: Vec<Candidate> = Vec::new();
        let radius_sq = radius as f64 * radius as f64;
        self.collect_within(0, self.points.len(), 0, point, radius_sq, &mut hits);
        hits.sort_unstable();
        hits.into_iter().map(Candidate::into_neighbor).collect()
    }

    fn k_nearest_where(
        &self,
        point: IVec2,
        k: usize,
        accept: &dyn Fn(EntityId) -> bool,
    ) -> Vec<Neighbor> {
        if k == 0 || self.points.is_empty() {
            return Vec::new();
        }
        let k = k.min(self.points.len());
        let mut heap = BinaryHeap::with_capacity(k + 1);
        self.search(0, self.points.len(), 0, point, k, accept, &mut heap);
        heap.into_sorted_vec()
            .into_iter()
            .map(Candidate::into_neighbor)
            .collect()
    }

    #[allow(clippy::too_many_arguments)]
    fn search(
        &self,
        lo: usize,
        hi: usize,
        depth: usize,
        query: IVec2,
        k: usize,
        accept: &dyn Fn(EntityId) -> bool,
        heap: &mut BinaryHeap<Candidate>,
    ) {
        if lo >= hi {
            return;
        }
        let mid = lo + (hi - lo) / 2;
        let node = self.points[mid];

        if accept(node.id) {
            let candidate = Candidate::new(query, node);
            if heap.len() < k {
                heap.push(candidate);
            } else if heap.peek().is_some_and(|worst| candidate < *worst) {
                heap.pop();
                heap.push(candidate);
            }
        }

        let axis = depth % 2;
        let diff = (query.axis(axis) - node.position.axis(axis)) as i64;
        let (near, far) = if diff < 0 {
            ((lo, mid), (mid + 1, hi))
        } else {
            ((mid + 1, hi), (lo, mid))
        };

        self.search(near.0, near.1, depth + 1, query, k, accept, heap);

        // `<=` keeps equal-distance hits on the far side reachable for the id tie-break
        let far_reachable = heap.len() < k
            || heap.peek().is_some_and(|worst| diff * diff <= worst.dist_sq);
        if far_reachable {
            self.search(far.0, far.1, depth + 1, query, k, accept, heap);
        }
    }

    fn collect_within(
        &self,
        lo: usize,
        hi: usize,
        depth: usize,
        query: IVec2,
        radius_sq: f64,
        hits: &mut Vec<Candidate>,
    ) {
        if lo >= hi {
            return;
        }
        let mid = lo + (hi - lo) / 2;
        let node = self.points[mid];

        let candidate = Candidate::new(query, node);
        if (candidate.dist_sq as f64) < radius_sq {
            hits.push(candidate);
        }

        let axis = depth % 2;
        let diff = (query.axis(axis) - node.position.axis(axis)) as i64;
        let plane_sq = (diff * diff) as f64;

        if diff < 0 || plane_sq < radius_sq {
            self.collect_within(lo, mid, depth + 1, query, radius_sq, hits);
        }
        if diff >= 0 || plane_sq < radius_sq {
            self.collect_within(mid + 1, hi, depth + 1, query, radius_sq, hits);
        }
    }
}

/// Median-split `points` in place, alternating axes by depth
fn partition(points: &mut [IndexedPoint], depth: usize) {
    if points.len() <= 1 {
        return;
    }
    let axis = depth % 2;
    let mid = points.len() / 2;
    points.select_nth_unstable_by(mid, |a, b| axis_order(a, b, axis));

    let (left, rest) = points.split_at_mut(mid);
    partition(left, depth + 1);
    partition(&mut rest[1..], depth + 1);
}

#[inline]
fn axis_order(a: &IndexedPoint, b: &IndexedPoint, axis: usize) -> Ordering {
    a.position
        .axis(axis)
        .cmp(&b.position.axis(axis))
        .then(a.id.cmp(&b.id))
}
