//! Branch-and-bound nearest-neighbor search.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use geo_traits::CoordTrait;
use log::warn;

use crate::bbox::sq_dist;
use crate::r#type::{Coord, IndexableNum};
use crate::rtree::index::{NearestIndex, ScratchMode};
use crate::rtree::node::NodeKind;
use crate::rtree::util::frontier_capacity;

/// The point closest to a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor<N: IndexableNum> {
    /// The `x` coordinate of the indexed point.
    pub x: N,
    /// The `y` coordinate of the indexed point.
    pub y: N,
    /// Squared euclidean distance from the query to this point.
    pub dist_squared: N,
}

impl<N: IndexableNum> Neighbor<N> {
    /// Euclidean distance from the query to this point.
    pub fn distance(&self) -> N {
        self.dist_squared.sqrt()
    }

    /// The indexed point as a coordinate.
    pub fn coord(&self) -> Coord<N> {
        Coord {
            x: self.x,
            y: self.y,
        }
    }
}

/// What a frontier entry refers to.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Entry<N: IndexableNum> {
    Point { x: N, y: N },
    Node(u32),
}

/// An entry in the frontier, keyed by a lower bound of the distance to anything it contains.
#[derive(Debug, Clone, Copy, PartialEq)]
struct FrontierItem<N: IndexableNum> {
    dist: N,
    entry: Entry<N>,
}

impl<N: IndexableNum> Eq for FrontierItem<N> {}

impl<N: IndexableNum> Ord for FrontierItem<N> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Coordinates are validated on load and queries on entry, so distances are never NaN
        self.dist
            .partial_cmp(&other.dist)
            .unwrap_or(Ordering::Equal)
    }
}

impl<N: IndexableNum> PartialOrd for FrontierItem<N> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The priority queue of a single query, ordered by smallest distance first.
///
/// Frontiers are scratch space: an index keeps them in a pool and reuses their allocation
/// across queries.
#[derive(Debug, Default)]
pub(crate) struct Frontier<N: IndexableNum> {
    heap: BinaryHeap<Reverse<FrontierItem<N>>>,
}

impl<N: IndexableNum> Frontier<N> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity),
        }
    }

    #[inline]
    fn push(&mut self, dist: N, entry: Entry<N>) {
        self.heap.push(Reverse(FrontierItem { dist, entry }));
    }

    #[inline]
    fn pop(&mut self) -> Option<FrontierItem<N>> {
        self.heap.pop().map(|Reverse(item)| item)
    }

    pub(crate) fn clear(&mut self) {
        self.heap.clear();
    }

    pub(crate) fn capacity(&self) -> usize {
        self.heap.capacity()
    }
}

impl<N: IndexableNum> NearestIndex<N> {
    /// Find the indexed point closest to `(x, y)`.
    ///
    /// Returns `None` when the index is empty or not yet loaded, or when the query has a
    /// non-finite coordinate. When several points are equally close, any one of them may be
    /// returned.
    ///
    /// ```
    /// use nearest_index::NearestIndex;
    ///
    /// let index = NearestIndex::from_points(vec![0., 0., 1., 1., 0., 1.]).unwrap();
    /// let nearest = index.find_nearest_point(3., 3.).unwrap();
    /// assert_eq!((nearest.x, nearest.y, nearest.dist_squared), (1., 1., 8.));
    /// ```
    pub fn find_nearest_point(&self, x: N, y: N) -> Option<Neighbor<N>> {
        self.find_nearest_point_within(x, y, N::infinity())
    }

    /// Find the indexed point closest to `(x, y)` among those at a squared distance of at most
    /// `max_dist_squared`.
    ///
    /// ```
    /// use nearest_index::NearestIndex;
    ///
    /// let index = NearestIndex::from_points(vec![0., 0., 1., 0., 1., 1., 0., 1.]).unwrap();
    /// assert!(index.find_nearest_point_within(0.5, 0.5, 0.25).is_none());
    /// assert!(index.find_nearest_point_within(0.5, 0.5, 0.5).is_some());
    /// ```
    pub fn find_nearest_point_within(
        &self,
        x: N,
        y: N,
        max_dist_squared: N,
    ) -> Option<Neighbor<N>> {
        if !(x.is_finite() && y.is_finite()) {
            warn!("nearest point query with non-finite coordinate ({x:?}, {y:?})");
            return None;
        }
        if max_dist_squared.is_nan() || self.nodes.is_empty() {
            return None;
        }

        self.with_frontier(|frontier| {
            frontier.clear();
            let nearest = self.search(frontier, x, y, max_dist_squared);
            frontier.clear();
            nearest
        })
    }

    /// Find the indexed point closest to `coord`.
    pub fn find_nearest_coord(&self, coord: &impl CoordTrait<T = N>) -> Option<Neighbor<N>> {
        self.find_nearest_point(coord.x(), coord.y())
    }

    /// Find the indexed point closest to `coord` within a squared distance of
    /// `max_dist_squared`.
    pub fn find_nearest_coord_within(
        &self,
        coord: &impl CoordTrait<T = N>,
        max_dist_squared: N,
    ) -> Option<Neighbor<N>> {
        self.find_nearest_point_within(coord.x(), coord.y(), max_dist_squared)
    }

    /// Run `search` with a frontier borrowed according to the scratch mode.
    fn with_frontier<R>(&self, search: impl FnOnce(&mut Frontier<N>) -> R) -> R {
        let capacity = frontier_capacity(self.height, self.options.max_fanout);
        match self.options.scratch_mode {
            ScratchMode::Pooled => {
                let mut frontier = self
                    .frontiers
                    .checkout(|| Frontier::with_capacity(capacity));
                search(&mut frontier)
            }
            ScratchMode::Exclusive => {
                if let Some(mut frontier) = self.exclusive.try_lock() {
                    return search(&mut frontier);
                }
                warn!("exclusive frontier is held by a concurrent query, allocating a fresh one");
                search(&mut Frontier::with_capacity(capacity))
            }
        }
    }

    fn search(
        &self,
        frontier: &mut Frontier<N>,
        x: N,
        y: N,
        max_dist_squared: N,
    ) -> Option<Neighbor<N>> {
        let points = self.points.as_pairs();

        let (min_dist, max_dist) = self.nodes[0].bbox.distance_bounds(x, y);
        let mut upper_bound = max_dist_squared.min(max_dist);
        if min_dist > upper_bound {
            return None;
        }
        frontier.push(min_dist, Entry::Node(0));

        while let Some(item) = frontier.pop() {
            // Everything left in the frontier is at least this far away
            if item.dist > upper_bound {
                break;
            }

            let node = match item.entry {
                Entry::Point { x: px, y: py } => {
                    return Some(Neighbor {
                        x: px,
                        y: py,
                        dist_squared: item.dist,
                    });
                }
                Entry::Node(index) => self.nodes[index as usize],
            };

            match node.kind {
                NodeKind::LeafGroup => {
                    for &[px, py] in &points[node.children()] {
                        let dist = sq_dist(x, y, px, py);
                        if dist <= upper_bound {
                            frontier.push(dist, Entry::Point { x: px, y: py });
                            upper_bound = dist;
                        }
                    }
                }
                NodeKind::Internal => {
                    for child in node.children() {
                        let (min_dist, max_dist) = self.nodes[child].bbox.distance_bounds(x, y);
                        if min_dist <= upper_bound {
                            frontier.push(min_dist, Entry::Node(child as u32));
                            if max_dist < upper_bound {
                                upper_bound = max_dist;
                            }
                        }
                    }
                }
            }
        }

        None
    }
}
