//! Sort-tile-recursive bulk loading.
//!
//! The implementation follows [this
//! paper](https://ia600900.us.archive.org/27/items/nasa_techdoc_19970016975/19970016975.pdf),
//! applied top-down: each node partitions its range of points into vertical slabs by `x`, then
//! each slab into buckets by `y`, and every bucket becomes one child. Buckets are only
//! partially ordered with [`bucketize`], since order inside a bucket is discarded by the next
//! level anyway.

#[cfg(feature = "rayon")]
use rayon::iter::ParallelIterator;
#[cfg(feature = "rayon")]
use rayon::slice::ParallelSliceMut;
use tinyvec::ArrayVec;

use crate::bbox::BBox;
use crate::error::{NearestIndexError, Result};
use crate::points::{Axis, AxisSlice};
use crate::r#type::IndexableNum;
use crate::rtree::node::Node;
use crate::rtree::util::ceil_sqrt;
use crate::rtree::MAX_FANOUT;
use crate::select::bucketize;

/// Ranges with at least this many points bucket their slabs in parallel.
#[cfg(feature = "rayon")]
const PARALLEL_THRESHOLD: usize = 1 << 14;

/// Lays a point buffer out into a flat node array.
pub(crate) struct StrBuilder<'a, N: IndexableNum> {
    points: &'a mut [[N; 2]],
    nodes: &'a mut Vec<Node<N>>,
    stack: &'a mut Vec<usize>,
    max_fanout: usize,
}

impl<'a, N: IndexableNum> StrBuilder<'a, N> {
    pub(crate) fn new(
        points: &'a mut [[N; 2]],
        nodes: &'a mut Vec<Node<N>>,
        stack: &'a mut Vec<usize>,
        max_fanout: usize,
    ) -> Self {
        debug_assert!((2..=MAX_FANOUT).contains(&max_fanout));
        debug_assert!(nodes.is_empty());
        Self {
            points,
            nodes,
            stack,
            max_fanout,
        }
    }

    /// Build the whole tree with its root at index 0.
    ///
    /// When `sorted_by_x` is set the points are already ordered by `x`, so the root skips its
    /// `x` partition. The caller must have checked the point count with
    /// [`check_num_points`][crate::rtree::util::check_num_points].
    pub(crate) fn build(mut self, height: usize, sorted_by_x: bool) -> Result<()> {
        if self.points.is_empty() {
            return Ok(());
        }

        self.nodes.push(Node::default());
        let root = self.build_node(0, self.points.len(), height, sorted_by_x)?;
        self.nodes[0] = root;
        Ok(())
    }

    fn build_node(
        &mut self,
        start: usize,
        end: usize,
        height: usize,
        sorted_by_x: bool,
    ) -> Result<Node<N>> {
        let n = end - start;
        if n <= self.max_fanout {
            return Ok(self.leaf_group(start, end));
        }
        debug_assert!(height >= 2, "{n} points do not fit height {height}");

        // Number of children this node needs so that each one fits in a subtree of `height - 1`
        let num_children = n.div_ceil(self.max_fanout.saturating_pow(height as u32 - 1));
        let bucket_size = n.div_ceil(num_children);
        let slab_size = bucket_size * ceil_sqrt(num_children);

        if !sorted_by_x {
            let mut by_x = AxisSlice::new(&mut self.points[start..end], Axis::X);
            bucketize(&mut by_x, slab_size, self.stack);
        }
        self.bucketize_slabs(start, end, slab_size, bucket_size);

        // Children must be contiguous, so reserve all of their slots before descending.
        let first_child = self.nodes.len();
        let mut ranges: ArrayVec<[(usize, usize); MAX_FANOUT]> = ArrayVec::new();
        for slab_start in (start..end).step_by(slab_size) {
            let slab_end = (slab_start + slab_size).min(end);
            for bucket_start in (slab_start..slab_end).step_by(bucket_size) {
                ranges.push((bucket_start, (bucket_start + bucket_size).min(slab_end)));
            }
        }
        debug_assert!(ranges.len() <= self.max_fanout);
        self.nodes.resize(first_child + ranges.len(), Node::default());

        let mut bbox: Option<BBox<N>> = None;
        for (offset, &(child_start, child_end)) in ranges.iter().enumerate() {
            let child = self.build_node(child_start, child_end, height - 1, false)?;
            bbox = Some(match bbox {
                Some(bbox) => bbox.extend(&child.bbox),
                None => child.bbox,
            });
            self.nodes[first_child + offset] = child;
        }

        let first_child = u32::try_from(first_child)
            .map_err(|_| NearestIndexError::TooManyPoints(self.points.len()))?;
        // There is always at least one child since n > max_fanout
        Ok(Node::internal(
            first_child,
            ranges.len() as u8,
            bbox.unwrap_or_default(),
        ))
    }

    /// Order every `slab_size` wide slab of `start..end` into `bucket_size` buckets by `y`.
    fn bucketize_slabs(&mut self, start: usize, end: usize, slab_size: usize, bucket_size: usize) {
        let range = &mut self.points[start..end];

        #[cfg(feature = "rayon")]
        {
            if range.len() >= PARALLEL_THRESHOLD {
                range
                    .par_chunks_mut(slab_size)
                    .for_each_init(Vec::new, |stack, slab| {
                        bucketize(&mut AxisSlice::new(slab, Axis::Y), bucket_size, stack)
                    });
                return;
            }
        }

        for slab in range.chunks_mut(slab_size) {
            bucketize(&mut AxisSlice::new(slab, Axis::Y), bucket_size, self.stack);
        }
    }

    /// A node whose children are the points themselves, left in their current order.
    fn leaf_group(&self, start: usize, end: usize) -> Node<N> {
        let [x0, y0] = self.points[start];
        let bbox = self.points[start + 1..end]
            .iter()
            .fold(BBox::from_point(x0, y0), |bbox, &[x, y]| {
                bbox.extend(&BBox::from_point(x, y))
            });
        // Both fit: the caller checked the point count and end - start <= MAX_FANOUT
        Node::leaf_group(start as u32, (end - start) as u8, bbox)
    }
}
