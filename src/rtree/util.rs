//! Utilities for sizing STR trees.

use crate::error::{NearestIndexError, Result};

/// Nodes address points with `u32` offsets.
pub(crate) fn check_num_points(num_points: usize) -> Result<()> {
    if u32::try_from(num_points).is_err() {
        return Err(NearestIndexError::TooManyPoints(num_points));
    }
    Ok(())
}

/// The height of a tree holding `num_points` points with at most `max_fanout` children per
/// node: the smallest `h` with `max_fanout^h >= num_points`.
pub(crate) fn compute_height(num_points: usize, max_fanout: usize) -> usize {
    debug_assert!(max_fanout >= 2);

    let mut height = 0;
    let mut capacity: usize = 1;
    while capacity < num_points {
        capacity = capacity.saturating_mul(max_fanout);
        height += 1;
    }
    height
}

/// Initial capacity of a search frontier. A query expands at most one node per level before
/// reaching points, each adding up to `max_fanout` entries.
#[inline]
pub(crate) fn frontier_capacity(height: usize, max_fanout: usize) -> usize {
    (height.max(1) + 1) * max_fanout
}

/// Initial capacity of the node array.
#[inline]
pub(crate) fn node_capacity(num_points: usize, max_fanout: usize) -> usize {
    // Leaf groups hold up to `max_fanout` points each and the levels above shrink
    // geometrically, so this is a generous estimate for well-filled trees.
    num_points / (max_fanout - 1) + 1
}

/// `ceil(sqrt(value))` for the small slice counts used by STR.
#[inline]
pub(crate) fn ceil_sqrt(value: usize) -> usize {
    (value as f64).sqrt().ceil() as usize
}
