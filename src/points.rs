//! The flat point buffer owned by an index.

use bytemuck::{cast_slice, cast_slice_mut};

use crate::error::{NearestIndexError, Result};
use crate::r#type::IndexableNum;
use crate::select::Partition;

/// A flat array of coordinates: x values in even positions, y values in odd positions.
///
/// `[0., 0., 2., 4.]` holds the points `(0, 0)` and `(2, 4)`.
///
/// The buffer is never resized. Building an index reorders its points in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlatPoints<N: IndexableNum> {
    coords: Vec<N>,
}

impl<N: IndexableNum> FlatPoints<N> {
    /// Wrap a flat coordinate buffer, validating that it holds finite `x, y` pairs.
    pub fn try_new(coords: Vec<N>) -> Result<Self> {
        if coords.len() % 2 != 0 {
            return Err(NearestIndexError::OddCoordinateCount(coords.len()));
        }

        let pairs: &[[N; 2]] = cast_slice(&coords);
        if let Some(index) = pairs
            .iter()
            .position(|[x, y]| !x.is_finite() || !y.is_finite())
        {
            return Err(NearestIndexError::NonFiniteCoordinate { index });
        }

        Ok(Self { coords })
    }

    /// The number of points.
    pub fn len(&self) -> usize {
        self.coords.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// The coordinates of the point at `index`.
    #[inline]
    pub fn get(&self, index: usize) -> (N, N) {
        (self.coords[2 * index], self.coords[2 * index + 1])
    }

    /// View the buffer as `[x, y]` pairs.
    #[inline]
    pub fn as_pairs(&self) -> &[[N; 2]] {
        cast_slice(&self.coords)
    }

    /// Mutable view of the buffer as `[x, y]` pairs.
    #[inline]
    pub fn as_pairs_mut(&mut self) -> &mut [[N; 2]] {
        cast_slice_mut(&mut self.coords)
    }

    /// The underlying flat buffer.
    pub fn as_slice(&self) -> &[N] {
        &self.coords
    }

    pub fn into_inner(self) -> Vec<N> {
        self.coords
    }

    /// Returns `true` if points are ordered lexicographically by `(x, y)`.
    pub fn is_sorted_lexicographically(&self) -> bool {
        self.as_pairs()
            .windows(2)
            .all(|w| w[0][0] < w[1][0] || (w[0][0] == w[1][0] && w[0][1] <= w[1][1]))
    }
}

/// The coordinate axis a point range is partitioned along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    #[inline]
    fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
        }
    }
}

/// A mutable range of points ordered by one of their coordinates.
///
/// Swapping moves both coordinates of a point together, so partitioning along `x` and later
/// along `y` keeps every point intact.
#[derive(Debug)]
pub struct AxisSlice<'a, N: IndexableNum> {
    points: &'a mut [[N; 2]],
    axis: usize,
}

impl<'a, N: IndexableNum> AxisSlice<'a, N> {
    pub fn new(points: &'a mut [[N; 2]], axis: Axis) -> Self {
        Self {
            points,
            axis: axis.index(),
        }
    }
}

impl<N: IndexableNum> Partition for AxisSlice<'_, N> {
    type Key = N;

    #[inline]
    fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    fn key(&self, i: usize) -> N {
        self.points[i][self.axis]
    }

    #[inline]
    fn swap(&mut self, i: usize, j: usize) {
        self.points.swap(i, j);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rejects_odd_buffer() {
        let err = FlatPoints::try_new(vec![0., 1., 2.]).unwrap_err();
        assert_eq!(err, NearestIndexError::OddCoordinateCount(3));
    }

    #[test]
    fn rejects_non_finite_coordinate() {
        let err = FlatPoints::try_new(vec![0., 1., 2., f64::NAN, 5., 5.]).unwrap_err();
        assert_eq!(err, NearestIndexError::NonFiniteCoordinate { index: 1 });

        let err = FlatPoints::try_new(vec![f32::INFINITY, 1.]).unwrap_err();
        assert_eq!(err, NearestIndexError::NonFiniteCoordinate { index: 0 });
    }

    #[test]
    fn pairs_view_and_axis_swap() {
        let mut points = FlatPoints::try_new(vec![0., 10., 1., 11., 2., 12.]).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points.get(1), (1., 11.));

        let mut by_y = AxisSlice::new(points.as_pairs_mut(), Axis::Y);
        assert_eq!(by_y.key(2), 12.);
        by_y.swap(0, 2);

        assert_eq!(points.as_slice(), &[2., 12., 1., 11., 0., 10.]);
        assert!(!points.is_sorted_lexicographically());
    }

    #[test]
    fn lexicographic_order() {
        let sorted = FlatPoints::try_new(vec![0., 1., 0., 2., 1., 0.]).unwrap();
        assert!(sorted.is_sorted_lexicographically());
        let unsorted = FlatPoints::try_new(vec![0., 2., 0., 1.]).unwrap();
        assert!(!unsorted.is_sorted_lexicographically());
    }
}
