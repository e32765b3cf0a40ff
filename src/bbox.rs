//! Axis-aligned bounding boxes and the squared-distance bounds that drive pruning.

use geo_traits::RectTrait;

use crate::r#type::{Coord, IndexableNum};

/// An axis-aligned bounding box.
///
/// Boxes built by this crate are always tight: every edge touches at least one indexed point.
/// [`BBox::distance_bounds`] relies on that for its upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BBox<N: IndexableNum> {
    pub min_x: N,
    pub min_y: N,
    pub max_x: N,
    pub max_y: N,
}

impl<N: IndexableNum> BBox<N> {
    /// Create a new box. The caller must uphold `min_x <= max_x` and `min_y <= max_y`.
    pub fn new(min_x: N, min_y: N, max_x: N, max_y: N) -> Self {
        debug_assert!(min_x <= max_x && min_y <= max_y);
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// The degenerate box of a single point.
    #[inline]
    pub fn from_point(x: N, y: N) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    /// The smallest box containing both `self` and `other`.
    #[inline]
    pub fn extend(&self, other: &Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Returns `true` if the point lies inside or on the border of this box.
    pub fn contains_point(&self, x: N, y: N) -> bool {
        self.min_x <= x && x <= self.max_x && self.min_y <= y && y <= self.max_y
    }

    /// Lower and upper bound of the squared distance from `(x, y)` to the points inside this
    /// box.
    ///
    /// The lower bound is the squared distance to the box itself (zero when the point is
    /// inside). An axis contributes its near edge distance only when the coordinate lies
    /// outside the box span on that axis, compared directly so that rounding in the squared
    /// terms never moves a point across an edge. The upper bound is the smaller of the squared distances to the two corners
    /// that combine one near edge with one far edge. Since each edge of a tight box holds a
    /// point, one of the points on the near edges is at most that far away.
    ///
    /// For a degenerate box both bounds are the exact squared distance to its point.
    #[inline]
    pub fn distance_bounds(&self, x: N, y: N) -> (N, N) {
        let (min_dx, max_dx) = sort_pair(sq(x - self.min_x), sq(x - self.max_x));
        let (min_dy, max_dy) = sort_pair(sq(y - self.min_y), sq(y - self.max_y));

        let mut min_dist = N::zero();
        if x < self.min_x || x > self.max_x {
            min_dist = min_dist + min_dx;
        }
        if y < self.min_y || y > self.max_y {
            min_dist = min_dist + min_dy;
        }

        let max_dist = (max_dx + min_dy).min(min_dx + max_dy);
        (min_dist, max_dist)
    }
}

/// Implement `GeometryTrait` for a rectangle type, exposing it as a `Rect` geometry.
macro_rules! impl_rect_geometry {
    ($ty:ty, $($generics:tt)*) => {
        impl<$($generics)*> geo_traits::GeometryTrait for $ty {
            type T = N;
            type PointType<'b>
                = geo_traits::UnimplementedPoint<N>
            where
                Self: 'b;
            type LineStringType<'b>
                = geo_traits::UnimplementedLineString<N>
            where
                Self: 'b;
            type PolygonType<'b>
                = geo_traits::UnimplementedPolygon<N>
            where
                Self: 'b;
            type MultiPointType<'b>
                = geo_traits::UnimplementedMultiPoint<N>
            where
                Self: 'b;
            type MultiLineStringType<'b>
                = geo_traits::UnimplementedMultiLineString<N>
            where
                Self: 'b;
            type MultiPolygonType<'b>
                = geo_traits::UnimplementedMultiPolygon<N>
            where
                Self: 'b;
            type GeometryCollectionType<'b>
                = geo_traits::UnimplementedGeometryCollection<N>
            where
                Self: 'b;
            type RectType<'b>
                = Self
            where
                Self: 'b;
            type TriangleType<'b>
                = geo_traits::UnimplementedTriangle<N>
            where
                Self: 'b;
            type LineType<'b>
                = geo_traits::UnimplementedLine<N>
            where
                Self: 'b;

            fn dim(&self) -> geo_traits::Dimensions {
                geo_traits::Dimensions::Xy
            }

            fn as_type(
                &self,
            ) -> geo_traits::GeometryType<
                '_,
                geo_traits::UnimplementedPoint<N>,
                geo_traits::UnimplementedLineString<N>,
                geo_traits::UnimplementedPolygon<N>,
                geo_traits::UnimplementedMultiPoint<N>,
                geo_traits::UnimplementedMultiLineString<N>,
                geo_traits::UnimplementedMultiPolygon<N>,
                geo_traits::UnimplementedGeometryCollection<N>,
                Self,
                geo_traits::UnimplementedTriangle<N>,
                geo_traits::UnimplementedLine<N>,
            > {
                geo_traits::GeometryType::Rect(self)
            }
        }
    };
}

pub(crate) use impl_rect_geometry;

impl_rect_geometry!(BBox<N>, N: IndexableNum);

impl<N: IndexableNum> RectTrait for BBox<N> {
    type CoordType<'a>
        = Coord<N>
    where
        Self: 'a;

    fn min(&self) -> Self::CoordType<'_> {
        Coord {
            x: self.min_x,
            y: self.min_y,
        }
    }

    fn max(&self) -> Self::CoordType<'_> {
        Coord {
            x: self.max_x,
            y: self.max_y,
        }
    }
}

/// Squared euclidean distance between two points.
///
/// The addition order matches [`BBox::distance_bounds`], so the distance to a point lying on
/// a box edge never exceeds the upper bound computed for that box.
#[inline]
pub(crate) fn sq_dist<N: IndexableNum>(ax: N, ay: N, bx: N, by: N) -> N {
    sq(bx - ax) + sq(by - ay)
}

#[inline(always)]
fn sq<N: IndexableNum>(v: N) -> N {
    v * v
}

#[inline(always)]
fn sort_pair<N: IndexableNum>(a: N, b: N) -> (N, N) {
    if a > b {
        (b, a)
    } else {
        (a, b)
    }
}
