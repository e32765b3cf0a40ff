use std::fmt::Debug;

use num_traits::Float;

/// A trait for types that can be used for indexed coordinates.
///
/// This trait is sealed and cannot be implemented for external types. Distance bounds rely on
/// IEEE-754 rounding being monotonic, which only holds for the primitive float types.
pub trait IndexableNum:
    private::Sealed + Float + Default + Debug + Send + Sync + bytemuck::Pod
{
}

impl IndexableNum for f32 {}

impl IndexableNum for f64 {}

// https://rust-lang.github.io/api-guidelines/future-proofing.html#sealed-traits-protect-against-downstream-implementations-c-sealed
mod private {
    pub trait Sealed {}

    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// A single coordinate.
///
/// Used in the implementation of `RectTrait` for [`BBox`][crate::bbox::BBox].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord<N: IndexableNum> {
    pub(crate) x: N,
    pub(crate) y: N,
}

impl<N: IndexableNum> geo_traits::CoordTrait for Coord<N> {
    type T = N;

    fn dim(&self) -> geo_traits::Dimensions {
        geo_traits::Dimensions::Xy
    }

    fn x(&self) -> Self::T {
        self.x
    }

    fn y(&self) -> Self::T {
        self.y
    }

    fn nth_or_panic(&self, n: usize) -> Self::T {
        match n {
            0 => self.x,
            1 => self.y,
            _ => panic!("Invalid index of coord"),
        }
    }
}
