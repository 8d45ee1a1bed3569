//! Points tagged with their coordinate space.

use std::marker::PhantomData;

use super::space::CoordSpace;

/// A 2D point with a type-level marker for the coordinate space.
///
/// `TSpace` is either [`Pixel`](super::Pixel) or
/// [`Normalized`](super::Normalized); points from different spaces cannot be
/// compared or mixed without an explicit conversion.
#[derive(Clone, Copy, PartialEq)]
pub struct Coord<TSpace> {
    pub x: f64,
    pub y: f64,
    _space: PhantomData<TSpace>,
}

impl<TSpace> Coord<TSpace> {
    /// Creates a new point.
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            _space: PhantomData,
        }
    }

    /// Returns true if both components are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl<TSpace: CoordSpace> std::fmt::Debug for Coord<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Coord<{}>({}, {})", TSpace::NAME, self.x, self.y)
    }
}

impl<TSpace> Default for Coord<TSpace> {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}
