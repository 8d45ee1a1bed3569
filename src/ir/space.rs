//! Coordinate space marker types.
//!
//! Boxes drawn or detected on a page live in pixel space, while panel
//! rectangles coming out of detection tooling are normalized against the page
//! size. The markers below keep the two apart at compile time.

use std::fmt;

/// A coordinate space with a human-readable name.
pub trait CoordSpace {
    /// Name used in debug output.
    const NAME: &'static str;
}

/// Marker type for absolute pixel coordinates, origin at the top-left corner.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pixel {}

/// Marker type for coordinates expressed as fractions (0.0 to 1.0) of the
/// image width and height.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Normalized {}

impl CoordSpace for Pixel {
    const NAME: &'static str = "px";
}

impl CoordSpace for Normalized {
    const NAME: &'static str = "norm";
}

impl fmt::Debug for Pixel {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

impl fmt::Debug for Normalized {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}
