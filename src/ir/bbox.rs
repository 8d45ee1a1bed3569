//! Axis-aligned rectangles.
//!
//! [`BBoxXYXY`] is the corner form used for geometry: containment, scaling,
//! detection output. [`BBoxXYWH`] is the form a text box is persisted in.

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::coord::Coord;
use super::space::CoordSpace;
use super::{Normalized, Pixel};

/// An axis-aligned bounding box in XYXY form (xmin, ymin, xmax, ymax).
///
/// The constructors accept degenerate or inverted boxes; callers that need a
/// usable region check [`BBoxXYXY::has_positive_area`].
#[derive(Clone, Copy, PartialEq)]
pub struct BBoxXYXY<TSpace> {
    pub min: Coord<TSpace>,
    pub max: Coord<TSpace>,
}

impl<TSpace> BBoxXYXY<TSpace> {
    #[inline]
    pub fn from_xyxy(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            min: Coord::new(xmin, ymin),
            max: Coord::new(xmax, ymax),
        }
    }

    /// Builds a box from its top-left corner and size.
    #[inline]
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::from_xyxy(x, y, x + width, y + height)
    }

    /// Builds a box from its center and size (the detection label layout).
    #[inline]
    pub fn from_cxcywh(cx: f64, cy: f64, width: f64, height: f64) -> Self {
        let half_w = width / 2.0;
        let half_h = height / 2.0;
        Self::from_xyxy(cx - half_w, cy - half_h, cx + half_w, cy + half_h)
    }

    #[inline]
    pub fn xmin(&self) -> f64 {
        self.min.x
    }

    #[inline]
    pub fn ymin(&self) -> f64 {
        self.min.y
    }

    #[inline]
    pub fn xmax(&self) -> f64 {
        self.max.x
    }

    #[inline]
    pub fn ymax(&self) -> f64 {
        self.max.y
    }

    /// Width of the box. Negative for inverted boxes.
    #[inline]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Height of the box. Negative for inverted boxes.
    #[inline]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    /// Returns true if both width and height are strictly positive.
    #[inline]
    pub fn has_positive_area(&self) -> bool {
        self.width() > 0.0 && self.height() > 0.0
    }

    /// Center point of the box.
    #[inline]
    pub fn center(&self) -> Coord<TSpace> {
        Coord::new(
            self.min.x + self.width() / 2.0,
            self.min.y + self.height() / 2.0,
        )
    }

    /// Returns true if `point` lies inside the box or on any of its edges.
    #[inline]
    pub fn contains_inclusive(&self, point: &Coord<TSpace>) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Converts to (x, y, width, height) with (x, y) the top-left corner.
    #[inline]
    pub fn to_xywh(&self) -> (f64, f64, f64, f64) {
        (self.xmin(), self.ymin(), self.width(), self.height())
    }

    /// Converts to (x_center, y_center, width, height).
    #[inline]
    pub fn to_cxcywh(&self) -> (f64, f64, f64, f64) {
        let center = self.center();
        (center.x, center.y, self.width(), self.height())
    }
}

impl BBoxXYXY<Pixel> {
    /// Expresses the box as fractions of the image size.
    pub fn to_normalized(&self, image_width: f64, image_height: f64) -> BBoxXYXY<Normalized> {
        BBoxXYXY::from_xyxy(
            self.min.x / image_width,
            self.min.y / image_height,
            self.max.x / image_width,
            self.max.y / image_height,
        )
    }
}

impl BBoxXYXY<Normalized> {
    /// Scales the box back to absolute pixels for an image of the given size.
    pub fn to_pixel(&self, image_width: f64, image_height: f64) -> BBoxXYXY<Pixel> {
        BBoxXYXY::from_xyxy(
            self.min.x * image_width,
            self.min.y * image_height,
            self.max.x * image_width,
            self.max.y * image_height,
        )
    }
}

impl<TSpace: CoordSpace> std::fmt::Debug for BBoxXYXY<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BBoxXYXY")
            .field("space", &TSpace::NAME)
            .field("xmin", &self.min.x)
            .field("ymin", &self.min.y)
            .field("xmax", &self.max.x)
            .field("ymax", &self.max.y)
            .finish()
    }
}

/// A box as annotators store it: top-left corner plus size.
///
/// This is the persisted form of a text box. The four values are kept exactly
/// as given, so a document read and written back is unchanged; the corner
/// form is derived on demand.
#[derive(Clone, Copy, PartialEq)]
pub struct BBoxXYWH<TSpace> {
    origin: Coord<TSpace>,
    width: f64,
    height: f64,
}

impl<TSpace> BBoxXYWH<TSpace> {
    #[inline]
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Coord::new(x, y),
            width,
            height,
        }
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.origin.x
    }

    #[inline]
    pub fn y(&self) -> f64 {
        self.origin.y
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.height
    }

    #[inline]
    pub fn to_xywh(&self) -> (f64, f64, f64, f64) {
        (self.origin.x, self.origin.y, self.width, self.height)
    }

    #[inline]
    pub fn to_xyxy(&self) -> BBoxXYXY<TSpace> {
        BBoxXYXY::from_xywh(self.origin.x, self.origin.y, self.width, self.height)
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.origin.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// Returns true if the stored width and height are strictly positive.
    #[inline]
    pub fn has_positive_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    #[inline]
    pub fn center(&self) -> Coord<TSpace> {
        Coord::new(
            self.origin.x + self.width / 2.0,
            self.origin.y + self.height / 2.0,
        )
    }
}

impl BBoxXYWH<Pixel> {
    /// Expresses the box as fractions of the image size.
    pub fn to_normalized(&self, image_width: f64, image_height: f64) -> BBoxXYXY<Normalized> {
        BBoxXYXY::from_xywh(
            self.origin.x / image_width,
            self.origin.y / image_height,
            self.width / image_width,
            self.height / image_height,
        )
    }
}

impl<TSpace> From<BBoxXYXY<TSpace>> for BBoxXYWH<TSpace> {
    fn from(bbox: BBoxXYXY<TSpace>) -> Self {
        let (x, y, w, h) = bbox.to_xywh();
        Self::from_xywh(x, y, w, h)
    }
}

impl<TSpace: CoordSpace> std::fmt::Debug for BBoxXYWH<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BBoxXYWH")
            .field("space", &TSpace::NAME)
            .field("x", &self.origin.x)
            .field("y", &self.origin.y)
            .field("w", &self.width)
            .field("h", &self.height)
            .finish()
    }
}

// Hand-written so that TSpace needs no serde bounds.
impl<TSpace> Serialize for BBoxXYWH<TSpace> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(4)?;
        tuple.serialize_element(&self.origin.x)?;
        tuple.serialize_element(&self.origin.y)?;
        tuple.serialize_element(&self.width)?;
        tuple.serialize_element(&self.height)?;
        tuple.end()
    }
}

impl<'de, TSpace> Deserialize<'de> for BBoxXYWH<TSpace> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct XywhVisitor<TSpace>(std::marker::PhantomData<TSpace>);

        impl<'de, TSpace> Visitor<'de> for XywhVisitor<TSpace> {
            type Value = BBoxXYWH<TSpace>;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("an array [x, y, w, h]")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut values = [0.0f64; 4];
                for (index, slot) in values.iter_mut().enumerate() {
                    *slot = seq
                        .next_element()?
                        .ok_or_else(|| de::Error::invalid_length(index, &self))?;
                }
                if seq.next_element::<de::IgnoredAny>()?.is_some() {
                    return Err(de::Error::invalid_length(5, &self));
                }
                let [x, y, w, h] = values;
                Ok(BBoxXYWH::from_xywh(x, y, w, h))
            }
        }

        deserializer.deserialize_tuple(4, XywhVisitor(std::marker::PhantomData))
    }
}
