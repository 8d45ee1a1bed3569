//! Annotation data model.
//!
//! A [`TextBox`] is one region on one page together with its recognized and
//! user-authored text. The [`AnnotationDocument`] maps each image to its boxes
//! in reading order and is the only thing persisted; [`Panel`]s exist only
//! while an ordering pass runs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::bbox::{BBoxXYWH, BBoxXYXY};
use super::ids::{BoxId, PanelId};
use super::space::{Normalized, Pixel};

/// A detected or hand-drawn text region on one image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextBox {
    /// Unique within the owning image.
    pub id: BoxId,

    /// Region in pixel space, stored on disk as `[x, y, w, h]`.
    pub coords: BBoxXYWH<Pixel>,

    /// Recognized text, one entry per line, in reading order.
    #[serde(default)]
    pub lines: Vec<String>,

    /// Text typed or edited by the annotator (usually the translation).
    #[serde(default)]
    pub user_lines: Vec<String>,
}

impl TextBox {
    pub fn new(id: impl Into<BoxId>, coords: BBoxXYWH<Pixel>, lines: Vec<String>) -> Self {
        Self {
            id: id.into(),
            coords,
            lines,
            user_lines: Vec::new(),
        }
    }

    pub fn with_user_lines(mut self, user_lines: Vec<String>) -> Self {
        self.user_lines = user_lines;
        self
    }
}

/// A grouping rectangle used to cluster bubbles before ordering.
#[derive(Clone, Debug, PartialEq)]
pub struct Panel {
    pub id: PanelId,

    /// Panel area as fractions of the image size.
    pub bbox: BBoxXYXY<Normalized>,

    /// Bubbles assigned to this panel.
    pub members: Vec<TextBox>,
}

impl Panel {
    pub fn new(id: PanelId, bbox: BBoxXYXY<Normalized>) -> Self {
        Self {
            id,
            bbox,
            members: Vec::new(),
        }
    }
}

/// Pixel dimensions of an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageDims {
    pub width: u32,
    pub height: u32,
}

impl ImageDims {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn width_f64(&self) -> f64 {
        self.width as f64
    }

    #[inline]
    pub fn height_f64(&self) -> f64 {
        self.height as f64
    }
}

/// The durable annotation store: image identifier to boxes in reading order.
///
/// Serialized as a single JSON object keyed by image identifier.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationDocument {
    entries: BTreeMap<String, Vec<TextBox>>,
}

impl AnnotationDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Boxes saved for `image_id`; an image never saved has none.
    pub fn boxes(&self, image_id: &str) -> &[TextBox] {
        self.entries
            .get(image_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn contains(&self, image_id: &str) -> bool {
        self.entries.contains_key(image_id)
    }

    /// Replaces the entry for `image_id`, leaving every other entry untouched.
    pub fn set_boxes(&mut self, image_id: impl Into<String>, boxes: Vec<TextBox>) {
        self.entries.insert(image_id.into(), boxes);
    }

    pub fn image_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[TextBox])> {
        self.entries
            .iter()
            .map(|(id, boxes)| (id.as_str(), boxes.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
