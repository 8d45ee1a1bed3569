//! Region detectors backed by detection-format label files.
//!
//! Detection models run outside this crate and leave one label file per
//! image; these adapters read them back through the detector traits.

use std::path::PathBuf;

use super::{Detector, ImageRef, PanelDetector};
use crate::error::KomaError;
use crate::ir::io_yolo::{label_path_for, read_bubble_rects, read_panel_rects};
use crate::ir::{BBoxXYXY, Normalized, Pixel};

/// Bubble detections read from `<labels_dir>/<image stem>.txt`.
#[derive(Clone, Debug)]
pub struct LabelFileDetector {
    labels_dir: PathBuf,
}

impl LabelFileDetector {
    pub fn new(labels_dir: impl Into<PathBuf>) -> Self {
        Self {
            labels_dir: labels_dir.into(),
        }
    }
}

impl Detector for LabelFileDetector {
    fn predict(&mut self, image: &ImageRef<'_>) -> Result<Vec<BBoxXYXY<Pixel>>, KomaError> {
        read_bubble_rects(&label_path_for(&self.labels_dir, image.id), image.dims)
    }
}

/// Panel detections read from a label directory, kept normalized.
#[derive(Clone, Debug)]
pub struct LabelFilePanels {
    labels_dir: PathBuf,
}

impl LabelFilePanels {
    pub fn new(labels_dir: impl Into<PathBuf>) -> Self {
        Self {
            labels_dir: labels_dir.into(),
        }
    }
}

impl PanelDetector for LabelFilePanels {
    fn predict_panels(
        &mut self,
        image: &ImageRef<'_>,
    ) -> Result<Vec<BBoxXYXY<Normalized>>, KomaError> {
        read_panel_rects(&label_path_for(&self.labels_dir, image.id))
    }
}

/// A page with no panel detections; every bubble gets its own panel.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPanels;

impl PanelDetector for NoPanels {
    fn predict_panels(
        &mut self,
        _image: &ImageRef<'_>,
    ) -> Result<Vec<BBoxXYXY<Normalized>>, KomaError> {
        Ok(Vec::new())
    }
}
