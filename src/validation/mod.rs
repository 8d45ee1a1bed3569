//! Annotation document validation.
//!
//! Documents load permissively, so a file edited by hand or by another tool
//! may hold entries the box store would never produce. This module reports:
//! - duplicate box ids within one image (error)
//! - the id `u64::MAX`, which leaves the box store no id to allocate (error)
//! - non-finite or non-positive geometry (error)
//! - boxes outside their image, when its size is known (warning)
//! - entries under an empty image id (warning)
//! - boxes with no text at all (warning)

mod report;

pub use report::{IssueCode, IssueContext, Severity, ValidationIssue, ValidationReport};

use std::collections::HashSet;

use crate::ir::{AnnotationDocument, ImageDims, TextBox};

#[derive(Clone, Debug, Default)]
pub struct ValidateOptions {
    /// Treat warnings as failures.
    pub strict: bool,
}

impl ValidateOptions {
    /// Whether `report` should make the run fail.
    pub fn fails(&self, report: &ValidationReport) -> bool {
        report.error_count() > 0 || (self.strict && report.warning_count() > 0)
    }
}

// Slack for boxes that sit right on the image edge after rounding.
const BOUNDS_TOLERANCE: f64 = 0.5;

/// Validates every entry of `document`.
///
/// `dims_for` returns the pixel size of an image when it is known; images it
/// returns `None` for skip the bounds check.
pub fn validate_document<F>(document: &AnnotationDocument, mut dims_for: F) -> ValidationReport
where
    F: FnMut(&str) -> Option<ImageDims>,
{
    let mut report = ValidationReport::new();

    for (image_id, boxes) in document.iter() {
        if image_id.trim().is_empty() {
            report.add(ValidationIssue::warning(
                IssueCode::EmptyImageId,
                format!("{} box(es) stored under an empty image id", boxes.len()),
                IssueContext::Document,
            ));
        }

        let dims = dims_for(image_id);
        validate_boxes(image_id, boxes, dims, &mut report);
    }

    report
}

fn validate_boxes(
    image_id: &str,
    boxes: &[TextBox],
    dims: Option<ImageDims>,
    report: &mut ValidationReport,
) {
    let mut seen = HashSet::with_capacity(boxes.len());

    for (index, text_box) in boxes.iter().enumerate() {
        let context = IssueContext::Box {
            image: image_id.to_string(),
            id: text_box.id,
        };

        if !seen.insert(text_box.id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateBoxId,
                format!("Duplicate box id {} (at position {})", text_box.id, index),
                context.clone(),
            ));
        }

        if text_box.id.next().is_none() {
            report.add(ValidationIssue::error(
                IssueCode::BoxIdExhausted,
                format!("Box id {} leaves no room for further ids", text_box.id),
                context.clone(),
            ));
        }

        let bbox = &text_box.coords;
        if !bbox.is_finite() {
            report.add(ValidationIssue::error(
                IssueCode::BBoxNotFinite,
                format!(
                    "Non-finite coordinates ({}, {}, {}, {})",
                    bbox.x(),
                    bbox.y(),
                    bbox.width(),
                    bbox.height()
                ),
                context,
            ));
            continue;
        }

        if !bbox.has_positive_area() {
            report.add(ValidationIssue::error(
                IssueCode::NonPositiveGeometry,
                format!(
                    "Width {} and height {} must both be positive",
                    bbox.width(),
                    bbox.height()
                ),
                context.clone(),
            ));
        }

        if let Some(dims) = dims {
            let (w, h) = (dims.width_f64(), dims.height_f64());
            let corners = bbox.to_xyxy();
            if corners.xmin() < -BOUNDS_TOLERANCE
                || corners.ymin() < -BOUNDS_TOLERANCE
                || corners.xmax() > w + BOUNDS_TOLERANCE
                || corners.ymax() > h + BOUNDS_TOLERANCE
            {
                report.add(ValidationIssue::warning(
                    IssueCode::BBoxOutOfBounds,
                    format!(
                        "Box ({:.1}, {:.1}, {:.1}, {:.1}) extends outside image bounds (0, 0, {}, {})",
                        corners.xmin(),
                        corners.ymin(),
                        corners.xmax(),
                        corners.ymax(),
                        dims.width,
                        dims.height
                    ),
                    context.clone(),
                ));
            }
        }

        if text_box.lines.is_empty() && text_box.user_lines.is_empty() {
            report.add(ValidationIssue::warning(
                IssueCode::EmptyBox,
                "Box has no recognized or user text",
                context,
            ));
        }
    }
}
