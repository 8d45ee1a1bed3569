//! Plain-text reports over a whole annotation document.
//!
//! Each image becomes a page: a `Page <N>` header (1-based, in the order the
//! images are listed), every line of every box in reading order, then a blank
//! line. The raw report uses the recognized `lines`; the translation report
//! uses the annotator's `user_lines`.

use std::fs;
use std::path::Path;

use super::model::{AnnotationDocument, TextBox};
use crate::error::KomaError;

/// Which text a report is built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportKind {
    /// Recognized text (`RAW.txt`).
    Raw,
    /// User-authored text (`TL.txt`).
    Translation,
}

impl ReportKind {
    /// File name the report is conventionally written under.
    pub fn default_file_name(&self) -> &'static str {
        match self {
            ReportKind::Raw => "RAW.txt",
            ReportKind::Translation => "TL.txt",
        }
    }

    fn lines_of<'a>(&self, text_box: &'a TextBox) -> &'a [String] {
        match self {
            ReportKind::Raw => &text_box.lines,
            ReportKind::Translation => &text_box.user_lines,
        }
    }
}

/// Renders the report for `image_ids`, in that order.
pub fn to_report_string<'a, I>(document: &AnnotationDocument, image_ids: I, kind: ReportKind) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = String::new();
    for (index, image_id) in image_ids.into_iter().enumerate() {
        out.push_str(&format!("Page {}\n", index + 1));
        for text_box in document.boxes(image_id) {
            for line in kind.lines_of(text_box) {
                out.push_str(line);
                out.push('\n');
            }
        }
        out.push('\n');
    }
    out
}

/// Writes the report to `path`, overwriting any previous report.
pub fn write_report<'a, I>(
    path: &Path,
    document: &AnnotationDocument,
    image_ids: I,
    kind: ReportKind,
) -> Result<(), KomaError>
where
    I: IntoIterator<Item = &'a str>,
{
    fs::write(path, to_report_string(document, image_ids, kind)).map_err(KomaError::Io)
}
