//! Text recognition for cropped regions.

use std::path::PathBuf;
use std::process::Command;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ImageRef;
use crate::error::KomaError;
use crate::ir::{BBoxXYXY, Pixel};

/// Recognizes the text lines inside one region of an image.
///
/// Implementations may return no lines. The region is in pixel space and is
/// assumed to lie within the image.
pub trait OcrEngine {
    fn recognize(
        &mut self,
        image: &ImageRef<'_>,
        region: &BBoxXYXY<Pixel>,
    ) -> Result<Vec<String>, KomaError>;
}

impl<E: OcrEngine + ?Sized> OcrEngine for Box<E> {
    fn recognize(
        &mut self,
        image: &ImageRef<'_>,
        region: &BBoxXYXY<Pixel>,
    ) -> Result<Vec<String>, KomaError> {
        (**self).recognize(image, region)
    }
}

/// Language family of the recognized text. Decides post-processing.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OcrLanguage {
    #[default]
    Chinese,
    Japanese,
}

impl OcrLanguage {
    /// Cleans one raw recognizer line.
    pub fn post_process(&self, text: &str) -> String {
        match self {
            OcrLanguage::Chinese => text
                .replace(['[', ']', '\''], "")
                .replace(":.", "..."),
            OcrLanguage::Japanese => {
                let compact: String = text.split_whitespace().collect();
                let dotted = collapse_dot_runs(&compact.replace('…', "..."));
                dotted.chars().map(to_full_width).collect()
            }
        }
    }

    /// Post-processes raw recognizer output into stored lines.
    ///
    /// Japanese recognizers emit one string per bubble, so the raw lines are
    /// joined before cleaning. Lines left empty are dropped.
    pub fn finish(&self, raw: Vec<String>) -> Vec<String> {
        let cleaned: Vec<String> = match self {
            OcrLanguage::Chinese => raw.iter().map(|line| self.post_process(line)).collect(),
            OcrLanguage::Japanese => vec![self.post_process(&raw.concat())],
        };
        cleaned.into_iter().filter(|line| !line.is_empty()).collect()
    }
}

// Runs of two or more `・` or `.` become the same number of `.`.
fn collapse_dot_runs(text: &str) -> String {
    fn flush(run: &mut String, out: &mut String) {
        let count = run.chars().count();
        if count >= 2 {
            out.extend(std::iter::repeat('.').take(count));
        } else {
            out.push_str(run);
        }
        run.clear();
    }

    let mut out = String::with_capacity(text.len());
    let mut run = String::new();
    for ch in text.chars() {
        if ch == '・' || ch == '.' {
            run.push(ch);
        } else {
            flush(&mut run, &mut out);
            out.push(ch);
        }
    }
    flush(&mut run, &mut out);
    out
}

fn to_full_width(ch: char) -> char {
    match ch {
        '!'..='~' => char::from_u32(ch as u32 + 0xFEE0).unwrap_or(ch),
        _ => ch,
    }
}

/// Recognizes nothing. Boxes keep empty `lines` for the annotator to fill in.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullOcr;

impl OcrEngine for NullOcr {
    fn recognize(
        &mut self,
        _image: &ImageRef<'_>,
        _region: &BBoxXYXY<Pixel>,
    ) -> Result<Vec<String>, KomaError> {
        Ok(Vec::new())
    }
}

/// Runs an external recognizer once per region.
///
/// The program is invoked as `program [args..] <image> <x> <y> <w> <h>` with
/// integer pixel values; each non-empty stdout line is one raw text line.
#[derive(Clone, Debug)]
pub struct CommandOcr {
    program: PathBuf,
    args: Vec<String>,
    language: OcrLanguage,
}

impl CommandOcr {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, language: OcrLanguage) -> Self {
        Self {
            program: program.into(),
            args,
            language,
        }
    }
}

impl OcrEngine for CommandOcr {
    fn recognize(
        &mut self,
        image: &ImageRef<'_>,
        region: &BBoxXYXY<Pixel>,
    ) -> Result<Vec<String>, KomaError> {
        let (x, y, w, h) = region.to_xywh();
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(image.path)
            .args([x, y, w, h].map(|value| (value.round() as i64).to_string()))
            .output()
            .map_err(|err| KomaError::OcrFailed {
                path: image.path.to_path_buf(),
                message: format!("failed to run {}: {err}", self.program.display()),
            })?;

        if !output.status.success() {
            return Err(KomaError::OcrFailed {
                path: image.path.to_path_buf(),
                message: format!(
                    "{} exited with {}: {}",
                    self.program.display(),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let raw: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        debug!(image = image.id, lines = raw.len(), "ocr command finished");
        Ok(self.language.finish(raw))
    }
}
