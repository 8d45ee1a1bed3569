//! External collaborators: detection, text recognition and sequencing.
//!
//! The ordering core only sees these traits. Concrete engines are chosen once
//! from [`Config`](crate::config::Config) by the `build_*` functions below and
//! passed down as trait objects.

mod detector;
mod ocr;
mod sequencer;

pub use detector::{LabelFileDetector, LabelFilePanels, NoPanels};
pub use ocr::{CommandOcr, NullOcr, OcrEngine, OcrLanguage};
pub use sequencer::{ReadingDirection, RowMajorSequencer, Sequencer};

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::{OcrConfig, SequencerConfig};
use crate::error::KomaError;
use crate::ir::{BBoxXYXY, ImageDims, Normalized, Pixel};

/// The image an engine is asked about.
#[derive(Clone, Copy, Debug)]
pub struct ImageRef<'a> {
    /// Identifier used as the document key.
    pub id: &'a str,
    pub path: &'a Path,
    pub dims: ImageDims,
}

/// Proposes bubble rectangles for one image, as pixel `(x1, y1, x2, y2)`.
pub trait Detector {
    fn predict(&mut self, image: &ImageRef<'_>) -> Result<Vec<BBoxXYXY<Pixel>>, KomaError>;
}

/// Proposes panel rectangles for one image, normalized to the image size.
pub trait PanelDetector {
    fn predict_panels(
        &mut self,
        image: &ImageRef<'_>,
    ) -> Result<Vec<BBoxXYXY<Normalized>>, KomaError>;
}

/// OCR engine families selectable from configuration.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OcrEngineKind {
    /// No recognizer; boxes start without text.
    #[default]
    None,
    /// An external program, see [`CommandOcr`].
    Command,
}

/// Builds the OCR engine described by `config`.
///
/// # Errors
/// Returns [`KomaError::UnsupportedFormat`] when the `command` engine is
/// selected without a program.
pub fn build_ocr_engine(config: &OcrConfig) -> Result<Box<dyn OcrEngine>, KomaError> {
    match config.engine {
        OcrEngineKind::None => Ok(Box::new(NullOcr)),
        OcrEngineKind::Command => {
            let (program, args) = config.command.split_first().ok_or_else(|| {
                KomaError::UnsupportedFormat(
                    "ocr engine 'command' needs ocr.command to name a program".to_string(),
                )
            })?;
            Ok(Box::new(CommandOcr::new(
                program,
                args.to_vec(),
                config.language,
            )))
        }
    }
}

/// Builds the reading-order model described by `config`.
pub fn build_sequencer(config: &SequencerConfig) -> Box<dyn Sequencer> {
    Box::new(RowMajorSequencer::new(config.direction).with_row_tolerance(config.row_tolerance))
}
