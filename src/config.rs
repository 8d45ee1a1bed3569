//! Workspace configuration loaded from `koma.yaml`.
//!
//! Every field has a default, so the file is optional and may be partial.
//! Command-line flags are applied on top by the CLI.
//!
//! ```yaml
//! document: annotations.json
//! ocr:
//!   engine: command
//!   language: japanese
//!   command: [manga-ocr-cli, --quiet]
//! sequencer:
//!   direction: rtl
//!   row_tolerance: 0.5
//! yolo:
//!   class_id: reading-index
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engines::{OcrEngineKind, OcrLanguage, ReadingDirection};
use crate::error::KomaError;
use crate::ir::io_yolo::ClassIdMode;

pub const CONFIG_FILE_NAME: &str = "koma.yaml";
pub const DEFAULT_DOCUMENT_NAME: &str = "annotations.json";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Annotation document, relative to the workspace directory.
    pub document: PathBuf,
    pub ocr: OcrConfig,
    pub sequencer: SequencerConfig,
    pub yolo: YoloConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            document: PathBuf::from(DEFAULT_DOCUMENT_NAME),
            ocr: OcrConfig::default(),
            sequencer: SequencerConfig::default(),
            yolo: YoloConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OcrConfig {
    pub engine: OcrEngineKind,
    pub language: OcrLanguage,
    /// Program and leading arguments for the `command` engine.
    pub command: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SequencerConfig {
    pub direction: ReadingDirection,
    /// Row grouping threshold as a fraction of the mean item height.
    pub row_tolerance: f64,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            direction: ReadingDirection::default(),
            row_tolerance: 0.5,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct YoloConfig {
    pub class_id: ClassIdMode,
}

impl Config {
    /// Loads `koma.yaml` from `dir`, or the defaults when there is none.
    pub fn load(dir: &Path) -> Result<Self, KomaError> {
        let path = dir.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).map_err(KomaError::Io)?;
        let config = Self::from_yaml_str(&content).map_err(|source| KomaError::ConfigParse {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
        // An empty file deserializes as YAML null rather than an empty map.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }
}
