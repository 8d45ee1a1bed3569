//! Detection-format label files.
//!
//! One text file per image, one `class_id x_center y_center width height`
//! row per region, all coordinates normalized to `[0, 1]`. These files are how
//! annotations round-trip with detection-model tooling: detector output comes
//! in this way (bubbles and panels), and reading orders go back out this way
//! with the reading index as the class id.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::model::{AnnotationDocument, ImageDims, TextBox};
use super::{BBoxXYXY, Normalized, Pixel};
use crate::error::KomaError;

pub const LABEL_EXTENSION: &str = "txt";

/// How exported rows get their class id.
///
/// Written in config files as `reading-index` or as a plain integer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClassIdMode {
    /// The box's position in reading order (0-based).
    #[default]
    ReadingIndex,
    /// Every row gets the same class.
    Fixed(usize),
}

const READING_INDEX_TAG: &str = "reading-index";

impl Serialize for ClassIdMode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ClassIdMode::ReadingIndex => serializer.serialize_str(READING_INDEX_TAG),
            ClassIdMode::Fixed(class_id) => serializer.serialize_u64(*class_id as u64),
        }
    }
}

impl<'de> Deserialize<'de> for ClassIdMode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Fixed(usize),
            Tag(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Fixed(class_id) => Ok(ClassIdMode::Fixed(class_id)),
            Raw::Tag(tag) if tag == READING_INDEX_TAG => Ok(ClassIdMode::ReadingIndex),
            Raw::Tag(tag) => Err(serde::de::Error::custom(format!(
                "invalid class id mode '{tag}'; expected '{READING_INDEX_TAG}' or an integer"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LabelRow {
    pub class_id: usize,
    pub cx: f64,
    pub cy: f64,
    pub w: f64,
    pub h: f64,
}

impl LabelRow {
    pub fn bbox(&self) -> BBoxXYXY<Normalized> {
        BBoxXYXY::from_cxcywh(self.cx, self.cy, self.w, self.h)
    }
}

/// Path of the label file that belongs to `image_id` inside `labels_dir`.
pub fn label_path_for(labels_dir: &Path, image_id: &str) -> PathBuf {
    labels_dir.join(Path::new(image_id).with_extension(LABEL_EXTENSION))
}

/// Reads every row of a label file. Blank lines are skipped.
pub fn read_label_file(path: &Path) -> Result<Vec<LabelRow>, KomaError> {
    let content = fs::read_to_string(path).map_err(KomaError::Io)?;
    let mut rows = Vec::new();
    for (line_idx, line) in content.lines().enumerate() {
        if let Some(row) = parse_label_line(line, path, line_idx + 1)? {
            rows.push(row);
        }
    }
    Ok(rows)
}

/// Reads panel rectangles, kept in normalized space. A missing file means the
/// page has no detected panels.
pub fn read_panel_rects(path: &Path) -> Result<Vec<BBoxXYXY<Normalized>>, KomaError> {
    if !path.is_file() {
        return Ok(Vec::new());
    }
    Ok(read_label_file(path)?.iter().map(LabelRow::bbox).collect())
}

/// Reads bubble rectangles and scales them to whole pixels for `dims`.
///
/// Corners and sizes are truncated toward zero, matching how annotators
/// store integer pixel boxes. A missing file means nothing was detected.
pub fn read_bubble_rects(path: &Path, dims: ImageDims) -> Result<Vec<BBoxXYXY<Pixel>>, KomaError> {
    if !path.is_file() {
        return Ok(Vec::new());
    }

    let (width, height) = (dims.width_f64(), dims.height_f64());
    let rects = read_label_file(path)?
        .iter()
        .map(|row| {
            BBoxXYXY::from_xywh(
                ((row.cx - row.w / 2.0) * width).trunc(),
                ((row.cy - row.h / 2.0) * height).trunc(),
                (row.w * width).trunc(),
                (row.h * height).trunc(),
            )
        })
        .collect();
    Ok(rects)
}

/// Renders the label rows for `boxes` in their current order.
pub fn to_label_string(boxes: &[TextBox], dims: ImageDims, mode: ClassIdMode) -> String {
    boxes
        .iter()
        .enumerate()
        .map(|(index, text_box)| {
            let class_id = match mode {
                ClassIdMode::ReadingIndex => index,
                ClassIdMode::Fixed(class_id) => class_id,
            };
            let (cx, cy, w, h) = text_box
                .coords
                .to_normalized(dims.width_f64(), dims.height_f64())
                .to_cxcywh();
            format!("{} {:.6} {:.6} {:.6} {:.6}", class_id, cx, cy, w, h)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Writes one label file per image that has boxes into `output_dir`.
///
/// `dims_for` resolves an image identifier to its pixel size. Returns the
/// number of label files written.
pub fn export_yolo_dir<F>(
    output_dir: &Path,
    document: &AnnotationDocument,
    mode: ClassIdMode,
    mut dims_for: F,
) -> Result<usize, KomaError>
where
    F: FnMut(&str) -> Result<ImageDims, KomaError>,
{
    fs::create_dir_all(output_dir).map_err(KomaError::Io)?;

    let mut written = 0;
    for (image_id, boxes) in document.iter() {
        if boxes.is_empty() {
            continue;
        }
        let dims = dims_for(image_id)?;
        let stem = Path::new(image_id)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| image_id.to_string());
        let label_path = output_dir.join(format!("{stem}.{LABEL_EXTENSION}"));

        fs::write(&label_path, to_label_string(boxes, dims, mode)).map_err(KomaError::Io)?;
        written += 1;
    }

    Ok(written)
}

fn parse_label_line(
    line: &str,
    file_path: &Path,
    line_num: usize,
) -> Result<Option<LabelRow>, KomaError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    // At most 6 tokens, so pathological lines do not allocate unbounded memory.
    let tokens: Vec<&str> = trimmed.split_whitespace().take(6).collect();

    if tokens.len() != 5 {
        return Err(KomaError::LabelParse {
            path: file_path.to_path_buf(),
            line: line_num,
            message: if tokens.len() < 5 {
                format!("expected 5 tokens, found {}", tokens.len())
            } else {
                "expected 5 tokens; segmentation/pose rows are not supported".to_string()
            },
        });
    }

    let class_id = tokens[0]
        .parse::<usize>()
        .map_err(|_| KomaError::LabelParse {
            path: file_path.to_path_buf(),
            line: line_num,
            message: format!(
                "invalid class_id '{}'; expected non-negative integer",
                tokens[0]
            ),
        })?;

    Ok(Some(LabelRow {
        class_id,
        cx: parse_f64_token(tokens[1], "x_center", file_path, line_num)?,
        cy: parse_f64_token(tokens[2], "y_center", file_path, line_num)?,
        w: parse_f64_token(tokens[3], "width", file_path, line_num)?,
        h: parse_f64_token(tokens[4], "height", file_path, line_num)?,
    }))
}

/// Fuzz-only entrypoint for single-line label parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_label_line(input: &str) -> Result<(), KomaError> {
    let _ = parse_label_line(input, Path::new("<fuzz>"), 1)?;
    Ok(())
}

fn parse_f64_token(
    raw: &str,
    field_name: &str,
    file_path: &Path,
    line_num: usize,
) -> Result<f64, KomaError> {
    raw.parse::<f64>().map_err(|_| KomaError::LabelParse {
        path: file_path.to_path_buf(),
        line: line_num,
        message: format!("invalid {field_name} '{raw}'; expected floating-point number"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::BBoxXYWH;

    #[test]
    fn parse_label_line_accepts_valid_rows() {
        let parsed = parse_label_line("2 0.5 0.25 0.3 0.1", Path::new("a.txt"), 1)
            .expect("parse should succeed")
            .expect("line should produce a row");

        assert_eq!(
            parsed,
            LabelRow {
                class_id: 2,
                cx: 0.5,
                cy: 0.25,
                w: 0.3,
                h: 0.1,
            }
        );
    }

    #[test]
    fn parse_label_line_skips_blank_rows() {
        let parsed = parse_label_line("   ", Path::new("a.txt"), 2).expect("parse should succeed");
        assert!(parsed.is_none());
    }

    #[test]
    fn parse_label_line_rejects_wrong_arity() {
        let short = parse_label_line("0 0.1 0.2", Path::new("a.txt"), 3).unwrap_err();
        assert!(matches!(short, KomaError::LabelParse { line: 3, .. }));

        let long = parse_label_line("0 0.1 0.2 0.3 0.4 0.5", Path::new("a.txt"), 4).unwrap_err();
        assert!(matches!(long, KomaError::LabelParse { line: 4, .. }));
    }

    #[test]
    fn parse_label_line_rejects_bad_numbers() {
        let err = parse_label_line("x 0.1 0.2 0.3 0.4", Path::new("a.txt"), 1).unwrap_err();
        assert!(err.to_string().contains("class_id"));

        let err = parse_label_line("0 0.1 abc 0.3 0.4", Path::new("a.txt"), 1).unwrap_err();
        assert!(err.to_string().contains("y_center"));
    }

    #[test]
    fn bubble_rects_are_truncated_to_whole_pixels() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("page.txt");
        fs::write(&path, "0 0.5 0.5 0.25 0.1\n\n0 0.1 0.1 0.05 0.05\n").expect("write labels");

        let rects = read_bubble_rects(&path, ImageDims::new(1001, 801)).expect("read");
        assert_eq!(rects.len(), 2);
        let (x, y, w, h) = rects[0].to_xywh();
        assert_eq!((x, y, w, h), (375.0, 360.0, 250.0, 80.0));
    }

    #[test]
    fn missing_label_files_mean_no_detections() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let missing = temp.path().join("missing.txt");
        assert!(read_panel_rects(&missing).expect("panels").is_empty());
        assert!(read_bubble_rects(&missing, ImageDims::new(10, 10))
            .expect("bubbles")
            .is_empty());
    }

    #[test]
    fn label_string_uses_reading_index_by_default() {
        let boxes = vec![
            TextBox::new(7u64, BBoxXYWH::from_xywh(0.0, 0.0, 50.0, 50.0), vec![]),
            TextBox::new(2u64, BBoxXYWH::from_xywh(50.0, 50.0, 50.0, 50.0), vec![]),
        ];
        let dims = ImageDims::new(100, 100);

        let out = to_label_string(&boxes, dims, ClassIdMode::default());
        assert_eq!(
            out,
            "0 0.250000 0.250000 0.500000 0.500000\n1 0.750000 0.750000 0.500000 0.500000"
        );

        let fixed = to_label_string(&boxes, dims, ClassIdMode::Fixed(3));
        assert!(fixed.lines().all(|line| line.starts_with("3 ")));
    }

    #[test]
    fn export_skips_images_without_boxes() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let mut document = AnnotationDocument::new();
        document.set_boxes(
            "001.png",
            vec![TextBox::new(
                1u64,
                BBoxXYWH::from_xywh(10.0, 10.0, 20.0, 20.0),
                vec![],
            )],
        );
        document.set_boxes("002.png", vec![]);

        let written = export_yolo_dir(temp.path(), &document, ClassIdMode::default(), |_| {
            Ok(ImageDims::new(100, 100))
        })
        .expect("export");

        assert_eq!(written, 1);
        assert!(temp.path().join("001.txt").is_file());
        assert!(!temp.path().join("002.txt").exists());
    }

    #[test]
    fn class_id_mode_deserializes_from_tag_or_integer() {
        let tagged: ClassIdMode = serde_yaml::from_str("reading-index").expect("tag");
        assert_eq!(tagged, ClassIdMode::ReadingIndex);

        let fixed: ClassIdMode = serde_yaml::from_str("0").expect("integer");
        assert_eq!(fixed, ClassIdMode::Fixed(0));

        assert!(serde_yaml::from_str::<ClassIdMode>("sideways").is_err());
    }
}
