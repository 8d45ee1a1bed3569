//! Reading and writing the annotation document.
//!
//! The document is one JSON object keyed by image identifier; each value is
//! the image's boxes in reading order:
//!
//! ```json
//! { "page01.png": [ { "id": 1, "coords": [x, y, w, h], "lines": [], "user_lines": [] } ] }
//! ```
//!
//! Saving is read-merge-write: the on-disk document is re-read, only the saved
//! image's entry is replaced, and the whole file is rewritten through a
//! temporary file in the same directory followed by a rename. There is no
//! inter-process lock, so two processes saving at the same moment can still
//! lose one of the updates.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use super::model::{AnnotationDocument, TextBox};
use crate::error::KomaError;

/// Loads the annotation document at `path`.
///
/// A missing file is an empty document, not an error.
pub fn load(path: &Path) -> Result<AnnotationDocument, KomaError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no annotation document yet");
            return Ok(AnnotationDocument::new());
        }
        Err(err) => return Err(KomaError::Io(err)),
    };
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).map_err(|source| KomaError::AnnotationParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Saves `boxes` as the entry for `image_id`, preserving every other entry
/// currently on disk. Returns the merged document that was written.
pub fn save(
    path: &Path,
    image_id: &str,
    boxes: &[TextBox],
) -> Result<AnnotationDocument, KomaError> {
    let mut document = load(path)?;
    document.set_boxes(image_id, boxes.to_vec());
    write_document(path, &document)?;
    debug!(
        path = %path.display(),
        image = image_id,
        boxes = boxes.len(),
        images = document.len(),
        "saved annotations"
    );
    Ok(document)
}

/// Rewrites the whole document atomically.
pub fn write_document(path: &Path, document: &AnnotationDocument) -> Result<(), KomaError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir).map_err(KomaError::Io)?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, document).map_err(|source| {
            KomaError::AnnotationWrite {
                path: path.to_path_buf(),
                source,
            }
        })?;
        writer.write_all(b"\n").map_err(KomaError::Io)?;
        writer.flush().map_err(KomaError::Io)?;
    }

    temp.persist(path)
        .map_err(|err| KomaError::AnnotationPersist {
            path: path.to_path_buf(),
            source: err.error,
        })?;
    Ok(())
}

/// Parses a document from bytes.
pub fn from_json_slice(bytes: &[u8]) -> Result<AnnotationDocument, serde_json::Error> {
    serde_json::from_slice(bytes)
}

/// Parses a document from a string. Useful for testing without file I/O.
pub fn from_json_str(json: &str) -> Result<AnnotationDocument, serde_json::Error> {
    serde_json::from_str(json)
}

/// Renders a document as pretty JSON. Useful for testing without file I/O.
pub fn to_json_string(document: &AnnotationDocument) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(document)
}
