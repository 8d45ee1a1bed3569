//! Workspace and open-image context.
//!
//! A [`Workspace`] is an image directory plus its annotation document. Opening
//! an image yields an [`ImageSession`], the explicit "current image" value
//! every editing operation takes. Edits live in the session's store until
//! [`Workspace::flush`] merges them into the document on disk.

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::arrange::ArrangeOverride;
use crate::config::Config;
use crate::engines::ImageRef;
use crate::error::KomaError;
use crate::ir::{io_json, AnnotationDocument, ImageDims};
use crate::store::BoxStore;

/// Image extensions a workspace picks up, compared case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// An image directory and its annotation document.
#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
    config: Config,
    document_path: PathBuf,
    image_ids: Vec<String>,
    document: AnnotationDocument,
}

/// State for the one image currently being edited.
#[derive(Debug)]
pub struct ImageSession {
    index: usize,
    image_id: String,
    path: PathBuf,
    dims: ImageDims,
    pub store: BoxStore,
    pub arrange: ArrangeOverride,
}

impl ImageSession {
    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    /// Position of the image in the workspace listing.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dims(&self) -> ImageDims {
        self.dims
    }

    pub fn image_ref(&self) -> ImageRef<'_> {
        ImageRef {
            id: &self.image_id,
            path: &self.path,
            dims: self.dims,
        }
    }
}

impl Workspace {
    /// Lists the images in `dir` and loads the annotation document.
    ///
    /// Only files directly inside `dir` are considered; they are sorted by
    /// file name, which doubles as the image identifier.
    pub fn open(dir: impl Into<PathBuf>, config: Config) -> Result<Self, KomaError> {
        let dir = dir.into();
        let image_ids = list_images(&dir)?;
        let document_path = dir.join(&config.document);
        let document = io_json::load(&document_path)?;

        info!(
            dir = %dir.display(),
            images = image_ids.len(),
            annotated = document.len(),
            "opened workspace"
        );

        Ok(Self {
            dir,
            config,
            document_path,
            image_ids,
            document,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn document_path(&self) -> &Path {
        &self.document_path
    }

    /// Image identifiers in workspace order.
    pub fn image_ids(&self) -> &[String] {
        &self.image_ids
    }

    /// The document as of the last load or flush.
    pub fn document(&self) -> &AnnotationDocument {
        &self.document
    }

    pub fn image_path(&self, image_id: &str) -> PathBuf {
        self.dir.join(image_id)
    }

    /// Reads the pixel size of `image_id` from its file header.
    pub fn dims_for(&self, image_id: &str) -> Result<ImageDims, KomaError> {
        read_image_dims(&self.image_path(image_id))
    }

    /// Opens `image_id` with its saved boxes, or none if it was never saved.
    pub fn open_image(&self, image_id: &str) -> Result<ImageSession, KomaError> {
        let index = self
            .image_ids
            .iter()
            .position(|id| id == image_id)
            .ok_or_else(|| KomaError::ImageNotFound(image_id.to_string()))?;
        self.open_index(index)
    }

    /// Opens the image at `index` in workspace order.
    pub fn open_index(&self, index: usize) -> Result<ImageSession, KomaError> {
        if self.image_ids.is_empty() {
            return Err(KomaError::NoImageOpen);
        }
        let image_id = self
            .image_ids
            .get(index)
            .ok_or_else(|| KomaError::ImageNotFound(format!("#{index}")))?
            .clone();

        let path = self.image_path(&image_id);
        let dims = read_image_dims(&path)?;
        let store = BoxStore::from_boxes(image_id.clone(), self.document.boxes(&image_id).to_vec())?;
        debug!(image = %image_id, boxes = store.len(), next_id = %store.next_id(), "opened image");

        Ok(ImageSession {
            index,
            image_id,
            path,
            dims,
            store,
            arrange: ArrangeOverride::new(),
        })
    }

    /// Saves the session's boxes into the document on disk, keeping every
    /// other image's entry as it is on disk now.
    pub fn flush(&mut self, session: &ImageSession) -> Result<(), KomaError> {
        self.document = io_json::save(
            &self.document_path,
            session.image_id(),
            session.store.snapshot(),
        )?;
        Ok(())
    }

    /// Flushes `session` and opens the following image.
    ///
    /// At the last image nothing is flushed and `None` is returned.
    pub fn next(&mut self, session: &ImageSession) -> Result<Option<ImageSession>, KomaError> {
        if session.index + 1 >= self.image_ids.len() {
            return Ok(None);
        }
        self.flush(session)?;
        self.open_index(session.index + 1).map(Some)
    }

    /// Flushes `session` and opens the preceding image.
    ///
    /// At the first image nothing is flushed and `None` is returned.
    pub fn prev(&mut self, session: &ImageSession) -> Result<Option<ImageSession>, KomaError> {
        if session.index == 0 {
            return Ok(None);
        }
        self.flush(session)?;
        self.open_index(session.index - 1).map(Some)
    }
}

fn list_images(dir: &Path) -> Result<Vec<String>, KomaError> {
    let mut image_ids = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
        let entry = entry.map_err(|err| KomaError::Io(err.into()))?;
        if entry.file_type().is_file() && has_image_extension(entry.path()) {
            image_ids.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    image_ids.sort();
    Ok(image_ids)
}

fn has_image_extension(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };
    IMAGE_EXTENSIONS
        .iter()
        .any(|allowed| ext.eq_ignore_ascii_case(allowed))
}

fn read_image_dims(path: &Path) -> Result<ImageDims, KomaError> {
    let size = imagesize::size(path).map_err(|source| KomaError::ImageDimensionRead {
        path: path.to_path_buf(),
        source,
    })?;

    let width: u32 = size.width.try_into().map_err(|_| {
        KomaError::UnsupportedFormat(format!(
            "image width {} of {} does not fit in u32",
            size.width,
            path.display()
        ))
    })?;
    let height: u32 = size.height.try_into().map_err(|_| {
        KomaError::UnsupportedFormat(format!(
            "image height {} of {} does not fit in u32",
            size.height,
            path.display()
        ))
    })?;

    Ok(ImageDims::new(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BBoxXYWH, BoxId, TextBox};
    use std::fs;

    // 24-bit BMP header only; enough for the dimension reader.
    fn write_bmp(path: &Path, width: u32, height: u32) {
        let mut bytes = Vec::with_capacity(54);
        bytes.extend_from_slice(b"BM");
        bytes.extend_from_slice(&54u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&54u32.to_le_bytes());
        bytes.extend_from_slice(&40u32.to_le_bytes());
        bytes.extend_from_slice(&(width as i32).to_le_bytes());
        bytes.extend_from_slice(&(height as i32).to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&24u16.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 24]);
        fs::write(path, bytes).expect("write bmp");
    }

    fn workspace_with(names: &[&str]) -> tempfile::TempDir {
        let temp = tempfile::tempdir().expect("temp dir");
        for name in names {
            write_bmp(&temp.path().join(name), 64, 32);
        }
        temp
    }

    #[test]
    fn lists_only_images_sorted_by_name() {
        let temp = workspace_with(&["b.bmp", "A.BMP", "c.bmp"]);
        fs::write(temp.path().join("notes.txt"), "x").expect("write");
        fs::create_dir(temp.path().join("nested.png")).expect("mkdir");

        let workspace = Workspace::open(temp.path(), Config::default()).expect("open");
        assert_eq!(workspace.image_ids(), ["A.BMP", "b.bmp", "c.bmp"]);
        assert!(workspace.document().is_empty());
    }

    #[test]
    fn open_image_restores_saved_boxes_and_next_id() {
        let temp = workspace_with(&["p1.bmp"]);
        let mut document = AnnotationDocument::new();
        document.set_boxes(
            "p1.bmp",
            vec![
                TextBox::new(3u64, BBoxXYWH::from_xywh(0.0, 0.0, 5.0, 5.0), vec![]),
                TextBox::new(7u64, BBoxXYWH::from_xywh(9.0, 0.0, 5.0, 5.0), vec![]),
            ],
        );
        io_json::write_document(&temp.path().join("annotations.json"), &document).expect("write");

        let workspace = Workspace::open(temp.path(), Config::default()).expect("open");
        let session = workspace.open_image("p1.bmp").expect("open image");
        assert_eq!(session.dims(), ImageDims::new(64, 32));
        assert_eq!(session.store.ids(), vec![BoxId(3), BoxId(7)]);
        assert_eq!(session.store.next_id(), BoxId(8));
    }

    #[test]
    fn unknown_image_is_rejected() {
        let temp = workspace_with(&["p1.bmp"]);
        let workspace = Workspace::open(temp.path(), Config::default()).expect("open");
        assert!(matches!(
            workspace.open_image("p9.bmp"),
            Err(KomaError::ImageNotFound(_))
        ));
    }

    #[test]
    fn empty_workspace_has_nothing_to_open() {
        let temp = workspace_with(&[]);
        let workspace = Workspace::open(temp.path(), Config::default()).expect("open");
        assert!(matches!(workspace.open_index(0), Err(KomaError::NoImageOpen)));
    }

    #[test]
    fn next_flushes_and_stops_at_the_end() {
        let temp = workspace_with(&["p1.bmp", "p2.bmp"]);
        let mut workspace = Workspace::open(temp.path(), Config::default()).expect("open");

        let mut first = workspace.open_index(0).expect("open");
        first
            .store
            .create(BBoxXYWH::from_xywh(1.0, 1.0, 10.0, 10.0), vec!["a".into()])
            .expect("create");

        let second = workspace.next(&first).expect("next").expect("has next");
        assert_eq!(second.image_id(), "p2.bmp");
        assert_eq!(workspace.document().boxes("p1.bmp").len(), 1);
        assert!(workspace.next(&second).expect("next").is_none());

        let back = workspace.prev(&second).expect("prev").expect("has prev");
        assert_eq!(back.store.len(), 1);
        assert!(workspace.document().contains("p2.bmp"));
    }
}
