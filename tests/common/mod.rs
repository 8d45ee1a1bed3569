#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use koma::ir::{io_json, AnnotationDocument, BBoxXYWH, TextBox};

/// A BMP file header with no pixel data. Enough for reading image dimensions.
pub fn bmp_header(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(54);
    bytes.extend_from_slice(b"BM");
    bytes.extend_from_slice(&54u32.to_le_bytes());
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes.extend_from_slice(&54u32.to_le_bytes());

    bytes.extend_from_slice(&40u32.to_le_bytes());
    bytes.extend_from_slice(&(width as i32).to_le_bytes());
    bytes.extend_from_slice(&(height as i32).to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&24u16.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes
}

pub fn write_bmp(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, bmp_header(width, height)).expect("write bmp file");
}

/// A temporary workspace with one `width x height` page per name.
pub fn workspace_with_pages(names: &[&str], width: u32, height: u32) -> tempfile::TempDir {
    let temp = tempfile::tempdir().expect("create temp dir");
    for name in names {
        write_bmp(&temp.path().join(name), width, height);
    }
    temp
}

/// Writes `<dir>/<stem>.txt` with the given label rows.
pub fn write_labels(dir: &Path, stem: &str, rows: &[&str]) -> PathBuf {
    fs::create_dir_all(dir).expect("create labels dir");
    let path = dir.join(format!("{stem}.txt"));
    fs::write(&path, rows.join("\n")).expect("write label file");
    path
}

pub fn text_box(id: u64, xywh: (f64, f64, f64, f64), lines: &[&str]) -> TextBox {
    TextBox::new(
        id,
        BBoxXYWH::from_xywh(xywh.0, xywh.1, xywh.2, xywh.3),
        lines.iter().map(|line| line.to_string()).collect(),
    )
}

pub fn write_document(dir: &Path, document: &AnnotationDocument) -> PathBuf {
    let path = dir.join("annotations.json");
    io_json::write_document(&path, document).expect("write document");
    path
}

pub fn read_document(dir: &Path) -> AnnotationDocument {
    io_json::load(&dir.join("annotations.json")).expect("load document")
}
