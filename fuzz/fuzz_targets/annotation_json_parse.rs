//! Feeds arbitrary bytes to the annotation document parser and, when they
//! parse, through validation and the YOLO writer.

#![no_main]

use libfuzzer_sys::fuzz_target;
use koma::ir::io_json::from_json_slice;
use koma::ir::io_yolo::{to_label_string, ClassIdMode};
use koma::ir::ImageDims;
use koma::validation::validate_document;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(document) = from_json_slice(data) else {
        return;
    };

    let dims = ImageDims::new(1024, 1536);
    let _ = validate_document(&document, |_| Some(dims));
    for (_, boxes) in document.iter() {
        let _ = to_label_string(boxes, dims, ClassIdMode::ReadingIndex);
    }
});
