//! Feeds arbitrary UTF-8 lines to the detection-format label line parser.

#![no_main]

use libfuzzer_sys::fuzz_target;
use koma::ir::io_yolo::fuzz_parse_label_line;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }

    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };

    let _ = fuzz_parse_label_line(line);
});
