//! Fuzz target for YOLO single-line label parsing.
//!
//! Feeds arbitrary UTF-8 lines to the label line parser, checking for panics
//! and that the self-IoU of any accepted box stays within [0, 1].

#![no_main]

use labeldup::label::io_yolo::fuzz_parse_label_line;
use labeldup::label::iou;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }

    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };

    if let Some(bbox) = fuzz_parse_label_line(line) {
        let value = iou(&bbox, &bbox);
        assert!(value.is_nan() || (0.0..=1.0).contains(&value));
    }
});
