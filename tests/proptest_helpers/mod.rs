#![allow(dead_code)]

use koma::ir::{BBoxXYWH, BBoxXYXY, BoxId, ImageDims, Normalized, TextBox};
use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

pub fn arb_dims() -> impl Strategy<Value = ImageDims> {
    (64u32..=2048, 64u32..=2048).prop_map(|(w, h)| ImageDims::new(w, h))
}

/// A normalized rectangle fully inside the unit square.
pub fn arb_panel_rect() -> impl Strategy<Value = BBoxXYXY<Normalized>> {
    (0.0f64..0.9, 0.0f64..0.9, 0.05f64..1.0, 0.05f64..1.0).prop_map(|(x, y, fw, fh)| {
        let w = fw * (1.0 - x);
        let h = fh * (1.0 - y);
        BBoxXYXY::from_xywh(x, y, w, h)
    })
}

/// Bubbles with unique ids 1..=n and whole-pixel geometry inside `dims`.
pub fn arb_bubbles(dims: ImageDims, max: usize) -> impl Strategy<Value = Vec<TextBox>> {
    let (w, h) = (dims.width, dims.height);
    prop::collection::vec(
        (0..w - 8, 0..h - 8, 4u32..64, 4u32..64),
        0..=max,
    )
    .prop_map(move |rects| {
        rects
            .into_iter()
            .enumerate()
            .map(|(index, (x, y, bw, bh))| {
                let bw = bw.min(w - x);
                let bh = bh.min(h - y);
                TextBox::new(
                    index as u64 + 1,
                    BBoxXYWH::from_xywh(x as f64, y as f64, bw as f64, bh as f64),
                    vec![],
                )
            })
            .collect()
    })
}

/// Any finite `(x, y, w, h)`, including subnormals, huge offsets and
/// non-positive sizes that a hand-edited document might hold.
pub fn arb_finite_xywh() -> impl Strategy<Value = (f64, f64, f64, f64)> {
    let finite = || {
        prop_oneof![
            any::<f64>().prop_filter("finite", |v| v.is_finite()),
            -1.0e6f64..1.0e6,
            (-1000i32..1000).prop_map(|n| f64::from(n) / 10.0),
        ]
    };
    (finite(), finite(), finite(), finite())
}

pub fn sorted_ids(boxes: &[TextBox]) -> Vec<BoxId> {
    let mut ids: Vec<BoxId> = boxes.iter().map(|b| b.id).collect();
    ids.sort();
    ids
}
