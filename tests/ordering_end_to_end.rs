//! Detection to saved reading order, through the library API.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use koma::config::Config;
use koma::engines::{
    LabelFileDetector, LabelFilePanels, NullOcr, ReadingDirection, RowMajorSequencer, Sequencer,
};
use koma::ir::{io_text, BBoxXYWH, BBoxXYXY, BoxId, ImageDims, TextBox};
use koma::layout::organize_bubbles;
use koma::pipeline::{self, AnnotateOptions, Engines};
use koma::session::Workspace;
use koma::store::StoreEvent;
use koma::KomaError;

use common::{read_document, workspace_with_pages, write_labels};

/// Returns canned permutations in call order and logs each request size.
struct Stub {
    answers: Vec<Vec<usize>>,
    calls: Rc<RefCell<Vec<usize>>>,
}

impl Sequencer for Stub {
    fn predict(&mut self, coords: &[[f64; 4]]) -> Result<Vec<usize>, KomaError> {
        self.calls.borrow_mut().push(coords.len());
        if self.answers.is_empty() {
            return Err(KomaError::SequencerContractViolation {
                expected: coords.len(),
                message: "no scripted answer".into(),
            });
        }
        Ok(self.answers.remove(0))
    }
}

fn ids(boxes: &[TextBox]) -> Vec<BoxId> {
    boxes.iter().map(|b| b.id).collect()
}

#[test]
fn l_layout_reads_top_left_top_right_bottom() {
    let dims = ImageDims::new(800, 1200);
    let panel_rects = [
        BBoxXYXY::from_xyxy(0.0, 0.0, 1.0, 0.5),
        BBoxXYXY::from_xyxy(0.0, 0.5, 1.0, 1.0),
    ];
    let top_right = TextBox::new(2u64, BBoxXYWH::from_xywh(500.0, 100.0, 150.0, 200.0), vec![]);
    let bottom = TextBox::new(3u64, BBoxXYWH::from_xywh(300.0, 800.0, 150.0, 200.0), vec![]);
    let top_left = TextBox::new(1u64, BBoxXYWH::from_xywh(100.0, 120.0, 150.0, 200.0), vec![]);

    let calls = Rc::new(RefCell::new(Vec::new()));
    // [1, 0] would be the panel answer; two panels never reach the model.
    let mut stub = Stub {
        answers: vec![vec![1, 0]],
        calls: Rc::clone(&calls),
    };

    let organized = organize_bubbles(
        &panel_rects,
        &[top_right, bottom, top_left],
        dims,
        &mut stub,
    );

    // Bubbles in the top panel arrive as [top_right, top_left]; [1, 0] flips them.
    assert_eq!(ids(&organized.boxes), vec![BoxId(1), BoxId(2), BoxId(3)]);
    assert_eq!(*calls.borrow(), vec![2]);
    assert!(!organized.degraded);
}

#[test]
fn model_failure_keeps_detection_order() {
    let dims = ImageDims::new(1000, 1000);
    let bubbles: Vec<TextBox> = [(700.0, 50.0), (100.0, 60.0), (400.0, 500.0)]
        .iter()
        .enumerate()
        .map(|(i, &(x, y))| {
            TextBox::new(i as u64 + 1, BBoxXYWH::from_xywh(x, y, 100.0, 100.0), vec![])
        })
        .collect();
    let panel = [BBoxXYXY::from_xyxy(0.0, 0.0, 1.0, 1.0)];

    let calls = Rc::new(RefCell::new(Vec::new()));
    let mut stub = Stub {
        answers: vec![],
        calls: Rc::clone(&calls),
    };
    let organized = organize_bubbles(&panel, &bubbles, dims, &mut stub);

    assert!(organized.degraded);
    assert_eq!(ids(&organized.boxes), vec![BoxId(1), BoxId(2), BoxId(3)]);
}

#[test]
fn detect_arrange_and_report_a_page() {
    let temp = workspace_with_pages(&["001.bmp"], 1000, 1000);
    let bubbles_dir = temp.path().join("bubbles");
    let panels_dir = temp.path().join("panels");
    // Right-to-left page: two bubbles on top, one below.
    write_labels(
        &bubbles_dir,
        "001",
        &[
            "0 0.20 0.20 0.10 0.10",
            "0 0.80 0.21 0.10 0.10",
            "0 0.50 0.80 0.10 0.10",
        ],
    );
    write_labels(&panels_dir, "001", &["0 0.5 0.25 1.0 0.5", "0 0.5 0.75 1.0 0.5"]);

    let config = Config::default();
    let mut workspace = Workspace::open(temp.path(), config).expect("open");
    let mut engines = Engines {
        detector: Box::new(LabelFileDetector::new(&bubbles_dir)),
        panels: Box::new(LabelFilePanels::new(&panels_dir)),
        ocr: Box::new(NullOcr),
        sequencer: Box::new(RowMajorSequencer::new(ReadingDirection::Rtl)),
    };

    let mut session = workspace.open_image("001.bmp").expect("open image");
    let summary =
        pipeline::annotate_image(&mut session, &mut engines, AnnotateOptions::default())
            .expect("annotate");
    assert_eq!(summary.created, 3);
    assert_eq!(summary.panel_count, 2);
    assert_eq!(session.store.ids(), vec![BoxId(2), BoxId(1), BoxId(3)]);

    // The annotator disagrees: bottom first, then the top-left bubble.
    let events = session.store.subscribe();
    session.arrange.enter();
    session.arrange.record_click(BoxId(3)).expect("click");
    session.arrange.record_click(BoxId(1)).expect("click");
    session.arrange.commit_to(&mut session.store).expect("commit");
    assert_eq!(session.store.ids(), vec![BoxId(3), BoxId(1), BoxId(2)]);
    assert_eq!(
        events.try_recv().expect("event"),
        StoreEvent::OrderCommitted {
            order: vec![BoxId(3), BoxId(1), BoxId(2)]
        }
    );

    for (id, text) in [(3, "下"), (1, "左"), (2, "右")] {
        session
            .store
            .set_user_lines(BoxId(id), vec![text.to_string()])
            .expect("edit");
    }
    workspace.flush(&session).expect("flush");

    let saved = read_document(temp.path());
    assert_eq!(ids(saved.boxes("001.bmp")), vec![BoxId(3), BoxId(1), BoxId(2)]);
    assert_eq!(
        saved.boxes("001.bmp")[0].coords,
        BBoxXYWH::from_xywh(450.0, 750.0, 100.0, 100.0)
    );

    let report = io_text::to_report_string(
        &saved,
        workspace.image_ids().iter().map(String::as_str),
        io_text::ReportKind::Translation,
    );
    assert_eq!(report, "Page 1\n下\n左\n右\n\n");
}
