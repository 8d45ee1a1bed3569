//! Page-level workflows: detect, recognize, order.
//!
//! Each function works on an explicit [`ImageSession`]; batch variants open,
//! process and flush one image at a time.

use std::path::Path;

use tracing::{debug, info, instrument};

use crate::engines::{Detector, ImageRef, OcrEngine, PanelDetector, Sequencer};
use crate::error::KomaError;
use crate::ir::io_yolo::{label_path_for, read_bubble_rects};
use crate::ir::BBoxXYWH;
use crate::layout::organize_bubbles;
use crate::session::{ImageSession, Workspace};
use crate::store::BoxStore;

/// The collaborators one annotation run needs.
pub struct Engines {
    pub detector: Box<dyn Detector>,
    pub panels: Box<dyn PanelDetector>,
    pub ocr: Box<dyn OcrEngine>,
    pub sequencer: Box<dyn Sequencer>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct AnnotateOptions {
    /// Keep existing boxes and add the detections after them.
    pub append: bool,
}

/// What happened to one image.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageSummary {
    pub image_id: String,
    /// Regions the detector proposed.
    pub detected: usize,
    /// Boxes added to the store.
    pub created: usize,
    /// Proposals discarded for non-positive size.
    pub dropped: usize,
    pub panel_count: usize,
    /// True when ordering fell back to the prior order somewhere.
    pub degraded: bool,
}

/// Detects bubbles on the open image, recognizes their text and stores them
/// in reading order.
///
/// Existing boxes are replaced unless `options.append` is set. The store is
/// only touched once every region has been recognized, so a failing detector
/// or OCR engine leaves it as it was.
#[instrument(skip_all, fields(image = %session.image_id()))]
pub fn annotate_image(
    session: &mut ImageSession,
    engines: &mut Engines,
    options: AnnotateOptions,
) -> Result<PageSummary, KomaError> {
    let image_id = session.image_id().to_string();
    let path = session.path().to_path_buf();
    let image = ImageRef {
        id: &image_id,
        path: &path,
        dims: session.dims(),
    };

    let regions = engines.detector.predict(&image)?;
    let mut summary = PageSummary {
        image_id: image_id.clone(),
        detected: regions.len(),
        ..PageSummary::default()
    };

    let mut recognized = Vec::with_capacity(regions.len());
    for region in regions {
        if !region.has_positive_area() {
            debug!(?region, "skipping empty detection");
            summary.dropped += 1;
            continue;
        }
        let lines = engines.ocr.recognize(&image, &region)?;
        recognized.push((BBoxXYWH::from(region), lines));
    }

    summary.created = session.store.insert_batch(recognized, options.append)?.len();

    reorder_with(&mut session.store, &image, engines, &mut summary)?;
    info!(
        created = summary.created,
        dropped = summary.dropped,
        panels = summary.panel_count,
        degraded = summary.degraded,
        "annotated image"
    );
    Ok(summary)
}

/// Recomputes the reading order of the boxes already on the open image.
#[instrument(skip_all, fields(image = %session.image_id()))]
pub fn reorder_image(
    session: &mut ImageSession,
    engines: &mut Engines,
) -> Result<PageSummary, KomaError> {
    let image_id = session.image_id().to_string();
    let path = session.path().to_path_buf();
    let image = ImageRef {
        id: &image_id,
        path: &path,
        dims: session.dims(),
    };

    let mut summary = PageSummary {
        image_id: image_id.clone(),
        ..PageSummary::default()
    };
    reorder_with(&mut session.store, &image, engines, &mut summary)?;
    info!(panels = summary.panel_count, degraded = summary.degraded, "reordered image");
    Ok(summary)
}

fn reorder_with(
    store: &mut BoxStore,
    image: &ImageRef<'_>,
    engines: &mut Engines,
    summary: &mut PageSummary,
) -> Result<(), KomaError> {
    let panel_rects = engines.panels.predict_panels(image)?;
    let organized = organize_bubbles(
        &panel_rects,
        store.snapshot(),
        image.dims,
        engines.sequencer.as_mut(),
    );
    let order: Vec<_> = organized.boxes.iter().map(|text_box| text_box.id).collect();
    store.replace_order(&order)?;

    summary.panel_count = organized.panel_count;
    summary.degraded = organized.degraded;
    Ok(())
}

/// Runs [`annotate_image`] on every image in the workspace, saving each one
/// before moving on.
pub fn annotate_all(
    workspace: &mut Workspace,
    engines: &mut Engines,
    options: AnnotateOptions,
) -> Result<Vec<PageSummary>, KomaError> {
    let mut summaries = Vec::with_capacity(workspace.image_ids().len());
    for index in 0..workspace.image_ids().len() {
        let mut session = workspace.open_index(index)?;
        summaries.push(annotate_image(&mut session, engines, options)?);
        workspace.flush(&session)?;
    }
    Ok(summaries)
}

/// Replaces each image's boxes with the rows of its label file in
/// `labels_dir`.
///
/// Images without a label file are left alone. Imported boxes get ids from 1
/// and no text. Returns the number of images imported.
#[instrument(skip_all, fields(labels = %labels_dir.display()))]
pub fn import_yolo_labels(workspace: &mut Workspace, labels_dir: &Path) -> Result<usize, KomaError> {
    let mut imported = 0;
    for index in 0..workspace.image_ids().len() {
        let image_id = workspace.image_ids()[index].clone();
        let label_path = label_path_for(labels_dir, &image_id);
        if !label_path.is_file() {
            debug!(image = %image_id, "no label file");
            continue;
        }

        let mut session = workspace.open_index(index)?;
        let rects = read_bubble_rects(&label_path, session.dims())?;
        session.store = BoxStore::new(image_id.clone());
        for rect in rects {
            if rect.has_positive_area() {
                session.store.create(BBoxXYWH::from(rect), Vec::new())?;
            }
        }
        workspace.flush(&session)?;
        info!(image = %image_id, boxes = session.store.len(), "imported labels");
        imported += 1;
    }
    Ok(imported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::{NoPanels, NullOcr, RowMajorSequencer};
    use crate::ir::{BBoxXYXY, BoxId, Pixel};
    use crate::store::StoreEvent;

    struct Fixed(Vec<BBoxXYXY<Pixel>>);

    impl Detector for Fixed {
        fn predict(&mut self, _image: &ImageRef<'_>) -> Result<Vec<BBoxXYXY<Pixel>>, KomaError> {
            Ok(self.0.clone())
        }
    }

    struct Echo;

    /// Recognizes `ok_calls` regions, then fails.
    struct FailAfter {
        ok_calls: usize,
    }

    impl OcrEngine for FailAfter {
        fn recognize(
            &mut self,
            image: &ImageRef<'_>,
            _region: &BBoxXYXY<Pixel>,
        ) -> Result<Vec<String>, KomaError> {
            if self.ok_calls == 0 {
                return Err(KomaError::OcrFailed {
                    path: image.path.to_path_buf(),
                    message: "engine crashed".into(),
                });
            }
            self.ok_calls -= 1;
            Ok(vec!["ok".into()])
        }
    }

    impl OcrEngine for Echo {
        fn recognize(
            &mut self,
            _image: &ImageRef<'_>,
            region: &BBoxXYXY<Pixel>,
        ) -> Result<Vec<String>, KomaError> {
            Ok(vec![format!("at {}", region.xmin())])
        }
    }

    fn engines(regions: Vec<BBoxXYXY<Pixel>>) -> Engines {
        Engines {
            detector: Box::new(Fixed(regions)),
            panels: Box::new(NoPanels),
            ocr: Box::new(Echo),
            sequencer: Box::new(RowMajorSequencer::default()),
        }
    }

    fn workspace() -> (tempfile::TempDir, Workspace) {
        let temp = tempfile::tempdir().expect("temp dir");
        let mut bmp = Vec::new();
        bmp.extend_from_slice(b"BM");
        bmp.extend_from_slice(&54u32.to_le_bytes());
        bmp.extend_from_slice(&[0u8; 4]);
        bmp.extend_from_slice(&54u32.to_le_bytes());
        bmp.extend_from_slice(&40u32.to_le_bytes());
        bmp.extend_from_slice(&400i32.to_le_bytes());
        bmp.extend_from_slice(&300i32.to_le_bytes());
        bmp.extend_from_slice(&1u16.to_le_bytes());
        bmp.extend_from_slice(&24u16.to_le_bytes());
        bmp.extend_from_slice(&[0u8; 24]);
        std::fs::write(temp.path().join("page.bmp"), bmp).expect("write bmp");
        let workspace =
            Workspace::open(temp.path(), crate::config::Config::default()).expect("open");
        (temp, workspace)
    }

    #[test]
    fn annotate_skips_empty_regions_and_orders_boxes() {
        let (_temp, workspace) = workspace();
        let mut session = workspace.open_index(0).expect("open");
        let mut engines = engines(vec![
            BBoxXYXY::from_xywh(250.0, 20.0, 50.0, 40.0),
            BBoxXYXY::from_xywh(10.0, 20.0, 0.0, 40.0),
            BBoxXYXY::from_xywh(20.0, 12.0, 50.0, 40.0),
        ]);

        let summary =
            annotate_image(&mut session, &mut engines, AnnotateOptions::default()).expect("run");

        assert_eq!(summary.detected, 3);
        assert_eq!(summary.created, 2);
        assert_eq!(summary.dropped, 1);
        assert!(!summary.degraded);
        // Two implicit panels, read top to bottom; ids follow detection order.
        assert_eq!(session.store.ids(), vec![BoxId(2), BoxId(1)]);
        assert_eq!(session.store.snapshot()[0].lines, vec!["at 20".to_string()]);
    }

    #[test]
    fn annotate_replaces_unless_appending() {
        let (_temp, workspace) = workspace();
        let mut session = workspace.open_index(0).expect("open");
        let mut engines = engines(vec![BBoxXYXY::from_xywh(10.0, 10.0, 30.0, 30.0)]);

        annotate_image(&mut session, &mut engines, AnnotateOptions::default()).expect("run");
        annotate_image(&mut session, &mut engines, AnnotateOptions::default()).expect("run");
        assert_eq!(session.store.ids(), vec![BoxId(2)]);

        annotate_image(&mut session, &mut engines, AnnotateOptions { append: true })
            .expect("run");
        assert_eq!(session.store.len(), 2);
    }

    #[test]
    fn ocr_failure_leaves_existing_boxes_untouched() {
        let (_temp, workspace) = workspace();
        let mut session = workspace.open_index(0).expect("open");
        for x in [10.0, 110.0, 210.0] {
            session
                .store
                .create(BBoxXYWH::from_xywh(x, 10.0, 40.0, 40.0), vec!["kept".into()])
                .expect("create");
        }
        let events = session.store.subscribe();

        let mut engines = engines(vec![
            BBoxXYXY::from_xywh(10.0, 100.0, 30.0, 30.0),
            BBoxXYXY::from_xywh(60.0, 100.0, 30.0, 30.0),
            BBoxXYXY::from_xywh(110.0, 100.0, 30.0, 30.0),
        ]);
        engines.ocr = Box::new(FailAfter { ok_calls: 1 });

        let err = annotate_image(&mut session, &mut engines, AnnotateOptions::default())
            .unwrap_err();
        assert!(matches!(err, KomaError::OcrFailed { .. }));
        assert_eq!(session.store.ids(), vec![BoxId(1), BoxId(2), BoxId(3)]);
        assert_eq!(session.store.next_id(), BoxId(4));
        assert!(session.store.snapshot().iter().all(|b| b.lines == vec!["kept"]));
        assert_eq!(events.try_iter().count(), 0);
    }

    #[test]
    fn reorder_commits_one_order_event() {
        let (_temp, workspace) = workspace();
        let mut session = workspace.open_index(0).expect("open");
        for (x, y) in [(300.0, 40.0), (10.0, 5.0)] {
            session
                .store
                .create(BBoxXYWH::from_xywh(x, y, 40.0, 40.0), vec![])
                .expect("create");
        }
        let events = session.store.subscribe();

        let mut engines = engines(vec![]);
        engines.ocr = Box::new(NullOcr);
        reorder_image(&mut session, &mut engines).expect("reorder");

        assert_eq!(session.store.ids(), vec![BoxId(2), BoxId(1)]);
        assert_eq!(
            events.try_iter().collect::<Vec<_>>(),
            vec![StoreEvent::OrderCommitted {
                order: vec![BoxId(2), BoxId(1)]
            }]
        );
    }

    #[test]
    fn annotate_all_saves_every_page() {
        let (temp, mut workspace) = workspace();
        let mut engines = engines(vec![BBoxXYXY::from_xywh(10.0, 10.0, 30.0, 30.0)]);

        let summaries =
            annotate_all(&mut workspace, &mut engines, AnnotateOptions::default()).expect("run");
        assert_eq!(summaries.len(), 1);

        let saved = crate::ir::io_json::load(&temp.path().join("annotations.json")).expect("load");
        assert_eq!(saved.boxes("page.bmp").len(), 1);
    }

    #[test]
    fn import_replaces_boxes_from_label_files() {
        let (temp, mut workspace) = workspace();
        let labels = temp.path().join("labels");
        std::fs::create_dir(&labels).expect("mkdir");
        std::fs::write(labels.join("page.txt"), "0 0.5 0.5 0.25 0.2\n0 0.1 0.1 0 0\n")
            .expect("write");

        let imported = import_yolo_labels(&mut workspace, &labels).expect("import");
        assert_eq!(imported, 1);

        let boxes = workspace.document().boxes("page.bmp");
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].id, BoxId(1));
        assert_eq!(boxes[0].coords, BBoxXYWH::from_xywh(150.0, 120.0, 100.0, 60.0));
        assert!(boxes[0].lines.is_empty());
    }
}
