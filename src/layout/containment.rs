//! Grouping bubbles under panels.

use crate::ir::{BBoxXYXY, ImageDims, Normalized, Panel, PanelId, TextBox};

/// Assigns every bubble to exactly one panel.
///
/// Detected panels keep their input order and get ids `0..n`. Each bubble, in
/// input order, goes to the first panel whose pixel-space area contains the
/// bubble's center, edges included. A bubble no panel contains becomes its
/// own panel (normalized from the bubble's box, id = current panel count),
/// and later bubbles are tested against it as well.
///
/// First match wins even when several panels overlap the center; choosing
/// the panel with the largest overlap would be a possible refinement.
pub fn assign_to_panels(
    panel_rects: &[BBoxXYXY<Normalized>],
    bubbles: &[TextBox],
    dims: ImageDims,
) -> Vec<Panel> {
    let (width, height) = (dims.width_f64(), dims.height_f64());

    let mut panels: Vec<Panel> = panel_rects
        .iter()
        .enumerate()
        .map(|(index, rect)| Panel::new(PanelId(index), *rect))
        .collect();

    for bubble in bubbles {
        let center = bubble.coords.center();
        let target = panels
            .iter()
            .position(|panel| panel.bbox.to_pixel(width, height).contains_inclusive(&center));

        match target {
            Some(index) => panels[index].members.push(bubble.clone()),
            None => {
                let mut panel = Panel::new(
                    PanelId(panels.len()),
                    bubble.coords.to_normalized(width, height),
                );
                panel.members.push(bubble.clone());
                panels.push(panel);
            }
        }
    }

    panels
}
