//! Reading-order sorting of panels and of the bubbles inside them.

use tracing::{debug, warn};

use super::containment::assign_to_panels;
use crate::engines::Sequencer;
use crate::error::KomaError;
use crate::ir::{BBoxXYXY, ImageDims, Normalized, Panel, TextBox};

/// Converts a model permutation into `rank[position]`.
///
/// # Errors
/// Returns [`KomaError::SequencerContractViolation`] unless `permutation` is
/// a permutation of `0..len`.
pub fn rank_map(permutation: &[usize], len: usize) -> Result<Vec<usize>, KomaError> {
    let violation = |message: String| KomaError::SequencerContractViolation {
        expected: len,
        message,
    };

    if permutation.len() != len {
        return Err(violation(format!(
            "got {} indices: {permutation:?}",
            permutation.len()
        )));
    }

    let mut ranks = vec![usize::MAX; len];
    for (rank, &position) in permutation.iter().enumerate() {
        let slot = ranks
            .get_mut(position)
            .ok_or_else(|| violation(format!("index {position} out of range in {permutation:?}")))?;
        if *slot != usize::MAX {
            return Err(violation(format!(
                "index {position} repeated in {permutation:?}"
            )));
        }
        *slot = rank;
    }
    Ok(ranks)
}

/// Asks `sequencer` for an order of `items` and applies it.
///
/// The model is called once with `coords` (one row per item). On any error
/// `items` is left untouched.
fn apply_model_order<T, S>(
    items: &mut Vec<T>,
    coords: &[[f64; 4]],
    sequencer: &mut S,
) -> Result<(), KomaError>
where
    S: Sequencer + ?Sized,
{
    let permutation = sequencer.predict(coords)?;
    let ranks = rank_map(&permutation, items.len())?;

    let mut ranked: Vec<(usize, T)> = ranks.into_iter().zip(std::mem::take(items)).collect();
    ranked.sort_by_key(|(rank, _)| *rank);
    items.extend(ranked.into_iter().map(|(_, item)| item));
    Ok(())
}

/// Sorts panels into reading order.
///
/// One panel or none is already ordered. Two panels are read top to bottom.
/// Three or more go to the model as pixel `[x, y, w, h]` rows.
pub fn sort_panels<S>(
    panels: &mut Vec<Panel>,
    dims: ImageDims,
    sequencer: &mut S,
) -> Result<(), KomaError>
where
    S: Sequencer + ?Sized,
{
    let pixel_rect =
        |bbox: &BBoxXYXY<Normalized>| bbox.to_pixel(dims.width_f64(), dims.height_f64());

    match panels.len() {
        0 | 1 => Ok(()),
        2 => {
            panels.sort_by(|a, b| pixel_rect(&a.bbox).ymin().total_cmp(&pixel_rect(&b.bbox).ymin()));
            Ok(())
        }
        _ => {
            let coords: Vec<[f64; 4]> = panels
                .iter()
                .map(|panel| {
                    let (x, y, w, h) = pixel_rect(&panel.bbox).to_xywh();
                    [x, y, w, h]
                })
                .collect();
            apply_model_order(panels, &coords, sequencer)
        }
    }
}

/// Sorts one panel's bubbles into reading order.
///
/// Any two or more bubbles go to the model as normalized
/// `[x_center, y_center, w, h]` rows.
pub fn sort_bubbles<S>(
    bubbles: &mut Vec<TextBox>,
    dims: ImageDims,
    sequencer: &mut S,
) -> Result<(), KomaError>
where
    S: Sequencer + ?Sized,
{
    if bubbles.len() < 2 {
        return Ok(());
    }
    let coords: Vec<[f64; 4]> = bubbles
        .iter()
        .map(|bubble| {
            let (cx, cy, w, h) = bubble
                .coords
                .to_normalized(dims.width_f64(), dims.height_f64())
                .to_cxcywh();
            [cx, cy, w, h]
        })
        .collect();
    apply_model_order(bubbles, &coords, sequencer)
}

/// Result of [`organize_bubbles`].
#[derive(Clone, Debug)]
pub struct Organized {
    /// Every input bubble, in reading order.
    pub boxes: Vec<TextBox>,
    /// Detected plus synthesized panels.
    pub panel_count: usize,
    /// True when at least one sorting step fell back to the prior order.
    pub degraded: bool,
}

/// Computes the full reading order of `bubbles` on one page.
///
/// Bubbles are grouped under panels, panels are sorted, each panel's bubbles
/// are sorted, and the result is the panels' bubbles concatenated. A failing
/// model only costs the ordering of the step it was asked about: that step
/// keeps its prior order and the rest proceeds.
pub fn organize_bubbles<S>(
    panel_rects: &[BBoxXYXY<Normalized>],
    bubbles: &[TextBox],
    dims: ImageDims,
    sequencer: &mut S,
) -> Organized
where
    S: Sequencer + ?Sized,
{
    let mut panels = assign_to_panels(panel_rects, bubbles, dims);
    let panel_count = panels.len();
    let mut degraded = false;

    if let Err(err) = sort_panels(&mut panels, dims, sequencer) {
        warn!(error = %err, panels = panel_count, "panel ordering unavailable; keeping detection order");
        degraded = true;
    }

    for panel in &mut panels {
        if let Err(err) = sort_bubbles(&mut panel.members, dims, sequencer) {
            warn!(
                error = %err,
                panel = %panel.id,
                bubbles = panel.members.len(),
                "bubble ordering unavailable; keeping prior order"
            );
            degraded = true;
        }
    }

    let boxes: Vec<TextBox> = panels.into_iter().flat_map(|panel| panel.members).collect();
    debug!(boxes = boxes.len(), panels = panel_count, degraded, "organized bubbles");

    Organized {
        boxes,
        panel_count,
        degraded,
    }
}
