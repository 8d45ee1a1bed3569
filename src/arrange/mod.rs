//! Manual reading-order override ("arrange mode").
//!
//! While recording, the annotator clicks boxes in the order they should be
//! read. Clicking a box that was already clicked moves it to the end of the
//! sequence, which is how mistakes get corrected. Committing puts the clicked
//! boxes first, in click order, followed by every box never clicked, in its
//! previous relative order.
//!
//! Commit is lenient: clicks on boxes that have since been deleted are
//! dropped silently. Stale click state is expected from an interactive
//! surface; [`BoxStore::replace_order`] stays strict for direct callers.

use crate::error::KomaError;
use crate::ir::BoxId;
use crate::store::BoxStore;

#[derive(Clone, Debug, PartialEq, Eq)]
enum ArrangeState {
    Idle,
    Recording { clicks: Vec<BoxId> },
}

/// State machine for one arrange session: `Idle -> Recording -> Idle`.
#[derive(Clone, Debug)]
pub struct ArrangeOverride {
    state: ArrangeState,
}

impl Default for ArrangeOverride {
    fn default() -> Self {
        Self::new()
    }
}

impl ArrangeOverride {
    pub fn new() -> Self {
        Self {
            state: ArrangeState::Idle,
        }
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, ArrangeState::Recording { .. })
    }

    /// Starts recording with an empty click sequence, discarding any clicks
    /// from an earlier session that was never committed.
    pub fn enter(&mut self) {
        self.state = ArrangeState::Recording { clicks: Vec::new() };
    }

    /// Records a click on `id`. A repeated click moves `id` to the end.
    pub fn record_click(&mut self, id: BoxId) -> Result<(), KomaError> {
        let ArrangeState::Recording { clicks } = &mut self.state else {
            return Err(KomaError::ArrangeNotRecording);
        };
        clicks.retain(|&clicked| clicked != id);
        clicks.push(id);
        Ok(())
    }

    /// Clicks recorded so far, in order. Empty when idle.
    pub fn clicks(&self) -> &[BoxId] {
        match &self.state {
            ArrangeState::Idle => &[],
            ArrangeState::Recording { clicks } => clicks.as_slice(),
        }
    }

    /// 1-based position of `id` in the click sequence, for numbering overlays.
    pub fn click_number(&self, id: BoxId) -> Option<usize> {
        self.clicks()
            .iter()
            .position(|&clicked| clicked == id)
            .map(|index| index + 1)
    }

    /// Ends recording and returns the merged order for `current`.
    ///
    /// The result is the clicked ids present in `current` in click order,
    /// then the rest of `current` in its original order.
    pub fn commit(&mut self, current: &[BoxId]) -> Result<Vec<BoxId>, KomaError> {
        let ArrangeState::Recording { clicks } =
            std::mem::replace(&mut self.state, ArrangeState::Idle)
        else {
            return Err(KomaError::ArrangeNotRecording);
        };

        let mut order: Vec<BoxId> = clicks
            .iter()
            .copied()
            .filter(|id| current.contains(id))
            .collect();
        order.extend(current.iter().copied().filter(|id| !clicks.contains(id)));
        Ok(order)
    }

    /// Ends recording without touching any order.
    pub fn cancel(&mut self) {
        self.state = ArrangeState::Idle;
    }

    /// Commits against `store` and applies the result.
    pub fn commit_to(&mut self, store: &mut BoxStore) -> Result<Vec<BoxId>, KomaError> {
        let order = self.commit(&store.ids())?;
        store.replace_order(&order)?;
        Ok(order)
    }
}
