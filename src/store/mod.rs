//! Live box collection for the image currently open.
//!
//! The store is the single source of truth for one image's boxes while it is
//! being edited. Every list or overlay shown to the annotator is a projection
//! rebuilt from [`BoxStore::snapshot`] after an event, never a second copy
//! that has to be reconciled.
//!
//! All mutations run to completion on the calling thread; at most one store
//! is mutated at a time, so no locking is involved.

mod events;

pub use events::StoreEvent;

use std::collections::HashSet;
use std::sync::mpsc::Receiver;

use tracing::debug;

use crate::error::KomaError;
use crate::ir::{BBoxXYWH, BoxId, Pixel, TextBox};
use events::EventBus;

/// Ordered boxes of one image plus the id allocator for that image.
#[derive(Debug)]
pub struct BoxStore {
    image_id: String,
    boxes: Vec<TextBox>,
    next_id: BoxId,
    events: EventBus,
}

impl BoxStore {
    /// Creates an empty store. The first box gets id 1.
    pub fn new(image_id: impl Into<String>) -> Self {
        Self {
            image_id: image_id.into(),
            boxes: Vec::new(),
            next_id: BoxId(1),
            events: EventBus::default(),
        }
    }

    /// Creates a store holding previously saved boxes, in their saved order.
    ///
    /// Id allocation continues after the largest id present.
    ///
    /// # Errors
    /// - [`KomaError::DuplicateBoxId`] if two boxes share an id
    /// - [`KomaError::BoxIdExhausted`] if a box already holds `u64::MAX`
    pub fn from_boxes(image_id: impl Into<String>, boxes: Vec<TextBox>) -> Result<Self, KomaError> {
        let mut seen = HashSet::with_capacity(boxes.len());
        for text_box in &boxes {
            if !seen.insert(text_box.id) {
                return Err(KomaError::DuplicateBoxId(text_box.id));
            }
        }

        let next_id = match boxes.iter().map(|text_box| text_box.id).max() {
            Some(max) => max.next().ok_or(KomaError::BoxIdExhausted(max))?,
            None => BoxId(1),
        };

        Ok(Self {
            image_id: image_id.into(),
            boxes,
            next_id,
            events: EventBus::default(),
        })
    }

    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    /// The id the next created box will receive.
    pub fn next_id(&self) -> BoxId {
        self.next_id
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn get(&self, id: BoxId) -> Option<&TextBox> {
        self.boxes.iter().find(|text_box| text_box.id == id)
    }

    /// Box ids in current order.
    pub fn ids(&self) -> Vec<BoxId> {
        self.boxes.iter().map(|text_box| text_box.id).collect()
    }

    /// Read-only view of the boxes in current order.
    pub fn snapshot(&self) -> &[TextBox] {
        &self.boxes
    }

    /// Registers a subscriber for change events.
    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Appends a new box with a freshly allocated id.
    ///
    /// # Errors
    /// - [`KomaError::InvalidGeometry`] if width or height is not positive
    /// - [`KomaError::BoxIdExhausted`] if the allocator has no id left
    ///
    /// Nothing is stored and no id is consumed when an error is returned.
    pub fn create(&mut self, coords: BBoxXYWH<Pixel>, lines: Vec<String>) -> Result<TextBox, KomaError> {
        check_geometry(&coords)?;

        let id = self.next_id;
        self.next_id = id.next().ok_or(KomaError::BoxIdExhausted(id))?;

        Ok(self.push(id, coords, lines))
    }

    /// Stores a whole batch of new boxes at once, replacing the current boxes
    /// unless `append` is set.
    ///
    /// Every entry is checked before anything changes, so on error the store
    /// keeps its boxes and its next id. Returns the ids given to the batch, in
    /// batch order.
    ///
    /// # Errors
    /// Same as [`BoxStore::create`], for any entry of the batch.
    pub fn insert_batch(
        &mut self,
        batch: Vec<(BBoxXYWH<Pixel>, Vec<String>)>,
        append: bool,
    ) -> Result<Vec<BoxId>, KomaError> {
        for (coords, _) in &batch {
            check_geometry(coords)?;
        }
        let room = u64::try_from(batch.len())
            .ok()
            .and_then(|count| self.next_id.as_u64().checked_add(count));
        if room.is_none() {
            return Err(KomaError::BoxIdExhausted(self.next_id));
        }

        if !append {
            self.clear();
        }

        let mut ids = Vec::with_capacity(batch.len());
        for (coords, lines) in batch {
            let id = self.next_id;
            self.next_id = BoxId(id.as_u64() + 1);
            ids.push(self.push(id, coords, lines).id);
        }
        Ok(ids)
    }

    fn push(&mut self, id: BoxId, coords: BBoxXYWH<Pixel>, lines: Vec<String>) -> TextBox {
        let text_box = TextBox::new(id, coords, lines);
        self.boxes.push(text_box.clone());
        debug!(image = %self.image_id, id = id.as_u64(), "box created");
        self.events.emit(StoreEvent::BoxCreated { id, coords });
        text_box
    }

    /// Removes the box with `id`. Removing an absent id does nothing.
    pub fn remove(&mut self, id: BoxId) -> Option<TextBox> {
        let index = self.boxes.iter().position(|text_box| text_box.id == id)?;
        let removed = self.boxes.remove(index);
        debug!(image = %self.image_id, id = id.as_u64(), "box removed");
        self.events.emit(StoreEvent::BoxDeleted { id });
        Some(removed)
    }

    /// Removes every box. Ids already handed out stay retired.
    pub fn clear(&mut self) {
        for text_box in std::mem::take(&mut self.boxes) {
            self.events.emit(StoreEvent::BoxDeleted { id: text_box.id });
        }
    }

    /// Reorders the boxes to match `order`.
    ///
    /// `order` must name every current box exactly once.
    ///
    /// # Errors
    /// - [`KomaError::UnknownBoxId`] for an id not in the store
    /// - [`KomaError::DuplicateBoxId`] for an id listed twice
    /// - [`KomaError::IncompleteOrder`] if any current box is left out
    ///
    /// The store is unchanged when an error is returned.
    pub fn replace_order(&mut self, order: &[BoxId]) -> Result<(), KomaError> {
        let mut seen = HashSet::with_capacity(order.len());
        for &id in order {
            if self.get(id).is_none() {
                return Err(KomaError::UnknownBoxId(id));
            }
            if !seen.insert(id) {
                return Err(KomaError::DuplicateBoxId(id));
            }
        }

        let missing: Vec<BoxId> = self
            .boxes
            .iter()
            .map(|text_box| text_box.id)
            .filter(|id| !seen.contains(id))
            .collect();
        if !missing.is_empty() {
            return Err(KomaError::IncompleteOrder { missing });
        }

        let mut remaining = std::mem::take(&mut self.boxes);
        for &id in order {
            if let Some(index) = remaining.iter().position(|text_box| text_box.id == id) {
                self.boxes.push(remaining.swap_remove(index));
            }
        }

        self.events.emit(StoreEvent::OrderCommitted {
            order: order.to_vec(),
        });
        Ok(())
    }

    /// Replaces the recognized text of a box.
    pub fn set_lines(&mut self, id: BoxId, lines: Vec<String>) -> Result<(), KomaError> {
        self.box_mut(id)?.lines = lines;
        self.events.emit(StoreEvent::LinesEdited { id });
        Ok(())
    }

    /// Replaces the user-authored text of a box.
    pub fn set_user_lines(&mut self, id: BoxId, user_lines: Vec<String>) -> Result<(), KomaError> {
        self.box_mut(id)?.user_lines = user_lines;
        self.events.emit(StoreEvent::LinesEdited { id });
        Ok(())
    }

    fn box_mut(&mut self, id: BoxId) -> Result<&mut TextBox, KomaError> {
        self.boxes
            .iter_mut()
            .find(|text_box| text_box.id == id)
            .ok_or(KomaError::UnknownBoxId(id))
    }
}

fn check_geometry(coords: &BBoxXYWH<Pixel>) -> Result<(), KomaError> {
    if coords.has_positive_area() {
        Ok(())
    } else {
        Err(KomaError::InvalidGeometry {
            width: coords.width(),
            height: coords.height(),
        })
    }
}
