//! Typed change notifications emitted by the box store.

use std::sync::mpsc::{self, Receiver, Sender};

use crate::ir::{BBoxXYWH, BoxId, Pixel};

/// Something that changed in a [`BoxStore`](super::BoxStore).
///
/// Consumers rebuild their views from `snapshot()` when they see an event;
/// events never carry enough state to patch a view in place.
#[derive(Clone, Debug, PartialEq)]
pub enum StoreEvent {
    BoxCreated { id: BoxId, coords: BBoxXYWH<Pixel> },
    BoxDeleted { id: BoxId },
    OrderCommitted { order: Vec<BoxId> },
    LinesEdited { id: BoxId },
}

/// Fan-out of store events to any number of subscribers.
#[derive(Debug, Default)]
pub(crate) struct EventBus {
    subscribers: Vec<Sender<StoreEvent>>,
}

impl EventBus {
    pub(crate) fn subscribe(&mut self) -> Receiver<StoreEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Delivers `event` to every live subscriber; dropped receivers are
    /// forgotten.
    pub(crate) fn emit(&mut self, event: StoreEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}
