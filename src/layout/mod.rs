//! Derived page layout: panel membership and reading order.
//!
//! Nothing here is persisted. Panels are rebuilt from detections each time an
//! order is computed, and only the resulting box order reaches the store.

mod containment;
mod sequence;

pub use containment::assign_to_panels;
pub use sequence::{organize_bubbles, rank_map, sort_bubbles, sort_panels, Organized};
