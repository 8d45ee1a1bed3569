//! In-memory representation of page annotations.
//!
//! # Design Principles
//!
//! 1. **Two coordinate spaces, kept apart**: boxes are pixel-space, panels are
//!    normalized. [`BBoxXYXY`] carries the space as a type parameter, so a
//!    panel rectangle has to be explicitly denormalized before it can be
//!    compared with a bubble.
//!
//! 2. **One persisted entity**: only [`TextBox`] sequences are stored, inside
//!    an [`AnnotationDocument`]. Panels and orderings are recomputed. A box
//!    keeps its `[x, y, w, h]` exactly as read ([`BBoxXYWH`]), so saving one
//!    image never perturbs the numbers of another.
//!
//! 3. **Permissive parsing**: documents with odd geometry still load, so that
//!    [`crate::validation`] can report on them.
//!
//! # Example
//!
//! ```
//! use koma::ir::{AnnotationDocument, BBoxXYWH, TextBox};
//!
//! let mut document = AnnotationDocument::new();
//! document.set_boxes(
//!     "page01.png",
//!     vec![TextBox::new(1u64, BBoxXYWH::from_xywh(40.0, 32.0, 120.0, 200.0), vec![])],
//! );
//! assert_eq!(document.boxes("page01.png").len(), 1);
//! ```

mod bbox;
mod coord;
mod ids;
pub mod io_json;
pub mod io_text;
pub mod io_yolo;
mod model;
mod space;

pub use bbox::{BBoxXYWH, BBoxXYXY};
pub use coord::Coord;
pub use ids::{BoxId, PanelId};
pub use model::{AnnotationDocument, ImageDims, Panel, TextBox};
pub use space::{CoordSpace, Normalized, Pixel};
