//! Page document model
//!
//! The host (browser bridge, CLI, tests) owns layout and input; this module
//! only provides the node tree, mutation records, and geometry the page
//! features operate on.

mod document;
mod geometry;
mod serialize;

pub use document::{Document, DomError, Element, MutationRecord, NodeId, NodeKind};
pub use geometry::{Point, Rect, Size, Viewport};
pub use serialize::{escape_attr, escape_text, inner_html, to_html};
