//! Page-scanning core
//!
//! - rewriter: turns address runs in text nodes into labels
//! - watcher: rescans subtrees the page inserts
//! - refresher: re-renders labels when the nickname map changes

pub mod label;
pub mod refresher;
pub mod rewriter;
pub mod watcher;

pub use refresher::{RefreshReport, ReplacementRefresher};
pub use rewriter::{plan_segments, DomRewriter, ScanReport, Segment};
pub use watcher::MutationWatcher;
