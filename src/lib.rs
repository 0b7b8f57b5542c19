//! Replace crypto addresses in rendered page text with user-chosen nicknames.
//!
//! - `domain`: address shapes and lookup keys
//! - `dom`: the page model the features operate on
//! - `core`: scanning, mutation watching, label refresh
//! - `page`: tooltip, selection capture, clipboard
//! - `store`: nickname storage and the per-page cache
//! - `app`: one page session wiring it all together
//! - `modules`/`ui`: the management surface behind the CLI

pub mod app;
pub mod config;
pub mod core;
pub mod dom;
pub mod domain;
pub mod modules;
pub mod page;
pub mod store;
pub mod ui;

pub use app::{EventOutcome, Key, PageEvent, PageSession};
pub use config::Config;
