//! Management surface
//!
//! - manage: list/add/edit/delete state behind the `manage` screen
//! - export: JSON and CSV dumps of the nickname map
//! - scan: plain-text input rendered through the page scanner

pub mod export;
pub mod manage;
pub mod scan;
