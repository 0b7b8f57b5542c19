//! Injected page UI: the shared tooltip, the selection flow, and clipboard
//! access

pub mod clipboard;
pub mod selection;
pub mod tooltip;

pub use clipboard::{Clipboard, ClipboardError, MemoryClipboard, SystemClipboard};
pub use selection::{
    ConfirmedNickname, PendingSelection, SelectionCaptureController, SelectionTarget,
    TextSelection,
};
pub use tooltip::{place_tooltip, TooltipController};
