//! Shared hover tooltip for labels
//!
//! One tooltip element serves every label on the page. It shows the original
//! address and a copy button. Leaving the label starts a short grace period
//! so the pointer can travel onto the tooltip without it disappearing.

use std::time::{Duration, Instant};

use tracing::debug;

use super::clipboard::Clipboard;
use crate::config::{IconConfig, TooltipConfig};
use crate::core::label::{mark_extension_ui, original_address};
use crate::dom::{Document, DomError, NodeId, Point, Rect, Size, Viewport};

pub const TOOLTIP_CLASS: &str = "address-label-tooltip";
pub const COPIED_CLASS: &str = "copied";

/// Used until the host reports a measured size for the tooltip.
const FALLBACK_SIZE: Size = Size {
    width: 380.0,
    height: 36.0,
};

/// Minimum distance kept from the viewport's left and right edges
const EDGE_MARGIN: f64 = 8.0;

/// Page-space position for a tooltip of `size` next to `anchor`.
///
/// Above the anchor when it fits, below otherwise; horizontally centred on
/// the anchor and clamped into the viewport.
pub fn place_tooltip(anchor: Rect, size: Size, viewport: Viewport, gap: f64) -> Point {
    let above = anchor.top() - gap - size.height;
    let top = if above >= 0.0 {
        above
    } else {
        anchor.bottom() + gap
    };

    let centred = anchor.left() + anchor.width / 2.0 - size.width / 2.0;
    let max_left = (viewport.width - size.width - EDGE_MARGIN).max(EDGE_MARGIN);
    let left = centred.clamp(EDGE_MARGIN, max_left);

    viewport.to_page(left, top)
}

#[derive(Debug)]
pub struct TooltipController {
    root: NodeId,
    address_text: NodeId,
    copy_button: NodeId,
    copy_icon: NodeId,
    icons: IconConfig,
    hide_delay: Duration,
    copy_feedback: Duration,
    gap: f64,
    anchor: Option<NodeId>,
    hide_at: Option<Instant>,
    revert_at: Option<Instant>,
}

impl TooltipController {
    /// Build the hidden tooltip and attach it to the page body.
    pub fn new(
        doc: &mut Document,
        config: &TooltipConfig,
        icons: &IconConfig,
    ) -> Result<Self, DomError> {
        let root = doc.create_element("div");
        doc.add_class(root, TOOLTIP_CLASS)?;
        mark_extension_ui(doc, root)?;
        doc.set_attribute(root, "role", "tooltip")?;
        doc.set_style(root, "position", "absolute")?;
        doc.set_style(root, "display", "none")?;

        let address = doc.create_element("span");
        doc.add_class(address, "address-label-tooltip-address")?;
        let address_text = doc.create_text("");
        doc.append_child(address, address_text)?;

        let copy_button = doc.create_element("button");
        doc.add_class(copy_button, "copy-icon")?;
        doc.set_attribute(copy_button, "title", "Copy address")?;
        let copy_icon = doc.create_element("img");
        doc.set_attribute(copy_icon, "src", &icons.copy)?;
        doc.set_attribute(copy_icon, "alt", "Copy")?;
        doc.append_child(copy_button, copy_icon)?;

        doc.append_child(root, address)?;
        doc.append_child(root, copy_button)?;
        let body = doc.body();
        doc.append_child(body, root)?;

        Ok(Self {
            root,
            address_text,
            copy_button,
            copy_icon,
            icons: icons.clone(),
            hide_delay: config.hide_delay(),
            copy_feedback: config.copy_feedback(),
            gap: config.gap_px,
            anchor: None,
            hide_at: None,
            revert_at: None,
        })
    }

    pub fn element(&self) -> NodeId {
        self.root
    }

    pub fn is_visible(&self) -> bool {
        self.anchor.is_some()
    }

    /// Label the tooltip is currently shown for
    pub fn anchor(&self) -> Option<NodeId> {
        self.anchor
    }

    pub fn contains(&self, doc: &Document, node: NodeId) -> bool {
        doc.contains(self.root, node)
    }

    pub fn is_copy_target(&self, doc: &Document, node: NodeId) -> bool {
        doc.contains(self.copy_button, node)
    }

    pub fn is_copied(&self) -> bool {
        self.revert_at.is_some()
    }

    /// Show for `label`, replacing whatever the tooltip showed before.
    pub fn show(
        &mut self,
        doc: &mut Document,
        label: NodeId,
        viewport: Viewport,
    ) -> Result<(), DomError> {
        self.hide_at = None;
        if self.anchor == Some(label) {
            return Ok(());
        }
        let address = original_address(doc, label)
            .ok_or(DomError::NotAnElement(label))?
            .to_string();
        if self.revert_at.is_some() {
            self.revert_copied(doc)?;
        }
        doc.set_text(self.address_text, &address)?;

        let measured = doc.rect(self.root);
        let size = if measured.width > 0.0 && measured.height > 0.0 {
            Size::new(measured.width, measured.height)
        } else {
            FALLBACK_SIZE
        };
        let at = place_tooltip(doc.rect(label), size, viewport, self.gap);
        doc.set_style(self.root, "left", &format!("{}px", at.x))?;
        doc.set_style(self.root, "top", &format!("{}px", at.y))?;
        doc.set_style(self.root, "display", "block")?;
        self.anchor = Some(label);
        Ok(())
    }

    /// Pointer left the label or the tooltip: hide after the grace period.
    pub fn schedule_hide(&mut self, now: Instant) {
        if self.is_visible() {
            self.hide_at = Some(now + self.hide_delay);
        }
    }

    /// Pointer came back onto the label or the tooltip.
    pub fn cancel_hide(&mut self) {
        self.hide_at = None;
    }

    pub fn hide(&mut self, doc: &mut Document) -> Result<(), DomError> {
        self.hide_at = None;
        self.anchor = None;
        doc.set_style(self.root, "display", "none")
    }

    /// Copy the shown address. Returns whether the clipboard accepted it.
    ///
    /// A failed write is not surfaced; the confirmation just never appears.
    pub fn copy(
        &mut self,
        doc: &mut Document,
        clipboard: &mut dyn Clipboard,
        now: Instant,
    ) -> Result<bool, DomError> {
        let Some(label) = self.anchor else {
            return Ok(false);
        };
        let Some(address) = original_address(doc, label).map(str::to_string) else {
            return Ok(false);
        };
        if let Err(err) = clipboard.write_text(&address) {
            debug!("copy to clipboard failed: {err}");
            return Ok(false);
        }
        doc.add_class(self.root, COPIED_CLASS)?;
        doc.set_attribute(self.copy_icon, "src", &self.icons.copied)?;
        self.revert_at = Some(now + self.copy_feedback);
        Ok(true)
    }

    /// Fire due timers.
    pub fn tick(&mut self, doc: &mut Document, now: Instant) -> Result<(), DomError> {
        if self.revert_at.is_some_and(|at| now >= at) {
            self.revert_copied(doc)?;
        }
        if self.hide_at.is_some_and(|at| now >= at) {
            self.hide(doc)?;
        }
        Ok(())
    }

    fn revert_copied(&mut self, doc: &mut Document) -> Result<(), DomError> {
        self.revert_at = None;
        doc.remove_class(self.root, COPIED_CLASS)?;
        doc.set_attribute(self.copy_icon, "src", &self.icons.copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::label::build_label;
    use crate::page::clipboard::MemoryClipboard;

    const ADDR: &str = "0xAbCdEf0123456789abcdef0123456789abcdef01";

    fn setup() -> (Document, TooltipController, NodeId) {
        let mut doc = Document::new();
        let tooltip =
            TooltipController::new(&mut doc, &TooltipConfig::default(), &IconConfig::default())
                .unwrap();
        let label = build_label(&mut doc, ADDR, "Alice", "icon").unwrap();
        let body = doc.body();
        doc.append_child(body, label).unwrap();
        doc.set_rect(label, Rect::new(500.0, 300.0, 60.0, 18.0)).unwrap();
        (doc, tooltip, label)
    }

    #[test]
    fn test_place_above_when_room() {
        let at = place_tooltip(
            Rect::new(500.0, 300.0, 60.0, 18.0),
            Size::new(200.0, 30.0),
            Viewport::default(),
            8.0,
        );
        assert_eq!(at, Point { x: 430.0, y: 262.0 });
    }

    #[test]
    fn test_place_flips_below_near_top() {
        let at = place_tooltip(
            Rect::new(500.0, 10.0, 60.0, 18.0),
            Size::new(200.0, 30.0),
            Viewport::default(),
            8.0,
        );
        assert_eq!(at.y, 36.0);
    }

    #[test]
    fn test_place_clamps_horizontally_and_adds_scroll() {
        let viewport = Viewport {
            width: 800.0,
            height: 600.0,
            scroll_x: 0.0,
            scroll_y: 1000.0,
        };
        let left_edge = place_tooltip(Rect::new(0.0, 300.0, 20.0, 18.0), Size::new(200.0, 30.0), viewport, 8.0);
        assert_eq!(left_edge, Point { x: EDGE_MARGIN, y: 1262.0 });
        let right_edge = place_tooltip(Rect::new(790.0, 300.0, 10.0, 18.0), Size::new(200.0, 30.0), viewport, 8.0);
        assert_eq!(right_edge.x, 800.0 - 200.0 - EDGE_MARGIN);
    }

    #[test]
    fn test_show_then_grace_period_hide() {
        let (mut doc, mut tooltip, label) = setup();
        let t0 = Instant::now();
        tooltip.show(&mut doc, label, Viewport::default()).unwrap();
        assert!(tooltip.is_visible());
        assert_eq!(doc.style(tooltip.element(), "display"), Some("block"));
        assert_eq!(doc.text_content(tooltip.element()), ADDR);

        tooltip.schedule_hide(t0);
        tooltip.tick(&mut doc, t0 + Duration::from_millis(100)).unwrap();
        assert!(tooltip.is_visible());
        tooltip.tick(&mut doc, t0 + Duration::from_millis(300)).unwrap();
        assert!(!tooltip.is_visible());
        assert_eq!(doc.style(tooltip.element(), "display"), Some("none"));
    }

    #[test]
    fn test_reentering_cancels_hide() {
        let (mut doc, mut tooltip, label) = setup();
        let t0 = Instant::now();
        tooltip.show(&mut doc, label, Viewport::default()).unwrap();
        tooltip.schedule_hide(t0);
        tooltip.cancel_hide();
        tooltip.tick(&mut doc, t0 + Duration::from_secs(1)).unwrap();
        assert!(tooltip.is_visible());
    }

    #[test]
    fn test_copy_feedback_reverts() {
        let (mut doc, mut tooltip, label) = setup();
        let mut clipboard = MemoryClipboard::new();
        let t0 = Instant::now();
        tooltip.show(&mut doc, label, Viewport::default()).unwrap();

        assert!(tooltip.copy(&mut doc, &mut clipboard, t0).unwrap());
        assert_eq!(clipboard.contents().as_deref(), Some(ADDR));
        assert!(doc.has_class(tooltip.element(), COPIED_CLASS));
        assert_eq!(doc.attribute(tooltip.copy_icon, "src"), Some("icons/copied.svg"));

        tooltip.tick(&mut doc, t0 + Duration::from_millis(1999)).unwrap();
        assert!(tooltip.is_copied());
        tooltip.tick(&mut doc, t0 + Duration::from_secs(2)).unwrap();
        assert!(!tooltip.is_copied());
        assert!(!doc.has_class(tooltip.element(), COPIED_CLASS));
        assert_eq!(doc.attribute(tooltip.copy_icon, "src"), Some("icons/copy.svg"));
    }

    #[test]
    fn test_failed_copy_shows_no_feedback() {
        let (mut doc, mut tooltip, label) = setup();
        let mut clipboard = MemoryClipboard::failing();
        tooltip.show(&mut doc, label, Viewport::default()).unwrap();
        assert!(!tooltip.copy(&mut doc, &mut clipboard, Instant::now()).unwrap());
        assert!(!tooltip.is_copied());
        assert!(!doc.has_class(tooltip.element(), COPIED_CLASS));
    }

    #[test]
    fn test_copy_without_anchor_does_nothing() {
        let (mut doc, mut tooltip, _) = setup();
        let mut clipboard = MemoryClipboard::new();
        assert!(!tooltip.copy(&mut doc, &mut clipboard, Instant::now()).unwrap());
        assert_eq!(clipboard.contents(), None);
    }
}
