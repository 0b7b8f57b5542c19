//! "Add nickname" flow for addresses the user selects on the page
//!
//! A strictly valid selection first shows a small trigger button; activating
//! it opens the popup form. Nothing is written until the user confirms.

use crate::core::label::mark_extension_ui;
use crate::domain::{classify_exact, normalize, AddressFamily};
use crate::dom::{Document, DomError, NodeId, Rect, Viewport};

pub const POPUP_ID: &str = "address-label-popup";
pub const TRIGGER_CLASS: &str = "address-label-trigger";

/// Offset of the popup below the selection, in pixels
const POPUP_OFFSET: f64 = 10.0;
const TRIGGER_OFFSET: f64 = 4.0;

/// Current text selection as reported by the host
#[derive(Debug, Clone, PartialEq)]
pub struct TextSelection {
    pub text: String,
    /// Bounding box of the selection, viewport coordinates
    pub rect: Rect,
}

impl TextSelection {
    pub fn new(text: impl Into<String>, rect: Rect) -> Self {
        Self {
            text: text.into(),
            rect,
        }
    }
}

/// Address awaiting a nickname while the trigger or popup is open
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSelection {
    pub address: String,
    pub key: String,
    pub family: AddressFamily,
    pub rect: Rect,
}

/// Nickname the user confirmed in the popup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedNickname {
    pub address: String,
    pub key: String,
    pub nickname: String,
}

#[derive(Debug, Clone, PartialEq)]
enum Affordance {
    Closed,
    Trigger(PendingSelection),
    Popup(PendingSelection),
}

/// What a click inside the selection UI hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionTarget {
    Trigger,
    Save,
    Close,
    /// Anywhere else inside the popup
    Popup,
    Outside,
}

#[derive(Debug)]
pub struct SelectionCaptureController {
    trigger: NodeId,
    popup: NodeId,
    name_input: NodeId,
    address_input: NodeId,
    family_hint: NodeId,
    save_button: NodeId,
    close_button: NodeId,
    state: Affordance,
}

impl SelectionCaptureController {
    /// Build the hidden trigger and popup and attach them to the page body.
    pub fn new(doc: &mut Document) -> Result<Self, DomError> {
        let trigger = doc.create_element("button");
        doc.add_class(trigger, TRIGGER_CLASS)?;
        mark_extension_ui(doc, trigger)?;
        doc.set_attribute(trigger, "title", "Add address label")?;
        doc.set_style(trigger, "position", "absolute")?;
        doc.set_style(trigger, "display", "none")?;
        let trigger_text = doc.create_text("+ Label");
        doc.append_child(trigger, trigger_text)?;

        let popup = doc.create_element("div");
        doc.set_attribute(popup, "id", POPUP_ID)?;
        mark_extension_ui(doc, popup)?;
        doc.set_style(popup, "position", "absolute")?;
        doc.set_style(popup, "display", "none")?;

        let close_button = doc.create_element("button");
        doc.add_class(close_button, "close-btn")?;
        doc.set_attribute(close_button, "aria-label", "Close")?;
        let close_text = doc.create_text("\u{00d7}");
        doc.append_child(close_button, close_text)?;

        let heading = doc.create_element("h3");
        let heading_text = doc.create_text("Add Address Label");
        doc.append_child(heading, heading_text)?;

        let family_hint = doc.create_element("div");
        doc.add_class(family_hint, "address-label-family")?;
        let hint_text = doc.create_text("");
        doc.append_child(family_hint, hint_text)?;

        let name_input = doc.create_element("input");
        doc.set_attribute(name_input, "type", "text")?;
        doc.set_attribute(name_input, "id", "address-label-name")?;
        doc.set_attribute(name_input, "placeholder", "Enter nickname")?;
        doc.set_attribute(name_input, "value", "")?;

        let address_input = doc.create_element("input");
        doc.set_attribute(address_input, "type", "hidden")?;
        doc.set_attribute(address_input, "id", "address-label-addr")?;
        doc.set_attribute(address_input, "value", "")?;

        let save_button = doc.create_element("button");
        doc.set_attribute(save_button, "id", "address-label-save")?;
        let save_text = doc.create_text("Save");
        doc.append_child(save_button, save_text)?;

        for child in [
            close_button,
            heading,
            family_hint,
            name_input,
            address_input,
            save_button,
        ] {
            doc.append_child(popup, child)?;
        }

        let body = doc.body();
        doc.append_child(body, trigger)?;
        doc.append_child(body, popup)?;

        Ok(Self {
            trigger,
            popup,
            name_input,
            address_input,
            family_hint,
            save_button,
            close_button,
            state: Affordance::Closed,
        })
    }

    pub fn popup(&self) -> NodeId {
        self.popup
    }

    pub fn trigger(&self) -> NodeId {
        self.trigger
    }

    pub fn name_input(&self) -> NodeId {
        self.name_input
    }

    pub fn pending(&self) -> Option<&PendingSelection> {
        match &self.state {
            Affordance::Closed => None,
            Affordance::Trigger(pending) | Affordance::Popup(pending) => Some(pending),
        }
    }

    pub fn is_trigger_shown(&self) -> bool {
        matches!(self.state, Affordance::Trigger(_))
    }

    pub fn is_popup_open(&self) -> bool {
        matches!(self.state, Affordance::Popup(_))
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, Affordance::Closed)
    }

    pub fn target_of(&self, doc: &Document, node: NodeId) -> SelectionTarget {
        if doc.contains(self.trigger, node) {
            SelectionTarget::Trigger
        } else if doc.contains(self.save_button, node) {
            SelectionTarget::Save
        } else if doc.contains(self.close_button, node) {
            SelectionTarget::Close
        } else if doc.contains(self.popup, node) {
            SelectionTarget::Popup
        } else {
            SelectionTarget::Outside
        }
    }

    /// React to the pointer being released somewhere on the page.
    ///
    /// Releases inside the trigger or popup are ignored. An empty or
    /// non-address selection closes whatever is open.
    pub fn on_pointer_up(
        &mut self,
        doc: &mut Document,
        target: NodeId,
        selection: Option<&TextSelection>,
        viewport: Viewport,
    ) -> Result<(), DomError> {
        if self.target_of(doc, target) != SelectionTarget::Outside {
            return Ok(());
        }

        let text = selection.map(|s| s.text.trim()).unwrap_or_default();
        let Some(family) = classify_exact(text) else {
            return self.close(doc);
        };
        let Some(selection) = selection else {
            return self.close(doc);
        };

        let pending = PendingSelection {
            address: text.to_string(),
            key: normalize(text),
            family,
            rect: selection.rect,
        };
        self.hide_popup(doc)?;
        let at = viewport.to_page(selection.rect.right(), selection.rect.bottom() + TRIGGER_OFFSET);
        doc.set_style(self.trigger, "left", &format!("{}px", at.x))?;
        doc.set_style(self.trigger, "top", &format!("{}px", at.y))?;
        doc.set_style(self.trigger, "display", "block")?;
        self.state = Affordance::Trigger(pending);
        Ok(())
    }

    /// Turn the trigger into the popup form, prefilled with `existing`.
    ///
    /// Returns false when there is no pending selection.
    pub fn open_popup(
        &mut self,
        doc: &mut Document,
        existing: Option<&str>,
        viewport: Viewport,
    ) -> Result<bool, DomError> {
        let pending = match std::mem::replace(&mut self.state, Affordance::Closed) {
            Affordance::Trigger(pending) | Affordance::Popup(pending) => pending,
            Affordance::Closed => return Ok(false),
        };

        doc.set_style(self.trigger, "display", "none")?;
        doc.set_attribute(self.address_input, "value", &pending.address)?;
        doc.set_attribute(self.name_input, "value", existing.unwrap_or_default())?;
        if let Some(hint) = doc.children(self.family_hint).first().copied() {
            doc.set_text(hint, &format!("{} address", pending.family))?;
        }

        let at = viewport.to_page(pending.rect.left(), pending.rect.bottom() + POPUP_OFFSET);
        doc.set_style(self.popup, "top", &format!("{}px", at.y))?;
        doc.set_style(self.popup, "left", &format!("{}px", at.x))?;
        doc.set_style(self.popup, "display", "block")?;
        self.state = Affordance::Popup(pending);
        Ok(true)
    }

    /// Host-side typing into the nickname field.
    pub fn set_nickname_input(&mut self, doc: &mut Document, value: &str) -> Result<(), DomError> {
        doc.set_attribute(self.name_input, "value", value)
    }

    pub fn nickname_input(&self, doc: &Document) -> String {
        doc.attribute(self.name_input, "value")
            .unwrap_or_default()
            .to_string()
    }

    /// The nickname to save, if the popup is open and the field is not blank.
    ///
    /// The popup stays open; the caller closes it once the write succeeded.
    pub fn confirm(&self, doc: &Document) -> Option<ConfirmedNickname> {
        let Affordance::Popup(pending) = &self.state else {
            return None;
        };
        let nickname = self.nickname_input(doc).trim().to_string();
        if nickname.is_empty() {
            return None;
        }
        Some(ConfirmedNickname {
            address: pending.address.clone(),
            key: pending.key.clone(),
            nickname,
        })
    }

    /// Close the trigger and popup, discarding the pending selection.
    pub fn close(&mut self, doc: &mut Document) -> Result<(), DomError> {
        self.state = Affordance::Closed;
        doc.set_style(self.trigger, "display", "none")?;
        self.hide_popup(doc)
    }

    fn hide_popup(&mut self, doc: &mut Document) -> Result<(), DomError> {
        doc.set_style(self.popup, "display", "none")?;
        doc.set_attribute(self.name_input, "value", "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENESIS: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";
    const EVM_MIXED: &str = "0xABCDEF0123456789abcdef0123456789ABCDEF01";

    fn setup() -> (Document, SelectionCaptureController, NodeId) {
        let mut doc = Document::new();
        let controller = SelectionCaptureController::new(&mut doc).unwrap();
        let p = doc.create_element("p");
        let body = doc.body();
        doc.append_child(body, p).unwrap();
        (doc, controller, p)
    }

    fn selection(text: &str) -> TextSelection {
        TextSelection::new(text, Rect::new(100.0, 200.0, 240.0, 16.0))
    }

    #[test]
    fn test_valid_selection_shows_trigger() {
        let (mut doc, mut ctl, p) = setup();
        ctl.on_pointer_up(&mut doc, p, Some(&selection(&format!(" {EVM_MIXED} "))), Viewport::default())
            .unwrap();
        assert!(ctl.is_trigger_shown());
        let pending = ctl.pending().unwrap();
        assert_eq!(pending.address, EVM_MIXED);
        assert_eq!(pending.key, EVM_MIXED.to_lowercase());
        assert_eq!(pending.family, AddressFamily::Evm);
        assert_eq!(doc.style(ctl.trigger(), "display"), Some("block"));
        assert_eq!(doc.style(ctl.trigger(), "left"), Some("340px"));
        assert_eq!(doc.style(ctl.trigger(), "top"), Some("220px"));
    }

    #[test]
    fn test_partial_or_empty_selection_closes() {
        let (mut doc, mut ctl, p) = setup();
        ctl.on_pointer_up(&mut doc, p, Some(&selection(GENESIS)), Viewport::default())
            .unwrap();
        assert!(ctl.is_open());

        ctl.on_pointer_up(&mut doc, p, Some(&selection(&format!("to {GENESIS}"))), Viewport::default())
            .unwrap();
        assert!(!ctl.is_open());

        ctl.on_pointer_up(&mut doc, p, Some(&selection(GENESIS)), Viewport::default())
            .unwrap();
        ctl.on_pointer_up(&mut doc, p, None, Viewport::default()).unwrap();
        assert!(!ctl.is_open());
        assert_eq!(doc.style(ctl.trigger(), "display"), Some("none"));
    }

    #[test]
    fn test_popup_opens_prefilled_and_positioned() {
        let (mut doc, mut ctl, p) = setup();
        let viewport = Viewport {
            scroll_y: 50.0,
            ..Viewport::default()
        };
        ctl.on_pointer_up(&mut doc, p, Some(&selection(GENESIS)), viewport)
            .unwrap();
        assert!(ctl.open_popup(&mut doc, Some("Genesis"), viewport).unwrap());
        assert!(ctl.is_popup_open());
        assert_eq!(ctl.nickname_input(&doc), "Genesis");
        assert_eq!(doc.style(ctl.popup(), "top"), Some("276px"));
        assert_eq!(doc.style(ctl.popup(), "left"), Some("100px"));
        assert_eq!(doc.style(ctl.trigger(), "display"), Some("none"));
        assert!(doc.text_content(ctl.popup()).contains("Bitcoin address"));
    }

    #[test]
    fn test_pointer_up_inside_popup_is_ignored() {
        let (mut doc, mut ctl, p) = setup();
        ctl.on_pointer_up(&mut doc, p, Some(&selection(GENESIS)), Viewport::default())
            .unwrap();
        ctl.open_popup(&mut doc, None, Viewport::default()).unwrap();
        let input = ctl.name_input();
        ctl.on_pointer_up(&mut doc, input, None, Viewport::default()).unwrap();
        assert!(ctl.is_popup_open());
    }

    #[test]
    fn test_confirm_requires_nickname() {
        let (mut doc, mut ctl, p) = setup();
        ctl.on_pointer_up(&mut doc, p, Some(&selection(EVM_MIXED)), Viewport::default())
            .unwrap();
        assert_eq!(ctl.confirm(&doc), None);
        ctl.open_popup(&mut doc, None, Viewport::default()).unwrap();
        ctl.set_nickname_input(&mut doc, "   ").unwrap();
        assert_eq!(ctl.confirm(&doc), None);

        ctl.set_nickname_input(&mut doc, " Treasury ").unwrap();
        assert_eq!(
            ctl.confirm(&doc),
            Some(ConfirmedNickname {
                address: EVM_MIXED.to_string(),
                key: EVM_MIXED.to_lowercase(),
                nickname: "Treasury".to_string(),
            })
        );
    }

    #[test]
    fn test_open_popup_without_pending_selection() {
        let (mut doc, mut ctl, _) = setup();
        assert!(!ctl.open_popup(&mut doc, None, Viewport::default()).unwrap());
        assert!(!ctl.is_open());
    }

    #[test]
    fn test_target_classification() {
        let (doc, ctl, p) = setup();
        assert_eq!(ctl.target_of(&doc, ctl.trigger()), SelectionTarget::Trigger);
        assert_eq!(ctl.target_of(&doc, ctl.name_input()), SelectionTarget::Popup);
        assert_eq!(ctl.target_of(&doc, p), SelectionTarget::Outside);
    }
}
