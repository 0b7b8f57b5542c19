//! Replacement label nodes and extension UI markers
//!
//! A label looks like:
//!
//! ```text
//! <span class="address-label-replaced" data-original-address="0xAbC…">
//!   <img class="address-label-icon" src="icons/icon16.png">Alice
//! </span>
//! ```
//!
//! It is always built node by node; nicknames and addresses only ever land in
//! text nodes and attribute values.

use crate::dom::{Document, DomError, NodeId};

pub const LABEL_CLASS: &str = "address-label-replaced";
pub const LABEL_ICON_CLASS: &str = "address-label-icon";
pub const ORIGINAL_ADDRESS_ATTR: &str = "data-original-address";

/// Marks elements injected by the page features (tooltip, trigger, popup).
pub const UI_MARKER_ATTR: &str = "data-address-label-ui";

pub fn build_label(
    doc: &mut Document,
    address: &str,
    nickname: &str,
    icon_src: &str,
) -> Result<NodeId, DomError> {
    let label = doc.create_element("span");
    doc.add_class(label, LABEL_CLASS)?;
    doc.set_attribute(label, ORIGINAL_ADDRESS_ATTR, address)?;
    render_label_content(doc, label, nickname, icon_src)?;
    Ok(label)
}

/// Rebuild the visible content (icon + nickname) of an existing label.
pub fn render_label_content(
    doc: &mut Document,
    label: NodeId,
    nickname: &str,
    icon_src: &str,
) -> Result<(), DomError> {
    doc.clear_children(label)?;
    let icon = doc.create_element("img");
    doc.add_class(icon, LABEL_ICON_CLASS)?;
    doc.set_attribute(icon, "src", icon_src)?;
    doc.set_attribute(icon, "alt", "")?;
    let name = doc.create_text(nickname);
    doc.append_child(label, icon)?;
    doc.append_child(label, name)?;
    Ok(())
}

pub fn is_label(doc: &Document, id: NodeId) -> bool {
    doc.has_class(id, LABEL_CLASS)
}

/// The label containing `id`, if any (`id` itself included).
pub fn enclosing_label(doc: &Document, id: NodeId) -> Option<NodeId> {
    doc.closest(id, is_label)
}

pub fn original_address(doc: &Document, label: NodeId) -> Option<&str> {
    doc.attribute(label, ORIGINAL_ADDRESS_ATTR)
}

/// Nickname currently displayed by a label.
pub fn displayed_nickname(doc: &Document, label: NodeId) -> String {
    doc.children(label)
        .iter()
        .filter_map(|child| doc.text(*child))
        .collect()
}

pub fn mark_extension_ui(doc: &mut Document, id: NodeId) -> Result<(), DomError> {
    doc.set_attribute(id, UI_MARKER_ATTR, "")
}

pub fn is_extension_ui(doc: &Document, id: NodeId) -> bool {
    doc.has_attribute(id, UI_MARKER_ATTR)
}

/// The injected UI element containing `id`, if any.
pub fn enclosing_extension_ui(doc: &Document, id: NodeId) -> Option<NodeId> {
    doc.closest(id, is_extension_ui)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::to_html;

    #[test]
    fn test_label_markup_is_structural() {
        let mut doc = Document::new();
        let label = build_label(
            &mut doc,
            "0xAbCdEf0123456789abcdef0123456789abcdef01",
            "<b>Mallory</b>",
            "icons/icon16.png",
        )
        .unwrap();
        assert_eq!(
            to_html(&doc, label),
            "<span class=\"address-label-replaced\" \
             data-original-address=\"0xAbCdEf0123456789abcdef0123456789abcdef01\">\
             <img class=\"address-label-icon\" alt=\"\" src=\"icons/icon16.png\">\
             &lt;b&gt;Mallory&lt;/b&gt;</span>"
        );
        assert_eq!(displayed_nickname(&doc, label), "<b>Mallory</b>");
    }

    #[test]
    fn test_rerender_replaces_content() {
        let mut doc = Document::new();
        let label = build_label(&mut doc, "addr", "Old", "icon").unwrap();
        render_label_content(&mut doc, label, "New", "icon").unwrap();
        assert_eq!(doc.children(label).len(), 2);
        assert_eq!(displayed_nickname(&doc, label), "New");
        assert_eq!(original_address(&doc, label), Some("addr"));
    }

    #[test]
    fn test_enclosing_label_walks_up() {
        let mut doc = Document::new();
        let label = build_label(&mut doc, "addr", "Nick", "icon").unwrap();
        let text = doc.children(label)[1];
        assert_eq!(enclosing_label(&doc, text), Some(label));
        let other = doc.create_text("x");
        assert_eq!(enclosing_label(&doc, other), None);
    }
}
