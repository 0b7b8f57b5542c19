//! HTML serialization of a document subtree
//!
//! Output is deterministic: class first, then attributes in name order, then
//! inline style. All text and attribute values are escaped.

use super::document::{Document, NodeId, NodeKind};

const VOID_TAGS: &[&str] = &["AREA", "BR", "HR", "IMG", "INPUT", "META", "LINK"];

/// Serialize `id` and its subtree.
pub fn to_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, id, &mut out);
    out
}

/// Serialize only the children of `id`.
pub fn inner_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    for child in doc.children(id) {
        write_node(doc, *child, &mut out);
    }
    out
}

fn write_node(doc: &Document, id: NodeId, out: &mut String) {
    match doc.kind(id) {
        Some(NodeKind::Document) => {
            for child in doc.children(id) {
                write_node(doc, *child, out);
            }
        }
        Some(NodeKind::Text(text)) => out.push_str(&escape_text(text)),
        Some(NodeKind::Element(el)) => {
            let tag = el.tag.to_ascii_lowercase();
            out.push('<');
            out.push_str(&tag);
            if !el.classes.is_empty() {
                push_attr(out, "class", &el.classes.join(" "));
            }
            for (name, value) in &el.attributes {
                push_attr(out, name, value);
            }
            if !el.style.is_empty() {
                let style = el
                    .style
                    .iter()
                    .map(|(k, v)| format!("{k}: {v}"))
                    .collect::<Vec<_>>()
                    .join("; ");
                push_attr(out, "style", &style);
            }
            out.push('>');
            if VOID_TAGS.contains(&el.tag.as_str()) {
                return;
            }
            for child in doc.children(id) {
                write_node(doc, *child, out);
            }
            out.push_str("</");
            out.push_str(&tag);
            out.push('>');
        }
        None => {}
    }
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&escape_attr(value));
    out.push('"');
}

pub fn escape_text(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

/// Escape for a double-quoted attribute value.
pub fn escape_attr(text: &str) -> String {
    html_escape::encode_double_quoted_attribute(text).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escapes_markup_in_text_and_attributes() {
        let mut doc = Document::new();
        let span = doc.create_element("span");
        doc.set_attribute(span, "title", "\"x\" & <y>").unwrap();
        doc.add_class(span, "label").unwrap();
        let text = doc.create_text("<img src=x onerror=alert(1)>");
        doc.append_child(span, text).unwrap();
        assert_eq!(
            to_html(&doc, span),
            "<span class=\"label\" title=\"&quot;x&quot; &amp; &lt;y&gt;\">\
             &lt;img src=x onerror=alert(1)&gt;</span>"
        );
    }

    #[test]
    fn test_void_elements_have_no_closing_tag() {
        let mut doc = Document::new();
        let img = doc.create_element("img");
        doc.set_attribute(img, "src", "icons/icon16.png").unwrap();
        doc.append_child(doc.body(), img).unwrap();
        assert_eq!(
            inner_html(&doc, doc.body()),
            "<img src=\"icons/icon16.png\">"
        );
    }
}
