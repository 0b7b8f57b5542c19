//! Plain-text scanning for the `scan` subcommand
//!
//! Input text becomes a page with one `<p>` per line; after a full scan the
//! page is rendered back either as text (labels show their nickname) or as
//! HTML.

use crate::core::label::{displayed_nickname, is_extension_ui, is_label};
use crate::dom::{Document, DomError, NodeId};

pub fn document_from_text(text: &str) -> Result<Document, DomError> {
    let mut doc = Document::new();
    let body = doc.body();
    for line in text.lines() {
        let paragraph = doc.create_element("p");
        if !line.is_empty() {
            let run = doc.create_text(line);
            doc.append_child(paragraph, run)?;
        }
        doc.append_child(body, paragraph)?;
    }
    Ok(doc)
}

/// Page text with every label replaced by its nickname, one line per
/// top-level block. Injected tooltip and popup markup is left out.
pub fn render_text(doc: &Document) -> String {
    let mut lines = Vec::new();
    for paragraph in doc.children(doc.body()) {
        if is_extension_ui(doc, *paragraph) {
            continue;
        }
        let mut line = String::new();
        push_text(doc, *paragraph, &mut line);
        lines.push(line);
    }
    lines.join("\n")
}

fn push_text(doc: &Document, id: NodeId, out: &mut String) {
    if let Some(text) = doc.text(id) {
        out.push_str(text);
        return;
    }
    if is_label(doc, id) {
        out.push_str(&displayed_nickname(doc, id));
        return;
    }
    for child in doc.children(id) {
        push_text(doc, *child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DomRewriter;
    use crate::store::{NicknameCache, NicknameMap};

    #[test]
    fn test_labels_render_as_nicknames_line_by_line() {
        let input = "paid 0xAb5801a7D398351b8bE11C439e05C5B3259aeC9B today\n\nno address here";
        let mut doc = document_from_text(input).unwrap();
        let mut cache = NicknameCache::new();
        cache.replace(NicknameMap::from([(
            "0xab5801a7d398351b8be11c439e05c5b3259aec9b".to_string(),
            "Alice".to_string(),
        )]));

        let report = DomRewriter::new(["SCRIPT"], "icon.png").scan_document(&mut doc, &cache);
        assert_eq!(report.labels_created, 1);
        assert_eq!(render_text(&doc), "paid Alice today\n\nno address here");
    }

    #[test]
    fn test_unscanned_text_renders_unchanged() {
        let doc = document_from_text("a\nb").unwrap();
        assert_eq!(render_text(&doc), "a\nb");
    }
}
