//! Text-node rewriting: address runs become nickname labels

use std::ops::AddAssign;

use tracing::{debug, warn};

use super::label::{build_label, is_extension_ui, is_label};
use crate::config::Config;
use crate::domain::{contains_address, find_addresses};
use crate::dom::{Document, DomError, NodeId};
use crate::store::NicknameCache;

/// Outcome of one scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Text nodes that passed the skip rules and contained an address shape
    pub text_nodes_examined: usize,
    pub labels_created: usize,
    /// Text nodes whose replacement failed and were left untouched
    pub failures: usize,
}

impl AddAssign for ScanReport {
    fn add_assign(&mut self, other: Self) {
        self.text_nodes_examined += other.text_nodes_examined;
        self.labels_created += other.labels_created;
        self.failures += other.failures;
    }
}

/// Piece of a rewritten text node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Label { address: &'a str, nickname: String },
}

/// Split `text` into plain runs and labels for every address `lookup` knows.
///
/// Unknown address shapes stay inside the surrounding plain run, so
/// concatenating the plain runs and label addresses gives back `text`.
pub fn plan_segments<'a, F>(text: &'a str, lookup: F) -> Vec<Segment<'a>>
where
    F: Fn(&str) -> Option<String>,
{
    let mut segments = Vec::new();
    let mut plain_start = 0;
    for found in find_addresses(text) {
        let address = found.as_str(text);
        let Some(nickname) = lookup(address) else {
            continue;
        };
        if plain_start < found.start {
            segments.push(Segment::Text(&text[plain_start..found.start]));
        }
        segments.push(Segment::Label { address, nickname });
        plain_start = found.end;
    }
    if segments.is_empty() {
        return segments;
    }
    if plain_start < text.len() {
        segments.push(Segment::Text(&text[plain_start..]));
    }
    segments
}

#[derive(Debug, Clone)]
pub struct DomRewriter {
    ignore_tags: Vec<String>,
    label_icon: String,
}

impl DomRewriter {
    pub fn new<I, S>(ignore_tags: I, label_icon: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            ignore_tags: ignore_tags
                .into_iter()
                .map(|tag| tag.as_ref().to_ascii_uppercase())
                .collect(),
            label_icon: label_icon.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.ignore_tags, config.icons.label.clone())
    }

    pub fn label_icon(&self) -> &str {
        &self.label_icon
    }

    fn is_ignored_tag(&self, doc: &Document, id: NodeId) -> bool {
        doc.tag_name(id)
            .is_some_and(|tag| self.ignore_tags.iter().any(|ignored| ignored == tag))
    }

    /// Label every known address under `root`, in document order.
    ///
    /// Does nothing until the cache holds a map. Text already inside a label,
    /// injected UI, an ignored element, or an editable region is skipped, so
    /// scanning the same subtree again changes nothing.
    pub fn scan(&self, doc: &mut Document, root: NodeId, cache: &NicknameCache) -> ScanReport {
        if !cache.is_loaded() {
            debug!(%root, "nickname map not loaded yet, skipping scan");
            return ScanReport::default();
        }
        if self.is_ignored_tag(doc, root) {
            return ScanReport::default();
        }

        let view: &Document = doc;
        let candidates: Vec<NodeId> = view
            .descendants(root)
            .into_iter()
            .filter(|id| self.accepts(view, *id))
            .collect();

        let report = self.rewrite_nodes(doc, &candidates, cache);
        if report.labels_created > 0 || report.failures > 0 {
            debug!(
                %root,
                examined = report.text_nodes_examined,
                created = report.labels_created,
                failures = report.failures,
                "scan finished"
            );
        }
        report
    }

    /// Rewrite each candidate text node. A node that cannot be replaced is
    /// counted as a failure and left as it is; the rest are still rewritten.
    pub(crate) fn rewrite_nodes(
        &self,
        doc: &mut Document,
        nodes: &[NodeId],
        cache: &NicknameCache,
    ) -> ScanReport {
        let mut report = ScanReport::default();
        for &node in nodes {
            report.text_nodes_examined += 1;
            match self.rewrite_text_node(doc, node, cache) {
                Ok(created) => report.labels_created += created,
                Err(err) => {
                    warn!(%node, "address replacement skipped: {err}");
                    report.failures += 1;
                }
            }
        }
        report
    }

    /// Full scan of the page body.
    pub fn scan_document(&self, doc: &mut Document, cache: &NicknameCache) -> ScanReport {
        let root = doc.body();
        self.scan(doc, root, cache)
    }

    fn accepts(&self, doc: &Document, id: NodeId) -> bool {
        let Some(text) = doc.text(id) else {
            return false;
        };
        let excluded = doc
            .closest(id, |doc, el| {
                is_label(doc, el) || is_extension_ui(doc, el) || self.is_ignored_tag(doc, el)
            })
            .is_some();
        !excluded && !doc.is_content_editable(id) && contains_address(text)
    }

    fn rewrite_text_node(
        &self,
        doc: &mut Document,
        node: NodeId,
        cache: &NicknameCache,
    ) -> Result<usize, DomError> {
        let text = doc.text(node).ok_or(DomError::NotText(node))?.to_string();
        if doc.parent(node).is_none() {
            return Err(DomError::Detached(node));
        }
        let segments = plan_segments(&text, |address| cache.lookup(address).map(str::to_string));
        if segments.is_empty() {
            return Ok(0);
        }

        let mut replacements = Vec::with_capacity(segments.len());
        let mut created = 0;
        for segment in &segments {
            let id = match segment {
                Segment::Text(run) => doc.create_text(run),
                Segment::Label { address, nickname } => {
                    created += 1;
                    build_label(doc, address, nickname, &self.label_icon)?
                }
            };
            replacements.push(id);
        }
        doc.replace_with_nodes(node, &replacements)?;
        Ok(created)
    }
}
