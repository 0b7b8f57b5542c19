//! Incremental rescans driven by page mutations

use tracing::trace;

use super::label::{enclosing_extension_ui, enclosing_label};
use super::rewriter::{DomRewriter, ScanReport};
use crate::dom::{Document, MutationRecord};
use crate::store::NicknameCache;

/// Scans only the element subtrees the page inserted since the last drain.
#[derive(Debug, Default, Clone, Copy)]
pub struct MutationWatcher;

impl MutationWatcher {
    /// Subscribe to child-list changes under the document root.
    pub fn start(doc: &mut Document) -> Self {
        doc.observe(true);
        Self
    }

    /// Drain queued mutation records and scan each added element.
    pub fn process(
        &self,
        doc: &mut Document,
        rewriter: &DomRewriter,
        cache: &NicknameCache,
    ) -> ScanReport {
        let records = doc.take_records();
        self.process_records(doc, &records, rewriter, cache)
    }

    pub fn process_records(
        &self,
        doc: &mut Document,
        records: &[MutationRecord],
        rewriter: &DomRewriter,
        cache: &NicknameCache,
    ) -> ScanReport {
        let mut report = ScanReport::default();
        for added in records.iter().flat_map(|record| record.added.iter().copied()) {
            if !doc.is_element(added) || !doc.is_connected(added) {
                continue;
            }
            // Our own insertions (labels, tooltip, popup) need no scan.
            if enclosing_label(doc, added).is_some() || enclosing_extension_ui(doc, added).is_some() {
                continue;
            }
            trace!(node = %added, "scanning inserted subtree");
            report += rewriter.scan(doc, added, cache);
        }
        report
    }
}
