//! Keeps existing labels in step with the nickname map

use tracing::{debug, warn};

use super::label::{original_address, render_label_content, LABEL_CLASS};
use super::rewriter::{DomRewriter, ScanReport};
use crate::dom::Document;
use crate::store::NicknameCache;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Labels re-rendered with the current nickname
    pub refreshed: usize,
    /// Labels whose key is no longer mapped; left showing the old nickname
    pub stale: usize,
    pub failures: usize,
    /// Follow-up full scan for addresses that gained a nickname
    pub scan: ScanReport,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ReplacementRefresher;

impl ReplacementRefresher {
    /// React to a nickname map change already applied to `cache`.
    ///
    /// Labels are rebuilt in place rather than rescanned. A label whose key
    /// was removed is not turned back into plain text.
    pub fn on_map_changed(
        &self,
        doc: &mut Document,
        rewriter: &DomRewriter,
        cache: &NicknameCache,
    ) -> RefreshReport {
        let mut report = RefreshReport::default();
        for label in doc.elements_by_class(LABEL_CLASS) {
            let Some(address) = original_address(doc, label).map(str::to_string) else {
                report.stale += 1;
                continue;
            };
            let Some(nickname) = cache.lookup(&address) else {
                report.stale += 1;
                continue;
            };
            match render_label_content(doc, label, nickname, rewriter.label_icon()) {
                Ok(()) => report.refreshed += 1,
                Err(err) => {
                    warn!(%label, "label refresh skipped: {err}");
                    report.failures += 1;
                }
            }
        }

        report.scan = rewriter.scan_document(doc, cache);
        debug!(
            refreshed = report.refreshed,
            stale = report.stale,
            created = report.scan.labels_created,
            "labels refreshed"
        );
        report
    }
}
