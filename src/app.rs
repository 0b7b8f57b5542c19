//! Page session: the content script for one page
//!
//! Every trigger (initial load, store notification, DOM mutation, pointer or
//! keyboard input, timer tick) is handled to completion before the next one
//! starts. Nothing runs in parallel and nothing is cancelled.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, trace, warn};

use crate::config::Config;
use crate::core::label::enclosing_label;
use crate::core::{DomRewriter, MutationWatcher, RefreshReport, ReplacementRefresher, ScanReport};
use crate::dom::{Document, NodeId, Viewport};
use crate::page::{
    Clipboard, SelectionCaptureController, SelectionTarget, TextSelection, TooltipController,
};
use crate::store::{upsert_nickname, MapChange, NicknameCache, NicknameMap, NicknameStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
    Other,
}

/// Input delivered to the page session
#[derive(Debug, Clone)]
pub enum PageEvent {
    /// The page changed its DOM; queued mutation records are waiting.
    DomMutated,
    /// The nickname store reported a change.
    StoreChanged(MapChange),
    PointerEnter {
        target: NodeId,
    },
    PointerLeave {
        target: NodeId,
        /// Node the pointer moved onto, if any
        related: Option<NodeId>,
    },
    PointerUp {
        target: NodeId,
        selection: Option<TextSelection>,
    },
    Click {
        target: NodeId,
    },
    KeyDown {
        key: Key,
    },
    Tick,
}

/// What the host should do with the original input event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventOutcome {
    /// Default action (e.g. following a link around the label) suppressed
    pub default_prevented: bool,
}

impl EventOutcome {
    fn consumed() -> Self {
        Self {
            default_prevented: true,
        }
    }
}

pub struct PageSession {
    doc: Document,
    viewport: Viewport,
    cache: NicknameCache,
    rewriter: DomRewriter,
    watcher: MutationWatcher,
    refresher: ReplacementRefresher,
    tooltip: TooltipController,
    selection: SelectionCaptureController,
    store: Arc<dyn NicknameStore>,
    changes: broadcast::Receiver<MapChange>,
    clipboard: Box<dyn Clipboard>,
}

impl PageSession {
    /// Attach the page features to `doc`. The nickname map is not loaded
    /// until [`PageSession::init`] runs.
    pub fn new(
        mut doc: Document,
        store: Arc<dyn NicknameStore>,
        clipboard: Box<dyn Clipboard>,
        config: &Config,
    ) -> Result<Self> {
        let tooltip = TooltipController::new(&mut doc, &config.tooltip, &config.icons)?;
        let selection = SelectionCaptureController::new(&mut doc)?;
        let watcher = MutationWatcher::start(&mut doc);
        let changes = store.subscribe();
        Ok(Self {
            doc,
            viewport: Viewport::default(),
            cache: NicknameCache::new(),
            rewriter: DomRewriter::from_config(config),
            watcher,
            refresher: ReplacementRefresher,
            tooltip,
            selection,
            store,
            changes,
            clipboard,
        })
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Direct page access for the host. Structural changes made here are
    /// picked up by the next [`PageEvent::DomMutated`].
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn into_document(self) -> Document {
        self.doc
    }

    pub fn cache(&self) -> &NicknameCache {
        &self.cache
    }

    pub fn tooltip(&self) -> &TooltipController {
        &self.tooltip
    }

    pub fn selection(&self) -> &SelectionCaptureController {
        &self.selection
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Host-side typing into the popup's nickname field.
    pub fn type_nickname(&mut self, value: &str) -> Result<()> {
        self.selection.set_nickname_input(&mut self.doc, value)?;
        Ok(())
    }

    /// Load the nickname map and run the first full scan.
    ///
    /// Unreachable storage counts as an empty map.
    pub async fn init(&mut self) -> ScanReport {
        let map = match self.store.get().await {
            Ok(map) => map,
            Err(err) => {
                warn!("nickname storage unavailable, starting empty: {err:#}");
                NicknameMap::new()
            }
        };
        info!(entries = map.len(), "nickname map loaded");
        self.cache.replace(map);
        self.scan_page_insertions();
        let report = self.rewriter.scan_document(&mut self.doc, &self.cache);
        self.discard_own_records();
        report
    }

    /// Swap in a new map snapshot, refresh labels and rescan.
    pub fn apply_map(&mut self, map: NicknameMap) -> RefreshReport {
        if self.cache.replace(map) {
            debug!("nickname map populated by change notification");
        }
        self.scan_page_insertions();
        let report = self
            .refresher
            .on_map_changed(&mut self.doc, &self.rewriter, &self.cache);
        self.discard_own_records();
        report
    }

    /// Scan whatever the page inserted since the last drain.
    fn scan_page_insertions(&mut self) -> ScanReport {
        let report = self
            .watcher
            .process(&mut self.doc, &self.rewriter, &self.cache);
        self.discard_own_records();
        report
    }

    /// Drop the records queued by our own label writes. Only call this right
    /// after the page's records were drained and scanned.
    fn discard_own_records(&mut self) {
        let dropped = self.doc.take_records().len();
        if dropped > 0 {
            trace!(dropped, "discarded records of own rewrites");
        }
    }

    /// Apply every change notification received so far without waiting.
    ///
    /// Returns how many snapshots were applied.
    pub async fn pump_store_changes(&mut self) -> usize {
        let mut applied = 0;
        loop {
            match self.changes.try_recv() {
                Ok(change) => {
                    self.apply_map(change.new);
                    applied += 1;
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "missed nickname changes, reloading map");
                    if self.resync().await {
                        applied += 1;
                    }
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        applied
    }

    async fn resync(&mut self) -> bool {
        match self.store.get().await {
            Ok(map) => {
                self.apply_map(map);
                true
            }
            Err(err) => {
                warn!("nickname reload failed: {err:#}");
                false
            }
        }
    }

    pub async fn handle(&mut self, event: PageEvent, now: Instant) -> Result<EventOutcome> {
        match event {
            PageEvent::DomMutated => {
                self.scan_page_insertions();
            }
            PageEvent::StoreChanged(change) => {
                self.apply_map(change.new);
            }
            PageEvent::PointerEnter { target } => self.on_pointer_enter(target)?,
            PageEvent::PointerLeave { target, related } => {
                self.on_pointer_leave(target, related, now);
            }
            PageEvent::PointerUp { target, selection } => {
                self.selection.on_pointer_up(
                    &mut self.doc,
                    target,
                    selection.as_ref(),
                    self.viewport,
                )?;
            }
            PageEvent::Click { target } => return self.on_click(target, now).await,
            PageEvent::KeyDown { key } => return self.on_key(key).await,
            PageEvent::Tick => self.tooltip.tick(&mut self.doc, now)?,
        }
        Ok(EventOutcome::default())
    }

    /// Drive the session from a host event channel until it closes.
    ///
    /// Pending store notifications are applied before the next page event.
    pub async fn run(mut self, mut events: mpsc::Receiver<PageEvent>) -> Result<Self> {
        enum Input {
            Page(Option<PageEvent>),
            Store(Result<MapChange, RecvError>),
        }

        let mut store_open = true;
        loop {
            let input = tokio::select! {
                biased;
                change = self.changes.recv(), if store_open => Input::Store(change),
                event = events.recv() => Input::Page(event),
            };
            match input {
                Input::Page(Some(event)) => {
                    if let Err(err) = self.handle(event, Instant::now()).await {
                        warn!("page event failed: {err:#}");
                    }
                }
                Input::Page(None) => return Ok(self),
                Input::Store(Ok(change)) => {
                    self.apply_map(change.new);
                }
                Input::Store(Err(RecvError::Lagged(skipped))) => {
                    warn!(skipped, "missed nickname changes, reloading map");
                    self.resync().await;
                }
                Input::Store(Err(RecvError::Closed)) => {
                    // Keep serving page events with the last snapshot.
                    debug!("nickname store closed its change channel");
                    store_open = false;
                }
            }
        }
    }

    fn on_pointer_enter(&mut self, target: NodeId) -> Result<()> {
        if self.tooltip.contains(&self.doc, target) {
            self.tooltip.cancel_hide();
        } else if let Some(label) = enclosing_label(&self.doc, target) {
            self.tooltip.show(&mut self.doc, label, self.viewport)?;
        }
        Ok(())
    }

    fn on_pointer_leave(&mut self, target: NodeId, related: Option<NodeId>, now: Instant) {
        let hover_zone = |session: &Self, node: NodeId| {
            session.tooltip.contains(&session.doc, node)
                || (session.tooltip.anchor().is_some()
                    && session.tooltip.anchor() == enclosing_label(&session.doc, node))
        };
        if !hover_zone(&*self, target) {
            return;
        }
        match related {
            Some(next) if hover_zone(&*self, next) => self.tooltip.cancel_hide(),
            _ => self.tooltip.schedule_hide(now),
        }
    }

    async fn on_click(&mut self, target: NodeId, now: Instant) -> Result<EventOutcome> {
        if self.tooltip.contains(&self.doc, target) {
            self.tooltip
                .copy(&mut self.doc, self.clipboard.as_mut(), now)?;
            return Ok(EventOutcome::consumed());
        }

        match self.selection.target_of(&self.doc, target) {
            SelectionTarget::Trigger => {
                self.open_popup().await?;
                Ok(EventOutcome::consumed())
            }
            SelectionTarget::Save => {
                self.save_pending().await?;
                Ok(EventOutcome::consumed())
            }
            SelectionTarget::Close => {
                self.selection.close(&mut self.doc)?;
                Ok(EventOutcome::consumed())
            }
            SelectionTarget::Popup => Ok(EventOutcome::consumed()),
            // Clicking the nickname itself keeps the page's own behaviour.
            SelectionTarget::Outside => Ok(EventOutcome::default()),
        }
    }

    async fn on_key(&mut self, key: Key) -> Result<EventOutcome> {
        if !self.selection.is_popup_open() {
            return Ok(EventOutcome::default());
        }
        match key {
            Key::Enter => {
                self.save_pending().await?;
                Ok(EventOutcome::consumed())
            }
            Key::Escape => {
                self.selection.close(&mut self.doc)?;
                Ok(EventOutcome::consumed())
            }
            Key::Other => Ok(EventOutcome::default()),
        }
    }

    async fn open_popup(&mut self) -> Result<()> {
        let Some(pending) = self.selection.pending().cloned() else {
            return Ok(());
        };
        let existing = match self.store.get().await {
            Ok(map) => map.get(&pending.key).cloned(),
            Err(err) => {
                warn!("prefill read failed, using cached map: {err:#}");
                self.cache.lookup(&pending.address).map(str::to_string)
            }
        };
        self.selection
            .open_popup(&mut self.doc, existing.as_deref(), self.viewport)?;
        Ok(())
    }

    /// Write the confirmed nickname. Returns whether anything was saved.
    async fn save_pending(&mut self) -> Result<bool> {
        let Some(confirmed) = self.selection.confirm(&self.doc) else {
            return Ok(false);
        };
        match upsert_nickname(self.store.as_ref(), &confirmed.address, &confirmed.nickname).await
        {
            Ok(key) => {
                info!(%key, "nickname saved");
                self.selection.close(&mut self.doc)?;
                self.pump_store_changes().await;
                Ok(true)
            }
            Err(err) => {
                warn!("saving nickname failed: {err:#}");
                Ok(false)
            }
        }
    }
}
