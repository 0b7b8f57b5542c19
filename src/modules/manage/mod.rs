//! Nickname manager state
//!
//! Pure state behind the `manage` screen: the sorted entry list, the
//! add/edit form and the delete confirmation. Keys are fed in by the screen
//! loop; writes go through [`upsert_nickname`] and [`remove_nickname`] so
//! concurrent page sessions keep their own entries.

use std::time::{Duration, Instant};

use anyhow::Result;

use crate::domain::{classify_exact, short_address, AddressFamily};
use crate::modules::export::sorted_entries;
use crate::page::Clipboard;
use crate::store::{remove_nickname, upsert_nickname, NicknameMap, NicknameStore};

const STATUS_TTL: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub level: StatusLevel,
    pub since: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManageEntry {
    pub key: String,
    pub nickname: String,
    pub family: Option<AddressFamily>,
}

impl ManageEntry {
    pub fn short_key(&self) -> String {
        short_address(&self.key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Address,
    Nickname,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormKind {
    Add,
    /// Editing the nickname of an existing key; the address is fixed.
    Edit { key: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormState {
    pub kind: FormKind,
    pub address: String,
    pub nickname: String,
    pub field: FormField,
}

impl FormState {
    fn input_mut(&mut self) -> &mut String {
        match self.field {
            FormField::Address => &mut self.address,
            FormField::Nickname => &mut self.nickname,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Browse,
    Form(FormState),
    ConfirmDelete { key: String },
}

#[derive(Debug, Clone)]
pub struct ManageState {
    entries: Vec<ManageEntry>,
    selected: usize,
    mode: Mode,
    status: Option<StatusMessage>,
    pub should_quit: bool,
}

impl Default for ManageState {
    fn default() -> Self {
        Self::new()
    }
}

impl ManageState {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            selected: 0,
            mode: Mode::Browse,
            status: None,
            should_quit: false,
        }
    }

    pub fn entries(&self) -> &[ManageEntry] {
        &self.entries
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_entry(&self) -> Option<&ManageEntry> {
        self.entries.get(self.selected)
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn set_status(&mut self, text: impl Into<String>, level: StatusLevel) {
        self.status = Some(StatusMessage {
            text: text.into(),
            level,
            since: Instant::now(),
        });
    }

    pub fn status_text(&self) -> Option<(&str, StatusLevel)> {
        self.status
            .as_ref()
            .map(|status| (status.text.as_str(), status.level))
    }

    pub fn on_tick(&mut self) {
        if self
            .status
            .as_ref()
            .is_some_and(|status| status.since.elapsed() >= STATUS_TTL)
        {
            self.status = None;
        }
    }

    /// Replace the list from a fresh map, keeping the cursor on `focus` when
    /// it is still present.
    pub fn load(&mut self, map: &NicknameMap, focus: Option<&str>) {
        let current = focus
            .map(str::to_string)
            .or_else(|| self.selected_entry().map(|entry| entry.key.clone()));
        self.entries = sorted_entries(map)
            .into_iter()
            .map(|entry| ManageEntry {
                family: classify_exact(&entry.address),
                key: entry.address,
                nickname: entry.nickname,
            })
            .collect();
        self.selected = current
            .and_then(|key| self.entries.iter().position(|entry| entry.key == key))
            .unwrap_or(self.selected);
        self.clamp_selection();
    }

    pub async fn reload(&mut self, store: &dyn NicknameStore) {
        match store.get().await {
            Ok(map) => self.load(&map, None),
            Err(err) => self.set_status(
                format!("Failed to load nicknames: {err:#}"),
                StatusLevel::Error,
            ),
        }
    }

    fn clamp_selection(&mut self) {
        if self.entries.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.entries.len() {
            self.selected = self.entries.len() - 1;
        }
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.entries.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn go_to_top(&mut self) {
        self.selected = 0;
    }

    pub fn go_to_bottom(&mut self) {
        self.selected = self.entries.len().saturating_sub(1);
    }

    /// Put the selected key on `clipboard`. Returns whether it was written.
    pub fn copy_selected(&mut self, clipboard: &mut dyn Clipboard) -> bool {
        let Some(key) = self.selected_entry().map(|entry| entry.key.clone()) else {
            self.set_status("Nothing to copy", StatusLevel::Warn);
            return false;
        };
        match clipboard.write_text(&key) {
            Ok(()) => {
                self.set_status(format!("Copied {}", short_address(&key)), StatusLevel::Info);
                true
            }
            Err(err) => {
                self.set_status(format!("Copy failed: {err}"), StatusLevel::Error);
                false
            }
        }
    }

    pub fn start_add(&mut self) {
        self.mode = Mode::Form(FormState {
            kind: FormKind::Add,
            address: String::new(),
            nickname: String::new(),
            field: FormField::Address,
        });
    }

    /// Open the form prefilled from the selected entry.
    pub fn start_edit(&mut self) {
        let Some(entry) = self.selected_entry().cloned() else {
            self.set_status("Nothing to edit", StatusLevel::Warn);
            return;
        };
        self.mode = Mode::Form(FormState {
            kind: FormKind::Edit {
                key: entry.key.clone(),
            },
            address: entry.key,
            nickname: entry.nickname,
            field: FormField::Nickname,
        });
    }

    pub fn request_delete(&mut self) {
        let Some(entry) = self.selected_entry() else {
            self.set_status("Nothing to delete", StatusLevel::Warn);
            return;
        };
        self.mode = Mode::ConfirmDelete {
            key: entry.key.clone(),
        };
    }

    /// Leave the form or confirmation without writing.
    pub fn cancel(&mut self) {
        self.mode = Mode::Browse;
    }

    pub fn toggle_field(&mut self) {
        if let Mode::Form(form) = &mut self.mode {
            form.field = match (&form.kind, form.field) {
                (FormKind::Add, FormField::Address) => FormField::Nickname,
                (FormKind::Add, FormField::Nickname) => FormField::Address,
                (FormKind::Edit { .. }, _) => FormField::Nickname,
            };
        }
    }

    pub fn push_char(&mut self, ch: char) {
        if let Mode::Form(form) = &mut self.mode {
            form.input_mut().push(ch);
        }
    }

    pub fn pop_char(&mut self) {
        if let Mode::Form(form) = &mut self.mode {
            form.input_mut().pop();
        }
    }

    /// Validate and write the open form. Returns whether a write happened;
    /// validation failures keep the form open with a status message.
    pub async fn submit_form(&mut self, store: &dyn NicknameStore) -> Result<bool> {
        let Mode::Form(form) = &self.mode else {
            return Ok(false);
        };
        let address = match &form.kind {
            FormKind::Add => form.address.trim().to_string(),
            FormKind::Edit { key } => key.clone(),
        };
        let nickname = form.nickname.trim().to_string();

        if classify_exact(&address).is_none() {
            self.set_status("Not a recognised address", StatusLevel::Warn);
            return Ok(false);
        }
        if nickname.is_empty() {
            self.set_status("Nickname cannot be empty", StatusLevel::Warn);
            return Ok(false);
        }

        let key = upsert_nickname(store, &address, &nickname).await?;
        let map = store.get().await?;
        self.mode = Mode::Browse;
        self.load(&map, Some(&key));
        self.set_status(format!("Saved {nickname}"), StatusLevel::Info);
        Ok(true)
    }

    /// Delete the entry awaiting confirmation. Returns whether it was
    /// removed.
    pub async fn confirm_delete(&mut self, store: &dyn NicknameStore) -> Result<bool> {
        let Mode::ConfirmDelete { key } = &self.mode else {
            return Ok(false);
        };
        let key = key.clone();
        self.mode = Mode::Browse;

        let removed = remove_nickname(store, &key).await?;
        let map = store.get().await?;
        self.load(&map, None);
        if removed {
            self.set_status(format!("Deleted {}", short_address(&key)), StatusLevel::Info);
        } else {
            self.set_status("Entry was already gone", StatusLevel::Warn);
        }
        Ok(removed)
    }
}
