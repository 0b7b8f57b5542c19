//! JSON Export
//!
//! Writes nickname entries to a JSON array.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use super::ExportEntry;

#[derive(Serialize)]
struct ExportableNickname<'a> {
    address: &'a str,
    nickname: &'a str,
}

impl<'a> From<&'a ExportEntry> for ExportableNickname<'a> {
    fn from(entry: &'a ExportEntry) -> Self {
        Self {
            address: &entry.address,
            nickname: &entry.nickname,
        }
    }
}

pub fn write_nicknames(path: &Path, entries: &[ExportEntry]) -> anyhow::Result<usize> {
    let exportable: Vec<ExportableNickname> = entries.iter().map(ExportableNickname::from).collect();

    let json = serde_json::to_string_pretty(&exportable)?;

    let mut file = File::create(path)?;
    file.write_all(json.as_bytes())?;

    Ok(entries.len())
}
