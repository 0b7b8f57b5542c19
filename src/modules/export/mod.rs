//! Export Module
//!
//! Writes the nickname map to disk.
//!
//! - JSON: array of `{ address, nickname }` objects
//! - CSV: `address,nickname` with a header row
//! - Default files land in `<data dir>/exports/` with a timestamped name

mod csv_export;
mod json_export;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use clap::ValueEnum;

use crate::config;
use crate::store::NicknameMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

/// One exported row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportEntry {
    pub address: String,
    pub nickname: String,
}

/// Entries ordered the way the manager lists them: by nickname, ignoring
/// case, then by key.
pub fn sorted_entries(map: &NicknameMap) -> Vec<ExportEntry> {
    let mut entries: Vec<ExportEntry> = map
        .iter()
        .map(|(address, nickname)| ExportEntry {
            address: address.clone(),
            nickname: nickname.clone(),
        })
        .collect();
    entries.sort_by(|a, b| {
        a.nickname
            .to_lowercase()
            .cmp(&b.nickname.to_lowercase())
            .then_with(|| a.address.cmp(&b.address))
    });
    entries
}

/// Get the export directory path, creating it if needed
pub fn export_dir() -> std::io::Result<PathBuf> {
    let export_dir = config::data_dir()
        .map(|dir| dir.join("exports"))
        .unwrap_or_else(|| PathBuf::from(".addrlabel").join("exports"));
    fs::create_dir_all(&export_dir)?;
    Ok(export_dir)
}

/// Generate a timestamped filename
pub fn generate_filename(prefix: &str, extension: &str) -> String {
    let timestamp = Local::now().format("%Y-%m-%d-%H%M%S");
    format!("{}-{}.{}", prefix, timestamp, extension)
}

/// Write `map` to `path` in the given format. Returns the row count.
pub fn write_map(path: &Path, map: &NicknameMap, format: ExportFormat) -> Result<usize> {
    let entries = sorted_entries(map);
    let written = match format {
        ExportFormat::Json => json_export::write_nicknames(path, &entries),
        ExportFormat::Csv => csv_export::write_nicknames(path, &entries),
    };
    written.with_context(|| format!("writing {}", path.display()))
}

/// Export to `out`, or to a fresh timestamped file in [`export_dir`].
///
/// Returns the path written and the row count.
pub fn export_nicknames(
    map: &NicknameMap,
    format: ExportFormat,
    out: Option<&Path>,
) -> Result<(PathBuf, usize)> {
    let path = match out {
        Some(path) => path.to_path_buf(),
        None => {
            let dir = export_dir().context("creating export directory")?;
            dir.join(generate_filename("nicknames", format.extension()))
        }
    };
    let count = write_map(&path, map, format)?;
    Ok((path, count))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NicknameMap {
        NicknameMap::from([
            ("0x000000000000000000000000000000000000dead".to_string(), "burn".to_string()),
            ("0xab5801a7d398351b8be11c439e05c5b3259aec9b".to_string(), "Alice".to_string()),
            ("0x1111111111111111111111111111111111111111".to_string(), "alice".to_string()),
        ])
    }

    #[test]
    fn test_entries_sort_by_nickname_ignoring_case_then_key() {
        let entries = sorted_entries(&sample());
        let order: Vec<&str> = entries.iter().map(|e| e.address.as_str()).collect();
        assert_eq!(
            order,
            vec![
                "0x1111111111111111111111111111111111111111",
                "0xab5801a7d398351b8be11c439e05c5b3259aec9b",
                "0x000000000000000000000000000000000000dead",
            ]
        );
    }

    #[test]
    fn test_json_export_round_trips_through_serde() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let count = write_map(&path, &sample(), ExportFormat::Json).unwrap();
        assert_eq!(count, 3);

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value[0]["nickname"], "alice");
        assert_eq!(value[2]["address"], "0x000000000000000000000000000000000000dead");
    }

    #[test]
    fn test_csv_export_has_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let (written, count) =
            export_nicknames(&sample(), ExportFormat::Csv, Some(&path)).unwrap();
        assert_eq!(written, path);
        assert_eq!(count, 3);

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("address,nickname"));
        assert_eq!(
            lines.next(),
            Some("0x1111111111111111111111111111111111111111,alice")
        );
    }

    #[test]
    fn test_generated_names_carry_prefix_and_extension() {
        let name = generate_filename("nicknames", "csv");
        assert!(name.starts_with("nicknames-"));
        assert!(name.ends_with(".csv"));
    }
}
