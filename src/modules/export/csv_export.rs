//! CSV Export
//!
//! Writes nickname entries as `address,nickname` rows.

use std::path::Path;

use super::ExportEntry;

pub fn write_nicknames(path: &Path, entries: &[ExportEntry]) -> anyhow::Result<usize> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record(["address", "nickname"])?;
    for entry in entries {
        wtr.write_record([entry.address.as_str(), entry.nickname.as_str()])?;
    }

    wtr.flush()?;
    Ok(entries.len())
}
