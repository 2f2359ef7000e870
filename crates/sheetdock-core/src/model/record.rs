/// Inventory records for open workbook documents.
use chrono::{DateTime, Local};
use std::path::PathBuf;

/// One live workbook as observed by the most recent inventory scan.
///
/// Unique key: `file_path`. A record exists only while its underlying
/// document handle was confirmed live in the last scan; the inventory is
/// fully replaced on every scan, never merged, so stale window handles
/// cannot drift across scans.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkbookRecord {
    /// Absolute path reported by the automation interface. May not exist on
    /// disk yet if the document was renamed but not saved.
    pub file_path: PathBuf,
    /// Display name as shown in the title bar (usually the file name).
    pub display_name: String,
    /// Active sheet at scan time, if the document exposed one.
    pub active_sheet: Option<String>,
    /// Active cell address (e.g. `$B$7`) at scan time.
    pub active_cell: Option<String>,
    /// File-system modification time, when the path resolved on disk.
    pub modified: Option<DateTime<Local>>,
    /// OS top-level window handle matched by title, if any. A record with
    /// no handle is still part of the inventory; window operations on it
    /// become no-ops, not errors.
    pub window: Option<isize>,
}

impl WorkbookRecord {
    /// Display string for the modified column; empty when unknown.
    pub fn modified_display(&self) -> String {
        self.modified
            .map(super::timefmt::format_timestamp)
            .unwrap_or_default()
    }
}
