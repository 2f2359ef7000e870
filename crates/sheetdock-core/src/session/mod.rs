/// Session store — capture working state to a CSV file and restore it.
///
/// A session file is tabular and self-describing: a header row plus one row
/// per captured document (`file_path, sheet_name, cell_address,
/// captured_at`). Extra columns are ignored on read for forward
/// compatibility; absent required columns fail the load with
/// [`SessionError::Malformed`] before anything is applied.
///
/// Restore is **not transactional**: a crash mid-load leaves already-opened
/// documents open, and re-running the same load skips documents that are
/// already open by path instead of opening duplicates.
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::info;

use crate::automation::{AutomationSession, Connect};
use crate::error::{OpBusy, SessionError};
use crate::model::{timefmt, WorkbookRecord};
use crate::ops::{
    BatchEvent, BatchHandle, BatchSummary, ItemStatus, OpGate, OpKind, EVENT_CHANNEL_CAPACITY,
};

/// Columns a session file must carry. Order does not matter; extras are
/// ignored.
const REQUIRED_COLUMNS: [&str; 3] = ["file_path", "sheet_name", "cell_address"];

/// One captured document snapshot. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionRow {
    pub file_path: PathBuf,
    /// Empty when the document exposed no active sheet at capture time.
    #[serde(default)]
    pub sheet_name: String,
    #[serde(default)]
    pub cell_address: String,
    #[serde(default)]
    pub captured_at: String,
}

/// Timestamped session filename in `dir`, original-tool style:
/// `session_2026-03-14_09-30-00.csv`.
pub fn session_file_name(dir: &Path, now: DateTime<Local>) -> PathBuf {
    dir.join(format!("session_{}.csv", now.format("%Y-%m-%d_%H-%M-%S")))
}

/// Write `records` (the current inventory or a selected subset) to `path`.
/// Returns the number of rows written.
pub fn save_session(records: &[WorkbookRecord], path: &Path) -> Result<usize, SessionError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let captured_at = timefmt::format_timestamp(Local::now());
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(SessionRow {
            file_path: record.file_path.clone(),
            sheet_name: record.active_sheet.clone().unwrap_or_default(),
            cell_address: record.active_cell.clone().unwrap_or_default(),
            captured_at: captured_at.clone(),
        })?;
    }
    writer.flush()?;
    Ok(records.len())
}

/// Read and validate a session file. Structural problems (missing required
/// columns, undecodable rows) are fatal to the load; nothing is applied.
pub fn read_session(path: &Path) -> Result<Vec<SessionRow>, SessionError> {
    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?.clone();
    for required in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == required) {
            return Err(SessionError::Malformed(format!(
                "missing required column '{required}'"
            )));
        }
    }

    let mut rows = Vec::new();
    for (line, result) in reader.deserialize::<SessionRow>().enumerate() {
        let row =
            result.map_err(|e| SessionError::Malformed(format!("row {}: {e}", line + 2)))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Capture `records` to a session file on a worker thread, reporting through
/// the batch channel like every other operation.
pub fn start_save(
    gate: &Arc<OpGate>,
    records: Vec<WorkbookRecord>,
    path: PathBuf,
) -> Result<BatchHandle, OpBusy> {
    let permit = gate.try_acquire(OpKind::SaveSession)?;
    let (tx, rx) = crossbeam_channel::bounded::<BatchEvent>(EVENT_CHANNEL_CAPACITY);

    let thread = thread::Builder::new()
        .name("sheetdock-save".into())
        .spawn(move || {
            let _permit = permit;
            let started = Instant::now();
            match save_session(&records, &path) {
                Ok(count) => {
                    info!("session saved: {} row(s) to {}", count, path.display());
                    let _ = tx.try_send(BatchEvent::Log(format!(
                        "Session saved at: {}",
                        path.display()
                    )));
                    let _ = tx.send(BatchEvent::Done(BatchSummary {
                        succeeded: count as u64,
                        duration: started.elapsed(),
                        ..Default::default()
                    }));
                }
                Err(e) => {
                    let _ = tx.send(BatchEvent::Aborted {
                        message: format!("failed to save session: {e}"),
                    });
                }
            }
        })
        .expect("failed to spawn save thread");

    Ok(BatchHandle {
        events_rx: rx,
        _thread: thread,
    })
}

/// Capture `records` to a session file, then save and close each captured
/// document so the whole working set can be resumed later from the file.
///
/// The session file is written first: a failure to close a document must
/// never cost the capture. Documents that vanished between capture and close
/// are recorded `Skipped`, not `Failed`.
pub fn start_save_and_close(
    gate: &Arc<OpGate>,
    connector: Arc<dyn Connect>,
    records: Vec<WorkbookRecord>,
    path: PathBuf,
) -> Result<BatchHandle, OpBusy> {
    let permit = gate.try_acquire(OpKind::SaveSession)?;
    let (tx, rx) = crossbeam_channel::bounded::<BatchEvent>(EVENT_CHANNEL_CAPACITY);

    let thread = thread::Builder::new()
        .name("sheetdock-save-close".into())
        .spawn(move || {
            let _permit = permit;
            let started = Instant::now();

            if let Err(e) = save_session(&records, &path) {
                let _ = tx.send(BatchEvent::Aborted {
                    message: format!("failed to save session: {e}"),
                });
                return;
            }
            let _ = tx.try_send(BatchEvent::Log(format!(
                "Session saved at: {}",
                path.display()
            )));

            let session = match connector.connect() {
                Ok(s) => s,
                Err(e) => {
                    let _ = tx.send(BatchEvent::Aborted {
                        message: e.to_string(),
                    });
                    return;
                }
            };
            let mut summary = close_captured(session.as_ref(), &records, |event| {
                let _ = tx.try_send(event);
            });
            summary.duration = started.elapsed();
            let _ = tx.send(BatchEvent::Done(summary));
        })
        .expect("failed to spawn save-close thread");

    Ok(BatchHandle {
        events_rx: rx,
        _thread: thread,
    })
}

fn close_captured(
    session: &dyn AutomationSession,
    records: &[WorkbookRecord],
    mut emit: impl FnMut(BatchEvent),
) -> BatchSummary {
    let mut summary = BatchSummary::default();

    let open: Vec<_> = match session.documents() {
        Ok(docs) => docs,
        Err(e) => {
            emit(BatchEvent::Log(format!("could not list documents: {e}")));
            summary.failed = records.len() as u64;
            return summary;
        }
    };

    for record in records {
        let status = match open.iter().find(|d| d.file_path() == record.file_path) {
            Some(doc) => match doc.save().and_then(|()| doc.close(true)) {
                Ok(()) => ItemStatus::Closed,
                Err(e) => ItemStatus::Failed(e.to_string()),
            },
            None => ItemStatus::Skipped("no longer open".to_string()),
        };
        summary.record(&status);
        emit(BatchEvent::Item {
            path: record.file_path.clone(),
            status,
        });
    }
    summary
}

/// Restore `rows` on a worker thread. The session file has already been
/// read and validated on the caller's side — a malformed file never reaches
/// this point.
pub fn start_restore(
    gate: &Arc<OpGate>,
    connector: Arc<dyn Connect>,
    rows: Vec<SessionRow>,
) -> Result<BatchHandle, OpBusy> {
    let permit = gate.try_acquire(OpKind::LoadSession)?;
    let (tx, rx) = crossbeam_channel::bounded::<BatchEvent>(EVENT_CHANNEL_CAPACITY);

    let thread = thread::Builder::new()
        .name("sheetdock-restore".into())
        .spawn(move || {
            let _permit = permit;
            let session = match connector.connect() {
                Ok(s) => s,
                Err(e) => {
                    let _ = tx.send(BatchEvent::Aborted {
                        message: e.to_string(),
                    });
                    return;
                }
            };
            let summary = restore_rows(session.as_ref(), &rows, |event| {
                let _ = tx.try_send(event);
            });
            let _ = tx.send(BatchEvent::Done(summary));
        })
        .expect("failed to spawn restore thread");

    Ok(BatchHandle {
        events_rx: rx,
        _thread: thread,
    })
}

/// The restore body. Every row is handled at its own boundary: a missing
/// file or a failed open is recorded and the batch continues.
fn restore_rows(
    session: &dyn AutomationSession,
    rows: &[SessionRow],
    mut emit: impl FnMut(BatchEvent),
) -> BatchSummary {
    let started = Instant::now();
    let mut summary = BatchSummary::default();

    // Idempotence: what is already open never gets a second open.
    let already_open: HashSet<PathBuf> = session
        .documents()
        .map(|docs| docs.iter().map(|d| d.file_path()).collect())
        .unwrap_or_default();

    emit(BatchEvent::Log(format!(
        "Loading session ({} file(s))",
        rows.len()
    )));

    for (index, row) in rows.iter().enumerate() {
        let status = restore_one(session, row, &already_open);
        emit(BatchEvent::Log(format!(
            "({}/{}) {}: {:?}",
            index + 1,
            rows.len(),
            row.file_path.display(),
            status
        )));
        summary.record(&status);
        emit(BatchEvent::Item {
            path: row.file_path.clone(),
            status,
        });
    }

    summary.duration = started.elapsed();
    summary
}

fn restore_one(
    session: &dyn AutomationSession,
    row: &SessionRow,
    already_open: &HashSet<PathBuf>,
) -> ItemStatus {
    if already_open.contains(&row.file_path) {
        return ItemStatus::AlreadyOpen;
    }
    if !row.file_path.exists() {
        return ItemStatus::Skipped("file not found on disk".to_string());
    }

    let doc = match session.open(&row.file_path) {
        Ok(doc) => doc,
        Err(e) => return ItemStatus::Failed(e.to_string()),
    };

    if row.sheet_name.is_empty() {
        return ItemStatus::Opened { note: None };
    }

    let cell = (!row.cell_address.is_empty()).then_some(row.cell_address.as_str());
    match doc.select(&row.sheet_name, cell) {
        Ok(()) => ItemStatus::Restored,
        // Sheet deleted since capture: leave the document open without
        // navigation and record the partial success.
        Err(e) => ItemStatus::Opened {
            note: Some(format!("could not restore position: {e}")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, sheet: &str, cell: &str) -> WorkbookRecord {
        WorkbookRecord {
            file_path: PathBuf::from(path),
            display_name: Path::new(path)
                .file_name()
                .unwrap()
                .to_string_lossy()
                .into_owned(),
            active_sheet: Some(sheet.to_string()),
            active_cell: Some(cell.to_string()),
            modified: None,
            window: None,
        }
    }

    #[test]
    fn session_file_name_is_timestamped() {
        use chrono::TimeZone;
        let now = Local.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap();
        let path = session_file_name(Path::new("out"), now);
        assert_eq!(
            path,
            Path::new("out").join("session_2026-03-14_09-30-00.csv")
        );
    }

    #[test]
    fn save_writes_header_and_one_row_per_record() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("session.csv");
        let records = vec![
            record("C:/books/a.xlsx", "Data", "$B$2"),
            record("C:/books/b.xlsx", "Summary", "$A$1"),
        ];

        let written = save_session(&records, &path).unwrap();
        assert_eq!(written, 2);

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "file_path,sheet_name,cell_address,captured_at"
        );
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn read_rejects_missing_required_column() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.csv");
        std::fs::write(&path, "file_path,cell_address\nC:/a.xlsx,$A$1\n").unwrap();

        let err = read_session(&path).unwrap_err();
        assert!(
            matches!(err, SessionError::Malformed(ref m) if m.contains("sheet_name")),
            "got {err:?}"
        );
    }

    #[test]
    fn read_ignores_extra_columns() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("extra.csv");
        std::fs::write(
            &path,
            "file_path,sheet_name,cell_address,captured_at,comment\n\
             C:/a.xlsx,Data,$B$2,2026-01-01 09:00:00,left by hand\n",
        )
        .unwrap();

        let rows = read_session(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].sheet_name, "Data");
    }
}
