//! End-to-end session tests: capture an inventory to disk, read it back,
//! and restore it against the scripted automation double.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use sheetdock_core::automation::memory::{MemoryAutomation, MemoryDocument};
use sheetdock_core::error::SessionError;
use sheetdock_core::model::WorkbookRecord;
use sheetdock_core::ops::{BatchEvent, ItemStatus, OpGate};
use sheetdock_core::session::{read_session, save_session, start_restore, SessionRow};

fn record(path: PathBuf, sheet: &str, cell: &str) -> WorkbookRecord {
    WorkbookRecord {
        display_name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        file_path: path,
        active_sheet: Some(sheet.to_string()),
        active_cell: Some(cell.to_string()),
        modified: None,
        window: None,
    }
}

fn row(path: PathBuf, sheet: &str, cell: &str) -> SessionRow {
    SessionRow {
        file_path: path,
        sheet_name: sheet.to_string(),
        cell_address: cell.to_string(),
        captured_at: String::new(),
    }
}

/// Drain a finished restore into (per-item statuses, summary).
fn drain(
    handle: sheetdock_core::ops::BatchHandle,
) -> (Vec<(PathBuf, ItemStatus)>, sheetdock_core::ops::BatchSummary) {
    let mut items = Vec::new();
    loop {
        match handle
            .events_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("worker must emit a terminal event")
        {
            BatchEvent::Item { path, status } => items.push((path, status)),
            BatchEvent::Done(summary) => return (items, summary),
            BatchEvent::Aborted { message } => panic!("restore aborted: {message}"),
            BatchEvent::Log(_) => {}
        }
    }
}

/// What goes in comes back: saving and re-reading a session preserves the
/// set of recorded paths and positions.
#[test]
fn round_trip_preserves_rows() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("session.csv");
    let records = vec![
        record(PathBuf::from("C:/books/budget.xlsx"), "Q1", "$C$7"),
        record(PathBuf::from("C:/books/forecast.xlsx"), "Summary", "$A$1"),
    ];

    save_session(&records, &path).unwrap();
    let rows = read_session(&path).unwrap();

    assert_eq!(rows.len(), records.len());
    for (row, rec) in rows.iter().zip(&records) {
        assert_eq!(row.file_path, rec.file_path);
        assert_eq!(Some(row.sheet_name.as_str()), rec.active_sheet.as_deref());
        assert_eq!(Some(row.cell_address.as_str()), rec.active_cell.as_deref());
    }
}

/// A row whose file vanished is skipped; the rest of the batch still runs
/// and the terminal summary accounts for every row.
#[test]
fn missing_file_is_skipped_without_stopping_the_batch() {
    let tmp = tempfile::tempdir().unwrap();
    let present_a = tmp.path().join("a.xlsx");
    let present_b = tmp.path().join("b.xlsx");
    std::fs::write(&present_a, b"x").unwrap();
    std::fs::write(&present_b, b"x").unwrap();
    let missing = tmp.path().join("gone.xlsx");

    let automation = Arc::new(MemoryAutomation::new());
    let gate = OpGate::new();
    let rows = vec![
        row(present_a.clone(), "Sheet1", "$A$1"),
        row(missing.clone(), "Sheet1", "$A$1"),
        row(present_b.clone(), "Sheet1", "$B$2"),
    ];

    let handle = start_restore(&gate, automation.clone(), rows).unwrap();
    let (items, summary) = drain(handle);

    assert_eq!(summary.total(), 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.skipped, 1);
    let missing_status = &items.iter().find(|(p, _)| *p == missing).unwrap().1;
    assert!(matches!(missing_status, ItemStatus::Skipped(_)));
    assert_eq!(automation.open_count(&present_a), 1);
    assert_eq!(automation.open_count(&present_b), 1);
}

/// Loading the same session twice opens nothing a second time: documents
/// already open are reported as such, not re-opened.
#[test]
fn reload_is_idempotent_by_path() {
    let tmp = tempfile::tempdir().unwrap();
    let book = tmp.path().join("book.xlsx");
    std::fs::write(&book, b"x").unwrap();

    let automation = Arc::new(MemoryAutomation::new());
    let gate = OpGate::new();
    let rows = vec![row(book.clone(), "Sheet1", "$A$1")];

    let handle = start_restore(&gate, automation.clone(), rows.clone()).unwrap();
    let (_, first) = drain(handle);
    assert_eq!(first.succeeded, 1);

    let handle = start_restore(&gate, automation.clone(), rows).unwrap();
    let (items, second) = drain(handle);

    assert_eq!(second.succeeded, 1);
    assert_eq!(items[0].1, ItemStatus::AlreadyOpen);
    assert_eq!(automation.open_count(&book), 1);
}

/// A recorded sheet that no longer exists degrades to a partial success:
/// the document opens, the position does not restore, the note says why.
#[test]
fn deleted_sheet_degrades_to_opened_with_note() {
    let tmp = tempfile::tempdir().unwrap();
    let book = tmp.path().join("book.xlsx");
    std::fs::write(&book, b"x").unwrap();

    let automation = Arc::new(MemoryAutomation::new());
    automation.add_template(MemoryDocument::new(book.clone()).with_sheets(&["Data"]));
    let gate = OpGate::new();

    let handle = start_restore(
        &gate,
        automation.clone(),
        vec![row(book.clone(), "Archive", "$A$1")],
    )
    .unwrap();
    let (items, summary) = drain(handle);

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 0);
    match &items[0].1 {
        ItemStatus::Opened { note: Some(note) } => assert!(note.contains("Archive")),
        other => panic!("expected partial success, got {other:?}"),
    }
    assert_eq!(automation.open_count(&book), 1);
}

/// A structurally broken session file fails the load up front; nothing is
/// opened.
#[test]
fn malformed_session_file_is_rejected_before_any_open() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("broken.csv");
    std::fs::write(&path, "not,a,session\nfoo,bar,baz\n").unwrap();

    let err = read_session(&path).unwrap_err();
    assert!(matches!(err, SessionError::Malformed(_)), "got {err:?}");
}

/// Restored positions actually land: sheet and cell from the file become
/// the document's active sheet and cell.
#[test]
fn restore_navigates_to_recorded_position() {
    let tmp = tempfile::tempdir().unwrap();
    let book = tmp.path().join("book.xlsx");
    std::fs::write(&book, b"x").unwrap();

    let automation = Arc::new(MemoryAutomation::new());
    automation.add_template(
        MemoryDocument::new(book.clone()).with_sheets(&["Sheet1", "Data"]),
    );
    let gate = OpGate::new();

    let handle = start_restore(
        &gate,
        automation.clone(),
        vec![row(book.clone(), "Data", "$D$4")],
    )
    .unwrap();
    let (items, _) = drain(handle);
    assert_eq!(items[0].1, ItemStatus::Restored);

    let docs = automation.documents_snapshot();
    let doc = docs.iter().find(|d| d.file_path == book).unwrap();
    assert_eq!(doc.active_sheet.as_deref(), Some("Data"));
    assert_eq!(doc.active_cell.as_deref(), Some("$D$4"));
}
