//! End-to-end tests for `AppState` — the GUI application state machine.
//!
//! These tests exercise the real state-transition paths of `AppState`
//! without spinning up an egui window, keeping them fast and deterministic.
//! Workers run against the scripted in-memory automation double, so every
//! path (scan, session save/load, busy rejection) is covered off-desktop.
use sheetdock_core::automation::memory::{MemoryAutomation, MemoryDocument};
use sheetdock_core::automation::Connect;
use sheetdock_core::config::Settings;
use sheetdock_gui::state::{latest_session_file, AppPhase, AppState};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Settings whose session and report directories live inside `tmp`.
fn test_settings(tmp: &TempDir) -> Settings {
    Settings {
        session_dir: tmp.path().join("sessions"),
        report_dir: tmp.path().join("logs"),
        ..Default::default()
    }
}

fn state_with(tmp: &TempDir, automation: &Arc<MemoryAutomation>) -> AppState {
    AppState::with_connector(test_settings(tmp), Arc::clone(automation) as Arc<dyn Connect>)
}

/// Pump the per-frame message handlers until the state returns to idle or
/// the deadline expires.
fn pump_until_idle(state: &mut AppState) {
    let deadline = std::time::Instant::now() + Duration::from_secs(30);
    while state.phase != AppPhase::Idle {
        assert!(
            std::time::Instant::now() < deadline,
            "worker did not complete within 30 seconds"
        );
        state.process_scan_messages();
        state.process_batch_events();
        std::thread::sleep(Duration::from_millis(5));
    }
}

// ── Construction ──────────────────────────────────────────────────────────────

/// A freshly created `AppState` must start idle with an empty inventory.
#[test]
fn new_state_is_idle_and_empty() {
    let tmp = TempDir::new().unwrap();
    let state = state_with(&tmp, &Arc::new(MemoryAutomation::new()));
    assert_eq!(state.phase, AppPhase::Idle);
    assert!(state.inventory.is_empty());
    assert!(state.selection.is_empty());
}

/// Default state must start in dark mode and guarded-cleanup mode.
#[test]
fn default_state_is_dark_and_guarded() {
    let tmp = TempDir::new().unwrap();
    let state = state_with(&tmp, &Arc::new(MemoryAutomation::new()));
    assert!(state.dark_mode, "dark mode must be the default");
    assert!(
        state.cleanup_zombie_only,
        "guarded cleanup must be the default"
    );
}

// ── Scan lifecycle ────────────────────────────────────────────────────────────

/// After `start_scan`, the phase must be `Scanning`; after the worker
/// completes, the inventory snapshot must be populated.
#[test]
fn scan_populates_the_inventory() {
    let tmp = TempDir::new().unwrap();
    let automation = Arc::new(MemoryAutomation::new());
    automation.add_document(
        MemoryDocument::new("C:/books/budget.xlsx").with_position("Q1", "$C$7"),
    );
    automation.add_document(MemoryDocument::new("C:/books/forecast.xlsx"));

    let mut state = state_with(&tmp, &automation);
    state.start_scan();
    assert_eq!(state.phase, AppPhase::Scanning);
    pump_until_idle(&mut state);

    assert_eq!(state.inventory.len(), 2);
    assert_eq!(state.inventory[0].display_name, "budget.xlsx");
    assert_eq!(state.inventory[0].active_sheet.as_deref(), Some("Q1"));
}

/// A second scan requested while one is in flight is rejected and the
/// rejection lands in the console, not in a second worker.
#[test]
fn overlapping_scan_is_rejected_to_the_console() {
    let tmp = TempDir::new().unwrap();
    let automation = Arc::new(MemoryAutomation::new());
    automation.add_document(MemoryDocument::new("C:/books/a.xlsx"));

    let (release, gate_rx) = crossbeam_channel::bounded::<()>(1);
    automation.set_connect_gate(gate_rx);

    let mut state = state_with(&tmp, &automation);
    state.start_scan();
    state.start_scan();

    assert!(
        state.console.iter().any(|l| l.contains("already in flight")),
        "busy rejection must be reported: {:?}",
        state.console
    );

    release.send(()).unwrap();
    pump_until_idle(&mut state);
    assert_eq!(automation.connect_count(), 1);
}

/// A scan against an unreachable application returns to idle with the
/// failure reported instead of hanging in the scanning phase.
#[test]
fn failed_scan_returns_to_idle() {
    let tmp = TempDir::new().unwrap();
    let automation = Arc::new(MemoryAutomation::new());
    automation.set_available(false);

    let mut state = state_with(&tmp, &automation);
    state.start_scan();
    pump_until_idle(&mut state);

    assert!(state.inventory.is_empty());
    assert!(state.console.iter().any(|l| l.contains("Scan failed")));
}

// ── Session save / load ───────────────────────────────────────────────────────

/// Saving with nothing checked captures the whole inventory to a session
/// file in the configured directory.
#[test]
fn save_session_writes_a_file() {
    let tmp = TempDir::new().unwrap();
    let automation = Arc::new(MemoryAutomation::new());
    automation.add_document(MemoryDocument::new("C:/books/a.xlsx"));

    let mut state = state_with(&tmp, &automation);
    state.start_scan();
    pump_until_idle(&mut state);

    state.start_save_session();
    assert_eq!(state.phase, AppPhase::Working);
    pump_until_idle(&mut state);

    let saved = latest_session_file(&state.settings.session_dir);
    assert!(saved.is_some(), "a session file must exist after save");
    let summary = state.last_summary.as_ref().expect("summary must be set");
    assert_eq!(summary.succeeded, 1);
}

/// Save & Close writes the session file, closes every captured workbook,
/// and the post-batch rescan reflects the emptied inventory.
#[test]
fn save_and_close_empties_the_inventory() {
    let tmp = TempDir::new().unwrap();
    let automation = Arc::new(MemoryAutomation::new());
    automation.add_document(MemoryDocument::new("C:/books/a.xlsx"));
    automation.add_document(MemoryDocument::new("C:/books/b.xlsx"));

    let mut state = state_with(&tmp, &automation);
    state.start_scan();
    pump_until_idle(&mut state);
    assert_eq!(state.inventory.len(), 2);

    state.start_save_and_close();
    pump_until_idle(&mut state);

    assert!(latest_session_file(&state.settings.session_dir).is_some());
    let summary = state.last_summary.as_ref().expect("summary must be set");
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 0);
    assert!(automation.documents_snapshot().iter().all(|d| d.closed));
    assert!(
        state.inventory.is_empty(),
        "rescan after close must find nothing open"
    );
}

/// Save-then-load round trip: the loaded session reports every workbook
/// (already open here) and triggers a rescan when the batch finishes.
#[test]
fn load_latest_session_round_trips() {
    let tmp = TempDir::new().unwrap();
    let book = tmp.path().join("book.xlsx");
    std::fs::write(&book, b"x").unwrap();

    let automation = Arc::new(MemoryAutomation::new());
    automation.add_document(MemoryDocument::new(book.clone()));

    let mut state = state_with(&tmp, &automation);
    state.start_scan();
    pump_until_idle(&mut state);

    state.start_save_session();
    pump_until_idle(&mut state);

    state.start_load_latest_session();
    pump_until_idle(&mut state);

    let summary = state.last_summary.as_ref().expect("summary must be set");
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 0);
    // Already open, so no duplicate open was issued.
    assert_eq!(automation.open_count(&book), 0);
    // The post-batch rescan ran and repopulated the inventory.
    assert_eq!(state.inventory.len(), 1);
}

/// Loading when no session file exists is a console message, not a worker.
#[test]
fn load_without_session_files_reports_and_stays_idle() {
    let tmp = TempDir::new().unwrap();
    let mut state = state_with(&tmp, &Arc::new(MemoryAutomation::new()));

    state.start_load_latest_session();

    assert_eq!(state.phase, AppPhase::Idle);
    assert!(state
        .console
        .iter()
        .any(|l| l.contains("No session files found")));
}

/// A malformed session file is rejected up front.
#[test]
fn malformed_session_file_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let bad = tmp.path().join("session_2026-01-01_00-00-00.csv");
    std::fs::write(&bad, "wrong,columns\n1,2\n").unwrap();

    let mut state = state_with(&tmp, &Arc::new(MemoryAutomation::new()));
    state.start_load_session(bad);

    assert_eq!(state.phase, AppPhase::Idle);
    assert!(state.console.iter().any(|l| l.contains("Cannot load")));
}

// ── Selection ─────────────────────────────────────────────────────────────────

/// Checked rows narrow the session scope; an empty selection means all.
#[test]
fn session_scope_follows_the_selection() {
    let tmp = TempDir::new().unwrap();
    let automation = Arc::new(MemoryAutomation::new());
    automation.add_document(MemoryDocument::new("C:/books/a.xlsx"));
    automation.add_document(MemoryDocument::new("C:/books/b.xlsx"));

    let mut state = state_with(&tmp, &automation);
    state.start_scan();
    pump_until_idle(&mut state);

    assert_eq!(state.session_scope().len(), 2);

    state
        .selection
        .insert(Path::new("C:/books/b.xlsx").to_path_buf());
    let scope = state.session_scope();
    assert_eq!(scope.len(), 1);
    assert_eq!(scope[0].display_name, "b.xlsx");
}

/// A rescan drops selections whose workbooks are no longer open.
#[test]
fn rescan_prunes_stale_selection() {
    let tmp = TempDir::new().unwrap();
    let automation = Arc::new(MemoryAutomation::new());
    automation.add_document(MemoryDocument::new("C:/books/a.xlsx"));

    let mut state = state_with(&tmp, &automation);
    state.start_scan();
    pump_until_idle(&mut state);

    state
        .selection
        .insert(Path::new("C:/books/a.xlsx").to_path_buf());
    state
        .selection
        .insert(Path::new("C:/books/closed.xlsx").to_path_buf());

    state.start_scan();
    pump_until_idle(&mut state);

    assert_eq!(state.selection.len(), 1);
    assert!(state
        .selection
        .contains(Path::new("C:/books/a.xlsx")));
}

// ── Console ───────────────────────────────────────────────────────────────────

/// The console is bounded; old lines are evicted, new ones kept.
#[test]
fn console_is_capped() {
    let tmp = TempDir::new().unwrap();
    let mut state = state_with(&tmp, &Arc::new(MemoryAutomation::new()));

    for i in 0..1_100 {
        state.push_console(format!("line {i}"));
    }

    assert_eq!(state.console.len(), 1_000);
    assert_eq!(state.console.last().unwrap(), "line 1099");
    assert_eq!(state.console.first().unwrap(), "line 100");
}

// ── Session file discovery ────────────────────────────────────────────────────

/// `latest_session_file` picks the newest timestamped name and ignores
/// unrelated files.
#[test]
fn latest_session_file_picks_the_newest() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    std::fs::write(dir.join("session_2026-01-01_09-00-00.csv"), "x").unwrap();
    std::fs::write(dir.join("session_2026-02-01_09-00-00.csv"), "x").unwrap();
    std::fs::write(dir.join("notes.txt"), "x").unwrap();
    std::fs::write(dir.join("other.csv"), "x").unwrap();

    let latest = latest_session_file(dir).expect("must find a session file");
    assert_eq!(
        latest.file_name().unwrap(),
        "session_2026-02-01_09-00-00.csv"
    );
}
