/// Window reconciler — act on the desktop windows matched during a scan.
///
/// These operations run on the UI thread; they are single native calls per
/// window, not batches, so they skip the worker-thread machinery. A record
/// whose window was never matched (or has gone away) is skipped and
/// reported, never an error.
use tracing::warn;

use crate::model::WorkbookRecord;
use crate::platform::desktop::DesktopOps;

/// Outcome of one window action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowOutcome {
    Done,
    /// The record has no matched window handle.
    WindowNotFound,
    /// The native call reported failure (stale handle, access denied).
    CallFailed,
}

/// Restore and focus the window of a single record.
pub fn activate(desktop: &dyn DesktopOps, record: &WorkbookRecord) -> WindowOutcome {
    let Some(handle) = record.window else {
        return WindowOutcome::WindowNotFound;
    };
    if desktop.activate(handle) {
        WindowOutcome::Done
    } else {
        warn!("could not activate window for {}", record.display_name);
        WindowOutcome::CallFailed
    }
}

/// Bring several records' windows forward in list order; with overlapping
/// windows the last activated ends up front-most.
pub fn bring_to_front(desktop: &dyn DesktopOps, records: &[WorkbookRecord]) -> Vec<WindowOutcome> {
    records.iter().map(|r| activate(desktop, r)).collect()
}

/// Minimize every record's window except those in `except`.
pub fn minimize_all(
    desktop: &dyn DesktopOps,
    records: &[WorkbookRecord],
    except: &[&WorkbookRecord],
) -> Vec<WindowOutcome> {
    records
        .iter()
        .map(|record| {
            if except
                .iter()
                .any(|kept| kept.file_path == record.file_path)
            {
                return WindowOutcome::Done;
            }
            match record.window {
                Some(handle) if desktop.minimize(handle) => WindowOutcome::Done,
                Some(_) => WindowOutcome::CallFailed,
                None => WindowOutcome::WindowNotFound,
            }
        })
        .collect()
}
