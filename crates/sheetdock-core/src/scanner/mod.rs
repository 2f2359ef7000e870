/// Inventory scanner — enumerates live documents and reconciles them with
/// the OS window list on a background worker thread.
///
/// The scan is read-only: it queries the automation interface and the
/// desktop, never mutating a document. Results are delivered as one terminal
/// [`ScanProgress::Complete`] message carrying the whole inventory, so the
/// UI replaces its snapshot atomically and never observes a partial update.
use crossbeam_channel::Receiver;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{info, warn};

use crate::automation::Connect;
use crate::error::{AutomationError, OpBusy};
use crate::model::WorkbookRecord;
use crate::ops::{OpGate, OpKind, EVENT_CHANNEL_CAPACITY};
use crate::platform::{desktop, titles};

/// Progress messages from the scan worker to the UI.
#[derive(Debug)]
pub enum ScanProgress {
    /// Periodic note of which document is being read.
    Reading { index: usize, path: String },
    /// Terminal: the complete, consistent inventory. Fully replaces any
    /// previous snapshot.
    Complete {
        inventory: Vec<WorkbookRecord>,
        duration: std::time::Duration,
    },
    /// Terminal: the scan could not start (no reachable application
    /// instance). Reported, never silently retried.
    Failed { message: String },
}

/// Handle to a running scan. Dropping it detaches: the worker finishes but
/// its result is discarded (there is no way to abort an in-flight native
/// call).
pub struct ScanHandle {
    pub progress_rx: Receiver<ScanProgress>,
    _thread: thread::JoinHandle<()>,
}

/// Start an inventory scan. Rejects with [`OpBusy`] if a scan worker is
/// already in flight; the permit is taken before the thread spawns, so a
/// rejected request never starts a second worker.
pub fn start_scan(
    gate: &Arc<OpGate>,
    connector: Arc<dyn Connect>,
    window_suffix: String,
) -> Result<ScanHandle, OpBusy> {
    let permit = gate.try_acquire(OpKind::Scan)?;
    let (tx, rx) = crossbeam_channel::bounded::<ScanProgress>(EVENT_CHANNEL_CAPACITY);

    let thread = thread::Builder::new()
        .name("sheetdock-scan".into())
        .spawn(move || {
            let _permit = permit;
            let started = Instant::now();
            info!("inventory scan starting");

            match scan_inventory(connector.as_ref(), &window_suffix, |event| {
                let _ = tx.try_send(event);
            }) {
                Ok(inventory) => {
                    info!("inventory scan found {} document(s)", inventory.len());
                    let _ = tx.send(ScanProgress::Complete {
                        inventory,
                        duration: started.elapsed(),
                    });
                }
                Err(e) => {
                    warn!("inventory scan failed: {e}");
                    let _ = tx.send(ScanProgress::Failed {
                        message: e.to_string(),
                    });
                }
            }
        })
        .expect("failed to spawn scan thread");

    Ok(ScanHandle {
        progress_rx: rx,
        _thread: thread,
    })
}

/// The scan body, factored out of the thread so the channel plumbing stays
/// at the edge. Runs entirely on the worker thread that owns the automation
/// session.
fn scan_inventory(
    connector: &dyn Connect,
    window_suffix: &str,
    mut progress: impl FnMut(ScanProgress),
) -> Result<Vec<WorkbookRecord>, AutomationError> {
    let session = connector.connect()?;
    let documents = session.documents()?;

    let mut records = Vec::with_capacity(documents.len());
    for (index, doc) in documents.iter().enumerate() {
        let file_path = doc.file_path();
        progress(ScanProgress::Reading {
            index,
            path: file_path.display().to_string(),
        });

        records.push(WorkbookRecord {
            display_name: doc.display_name(),
            active_sheet: doc.active_sheet(),
            active_cell: doc.active_cell(),
            modified: file_mtime(&file_path),
            window: None,
            file_path,
        });
    }

    // Cross-reference the desktop. Each handle is assigned at most once;
    // an unmatched document keeps `window: None` and is still reported.
    let (windows, _pids) = desktop::enumerate();
    let mut taken: HashSet<isize> = HashSet::new();
    for record in &mut records {
        record.window =
            titles::match_window(&record.display_name, &windows, &taken, window_suffix);
        if let Some(handle) = record.window {
            taken.insert(handle);
        }
    }

    Ok(records)
}

/// File-system modification time, if the path currently resolves on disk.
/// A renamed-but-unsaved document legitimately has none.
fn file_mtime(path: &Path) -> Option<chrono::DateTime<chrono::Local>> {
    let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
    Some(chrono::DateTime::from(modified))
}
