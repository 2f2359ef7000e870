/// The concurrency bridge — per-kind operation gate and worker→UI events.
///
/// Scheduling model: one single-threaded UI context plus short-lived worker
/// threads, at most one worker per logical operation kind. A new request of
/// a kind already in flight is rejected with [`OpBusy`] rather than queued;
/// two workers of the same kind would touch the same native automation
/// objects, and the automation interface enforces thread-affinity (each
/// worker performs its own isolated initialize/use/teardown).
///
/// Results travel over bounded crossbeam channels that the UI drains in its
/// own event-loop turn, so the UI never observes a partial update. If the UI
/// is torn down mid-flight the receiver is dropped and the worker's terminal
/// send is discarded; there is no primitive to abort an in-progress native
/// call, which is a documented limitation rather than an oversight.
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::OpBusy;

/// Maximum number of events that may queue up in a batch channel.
///
/// The UI drains once per frame (~60 fps); 4 096 messages of headroom means
/// a hidden or resizing window stalls the worker briefly under back-pressure
/// instead of growing the heap without bound.
pub const EVENT_CHANNEL_CAPACITY: usize = 4_096;

/// The logical operation kinds that exclude each other pairwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Scan,
    SaveSession,
    LoadSession,
    LinkUpdate,
    HealthCleanup,
}

/// Tracks which operation kinds currently have a worker in flight.
///
/// Shared between the UI and every worker; a permit is acquired on the UI
/// thread *before* the worker is spawned so a rejected request never starts
/// a second thread.
#[derive(Debug, Default)]
pub struct OpGate {
    in_flight: Mutex<HashSet<OpKind>>,
}

impl OpGate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Acquire the permit for `kind`, or report busy.
    pub fn try_acquire(self: &Arc<Self>, kind: OpKind) -> Result<OpPermit, OpBusy> {
        let mut set = self.in_flight.lock();
        if !set.insert(kind) {
            return Err(OpBusy(kind));
        }
        Ok(OpPermit {
            gate: Arc::clone(self),
            kind,
        })
    }

    /// Whether a worker of `kind` is currently in flight.
    pub fn is_busy(&self, kind: OpKind) -> bool {
        self.in_flight.lock().contains(&kind)
    }
}

/// RAII permit for one in-flight operation. The worker thread owns it for
/// its whole run; dropping it (normal return or panic) releases the kind.
#[derive(Debug)]
pub struct OpPermit {
    gate: Arc<OpGate>,
    kind: OpKind,
}

impl OpPermit {
    pub fn kind(&self) -> OpKind {
        self.kind
    }
}

impl Drop for OpPermit {
    fn drop(&mut self) {
        self.gate.in_flight.lock().remove(&self.kind);
    }
}

/// Per-item outcome inside a batch operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    /// Document opened; recorded sheet/cell could not be fully restored
    /// (partial success — e.g. the sheet was deleted since capture).
    Opened { note: Option<String> },
    /// Document opened and navigated to the recorded sheet and cell.
    Restored,
    /// Document was already open; not opened a second time.
    AlreadyOpen,
    /// External link refreshed.
    Updated,
    /// Document saved and closed.
    Closed,
    /// Item intentionally not processed, with the reason.
    Skipped(String),
    /// Native call failed for this item; the batch continued.
    Failed(String),
}

impl ItemStatus {
    /// Whether this outcome counts toward the success column of a summary.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            ItemStatus::Opened { .. }
                | ItemStatus::Restored
                | ItemStatus::AlreadyOpen
                | ItemStatus::Updated
                | ItemStatus::Closed
        )
    }
}

/// Events a batch worker sends back to the UI.
#[derive(Debug)]
pub enum BatchEvent {
    /// Human-readable progress line for the console panel.
    Log(String),
    /// One item finished with the given outcome.
    Item { path: PathBuf, status: ItemStatus },
    /// Terminal event. Always sent, even when every item failed — a batch
    /// ends with a summary regardless of per-item outcomes.
    Done(BatchSummary),
    /// Operation setup failed before any item was processed (for example no
    /// reachable application instance). Terminal.
    Aborted { message: String },
}

/// Handle to a running batch worker (restore, link update, cleanup).
///
/// Dropping the handle detaches the worker: it runs to completion but its
/// remaining events are discarded instead of being delivered to a destroyed
/// UI context.
pub struct BatchHandle {
    pub events_rx: crossbeam_channel::Receiver<BatchEvent>,
    pub(crate) _thread: std::thread::JoinHandle<()>,
}

/// Success/skip/fail counts for a completed batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: u64,
    pub skipped: u64,
    pub failed: u64,
    pub duration: Duration,
}

impl BatchSummary {
    /// Tally one item outcome into the running counts.
    pub fn record(&mut self, status: &ItemStatus) {
        match status {
            ItemStatus::Skipped(_) => self.skipped += 1,
            ItemStatus::Failed(_) => self.failed += 1,
            _ => self.succeeded += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.succeeded + self.skipped + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_of_same_kind_is_busy() {
        let gate = OpGate::new();
        let permit = gate.try_acquire(OpKind::Scan).unwrap();
        assert_eq!(
            gate.try_acquire(OpKind::Scan).err(),
            Some(OpBusy(OpKind::Scan))
        );
        drop(permit);
        assert!(gate.try_acquire(OpKind::Scan).is_ok());
    }

    #[test]
    fn different_kinds_do_not_exclude_each_other() {
        let gate = OpGate::new();
        let _scan = gate.try_acquire(OpKind::Scan).unwrap();
        assert!(gate.try_acquire(OpKind::LinkUpdate).is_ok());
    }

    #[test]
    fn permit_released_on_drop_even_across_threads() {
        let gate = OpGate::new();
        let permit = gate.try_acquire(OpKind::LoadSession).unwrap();
        let handle = std::thread::spawn(move || drop(permit));
        handle.join().unwrap();
        assert!(!gate.is_busy(OpKind::LoadSession));
    }

    #[test]
    fn summary_tallies_by_status_class() {
        let mut summary = BatchSummary::default();
        summary.record(&ItemStatus::Restored);
        summary.record(&ItemStatus::AlreadyOpen);
        summary.record(&ItemStatus::Skipped("missing".into()));
        summary.record(&ItemStatus::Failed("locked".into()));
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total(), 4);
    }
}
