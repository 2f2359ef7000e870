/// Process health monitor — find and clean up orphaned host processes.
///
/// A host process with no visible document window left behind by a crashed
/// or hung session keeps file locks alive and blocks new automation
/// connections. Classification is conservative: a windowless process
/// younger than the grace period is reported as [`Classification::Unknown`],
/// since a legitimately starting instance has no window yet either, and
/// guarded cleanup never terminates a healthy process.
use chrono::{DateTime, Local};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::error::OpBusy;
use crate::model::timefmt;
use crate::ops::{
    BatchEvent, BatchHandle, BatchSummary, ItemStatus, OpGate, OpKind, EVENT_CHANNEL_CAPACITY,
};
use crate::platform::desktop;
use crate::platform::process::{self, ProcessSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Owns at least one visible titled window.
    Healthy,
    /// No window and older than the grace period.
    Zombie,
    /// No window but still inside the grace period.
    Unknown,
}

impl Classification {
    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Healthy => "healthy",
            Classification::Zombie => "zombie",
            Classification::Unknown => "unknown",
        }
    }
}

/// One inspected process with its verdict.
#[derive(Debug, Clone)]
pub struct ProcessHealthRecord {
    pub pid: u32,
    pub exe_name: String,
    pub started: Option<DateTime<Local>>,
    pub memory_bytes: u64,
    pub classification: Classification,
}

impl ProcessHealthRecord {
    pub fn started_display(&self) -> String {
        self.started.map(timefmt::format_timestamp).unwrap_or_default()
    }

    pub fn memory_display(&self) -> String {
        format!("{:.1} MB", self.memory_bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Classify one snapshot at time `now`.
///
/// A process with no readable start time cannot be aged, so it stays
/// `Unknown` rather than being promoted to `Zombie` on missing data.
pub fn classify(
    snapshot: &ProcessSnapshot,
    now: DateTime<Local>,
    min_age: Duration,
) -> Classification {
    if snapshot.has_window {
        return Classification::Healthy;
    }
    let Some(started) = snapshot.started else {
        return Classification::Unknown;
    };
    let age = now.signed_duration_since(started);
    if age >= chrono::Duration::from_std(min_age).unwrap_or(chrono::Duration::zero()) {
        Classification::Zombie
    } else {
        Classification::Unknown
    }
}

/// Enumerate matching processes on this machine and classify each one.
/// Read-only; safe to call from the UI thread on every refresh.
pub fn inspect(exe_name: &str, min_age: Duration) -> Vec<ProcessHealthRecord> {
    let (_, windowed_pids) = desktop::enumerate();
    let now = Local::now();
    process::snapshot_matching(exe_name, &windowed_pids)
        .into_iter()
        .map(|snap| ProcessHealthRecord {
            classification: classify(&snap, now, min_age),
            pid: snap.pid,
            exe_name: snap.exe_name,
            started: snap.started,
            memory_bytes: snap.memory_bytes,
        })
        .collect()
}

/// Which of `records` a cleanup pass would terminate.
///
/// With `zombie_only` set (the default) only confirmed zombies are selected;
/// a healthy process is never selected in that mode regardless of the other
/// flags. Clearing it extends selection to `Unknown` processes, for the
/// explicit "kill everything windowless" action.
pub fn select_for_cleanup(
    records: &[ProcessHealthRecord],
    zombie_only: bool,
) -> Vec<&ProcessHealthRecord> {
    records
        .iter()
        .filter(|r| match r.classification {
            Classification::Healthy => false,
            Classification::Zombie => true,
            Classification::Unknown => !zombie_only,
        })
        .collect()
}

/// Terminate the selected processes on a worker thread.
pub fn start_cleanup(
    gate: &Arc<OpGate>,
    records: Vec<ProcessHealthRecord>,
    zombie_only: bool,
) -> Result<BatchHandle, OpBusy> {
    let permit = gate.try_acquire(OpKind::HealthCleanup)?;
    let (tx, rx) = crossbeam_channel::bounded::<BatchEvent>(EVENT_CHANNEL_CAPACITY);

    let thread = thread::Builder::new()
        .name("sheetdock-cleanup".into())
        .spawn(move || {
            let _permit = permit;
            let started = Instant::now();
            let mut summary = BatchSummary::default();

            let selected: Vec<u32> = select_for_cleanup(&records, zombie_only)
                .into_iter()
                .map(|r| r.pid)
                .collect();

            for record in &records {
                let status = if !selected.contains(&record.pid) {
                    if record.classification == Classification::Healthy {
                        // Explicit trace when a visible process survives a
                        // cleanup pass, so "why is it still running" has an
                        // answer in the log.
                        warn!(
                            pid = record.pid,
                            "healthy process excluded from cleanup"
                        );
                    }
                    ItemStatus::Skipped(format!("{} process", record.classification.as_str()))
                } else {
                    match process::terminate(record.pid) {
                        Ok(()) => {
                            info!(pid = record.pid, "terminated orphaned process");
                            ItemStatus::Updated
                        }
                        Err(e) => ItemStatus::Failed(e),
                    }
                };
                summary.record(&status);
                let _ = tx.try_send(BatchEvent::Item {
                    path: std::path::PathBuf::from(format!("pid:{}", record.pid)),
                    status,
                });
            }

            summary.duration = started.elapsed();
            let _ = tx.send(BatchEvent::Done(summary));
        })
        .expect("failed to spawn cleanup thread");

    Ok(BatchHandle {
        events_rx: rx,
        _thread: thread,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn snapshot(pid: u32, age_secs: i64, has_window: bool) -> ProcessSnapshot {
        ProcessSnapshot {
            pid,
            exe_name: "EXCEL.EXE".to_string(),
            started: Some(Local::now() - chrono::Duration::seconds(age_secs)),
            memory_bytes: 64 * 1024 * 1024,
            has_window,
        }
    }

    fn health(pid: u32, classification: Classification) -> ProcessHealthRecord {
        ProcessHealthRecord {
            pid,
            exe_name: "EXCEL.EXE".to_string(),
            started: None,
            memory_bytes: 0,
            classification,
        }
    }

    #[test]
    fn windowed_process_is_healthy_regardless_of_age() {
        let now = Local::now();
        let snap = snapshot(100, 3_600, true);
        assert_eq!(
            classify(&snap, now, Duration::from_secs(120)),
            Classification::Healthy
        );
    }

    #[test]
    fn windowless_process_needs_the_grace_period_to_be_a_zombie() {
        let now = Local::now();
        let young = snapshot(100, 30, false);
        let old = snapshot(101, 300, false);

        assert_eq!(
            classify(&young, now, Duration::from_secs(120)),
            Classification::Unknown
        );
        assert_eq!(
            classify(&old, now, Duration::from_secs(120)),
            Classification::Zombie
        );
    }

    #[test]
    fn unreadable_start_time_never_promotes_to_zombie() {
        let now = Local.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap();
        let snap = ProcessSnapshot {
            pid: 100,
            exe_name: "EXCEL.EXE".to_string(),
            started: None,
            memory_bytes: 0,
            has_window: false,
        };
        assert_eq!(
            classify(&snap, now, Duration::from_secs(120)),
            Classification::Unknown
        );
    }

    #[test]
    fn guarded_cleanup_never_selects_healthy() {
        let records = vec![
            health(1, Classification::Healthy),
            health(2, Classification::Zombie),
            health(3, Classification::Unknown),
        ];

        let guarded: Vec<u32> = select_for_cleanup(&records, true)
            .into_iter()
            .map(|r| r.pid)
            .collect();
        assert_eq!(guarded, vec![2]);

        let aggressive: Vec<u32> = select_for_cleanup(&records, false)
            .into_iter()
            .map(|r| r.pid)
            .collect();
        assert_eq!(aggressive, vec![2, 3]);
    }
}
