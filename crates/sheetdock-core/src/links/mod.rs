/// External-link updater — refresh stale cross-workbook links in place.
///
/// For every open document, every recorded link target is evaluated against
/// a modification-time window: only targets changed within the last
/// `lookback_days` days (boundary inclusive) are refreshed. Targets that
/// are missing on disk, or currently open in the application themselves,
/// are skipped with the reason recorded. Refresh failures are isolated to
/// the failing target; the batch always runs to completion and ends with a
/// summary.
///
/// Every decision, including skips, goes into a per-run audit report that
/// can be written as CSV next to the run logs.
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::automation::{AutomationSession, Connect, Document};
use crate::error::{OpBusy, SessionError};
use crate::model::timefmt;
use crate::ops::{
    BatchEvent, BatchHandle, BatchSummary, ItemStatus, OpGate, OpKind, EVENT_CHANNEL_CAPACITY,
};

/// Pause between attempts when saving a document whose links were updated.
const SAVE_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Tuning for one link-update run, snapshotted from settings when the run
/// starts so a mid-run settings edit cannot change its behavior.
#[derive(Debug, Clone)]
pub struct LinkUpdateOptions {
    pub lookback_days: i64,
    pub report_dir: PathBuf,
    pub save_report: bool,
    pub max_save_retries: u32,
}

/// What was decided for a single link target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkDecision {
    Updated,
    Skipped,
    Failed,
}

impl LinkDecision {
    fn as_str(self) -> &'static str {
        match self {
            LinkDecision::Updated => "updated",
            LinkDecision::Skipped => "skipped",
            LinkDecision::Failed => "failed",
        }
    }
}

/// One audit line: which document, which target, what was decided and why.
#[derive(Debug, Clone, Serialize)]
pub struct LinkReportRow {
    pub owning_file: PathBuf,
    pub link_target: PathBuf,
    pub decision: String,
    pub reason: String,
    pub timestamp: String,
}

/// Whether a target modified at `modified` falls inside the refresh window.
///
/// The boundary is inclusive: a target modified exactly `lookback_days` days
/// ago is still a refresh candidate. A target with no readable mtime is not.
pub fn within_lookback(
    modified: Option<DateTime<Local>>,
    now: DateTime<Local>,
    lookback_days: i64,
) -> bool {
    match modified {
        Some(m) => now.signed_duration_since(m) <= chrono::Duration::days(lookback_days),
        None => false,
    }
}

/// Write the audit report as CSV
/// (`link_report_2026-03-14_09-30-00.csv`), creating the directory if
/// needed. Returns the path written.
pub fn write_report(
    rows: &[LinkReportRow],
    dir: &Path,
    now: DateTime<Local>,
) -> Result<PathBuf, SessionError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!(
        "link_report_{}.csv",
        now.format("%Y-%m-%d_%H-%M-%S")
    ));
    let mut writer = csv::Writer::from_path(&path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(path)
}

/// Kick off a link-update run on a worker thread.
pub fn start_link_update(
    gate: &Arc<OpGate>,
    connector: Arc<dyn Connect>,
    options: LinkUpdateOptions,
) -> Result<BatchHandle, OpBusy> {
    let permit = gate.try_acquire(OpKind::LinkUpdate)?;
    let (tx, rx) = crossbeam_channel::bounded::<BatchEvent>(EVENT_CHANNEL_CAPACITY);

    let thread = thread::Builder::new()
        .name("sheetdock-links".into())
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
            let now = Local::now();
            let (report, summary) = update_links(session.as_ref(), now, &options, |event| {
                let _ = tx.try_send(event);
            });
            if options.save_report && !report.is_empty() {
                match write_report(&report, &options.report_dir, now) {
                    Ok(path) => {
                        info!("link report written to {}", path.display());
                        let _ = tx.try_send(BatchEvent::Log(format!(
                            "Report saved: {}",
                            path.display()
                        )));
                    }
                    Err(e) => {
                        warn!("failed to write link report: {e}");
                        let _ = tx.try_send(BatchEvent::Log(format!(
                            "Could not save report: {e}"
                        )));
                    }
                }
            }
            let _ = tx.send(BatchEvent::Done(summary));
        })
        .expect("failed to spawn link update thread");

    Ok(BatchHandle {
        events_rx: rx,
        _thread: thread,
    })
}

/// The update body. Per-document and per-target failures are recorded and
/// the run continues; only a failed connect aborts (handled by the caller).
fn update_links(
    session: &dyn AutomationSession,
    now: DateTime<Local>,
    options: &LinkUpdateOptions,
    mut emit: impl FnMut(BatchEvent),
) -> (Vec<LinkReportRow>, BatchSummary) {
    let started = Instant::now();
    let mut summary = BatchSummary::default();
    let mut report = Vec::new();

    let documents = match session.documents() {
        Ok(docs) => docs,
        Err(e) => {
            emit(BatchEvent::Log(format!("Could not list documents: {e}")));
            summary.failed += 1;
            summary.duration = started.elapsed();
            return (report, summary);
        }
    };

    // A target that is itself open gets skipped: refreshing it would race
    // the user's unsaved edits.
    let open_paths: HashSet<PathBuf> = documents.iter().map(|d| d.file_path()).collect();
    let stamp = timefmt::format_timestamp(now);

    for doc in &documents {
        let owner = doc.file_path();
        let targets = match doc.link_targets() {
            Ok(t) => t,
            Err(e) => {
                let status = ItemStatus::Failed(format!("could not read links: {e}"));
                summary.record(&status);
                emit(BatchEvent::Item {
                    path: owner.clone(),
                    status,
                });
                continue;
            }
        };
        if targets.is_empty() {
            continue;
        }
        emit(BatchEvent::Log(format!(
            "{}: {} link(s)",
            doc.display_name(),
            targets.len()
        )));

        let mut refreshed_any = false;
        for target in targets {
            let (status, decision, reason) =
                process_target(doc.as_ref(), &target, &open_paths, now, options);
            if matches!(decision, LinkDecision::Updated) {
                refreshed_any = true;
            }
            report.push(LinkReportRow {
                owning_file: owner.clone(),
                link_target: target.clone(),
                decision: decision.as_str().to_string(),
                reason,
                timestamp: stamp.clone(),
            });
            summary.record(&status);
            emit(BatchEvent::Item {
                path: target,
                status,
            });
        }

        if refreshed_any {
            if let Err(e) = save_with_retry(doc.as_ref(), options.max_save_retries, SAVE_RETRY_DELAY)
            {
                warn!("could not save {} after refresh: {e}", owner.display());
                emit(BatchEvent::Log(format!(
                    "Could not save {}: {e}",
                    owner.display()
                )));
            }
        }
    }

    summary.duration = started.elapsed();
    (report, summary)
}

fn process_target(
    doc: &dyn Document,
    target: &Path,
    open_paths: &HashSet<PathBuf>,
    now: DateTime<Local>,
    options: &LinkUpdateOptions,
) -> (ItemStatus, LinkDecision, String) {
    if !target.exists() {
        let reason = "target missing on disk".to_string();
        return (
            ItemStatus::Skipped(reason.clone()),
            LinkDecision::Skipped,
            reason,
        );
    }
    if open_paths.contains(target) {
        let reason = "target currently open".to_string();
        return (
            ItemStatus::Skipped(reason.clone()),
            LinkDecision::Skipped,
            reason,
        );
    }
    let modified = std::fs::metadata(target)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Local>::from);
    if !within_lookback(modified, now, options.lookback_days) {
        let reason = format!("not modified within {} day(s)", options.lookback_days);
        return (
            ItemStatus::Skipped(reason.clone()),
            LinkDecision::Skipped,
            reason,
        );
    }

    match doc.refresh_link(target) {
        Ok(()) => (
            ItemStatus::Updated,
            LinkDecision::Updated,
            format!("modified within {} day(s)", options.lookback_days),
        ),
        Err(e) => {
            let reason = e.to_string();
            (
                ItemStatus::Failed(reason.clone()),
                LinkDecision::Failed,
                reason,
            )
        }
    }
}

/// Save `doc`, retrying up to `retries` attempts with `delay` between them.
/// The host intermittently rejects saves while a recalculation is still
/// running, which a short pause resolves.
fn save_with_retry(
    doc: &dyn Document,
    retries: u32,
    delay: Duration,
) -> Result<(), crate::error::AutomationError> {
    let attempts = retries.max(1);
    let mut last = None;
    for attempt in 1..=attempts {
        match doc.save() {
            Ok(()) => return Ok(()),
            Err(e) => {
                if attempt < attempts {
                    warn!("save attempt {attempt}/{attempts} failed: {e}");
                    thread::sleep(delay);
                }
                last = Some(e);
            }
        }
    }
    Err(last.unwrap_or(crate::error::AutomationError::Unavailable))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::memory::{MemoryAutomation, MemoryDocument};
    use chrono::TimeZone;

    fn opts(lookback_days: i64) -> LinkUpdateOptions {
        LinkUpdateOptions {
            lookback_days,
            report_dir: PathBuf::from("logs"),
            save_report: false,
            max_save_retries: 1,
        }
    }

    #[test]
    fn boundary_of_lookback_window_is_inclusive() {
        let now = Local.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap();
        let exactly = now - chrono::Duration::days(14);
        let just_outside = exactly - chrono::Duration::seconds(1);

        assert!(within_lookback(Some(exactly), now, 14));
        assert!(!within_lookback(Some(just_outside), now, 14));
        assert!(!within_lookback(None, now, 14));
    }

    #[test]
    fn one_failing_target_does_not_stop_the_run() {
        let tmp = tempfile::tempdir().unwrap();
        let mut targets = Vec::new();
        for i in 0..5 {
            let p = tmp.path().join(format!("t{i}.xlsx"));
            std::fs::write(&p, b"x").unwrap();
            targets.push(p);
        }

        let automation = MemoryAutomation::new();
        automation.add_document(
            MemoryDocument::new(tmp.path().join("owner.xlsx"))
                .with_links(targets.clone())
                .with_failing_link(targets[2].clone()),
        );

        let session = automation.connect().unwrap();
        let (report, summary) = update_links(session.as_ref(), Local::now(), &opts(14), |_| {});

        assert_eq!(report.len(), 5);
        assert_eq!(summary.succeeded, 4);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total(), 5);
    }

    #[test]
    fn open_and_missing_targets_are_skipped_with_reasons() {
        let tmp = tempfile::tempdir().unwrap();
        let open_target = tmp.path().join("open.xlsx");
        std::fs::write(&open_target, b"x").unwrap();
        let missing_target = tmp.path().join("gone.xlsx");

        let automation = MemoryAutomation::new();
        automation.add_document(
            MemoryDocument::new(tmp.path().join("owner.xlsx"))
                .with_links(vec![open_target.clone(), missing_target]),
        );
        automation.add_document(MemoryDocument::new(open_target));

        let session = automation.connect().unwrap();
        let (report, summary) = update_links(session.as_ref(), Local::now(), &opts(14), |_| {});

        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.succeeded, 0);
        let reasons: Vec<&str> = report.iter().map(|r| r.reason.as_str()).collect();
        assert!(reasons.contains(&"target currently open"));
        assert!(reasons.contains(&"target missing on disk"));
    }

    #[test]
    fn stale_targets_outside_window_are_not_refreshed() {
        // A freshly written file is inside any positive window, so use a
        // zero-day window shifted into the past via `now`.
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("old.xlsx");
        std::fs::write(&target, b"x").unwrap();

        let automation = MemoryAutomation::new();
        automation.add_document(
            MemoryDocument::new(tmp.path().join("owner.xlsx")).with_links(vec![target.clone()]),
        );

        let session = automation.connect().unwrap();
        let future = Local::now() + chrono::Duration::days(30);

        // Evaluated "30 days from now", a file written today is outside a
        // 14-day window; evaluated now, it is inside.
        let (report, _) = update_links(session.as_ref(), future, &opts(14), |_| {});
        assert_eq!(report[0].decision, "skipped");

        let (report, summary) = update_links(session.as_ref(), Local::now(), &opts(14), |_| {});
        assert_eq!(report[0].decision, "updated");
        assert_eq!(summary.succeeded, 1);
    }

    #[test]
    fn save_retries_transient_failures() {
        let automation = MemoryAutomation::new();
        let mut doc = MemoryDocument::new("C:/books/owner.xlsx");
        doc.save_fails = 2;
        automation.add_document(doc);

        let session = automation.connect().unwrap();
        let docs = session.documents().unwrap();

        // Two failures then success fits inside three attempts.
        save_with_retry(docs[0].as_ref(), 3, Duration::ZERO).unwrap();
    }

    #[test]
    fn report_file_carries_all_columns() {
        let tmp = tempfile::tempdir().unwrap();
        let rows = vec![LinkReportRow {
            owning_file: PathBuf::from("C:/books/owner.xlsx"),
            link_target: PathBuf::from("C:/books/target.xlsx"),
            decision: "updated".to_string(),
            reason: "modified within 14 day(s)".to_string(),
            timestamp: "2026-03-14 09:30:00".to_string(),
        }];

        let path = write_report(&rows, tmp.path(), Local::now()).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert_eq!(
            text.lines().next().unwrap(),
            "owning_file,link_target,decision,reason,timestamp"
        );
        assert_eq!(text.lines().count(), 2);
    }
}
