/// Application state management.
///
/// Centralises all mutable state that the UI reads and writes. Worker
/// threads communicate via channels; state updates happen in
/// `process_scan_messages()` / `process_batch_events()` which run once per
/// frame, so panels never observe a half-applied update.
use sheetdock_core::automation::Connect;
use sheetdock_core::config::Settings;
use sheetdock_core::error::OpBusy;
use sheetdock_core::health::{self, ProcessHealthRecord};
use sheetdock_core::links::{self, LinkUpdateOptions};
use sheetdock_core::model::WorkbookRecord;
use sheetdock_core::ops::{BatchEvent, BatchHandle, BatchSummary, ItemStatus, OpGate, OpKind};
use sheetdock_core::platform::desktop::NativeDesktop;
use sheetdock_core::reconcile;
use sheetdock_core::scanner::{self, ScanHandle, ScanProgress};
use sheetdock_core::session::{self, SessionRow};

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// The current phase of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppPhase {
    /// Idle — possibly showing a previous inventory.
    Idle,
    /// An inventory scan is in flight.
    Scanning,
    /// A batch operation (save, load, link update, cleanup) is in flight.
    Working,
}

/// Maximum scan-progress messages drained from the channel per frame.
///
/// Prevents a backlog (e.g. after the window was hidden) from blocking the
/// render thread for a perceptible duration when it is eventually shown.
const MAX_SCAN_MESSAGES_PER_FRAME: usize = 300;

/// Maximum batch events drained per frame, same rationale.
const MAX_BATCH_EVENTS_PER_FRAME: usize = 200;

/// Maximum lines retained in the console panel; oldest are evicted.
const MAX_CONSOLE_LINES: usize = 1_000;

/// All application state.
pub struct AppState {
    pub settings: Settings,
    connector: Arc<dyn Connect>,
    gate: Arc<OpGate>,

    // ── Inventory ──────────────────────────────────────
    pub inventory: Vec<WorkbookRecord>,
    /// Paths of the checked inventory rows.
    pub selection: HashSet<PathBuf>,
    pub phase: AppPhase,
    pub scan_handle: Option<ScanHandle>,
    pub scan_current_path: String,
    pub scan_duration: Option<Duration>,

    // ── Batch operations ───────────────────────────────
    pub batch_handle: Option<BatchHandle>,
    /// Which kind the in-flight batch is, for the status bar.
    pub batch_kind: Option<OpKind>,
    pub last_summary: Option<BatchSummary>,
    /// Kick a fresh scan when the current batch finishes, so the inventory
    /// reflects what the batch changed.
    rescan_after_batch: bool,

    // ── Console ────────────────────────────────────────
    pub console: Vec<String>,

    // ── Process health ─────────────────────────────────
    pub show_health_panel: bool,
    pub health_records: Vec<ProcessHealthRecord>,
    /// Guarded cleanup: only confirmed zombies are terminated.
    pub cleanup_zombie_only: bool,

    // ── UI state ───────────────────────────────────────
    pub status_message: String,
    pub show_about: bool,
    pub dark_mode: bool,
}

impl AppState {
    /// Create initial application state with the shipped connector.
    pub fn new(settings: Settings) -> Self {
        Self::with_connector(settings, sheetdock_core::automation::default_connector())
    }

    /// Create state over an explicit connector (used by the tests).
    pub fn with_connector(settings: Settings, connector: Arc<dyn Connect>) -> Self {
        Self {
            settings,
            connector,
            gate: OpGate::new(),
            inventory: Vec::new(),
            selection: HashSet::new(),
            phase: AppPhase::Idle,
            scan_handle: None,
            scan_current_path: String::new(),
            scan_duration: None,
            batch_handle: None,
            batch_kind: None,
            last_summary: None,
            rescan_after_batch: false,
            console: Vec::new(),
            show_health_panel: false,
            health_records: Vec::new(),
            cleanup_zombie_only: true,
            status_message: String::new(),
            show_about: false,
            dark_mode: true,
        }
    }

    /// Append a console line, evicting the oldest past the cap.
    pub fn push_console(&mut self, line: impl Into<String>) {
        if self.console.len() >= MAX_CONSOLE_LINES {
            self.console.remove(0);
        }
        self.console.push(line.into());
    }

    /// Whether any worker is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.phase != AppPhase::Idle
    }

    // ── Inventory scan ─────────────────────────────────

    /// Start an inventory scan; a busy rejection goes to the console.
    pub fn start_scan(&mut self) {
        match scanner::start_scan(
            &self.gate,
            Arc::clone(&self.connector),
            self.settings.window_suffix.clone(),
        ) {
            Ok(handle) => {
                self.phase = AppPhase::Scanning;
                self.scan_handle = Some(handle);
                self.scan_current_path.clear();
                self.scan_duration = None;
                self.status_message = "Scanning open workbooks...".to_string();
            }
            Err(busy) => self.report_busy(busy),
        }
    }

    /// Process pending scan progress messages. Called once per frame.
    ///
    /// Returns `true` if the UI should repaint (new data arrived).
    pub fn process_scan_messages(&mut self) -> bool {
        let Some(handle) = &self.scan_handle else {
            return false;
        };

        let mut repaint = false;
        let mut messages_this_frame = 0usize;
        while messages_this_frame < MAX_SCAN_MESSAGES_PER_FRAME {
            let msg = match handle.progress_rx.try_recv() {
                Ok(m) => m,
                Err(_) => break,
            };
            messages_this_frame += 1;
            repaint = true;
            match msg {
                ScanProgress::Reading { path, .. } => {
                    self.scan_current_path = path;
                }
                ScanProgress::Complete {
                    inventory,
                    duration,
                } => {
                    // Replace the snapshot atomically and drop selections of
                    // workbooks that are no longer open.
                    let open: HashSet<PathBuf> =
                        inventory.iter().map(|r| r.file_path.clone()).collect();
                    self.selection.retain(|p| open.contains(p));
                    self.status_message =
                        format!("Found {} open workbook(s)", inventory.len());
                    self.inventory = inventory;
                    self.scan_duration = Some(duration);
                    self.phase = AppPhase::Idle;
                    self.scan_handle = None;
                    return true;
                }
                ScanProgress::Failed { message } => {
                    self.status_message = message.clone();
                    self.push_console(format!("Scan failed: {message}"));
                    self.phase = AppPhase::Idle;
                    self.scan_handle = None;
                    return true;
                }
            }
        }
        repaint
    }

    // ── Session save / load ────────────────────────────

    /// The records a session operation applies to: the checked rows, or the
    /// whole inventory when nothing is checked.
    pub fn session_scope(&self) -> Vec<WorkbookRecord> {
        if self.selection.is_empty() {
            self.inventory.clone()
        } else {
            self.inventory
                .iter()
                .filter(|r| self.selection.contains(&r.file_path))
                .cloned()
                .collect()
        }
    }

    /// Capture the current scope to a timestamped session file.
    pub fn start_save_session(&mut self) {
        let scope = self.session_scope();
        if scope.is_empty() {
            self.push_console("Nothing to save: the inventory is empty.");
            return;
        }
        let path = session::session_file_name(&self.settings.session_dir, chrono::Local::now());
        match session::start_save(&self.gate, scope, path) {
            Ok(handle) => self.begin_batch(handle, OpKind::SaveSession, false),
            Err(busy) => self.report_busy(busy),
        }
    }

    /// Capture the current scope, then save and close the captured
    /// workbooks. Rescans afterwards: the inventory shrinks.
    pub fn start_save_and_close(&mut self) {
        let scope = self.session_scope();
        if scope.is_empty() {
            self.push_console("Nothing to save: the inventory is empty.");
            return;
        }
        let path = session::session_file_name(&self.settings.session_dir, chrono::Local::now());
        match session::start_save_and_close(&self.gate, Arc::clone(&self.connector), scope, path)
        {
            Ok(handle) => self.begin_batch(handle, OpKind::SaveSession, true),
            Err(busy) => self.report_busy(busy),
        }
    }

    /// Restore the most recent session file from the session directory.
    pub fn start_load_latest_session(&mut self) {
        let Some(path) = latest_session_file(&self.settings.session_dir) else {
            self.push_console(format!(
                "No session files found in {}",
                self.settings.session_dir.display()
            ));
            return;
        };
        self.start_load_session(path);
    }

    /// Restore a specific session file.
    pub fn start_load_session(&mut self, path: PathBuf) {
        let rows: Vec<SessionRow> = match session::read_session(&path) {
            Ok(rows) => rows,
            Err(e) => {
                self.push_console(format!("Cannot load {}: {e}", path.display()));
                self.status_message = "Session file rejected".to_string();
                return;
            }
        };
        self.push_console(format!(
            "Loading {} ({} file(s))",
            path.display(),
            rows.len()
        ));
        match session::start_restore(&self.gate, Arc::clone(&self.connector), rows) {
            Ok(handle) => self.begin_batch(handle, OpKind::LoadSession, true),
            Err(busy) => self.report_busy(busy),
        }
    }

    // ── External links ─────────────────────────────────

    /// Refresh stale external links across every open workbook.
    pub fn start_link_update(&mut self) {
        let options = LinkUpdateOptions {
            lookback_days: self.settings.lookback_days,
            report_dir: self.settings.report_dir.clone(),
            save_report: self.settings.save_report,
            max_save_retries: self.settings.max_save_retries,
        };
        match links::start_link_update(&self.gate, Arc::clone(&self.connector), options) {
            Ok(handle) => self.begin_batch(handle, OpKind::LinkUpdate, true),
            Err(busy) => self.report_busy(busy),
        }
    }

    // ── Window actions ─────────────────────────────────

    /// Bring the checked workbooks' windows to the front, front-most last.
    pub fn bring_selection_to_front(&mut self) {
        let scope = self.session_scope();
        let outcomes = reconcile::bring_to_front(&NativeDesktop, &scope);
        for (record, outcome) in scope.iter().zip(outcomes) {
            if outcome != reconcile::WindowOutcome::Done {
                self.push_console(format!(
                    "Could not raise {}: {outcome:?}",
                    record.display_name
                ));
            }
        }
    }

    /// Minimize every inventory window that is not checked.
    pub fn minimize_unselected(&mut self) {
        let keep: Vec<&WorkbookRecord> = self
            .inventory
            .iter()
            .filter(|r| self.selection.contains(&r.file_path))
            .collect();
        reconcile::minimize_all(&NativeDesktop, &self.inventory, &keep);
    }

    // ── Process health ─────────────────────────────────

    /// Re-inspect matching processes. Read-only, runs inline.
    pub fn refresh_health(&mut self) {
        self.health_records = health::inspect(
            &self.settings.app_exe_name,
            Duration::from_secs(self.settings.zombie_min_age_secs),
        );
    }

    /// Terminate the processes the current records and mode select.
    pub fn start_cleanup(&mut self) {
        match health::start_cleanup(
            &self.gate,
            self.health_records.clone(),
            self.cleanup_zombie_only,
        ) {
            Ok(handle) => self.begin_batch(handle, OpKind::HealthCleanup, false),
            Err(busy) => self.report_busy(busy),
        }
    }

    // ── Batch plumbing ─────────────────────────────────

    fn begin_batch(&mut self, handle: BatchHandle, kind: OpKind, rescan_after: bool) {
        self.phase = AppPhase::Working;
        self.batch_handle = Some(handle);
        self.batch_kind = Some(kind);
        self.rescan_after_batch = rescan_after;
        self.last_summary = None;
        self.status_message = format!("{kind:?} in progress...");
    }

    fn report_busy(&mut self, busy: OpBusy) {
        self.status_message = busy.to_string();
        self.push_console(busy.to_string());
    }

    /// Drain pending batch events. Called once per frame; returns `true` if
    /// the UI should repaint.
    pub fn process_batch_events(&mut self) -> bool {
        let Some(handle) = &self.batch_handle else {
            return false;
        };

        let mut repaint = false;
        let mut lines: Vec<String> = Vec::new();
        let mut terminal: Option<Result<BatchSummary, String>> = None;

        let mut events_this_frame = 0usize;
        while events_this_frame < MAX_BATCH_EVENTS_PER_FRAME {
            let event = match handle.events_rx.try_recv() {
                Ok(e) => e,
                Err(_) => break,
            };
            events_this_frame += 1;
            repaint = true;
            match event {
                BatchEvent::Log(line) => lines.push(line),
                BatchEvent::Item { path, status } => {
                    if let Some(line) = describe_item(&path, &status) {
                        lines.push(line);
                    }
                }
                BatchEvent::Done(summary) => {
                    terminal = Some(Ok(summary));
                    break;
                }
                BatchEvent::Aborted { message } => {
                    terminal = Some(Err(message));
                    break;
                }
            }
        }

        for line in lines {
            self.push_console(line);
        }

        if let Some(result) = terminal {
            self.batch_handle = None;
            self.phase = AppPhase::Idle;
            let kind = self.batch_kind.take();
            match result {
                Ok(summary) => {
                    self.status_message = format!(
                        "{:?} done: {} ok, {} skipped, {} failed in {:.1}s",
                        kind.unwrap_or(OpKind::Scan),
                        summary.succeeded,
                        summary.skipped,
                        summary.failed,
                        summary.duration.as_secs_f64()
                    );
                    self.push_console(self.status_message.clone());
                    self.last_summary = Some(summary);
                    if self.rescan_after_batch {
                        self.rescan_after_batch = false;
                        self.start_scan();
                    }
                }
                Err(message) => {
                    self.status_message = message.clone();
                    self.push_console(format!("Operation aborted: {message}"));
                    self.rescan_after_batch = false;
                }
            }
        }

        repaint
    }
}

/// Console wording per item outcome; quiet successes stay quiet.
fn describe_item(path: &std::path::Path, status: &ItemStatus) -> Option<String> {
    match status {
        ItemStatus::Restored => Some(format!("Restored {}", path.display())),
        ItemStatus::Opened { note: Some(note) } => {
            Some(format!("Opened {} ({note})", path.display()))
        }
        ItemStatus::Opened { note: None } => Some(format!("Opened {}", path.display())),
        ItemStatus::AlreadyOpen => Some(format!("Already open: {}", path.display())),
        ItemStatus::Updated => None,
        ItemStatus::Closed => Some(format!("Closed {}", path.display())),
        ItemStatus::Skipped(reason) => Some(format!("Skipped {}: {reason}", path.display())),
        ItemStatus::Failed(reason) => Some(format!("Failed {}: {reason}", path.display())),
    }
}

/// The newest `session_*.csv` in `dir`, by the timestamp embedded in the
/// name (lexicographic order matches chronological for this format).
pub fn latest_session_file(dir: &std::path::Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.extension().is_some_and(|ext| ext == "csv")
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("session_"))
        })
        .max()
}
