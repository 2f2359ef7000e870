/// Scripted in-memory automation — the test double and non-Windows stand-in.
///
/// Holds a mutable set of [`MemoryDocument`] descriptions behind a lock and
/// exposes the same capability traits as the COM adapter, so every worker
/// code path (scan, restore, link update) runs unmodified in tests. The
/// shared state is observable after the fact: open calls, refresh calls, and
/// navigation all leave a record the assertions can read.
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::Receiver;

use super::{AutomationSession, Connect, Document};
use crate::error::AutomationError;

/// One scripted document, both the seed state and the live record.
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    pub file_path: PathBuf,
    pub display_name: String,
    pub sheets: Vec<String>,
    pub active_sheet: Option<String>,
    pub active_cell: Option<String>,
    pub link_targets: Vec<PathBuf>,
    /// Targets whose refresh is scripted to fail with a native error.
    pub failing_links: Vec<PathBuf>,
    /// Record of refresh calls, in order.
    pub refreshed: Vec<PathBuf>,
    /// Number of `save` calls scripted to fail before saves succeed.
    pub save_fails: u32,
    pub closed: bool,
}

impl MemoryDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let file_path: PathBuf = path.into();
        let display_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            file_path,
            display_name,
            sheets: vec!["Sheet1".to_string()],
            active_sheet: Some("Sheet1".to_string()),
            active_cell: Some("$A$1".to_string()),
            link_targets: Vec::new(),
            failing_links: Vec::new(),
            refreshed: Vec::new(),
            save_fails: 0,
            closed: false,
        }
    }

    pub fn with_sheets(mut self, sheets: &[&str]) -> Self {
        self.sheets = sheets.iter().map(|s| s.to_string()).collect();
        self.active_sheet = self.sheets.first().cloned();
        self
    }

    pub fn with_position(mut self, sheet: &str, cell: &str) -> Self {
        self.active_sheet = Some(sheet.to_string());
        self.active_cell = Some(cell.to_string());
        self
    }

    pub fn with_links(mut self, targets: Vec<PathBuf>) -> Self {
        self.link_targets = targets;
        self
    }

    pub fn with_failing_link(mut self, target: impl Into<PathBuf>) -> Self {
        self.failing_links.push(target.into());
        self
    }
}

#[derive(Debug, Default)]
struct Shared {
    documents: Vec<MemoryDocument>,
    /// Templates consulted by `open`: sheets and links for a path that is
    /// not open yet. Paths without a template open with one default sheet.
    templates: HashMap<PathBuf, MemoryDocument>,
    open_calls: Vec<PathBuf>,
}

/// The connector. Cheap to clone via `Arc`; every `connect` yields a session
/// over the same shared state.
pub struct MemoryAutomation {
    shared: Arc<Mutex<Shared>>,
    available: AtomicBool,
    connect_count: AtomicUsize,
    /// When set, `connect` blocks until the channel yields (or closes).
    /// Used by the concurrency tests to hold a worker in flight.
    connect_gate: Mutex<Option<Receiver<()>>>,
}

impl Default for MemoryAutomation {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAutomation {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared::default())),
            available: AtomicBool::new(true),
            connect_count: AtomicUsize::new(0),
            connect_gate: Mutex::new(None),
        }
    }

    /// Seed an already-open document.
    pub fn add_document(&self, doc: MemoryDocument) {
        self.shared.lock().documents.push(doc);
    }

    /// Script what `open(path)` produces for a path not yet open.
    pub fn add_template(&self, doc: MemoryDocument) {
        self.shared
            .lock()
            .templates
            .insert(doc.file_path.clone(), doc);
    }

    /// Simulate the host application not running.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Make the next `connect` calls block until `gate` yields.
    pub fn set_connect_gate(&self, gate: Receiver<()>) {
        *self.connect_gate.lock() = Some(gate);
    }

    /// How many sessions have been created so far.
    pub fn connect_count(&self) -> usize {
        self.connect_count.load(Ordering::SeqCst)
    }

    /// Number of times `open` was called for `path`.
    pub fn open_count(&self, path: &Path) -> usize {
        self.shared
            .lock()
            .open_calls
            .iter()
            .filter(|p| p.as_path() == path)
            .count()
    }

    /// Snapshot of the live documents for post-hoc assertions.
    pub fn documents_snapshot(&self) -> Vec<MemoryDocument> {
        self.shared.lock().documents.clone()
    }
}

impl Connect for MemoryAutomation {
    fn connect(&self) -> Result<Box<dyn AutomationSession>, AutomationError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(AutomationError::Unavailable);
        }
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        let gate = self.connect_gate.lock().clone();
        if let Some(rx) = gate {
            // Either an explicit release or a dropped sender unblocks us.
            let _ = rx.recv();
        }
        Ok(Box::new(MemorySession {
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct MemorySession {
    shared: Arc<Mutex<Shared>>,
}

impl AutomationSession for MemorySession {
    fn documents(&self) -> Result<Vec<Box<dyn Document>>, AutomationError> {
        let shared = self.shared.lock();
        Ok(shared
            .documents
            .iter()
            .filter(|d| !d.closed)
            .map(|d| {
                Box::new(MemoryDocHandle {
                    shared: Arc::clone(&self.shared),
                    path: d.file_path.clone(),
                }) as Box<dyn Document>
            })
            .collect())
    }

    fn open(&self, path: &Path) -> Result<Box<dyn Document>, AutomationError> {
        let mut shared = self.shared.lock();
        shared.open_calls.push(path.to_path_buf());

        if !shared.documents.iter().any(|d| d.file_path == path) {
            let doc = shared
                .templates
                .get(path)
                .cloned()
                .unwrap_or_else(|| MemoryDocument::new(path));
            shared.documents.push(doc);
        }
        Ok(Box::new(MemoryDocHandle {
            shared: Arc::clone(&self.shared),
            path: path.to_path_buf(),
        }))
    }
}

/// Handle onto one shared document, keyed by path.
struct MemoryDocHandle {
    shared: Arc<Mutex<Shared>>,
    path: PathBuf,
}

impl MemoryDocHandle {
    fn read<T>(&self, f: impl FnOnce(&MemoryDocument) -> T) -> Result<T, AutomationError> {
        let shared = self.shared.lock();
        shared
            .documents
            .iter()
            .find(|d| d.file_path == self.path)
            .map(f)
            .ok_or_else(|| AutomationError::DocumentNotFound(self.path.clone()))
    }

    fn write<T>(
        &self,
        f: impl FnOnce(&mut MemoryDocument) -> Result<T, AutomationError>,
    ) -> Result<T, AutomationError> {
        let mut shared = self.shared.lock();
        let doc = shared
            .documents
            .iter_mut()
            .find(|d| d.file_path == self.path)
            .ok_or_else(|| AutomationError::DocumentNotFound(self.path.clone()))?;
        f(doc)
    }
}

impl Document for MemoryDocHandle {
    fn file_path(&self) -> PathBuf {
        self.path.clone()
    }

    fn display_name(&self) -> String {
        self.read(|d| d.display_name.clone()).unwrap_or_default()
    }

    fn active_sheet(&self) -> Option<String> {
        self.read(|d| d.active_sheet.clone()).ok().flatten()
    }

    fn active_cell(&self) -> Option<String> {
        self.read(|d| d.active_cell.clone()).ok().flatten()
    }

    fn select(&self, sheet: &str, cell: Option<&str>) -> Result<(), AutomationError> {
        self.write(|d| {
            if !d.sheets.iter().any(|s| s == sheet) {
                return Err(AutomationError::NativeCall(format!(
                    "sheet '{sheet}' not found"
                )));
            }
            d.active_sheet = Some(sheet.to_string());
            if let Some(cell) = cell {
                d.active_cell = Some(cell.to_string());
            }
            Ok(())
        })
    }

    fn save(&self) -> Result<(), AutomationError> {
        self.write(|d| {
            if d.save_fails > 0 {
                d.save_fails -= 1;
                return Err(AutomationError::NativeCall("save refused".to_string()));
            }
            Ok(())
        })
    }

    fn close(&self, _save_changes: bool) -> Result<(), AutomationError> {
        self.write(|d| {
            d.closed = true;
            Ok(())
        })
    }

    fn link_targets(&self) -> Result<Vec<PathBuf>, AutomationError> {
        self.read(|d| d.link_targets.clone())
    }

    fn refresh_link(&self, target: &Path) -> Result<(), AutomationError> {
        self.write(|d| {
            if d.failing_links.iter().any(|p| p == target) {
                return Err(AutomationError::NativeCall(format!(
                    "link refresh failed for {}",
                    target.display()
                )));
            }
            d.refreshed.push(target.to_path_buf());
            Ok(())
        })
    }
}
