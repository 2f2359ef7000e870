/// Capability traits over the spreadsheet automation interface.
///
/// The native object model is duck-typed (any property callable with no
/// declared contract); the rest of the core depends only on these narrow
/// capability traits, implemented by an adapter over the real COM objects
/// ([`com`], Windows only) and by a scripted in-memory double ([`memory`])
/// used by the test suites and on non-Windows hosts.
///
/// # Thread affinity
///
/// Automation objects created on one thread must not be used from another,
/// so sessions are deliberately **not** `Send`: a worker calls
/// [`Connect::connect`] on its own thread, uses the session there, and drops
/// it before the thread exits. Only plain data records cross threads.
pub mod memory;

#[cfg(windows)]
pub mod com;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::AutomationError;

/// Thread-safe factory handed to workers; each worker builds its own
/// isolated automation session from it.
pub trait Connect: Send + Sync {
    /// Attach to a *running* application instance. Fails fast with
    /// [`AutomationError::Unavailable`] when none is reachable — the host
    /// is never auto-launched, since that would change user state.
    fn connect(&self) -> Result<Box<dyn AutomationSession>, AutomationError>;
}

/// A per-worker connection to the automation interface.
pub trait AutomationSession {
    /// Every document currently open in the application, in the object
    /// model's enumeration order.
    fn documents(&self) -> Result<Vec<Box<dyn Document>>, AutomationError>;

    /// Open the document at `path` without refreshing its external links
    /// (link freshness is the link updater's job, not the loader's).
    fn open(&self, path: &Path) -> Result<Box<dyn Document>, AutomationError>;
}

/// One open document: path, working position, and the operations the core
/// performs on it.
pub trait Document {
    fn file_path(&self) -> PathBuf;
    fn display_name(&self) -> String;
    fn active_sheet(&self) -> Option<String>;
    fn active_cell(&self) -> Option<String>;

    /// Activate the named sheet and optionally select a cell on it.
    fn select(&self, sheet: &str, cell: Option<&str>) -> Result<(), AutomationError>;

    /// Save in place.
    fn save(&self) -> Result<(), AutomationError>;

    /// Close, optionally saving pending changes first.
    fn close(&self, save_changes: bool) -> Result<(), AutomationError>;

    /// Absolute paths of every external link target recorded in the
    /// document.
    fn link_targets(&self) -> Result<Vec<PathBuf>, AutomationError>;

    /// Refresh the external link pointing at `target`. Forces a full
    /// recalculation in the host, which is why the caller gates this behind
    /// the staleness decision.
    fn refresh_link(&self, target: &Path) -> Result<(), AutomationError>;
}

/// The connector used by the shipped binary: COM on Windows, the in-memory
/// double elsewhere (where no host application exists to attach to).
pub fn default_connector() -> Arc<dyn Connect> {
    #[cfg(windows)]
    {
        Arc::new(com::ComConnector::new())
    }
    #[cfg(not(windows))]
    {
        Arc::new(memory::MemoryAutomation::new())
    }
}
