/// Error taxonomy shared by every operation.
///
/// Propagation policy: per-item failures inside a batch are caught at the
/// item boundary and recorded in the batch report; only operation-setup
/// failures (no reachable application instance, malformed session file)
/// abort before any item is processed.
use std::path::PathBuf;
use thiserror::Error;

use crate::ops::OpKind;

/// Failures talking to the spreadsheet automation interface.
#[derive(Debug, Error)]
pub enum AutomationError {
    /// No running application instance is reachable. Fatal to the current
    /// operation; surfaced to the user and never retried silently, since
    /// auto-launching the host would change user state.
    #[error("no running spreadsheet application instance")]
    Unavailable,

    /// The file was missing at open/activate time. Skipped and recorded;
    /// the batch continues.
    #[error("document not found: {0}")]
    DocumentNotFound(PathBuf),

    /// A transient native failure (document locked, link refresh refused).
    /// Recorded per item; the caller may retry the whole operation manually.
    #[error("native call failed: {0}")]
    NativeCall(String),
}

/// Failures reading or writing session files.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Structurally invalid session file — required columns absent or a row
    /// that cannot be decoded. Fatal to that load; nothing is applied.
    #[error("malformed session file: {0}")]
    Malformed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// A second request of an operation kind arrived while one was in flight.
///
/// Requests are rejected, never queued: two workers of the same kind would
/// race on the same native automation objects.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("a {0:?} operation is already in flight")]
pub struct OpBusy(pub OpKind);
