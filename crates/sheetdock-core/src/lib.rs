/// SheetDock Core — inventory, session, link-update, and health engine.
///
/// This crate contains all business logic with zero UI dependencies.
/// It is designed to be reusable across different frontends (GUI, CLI, TUI).
///
/// # Modules
///
/// - [`model`] — Workbook inventory records and supporting types.
/// - [`error`] — Error taxonomy shared across all operations.
/// - [`config`] — JSON settings file with defaults-on-missing behavior.
/// - [`automation`] — Capability traits over the spreadsheet automation
///   interface, plus the Windows COM adapter and an in-memory double.
/// - [`ops`] — The concurrency bridge: per-kind operation gate and the
///   worker→UI event types.
/// - [`scanner`] — Background inventory scan combining automation
///   enumeration with OS window reconnaissance.
/// - [`session`] — CSV session store: save, validate, and restore.
/// - [`links`] — External-link staleness evaluation and batched refresh.
/// - [`reconcile`] — Window activate / bring-to-front / minimize batches.
/// - [`health`] — Host-process health classification and guarded cleanup.
/// - [`platform`] — Window and process access for Windows, with inert
///   fallbacks elsewhere.
pub mod automation;
pub mod config;
pub mod error;
pub mod health;
pub mod links;
pub mod model;
pub mod ops;
pub mod platform;
pub mod reconcile;
pub mod scanner;
pub mod session;
