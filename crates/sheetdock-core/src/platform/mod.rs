/// Platform access — window enumeration/control and process snapshots.
///
/// Real implementations are Windows-only; other hosts get inert fallbacks so
/// the core (and its test suite) builds everywhere. Title matching is pure
/// and platform-independent.
pub mod desktop;
pub mod process;
pub mod titles;
