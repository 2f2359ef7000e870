/// Application settings — JSON file with defaults-on-missing behavior.
///
/// Settings are read once per operation, never live-reloaded mid-batch, so
/// a batch always runs against one consistent snapshot.
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Configurable behavior for every core operation.
///
/// Every field has a serde default so a partial (or absent) settings file
/// still yields a usable configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// External-link lookback window in days. A link target modified within
    /// this many days (inclusive) is a candidate for refresh.
    pub lookback_days: i64,
    /// Directory session files are written to and listed from.
    pub session_dir: PathBuf,
    /// Directory link-update reports are written to.
    pub report_dir: PathBuf,
    /// Whether a link-update batch writes its CSV report.
    pub save_report: bool,
    /// Minimum process age before a window-less host process may be
    /// classified Zombie. Guards against killing a process still starting up.
    pub zombie_min_age_secs: u64,
    /// Executable name of the host application, matched case-insensitively.
    pub app_exe_name: String,
    /// Trailing window-title suffix of the host application. Configurable
    /// because localized builds use a translated product name.
    pub window_suffix: String,
    /// Bounded retry count for a transient save failure.
    pub max_save_retries: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            lookback_days: 14,
            session_dir: PathBuf::from("sessions"),
            report_dir: PathBuf::from("logs"),
            save_report: true,
            zombie_min_age_secs: 120,
            app_exe_name: "EXCEL.EXE".to_string(),
            window_suffix: " - Excel".to_string(),
            max_save_retries: 3,
        }
    }
}

impl Settings {
    /// Load settings from `path`, falling back to defaults when the file is
    /// missing or unparseable. A bad settings file must never prevent the
    /// application from starting.
    pub fn load_or_default(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(settings) => settings,
                Err(e) => {
                    warn!("settings file {} is invalid ({e}); using defaults", path.display());
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Persist the current settings as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let settings = Settings::load_or_default(Path::new("does/not/exist.json"));
        assert_eq!(settings.lookback_days, 14);
        assert_eq!(settings.window_suffix, " - Excel");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.json");
        std::fs::write(&path, r#"{ "lookback_days": 30 }"#).unwrap();

        let settings = Settings::load_or_default(&path);
        assert_eq!(settings.lookback_days, 30);
        // Untouched fields come from Default.
        assert_eq!(settings.app_exe_name, "EXCEL.EXE");
    }

    #[test]
    fn invalid_json_falls_back_to_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        let settings = Settings::load_or_default(&path);
        assert_eq!(settings.lookback_days, 14);
    }

    #[test]
    fn save_then_load_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("settings.json");

        let mut settings = Settings::default();
        settings.lookback_days = 7;
        settings.save_report = false;
        settings.save(&path).unwrap();

        let loaded = Settings::load_or_default(&path);
        assert_eq!(loaded.lookback_days, 7);
        assert!(!loaded.save_report);
    }
}
