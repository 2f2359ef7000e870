/// Process snapshots and termination for the health monitor.
///
/// A snapshot is a point-in-time read; it is recomputed on every health
/// check and never cached across checks.
use chrono::{DateTime, Local};
use std::collections::HashSet;

/// One observed process, before classification.
#[derive(Debug, Clone)]
pub struct ProcessSnapshot {
    pub pid: u32,
    pub exe_name: String,
    /// Process creation time; `None` when the process could not be opened
    /// for query (insufficient rights).
    pub started: Option<DateTime<Local>>,
    /// Working-set size in bytes, best effort.
    pub memory_bytes: u64,
    /// Whether the process owns at least one visible titled top-level window.
    pub has_window: bool,
}

#[cfg(windows)]
mod imp {
    use super::*;
    use chrono::TimeZone;
    use tracing::warn;
    use windows::Win32::Foundation::{CloseHandle, FILETIME, HANDLE};
    use windows::Win32::System::Diagnostics::ToolHelp::{
        CreateToolhelp32Snapshot, Process32FirstW, Process32NextW, PROCESSENTRY32W,
        TH32CS_SNAPPROCESS,
    };
    use windows::Win32::System::ProcessStatus::{
        GetProcessMemoryInfo, PROCESS_MEMORY_COUNTERS,
    };
    use windows::Win32::System::Threading::{
        GetProcessTimes, OpenProcess, TerminateProcess, PROCESS_QUERY_LIMITED_INFORMATION,
        PROCESS_TERMINATE,
    };

    /// Seconds between 1601-01-01 (FILETIME epoch) and 1970-01-01.
    const FILETIME_UNIX_OFFSET_SECS: i64 = 11_644_473_600;

    fn filetime_to_local(ft: FILETIME) -> Option<DateTime<Local>> {
        let ticks = ((ft.dwHighDateTime as u64) << 32) | ft.dwLowDateTime as u64;
        if ticks == 0 {
            return None;
        }
        let unix_secs = (ticks / 10_000_000) as i64 - FILETIME_UNIX_OFFSET_SECS;
        let nanos = ((ticks % 10_000_000) * 100) as u32;
        Local.timestamp_opt(unix_secs, nanos).single()
    }

    fn query_process(pid: u32) -> (Option<DateTime<Local>>, u64) {
        unsafe {
            let handle: HANDLE = match OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid) {
                Ok(h) => h,
                Err(_) => return (None, 0),
            };

            let mut creation = FILETIME::default();
            let mut exit = FILETIME::default();
            let mut kernel = FILETIME::default();
            let mut user = FILETIME::default();
            let started =
                if GetProcessTimes(handle, &mut creation, &mut exit, &mut kernel, &mut user)
                    .is_ok()
                {
                    filetime_to_local(creation)
                } else {
                    None
                };

            let mut counters = PROCESS_MEMORY_COUNTERS {
                cb: std::mem::size_of::<PROCESS_MEMORY_COUNTERS>() as u32,
                ..Default::default()
            };
            let memory = if GetProcessMemoryInfo(handle, &mut counters, counters.cb).is_ok() {
                counters.WorkingSetSize as u64
            } else {
                0
            };

            let _ = CloseHandle(handle);
            (started, memory)
        }
    }

    /// Enumerate every process whose executable name matches `exe_name`
    /// (case-insensitive). `windowed_pids` comes from the same pass as the
    /// window index so one health check sees one consistent desktop state.
    pub fn snapshot_matching(exe_name: &str, windowed_pids: &HashSet<u32>) -> Vec<ProcessSnapshot> {
        let mut out = Vec::new();
        unsafe {
            let snapshot = match CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) {
                Ok(h) => h,
                Err(e) => {
                    warn!("process snapshot failed: {e}");
                    return out;
                }
            };

            let mut entry = PROCESSENTRY32W {
                dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
                ..Default::default()
            };

            if Process32FirstW(snapshot, &mut entry).is_ok() {
                loop {
                    let name_len = entry
                        .szExeFile
                        .iter()
                        .position(|&c| c == 0)
                        .unwrap_or(entry.szExeFile.len());
                    let name = String::from_utf16_lossy(&entry.szExeFile[..name_len]);

                    if name.eq_ignore_ascii_case(exe_name) {
                        let (started, memory_bytes) = query_process(entry.th32ProcessID);
                        out.push(ProcessSnapshot {
                            pid: entry.th32ProcessID,
                            exe_name: name,
                            started,
                            memory_bytes,
                            has_window: windowed_pids.contains(&entry.th32ProcessID),
                        });
                    }

                    if Process32NextW(snapshot, &mut entry).is_err() {
                        break;
                    }
                }
            }
            let _ = CloseHandle(snapshot);
        }
        out
    }

    /// Terminate `pid`. Exit code 1, matching a forced kill.
    pub fn terminate(pid: u32) -> Result<(), String> {
        unsafe {
            let handle =
                OpenProcess(PROCESS_TERMINATE, false, pid).map_err(|e| e.to_string())?;
            let result = TerminateProcess(handle, 1).map_err(|e| e.to_string());
            let _ = CloseHandle(handle);
            result
        }
    }
}

#[cfg(windows)]
pub use imp::{snapshot_matching, terminate};

#[cfg(not(windows))]
pub fn snapshot_matching(_exe_name: &str, _windowed_pids: &HashSet<u32>) -> Vec<ProcessSnapshot> {
    Vec::new()
}

#[cfg(not(windows))]
pub fn terminate(_pid: u32) -> Result<(), String> {
    Err("process termination is only supported on Windows".to_string())
}
