/// Desktop window access — enumeration, activation, minimize.
///
/// All calls are blocking Win32 and therefore only ever made from worker
/// threads. Window handles are plain `isize` values in the data model; they
/// may go stale between scans, in which case the operations below simply
/// report failure for that handle.
use super::titles::WindowInfo;

/// Seam for window operations so batches can be exercised without a desktop.
pub trait DesktopOps: Send + Sync {
    /// Restore (if minimized) and bring the window to the foreground.
    fn activate(&self, handle: isize) -> bool;
    /// Minimize the window.
    fn minimize(&self, handle: isize) -> bool;
}

/// The real desktop. Inert off Windows.
pub struct NativeDesktop;

#[cfg(windows)]
mod imp {
    use super::*;
    use std::collections::HashSet;
    use tracing::warn;
    use windows::Win32::Foundation::{BOOL, HWND, LPARAM};
    use windows::Win32::UI::WindowsAndMessaging::{
        EnumWindows, GetWindowTextW, GetWindowThreadProcessId, IsWindowVisible,
        SetForegroundWindow, ShowWindow, SW_MINIMIZE, SW_RESTORE,
    };

    struct EnumState {
        windows: Vec<WindowInfo>,
        pids: HashSet<u32>,
    }

    /// Collect every visible, titled top-level window in z-order (front-most
    /// first — the order `EnumWindows` reports).
    unsafe extern "system" fn enum_callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
        let state = &mut *(lparam.0 as *mut EnumState);

        if IsWindowVisible(hwnd).as_bool() {
            let mut buf = [0u16; 512];
            let len = GetWindowTextW(hwnd, &mut buf);
            if len > 0 {
                state.windows.push(WindowInfo {
                    handle: hwnd.0 as isize,
                    title: String::from_utf16_lossy(&buf[..len as usize]),
                });
                let mut pid = 0u32;
                GetWindowThreadProcessId(hwnd, Some(&mut pid));
                if pid != 0 {
                    state.pids.insert(pid);
                }
            }
        }
        true.into()
    }

    /// Enumerate top-level windows plus the set of process ids that own at
    /// least one visible titled window (consumed by the health monitor).
    pub fn enumerate() -> (Vec<WindowInfo>, HashSet<u32>) {
        let mut state = EnumState {
            windows: Vec::new(),
            pids: HashSet::new(),
        };
        unsafe {
            if EnumWindows(Some(enum_callback), LPARAM(&mut state as *mut _ as isize)).is_err() {
                warn!("EnumWindows failed; window index will be empty");
            }
        }
        (state.windows, state.pids)
    }

    impl DesktopOps for NativeDesktop {
        fn activate(&self, handle: isize) -> bool {
            unsafe {
                let hwnd = HWND(handle as *mut _);
                let _ = ShowWindow(hwnd, SW_RESTORE);
                SetForegroundWindow(hwnd).as_bool()
            }
        }

        fn minimize(&self, handle: isize) -> bool {
            unsafe { ShowWindow(HWND(handle as *mut _), SW_MINIMIZE).as_bool() }
        }
    }
}

#[cfg(windows)]
pub use imp::enumerate;

#[cfg(not(windows))]
pub fn enumerate() -> (Vec<WindowInfo>, std::collections::HashSet<u32>) {
    (Vec::new(), std::collections::HashSet::new())
}

#[cfg(not(windows))]
impl DesktopOps for NativeDesktop {
    fn activate(&self, _handle: isize) -> bool {
        false
    }

    fn minimize(&self, _handle: isize) -> bool {
        false
    }
}
