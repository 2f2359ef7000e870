/// Excel COM adapter — late-binding `IDispatch` access to a running
/// application instance.
///
/// Attaches with `GetActiveObject` (never launches the host) and drives the
/// object model by name: `Workbooks`, `ActiveSheet`, `ActiveCell`,
/// `LinkSources`, `UpdateLink`. Everything here is `cfg(windows)`.
///
/// # Apartment rules
///
/// COM objects live in the apartment of the thread that created them, so a
/// [`ComSession`] initializes COM on construction, must stay on its creating
/// thread, and uninitializes on drop. The session type is `!Send` by
/// construction (it owns raw interface pointers); workers connect, use, and
/// drop entirely within their own thread.
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use windows::core::{w, BSTR, GUID, PCWSTR, VARIANT};
use windows::Win32::System::Com::{
    CLSIDFromProgID, CoInitializeEx, CoUninitialize, IDispatch, COINIT_APARTMENTTHREADED,
    DISPATCH_METHOD, DISPATCH_PROPERTYGET, DISPPARAMS,
};
use windows::Win32::System::Ole::{
    GetActiveObject, SafeArrayGetElement, SafeArrayGetLBound, SafeArrayGetUBound,
};

use super::{AutomationSession, Connect, Document};
use crate::error::AutomationError;

/// `xlExcelLinks` from the Excel object model: worksheet-to-workbook links.
const XL_EXCEL_LINKS: i32 = 1;

/// Default locale for `IDispatch` calls.
const LOCALE_NEUTRAL: u32 = 0;

/// Thread-safe factory; each `connect` builds a fresh apartment-local
/// session on the calling thread.
pub struct ComConnector;

impl ComConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ComConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connect for ComConnector {
    fn connect(&self) -> Result<Box<dyn AutomationSession>, AutomationError> {
        Ok(Box::new(ComSession::attach()?))
    }
}

/// One apartment-local connection to `Excel.Application`.
struct ComSession {
    app: IDispatch,
    /// Raw-pointer marker keeps this type `!Send`/`!Sync`.
    _apartment: PhantomData<*mut ()>,
}

impl ComSession {
    fn attach() -> Result<Self, AutomationError> {
        unsafe {
            // S_FALSE (already initialized on this thread) is fine.
            let hr = CoInitializeEx(None, COINIT_APARTMENTTHREADED);
            if hr.is_err() {
                return Err(AutomationError::NativeCall(format!(
                    "CoInitializeEx failed: {hr}"
                )));
            }

            let clsid: GUID = CLSIDFromProgID(w!("Excel.Application"))
                .map_err(|e| AutomationError::NativeCall(format!("CLSIDFromProgID: {e}")))?;

            // Attach to the running instance only. A launch would change
            // user state, so absence is reported, not repaired.
            let mut unknown = None;
            if GetActiveObject(&clsid, None, &mut unknown).is_err() {
                CoUninitialize();
                return Err(AutomationError::Unavailable);
            }
            let unknown = match unknown {
                Some(u) => u,
                None => {
                    CoUninitialize();
                    return Err(AutomationError::Unavailable);
                }
            };
            let app: IDispatch = unknown.cast().map_err(|e| {
                CoUninitialize();
                AutomationError::NativeCall(format!("IDispatch cast: {e}"))
            })?;

            debug!("attached to running Excel instance");
            Ok(Self {
                app,
                _apartment: PhantomData,
            })
        }
    }

    /// Active cell address of the whole application, best-effort.
    fn active_cell(&self) -> Option<String> {
        let cell = get_property(&self.app, "ActiveCell", &mut []).ok()?;
        let cell: IDispatch = IDispatch::try_from(&cell).ok()?;
        let address = get_property(&cell, "Address", &mut []).ok()?;
        Some(BSTR::try_from(&address).ok()?.to_string())
    }
}

impl Drop for ComSession {
    fn drop(&mut self) {
        unsafe {
            CoUninitialize();
        }
    }
}

impl AutomationSession for ComSession {
    fn documents(&self) -> Result<Vec<Box<dyn Document>>, AutomationError> {
        let books = get_dispatch(&self.app, "Workbooks", &mut [])?;
        let count = get_i32(&books, "Count", &mut [])?;

        let active_cell = self.active_cell();
        let mut out: Vec<Box<dyn Document>> = Vec::with_capacity(count.max(0) as usize);
        for index in 1..=count {
            // A workbook may close between Count and Item; skip, not fail.
            match get_dispatch(&books, "Item", &mut [VARIANT::from(index)]) {
                Ok(wb) => out.push(Box::new(ComDocument {
                    dispatch: wb,
                    app_active_cell: active_cell.clone(),
                    _apartment: PhantomData,
                })),
                Err(e) => warn!("workbook {index} vanished during enumeration: {e}"),
            }
        }
        Ok(out)
    }

    fn open(&self, path: &Path) -> Result<Box<dyn Document>, AutomationError> {
        let books = get_dispatch(&self.app, "Workbooks", &mut [])?;
        // Open(Filename, UpdateLinks=0): never refresh links on load.
        let wb = call_dispatch(
            &books,
            "Open",
            &mut [
                VARIANT::from(BSTR::from(path.to_string_lossy().as_ref())),
                VARIANT::from(0i32),
            ],
        )?;
        Ok(Box::new(ComDocument {
            dispatch: wb,
            app_active_cell: None,
            _apartment: PhantomData,
        }))
    }
}

struct ComDocument {
    dispatch: IDispatch,
    /// Application-level active cell captured at enumeration time; Excel
    /// exposes the selection on the application, not per workbook.
    app_active_cell: Option<String>,
    _apartment: PhantomData<*mut ()>,
}

impl Document for ComDocument {
    fn file_path(&self) -> PathBuf {
        get_string(&self.dispatch, "FullName", &mut [])
            .map(PathBuf::from)
            .unwrap_or_default()
    }

    fn display_name(&self) -> String {
        get_string(&self.dispatch, "Name", &mut []).unwrap_or_default()
    }

    fn active_sheet(&self) -> Option<String> {
        let sheet = get_dispatch(&self.dispatch, "ActiveSheet", &mut []).ok()?;
        get_string(&sheet, "Name", &mut []).ok()
    }

    fn active_cell(&self) -> Option<String> {
        self.app_active_cell.clone()
    }

    fn select(&self, sheet: &str, cell: Option<&str>) -> Result<(), AutomationError> {
        let sheets = get_dispatch(&self.dispatch, "Sheets", &mut [])?;
        let target = get_dispatch(&sheets, "Item", &mut [VARIANT::from(BSTR::from(sheet))])?;
        call(&target, "Activate", &mut [])?;
        if let Some(cell) = cell {
            let range = get_dispatch(&target, "Range", &mut [VARIANT::from(BSTR::from(cell))])?;
            call(&range, "Select", &mut [])?;
        }
        Ok(())
    }

    fn save(&self) -> Result<(), AutomationError> {
        call(&self.dispatch, "Save", &mut []).map(|_| ())
    }

    fn close(&self, save_changes: bool) -> Result<(), AutomationError> {
        call(&self.dispatch, "Close", &mut [VARIANT::from(save_changes)]).map(|_| ())
    }

    fn link_targets(&self) -> Result<Vec<PathBuf>, AutomationError> {
        // LinkSources returns VT_EMPTY when the workbook has no links, and a
        // 1-based SAFEARRAY of BSTR paths otherwise.
        let sources = call(
            &self.dispatch,
            "LinkSources",
            &mut [VARIANT::from(XL_EXCEL_LINKS)],
        )?;
        Ok(variant_string_array(&sources)
            .into_iter()
            .map(PathBuf::from)
            .collect())
    }

    fn refresh_link(&self, target: &Path) -> Result<(), AutomationError> {
        // UpdateLink(Name, Type=xlExcelLinks)
        call(
            &self.dispatch,
            "UpdateLink",
            &mut [
                VARIANT::from(BSTR::from(target.to_string_lossy().as_ref())),
                VARIANT::from(XL_EXCEL_LINKS),
            ],
        )
        .map(|_| ())
    }
}

// ─── Late-binding plumbing ──────────────────────────────────────────────────

/// Resolve a member name to its DISPID.
fn dispid(dispatch: &IDispatch, name: &str) -> Result<i32, AutomationError> {
    let wide: Vec<u16> = name.encode_utf16().chain(std::iter::once(0)).collect();
    let names = [PCWSTR(wide.as_ptr())];
    let mut id = 0i32;
    unsafe {
        dispatch
            .GetIDsOfNames(&GUID::zeroed(), names.as_ptr(), 1, LOCALE_NEUTRAL, &mut id)
            .map_err(|e| AutomationError::NativeCall(format!("{name}: {e}")))?;
    }
    Ok(id)
}

/// Invoke `name` on `dispatch`. `args` are in natural call order; COM wants
/// them reversed in the DISPPARAMS block.
fn invoke(
    dispatch: &IDispatch,
    name: &str,
    flags: windows::Win32::System::Com::DISPATCH_FLAGS,
    args: &mut [VARIANT],
) -> Result<VARIANT, AutomationError> {
    let id = dispid(dispatch, name)?;
    args.reverse();
    let params = DISPPARAMS {
        rgvarg: if args.is_empty() {
            std::ptr::null_mut()
        } else {
            args.as_mut_ptr() as *mut _
        },
        rgdispidNamedArgs: std::ptr::null_mut(),
        cArgs: args.len() as u32,
        cNamedArgs: 0,
    };
    let mut result = VARIANT::new();
    unsafe {
        dispatch
            .Invoke(
                id,
                &GUID::zeroed(),
                LOCALE_NEUTRAL,
                flags,
                &params,
                Some(&mut result as *mut _ as *mut _),
                None,
                None,
            )
            .map_err(|e| AutomationError::NativeCall(format!("{name}: {e}")))?;
    }
    Ok(result)
}

fn get_property(
    dispatch: &IDispatch,
    name: &str,
    args: &mut [VARIANT],
) -> Result<VARIANT, AutomationError> {
    invoke(dispatch, name, DISPATCH_PROPERTYGET, args)
}

fn call(
    dispatch: &IDispatch,
    name: &str,
    args: &mut [VARIANT],
) -> Result<VARIANT, AutomationError> {
    // Excel accepts METHOD|PROPERTYGET for parameterized members like
    // Item/Range; plain methods ignore the extra flag.
    invoke(dispatch, name, DISPATCH_METHOD | DISPATCH_PROPERTYGET, args)
}

fn get_dispatch(
    dispatch: &IDispatch,
    name: &str,
    args: &mut [VARIANT],
) -> Result<IDispatch, AutomationError> {
    let v = call(dispatch, name, args)?;
    IDispatch::try_from(&v).map_err(|e| AutomationError::NativeCall(format!("{name}: {e}")))
}

fn call_dispatch(
    dispatch: &IDispatch,
    name: &str,
    args: &mut [VARIANT],
) -> Result<IDispatch, AutomationError> {
    get_dispatch(dispatch, name, args)
}

fn get_string(
    dispatch: &IDispatch,
    name: &str,
    args: &mut [VARIANT],
) -> Result<String, AutomationError> {
    let v = get_property(dispatch, name, args)?;
    BSTR::try_from(&v)
        .map(|b| b.to_string())
        .map_err(|e| AutomationError::NativeCall(format!("{name}: {e}")))
}

fn get_i32(
    dispatch: &IDispatch,
    name: &str,
    args: &mut [VARIANT],
) -> Result<i32, AutomationError> {
    let v = get_property(dispatch, name, args)?;
    i32::try_from(&v).map_err(|e| AutomationError::NativeCall(format!("{name}: {e}")))
}

/// Flatten a VARIANT holding a 1-dimensional SAFEARRAY of BSTRs. VT_EMPTY
/// (no links) yields an empty vec; anything unreadable is skipped.
fn variant_string_array(variant: &VARIANT) -> Vec<String> {
    // SAFETY: layout access mirrors the VARIANT union; the array pointer is
    // only dereferenced when the VT_ARRAY bit is set.
    unsafe {
        let raw = variant.as_raw();
        const VT_ARRAY: u16 = 0x2000;
        if raw.Anonymous.Anonymous.vt & VT_ARRAY == 0 {
            return Vec::new();
        }
        let array = raw.Anonymous.Anonymous.Anonymous.parray as *mut _;

        let (Ok(lower), Ok(upper)) = (SafeArrayGetLBound(array, 1), SafeArrayGetUBound(array, 1))
        else {
            return Vec::new();
        };

        let mut out = Vec::with_capacity((upper - lower + 1).max(0) as usize);
        for index in lower..=upper {
            let mut element = BSTR::default();
            if SafeArrayGetElement(array, &index, &mut element as *mut _ as *mut _).is_ok() {
                out.push(element.to_string());
            }
        }
        out
    }
}
