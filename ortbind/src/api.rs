//! Binding to the ONNX Runtime function table.
//!
//! The shared library exports a single symbol, `OrtGetApiBase`. The base
//! accessor hands out a table of entry points for one ABI version, and
//! every other module reaches the engine through that table only.

use std::ffi::{CStr, CString, OsStr};
use std::ops::Deref;
use std::os::raw::{c_char, c_int};
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::Mutex;

use libloading::Library;
use once_cell::sync::OnceCell;
use tracing::debug;

use crate::allocator::{Allocator, MemoryInfo};
use crate::environment::EnvSlot;
use crate::error::{OrtError, Result};
use crate::ffi::{self, OrtApi, OrtApiBase, OrtChar};

/// Environment variable naming the shared library to load.
pub const DYLIB_PATH_ENV: &str = "ORT_DYLIB_PATH";

#[cfg(target_os = "windows")]
const DEFAULT_LIBRARY: &str = "onnxruntime.dll";
#[cfg(target_os = "macos")]
const DEFAULT_LIBRARY: &str = "libonnxruntime.dylib";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const DEFAULT_LIBRARY: &str = "libonnxruntime.so";

/// Calls a status-returning table entry and checks the result.
///
/// Expands to `Result<()>`; an unset entry is `OrtError::MissingEntry`.
macro_rules! ortsys {
    ($api:expr, $name:ident($($arg:expr),* $(,)?)) => {{
        let api: &$crate::ffi::OrtApi = &$api;
        match api.$name {
            Some(f) => $crate::status::check(api, unsafe { f($($arg),*) }),
            None => Err($crate::error::OrtError::MissingEntry(stringify!($name))),
        }
    }};
}
pub(crate) use ortsys;

static GLOBAL: OnceCell<Api> = OnceCell::new();

/// A bound function table plus the process-wide state that hangs off it:
/// the environment singleton, the default allocator and the CPU memory
/// descriptor.
pub struct Api {
    table: &'static OrtApi,
    version: u32,
    lib_version: Option<String>,
    append_coreml: Option<ffi::AppendCoreMlFn>,
    pub(crate) env: Mutex<EnvSlot>,
    pub(crate) allocator: OnceCell<Allocator>,
    pub(crate) memory_info: OnceCell<MemoryInfo>,
    // Last, so the table outlives everything above it.
    _library: Option<Library>,
}

impl Api {
    /// Returns the process-wide table, binding [`ffi::ORT_API_VERSION`]
    /// from the default library on first use.
    pub fn global() -> Result<&'static Api> {
        match GLOBAL.get() {
            Some(api) => Ok(api),
            None => Self::bind(ffi::ORT_API_VERSION),
        }
    }

    /// Binds `version` from the library named by `ORT_DYLIB_PATH`, or the
    /// platform default name.
    pub fn bind(version: u32) -> Result<&'static Api> {
        Self::init(library_path(), version)
    }

    /// Binds `version` from an explicit library path.
    ///
    /// The first successful call wins. Binding a different version later is
    /// an error; the table is never swapped.
    pub fn init(path: impl AsRef<Path>, version: u32) -> Result<&'static Api> {
        let api = GLOBAL.get_or_try_init(|| {
            let api = Self::load(path.as_ref(), version)?;
            unsafe { libc::atexit(teardown) };
            Ok::<_, OrtError>(api)
        })?;
        if api.version != version {
            return Err(OrtError::Binding(format!(
                "already bound to ABI version {}, requested {version}",
                api.version
            )));
        }
        Ok(api)
    }

    /// Wraps a table that did not come from a loaded library.
    ///
    /// The returned value lives for the rest of the process and gets its own
    /// environment.
    ///
    /// # Safety
    ///
    /// `table` must follow the `OrtApi` layout for at least
    /// [`ffi::ORT_API_VERSION`], and its entries must behave as documented.
    pub unsafe fn from_table(table: &'static OrtApi, version: u32) -> &'static Api {
        Box::leak(Box::new(Self::new(table, version, None, None, None)))
    }

    fn new(
        table: &'static OrtApi,
        version: u32,
        lib_version: Option<String>,
        append_coreml: Option<ffi::AppendCoreMlFn>,
        library: Option<Library>,
    ) -> Self {
        Self {
            table,
            version,
            lib_version,
            append_coreml,
            env: Mutex::new(EnvSlot::Uninit),
            allocator: OnceCell::new(),
            memory_info: OnceCell::new(),
            _library: library,
        }
    }

    fn load(path: &Path, version: u32) -> Result<Self> {
        if version < ffi::ORT_API_VERSION {
            return Err(OrtError::Binding(format!(
                "ABI version {version} is older than the supported layout {}",
                ffi::ORT_API_VERSION
            )));
        }

        let library = unsafe { Library::new(path) }
            .map_err(|e| OrtError::Binding(format!("load {}: {e}", path.display())))?;
        let base = {
            let get_base = unsafe { library.get::<ffi::OrtGetApiBaseFn>(b"OrtGetApiBase\0") }
                .map_err(|e| OrtError::Binding(format!("{}: {e}", path.display())))?;
            unsafe { get_base() }
        };
        if base.is_null() {
            return Err(OrtError::Binding(format!(
                "{}: OrtGetApiBase returned null",
                path.display()
            )));
        }
        let (table, lib_version) = unsafe { bind_base(&*base, version) }?;

        // Exported outside the table, and only by Apple builds.
        let append_coreml = unsafe {
            library.get::<ffi::AppendCoreMlFn>(b"OrtSessionOptionsAppendExecutionProvider_CoreML\0")
        }
        .ok()
        .map(|symbol| *symbol);

        debug!(
            path = %path.display(),
            version,
            lib_version = %lib_version,
            "ort: bound function table"
        );
        Ok(Self::new(table, version, Some(lib_version), append_coreml, Some(library)))
    }

    /// ABI version of the bound table.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Engine version string, e.g. `1.16.3`. `None` for tables that did not
    /// come from a loaded library.
    pub fn lib_version(&self) -> Option<&str> {
        self.lib_version.as_deref()
    }

    pub fn table(&self) -> &'static OrtApi {
        self.table
    }

    pub(crate) fn append_coreml(&self) -> Option<ffi::AppendCoreMlFn> {
        self.append_coreml
    }

    /// Execution providers compiled into the engine.
    pub fn available_providers(&self) -> Result<Vec<String>> {
        let mut list: *mut *mut c_char = ptr::null_mut();
        let mut len: c_int = 0;
        ortsys!(self, GetAvailableProviders(&mut list, &mut len))?;
        let names = (0..len.max(0) as usize)
            .map(|i| unsafe { CStr::from_ptr(*list.add(i)) }.to_string_lossy().into_owned())
            .collect();
        ortsys!(self, ReleaseAvailableProviders(list, len))?;
        Ok(names)
    }
}

impl Deref for Api {
    type Target = OrtApi;

    fn deref(&self) -> &OrtApi {
        self.table
    }
}

/// Requests `version` from a base accessor.
///
/// # Safety
///
/// `base` must be a valid accessor returned by `OrtGetApiBase`.
pub(crate) unsafe fn bind_base(base: &OrtApiBase, version: u32) -> Result<(&'static OrtApi, String)> {
    let lib_version = unsafe {
        let ptr = (base.GetVersionString)();
        if ptr.is_null() {
            String::new()
        } else {
            CStr::from_ptr(ptr).to_string_lossy().into_owned()
        }
    };
    let table = unsafe { (base.GetApi)(version) };
    if table.is_null() {
        return Err(OrtError::Binding(format!(
            "onnxruntime {lib_version} does not provide ABI version {version}"
        )));
    }
    let table: &'static OrtApi = unsafe { &*table };
    check_required(table)?;
    Ok((table, lib_version))
}

fn check_required(table: &OrtApi) -> Result<()> {
    macro_rules! require {
        ($($name:ident),*) => {
            $(
                if table.$name.is_none() {
                    return Err(OrtError::MissingEntry(stringify!($name)));
                }
            )*
        };
    }
    require!(GetErrorCode, GetErrorMessage, ReleaseStatus, CreateEnv, ReleaseEnv);
    Ok(())
}

fn library_path() -> PathBuf {
    std::env::var_os(DYLIB_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LIBRARY))
}

extern "C" fn teardown() {
    if let Some(api) = GLOBAL.get() {
        api.shutdown_environment();
    }
}

// ---------------------------------------------------------------------------
// String conversion
// ---------------------------------------------------------------------------

pub(crate) fn cstring(s: &str) -> Result<CString> {
    CString::new(s).map_err(|e| OrtError::Argument(format!("string contains NUL: {e}")))
}

/// Encodes a path for entries taking `ORTCHAR_T*`.
#[cfg(not(windows))]
pub(crate) fn ort_path(path: &OsStr) -> Result<Vec<OrtChar>> {
    use std::os::unix::ffi::OsStrExt;

    let bytes = path.as_bytes();
    if bytes.contains(&0) {
        return Err(OrtError::Argument(format!(
            "path contains NUL: {}",
            path.to_string_lossy()
        )));
    }
    Ok(bytes
        .iter()
        .map(|&b| b as OrtChar)
        .chain(std::iter::once(0))
        .collect())
}

#[cfg(windows)]
pub(crate) fn ort_path(path: &OsStr) -> Result<Vec<OrtChar>> {
    use std::os::windows::ffi::OsStrExt;

    let wide: Vec<u16> = path.encode_wide().collect();
    if wide.contains(&0) {
        return Err(OrtError::Argument(format!(
            "path contains NUL: {}",
            path.to_string_lossy()
        )));
    }
    Ok(wide.into_iter().chain(std::iter::once(0)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock;

    #[test]
    fn base_binds_pinned_version() {
        let (table, lib_version) = unsafe { bind_base(mock::api_base(), ffi::ORT_API_VERSION) }.unwrap();
        assert!(table.CreateEnv.is_some());
        assert_eq!(lib_version, mock::VERSION_STRING);
    }

    #[test]
    fn base_rejects_unknown_version() {
        let err = unsafe { bind_base(mock::api_base(), 99) }.err().unwrap();
        assert!(matches!(err, OrtError::Binding(_)), "{err:?}");
        assert!(err.to_string().contains("99"));
    }

    #[test]
    fn old_version_is_rejected_before_loading() {
        let err = Api::load(Path::new("/nonexistent/libonnxruntime.so"), 7)
            .err()
            .unwrap();
        assert!(err.to_string().contains("older"), "{err}");
    }

    #[test]
    fn missing_library_is_binding_error() {
        let err = Api::load(Path::new("/nonexistent/libonnxruntime.so"), ffi::ORT_API_VERSION)
            .err()
            .unwrap();
        assert!(matches!(err, OrtError::Binding(_)), "{err:?}");
    }

    #[test]
    fn unset_entry_is_missing_entry() {
        let table = OrtApi::empty();
        let err = ortsys!(table, DisableTelemetryEvents(ptr::null())).unwrap_err();
        assert!(matches!(err, OrtError::MissingEntry("DisableTelemetryEvents")));
    }

    #[test]
    fn available_providers_round_trip() {
        let engine = mock::lock();
        engine.set_available_providers(&["CUDAExecutionProvider", "CPUExecutionProvider"]);
        let providers = engine.api().available_providers().unwrap();
        assert_eq!(providers, ["CUDAExecutionProvider", "CPUExecutionProvider"]);
        assert_eq!(engine.live(), 0);
    }

    #[test]
    fn path_encoding_is_nul_terminated() {
        let encoded = ort_path(OsStr::new("model.onnx")).unwrap();
        assert_eq!(encoded.len(), "model.onnx".len() + 1);
        assert_eq!(encoded.last().copied(), Some(0));
    }
}
