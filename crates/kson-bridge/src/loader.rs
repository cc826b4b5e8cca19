//! Locating and loading the KSON runtime library
//!
//! Each supported operating system has exactly one library file name. The
//! name is joined onto the configured directory (or handed to the system
//! loader as-is) and nothing else is tried.

use std::ffi::{CStr, CString};
use std::path::{Path, PathBuf};

use crate::error::InitError;

/// Platform → library file name table
const LIBRARY_NAMES: &[(&str, &str)] = &[
    ("linux", "libkson.so"),
    ("macos", "libkson.dylib"),
    ("windows", "kson.dll"),
];

/// Library file name for an operating system, as named by `std::env::consts::OS`
pub fn library_file_name(os: &str) -> Option<&'static str> {
    LIBRARY_NAMES
        .iter()
        .find(|(name, _)| *name == os)
        .map(|(_, file)| *file)
}

/// Resolve the single candidate library path for a platform.
///
/// `dir` is the directory holding the library; without it the bare file name
/// is returned so the system loader's search path applies.
pub fn resolve_library_path(os: &str, arch: &str, dir: Option<&Path>) -> Result<PathBuf, InitError> {
    let file = library_file_name(os).ok_or_else(|| InitError::UnsupportedPlatform {
        os: os.to_string(),
        arch: arch.to_string(),
    })?;
    Ok(match dir {
        Some(dir) => dir.join(file),
        None => PathBuf::from(file),
    })
}

/// Candidate library path for the platform this process runs on
pub fn host_library_path(dir: Option<&Path>) -> Result<PathBuf, InitError> {
    resolve_library_path(std::env::consts::OS, std::env::consts::ARCH, dir)
}

/// Cross-platform dynamic library handle
pub struct Library {
    handle: LibraryHandle,
    path: String,
}

impl Library {
    /// Load a dynamic library from the given path.
    ///
    /// Unix platforms use `dlopen(RTLD_NOW | RTLD_LOCAL)`, Windows uses
    /// `LoadLibraryW`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, InitError> {
        let path_ref = path.as_ref();
        let path_str = path_ref
            .to_str()
            .ok_or_else(|| InitError::InvalidOption(format!("non UTF-8 path {:?}", path_ref)))?;

        let handle = LibraryHandle::load(path_str)?;
        log::debug!("loaded runtime library {}", path_str);

        Ok(Library {
            handle,
            path: path_str.to_string(),
        })
    }

    /// Get a function pointer by name.
    ///
    /// # Safety
    ///
    /// `T` must be a function pointer type matching the exported symbol, and
    /// the library must stay loaded while the pointer is used.
    pub unsafe fn get<T: Copy>(&self, symbol: &str) -> Result<T, InitError> {
        self.handle.symbol(symbol, &self.path)
    }

    /// Get the path this library was loaded from
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library").field("path", &self.path).finish()
    }
}

#[cfg(unix)]
type LibraryHandle = UnixLibrary;

#[cfg(windows)]
type LibraryHandle = WindowsLibrary;

// ============================================================================
// Unix Implementation (Linux, macOS)
// ============================================================================

#[cfg(unix)]
struct UnixLibrary {
    handle: *mut std::ffi::c_void,
}

#[cfg(unix)]
impl UnixLibrary {
    fn load(path: &str) -> Result<Self, InitError> {
        let c_path = CString::new(path)
            .map_err(|e| InitError::InvalidOption(format!("invalid library path: {}", e)))?;

        let handle = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL) };

        if handle.is_null() {
            return Err(InitError::LibraryNotFound {
                path: path.to_string(),
                reason: unsafe { last_dl_error() }.unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        Ok(UnixLibrary { handle })
    }

    unsafe fn symbol<T: Copy>(&self, name: &str, lib_path: &str) -> Result<T, InitError> {
        let missing = || InitError::MissingEntryPoint {
            symbol: name.to_string(),
            library: lib_path.to_string(),
        };
        let c_name = CString::new(name).map_err(|_| missing())?;

        // Clear stale state so a null result can be told apart from a failure
        libc::dlerror();
        let symbol = libc::dlsym(self.handle, c_name.as_ptr());

        if let Some(error) = last_dl_error() {
            log::debug!("dlsym({}) failed: {}", name, error);
            return Err(missing());
        }
        if symbol.is_null() {
            return Err(missing());
        }

        Ok(std::mem::transmute_copy(&symbol))
    }
}

#[cfg(unix)]
unsafe fn last_dl_error() -> Option<String> {
    let err_ptr = libc::dlerror();
    if err_ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(err_ptr).to_string_lossy().into_owned())
    }
}

#[cfg(unix)]
impl Drop for UnixLibrary {
    fn drop(&mut self) {
        unsafe {
            libc::dlclose(self.handle);
        }
    }
}

#[cfg(unix)]
unsafe impl Send for UnixLibrary {}
#[cfg(unix)]
unsafe impl Sync for UnixLibrary {}

// ============================================================================
// Windows Implementation
// ============================================================================

#[cfg(windows)]
struct WindowsLibrary {
    handle: *mut std::ffi::c_void,
}

#[cfg(windows)]
impl WindowsLibrary {
    fn load(path: &str) -> Result<Self, InitError> {
        use std::ffi::OsStr;
        use std::os::windows::ffi::OsStrExt;

        let wide: Vec<u16> = OsStr::new(path)
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();

        let handle = unsafe { LoadLibraryW(wide.as_ptr()) };

        if handle.is_null() {
            let error = unsafe { GetLastError() };
            return Err(InitError::LibraryNotFound {
                path: path.to_string(),
                reason: format!("error code {}", error),
            });
        }

        Ok(WindowsLibrary { handle })
    }

    unsafe fn symbol<T: Copy>(&self, name: &str, lib_path: &str) -> Result<T, InitError> {
        let missing = || InitError::MissingEntryPoint {
            symbol: name.to_string(),
            library: lib_path.to_string(),
        };
        let c_name = CString::new(name).map_err(|_| missing())?;

        let symbol = GetProcAddress(self.handle, c_name.as_ptr());
        if symbol.is_null() {
            log::debug!("GetProcAddress({}) failed: error code {}", name, GetLastError());
            return Err(missing());
        }

        Ok(std::mem::transmute_copy(&symbol))
    }
}

#[cfg(windows)]
impl Drop for WindowsLibrary {
    fn drop(&mut self) {
        unsafe {
            FreeLibrary(self.handle);
        }
    }
}

#[cfg(windows)]
unsafe impl Send for WindowsLibrary {}
#[cfg(windows)]
unsafe impl Sync for WindowsLibrary {}

#[cfg(windows)]
extern "system" {
    fn LoadLibraryW(filename: *const u16) -> *mut std::ffi::c_void;
    fn GetProcAddress(
        module: *mut std::ffi::c_void,
        procname: *const std::ffi::c_char,
    ) -> *mut std::ffi::c_void;
    fn FreeLibrary(module: *mut std::ffi::c_void) -> i32;
    fn GetLastError() -> u32;
}
