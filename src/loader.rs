/*
 *  loader.rs
 *
 *  vdpau-dispatch - VDPAU driver dispatch shim
 *  (c) 2024-26 vdpau-dispatch contributors
 *
 *  Library path construction and dynamic module loading
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

//! Turning a driver identifier into an on-disk library and a live module.
//!
//! Two naming conventions span the install-layout eras:
//!
//! 1. `{module_dir}/libvdpau_{driver}.so.1` - qualified, versioned
//! 2. `libvdpau_{driver}.so` - bare name, left to the platform loader
//!
//! Paths are formatted into a fixed-capacity buffer; an identifier that
//! does not fit is rejected outright, never truncated. Opened modules
//! are never closed again: their lifetime is the process lifetime.

use std::ffi::c_void;
use std::fmt::Write as _;
use std::mem::ManuallyDrop;

use arrayvec::ArrayString;
use libloading::os::unix::{Library, RTLD_GLOBAL, RTLD_NOW};
use log::debug;

use crate::error::DispatchError;
use crate::ffi::{RawModuleHandle, VdpDeviceCreateX11, VdpTraceSetHandle};

/// Capacity of the fixed path buffer.
pub const PATH_MAX: usize = 4096;

/// A formatted library path or bare name, bounded by [`PATH_MAX`].
pub type LibraryPath = ArrayString<PATH_MAX>;

/// Primary naming convention: module-directory-qualified and versioned.
pub fn driver_library_path(module_dir: &str, driver: &str) -> Result<LibraryPath, DispatchError> {
    format_path(format_args!("{module_dir}/libvdpau_{driver}.so.1"), driver)
}

/// Old-layout fallback: bare name, resolved by the platform loader's own
/// search path. Tried exactly once, after the primary path fails.
pub fn driver_library_fallback(driver: &str) -> Result<LibraryPath, DispatchError> {
    format_path(format_args!("libvdpau_{driver}.so"), driver)
}

/// The trace interposer has exactly one well-known home; no fallback
/// naming applies to it.
pub fn trace_library_path(module_dir: &str) -> Result<LibraryPath, DispatchError> {
    format_path(format_args!("{module_dir}/libvdpau_trace.so.1"), "trace")
}

fn format_path(
    args: std::fmt::Arguments<'_>,
    driver: &str,
) -> Result<LibraryPath, DispatchError> {
    let mut path = LibraryPath::new();
    path.write_fmt(args)
        .map_err(|_| DispatchError::DriverPathTooLong {
            driver: driver.to_string(),
        })?;
    Ok(path)
}

/// Opens shared objects.
///
/// The trait seam exists so the dispatch pipeline can be exercised
/// against scripted loaders in tests; production code uses
/// [`SystemLoader`].
pub trait ModuleLoader {
    /// Open the library at `path`, returning a live module or the
    /// loader's own error text.
    fn open(&self, path: &str) -> Result<Box<dyn LoadedModule>, String>;
}

/// A successfully opened backend or trace module.
///
/// The only capabilities exposed are resolving the two well-known entry
/// points and relinquishing the opaque handle for trace chaining; raw
/// library addresses never leave the loader and dispatch layers.
pub trait LoadedModule {
    /// Resolve the device-creation entry point under `symbol`.
    fn device_create_entry(&self, symbol: &[u8]) -> Option<VdpDeviceCreateX11>;

    /// Resolve the trace module's backend-handle setter under `symbol`.
    fn handle_setter(&self, symbol: &[u8]) -> Option<VdpTraceSetHandle>;

    /// Give up the module, handing out its raw handle. The underlying
    /// library stays open for the life of the process.
    fn into_raw_handle(self: Box<Self>) -> RawModuleHandle;
}

/// [`ModuleLoader`] backed by the platform dynamic loader.
pub struct SystemLoader;

impl ModuleLoader for SystemLoader {
    fn open(&self, path: &str) -> Result<Box<dyn LoadedModule>, String> {
        // RTLD_NOW | RTLD_GLOBAL is the contract the backends were
        // written against.
        let library = unsafe { Library::open(Some(path), RTLD_NOW | RTLD_GLOBAL) }
            .map_err(|err| err.to_string())?;
        debug!("opened {path}");
        Ok(Box::new(DynModule {
            handle: library.into_raw(),
        }))
    }
}

/// Module over a library that is never closed again.
struct DynModule {
    handle: *mut c_void,
}

impl DynModule {
    /// Borrow the underlying library without taking back close-on-drop.
    fn symbol<T: Copy>(&self, symbol: &[u8]) -> Option<T> {
        let library = ManuallyDrop::new(unsafe { Library::from_raw(self.handle) });
        unsafe { library.get::<T>(symbol) }.ok().map(|sym| *sym)
    }
}

impl LoadedModule for DynModule {
    fn device_create_entry(&self, symbol: &[u8]) -> Option<VdpDeviceCreateX11> {
        self.symbol::<VdpDeviceCreateX11>(symbol)
    }

    fn handle_setter(&self, symbol: &[u8]) -> Option<VdpTraceSetHandle> {
        self.symbol::<VdpTraceSetHandle>(symbol)
    }

    fn into_raw_handle(self: Box<Self>) -> RawModuleHandle {
        RawModuleHandle::from_raw(self.handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_path_matches_template() {
        let path = driver_library_path("/usr/lib/vdpau", "acme").unwrap();
        assert_eq!(path.as_str(), "/usr/lib/vdpau/libvdpau_acme.so.1");
    }

    #[test]
    fn fallback_is_bare_and_unversioned() {
        let path = driver_library_fallback("acme").unwrap();
        assert_eq!(path.as_str(), "libvdpau_acme.so");
    }

    #[test]
    fn trace_path_is_fixed() {
        let path = trace_library_path("/usr/lib/vdpau").unwrap();
        assert_eq!(path.as_str(), "/usr/lib/vdpau/libvdpau_trace.so.1");
    }

    #[test]
    fn overflowing_identifier_is_rejected_not_truncated() {
        let huge = "x".repeat(PATH_MAX);
        let err = driver_library_path("/usr/lib/vdpau", &huge).unwrap_err();
        assert!(matches!(err, DispatchError::DriverPathTooLong { .. }));
    }

    #[test]
    fn identifier_at_the_boundary_still_fits() {
        // dir + "/libvdpau_" + driver + ".so.1" == PATH_MAX exactly
        let dir = "/usr/lib/vdpau";
        let driver = "y".repeat(PATH_MAX - dir.len() - "/libvdpau_".len() - ".so.1".len());
        let path = driver_library_path(dir, &driver).unwrap();
        assert_eq!(path.len(), PATH_MAX);

        let driver = format!("{driver}y");
        assert!(driver_library_path(dir, &driver).is_err());
    }

    #[test]
    fn system_loader_reports_the_platform_error() {
        let err = SystemLoader
            .open("/nonexistent/libvdpau_none.so.1")
            .map(|_| ())
            .unwrap_err();
        assert!(!err.is_empty());
    }
}
