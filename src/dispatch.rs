/*
 *  dispatch.rs
 *
 *  vdpau-dispatch - VDPAU driver dispatch shim
 *  (c) 2024-26 vdpau-dispatch contributors
 *
 *  Trace interposition, symbol resolution and the forwarding call
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

//! The resolve → load → interpose → dispatch pipeline.
//!
//! Control flows strictly top to bottom: the resolver picks a driver
//! name, the loader opens its module, interposition optionally chains
//! the trace module in front, and the forwarding entry point is resolved
//! from whichever module ended up outermost and invoked with the
//! caller's original arguments.

use std::os::raw::c_int;

use log::debug;

use crate::config::DispatchConfig;
use crate::dri2::Dri2Probe;
use crate::error::{DispatchError, report};
use crate::ffi::{
    Display, VDP_IMP_DEVICE_CREATE_X11, VDP_TRACE_DEVICE_CREATE_X11,
    VDP_TRACE_SET_BACKEND_HANDLE, VdpDevice, VdpDeviceCreateX11, VdpGetProcAddress, VdpStatus,
    symbol_str,
};
use crate::loader::{
    LoadedModule, ModuleLoader, driver_library_fallback, driver_library_path, trace_library_path,
};
use crate::resolver::resolve_driver_name;

/// The module a call forwards into: the backend directly, or the trace
/// interposer once chaining has put it in front.
///
/// Selected once per call; dispatch never reaches around an active trace
/// module.
enum ForwardingTarget {
    Backend(Box<dyn LoadedModule>),
    Traced(Box<dyn LoadedModule>),
}

impl ForwardingTarget {
    fn entry_symbol(&self) -> &'static [u8] {
        match self {
            ForwardingTarget::Backend(_) => VDP_IMP_DEVICE_CREATE_X11,
            ForwardingTarget::Traced(_) => VDP_TRACE_DEVICE_CREATE_X11,
        }
    }

    fn module(&self) -> &dyn LoadedModule {
        match self {
            ForwardingTarget::Backend(module) | ForwardingTarget::Traced(module) => {
                module.as_ref()
            }
        }
    }
}

/// Run one full resolve → load → interpose → dispatch sequence.
///
/// On failure the output parameters are left untouched and the caller
/// gets a status from the fixed vocabulary; on success the backend's own
/// status comes back verbatim.
///
/// # Safety
///
/// `display`, `device` and `get_proc_address` are never dereferenced
/// here, but they are handed unmodified to the loaded backend, which
/// imposes the usual VDPAU contract on them.
pub unsafe fn create_device(
    config: &DispatchConfig,
    probe: &dyn Dri2Probe,
    loader: &dyn ModuleLoader,
    display: *mut Display,
    screen: c_int,
    device: *mut VdpDevice,
    get_proc_address: *mut Option<VdpGetProcAddress>,
) -> VdpStatus {
    let driver = resolve_driver_name(config, probe, screen);

    let backend = match load_backend(loader, config, &driver) {
        Ok(module) => module,
        Err(err) => return err.status(),
    };

    let target = match interpose(loader, config, backend) {
        Ok(target) => target,
        Err(err) => return err.status(),
    };

    let entry = match resolve_entry(&target) {
        Ok(entry) => entry,
        Err(err) => return err.status(),
    };

    unsafe { entry(display, screen, device, get_proc_address) }
}

/// Open the backend module for `driver`: the qualified, versioned path
/// first, then exactly one retry under the old bare naming convention.
fn load_backend(
    loader: &dyn ModuleLoader,
    config: &DispatchConfig,
    driver: &str,
) -> Result<Box<dyn LoadedModule>, DispatchError> {
    let primary = driver_library_path(&config.module_dir, driver).map_err(|err| report(err))?;

    match loader.open(primary.as_str()) {
        Ok(module) => Ok(module),
        Err(first_failure) => {
            debug!("{primary}: {first_failure}; retrying with the bare library name");
            let fallback = driver_library_fallback(driver).map_err(|err| report(err))?;
            loader.open(fallback.as_str()).map_err(|reason| {
                report(DispatchError::BackendNotFound {
                    driver: driver.to_string(),
                    reason,
                })
            })
        }
    }
}

/// Chain the trace interposer in front of `backend` when tracing is
/// switched on; otherwise the backend itself is the forwarding target.
fn interpose(
    loader: &dyn ModuleLoader,
    config: &DispatchConfig,
    backend: Box<dyn LoadedModule>,
) -> Result<ForwardingTarget, DispatchError> {
    if !config.trace_enabled {
        return Ok(ForwardingTarget::Backend(backend));
    }

    let path = trace_library_path(&config.module_dir).map_err(|err| report(err))?;
    let trace = loader.open(path.as_str()).map_err(|reason| {
        report(DispatchError::TraceNotFound {
            library: path.to_string(),
            reason,
        })
    })?;

    // The setter is mandatory: a trace module that cannot delegate is
    // incompatible, not ignorable.
    let setter = trace
        .handle_setter(VDP_TRACE_SET_BACKEND_HANDLE)
        .ok_or_else(|| {
            report(DispatchError::IncompatibleTrace {
                library: path.to_string(),
                symbol: symbol_str(VDP_TRACE_SET_BACKEND_HANDLE).to_string(),
            })
        })?;

    // The trace module must know the real backend before any call is
    // forwarded through it.
    let backend_handle = backend.into_raw_handle();
    unsafe { setter(backend_handle) };

    Ok(ForwardingTarget::Traced(trace))
}

/// Resolve the forwarding entry point from the outermost module.
fn resolve_entry(target: &ForwardingTarget) -> Result<VdpDeviceCreateX11, DispatchError> {
    let symbol = target.entry_symbol();
    target.module().device_create_entry(symbol).ok_or_else(|| {
        report(DispatchError::EntryPointMissing {
            symbol: symbol_str(symbol).to_string(),
        })
    })
}
