/*
 *  ffi.rs
 *
 *  vdpau-dispatch - VDPAU driver dispatch shim
 *  (c) 2024-26 vdpau-dispatch contributors
 *
 *  C ABI surface shared with backend and trace modules
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

//! C ABI types shared between this shim, the application that loads it,
//! and the backend/trace modules it loads in turn.
//!
//! Every type here uses `#[repr(C)]` or `#[repr(transparent)]` so the
//! layout matches the VDPAU public header across compilation units.

use std::ffi::c_void;
use std::fmt;
use std::os::raw::c_int;

/// Opaque Xlib display connection.
///
/// Never dereferenced by this shim; the pointer is forwarded to the
/// backend exactly as the application passed it in.
#[repr(C)]
pub struct Display {
    _private: [u8; 0],
}

/// VDPAU device handle, allocated by the backend on success.
pub type VdpDevice = u32;

/// Identifier of a VDPAU API function for `VdpGetProcAddress` lookups.
pub type VdpFuncId = u32;

/// The backend's function-table lookup, returned to the application
/// through the second output parameter of device creation.
pub type VdpGetProcAddress = unsafe extern "C" fn(
    device: VdpDevice,
    function_id: VdpFuncId,
    function_pointer: *mut *mut c_void,
) -> VdpStatus;

/// Signature of the device-creation entry point: the one exported by this
/// shim, and the one it resolves from whichever module ends up in front.
pub type VdpDeviceCreateX11 = unsafe extern "C" fn(
    display: *mut Display,
    screen: c_int,
    device: *mut VdpDevice,
    get_proc_address: *mut Option<VdpGetProcAddress>,
) -> VdpStatus;

/// Signature of the trace module's backend-handle setter.
pub type VdpTraceSetHandle = unsafe extern "C" fn(backend: RawModuleHandle);

/// Entry point every vendor backend must export.
pub const VDP_IMP_DEVICE_CREATE_X11: &[u8] = b"vdp_imp_device_create_x11\0";

/// Entry point the trace module exports in place of the backend's.
pub const VDP_TRACE_DEVICE_CREATE_X11: &[u8] = b"vdp_trace_device_create_x11\0";

/// Setter the trace module must export to receive the backend handle.
/// A trace module without it cannot delegate and is incompatible.
pub const VDP_TRACE_SET_BACKEND_HANDLE: &[u8] = b"vdp_trace_set_backend_handle\0";

/// Render a NUL-terminated symbol constant for diagnostics.
pub fn symbol_str(symbol: &[u8]) -> &str {
    let end = symbol.len().saturating_sub(1);
    std::str::from_utf8(&symbol[..end]).unwrap_or("<non-utf8 symbol>")
}

/// Raw handle to a loaded module, as the platform loader knows it.
///
/// Dispatch code can carry one and hand it to the trace module's setter,
/// but nothing outside the loader can read the address back out.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawModuleHandle(*mut c_void);

impl RawModuleHandle {
    /// Wrap a handle produced by the platform loader (or a test double).
    pub fn from_raw(handle: *mut c_void) -> Self {
        Self(handle)
    }
}

/// Status code returned by every VDPAU operation.
///
/// Not a Rust enum: backend statuses pass through this shim untouched, so
/// codes outside the constant set below must stay representable.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VdpStatus(pub u32);

impl VdpStatus {
    /// The operation completed successfully.
    pub const OK: VdpStatus = VdpStatus(0);

    /// No backend (or required symbol) implements the request.
    pub const NO_IMPLEMENTATION: VdpStatus = VdpStatus(1);

    /// The display has been preempted by another owner.
    pub const DISPLAY_PREEMPTED: VdpStatus = VdpStatus(2);

    /// An invalid handle value was provided.
    pub const INVALID_HANDLE: VdpStatus = VdpStatus(3);

    /// An invalid pointer was provided.
    pub const INVALID_POINTER: VdpStatus = VdpStatus(4);

    /// A required resource could not be allocated.
    pub const RESOURCES: VdpStatus = VdpStatus(23);

    /// A handle was used with the wrong device.
    pub const HANDLE_DEVICE_MISMATCH: VdpStatus = VdpStatus(24);

    /// A catch-all error.
    pub const ERROR: VdpStatus = VdpStatus(25);

    pub fn is_ok(self) -> bool {
        self == Self::OK
    }
}

impl fmt::Display for VdpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::OK => write!(f, "VDP_STATUS_OK"),
            Self::NO_IMPLEMENTATION => write!(f, "VDP_STATUS_NO_IMPLEMENTATION"),
            Self::DISPLAY_PREEMPTED => write!(f, "VDP_STATUS_DISPLAY_PREEMPTED"),
            Self::INVALID_HANDLE => write!(f, "VDP_STATUS_INVALID_HANDLE"),
            Self::INVALID_POINTER => write!(f, "VDP_STATUS_INVALID_POINTER"),
            Self::RESOURCES => write!(f, "VDP_STATUS_RESOURCES"),
            Self::HANDLE_DEVICE_MISMATCH => write!(f, "VDP_STATUS_HANDLE_DEVICE_MISMATCH"),
            Self::ERROR => write!(f, "VDP_STATUS_ERROR"),
            VdpStatus(code) => write!(f, "VdpStatus({code})"),
        }
    }
}
