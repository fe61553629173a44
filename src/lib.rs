/*
 *  lib.rs
 *
 *  vdpau-dispatch - VDPAU driver dispatch shim
 *  (c) 2024-26 vdpau-dispatch contributors
 *
 *  Crate root: module wiring and public re-exports
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

//! Vendor-neutral dispatch shim for the VDPAU video-acceleration API.
//!
//! An application asks this library for a device on a display and
//! screen; the shim works out which vendor backend owns that display,
//! loads it, and forwards the call. It implements no video acceleration
//! itself.
//!
//! ## Architecture
//!
//! Three stages, composed strictly top to bottom:
//!
//! 1. **Resolver** (`resolver`) - picks the backend identifier: the
//!    `VDPAU_DRIVER` override, a DRI2 autodetection query, or the
//!    built-in default.
//! 2. **Loader** (`loader`) - formats the library path (two naming
//!    conventions spanning install-layout eras) and opens the module.
//! 3. **Interposition & dispatch** (`dispatch`) - optionally chains the
//!    trace module in front of the backend, resolves the forwarding
//!    entry point from whichever module is outermost, and calls it with
//!    the application's original arguments.
//!
//! ## Environment
//!
//! - `VDPAU_DRIVER` - backend identifier, used verbatim when non-empty
//! - `VDPAU_DRIVER_PATH` - overrides the module directory
//! - `VDPAU_TRACE` - nonzero integer switches the trace interposer in
//! - `RUST_LOG` - diagnostic verbosity (failures log at `error` by
//!   default)
//!
//! Loaded modules stay open until the process exits; there is no
//! unloading and no caching of resolution results across calls.

pub mod config;
pub mod dispatch;
pub mod dri2;
pub mod error;
mod entry;
pub mod ffi;
pub mod loader;
pub mod resolver;

pub use config::DispatchConfig;
pub use dispatch::create_device;
pub use dri2::{Dri2Probe, Dri2Unavailable};
pub use entry::vdp_device_create_x11;
pub use error::DispatchError;
pub use ffi::{
    Display, RawModuleHandle, VdpDevice, VdpDeviceCreateX11, VdpGetProcAddress, VdpStatus,
    VdpTraceSetHandle,
};
pub use loader::{LoadedModule, ModuleLoader, SystemLoader};

#[cfg(feature = "dri2")]
pub use dri2::Dri2Display;
