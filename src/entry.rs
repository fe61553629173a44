/*
 *  entry.rs
 *
 *  vdpau-dispatch - VDPAU driver dispatch shim
 *  (c) 2024-26 vdpau-dispatch contributors
 *
 *  The exported C ABI entry point
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

use std::os::raw::c_int;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Once;

use crate::config::DispatchConfig;
use crate::dispatch;
use crate::dri2::{self, Dri2Probe};
use crate::ffi::{Display, VdpDevice, VdpGetProcAddress, VdpStatus};
use crate::loader::SystemLoader;

static DIAGNOSTICS: Once = Once::new();

/// Install the diagnostic channel once per process.
///
/// `try_init` so an embedding application that already set a logger
/// wins; the default filter keeps failure reports visible on stderr in
/// an unconfigured process.
fn init_diagnostics() {
    DIAGNOSTICS.call_once(|| {
        let _ = env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or("error"),
        )
        .try_init();
    });
}

#[cfg(feature = "dri2")]
fn system_probe() -> Box<dyn Dri2Probe> {
    match dri2::Dri2Display::open() {
        Some(probe) => Box::new(probe),
        None => Box::new(dri2::Dri2Unavailable),
    }
}

#[cfg(not(feature = "dri2"))]
fn system_probe() -> Box<dyn Dri2Probe> {
    Box::new(dri2::Dri2Unavailable)
}

/// Create a VDPAU device for `display`/`screen`.
///
/// This is the library's entire public C surface: it resolves a driver,
/// loads the backend (and, when enabled, the trace interposer), and
/// forwards this exact call into it. On success the backend fills in
/// `device` and `get_proc_address`; on failure they are left untouched
/// and must not be read.
///
/// # Safety
///
/// Called through the C ABI. `display` must be a live Xlib display
/// connection, and `device`/`get_proc_address` must be writable; all
/// three are passed to the vendor backend as-is.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vdp_device_create_x11(
    display: *mut Display,
    screen: c_int,
    device: *mut VdpDevice,
    get_proc_address: *mut Option<VdpGetProcAddress>,
) -> VdpStatus {
    init_diagnostics();

    // A panic must not unwind into the C caller.
    catch_unwind(AssertUnwindSafe(|| {
        let config = DispatchConfig::from_env();
        let probe = system_probe();
        unsafe {
            dispatch::create_device(
                &config,
                probe.as_ref(),
                &SystemLoader,
                display,
                screen,
                device,
                get_proc_address,
            )
        }
    }))
    .unwrap_or(VdpStatus::ERROR)
}
