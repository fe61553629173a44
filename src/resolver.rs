/*
 *  resolver.rs
 *
 *  vdpau-dispatch - VDPAU driver dispatch shim
 *  (c) 2024-26 vdpau-dispatch contributors
 *
 *  Driver name resolution: override, autodetection, default
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

use log::debug;

use crate::config::{DRIVER_ENV, DispatchConfig};
use crate::dri2::{DRI2_MINIMUM_VERSION, Dri2Probe};

/// Backend assumed when nothing else names one.
pub const DEFAULT_DRIVER: &str = "nvidia";

/// Decide which backend identifier to use for this call.
///
/// Strict priority: explicit override, then DRI2 autodetection, then the
/// built-in default. Never fails and never returns an empty name. When
/// the override is set the probe is not queried at all.
pub fn resolve_driver_name(
    config: &DispatchConfig,
    probe: &dyn Dri2Probe,
    screen: c_int,
) -> String {
    if let Some(driver) = config.driver_override.as_deref() {
        debug!("driver \"{driver}\" selected by {DRIVER_ENV}");
        return driver.to_string();
    }

    if let Some(driver) = autodetect_driver(probe, screen) {
        debug!("driver \"{driver}\" autodetected via DRI2");
        return driver;
    }

    debug!("no driver configured or detected, defaulting to \"{DEFAULT_DRIVER}\"");
    DEFAULT_DRIVER.to_string()
}

/// The DRI2 leg: usable only when the extension is present, the protocol
/// is recent enough, and the server reports a non-empty name.
fn autodetect_driver(probe: &dyn Dri2Probe, screen: c_int) -> Option<String> {
    let screen = usize::try_from(screen).ok()?;

    if !probe.extension_present() {
        return None;
    }

    let version = probe.protocol_version()?;
    if version < DRI2_MINIMUM_VERSION {
        debug!(
            "DRI2 protocol {}.{} too old for driver queries",
            version.0, version.1
        );
        return None;
    }

    probe.driver_name(screen).filter(|name| !name.is_empty())
}
