/*
 *  config.rs
 *
 *  vdpau-dispatch - VDPAU driver dispatch shim
 *  (c) 2024-26 vdpau-dispatch contributors
 *
 *  Per-call configuration snapshot from the process environment
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

use std::env;

/// Selects the backend driver outright, bypassing autodetection.
pub const DRIVER_ENV: &str = "VDPAU_DRIVER";

/// Overrides the directory searched for backend and trace modules.
pub const DRIVER_PATH_ENV: &str = "VDPAU_DRIVER_PATH";

/// Enables the trace interposer when it parses as a nonzero integer.
pub const TRACE_ENV: &str = "VDPAU_TRACE";

/// Built-in module directory, fixed when the shim is compiled.
/// Packagers override it by exporting VDPAU_MODULEDIR to the build.
pub const DEFAULT_MODULE_DIR: &str = match option_env!("VDPAU_MODULEDIR") {
    Some(dir) => dir,
    None => "/usr/lib/vdpau",
};

/// Everything the dispatch pipeline reads from the environment.
///
/// Collected once at the start of a call and threaded through the stages
/// explicitly; no stage reads the environment on its own afterwards.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Backend identifier used verbatim when set and non-empty.
    pub driver_override: Option<String>,

    /// Directory holding backend modules and the trace module.
    pub module_dir: String,

    /// Whether the trace interposer is switched in.
    pub trace_enabled: bool,
}

impl DispatchConfig {
    /// Snapshot the environment for one dispatch call.
    pub fn from_env() -> Self {
        Self {
            driver_override: env::var(DRIVER_ENV).ok().filter(|v| !v.is_empty()),
            module_dir: env::var(DRIVER_PATH_ENV)
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_MODULE_DIR.to_string()),
            trace_enabled: trace_flag(env::var(TRACE_ENV).ok().as_deref()),
        }
    }
}

/// Tracing is an explicit opt-in: only a value that parses as a nonzero
/// integer turns it on. Unset, empty, zero and non-numeric all leave it
/// off.
fn trace_flag(value: Option<&str>) -> bool {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .is_some_and(|v| v != 0)
}
