/*
 *  error.rs
 *
 *  vdpau-dispatch - VDPAU driver dispatch shim
 *  (c) 2024-26 vdpau-dispatch contributors
 *
 *  Failure taxonomy and diagnostic reporting
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

use log::error;
use thiserror::Error;

use crate::ffi::VdpStatus;

/// Every way the dispatch pipeline can fail before the backend runs.
///
/// Callers never see these directly: each one degrades to a status code
/// at the dispatch boundary, and the message goes to the diagnostic
/// channel at the point of detection.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The formatted library path would overflow the fixed path buffer.
    /// Truncated paths are never attempted.
    #[error("failed to construct driver path for \"{driver}\": path too long")]
    DriverPathTooLong { driver: String },

    /// Both naming conventions failed to open for this driver.
    #[error("failed to open VDPAU backend {driver}: {reason}")]
    BackendNotFound { driver: String, reason: String },

    /// The trace interposer could not be opened.
    #[error("failed to open VDPAU trace library {library}: {reason}")]
    TraceNotFound { library: String, reason: String },

    /// The trace module lacks the handle-setter and cannot delegate.
    #[error("trace library {library} does not export {symbol}")]
    IncompatibleTrace { library: String, symbol: String },

    /// The forwarding entry point is missing from the current module.
    #[error("loaded module does not export {symbol}")]
    EntryPointMissing { symbol: String },
}

impl DispatchError {
    /// The status surfaced to the caller for this failure.
    pub fn status(&self) -> VdpStatus {
        // Everything this shim can detect is an absence of a usable
        // implementation; RESOURCES is reserved for backend pass-through.
        match self {
            DispatchError::DriverPathTooLong { .. }
            | DispatchError::BackendNotFound { .. }
            | DispatchError::TraceNotFound { .. }
            | DispatchError::IncompatibleTrace { .. }
            | DispatchError::EntryPointMissing { .. } => VdpStatus::NO_IMPLEMENTATION,
        }
    }
}

/// Log a failure at its detection site and hand the error back unchanged.
///
/// With the `debug-breakpoints` feature the source location of the
/// detection site is logged as well; control flow and the returned status
/// are identical either way.
#[track_caller]
pub(crate) fn report(err: DispatchError) -> DispatchError {
    error!("{err}");

    #[cfg(feature = "debug-breakpoints")]
    {
        let location = std::panic::Location::caller();
        error!("error detected at {}:{}", location.file(), location.line());
    }

    err
}
