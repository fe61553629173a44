/*
 *  dri2.rs
 *
 *  vdpau-dispatch - VDPAU driver dispatch shim
 *  (c) 2024-26 vdpau-dispatch contributors
 *
 *  DRI2 driver autodetection behind a narrow probe interface
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

//! Driver autodetection through the X server's DRI2 extension.
//!
//! The resolver only ever sees [`Dri2Probe`]: three read-only queries
//! with no loading side effects. The real implementation lives behind
//! the `dri2` cargo feature; without it every query reports "not
//! available" and resolution falls through to the default driver.

/// Oldest DRI2 protocol version whose connect reply carries a driver
/// name this shim can use.
pub const DRI2_MINIMUM_VERSION: (u32, u32) = (1, 2);

/// Narrow view of the DRI2 extension: presence, negotiated version, and
/// the driver name the server ties to a screen.
pub trait Dri2Probe {
    /// Whether the extension exists on the connection at all.
    fn extension_present(&self) -> bool;

    /// Protocol version reported by the server, if negotiation succeeds.
    fn protocol_version(&self) -> Option<(u32, u32)>;

    /// Driver name for `screen`, if the server reports one.
    fn driver_name(&self, screen: usize) -> Option<String>;
}

/// Probe used when the shim is built without DRI2 support or when no X
/// server can be reached.
pub struct Dri2Unavailable;

impl Dri2Probe for Dri2Unavailable {
    fn extension_present(&self) -> bool {
        false
    }

    fn protocol_version(&self) -> Option<(u32, u32)> {
        None
    }

    fn driver_name(&self, _screen: usize) -> Option<String> {
        None
    }
}

#[cfg(feature = "dri2")]
mod x11 {
    use log::debug;
    use x11rb::connection::{Connection, RequestConnection};
    use x11rb::protocol::dri2::{self, ConnectionExt as _};
    use x11rb::rust_connection::RustConnection;

    use super::{DRI2_MINIMUM_VERSION, Dri2Probe};

    /// DRI2 queries over a dedicated X connection.
    ///
    /// The connection comes from the environment ($DISPLAY); the caller's
    /// Xlib display pointer stays opaque and is only ever forwarded to
    /// the backend.
    pub struct Dri2Display {
        conn: RustConnection,
    }

    impl Dri2Display {
        /// Connect to the X server named by the environment. `None` when
        /// no server is reachable, which the resolver treats the same as
        /// a missing extension.
        pub fn open() -> Option<Self> {
            match x11rb::connect(None) {
                Ok((conn, _)) => Some(Self { conn }),
                Err(err) => {
                    debug!("DRI2 autodetection unavailable: {err}");
                    None
                }
            }
        }
    }

    impl Dri2Probe for Dri2Display {
        fn extension_present(&self) -> bool {
            matches!(
                self.conn.extension_information(dri2::X11_EXTENSION_NAME),
                Ok(Some(_))
            )
        }

        fn protocol_version(&self) -> Option<(u32, u32)> {
            let reply = self
                .conn
                .dri2_query_version(DRI2_MINIMUM_VERSION.0, DRI2_MINIMUM_VERSION.1)
                .ok()?
                .reply()
                .ok()?;
            Some((reply.major_version, reply.minor_version))
        }

        fn driver_name(&self, screen: usize) -> Option<String> {
            let root = self.conn.setup().roots.get(screen)?.root;
            let reply = self
                .conn
                .dri2_connect(root, dri2::DriverType::VDPAU)
                .ok()?
                .reply()
                .ok()?;
            let name = String::from_utf8(reply.driver_name).ok()?;
            if name.is_empty() { None } else { Some(name) }
        }
    }
}

#[cfg(feature = "dri2")]
pub use x11::Dri2Display;
