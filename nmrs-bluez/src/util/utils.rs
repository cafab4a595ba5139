//! Utility functions for address parsing and BlueZ proxy construction.

use zbus::Connection;
use zvariant::OwnedObjectPath;

use crate::Result;
use crate::types::constants::{BDADDR_LEN, bluez};

/// Parses a colon-separated hardware address into its binary form.
///
/// Accepts six groups of one or two hexadecimal digits, as `ether_aton`
/// does (`"0:1a:7D:da:71:13"` is valid). Returns `None` otherwise.
pub(crate) fn parse_hw_address(addr: &str) -> Option<[u8; BDADDR_LEN]> {
    let mut out = [0u8; BDADDR_LEN];
    let mut parts = addr.split(':');

    for byte in out.iter_mut() {
        let part = parts.next()?;
        if part.is_empty() || part.len() > 2 || !part.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        *byte = u8::from_str_radix(part, 16).ok()?;
    }

    if parts.next().is_some() {
        return None;
    }
    Some(out)
}

/// Extracts the service class from a dash-delimited UUID.
///
/// The first segment is read as hexadecimal, so both the short
/// (`"1116-..."`) and the full (`"00001116-0000-1000-8000-00805f9b34fb"`)
/// forms yield `0x1116`.
pub(crate) fn service_class(uuid: &str) -> Option<u64> {
    let first = uuid.split('-').next()?;
    u64::from_str_radix(first, 16).ok()
}

/// Macro to convert Result to Option with error logging.
/// Usage: `try_log!(result, "context message")`
#[macro_export]
macro_rules! try_log {
    ($result:expr, $context:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => {
                log::warn!("{}: {:?}", $context, e);
                return None;
            }
        }
    };
}

/// Helper to create a BlueZ D-Bus proxy for a given path and interface.
///
/// Used for interfaces whose name depends on the BlueZ generation
/// (`org.bluez.Network1` vs `org.bluez.Network`, `org.bluez.Serial`), and for
/// the standard properties interface of BlueZ 5 objects.
pub(crate) async fn bluez_proxy<P>(
    conn: &Connection,
    path: P,
    interface: &'static str,
) -> Result<zbus::Proxy<'static>>
where
    P: TryInto<OwnedObjectPath>,
    P::Error: Into<zbus::Error>,
{
    let owned_path = path.try_into().map_err(Into::into)?;
    Ok(zbus::proxy::Builder::new(conn)
        .destination(bluez::SERVICE)?
        .path(owned_path)?
        .interface(interface)?
        .build()
        .await?)
}
