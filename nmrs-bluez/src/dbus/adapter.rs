//! BlueZ 5 adapter proxy.

use zbus::Result;
use zbus::proxy;

/// Proxy for `org.bluez.Adapter1`.
///
/// Only the power state matters to the device core: a device on an
/// unpowered adapter is never usable.
///
/// # Example
///
/// ```ignore
/// let adapter = BluezAdapterProxy::builder(&conn)
///     .path("/org/bluez/hci0")?
///     .build()
///     .await?;
/// let powered = adapter.powered().await?;
/// ```
#[proxy(interface = "org.bluez.Adapter1", default_service = "org.bluez")]
pub trait BluezAdapter {
    /// Whether the adapter radio is on.
    #[zbus(property)]
    fn powered(&self) -> Result<bool>;
}
