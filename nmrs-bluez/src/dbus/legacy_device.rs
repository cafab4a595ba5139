//! BlueZ 4 remote device proxy.

use std::collections::HashMap;
use zbus::Result;
use zbus::proxy;
use zvariant::OwnedValue;

/// Proxy for `org.bluez.Device` (BlueZ 4).
///
/// BlueZ 4 predates `org.freedesktop.DBus.Properties` support in BlueZ: the
/// whole property set comes from `GetProperties`, and every change arrives
/// as its own `PropertyChanged` signal.
#[proxy(interface = "org.bluez.Device", default_service = "org.bluez")]
pub trait BluezLegacyDevice {
    /// Returns every property of the device.
    fn get_properties(&self) -> Result<HashMap<String, OwnedValue>>;

    /// Emitted once per changed property.
    #[zbus(signal)]
    fn property_changed(&self, name: String, value: OwnedValue);
}
