//! Constants for BlueZ and NetworkManager D-Bus interface values.
//!
//! These constants correspond to the bus names, interface names, service
//! classes and setting keys used when talking to BlueZ and when building
//! NetworkManager connection profiles.

/// BlueZ bus and interface names.
pub mod bluez {
    pub const SERVICE: &str = "org.bluez";

    pub const DEVICE_INTERFACE: &str = "org.bluez.Device1";
    pub const NETWORK_INTERFACE: &str = "org.bluez.Network1";

    pub const PROPERTIES_INTERFACE: &str = "org.freedesktop.DBus.Properties";

    // BlueZ 4 names
    pub const LEGACY_DEVICE_INTERFACE: &str = "org.bluez.Device";
    pub const LEGACY_NETWORK_INTERFACE: &str = "org.bluez.Network";
    pub const SERIAL_INTERFACE: &str = "org.bluez.Serial";
}

/// Argument passed to `Connect` for each bearer.
pub mod connect_type {
    pub const NAP: &str = "nap";
    pub const DUN: &str = "dun";
}

/// Bluetooth SIG service class identifiers (first UUID segment).
pub mod service_class {
    pub const DIALUP_NETWORKING: u64 = 0x1103;
    pub const NAP: u64 = 0x1116;
}

/// Device property names as they appear on the bus.
pub mod property {
    pub const ADDRESS: &str = "Address";
    pub const NAME: &str = "Name";
    pub const RSSI: &str = "RSSI";
    pub const UUIDS: &str = "UUIDs";
    pub const CONNECTED: &str = "Connected";
    pub const ADAPTER: &str = "Adapter";
}

/// NetworkManager setting names and values used for Bluetooth profiles.
pub mod settings {
    pub const BLUETOOTH_SETTING_NAME: &str = "bluetooth";
    pub const BLUETOOTH_TYPE_PANU: &str = "panu";
    pub const BLUETOOTH_TYPE_DUN: &str = "dun";
    pub const IP_METHOD_AUTO: &str = "auto";
}

/// Timeout constants for BlueZ method calls.
pub mod timeouts {
    use std::time::Duration;

    /// Deadline for `Connect` (20 seconds).
    const CONNECT_TIMEOUT_SECS: u64 = 20;

    /// Deadline for `Disconnect` (10 seconds).
    const DISCONNECT_TIMEOUT_SECS: u64 = 10;

    /// Returns the default connect deadline.
    pub fn connect_timeout() -> Duration {
        Duration::from_secs(CONNECT_TIMEOUT_SECS)
    }

    /// Returns the default disconnect deadline.
    pub fn disconnect_timeout() -> Duration {
        Duration::from_secs(DISCONNECT_TIMEOUT_SECS)
    }
}

/// Length of a Bluetooth device address in bytes.
pub const BDADDR_LEN: usize = 6;
