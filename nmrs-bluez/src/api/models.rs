use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::time::Duration;
use thiserror::Error;

use crate::types::bluez_model::{Bluez4Model, Bluez5Model, CapabilityModel};
use crate::types::constants::{connect_type, settings, timeouts};

bitflags! {
    /// Bluetooth networking capabilities of a remote device.
    ///
    /// The bit values match NetworkManager's `NMBluetoothCapabilities`:
    /// - `0x01` = DUN (Dial-Up Networking)
    /// - `0x02` = NAP (Network Access Point)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BtCapabilities: u32 {
        /// Dial-Up Networking over a serial (RFCOMM) link.
        const DUN = 0x01;
        /// Network Access Point (PAN user role on our side).
        const NAP = 0x02;
    }
}

impl Display for BtCapabilities {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (self.contains(Self::NAP), self.contains(Self::DUN)) {
            (true, true) => write!(f, "NAP | DUN"),
            (true, false) => write!(f, "NAP"),
            (false, true) => write!(f, "DUN"),
            (false, false) => write!(f, "none"),
        }
    }
}

/// The kind of network service used over a Bluetooth link.
///
/// Used both as the bearer sub-type of a connection profile and as the
/// bearer requested when connecting to a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BluetoothNetworkRole {
    /// Personal Area Network user, connecting to the device's NAP service.
    PanU,
    /// Dial-Up Networking through the device's serial port service.
    Dun,
}

impl BluetoothNetworkRole {
    /// Returns the capability bit a device needs to offer this role.
    pub fn capability(self) -> BtCapabilities {
        match self {
            Self::PanU => BtCapabilities::NAP,
            Self::Dun => BtCapabilities::DUN,
        }
    }

    /// Returns the NetworkManager `bluetooth.type` value for this role.
    pub fn setting_type(self) -> &'static str {
        match self {
            Self::PanU => settings::BLUETOOTH_TYPE_PANU,
            Self::Dun => settings::BLUETOOTH_TYPE_DUN,
        }
    }

    /// Returns the argument BlueZ expects in `Connect` for this role.
    pub fn connect_type(self) -> &'static str {
        match self {
            Self::PanU => connect_type::NAP,
            Self::Dun => connect_type::DUN,
        }
    }

    /// Parses a NetworkManager `bluetooth.type` value.
    pub fn from_setting_type(value: &str) -> Option<Self> {
        match value {
            settings::BLUETOOTH_TYPE_PANU => Some(Self::PanU),
            settings::BLUETOOTH_TYPE_DUN => Some(Self::Dun),
            _ => None,
        }
    }
}

impl Display for BluetoothNetworkRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PanU => write!(f, "PANU"),
            Self::Dun => write!(f, "DUN"),
        }
    }
}

/// BlueZ D-Bus API generation a device is driven through.
///
/// The two generations model capabilities and adapters differently, so the
/// choice is made once when a device is constructed and never changes.
///
/// | | `Bluez5` | `Bluez4` |
/// |---|---|---|
/// | Adapter must be powered | yes | no |
/// | NAP | yes | yes |
/// | DUN | no | yes |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BluezVersion {
    /// BlueZ 5 (`org.bluez.Device1`, adapter-aware).
    #[default]
    Bluez5,
    /// BlueZ 4 (`org.bluez.Device`, legacy, DUN-capable).
    Bluez4,
}

impl BluezVersion {
    /// Returns the capability model implementing this generation's rules.
    pub fn model(self) -> &'static dyn CapabilityModel {
        match self {
            Self::Bluez5 => &Bluez5Model,
            Self::Bluez4 => &Bluez4Model,
        }
    }
}

impl Display for BluezVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bluez5 => write!(f, "BlueZ 5"),
            Self::Bluez4 => write!(f, "BlueZ 4"),
        }
    }
}

/// A partial set of remote device properties.
///
/// Returned by the one-shot property fetch and delivered as one batch per
/// change notification. `None` means "not part of this batch".
///
/// # Example
///
/// ```rust
/// use nmrs_bluez::DeviceProperties;
///
/// let batch = DeviceProperties {
///     name: Some("Phone".into()),
///     rssi: Some(-52),
///     ..Default::default()
/// };
/// assert!(!batch.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceProperties {
    /// Hardware address, `"XX:XX:XX:XX:XX:XX"`.
    pub address: Option<String>,
    /// Remote device name.
    pub name: Option<String>,
    /// Received signal strength.
    pub rssi: Option<i16>,
    /// Service class UUIDs offered by the device.
    pub uuids: Option<Vec<String>>,
    /// Whether the baseband link is up.
    pub connected: Option<bool>,
    /// Object path of the owning adapter (BlueZ 5 only).
    pub adapter: Option<String>,
}

impl DeviceProperties {
    /// Returns `true` if the batch carries no property at all.
    pub fn is_empty(&self) -> bool {
        self.address.is_none()
            && self.name.is_none()
            && self.rssi.is_none()
            && self.uuids.is_none()
            && self.connected.is_none()
            && self.adapter.is_none()
    }
}

/// A device property together with its new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceProperty {
    Address(String),
    Name(Option<String>),
    Rssi(i16),
    Capabilities(BtCapabilities),
    Connected(bool),
    Usable(bool),
}

/// Notifications published by a [`BluezDevice`](crate::BluezDevice).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// Discovery finished. Fired exactly once, `false` when it failed.
    Initialized(bool),
    /// A property changed value.
    Changed(DeviceProperty),
}

/// IP configuration of a connection profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpSettings {
    /// NetworkManager method (`"auto"`, `"manual"`, ...).
    pub method: String,
    /// Whether activation may succeed without this address family.
    pub may_fail: bool,
}

impl Default for IpSettings {
    fn default() -> Self {
        Self {
            method: settings::IP_METHOD_AUTO.into(),
            may_fail: true,
        }
    }
}

/// The `bluetooth` section of a connection profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BluetoothSettings {
    /// Remote device address in binary form.
    pub bdaddr: Vec<u8>,
    /// Raw `bluetooth.type` value (`"panu"`, `"dun"`, ...).
    pub bt_device_type: String,
}

/// A network connection profile as held by a [`ConnectionProvider`].
///
/// Devices never own profiles; they refer to them by [`Profile::uuid`].
///
/// [`ConnectionProvider`]: crate::ConnectionProvider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Unique identifier.
    pub uuid: String,
    /// Human-readable name.
    pub id: String,
    /// NetworkManager connection type (`"bluetooth"` for Bluetooth profiles).
    pub connection_type: String,
    /// Whether NetworkManager may activate this profile on its own.
    pub autoconnect: bool,
    /// Bluetooth section, if any.
    pub bluetooth: Option<BluetoothSettings>,
    /// IPv4 configuration.
    pub ipv4: IpSettings,
    /// IPv6 configuration.
    pub ipv6: IpSettings,
}

impl Profile {
    /// Returns the bearer sub-type, if the profile has a recognized one.
    pub fn role(&self) -> Option<BluetoothNetworkRole> {
        self.bluetooth
            .as_ref()
            .and_then(|bt| BluetoothNetworkRole::from_setting_type(&bt.bt_device_type))
    }
}

/// Deadlines for BlueZ session calls.
///
/// # Example
///
/// ```rust
/// use nmrs_bluez::TimeoutConfig;
/// use std::time::Duration;
///
/// let config = TimeoutConfig::new()
///     .with_connect_timeout(Duration::from_secs(30))
///     .with_disconnect_timeout(Duration::from_secs(5));
/// assert_eq!(config.connect_timeout, Duration::from_secs(30));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Deadline for `Connect`.
    pub connect_timeout: Duration,
    /// Deadline for `Disconnect`.
    pub disconnect_timeout: Duration,
}

impl TimeoutConfig {
    /// Creates a configuration with the default deadlines (20s / 10s).
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the `Connect` deadline.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Overrides the `Disconnect` deadline.
    pub fn with_disconnect_timeout(mut self, timeout: Duration) -> Self {
        self.disconnect_timeout = timeout;
        self
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_timeout: timeouts::connect_timeout(),
            disconnect_timeout: timeouts::disconnect_timeout(),
        }
    }
}

/// Errors that can occur while managing Bluetooth network devices.
///
/// # Example
///
/// ```no_run
/// use nmrs_bluez::{BluetoothNetworkRole, BluezDevice, ConnectionError};
///
/// # async fn example(device: &BluezDevice) {
/// match device.connect(BluetoothNetworkRole::PanU).await {
///     Ok(iface) => println!("Connected on {iface}"),
///     Err(ConnectionError::Timeout) => println!("Device did not answer"),
///     Err(e) => eprintln!("Connect failed: {e}"),
/// }
/// # }
/// ```
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// A D-Bus communication error occurred.
    #[error("D-Bus error: {0}")]
    Dbus(#[from] zbus::Error),

    /// A BlueZ call did not complete before its deadline.
    #[error("connection timeout")]
    Timeout,

    /// The device has not finished discovery yet.
    #[error("device not initialized")]
    NotInitialized,

    /// The device was torn down while an operation was outstanding.
    #[error("device is gone")]
    DeviceGone,

    /// The device (or the BlueZ generation) does not offer the requested bearer.
    #[error("bearer not supported by device: {0}")]
    UnsupportedBearer(BluetoothNetworkRole),

    /// Disconnect was requested with no active session.
    #[error("no active Bluetooth session")]
    NotConnected,

    /// Another connect or disconnect is still outstanding.
    #[error("a Bluetooth session operation is already in progress")]
    SessionBusy,

    /// The requested BlueZ generation does not offer this feature.
    #[error("not supported by {0}")]
    UnsupportedVersion(BluezVersion),

    /// The device does not name its adapter.
    #[error("device has no adapter")]
    MissingAdapter,

    /// The connection provider refused a profile.
    #[error("connection provider rejected profile: {0}")]
    ProviderRejected(String),

    /// A signal stream ended or an operation could not make progress.
    #[error("connection stuck in state: {0}")]
    Stuck(String),
}

impl From<zbus::fdo::Error> for ConnectionError {
    fn from(e: zbus::fdo::Error) -> Self {
        Self::Dbus(e.into())
    }
}
