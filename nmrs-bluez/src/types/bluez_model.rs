//! Capability models for the two BlueZ D-Bus API generations.
//!
//! BlueZ 4 and BlueZ 5 disagree on where a device's networking services
//! live, whether the adapter's power state matters, and which bearers are
//! reachable at all. Each generation is one implementation of
//! [`CapabilityModel`]; a device picks its model once, at construction,
//! through [`BluezVersion::model`](crate::BluezVersion::model).

use crate::api::models::{BluetoothNetworkRole, BtCapabilities};
use crate::types::constants::{bluez, service_class};

/// Trait for BlueZ generation-specific behavior.
///
/// Both implementations must satisfy the same usability rules; they only
/// differ in the facts fed into them.
pub trait CapabilityModel: Send + Sync {
    /// Returns whether usability requires a resolved, powered adapter.
    fn requires_adapter(&self) -> bool;

    /// Maps a service class (first UUID segment) to a capability.
    ///
    /// Unknown classes map to the empty set.
    fn capability_for_service_class(&self, class: u64) -> BtCapabilities;

    /// Returns the D-Bus interface of remote device objects.
    fn device_interface(&self) -> &'static str;

    /// Returns whether BlueZ exports `org.freedesktop.DBus.ObjectManager`.
    fn exports_object_manager(&self) -> bool;

    /// Returns the interface carrying `Connect`/`Disconnect` for `role`.
    ///
    /// `None` means this generation cannot open that bearer.
    fn session_interface(&self, role: BluetoothNetworkRole) -> Option<&'static str>;

    /// Returns whether `Disconnect` takes the local interface name.
    fn disconnect_takes_interface(&self, role: BluetoothNetworkRole) -> bool {
        let _ = role;
        false
    }

    /// Returns whether this generation can open `role` at all.
    fn supports_role(&self, role: BluetoothNetworkRole) -> bool {
        self.session_interface(role).is_some()
    }
}

/// BlueZ 5: adapter-aware, NAP only.
pub struct Bluez5Model;

impl CapabilityModel for Bluez5Model {
    fn requires_adapter(&self) -> bool {
        true
    }

    fn capability_for_service_class(&self, class: u64) -> BtCapabilities {
        match class {
            service_class::NAP => BtCapabilities::NAP,
            _ => BtCapabilities::empty(),
        }
    }

    fn device_interface(&self) -> &'static str {
        bluez::DEVICE_INTERFACE
    }

    fn exports_object_manager(&self) -> bool {
        true
    }

    fn session_interface(&self, role: BluetoothNetworkRole) -> Option<&'static str> {
        match role {
            BluetoothNetworkRole::PanU => Some(bluez::NETWORK_INTERFACE),
            BluetoothNetworkRole::Dun => None,
        }
    }
}

/// BlueZ 4: no adapter check, NAP and DUN.
pub struct Bluez4Model;

impl CapabilityModel for Bluez4Model {
    fn requires_adapter(&self) -> bool {
        false
    }

    fn capability_for_service_class(&self, class: u64) -> BtCapabilities {
        match class {
            service_class::DIALUP_NETWORKING => BtCapabilities::DUN,
            service_class::NAP => BtCapabilities::NAP,
            _ => BtCapabilities::empty(),
        }
    }

    fn device_interface(&self) -> &'static str {
        bluez::LEGACY_DEVICE_INTERFACE
    }

    fn exports_object_manager(&self) -> bool {
        false
    }

    fn session_interface(&self, role: BluetoothNetworkRole) -> Option<&'static str> {
        match role {
            BluetoothNetworkRole::PanU => Some(bluez::LEGACY_NETWORK_INTERFACE),
            BluetoothNetworkRole::Dun => Some(bluez::SERIAL_INTERFACE),
        }
    }

    fn disconnect_takes_interface(&self, role: BluetoothNetworkRole) -> bool {
        role == BluetoothNetworkRole::Dun
    }
}
