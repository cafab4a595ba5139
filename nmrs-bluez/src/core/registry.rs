//! Keeps a device's candidate profiles in sync with the registry.

use log::debug;

use crate::api::models::{BluetoothNetworkRole, Profile};
use crate::api::provider::{ProviderEvent, ProviderListener};
use crate::core::device::DeviceInner;
use crate::core::state::DeviceState;
use crate::types::constants::settings;

/// Returns whether `profile` can be used with the device in `st`.
///
/// The profile must be a Bluetooth profile bound to the device's address,
/// with a sub-type the device offers.
pub(crate) fn is_compatible(st: &DeviceState, profile: &Profile) -> bool {
    if profile.connection_type != settings::BLUETOOTH_SETTING_NAME {
        return false;
    }
    let Some(bt) = &profile.bluetooth else {
        return false;
    };
    if st.address.is_none() || bt.bdaddr.as_slice() != st.bin_address.as_slice() {
        return false;
    }

    match BluetoothNetworkRole::from_setting_type(&bt.bt_device_type) {
        Some(role) => st.capabilities.contains(role.capability()),
        None => false,
    }
}

impl DeviceInner {
    /// Tracks `profile` if it is compatible and untracked.
    pub(crate) fn connection_added(&self, profile: &Profile) -> bool {
        let mut st = self.state.borrow_mut();
        if !is_compatible(&st, profile) || !st.track(&profile.uuid) {
            return false;
        }
        debug!("[{}] tracking connection '{}' ({})", st.path, profile.id, profile.uuid);
        true
    }

    pub(crate) fn connection_removed(&self, profile: &Profile) -> bool {
        let mut st = self.state.borrow_mut();
        if !st.untrack(&profile.uuid) {
            return false;
        }
        debug!("[{}] dropped connection '{}' ({})", st.path, profile.id, profile.uuid);
        true
    }

    /// Offers every registry profile to [`connection_added`](Self::connection_added).
    ///
    /// Returns `true` if anything new is tracked.
    pub(crate) fn load_connections(&self) -> bool {
        let profiles = self.provider.connections();
        let mut tracked = false;
        for profile in &profiles {
            tracked |= self.connection_added(profile);
        }
        tracked
    }
}

impl ProviderListener for DeviceInner {
    fn on_provider_event(&self, event: &ProviderEvent<'_>) {
        if !self.is_alive() {
            return;
        }

        let changed = match event {
            ProviderEvent::Added(profile) => {
                if self.suppress_added.get() {
                    return;
                }
                self.connection_added(profile)
            }
            ProviderEvent::Removed(profile) => self.connection_removed(profile),
            ProviderEvent::Updated(profile) => {
                if is_compatible(&self.state.borrow(), profile) {
                    self.connection_added(profile)
                } else {
                    self.connection_removed(profile)
                }
            }
            ProviderEvent::Loaded => {
                self.load_connections();
                true
            }
        };

        if changed {
            self.recompute();
        }
    }
}
