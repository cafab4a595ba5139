//! Mutable state of one remote Bluetooth device.
//!
//! Everything here is synchronous. Property updates go through
//! [`DeviceState::merge`], which enforces the write-once rules and reports
//! what changed so the caller can publish one notification burst per batch.

use bitflags::bitflags;
use log::{debug, warn};

use crate::api::models::{BtCapabilities, DeviceEvent, DeviceProperties, DeviceProperty};
use crate::core::capabilities::resolve_capabilities;
use crate::core::gate::GateInputs;
use crate::core::session::SessionState;
use crate::types::bluez_model::CapabilityModel;
use crate::types::constants::BDADDR_LEN;
use crate::util::utils::parse_hw_address;

bitflags! {
    /// Set of upward-visible properties touched by one update.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub(crate) struct Changed: u8 {
        const ADDRESS = 1 << 0;
        const NAME = 1 << 1;
        const RSSI = 1 << 2;
        const CAPABILITIES = 1 << 3;
        const CONNECTED = 1 << 4;
        const USABLE = 1 << 5;
    }
}

/// Where the owning adapter stands, as far as usability is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AdapterState {
    /// The capability model does not look at the adapter.
    NotRequired,
    /// Required but not resolved yet (or resolution failed).
    Pending,
    /// Resolved, with its latest `Powered` value.
    Resolved { powered: bool },
}

impl AdapterState {
    pub(crate) fn ready(self) -> bool {
        matches!(self, Self::NotRequired | Self::Resolved { powered: true })
    }
}

pub(crate) struct DeviceState {
    pub(crate) path: String,
    pub(crate) model: &'static dyn CapabilityModel,

    pub(crate) address: Option<String>,
    pub(crate) bin_address: [u8; BDADDR_LEN],
    pub(crate) name: Option<String>,
    pub(crate) rssi: i16,
    pub(crate) capabilities: BtCapabilities,
    pub(crate) connected: bool,

    pub(crate) initialized: bool,
    /// `Initialized` has been published (success or failure).
    pub(crate) init_reported: bool,
    pub(crate) bus_present: bool,
    pub(crate) adapter: AdapterState,
    pub(crate) usable: bool,

    /// UUIDs of compatible registry profiles, most recent first.
    pub(crate) candidates: Vec<String>,
    /// UUID of the profile auto-provisioned for this device.
    pub(crate) pan_connection: Option<String>,
    pub(crate) auto_provision_attempted: bool,

    pub(crate) session: SessionState,
}

impl DeviceState {
    pub(crate) fn new(path: impl Into<String>, model: &'static dyn CapabilityModel) -> Self {
        let adapter = if model.requires_adapter() {
            AdapterState::Pending
        } else {
            AdapterState::NotRequired
        };

        Self {
            path: path.into(),
            model,
            address: None,
            bin_address: [0; BDADDR_LEN],
            name: None,
            rssi: 0,
            capabilities: BtCapabilities::empty(),
            connected: false,
            initialized: false,
            init_reported: false,
            bus_present: false,
            adapter,
            usable: false,
            candidates: Vec::new(),
            pan_connection: None,
            auto_provision_attempted: false,
            session: SessionState::default(),
        }
    }

    /// Sets the address, once.
    ///
    /// The first valid, non-null value is kept together with its binary
    /// form. Later attempts to change it, clear it, or set an unparsable
    /// value are logged and ignored. Returns `true` if the address was set.
    pub(crate) fn set_address(&mut self, addr: Option<&str>) -> bool {
        if self.address.as_deref() == addr {
            return false;
        }

        let Some(addr) = addr else {
            warn!(
                "[{}] cannot reset address from '{}' to NULL",
                self.path,
                self.address.as_deref().unwrap_or_default()
            );
            return false;
        };

        if let Some(current) = &self.address {
            warn!(
                "[{}] cannot reset address from '{current}' to '{addr}'",
                self.path
            );
            return false;
        }

        let Some(bin) = parse_hw_address(addr) else {
            warn!(
                "[{}] cannot set address from NULL to '{addr}' (invalid value)",
                self.path
            );
            return false;
        };

        self.bin_address = bin;
        self.address = Some(addr.to_string());
        true
    }

    /// Sets the capabilities resolved from `uuids`, unless already non-zero.
    ///
    /// Returns `true` if the stored capabilities changed.
    pub(crate) fn set_capabilities<S: AsRef<str>>(&mut self, uuids: &[S]) -> bool {
        let caps = resolve_capabilities(self.model, uuids);
        if self.capabilities == caps {
            return false;
        }

        if !self.capabilities.is_empty() {
            warn!(
                "[{}] ignore change of capabilities from {} to {}",
                self.path, self.capabilities, caps
            );
            return false;
        }

        debug!("[{}] set capabilities: {caps}", self.path);
        self.capabilities = caps;
        true
    }

    /// Merges a property batch and reports which properties changed.
    ///
    /// The adapter reference is not merged here; it is only consumed once,
    /// during discovery.
    pub(crate) fn merge(&mut self, batch: &DeviceProperties) -> Changed {
        let mut changed = Changed::empty();

        if let Some(addr) = batch.address.as_deref() {
            if self.set_address(Some(addr)) {
                changed |= Changed::ADDRESS;
            }
        }

        if let Some(name) = &batch.name {
            if self.name.as_ref() != Some(name) {
                self.name = Some(name.clone());
                changed |= Changed::NAME;
            }
        }

        if let Some(rssi) = batch.rssi {
            if self.rssi != rssi {
                self.rssi = rssi;
                changed |= Changed::RSSI;
            }
        }

        if let Some(uuids) = &batch.uuids {
            if self.set_capabilities(uuids) {
                changed |= Changed::CAPABILITIES;
            }
        }

        if let Some(connected) = batch.connected {
            if self.connected != connected {
                self.connected = connected;
                changed |= Changed::CONNECTED;
            }
        }

        changed
    }

    /// Snapshot of everything the usability gate looks at.
    pub(crate) fn gate_inputs(&self) -> GateInputs {
        GateInputs {
            initialized: self.initialized,
            capabilities: self.capabilities,
            has_name: self.name.is_some(),
            bus_present: self.bus_present,
            has_address: self.address.is_some(),
            adapter_ready: self.adapter.ready(),
            candidates: self.candidates.len(),
        }
    }

    /// Adds a profile UUID to the candidate set. Returns `false` if tracked.
    pub(crate) fn track(&mut self, uuid: &str) -> bool {
        if self.is_tracked(uuid) {
            return false;
        }
        self.candidates.insert(0, uuid.to_string());
        true
    }

    /// Drops a profile UUID from the candidate set. Returns `false` if untracked.
    pub(crate) fn untrack(&mut self, uuid: &str) -> bool {
        let Some(pos) = self.candidates.iter().position(|c| c == uuid) else {
            return false;
        };
        self.candidates.remove(pos);
        if self.pan_connection.as_deref() == Some(uuid) {
            self.pan_connection = None;
        }
        true
    }

    pub(crate) fn is_tracked(&self, uuid: &str) -> bool {
        self.candidates.iter().any(|c| c == uuid)
    }

    /// Builds the notifications for `changed`, carrying current values.
    pub(crate) fn events_for(&self, changed: Changed) -> Vec<DeviceEvent> {
        let mut events = Vec::new();

        if changed.contains(Changed::ADDRESS) {
            if let Some(addr) = &self.address {
                events.push(DeviceProperty::Address(addr.clone()));
            }
        }
        if changed.contains(Changed::NAME) {
            events.push(DeviceProperty::Name(self.name.clone()));
        }
        if changed.contains(Changed::RSSI) {
            events.push(DeviceProperty::Rssi(self.rssi));
        }
        if changed.contains(Changed::CAPABILITIES) {
            events.push(DeviceProperty::Capabilities(self.capabilities));
        }
        if changed.contains(Changed::CONNECTED) {
            events.push(DeviceProperty::Connected(self.connected));
        }
        if changed.contains(Changed::USABLE) {
            events.push(DeviceProperty::Usable(self.usable));
        }

        events.into_iter().map(DeviceEvent::Changed).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BluezVersion;

    const PATH: &str = "/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF";
    const NAP: &str = "00001116-0000-1000-8000-00805f9b34fb";
    const DUN: &str = "00001103-0000-1000-8000-00805f9b34fb";

    fn state(version: BluezVersion) -> DeviceState {
        DeviceState::new(PATH, version.model())
    }

    #[test]
    fn address_first_valid_value_wins() {
        let mut st = state(BluezVersion::Bluez5);
        assert!(st.set_address(Some("AA:BB:CC:DD:EE:FF")));
        assert_eq!(st.bin_address, [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);

        assert!(!st.set_address(Some("11:22:33:44:55:66")));
        assert!(!st.set_address(None));
        assert!(!st.set_address(Some("AA:BB:CC:DD:EE:FF")));
        assert_eq!(st.address.as_deref(), Some("AA:BB:CC:DD:EE:FF"));
        assert_eq!(st.bin_address, [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
    }

    #[test]
    fn address_invalid_then_valid() {
        let mut st = state(BluezVersion::Bluez5);
        assert!(!st.set_address(None));
        assert!(!st.set_address(Some("not an address")));
        assert_eq!(st.address, None);
        assert_eq!(st.bin_address, [0; 6]);

        assert!(st.set_address(Some("11:22:33:44:55:66")));
        assert_eq!(st.address.as_deref(), Some("11:22:33:44:55:66"));
    }

    #[test]
    fn address_sequences_keep_first_accepted() {
        let sequences: &[&[Option<&str>]] = &[
            &[Some("bad"), Some("01:02:03:04:05:06"), Some("AA:BB:CC:DD:EE:FF")],
            &[None, None, Some("01:02:03:04:05:06"), None],
            &[Some("01:02:03:04:05:06"), Some("01:02:03:04:05:07")],
        ];

        for seq in sequences {
            let mut st = state(BluezVersion::Bluez4);
            for addr in *seq {
                st.set_address(*addr);
            }
            assert_eq!(st.address.as_deref(), Some("01:02:03:04:05:06"));
            assert_eq!(st.bin_address, [1, 2, 3, 4, 5, 6]);
        }
    }

    #[test]
    fn capabilities_are_write_once_nonzero() {
        let mut st = state(BluezVersion::Bluez4);
        assert!(!st.set_capabilities::<&str>(&[]));
        assert!(st.set_capabilities(&[DUN]));
        assert_eq!(st.capabilities, BtCapabilities::DUN);

        assert!(!st.set_capabilities(&[NAP]));
        assert!(!st.set_capabilities::<&str>(&[]));
        assert_eq!(st.capabilities, BtCapabilities::DUN);
    }

    #[test]
    fn merge_reports_only_real_changes() {
        let mut st = state(BluezVersion::Bluez5);
        let batch = DeviceProperties {
            address: Some("AA:BB:CC:DD:EE:FF".into()),
            name: Some("Phone".into()),
            rssi: Some(-40),
            uuids: Some(vec![NAP.into()]),
            connected: Some(true),
            adapter: Some("/org/bluez/hci0".into()),
        };

        let changed = st.merge(&batch);
        assert_eq!(
            changed,
            Changed::ADDRESS
                | Changed::NAME
                | Changed::RSSI
                | Changed::CAPABILITIES
                | Changed::CONNECTED
        );

        assert_eq!(st.merge(&batch), Changed::empty());

        let rename = DeviceProperties {
            name: Some("Tablet".into()),
            rssi: Some(-40),
            ..Default::default()
        };
        assert_eq!(st.merge(&rename), Changed::NAME);
        assert_eq!(st.name.as_deref(), Some("Tablet"));
    }

    #[test]
    fn adapter_state_follows_model() {
        assert_eq!(state(BluezVersion::Bluez5).adapter, AdapterState::Pending);
        assert_eq!(state(BluezVersion::Bluez4).adapter, AdapterState::NotRequired);
        assert!(AdapterState::NotRequired.ready());
        assert!(AdapterState::Resolved { powered: true }.ready());
        assert!(!AdapterState::Resolved { powered: false }.ready());
        assert!(!AdapterState::Pending.ready());
    }

    #[test]
    fn track_and_untrack() {
        let mut st = state(BluezVersion::Bluez5);
        assert!(st.track("a"));
        assert!(!st.track("a"));
        assert!(st.track("b"));
        assert_eq!(st.candidates, vec!["b".to_string(), "a".to_string()]);

        st.pan_connection = Some("a".into());
        assert!(st.untrack("a"));
        assert_eq!(st.pan_connection, None);
        assert!(!st.untrack("a"));
    }

    #[test]
    fn events_carry_current_values() {
        let mut st = state(BluezVersion::Bluez5);
        st.name = Some("Phone".into());
        st.usable = true;

        let events = st.events_for(Changed::NAME | Changed::USABLE);
        assert_eq!(
            events,
            vec![
                DeviceEvent::Changed(DeviceProperty::Name(Some("Phone".into()))),
                DeviceEvent::Changed(DeviceProperty::Usable(true)),
            ]
        );
        assert!(st.events_for(Changed::empty()).is_empty());
    }
}
