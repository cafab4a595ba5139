//! Bluetooth profile construction.
//!
//! Produces the [`Profile`] a NAP device gets when it is first seen, and the
//! NetworkManager settings dictionary (`connection`, `bluetooth`, `ipv4`,
//! `ipv6`) for any Bluetooth profile.

use std::collections::HashMap;
use zvariant::Value;

use crate::api::models::{BluetoothNetworkRole, BluetoothSettings, IpSettings, Profile};
use crate::types::constants::{BDADDR_LEN, settings};

/// Builds the PAN user profile for a NAP device.
///
/// The profile gets a fresh UUID, is named `"<name> Network"`, never
/// autoconnects, and requires IPv4 while IPv6 may fail.
pub fn build_nap_profile(name: &str, bdaddr: &[u8; BDADDR_LEN]) -> Profile {
    Profile {
        uuid: uuid::Uuid::new_v4().to_string(),
        id: format!("{name} Network"),
        connection_type: settings::BLUETOOTH_SETTING_NAME.into(),
        autoconnect: false,
        bluetooth: Some(BluetoothSettings {
            bdaddr: bdaddr.to_vec(),
            bt_device_type: BluetoothNetworkRole::PanU.setting_type().into(),
        }),
        ipv4: IpSettings {
            method: settings::IP_METHOD_AUTO.into(),
            may_fail: false,
        },
        ipv6: IpSettings {
            method: settings::IP_METHOD_AUTO.into(),
            may_fail: true,
        },
    }
}

/// Builds the `connection` section with type, id, uuid, and autoconnect settings.
fn connection_section(profile: &Profile) -> HashMap<&'static str, Value<'static>> {
    let mut s = HashMap::new();
    s.insert("type", Value::from(profile.connection_type.clone()));
    s.insert("id", Value::from(profile.id.clone()));
    s.insert("uuid", Value::from(profile.uuid.clone()));
    s.insert("autoconnect", Value::from(profile.autoconnect));
    s
}

fn bluetooth_section(settings: &BluetoothSettings) -> HashMap<&'static str, Value<'static>> {
    let mut s = HashMap::new();
    s.insert("bdaddr", Value::from(settings.bdaddr.clone()));
    s.insert("type", Value::from(settings.bt_device_type.clone()));
    s
}

fn ip_section(ip: &IpSettings) -> HashMap<&'static str, Value<'static>> {
    let mut s = HashMap::new();
    s.insert("method", Value::from(ip.method.clone()));
    s.insert("may-fail", Value::from(ip.may_fail));
    s
}

/// Builds the NetworkManager settings dictionary for `profile`.
///
/// The `bluetooth` section is left out when the profile has none.
pub fn build_bluetooth_connection(
    profile: &Profile,
) -> HashMap<&'static str, HashMap<&'static str, Value<'static>>> {
    let mut conn: HashMap<&'static str, HashMap<&'static str, Value<'static>>> = HashMap::new();

    conn.insert("connection", connection_section(profile));
    if let Some(bt) = &profile.bluetooth {
        conn.insert(settings::BLUETOOTH_SETTING_NAME, bluetooth_section(bt));
    }
    conn.insert("ipv4", ip_section(&profile.ipv4));
    conn.insert("ipv6", ip_section(&profile.ipv6));

    conn
}

impl Profile {
    /// Returns the NetworkManager settings dictionary for this profile.
    ///
    /// Shorthand for [`build_bluetooth_connection`].
    pub fn to_settings(&self) -> HashMap<&'static str, HashMap<&'static str, Value<'static>>> {
        build_bluetooth_connection(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: [u8; 6] = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF];

    #[test]
    fn nap_profile_fields() {
        let profile = build_nap_profile("Phone", &ADDR);

        assert_eq!(profile.id, "Phone Network");
        assert_eq!(profile.connection_type, "bluetooth");
        assert!(!profile.autoconnect);
        assert_eq!(profile.role(), Some(BluetoothNetworkRole::PanU));

        let bt = profile.bluetooth.as_ref().unwrap();
        assert_eq!(bt.bdaddr, ADDR.to_vec());
        assert_eq!(bt.bt_device_type, "panu");

        assert_eq!(profile.ipv4.method, "auto");
        assert!(!profile.ipv4.may_fail);
        assert_eq!(profile.ipv6.method, "auto");
        assert!(profile.ipv6.may_fail);
    }

    #[test]
    fn nap_profile_uuid_is_fresh_v4() {
        let a = build_nap_profile("Phone", &ADDR);
        let b = build_nap_profile("Phone", &ADDR);
        assert_ne!(a.uuid, b.uuid);

        let parsed = uuid::Uuid::parse_str(&a.uuid).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn settings_sections() {
        let profile = build_nap_profile("Phone", &ADDR);
        let settings = profile.to_settings();

        let connection = settings.get("connection").unwrap();
        assert_eq!(connection.get("type"), Some(&Value::from("bluetooth")));
        assert_eq!(connection.get("id"), Some(&Value::from("Phone Network")));
        assert_eq!(connection.get("autoconnect"), Some(&Value::from(false)));

        let bluetooth = settings.get("bluetooth").unwrap();
        assert_eq!(bluetooth.get("type"), Some(&Value::from("panu")));
        assert_eq!(bluetooth.get("bdaddr"), Some(&Value::from(ADDR.to_vec())));

        assert_eq!(
            settings.get("ipv4").unwrap().get("may-fail"),
            Some(&Value::from(false))
        );
        assert_eq!(
            settings.get("ipv6").unwrap().get("may-fail"),
            Some(&Value::from(true))
        );
    }

    #[test]
    fn settings_without_bluetooth_section() {
        let mut profile = build_nap_profile("Phone", &ADDR);
        profile.bluetooth = None;
        let settings = build_bluetooth_connection(&profile);
        assert!(!settings.contains_key("bluetooth"));
        assert_eq!(settings.len(), 3);
    }
}
