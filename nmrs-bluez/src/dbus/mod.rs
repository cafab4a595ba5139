//! D-Bus proxy interfaces for BlueZ.
//!
//! BlueZ 5 device properties are read through the standard
//! `org.freedesktop.DBus.Properties` interface, so only the adapter and the
//! BlueZ 4 device need dedicated proxies. `Network1`, `Network` and `Serial`
//! are reached through a dynamic proxy, see
//! [`bluez_proxy`](crate::util::utils::bluez_proxy).

mod adapter;
mod legacy_device;

pub(crate) use adapter::BluezAdapterProxy;
pub(crate) use legacy_device::BluezLegacyDeviceProxy;
