//! D-Bus implementation of the transport traits.
//!
//! [`SystemBus`] connects to the system bus on first use and hands out a
//! [`BluezTransport`] bound to one BlueZ generation. BlueZ 5 devices are read
//! through `org.freedesktop.DBus.Properties`; BlueZ 4 devices through their
//! own `GetProperties` / `PropertyChanged`.

use async_trait::async_trait;
use futures::future;
use futures::stream::{LocalBoxStream, StreamExt};
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use zbus::{Connection, Message};
use zvariant::{OwnedObjectPath, OwnedValue, Value};

use crate::Result;
use crate::api::models::{BluetoothNetworkRole, BluezVersion, ConnectionError, DeviceProperties};
use crate::api::transport::{AdapterEndpoint, BusSession, DeviceEndpoint, Transport};
use crate::dbus::{BluezAdapterProxy, BluezLegacyDeviceProxy};
use crate::try_log;
use crate::types::bluez_model::CapabilityModel;
use crate::types::constants::{bluez, property};
use crate::util::utils::bluez_proxy;

/// [`BusSession`] over the D-Bus system bus.
///
/// The connection is opened on the first [`acquire`](BusSession::acquire)
/// and shared afterwards.
///
/// # Example
///
/// ```no_run
/// use nmrs_bluez::{BluezVersion, BusSession, SystemBus};
///
/// # async fn example() -> nmrs_bluez::Result<()> {
/// let bus = SystemBus::new(BluezVersion::Bluez5);
/// let transport = bus.acquire().await?;
/// let device = transport.device("/org/bluez/hci0/dev_00_1A_7D_DA_71_13").await?;
/// let props = device.fetch_properties().await?;
/// println!("{:?}", props.name);
/// # Ok(())
/// # }
/// ```
pub struct SystemBus {
    version: BluezVersion,
    conn: RefCell<Option<Connection>>,
}

impl SystemBus {
    /// Creates a session that connects lazily.
    pub fn new(version: BluezVersion) -> Self {
        Self {
            version,
            conn: RefCell::new(None),
        }
    }

    /// Creates a session over an existing connection.
    pub fn with_connection(conn: Connection, version: BluezVersion) -> Self {
        Self {
            version,
            conn: RefCell::new(Some(conn)),
        }
    }

    /// Returns the BlueZ generation this bus talks to.
    pub fn version(&self) -> BluezVersion {
        self.version
    }

    /// Returns the system bus connection, opening it if needed.
    pub async fn connection(&self) -> Result<Connection> {
        if let Some(conn) = self.conn.borrow().as_ref() {
            return Ok(conn.clone());
        }

        let conn = Connection::system().await?;
        debug!("Connected to system bus");
        // Another caller may have connected meanwhile; keep the first one.
        let mut slot = self.conn.borrow_mut();
        Ok(slot.get_or_insert(conn).clone())
    }
}

#[async_trait(?Send)]
impl BusSession for SystemBus {
    async fn acquire(&self) -> Result<Rc<dyn Transport>> {
        let conn = self.connection().await?;
        Ok(Rc::new(BluezTransport::new(conn, self.version)))
    }
}

/// BlueZ objects on a live connection.
pub struct BluezTransport {
    conn: Connection,
    model: &'static dyn CapabilityModel,
}

impl BluezTransport {
    pub fn new(conn: Connection, version: BluezVersion) -> Self {
        Self {
            conn,
            model: version.model(),
        }
    }
}

#[async_trait(?Send)]
impl Transport for BluezTransport {
    async fn device(&self, path: &str) -> Result<Rc<dyn DeviceEndpoint>> {
        let object_path = object_path(path)?;

        let binding = if self.model.requires_adapter() {
            let props = bluez_proxy(&self.conn, object_path.clone(), bluez::PROPERTIES_INTERFACE)
                .await?;
            DeviceBinding::Properties(props)
        } else {
            let legacy = BluezLegacyDeviceProxy::builder(&self.conn)
                .path(object_path.clone())?
                .build()
                .await?;
            DeviceBinding::Legacy(legacy)
        };

        Ok(Rc::new(BluezDeviceEndpoint {
            conn: self.conn.clone(),
            path: object_path,
            model: self.model,
            binding,
        }))
    }

    async fn adapter(&self, path: &str) -> Result<Rc<dyn AdapterEndpoint>> {
        let object_path = object_path(path)?;

        let proxy = BluezAdapterProxy::builder(&self.conn)
            .path(object_path)?
            .build()
            .await?;
        Ok(Rc::new(BluezAdapterEndpoint { proxy }))
    }
}

fn object_path(path: &str) -> Result<OwnedObjectPath> {
    OwnedObjectPath::try_from(path).map_err(|e| ConnectionError::Dbus(e.into()))
}

enum DeviceBinding {
    /// BlueZ 5: `org.freedesktop.DBus.Properties` on the device object.
    Properties(zbus::Proxy<'static>),
    /// BlueZ 4: `org.bluez.Device`.
    Legacy(BluezLegacyDeviceProxy<'static>),
}

struct BluezDeviceEndpoint {
    conn: Connection,
    path: OwnedObjectPath,
    model: &'static dyn CapabilityModel,
    binding: DeviceBinding,
}

#[async_trait(?Send)]
impl DeviceEndpoint for BluezDeviceEndpoint {
    async fn fetch_properties(&self) -> Result<DeviceProperties> {
        let all: HashMap<String, OwnedValue> = match &self.binding {
            DeviceBinding::Properties(props) => {
                let reply = props
                    .call_method("GetAll", &(self.model.device_interface(),))
                    .await?;
                reply.body().deserialize()?
            }
            DeviceBinding::Legacy(legacy) => legacy.get_properties().await?,
        };

        Ok(properties_from_dict(
            all.iter().map(|(name, value)| (name.as_str(), &**value)),
        ))
    }

    async fn property_changes(&self) -> Result<LocalBoxStream<'static, DeviceProperties>> {
        match &self.binding {
            DeviceBinding::Properties(props) => {
                let interface = self.model.device_interface();
                let stream = props.receive_signal("PropertiesChanged").await?;
                Ok(stream
                    .filter_map(move |msg| future::ready(changed_properties(&msg, interface)))
                    .boxed_local())
            }
            DeviceBinding::Legacy(legacy) => {
                let stream = legacy.receive_property_changed().await?;
                Ok(stream
                    .filter_map(|signal| {
                        let batch = signal.args().ok().map(|args| {
                            let mut batch = DeviceProperties::default();
                            apply_property(&mut batch, args.name(), args.value());
                            batch
                        });
                        future::ready(batch.filter(|b| !b.is_empty()))
                    })
                    .boxed_local())
            }
        }
    }

    async fn connect(&self, role: BluetoothNetworkRole) -> Result<String> {
        let interface = self
            .model
            .session_interface(role)
            .ok_or(ConnectionError::UnsupportedBearer(role))?;
        let proxy = bluez_proxy(&self.conn, self.path.clone(), interface).await?;

        let reply = proxy.call_method("Connect", &(role.connect_type(),)).await?;
        let device: String = reply.body().deserialize()?;
        Ok(device)
    }

    async fn disconnect(
        &self,
        role: BluetoothNetworkRole,
        interface: Option<String>,
    ) -> Result<()> {
        let session_interface = self
            .model
            .session_interface(role)
            .ok_or(ConnectionError::UnsupportedBearer(role))?;
        let proxy = bluez_proxy(&self.conn, self.path.clone(), session_interface).await?;

        match interface {
            Some(iface) => proxy.call_method("Disconnect", &(iface,)).await?,
            None => proxy.call_method("Disconnect", &()).await?,
        };
        Ok(())
    }
}

struct BluezAdapterEndpoint {
    proxy: BluezAdapterProxy<'static>,
}

#[async_trait(?Send)]
impl AdapterEndpoint for BluezAdapterEndpoint {
    async fn powered(&self) -> Result<bool> {
        Ok(self.proxy.powered().await?)
    }

    async fn powered_changes(&self) -> Result<LocalBoxStream<'static, bool>> {
        let stream = self.proxy.receive_powered_changed().await;
        Ok(stream
            .filter_map(|changed| async move { changed.get().await.ok() })
            .boxed_local())
    }
}

/// Parses a `PropertiesChanged` message for `interface` into a batch.
fn changed_properties(msg: &Message, interface: &str) -> Option<DeviceProperties> {
    let body = msg.body();
    let (iface, changed, _invalidated): (String, HashMap<String, OwnedValue>, Vec<String>) =
        try_log!(body.deserialize(), "Failed to parse PropertiesChanged");

    if iface != interface {
        return None;
    }

    let batch = properties_from_dict(
        changed
            .iter()
            .map(|(name, value)| (name.as_str(), &**value)),
    );
    (!batch.is_empty()).then_some(batch)
}

/// Builds a batch from `(name, value)` pairs, ignoring unknown names and
/// values of the wrong type.
pub(crate) fn properties_from_dict<'a, I>(entries: I) -> DeviceProperties
where
    I: IntoIterator<Item = (&'a str, &'a Value<'a>)>,
{
    let mut batch = DeviceProperties::default();
    for (name, value) in entries {
        apply_property(&mut batch, name, value);
    }
    batch
}

fn apply_property(batch: &mut DeviceProperties, name: &str, value: &Value<'_>) {
    if let Value::Value(inner) = value {
        apply_property(batch, name, inner);
        return;
    }

    match (name, value) {
        (property::ADDRESS, Value::Str(s)) => batch.address = Some(s.to_string()),
        (property::NAME, Value::Str(s)) => batch.name = Some(s.to_string()),
        (property::RSSI, Value::I16(rssi)) => batch.rssi = Some(*rssi),
        (property::UUIDS, Value::Array(uuids)) => {
            batch.uuids = Some(
                uuids
                    .iter()
                    .filter_map(|v| match v {
                        Value::Str(s) => Some(s.to_string()),
                        _ => None,
                    })
                    .collect(),
            );
        }
        (property::CONNECTED, Value::Bool(connected)) => batch.connected = Some(*connected),
        (property::ADAPTER, Value::ObjectPath(path)) => batch.adapter = Some(path.to_string()),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zvariant::ObjectPath;

    const NAP: &str = "00001116-0000-1000-8000-00805f9b34fb";

    #[test]
    fn full_property_set() {
        let address = Value::from("AA:BB:CC:DD:EE:FF");
        let name = Value::from("Phone");
        let rssi = Value::from(-42i16);
        let uuids = Value::from(vec![NAP.to_string()]);
        let connected = Value::from(true);
        let adapter = Value::from(ObjectPath::try_from("/org/bluez/hci0").unwrap());

        let batch = properties_from_dict([
            ("Address", &address),
            ("Name", &name),
            ("RSSI", &rssi),
            ("UUIDs", &uuids),
            ("Connected", &connected),
            ("Adapter", &adapter),
        ]);

        assert_eq!(
            batch,
            DeviceProperties {
                address: Some("AA:BB:CC:DD:EE:FF".into()),
                name: Some("Phone".into()),
                rssi: Some(-42),
                uuids: Some(vec![NAP.into()]),
                connected: Some(true),
                adapter: Some("/org/bluez/hci0".into()),
            }
        );
    }

    #[test]
    fn unknown_names_and_wrong_types_are_ignored() {
        let alias = Value::from("My Phone");
        let bad_rssi = Value::from(-42i32);
        let bad_name = Value::from(7u32);

        let batch = properties_from_dict([
            ("Alias", &alias),
            ("RSSI", &bad_rssi),
            ("Name", &bad_name),
        ]);
        assert!(batch.is_empty());
    }

    #[test]
    fn variant_wrapped_values() {
        let wrapped = Value::Value(Box::new(Value::from(false)));
        let batch = properties_from_dict([("Connected", &wrapped)]);
        assert_eq!(batch.connected, Some(false));
    }
}
