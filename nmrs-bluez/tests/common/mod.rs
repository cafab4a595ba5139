//! In-process stand-ins for BlueZ used by the integration tests.
//!
//! Every mock answers immediately unless a test parks a reply on a oneshot
//! channel, so a single `poll!` of a device's discovery future runs as far
//! as the mocks allow.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::FutureExt;
use futures::StreamExt;
use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use futures::channel::oneshot;
use futures::stream::LocalBoxStream;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use nmrs_bluez::{
    AdapterEndpoint, BluetoothNetworkRole, BluetoothSettings, BluezDevice, BluezVersion,
    BusSession, ConnectionError, DeviceEndpoint, DeviceEvent, DeviceProperties, IpSettings,
    MemoryProvider, Profile, Result, TimeoutConfig, Transport,
};

pub const PATH: &str = "/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF";
pub const ADAPTER: &str = "/org/bluez/hci0";
pub const ADDRESS: &str = "AA:BB:CC:DD:EE:FF";
pub const BDADDR: [u8; 6] = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF];
pub const NAP_UUID: &str = "00001116-0000-1000-8000-00805f9b34fb";
pub const DUN_UUID: &str = "00001103-0000-1000-8000-00805f9b34fb";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect(BluetoothNetworkRole),
    Disconnect(BluetoothNetworkRole, Option<String>),
}

pub struct MockDevice {
    /// `None` makes the initial fetch fail.
    pub props: RefCell<Option<DeviceProperties>>,
    pub changes: UnboundedSender<DeviceProperties>,
    changes_rx: RefCell<Option<UnboundedReceiver<DeviceProperties>>>,
    pub connect_reply: RefCell<Option<oneshot::Receiver<Result<String>>>>,
    pub disconnect_reply: RefCell<Option<oneshot::Receiver<Result<()>>>>,
    pub calls: RefCell<Vec<Call>>,
}

impl MockDevice {
    pub fn new(props: Option<DeviceProperties>) -> Rc<Self> {
        let (changes, rx) = unbounded();
        Rc::new(Self {
            props: RefCell::new(props),
            changes,
            changes_rx: RefCell::new(Some(rx)),
            connect_reply: RefCell::new(None),
            disconnect_reply: RefCell::new(None),
            calls: RefCell::new(Vec::new()),
        })
    }

    /// Parks the next `Connect` until the returned sender fires.
    pub fn hold_connect(&self) -> oneshot::Sender<Result<String>> {
        let (tx, rx) = oneshot::channel();
        *self.connect_reply.borrow_mut() = Some(rx);
        tx
    }

    /// Parks the next `Disconnect` until the returned sender fires.
    pub fn hold_disconnect(&self) -> oneshot::Sender<Result<()>> {
        let (tx, rx) = oneshot::channel();
        *self.disconnect_reply.borrow_mut() = Some(rx);
        tx
    }

    pub fn push(&self, batch: DeviceProperties) {
        self.changes.unbounded_send(batch).unwrap();
    }
}

fn dropped() -> ConnectionError {
    ConnectionError::Stuck("reply dropped".into())
}

#[async_trait(?Send)]
impl DeviceEndpoint for MockDevice {
    async fn fetch_properties(&self) -> Result<DeviceProperties> {
        self.props
            .borrow()
            .clone()
            .ok_or_else(|| ConnectionError::Stuck("GetAll failed".into()))
    }

    async fn property_changes(&self) -> Result<LocalBoxStream<'static, DeviceProperties>> {
        let rx = self
            .changes_rx
            .borrow_mut()
            .take()
            .ok_or_else(|| ConnectionError::Stuck("already subscribed".into()))?;
        Ok(rx.boxed_local())
    }

    async fn connect(&self, role: BluetoothNetworkRole) -> Result<String> {
        self.calls.borrow_mut().push(Call::Connect(role));
        let reply = self.connect_reply.borrow_mut().take();
        match reply {
            Some(rx) => rx.await.unwrap_or_else(|_| Err(dropped())),
            None => Ok(match role {
                BluetoothNetworkRole::PanU => "bnep0".into(),
                BluetoothNetworkRole::Dun => "rfcomm0".into(),
            }),
        }
    }

    async fn disconnect(
        &self,
        role: BluetoothNetworkRole,
        interface: Option<String>,
    ) -> Result<()> {
        self.calls.borrow_mut().push(Call::Disconnect(role, interface));
        let reply = self.disconnect_reply.borrow_mut().take();
        match reply {
            Some(rx) => rx.await.unwrap_or_else(|_| Err(dropped())),
            None => Ok(()),
        }
    }
}

pub struct MockAdapter {
    pub powered: Cell<bool>,
    pub changes: UnboundedSender<bool>,
    changes_rx: RefCell<Option<UnboundedReceiver<bool>>>,
}

impl MockAdapter {
    pub fn new(powered: bool) -> Rc<Self> {
        let (changes, rx) = unbounded();
        Rc::new(Self {
            powered: Cell::new(powered),
            changes,
            changes_rx: RefCell::new(Some(rx)),
        })
    }

    pub fn set_powered(&self, powered: bool) {
        self.powered.set(powered);
        self.changes.unbounded_send(powered).unwrap();
    }
}

#[async_trait(?Send)]
impl AdapterEndpoint for MockAdapter {
    async fn powered(&self) -> Result<bool> {
        Ok(self.powered.get())
    }

    async fn powered_changes(&self) -> Result<LocalBoxStream<'static, bool>> {
        let rx = self
            .changes_rx
            .borrow_mut()
            .take()
            .ok_or_else(|| ConnectionError::Stuck("already subscribed".into()))?;
        Ok(rx.boxed_local())
    }
}

pub struct MockTransport {
    pub device: Rc<MockDevice>,
    /// `None` makes adapter resolution fail.
    pub adapter: Option<Rc<MockAdapter>>,
    pub adapter_requests: RefCell<Vec<String>>,
}

#[async_trait(?Send)]
impl Transport for MockTransport {
    async fn device(&self, _path: &str) -> Result<Rc<dyn DeviceEndpoint>> {
        Ok(self.device.clone())
    }

    async fn adapter(&self, path: &str) -> Result<Rc<dyn AdapterEndpoint>> {
        self.adapter_requests.borrow_mut().push(path.to_string());
        match &self.adapter {
            Some(adapter) => Ok(adapter.clone()),
            None => Err(ConnectionError::Stuck(format!("no adapter at {path}"))),
        }
    }
}

pub struct MockBus {
    pub transport: Rc<MockTransport>,
    pub gate: RefCell<Option<oneshot::Receiver<()>>>,
    pub fail: Cell<bool>,
}

impl MockBus {
    /// Parks acquisition until the returned sender fires.
    pub fn hold(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.gate.borrow_mut() = Some(rx);
        tx
    }
}

#[async_trait(?Send)]
impl BusSession for MockBus {
    async fn acquire(&self) -> Result<Rc<dyn Transport>> {
        let gate = self.gate.borrow_mut().take();
        if let Some(rx) = gate {
            let _ = rx.await;
        }
        if self.fail.get() {
            return Err(ConnectionError::Stuck("no bus".into()));
        }
        Ok(self.transport.clone())
    }
}

/// A BlueZ 5 NAP phone.
pub fn nap_props() -> DeviceProperties {
    DeviceProperties {
        address: Some(ADDRESS.into()),
        name: Some("Phone".into()),
        rssi: Some(-50),
        uuids: Some(vec![NAP_UUID.into()]),
        connected: Some(false),
        adapter: Some(ADAPTER.into()),
    }
}

/// A BlueZ 4 DUN-only modem.
pub fn dun_props() -> DeviceProperties {
    DeviceProperties {
        address: Some(ADDRESS.into()),
        name: Some("Modem".into()),
        rssi: Some(-60),
        uuids: Some(vec![DUN_UUID.into()]),
        connected: Some(false),
        adapter: None,
    }
}

pub fn bluetooth_profile(uuid: &str, kind: &str, bdaddr: &[u8]) -> Profile {
    Profile {
        uuid: uuid.into(),
        id: format!("{kind} profile"),
        connection_type: "bluetooth".into(),
        autoconnect: true,
        bluetooth: Some(BluetoothSettings {
            bdaddr: bdaddr.to_vec(),
            bt_device_type: kind.into(),
        }),
        ipv4: IpSettings::default(),
        ipv6: IpSettings::default(),
    }
}

pub struct Fixture {
    pub provider: Rc<MemoryProvider>,
    pub bus: Rc<MockBus>,
    pub device: Rc<MockDevice>,
    pub adapter: Option<Rc<MockAdapter>>,
}

impl Fixture {
    pub fn new(props: Option<DeviceProperties>, powered: Option<bool>) -> Self {
        Self::with_provider(MemoryProvider::new(), props, powered)
    }

    pub fn with_provider(
        provider: MemoryProvider,
        props: Option<DeviceProperties>,
        powered: Option<bool>,
    ) -> Self {
        let device = MockDevice::new(props);
        let adapter = powered.map(MockAdapter::new);
        let transport = Rc::new(MockTransport {
            device: device.clone(),
            adapter: adapter.clone(),
            adapter_requests: RefCell::new(Vec::new()),
        });
        let bus = Rc::new(MockBus {
            transport,
            gate: RefCell::new(None),
            fail: Cell::new(false),
        });

        Self {
            provider: Rc::new(provider),
            bus,
            device,
            adapter,
        }
    }

    pub fn bluez_device(&self, version: BluezVersion) -> BluezDevice {
        self.bluez_device_with(version, TimeoutConfig::default())
    }

    pub fn bluez_device_with(&self, version: BluezVersion, timeouts: TimeoutConfig) -> BluezDevice {
        BluezDevice::new(PATH, version, self.provider.clone(), timeouts)
    }

    pub fn bus(&self) -> Rc<dyn BusSession> {
        self.bus.clone()
    }
}

/// Returns every notification queued so far.
pub fn drain(events: &mut UnboundedReceiver<DeviceEvent>) -> Vec<DeviceEvent> {
    let mut out = Vec::new();
    while let Some(Some(event)) = events.next().now_or_never() {
        out.push(event);
    }
    out
}
