use futures::channel::mpsc::UnboundedReceiver;
use futures::future::Abortable;
use log::{debug, warn};
use std::future::Future;
use std::rc::{Rc, Weak};

use crate::Result;
use crate::api::models::{
    BluetoothNetworkRole, BluezVersion, BtCapabilities, DeviceEvent, TimeoutConfig,
};
use crate::api::provider::ConnectionProvider;
use crate::api::transport::BusSession;
use crate::core::device::DeviceInner;
use crate::core::{discovery, session};

/// One remote Bluetooth device.
///
/// The handle is the single owner of the device: dropping it tears the
/// device down, releasing its registry subscription and turning every
/// outstanding future it handed out into a no-op.
///
/// A device does nothing until its [`run`](Self::run) future is polled.
/// Everything here is single-threaded; drive the futures with
/// `tokio::task::spawn_local` inside a `LocalSet` (or
/// [`BluezManager`](crate::BluezManager), which does exactly that).
///
/// # Example
///
/// ```no_run
/// use std::rc::Rc;
/// use nmrs_bluez::{
///     BluezDevice, BluezVersion, DeviceEvent, DeviceProperty, MemoryProvider, SystemBus,
///     TimeoutConfig,
/// };
/// use futures::StreamExt;
///
/// # async fn example() {
/// let provider = Rc::new(MemoryProvider::new());
/// let bus = Rc::new(SystemBus::new(BluezVersion::Bluez5));
///
/// let device = BluezDevice::new(
///     "/org/bluez/hci0/dev_00_1A_7D_DA_71_13",
///     BluezVersion::Bluez5,
///     provider,
///     TimeoutConfig::default(),
/// );
/// let mut events = device.events();
/// tokio::task::spawn_local(device.run(bus));
///
/// while let Some(event) = events.next().await {
///     if let DeviceEvent::Changed(DeviceProperty::Usable(usable)) = event {
///         println!("usable: {usable}");
///     }
/// }
/// # }
/// ```
pub struct BluezDevice {
    inner: Rc<DeviceInner>,
}

impl BluezDevice {
    /// Creates a device for the BlueZ object at `path`.
    ///
    /// The device subscribes to `provider` right away.
    pub fn new(
        path: impl Into<String>,
        version: BluezVersion,
        provider: Rc<dyn ConnectionProvider>,
        timeouts: TimeoutConfig,
    ) -> Self {
        Self {
            inner: DeviceInner::new(path.into(), version, provider, timeouts),
        }
    }

    /// Returns the discovery future.
    ///
    /// It acquires the bus, binds the device (and its adapter), publishes
    /// `Initialized`, then follows property changes until the device is
    /// dropped. Dropping the device completes the future wherever it is
    /// waiting, releasing its signal subscriptions. Only the first call does
    /// anything.
    pub fn run(&self, bus: Rc<dyn BusSession>) -> impl Future<Output = ()> + 'static {
        let path = self.inner.path();
        let registration = self.inner.start();
        if registration.is_none() {
            warn!("[{path}] discovery already started");
        }
        let device = Rc::downgrade(&self.inner);

        async move {
            let Some(registration) = registration else {
                return;
            };
            if Abortable::new(discovery::run(device, bus), registration)
                .await
                .is_err()
            {
                debug!("[{path}] discovery stopped by teardown");
            }
        }
    }

    /// Subscribes to this device's notifications.
    ///
    /// The receiver ends when the device is dropped.
    pub fn events(&self) -> UnboundedReceiver<DeviceEvent> {
        self.inner.subscribe_events()
    }

    pub fn path(&self) -> String {
        self.inner.path()
    }

    /// Hardware address, once known.
    pub fn address(&self) -> Option<String> {
        self.inner.state.borrow().address.clone()
    }

    pub fn name(&self) -> Option<String> {
        self.inner.state.borrow().name.clone()
    }

    pub fn rssi(&self) -> i16 {
        self.inner.state.borrow().rssi
    }

    pub fn capabilities(&self) -> BtCapabilities {
        self.inner.state.borrow().capabilities
    }

    /// Whether the baseband link is up.
    pub fn connected(&self) -> bool {
        self.inner.state.borrow().connected
    }

    /// Whether the device can be used as a network interface right now.
    pub fn usable(&self) -> bool {
        self.inner.state.borrow().usable
    }

    /// Whether discovery completed successfully.
    pub fn initialized(&self) -> bool {
        self.inner.state.borrow().initialized
    }

    /// Bearer of the current session, if any.
    pub fn active_role(&self) -> Option<BluetoothNetworkRole> {
        self.inner.state.borrow().session.active_role
    }

    /// UUIDs of the registry profiles that match this device.
    pub fn connections(&self) -> Vec<String> {
        self.inner.state.borrow().candidates.clone()
    }

    /// UUID of the profile this device provisioned, if it did.
    pub fn provisioned_connection(&self) -> Option<String> {
        self.inner.state.borrow().pan_connection.clone()
    }

    /// Opens a network session over `role`.
    ///
    /// Resolves to the local interface name (`bnep0`, `rfcomm0`, ...).
    /// The returned future does not borrow the handle.
    ///
    /// # Errors
    ///
    /// - [`SessionBusy`](crate::ConnectionError::SessionBusy) if an operation
    ///   is outstanding or a session is already open
    /// - [`UnsupportedBearer`](crate::ConnectionError::UnsupportedBearer) if the
    ///   device or the BlueZ generation does not offer `role`
    /// - [`Timeout`](crate::ConnectionError::Timeout) after the configured
    ///   connect deadline
    pub fn connect(
        &self,
        role: BluetoothNetworkRole,
    ) -> impl Future<Output = Result<String>> + 'static {
        session::connect(self.weak(), role)
    }

    /// Closes the current session.
    ///
    /// The active bearer is cleared as soon as the call is issued.
    ///
    /// # Errors
    ///
    /// - [`NotConnected`](crate::ConnectionError::NotConnected) without a session
    /// - [`SessionBusy`](crate::ConnectionError::SessionBusy) if an operation
    ///   is outstanding
    /// - [`Timeout`](crate::ConnectionError::Timeout) after the configured
    ///   disconnect deadline
    pub fn disconnect(&self) -> impl Future<Output = Result<()>> + 'static {
        session::disconnect(self.weak())
    }

    fn weak(&self) -> Weak<DeviceInner> {
        Rc::downgrade(&self.inner)
    }
}

impl Drop for BluezDevice {
    fn drop(&mut self) {
        self.inner.teardown();
    }
}
