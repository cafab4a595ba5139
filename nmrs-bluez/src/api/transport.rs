//! Bus-facing interfaces of the device core.
//!
//! The device core only talks to BlueZ through these traits. The D-Bus
//! implementation lives in [`SystemBus`](crate::SystemBus); tests and
//! embedders can provide their own.
//!
//! All futures here are `!Send`: a device and everything it talks to live on
//! one thread.

use async_trait::async_trait;
use futures::stream::LocalBoxStream;
use std::rc::Rc;

use crate::Result;
use crate::api::models::{BluetoothNetworkRole, DeviceProperties};

/// Supplies a live bus handle.
///
/// A device waits on [`acquire`](Self::acquire) before doing anything else.
#[async_trait(?Send)]
pub trait BusSession {
    async fn acquire(&self) -> Result<Rc<dyn Transport>>;
}

/// A live bus, able to bind remote device and adapter objects.
#[async_trait(?Send)]
pub trait Transport {
    /// Binds the remote device at `path`.
    async fn device(&self, path: &str) -> Result<Rc<dyn DeviceEndpoint>>;

    /// Binds the adapter at `path`.
    async fn adapter(&self, path: &str) -> Result<Rc<dyn AdapterEndpoint>>;
}

/// One remote device's property set and session calls.
#[async_trait(?Send)]
pub trait DeviceEndpoint {
    /// Reads every property at once.
    async fn fetch_properties(&self) -> Result<DeviceProperties>;

    /// Subscribes to property changes, one batch per notification.
    ///
    /// Subscribe before calling [`fetch_properties`](Self::fetch_properties)
    /// so no change between the two is lost.
    async fn property_changes(&self) -> Result<LocalBoxStream<'static, DeviceProperties>>;

    /// Opens a network session for `role`, returning the local interface name.
    async fn connect(&self, role: BluetoothNetworkRole) -> Result<String>;

    /// Closes the session opened for `role`.
    ///
    /// `interface` is only passed when the bus API needs it.
    async fn disconnect(&self, role: BluetoothNetworkRole, interface: Option<String>)
    -> Result<()>;
}

/// The owning adapter of a device (adapter-aware BlueZ only).
#[async_trait(?Send)]
pub trait AdapterEndpoint {
    async fn powered(&self) -> Result<bool>;

    async fn powered_changes(&self) -> Result<LocalBoxStream<'static, bool>>;
}
