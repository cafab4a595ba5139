use futures::channel::mpsc::UnboundedReceiver;
use log::{debug, info};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tokio::task::JoinHandle;

use crate::api::device::BluezDevice;
use crate::api::models::{BluezVersion, DeviceEvent, TimeoutConfig};
use crate::api::provider::ConnectionProvider;
use crate::api::transport::BusSession;

struct ManagedDevice {
    device: BluezDevice,
    task: JoinHandle<()>,
}

/// Owns every known Bluetooth device, keyed by object path.
///
/// Each added device gets its discovery future spawned with
/// [`tokio::task::spawn_local`], so the manager must be used from inside a
/// `tokio::task::LocalSet`. Removing a device aborts that task and drops
/// the device.
///
/// # Example
///
/// ```no_run
/// use std::rc::Rc;
/// use nmrs_bluez::{BluezManager, BluezVersion, MemoryProvider, SystemBus};
///
/// # async fn example() {
/// let local = tokio::task::LocalSet::new();
/// local
///     .run_until(async {
///         let manager = BluezManager::new(
///             Rc::new(SystemBus::new(BluezVersion::Bluez5)),
///             Rc::new(MemoryProvider::new()),
///             BluezVersion::Bluez5,
///         );
///         manager.device_added("/org/bluez/hci0/dev_00_1A_7D_DA_71_13");
///         println!("usable: {:?}", manager.usable_devices());
///     })
///     .await;
/// # }
/// ```
pub struct BluezManager {
    bus: Rc<dyn BusSession>,
    provider: Rc<dyn ConnectionProvider>,
    version: BluezVersion,
    timeouts: TimeoutConfig,
    devices: RefCell<HashMap<String, ManagedDevice>>,
}

impl BluezManager {
    pub fn new(
        bus: Rc<dyn BusSession>,
        provider: Rc<dyn ConnectionProvider>,
        version: BluezVersion,
    ) -> Self {
        Self {
            bus,
            provider,
            version,
            timeouts: TimeoutConfig::default(),
            devices: RefCell::new(HashMap::new()),
        }
    }

    /// Uses `timeouts` for devices added from now on.
    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Returns the BlueZ generation devices are created for.
    pub fn version(&self) -> BluezVersion {
        self.version
    }

    /// Creates and starts a device for `path`.
    ///
    /// Returns the new device's notification receiver, or `None` if the path
    /// is already known.
    pub fn device_added(&self, path: &str) -> Option<UnboundedReceiver<DeviceEvent>> {
        if self.devices.borrow().contains_key(path) {
            debug!("[{path}] already managed");
            return None;
        }

        let device = BluezDevice::new(
            path,
            self.version,
            self.provider.clone(),
            self.timeouts,
        );
        let events = device.events();
        let task = tokio::task::spawn_local(device.run(self.bus.clone()));

        info!("[{path}] Bluetooth device added");
        self.devices
            .borrow_mut()
            .insert(path.to_string(), ManagedDevice { device, task });
        Some(events)
    }

    /// Stops and drops the device at `path`. Returns `false` if unknown.
    pub fn device_removed(&self, path: &str) -> bool {
        let Some(managed) = self.devices.borrow_mut().remove(path) else {
            return false;
        };

        managed.task.abort();
        drop(managed.device);
        info!("[{path}] Bluetooth device removed");
        true
    }

    /// Stops and drops every device.
    pub fn shutdown(&self) {
        let devices: Vec<_> = self.devices.borrow_mut().drain().collect();
        for (path, managed) in devices {
            managed.task.abort();
            drop(managed.device);
            debug!("[{path}] stopped");
        }
    }

    /// Runs `f` with the device at `path`.
    ///
    /// `f` must not add or remove devices.
    pub fn with_device<R>(&self, path: &str, f: impl FnOnce(&BluezDevice) -> R) -> Option<R> {
        let devices = self.devices.borrow();
        devices.get(path).map(|managed| f(&managed.device))
    }

    /// Paths of the devices that are usable right now, sorted.
    pub fn usable_devices(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .devices
            .borrow()
            .iter()
            .filter(|(_, managed)| managed.device.usable())
            .map(|(path, _)| path.clone())
            .collect();
        paths.sort();
        paths
    }

    /// Paths of every managed device, sorted.
    pub fn devices(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.devices.borrow().keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.devices.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.borrow().is_empty()
    }
}

impl Drop for BluezManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
