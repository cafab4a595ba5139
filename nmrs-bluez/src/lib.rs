//! Bluetooth network device management over BlueZ.
//!
//! This crate tracks remote Bluetooth peripherals through BlueZ's D-Bus API
//! and decides when one of them can be used as a network interface:
//!
//! - Discovering a device's address, name, signal strength and services
//! - Resolving its networking capabilities (NAP, DUN)
//! - Matching it against the connection profiles of a profile registry
//! - Creating a PAN profile for NAP devices that have none
//! - Opening and closing the network session (`Connect` / `Disconnect`)
//!
//! # Example
//!
//! ```no_run
//! use std::rc::Rc;
//! use nmrs_bluez::{BluezManager, BluezVersion, MemoryProvider, SystemBus};
//!
//! # async fn example() -> nmrs_bluez::Result<()> {
//! let local = tokio::task::LocalSet::new();
//! local
//!     .run_until(async {
//!         let bus = Rc::new(SystemBus::new(BluezVersion::Bluez5));
//!         let conn = bus.connection().await?;
//!         let provider = Rc::new(MemoryProvider::new());
//!         let manager = BluezManager::new(bus, provider, BluezVersion::Bluez5);
//!
//!         let (_tx, rx) = tokio::sync::watch::channel(());
//!         nmrs_bluez::monitor_bluez_devices(&conn, &manager, rx).await
//!     })
//!     .await
//! # }
//! ```
//!
//! # Threading
//!
//! A device and everything attached to it lives on one thread. Devices use
//! `Rc`/`RefCell` internally and hand out `!Send` futures; run them with
//! `tokio::task::spawn_local` inside a `LocalSet`.
//!
//! # BlueZ generations
//!
//! [`BluezVersion`] selects the D-Bus API a device is driven through. BlueZ 5
//! requires the owning adapter to be powered and only offers NAP; BlueZ 4
//! offers NAP and DUN and ignores the adapter.
//!
//! # Error Handling
//!
//! All fallible operations return `Result<T, ConnectionError>`. Discovery
//! failures are not returned to anyone: the device logs them and publishes
//! `Initialized(false)`.
//!
//! # Logging
//!
//! This crate uses the [`log`](https://docs.rs/log) facade for logging. To see
//! log output, add a logging implementation like `env_logger`. For example:
//!
//! ```no_run,ignore
//! env_logger::init();
//! // ...
//! ```

// Internal implementation modules
mod core;
mod dbus;
mod monitoring;
mod types;
mod util;

// Public API modules
pub mod api;

// Re-exported public API
pub use api::builders;
pub use api::device::BluezDevice;
pub use api::manager::BluezManager;
pub use api::models::{
    BluetoothNetworkRole, BluetoothSettings, BluezVersion, BtCapabilities, ConnectionError,
    DeviceEvent, DeviceProperties, DeviceProperty, IpSettings, Profile, TimeoutConfig,
};
pub use api::provider::{
    ConnectionProvider, MemoryProvider, ProviderEvent, ProviderListener, SubscriptionId,
};
pub use api::transport::{AdapterEndpoint, BusSession, DeviceEndpoint, Transport};
pub use crate::core::bluez_transport::{BluezTransport, SystemBus};
pub use monitoring::bluez::monitor_bluez_devices;
pub use types::bluez_model::CapabilityModel;

/// A specialized `Result` type for Bluetooth device operations.
pub type Result<T> = std::result::Result<T, ConnectionError>;
