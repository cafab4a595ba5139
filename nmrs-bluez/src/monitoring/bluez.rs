//! BlueZ device discovery using ObjectManager signals.
//!
//! Enumerates the remote devices BlueZ already knows, then follows
//! `InterfacesAdded` / `InterfacesRemoved` so the manager creates and drops
//! devices as they come and go.

use futures::{FutureExt, StreamExt, select};
use log::{debug, warn};
use tokio::sync::watch;
use zbus::Connection;
use zbus::fdo::ObjectManagerProxy;

use crate::Result;
use crate::api::manager::BluezManager;
use crate::api::models::{BluezVersion, ConnectionError};
use crate::types::constants::bluez;

/// Feeds BlueZ device objects into `manager` until `shutdown` fires.
///
/// Signals are subscribed before the initial enumeration so no device is
/// missed in between. Only objects carrying the device interface of the
/// manager's BlueZ generation are considered.
///
/// BlueZ 4 has no ObjectManager; with a BlueZ 4 manager this fails right
/// away with [`ConnectionError::UnsupportedVersion`] and devices have to be
/// added by hand.
///
/// Must run inside the same `LocalSet` as the manager.
///
/// # Example
///
/// ```ignore
/// let (tx, rx) = tokio::sync::watch::channel(());
/// local.spawn_local(async move {
///     monitor_bluez_devices(&conn, &manager, rx).await
/// });
/// // later
/// tx.send(()).ok();
/// ```
pub async fn monitor_bluez_devices(
    conn: &Connection,
    manager: &BluezManager,
    mut shutdown: watch::Receiver<()>,
) -> Result<()> {
    let interface = monitored_interface(manager.version())?;

    let object_manager = ObjectManagerProxy::builder(conn)
        .destination(bluez::SERVICE)?
        .path("/")?
        .build()
        .await?;

    // Subscribe to signals FIRST to avoid race condition
    let mut added = object_manager.receive_interfaces_added().await?.fuse();
    let mut removed = object_manager.receive_interfaces_removed().await?.fuse();
    debug!("Subscribed to BlueZ ObjectManager signals");

    let objects = object_manager.get_managed_objects().await?;
    for (path, interfaces) in &objects {
        if interfaces.keys().any(|name| name.as_str() == interface) {
            manager.device_added(path.as_str());
        }
    }
    debug!("Found {} BlueZ devices", manager.len());

    loop {
        select! {
            _ = shutdown.changed().fuse() => {
                debug!("BlueZ monitoring shut down");
                return Ok(());
            }
            signal = added.next() => {
                let Some(signal) = signal else { break };
                match signal.args() {
                    Ok(args) => {
                        let carries_device = args
                            .interfaces_and_properties()
                            .keys()
                            .any(|name| name.as_str() == interface);
                        if carries_device {
                            manager.device_added(args.object_path().as_str());
                        }
                    }
                    Err(e) => warn!("Failed to parse InterfacesAdded signal args: {e}"),
                }
            }
            signal = removed.next() => {
                let Some(signal) = signal else { break };
                match signal.args() {
                    Ok(args) => {
                        let drops_device = args
                            .interfaces()
                            .iter()
                            .any(|name| name.as_str() == interface);
                        if drops_device {
                            manager.device_removed(args.object_path().as_str());
                        }
                    }
                    Err(e) => warn!("Failed to parse InterfacesRemoved signal args: {e}"),
                }
            }
        }
    }

    warn!("BlueZ monitoring stream ended unexpectedly");
    Err(ConnectionError::Stuck("monitoring stream ended".into()))
}

/// Returns the device interface to watch for under `version`.
fn monitored_interface(version: BluezVersion) -> Result<&'static str> {
    let model = version.model();
    if !model.exports_object_manager() {
        return Err(ConnectionError::UnsupportedVersion(version));
    }
    Ok(model.device_interface())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bluez5_devices_are_monitored() {
        assert_eq!(
            monitored_interface(BluezVersion::Bluez5).unwrap(),
            "org.bluez.Device1"
        );
    }

    #[test]
    fn bluez4_has_no_object_manager() {
        assert!(matches!(
            monitored_interface(BluezVersion::Bluez4),
            Err(ConnectionError::UnsupportedVersion(BluezVersion::Bluez4))
        ));
    }
}
