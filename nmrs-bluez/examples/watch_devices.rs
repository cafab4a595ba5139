use std::rc::Rc;
use std::time::Duration;

use nmrs_bluez::{
    BluezManager, BluezVersion, ConnectionProvider, MemoryProvider, Result, SystemBus,
    monitor_bluez_devices,
};
use tokio::sync::watch;
use tokio::task::LocalSet;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let bus = Rc::new(SystemBus::new(BluezVersion::Bluez5));
    let conn = bus.connection().await?;
    let provider = Rc::new(MemoryProvider::new());
    let manager = Rc::new(BluezManager::new(
        bus,
        provider.clone(),
        BluezVersion::Bluez5,
    ));

    let (stop, shutdown) = watch::channel(());
    let local = LocalSet::new();

    local
        .run_until(async move {
            let monitor = {
                let manager = manager.clone();
                tokio::task::spawn_local(async move {
                    monitor_bluez_devices(&conn, &manager, shutdown).await
                })
            };

            println!("Watching Bluetooth devices for 30 seconds...");
            for _ in 0..6 {
                tokio::time::sleep(Duration::from_secs(5)).await;

                println!("\n{} device(s) known", manager.len());
                for path in manager.usable_devices() {
                    let name = manager
                        .with_device(&path, |d| d.name())
                        .flatten()
                        .unwrap_or_else(|| "unknown".into());
                    println!("  usable: {name} ({path})");
                }
            }

            println!("\nProfiles created:");
            for profile in provider.connections() {
                println!("  {} ({})", profile.id, profile.uuid);
            }

            stop.send(()).ok();
            match monitor.await {
                Ok(result) => result,
                Err(e) => {
                    eprintln!("monitor task failed: {e}");
                    Ok(())
                }
            }
        })
        .await
}
