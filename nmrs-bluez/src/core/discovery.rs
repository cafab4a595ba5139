//! Discovery pipeline of a Bluetooth device.
//!
//! Bus first, then the device object, then (for adapter-aware models) the
//! adapter. Once all of that is in place the device is initialized and
//! follows property and adapter power changes until it is torn down.
//!
//! Any failure before initialization ends discovery for good: the device
//! publishes `Initialized(false)` and is never usable.

use futures::stream::{self, LocalBoxStream, StreamExt};
use log::{debug, info, warn};
use std::rc::{Rc, Weak};

use crate::Result;
use crate::api::models::{ConnectionError, DeviceProperties};
use crate::api::transport::BusSession;
use crate::core::device::{DeviceInner, live};
use crate::core::state::{AdapterState, Changed};

enum Update {
    Properties(DeviceProperties),
    Powered(bool),
}

/// Streams a device follows once it is initialized.
struct Watches {
    properties: LocalBoxStream<'static, DeviceProperties>,
    powered: Option<LocalBoxStream<'static, bool>>,
}

/// Runs discovery, then follows changes until the device goes away.
pub(crate) async fn run(device: Weak<DeviceInner>, bus: Rc<dyn BusSession>) {
    match discover(&device, bus).await {
        Ok(watches) => follow(device, watches).await,
        Err(e) => {
            let Ok(inner) = live(&device) else {
                return;
            };
            warn!("[{}] discovery failed: {e}", inner.path());
            inner.report_initialized(false);
            inner.recompute();
        }
    }
}

async fn discover(device: &Weak<DeviceInner>, bus: Rc<dyn BusSession>) -> Result<Watches> {
    let transport = bus.acquire().await?;

    let (path, model) = {
        let inner = live(device)?;
        let path = inner.path();
        debug!("[{path}] bus available");
        inner.state.borrow_mut().bus_present = true;
        inner.recompute();
        let model = inner.state.borrow().model;
        (path, model)
    };

    let endpoint = transport.device(&path).await?;

    // Subscribe before the fetch so no change in between is lost.
    let properties = endpoint.property_changes().await?;
    let props = endpoint.fetch_properties().await?;

    {
        let inner = live(device)?;
        *inner.endpoint.borrow_mut() = Some(endpoint);
        inner.apply_properties(&props);
        inner.load_connections();
    }

    let powered = if model.requires_adapter() {
        let adapter_path = props.adapter.ok_or(ConnectionError::MissingAdapter)?;
        let adapter = transport.adapter(&adapter_path).await?;
        let changes = adapter.powered_changes().await?;
        let powered = adapter.powered().await.unwrap_or_else(|e| {
            warn!("[{path}] cannot read Powered of {adapter_path}: {e}");
            false
        });

        let inner = live(device)?;
        debug!("[{path}] adapter {adapter_path} powered: {powered}");
        inner.state.borrow_mut().adapter = AdapterState::Resolved { powered };
        Some(changes)
    } else {
        None
    };

    let inner = live(device)?;
    info!("[{path}] initialized");
    inner.report_initialized(true);
    inner.recompute();

    Ok(Watches {
        properties,
        powered,
    })
}

async fn follow(device: Weak<DeviceInner>, watches: Watches) {
    let properties = watches.properties.map(Update::Properties);
    let powered = watches
        .powered
        .unwrap_or_else(|| stream::pending().boxed_local())
        .map(Update::Powered);
    let mut updates = stream::select(properties, powered);

    while let Some(update) = updates.next().await {
        let Ok(inner) = live(&device) else {
            return;
        };

        match update {
            Update::Properties(batch) => inner.apply_properties(&batch),
            Update::Powered(powered) => {
                {
                    let mut st = inner.state.borrow_mut();
                    debug!("[{}] adapter powered: {powered}", st.path);
                    st.adapter = AdapterState::Resolved { powered };
                }
                inner.recompute();
            }
        }
    }

    if let Ok(inner) = live(&device) {
        debug!("[{}] property stream ended", inner.path());
    }
}

impl DeviceInner {
    /// Applies one property batch: merge, notify, then recompute once.
    ///
    /// A batch that completes the device's identity (address or
    /// capabilities) also re-reads the registry.
    pub(crate) fn apply_properties(&self, batch: &DeviceProperties) {
        let changed = self.state.borrow_mut().merge(batch);
        self.publish(changed);

        if changed.intersects(Changed::ADDRESS | Changed::CAPABILITIES) {
            self.load_connections();
        }
        self.recompute();
    }
}
