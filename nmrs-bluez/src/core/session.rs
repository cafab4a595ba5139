//! Connect and disconnect of a device's network session.
//!
//! At most one operation is outstanding per device. A second request while
//! one is running fails with [`ConnectionError::SessionBusy`]; nothing is
//! queued.

use futures::{FutureExt, select};
use futures_timer::Delay;
use log::{debug, info, warn};
use std::future::Future;
use std::pin::pin;
use std::rc::Weak;
use std::time::Duration;

use crate::Result;
use crate::api::models::{BluetoothNetworkRole, ConnectionError};
use crate::core::device::{DeviceInner, live};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionOp {
    Connect,
    Disconnect,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SessionState {
    /// Bearer of the current session, recorded when `Connect` is issued.
    pub(crate) active_role: Option<BluetoothNetworkRole>,
    pub(crate) in_flight: Option<SessionOp>,
    /// Local interface name returned by `Connect`.
    pub(crate) interface: Option<String>,
}

/// Runs `op`, failing with [`ConnectionError::Timeout`] after `timeout`.
pub(crate) async fn with_deadline<T, F>(op: F, timeout: Duration) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let mut op = pin!(op.fuse());
    let mut timeout_delay = pin!(Delay::new(timeout).fuse());

    select! {
        result = op => result,
        _ = timeout_delay => Err(ConnectionError::Timeout),
    }
}

pub(crate) async fn connect(
    device: Weak<DeviceInner>,
    role: BluetoothNetworkRole,
) -> Result<String> {
    let (endpoint, path, timeout) = {
        let inner = live(&device)?;
        let mut st = inner.state.borrow_mut();

        if st.session.in_flight.is_some() || st.session.active_role.is_some() {
            return Err(ConnectionError::SessionBusy);
        }
        if !st.initialized {
            return Err(ConnectionError::NotInitialized);
        }
        if !st.model.supports_role(role) || !st.capabilities.contains(role.capability()) {
            return Err(ConnectionError::UnsupportedBearer(role));
        }
        let endpoint = inner
            .endpoint
            .borrow()
            .clone()
            .ok_or(ConnectionError::NotInitialized)?;

        st.session.in_flight = Some(SessionOp::Connect);
        st.session.active_role = Some(role);
        (endpoint, st.path.clone(), inner.timeouts.connect_timeout)
    };

    debug!("[{path}] connecting to {role} service");
    let result = with_deadline(endpoint.connect(role), timeout).await;

    let inner = live(&device)?;
    let mut st = inner.state.borrow_mut();
    st.session.in_flight = None;

    match result {
        Ok(interface) => {
            info!("[{path}] {role} session up on {interface}");
            st.session.interface = Some(interface.clone());
            Ok(interface)
        }
        Err(e) => {
            warn!("[{path}] {role} connect failed: {e}");
            st.session.active_role = None;
            st.session.interface = None;
            Err(e)
        }
    }
}

pub(crate) async fn disconnect(device: Weak<DeviceInner>) -> Result<()> {
    let (endpoint, path, role, interface, timeout) = {
        let inner = live(&device)?;
        let mut st = inner.state.borrow_mut();

        if st.session.in_flight.is_some() {
            return Err(ConnectionError::SessionBusy);
        }
        let Some(role) = st.session.active_role.take() else {
            return Err(ConnectionError::NotConnected);
        };
        let interface = st.session.interface.take();

        if role == BluetoothNetworkRole::Dun && interface.is_none() {
            debug!("[{}] DUN session without interface, nothing to disconnect", st.path);
            return Ok(());
        }

        let endpoint = inner
            .endpoint
            .borrow()
            .clone()
            .ok_or(ConnectionError::NotInitialized)?;

        let interface = interface.filter(|_| st.model.disconnect_takes_interface(role));
        st.session.in_flight = Some(SessionOp::Disconnect);
        (
            endpoint,
            st.path.clone(),
            role,
            interface,
            inner.timeouts.disconnect_timeout,
        )
    };

    debug!("[{path}] disconnecting {role} session");
    let result = with_deadline(endpoint.disconnect(role, interface), timeout).await;

    if let Some(inner) = device.upgrade() {
        inner.state.borrow_mut().session.in_flight = None;
    }

    if let Err(e) = &result {
        warn!("[{path}] {role} disconnect failed: {e}");
    }
    result
}
