//! Shared core of a [`BluezDevice`](crate::BluezDevice).
//!
//! `DeviceInner` is owned by the public handle through an `Rc`. Every
//! long-running piece (discovery, session calls, registry listener) holds a
//! `Weak` and checks [`DeviceInner::is_alive`] before touching state, so a
//! torn-down device turns them into no-ops.
//!
//! The `impl DeviceInner` blocks are split by concern: this file holds
//! construction, notification and the usability recomputation; the registry
//! bridge, the provisioner, the session controller and the discovery
//! pipeline each add theirs.

use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use futures::future::{AbortHandle, AbortRegistration};
use log::debug;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::Result;
use crate::api::models::{BluezVersion, ConnectionError, DeviceEvent, TimeoutConfig};
use crate::api::provider::{ConnectionProvider, ProviderListener, SubscriptionId};
use crate::api::transport::DeviceEndpoint;
use crate::core::gate::{self, GateDecision};
use crate::core::state::{Changed, DeviceState};

pub(crate) struct DeviceInner {
    pub(crate) state: RefCell<DeviceState>,
    pub(crate) provider: Rc<dyn ConnectionProvider>,
    pub(crate) timeouts: TimeoutConfig,
    pub(crate) endpoint: RefCell<Option<Rc<dyn DeviceEndpoint>>>,
    /// Set only while this device submits its own profile.
    pub(crate) suppress_added: Cell<bool>,
    alive: Cell<bool>,
    started: Cell<bool>,
    /// Stops the discovery future on teardown.
    discovery: RefCell<Option<AbortHandle>>,
    subscription: Cell<Option<SubscriptionId>>,
    listeners: RefCell<Vec<UnboundedSender<DeviceEvent>>>,
}

impl DeviceInner {
    pub(crate) fn new(
        path: String,
        version: BluezVersion,
        provider: Rc<dyn ConnectionProvider>,
        timeouts: TimeoutConfig,
    ) -> Rc<Self> {
        debug!("[{path}] new Bluetooth device ({version})");

        let inner = Rc::new(Self {
            state: RefCell::new(DeviceState::new(path, version.model())),
            provider,
            timeouts,
            endpoint: RefCell::new(None),
            suppress_added: Cell::new(false),
            alive: Cell::new(true),
            started: Cell::new(false),
            discovery: RefCell::new(None),
            subscription: Cell::new(None),
            listeners: RefCell::new(Vec::new()),
        });

        let weak = Rc::downgrade(&inner);
        let listener: Weak<dyn ProviderListener> = weak;
        let id = inner.provider.subscribe(listener);
        inner.subscription.set(Some(id));

        inner
    }

    pub(crate) fn path(&self) -> String {
        self.state.borrow().path.clone()
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.alive.get()
    }

    /// Marks discovery as started.
    ///
    /// Returns the registration the discovery future must be wrapped with,
    /// or `None` if discovery already started.
    pub(crate) fn start(&self) -> Option<AbortRegistration> {
        if self.started.replace(true) {
            return None;
        }
        let (handle, registration) = AbortHandle::new_pair();
        *self.discovery.borrow_mut() = Some(handle);
        Some(registration)
    }

    pub(crate) fn subscribe_events(&self) -> UnboundedReceiver<DeviceEvent> {
        let (tx, rx) = unbounded();
        self.listeners.borrow_mut().push(tx);
        rx
    }

    pub(crate) fn emit(&self, event: DeviceEvent) {
        let mut listeners = self.listeners.borrow_mut();
        listeners.retain(|tx| tx.unbounded_send(event.clone()).is_ok());
    }

    /// Publishes one notification per property in `changed`.
    pub(crate) fn publish(&self, changed: Changed) {
        if changed.is_empty() {
            return;
        }
        let events = self.state.borrow().events_for(changed);
        for event in events {
            self.emit(event);
        }
    }

    /// Publishes `Initialized(success)` unless it was published before.
    pub(crate) fn report_initialized(&self, success: bool) {
        {
            let mut st = self.state.borrow_mut();
            if st.init_reported {
                return;
            }
            st.init_reported = true;
            if success {
                st.initialized = true;
            }
        }
        self.emit(DeviceEvent::Initialized(success));
    }

    /// Recomputes `usable` and notifies if it changed.
    ///
    /// May run the auto-provisioner, which calls into the provider; no state
    /// borrow is held across that call.
    pub(crate) fn recompute(&self) {
        let decision = gate::evaluate(&self.state.borrow().gate_inputs());

        let usable = match decision {
            GateDecision::Decided(usable) => usable,
            GateDecision::Provision => {
                if self.state.borrow().pan_connection.is_none() {
                    self.pan_connection_check_create();
                }
                self.state.borrow().pan_connection.is_some()
            }
        };

        let changed = {
            let mut st = self.state.borrow_mut();
            if st.usable == usable {
                false
            } else {
                debug!("[{}] usable: {usable}", st.path);
                st.usable = usable;
                true
            }
        };

        if changed {
            self.publish(Changed::USABLE);
        }
    }

    /// Stops discovery and releases the registry subscription and every
    /// profile reference.
    pub(crate) fn teardown(&self) {
        if !self.alive.replace(false) {
            return;
        }

        if let Some(id) = self.subscription.take() {
            self.provider.unsubscribe(id);
        }
        if let Some(discovery) = self.discovery.borrow_mut().take() {
            discovery.abort();
        }

        {
            let mut st = self.state.borrow_mut();
            debug!("[{}] tearing down", st.path);
            st.candidates.clear();
            st.pan_connection = None;
        }

        self.endpoint.borrow_mut().take();
        self.listeners.borrow_mut().clear();
    }
}

/// Upgrades `device` if it is still alive.
pub(crate) fn live(device: &Weak<DeviceInner>) -> Result<Rc<DeviceInner>> {
    device
        .upgrade()
        .filter(|d| d.is_alive())
        .ok_or(ConnectionError::DeviceGone)
}
