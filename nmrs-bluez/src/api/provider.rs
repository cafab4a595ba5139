//! Connection profile registry interface.
//!
//! Devices never own profiles. They enumerate the registry, listen to its
//! notifications and keep the UUIDs of profiles that match them. The only
//! write a device ever performs is adding the NAP profile it provisions.

use log::debug;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::Result;
use crate::api::models::{ConnectionError, Profile};

/// A change in the registry, delivered synchronously to every listener.
#[derive(Debug, Clone, Copy)]
pub enum ProviderEvent<'a> {
    Added(&'a Profile),
    Removed(&'a Profile),
    Updated(&'a Profile),
    /// The registry finished loading its initial set of profiles.
    Loaded,
}

/// Receives [`ProviderEvent`]s.
pub trait ProviderListener {
    fn on_provider_event(&self, event: &ProviderEvent<'_>);
}

/// Handle returned by [`ConnectionProvider::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// External store of network connection profiles.
///
/// Implementations must not hold internal borrows while calling listeners:
/// a listener may call back into the provider (including
/// [`add_connection`](Self::add_connection)) from inside a notification.
pub trait ConnectionProvider {
    /// Returns every profile currently known.
    fn connections(&self) -> Vec<Rc<Profile>>;

    /// Returns whether the initial set of profiles has been loaded.
    fn has_connections_loaded(&self) -> bool;

    /// Adds a profile and returns the stored copy.
    ///
    /// Listeners receive [`ProviderEvent::Added`] before this returns.
    fn add_connection(&self, profile: Profile) -> Result<Rc<Profile>>;

    /// Registers a listener. Dead listeners are dropped silently.
    fn subscribe(&self, listener: Weak<dyn ProviderListener>) -> SubscriptionId;

    /// Removes a listener registered with [`subscribe`](Self::subscribe).
    fn unsubscribe(&self, id: SubscriptionId);
}

#[derive(Default)]
struct MemoryInner {
    profiles: Vec<Rc<Profile>>,
    loaded: bool,
    listeners: Vec<(SubscriptionId, Weak<dyn ProviderListener>)>,
    next_id: u64,
    rejection: Option<String>,
    add_calls: usize,
}

/// In-memory [`ConnectionProvider`].
///
/// Useful for embedding the device core without a settings service, and for
/// tests. Profiles are kept in insertion order.
///
/// # Example
///
/// ```rust
/// use nmrs_bluez::{ConnectionProvider, MemoryProvider};
///
/// let provider = MemoryProvider::unloaded();
/// assert!(!provider.has_connections_loaded());
/// provider.mark_loaded();
/// assert!(provider.has_connections_loaded());
/// ```
#[derive(Default)]
pub struct MemoryProvider {
    inner: RefCell<MemoryInner>,
}

impl MemoryProvider {
    /// Creates an empty provider that reports itself as loaded.
    pub fn new() -> Self {
        let provider = Self::default();
        provider.inner.borrow_mut().loaded = true;
        provider
    }

    /// Creates an empty provider that still has to be loaded.
    pub fn unloaded() -> Self {
        Self::default()
    }

    /// Marks the provider as loaded and notifies listeners.
    ///
    /// Does nothing if it already was.
    pub fn mark_loaded(&self) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.loaded {
                return;
            }
            inner.loaded = true;
        }
        self.dispatch(&ProviderEvent::Loaded);
    }

    /// Stores a profile coming from outside the device core and notifies
    /// listeners with [`ProviderEvent::Added`].
    ///
    /// A stored profile with the same UUID is replaced.
    pub fn insert(&self, profile: Profile) -> Rc<Profile> {
        let stored = self.store(profile);
        self.dispatch(&ProviderEvent::Added(&stored));
        stored
    }

    /// Replaces the profile with the same UUID and notifies listeners.
    ///
    /// Returns `None` if no such profile exists.
    pub fn update(&self, profile: Profile) -> Option<Rc<Profile>> {
        let stored = {
            let mut inner = self.inner.borrow_mut();
            let slot = inner.profiles.iter_mut().find(|p| p.uuid == profile.uuid)?;
            *slot = Rc::new(profile);
            slot.clone()
        };
        self.dispatch(&ProviderEvent::Updated(&stored));
        Some(stored)
    }

    /// Removes a profile by UUID and notifies listeners.
    pub fn remove(&self, uuid: &str) -> Option<Rc<Profile>> {
        let removed = {
            let mut inner = self.inner.borrow_mut();
            let pos = inner.profiles.iter().position(|p| p.uuid == uuid)?;
            inner.profiles.remove(pos)
        };
        self.dispatch(&ProviderEvent::Removed(&removed));
        Some(removed)
    }

    /// Makes every following [`add_connection`](ConnectionProvider::add_connection)
    /// fail with `reason`, or accept again with `None`.
    pub fn reject_additions(&self, reason: Option<String>) {
        self.inner.borrow_mut().rejection = reason;
    }

    /// Returns a profile by UUID.
    pub fn get(&self, uuid: &str) -> Option<Rc<Profile>> {
        self.inner
            .borrow()
            .profiles
            .iter()
            .find(|p| p.uuid == uuid)
            .cloned()
    }

    /// Number of stored profiles.
    pub fn len(&self) -> usize {
        self.inner.borrow().profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `add_connection` calls, accepted or rejected.
    pub fn add_calls(&self) -> usize {
        self.inner.borrow().add_calls
    }

    /// Number of live subscriptions.
    pub fn listener_count(&self) -> usize {
        self.inner
            .borrow()
            .listeners
            .iter()
            .filter(|(_, l)| l.strong_count() > 0)
            .count()
    }

    fn store(&self, profile: Profile) -> Rc<Profile> {
        let stored = Rc::new(profile);
        let mut inner = self.inner.borrow_mut();
        inner.profiles.retain(|p| p.uuid != stored.uuid);
        inner.profiles.push(stored.clone());
        stored
    }

    fn dispatch(&self, event: &ProviderEvent<'_>) {
        let listeners: Vec<Rc<dyn ProviderListener>> = {
            let mut inner = self.inner.borrow_mut();
            inner.listeners.retain(|(_, l)| l.strong_count() > 0);
            inner
                .listeners
                .iter()
                .filter_map(|(_, l)| l.upgrade())
                .collect()
        };

        for listener in listeners {
            listener.on_provider_event(event);
        }
    }
}

impl ConnectionProvider for MemoryProvider {
    fn connections(&self) -> Vec<Rc<Profile>> {
        self.inner.borrow().profiles.clone()
    }

    fn has_connections_loaded(&self) -> bool {
        self.inner.borrow().loaded
    }

    fn add_connection(&self, profile: Profile) -> Result<Rc<Profile>> {
        {
            let mut inner = self.inner.borrow_mut();
            inner.add_calls += 1;
            if let Some(reason) = &inner.rejection {
                return Err(ConnectionError::ProviderRejected(reason.clone()));
            }
        }

        debug!("Adding connection '{}' ({})", profile.id, profile.uuid);
        Ok(self.insert(profile))
    }

    fn subscribe(&self, listener: Weak<dyn ProviderListener>) -> SubscriptionId {
        let mut inner = self.inner.borrow_mut();
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner.listeners.push((id, listener));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.borrow_mut().listeners.retain(|(i, _)| *i != id);
    }
}
