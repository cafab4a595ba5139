//! One-shot NAP profile provisioning.

use log::{debug, info, warn};
use std::cell::Cell;

use crate::api::builders::build_nap_profile;
use crate::api::models::BtCapabilities;
use crate::core::device::DeviceInner;

/// Raises a flag for as long as it lives.
struct EchoGuard<'a>(&'a Cell<bool>);

impl<'a> EchoGuard<'a> {
    fn new(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for EchoGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl DeviceInner {
    /// Creates the PAN profile for this device if it qualifies.
    ///
    /// Runs at most once per device: the attempt is recorded before the
    /// profile is submitted, and a rejection is not retried. While the
    /// registry is still loading nothing is recorded, so the attempt can
    /// happen once it reports `Loaded`.
    pub(crate) fn pan_connection_check_create(&self) {
        let (path, name, bdaddr) = {
            let st = self.state.borrow();
            if st.auto_provision_attempted
                || st.pan_connection.is_some()
                || !st.candidates.is_empty()
                || !st.capabilities.contains(BtCapabilities::NAP)
            {
                return;
            }
            let Some(name) = st.name.clone() else {
                return;
            };
            (st.path.clone(), name, st.bin_address)
        };

        if !self.provider.has_connections_loaded() {
            debug!("[{path}] connections not loaded yet, deferring NAP profile");
            return;
        }

        self.state.borrow_mut().auto_provision_attempted = true;

        let profile = build_nap_profile(&name, &bdaddr);
        let id = profile.id.clone();

        let added = {
            let _echo = EchoGuard::new(&self.suppress_added);
            self.provider.add_connection(profile)
        };

        match added {
            Ok(profile) => {
                info!(
                    "[{path}] added new Bluetooth connection for NAP device: '{}' ({})",
                    profile.id, profile.uuid
                );
                let mut st = self.state.borrow_mut();
                st.track(&profile.uuid);
                st.pan_connection = Some(profile.uuid.clone());
            }
            Err(e) => {
                warn!("[{path}] couldn't add new Bluetooth connection '{id}': {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_guard_scopes_flag() {
        let flag = Cell::new(false);
        {
            let _guard = EchoGuard::new(&flag);
            assert!(flag.get());
        }
        assert!(!flag.get());
    }
}
