//! Core device logic.
//!
//! This module contains the device state machine: property merging,
//! capability resolution, the usability gate, registry synchronization,
//! profile provisioning, the session controller and the discovery pipeline.
//! It also holds the D-Bus implementation of the transport traits.

pub(crate) mod bluez_transport;
pub(crate) mod capabilities;
pub(crate) mod device;
pub(crate) mod discovery;
pub(crate) mod gate;
pub(crate) mod provision;
pub(crate) mod registry;
pub(crate) mod session;
pub(crate) mod state;
