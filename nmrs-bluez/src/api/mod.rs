//! Public API module.
//!
//! This module contains the user-facing API of the `nmrs-bluez` crate: the
//! device handle, the manager, the collaborator traits and the data models.

pub mod builders;
pub mod device;
pub mod manager;
pub mod models;
pub mod provider;
pub mod transport;
