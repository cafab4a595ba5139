//! Type definitions and constants.
//!
//! This module contains BlueZ constants and the per-generation capability
//! models.

pub(crate) mod bluez_model;
pub(crate) mod constants;
