//! Real-time monitoring of BlueZ objects.
//!
//! This module follows BlueZ's object tree and feeds device appearances and
//! removals into a [`BluezManager`](crate::BluezManager).

pub(crate) mod bluez;
