//! Connection profile builders.
//!
//! The device core provisions NAP profiles on its own through
//! [`build_nap_profile`]. The same function, together with
//! [`build_bluetooth_connection`], is exposed for callers that want to push
//! a profile to NetworkManager themselves.
//!
//! # Example
//!
//! ```rust
//! use nmrs_bluez::builders::{build_bluetooth_connection, build_nap_profile};
//!
//! let profile = build_nap_profile("Phone", &[0x00, 0x1A, 0x7D, 0xDA, 0x71, 0x13]);
//! assert_eq!(profile.id, "Phone Network");
//!
//! let settings = build_bluetooth_connection(&profile);
//! assert!(settings.contains_key("bluetooth"));
//! ```

pub mod bluetooth;

pub use bluetooth::{build_bluetooth_connection, build_nap_profile};
