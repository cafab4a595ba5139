//! Service UUID to capability resolution.

use crate::api::models::BtCapabilities;
use crate::types::bluez_model::CapabilityModel;
use crate::util::utils::service_class;

/// Converts a device's service UUID list into a capability set.
///
/// Each UUID contributes the capability its service class maps to under
/// `model`; unknown or malformed UUIDs contribute nothing. The result does
/// not depend on the order of `uuids`.
pub(crate) fn resolve_capabilities<S: AsRef<str>>(
    model: &dyn CapabilityModel,
    uuids: &[S],
) -> BtCapabilities {
    uuids
        .iter()
        .filter_map(|uuid| service_class(uuid.as_ref()))
        .fold(BtCapabilities::empty(), |caps, class| {
            caps | model.capability_for_service_class(class)
        })
}
