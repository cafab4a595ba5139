//! Usability decision for a Bluetooth device.
//!
//! A device is usable as a network interface once discovery finished, it
//! reported a name, an address and at least one capability, the bus is up,
//! and (for adapter-aware models) its adapter is powered. On top of that it
//! needs a connection profile: either a compatible one from the registry, or
//! one provisioned automatically for NAP devices.

use crate::api::models::BtCapabilities;

/// Everything the gate looks at, copied out of the device state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GateInputs {
    pub(crate) initialized: bool,
    pub(crate) capabilities: BtCapabilities,
    pub(crate) has_name: bool,
    pub(crate) bus_present: bool,
    pub(crate) has_address: bool,
    pub(crate) adapter_ready: bool,
    pub(crate) candidates: usize,
}

impl GateInputs {
    fn base_ready(&self) -> bool {
        self.initialized
            && !self.capabilities.is_empty()
            && self.has_name
            && self.bus_present
            && self.has_address
            && self.adapter_ready
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GateDecision {
    /// The inputs alone decide usability.
    Decided(bool),
    /// Usable only if a NAP profile is (or can be) provisioned.
    Provision,
}

pub(crate) fn evaluate(inputs: &GateInputs) -> GateDecision {
    if !inputs.base_ready() {
        return GateDecision::Decided(false);
    }
    if inputs.candidates > 0 {
        return GateDecision::Decided(true);
    }
    // DUN-only devices need a profile created by the user.
    if !inputs.capabilities.contains(BtCapabilities::NAP) {
        return GateDecision::Decided(false);
    }
    GateDecision::Provision
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready() -> GateInputs {
        GateInputs {
            initialized: true,
            capabilities: BtCapabilities::NAP,
            has_name: true,
            bus_present: true,
            has_address: true,
            adapter_ready: true,
            candidates: 0,
        }
    }

    #[test]
    fn every_base_condition_blocks() {
        let blockers: [fn(&mut GateInputs); 6] = [
            |i| i.initialized = false,
            |i| i.capabilities = BtCapabilities::empty(),
            |i| i.has_name = false,
            |i| i.bus_present = false,
            |i| i.has_address = false,
            |i| i.adapter_ready = false,
        ];

        for block in blockers {
            let mut inputs = ready();
            inputs.candidates = 3;
            block(&mut inputs);
            assert_eq!(evaluate(&inputs), GateDecision::Decided(false));
        }
    }

    #[test]
    fn candidate_makes_usable() {
        let mut inputs = ready();
        inputs.candidates = 1;
        assert_eq!(evaluate(&inputs), GateDecision::Decided(true));

        inputs.capabilities = BtCapabilities::DUN;
        assert_eq!(evaluate(&inputs), GateDecision::Decided(true));
    }

    #[test]
    fn dun_only_without_profile_is_unusable() {
        let mut inputs = ready();
        inputs.capabilities = BtCapabilities::DUN;
        assert_eq!(evaluate(&inputs), GateDecision::Decided(false));
    }

    #[test]
    fn nap_without_profile_asks_for_provisioning() {
        assert_eq!(evaluate(&ready()), GateDecision::Provision);

        let mut inputs = ready();
        inputs.capabilities = BtCapabilities::all();
        assert_eq!(evaluate(&inputs), GateDecision::Provision);
    }

    #[test]
    fn same_inputs_same_decision() {
        let inputs = ready();
        assert_eq!(evaluate(&inputs), evaluate(&inputs));
    }
}
