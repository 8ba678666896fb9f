//! Measurement probes.

use crate::error::Result;
use crate::solver::Stamper;
use crate::units::Unit;

use super::linear::{CURRENT, VOLTAGE};
use super::{DeviceClass, DeviceKind, DeviceState, OutputSpec, Pins, Solution};

static VOLTMETER_OUTPUTS: [OutputSpec; 1] = [OutputSpec::new("voltage", Unit::Volt, VOLTAGE)];

/// Ideal voltmeter: infinite input resistance, stamps nothing.
pub static VOLTMETER: DeviceClass = DeviceClass {
    id: "Voltmeter",
    terminals: &["p", "n"],
    branches: 0,
    linear: true,
    props: &[],
    outputs: &VOLTMETER_OUTPUTS,
    kind: DeviceKind::Voltmeter,
};

static AMMETER_OUTPUTS: [OutputSpec; 1] = [OutputSpec::new("current", Unit::Ampere, CURRENT)];

/// Ideal ammeter: a zero-volt source whose branch current is the reading.
pub static AMMETER: DeviceClass = DeviceClass {
    id: "Ammeter",
    terminals: &["p", "n"],
    branches: 1,
    linear: true,
    props: &[],
    outputs: &AMMETER_OUTPUTS,
    kind: DeviceKind::Ammeter,
};

pub(super) fn load_ammeter(pins: &Pins, st: &mut Stamper) -> Result<()> {
    st.stamp_voltage_source(pins.nodes[0], pins.nodes[1], pins.branches[0], 0.0)
}

pub(super) fn save_voltmeter(state: &mut DeviceState, pins: &Pins, x: &Solution) {
    state[VOLTAGE] = x.across(pins.nodes[0], pins.nodes[1]);
}

pub(super) fn save_ammeter(state: &mut DeviceState, pins: &Pins, x: &Solution) {
    state[CURRENT] = x.current(pins.branches[0]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{BranchId, NodeId};
    use crate::components::test_support::{device, load};

    #[test]
    fn test_voltmeter_is_invisible() {
        let mut m = device(&VOLTMETER, &[], &[NodeId(0), NodeId(1)], &[]);
        let sys = load(&mut m, &[3.0, 1.0]);
        assert!(sys.b.iter().all(|&b| b == 0.0));
        m.save_dc(&Solution(&[3.0, 1.0]));
        assert_eq!(m.outputs().next().map(|(_, v)| v), Some(2.0));
    }

    #[test]
    fn test_ammeter_reads_branch() {
        let mut m = device(&AMMETER, &[], &[NodeId(0), NodeId(1)], &[BranchId(2)]);
        let sys = load(&mut m, &[0.0; 3]);
        assert_eq!(sys.a.get(2, 0), 1.0);
        assert_eq!(sys.a.get(2, 1), -1.0);
        m.save_dc(&Solution(&[1.0, 1.0, 0.003]));
        assert_eq!(m.outputs().next().map(|(_, v)| v), Some(0.003));
    }
}
