//! Linear passive components: Resistor, Capacitor, Inductor.
//!
//! At DC a capacitor is an open circuit and an inductor a short. The
//! inductor keeps a branch unknown so its current can be reported.

use crate::circuit::{Cmp, Properties, PropSpec, Range};
use crate::error::Result;
use crate::solver::Stamper;
use crate::units::Unit;

use super::{DeviceClass, DeviceKind, DeviceState, OutputSpec, Pins, Solution};

// Shared output slots of two-terminal devices
pub(super) const VOLTAGE: usize = 0;
pub(super) const CURRENT: usize = 1;
pub(super) const POWER: usize = 2;

// Resistor slots
const CONDUCTANCE: usize = 3;

// Capacitor slots
const CAPACITANCE: usize = 3;
const CHARGE: usize = 4;

const POSITIVE: &[(Cmp, f64)] = &[(Cmp::Gt, 0.0)];

pub(super) const TWO_TERMINAL_OUTPUTS: [OutputSpec; 3] = [
    OutputSpec::new("voltage", Unit::Volt, VOLTAGE),
    OutputSpec::new("current", Unit::Ampere, CURRENT),
    OutputSpec::new("power", Unit::Watt, POWER),
];

static RESISTOR_PROPS: [PropSpec; 1] = [PropSpec::number(
    "resistance",
    None,
    Range::real(POSITIVE),
    "Resistance (Ω)",
)];

pub static RESISTOR: DeviceClass = DeviceClass {
    id: "Resistor",
    terminals: &["p", "n"],
    branches: 0,
    linear: true,
    props: &RESISTOR_PROPS,
    outputs: &TWO_TERMINAL_OUTPUTS,
    kind: DeviceKind::Resistor,
};

static CAPACITOR_PROPS: [PropSpec; 1] = [PropSpec::number(
    "capacitance",
    Some(1e-6),
    Range::real(POSITIVE),
    "Capacitance (F)",
)];

static CAPACITOR_OUTPUTS: [OutputSpec; 3] = [
    OutputSpec::new("voltage", Unit::Volt, VOLTAGE),
    OutputSpec::new("current", Unit::Ampere, CURRENT),
    OutputSpec::new("charge", Unit::Coulomb, CHARGE),
];

pub static CAPACITOR: DeviceClass = DeviceClass {
    id: "Capacitor",
    terminals: &["p", "n"],
    branches: 0,
    linear: true,
    props: &CAPACITOR_PROPS,
    outputs: &CAPACITOR_OUTPUTS,
    kind: DeviceKind::Capacitor,
};

static INDUCTOR_PROPS: [PropSpec; 1] = [PropSpec::number(
    "inductance",
    Some(1e-3),
    Range::real(POSITIVE),
    "Inductance (H)",
)];

pub static INDUCTOR: DeviceClass = DeviceClass {
    id: "Inductor",
    terminals: &["p", "n"],
    branches: 1,
    linear: true,
    props: &INDUCTOR_PROPS,
    outputs: &TWO_TERMINAL_OUTPUTS,
    kind: DeviceKind::Inductor,
};

/// Store voltage, current and power using the passive sign convention.
pub(super) fn save_two_terminal(state: &mut DeviceState, v: f64, i: f64) {
    state[VOLTAGE] = v;
    state[CURRENT] = i;
    state[POWER] = v * i;
}

pub(super) fn reset_resistor(props: &Properties, state: &mut DeviceState) -> Result<()> {
    state[CONDUCTANCE] = 1.0 / props.number("resistance")?;
    Ok(())
}

pub(super) fn load_resistor(state: &DeviceState, pins: &Pins, st: &mut Stamper) -> Result<()> {
    st.stamp_conductance(pins.nodes[0], pins.nodes[1], state[CONDUCTANCE])
}

pub(super) fn save_resistor(state: &mut DeviceState, pins: &Pins, x: &Solution) {
    let v = x.across(pins.nodes[0], pins.nodes[1]);
    let i = v * state[CONDUCTANCE];
    save_two_terminal(state, v, i);
}

pub(super) fn reset_capacitor(props: &Properties, state: &mut DeviceState) -> Result<()> {
    state[CAPACITANCE] = props.number("capacitance")?;
    Ok(())
}

pub(super) fn save_capacitor(state: &mut DeviceState, pins: &Pins, x: &Solution) {
    let v = x.across(pins.nodes[0], pins.nodes[1]);
    state[VOLTAGE] = v;
    state[CURRENT] = 0.0;
    state[CHARGE] = state[CAPACITANCE] * v;
}

/// Zero-volt source on the inductor's branch.
pub(super) fn load_inductor(pins: &Pins, st: &mut Stamper) -> Result<()> {
    st.stamp_voltage_source(pins.nodes[0], pins.nodes[1], pins.branches[0], 0.0)
}

pub(super) fn save_inductor(state: &mut DeviceState, pins: &Pins, x: &Solution) {
    let v = x.across(pins.nodes[0], pins.nodes[1]);
    save_two_terminal(state, v, x.current(pins.branches[0]));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{BranchId, NodeId};
    use crate::components::test_support::{device, load};

    #[test]
    fn test_resistor_stamps_conductance() {
        let mut r = device(&RESISTOR, &[("resistance", 1000.0.into())], &[NodeId(0), NodeId(1)], &[]);
        let sys = load(&mut r, &[0.0, 0.0]);
        assert_eq!(sys.a.get(0, 0), 0.001);
        assert_eq!(sys.a.get(0, 1), -0.001);
        assert_eq!(sys.a.get(1, 0), -0.001);
        assert_eq!(sys.a.get(1, 1), 0.001);
    }

    #[test]
    fn test_capacitor_is_open_at_dc() {
        let mut c = device(&CAPACITOR, &[("capacitance", 1e-6.into())], &[NodeId(0), NodeId::GROUND], &[]);
        let sys = load(&mut c, &[3.0]);
        assert_eq!(sys.a.get(0, 0), 0.0);
        c.save_dc(&Solution(&[3.0]));
        approx::assert_relative_eq!(c.state()[CHARGE], 3e-6);
        assert_eq!(c.state()[CURRENT], 0.0);
    }

    #[test]
    fn test_inductor_is_short_with_branch() {
        let mut l = device(&INDUCTOR, &[], &[NodeId(0), NodeId(1)], &[BranchId(2)]);
        let sys = load(&mut l, &[0.0, 0.0, 0.0]);
        assert_eq!(sys.a.get(2, 0), 1.0);
        assert_eq!(sys.a.get(2, 1), -1.0);
        assert_eq!(sys.b[2], 0.0);
        l.save_dc(&Solution(&[1.0, 1.0, 0.25]));
        assert_eq!(l.state()[CURRENT], 0.25);
        assert_eq!(l.state()[VOLTAGE], 0.0);
    }
}
