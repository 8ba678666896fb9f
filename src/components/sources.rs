//! Independent and controlled sources.
//!
//! Independent sources are scaled by the stamper's source factor, which the
//! Newton driver ramps during source stepping. Controlled sources are linear
//! in the controlling voltage and are never scaled.

use crate::circuit::{Properties, PropSpec, Range};
use crate::error::Result;
use crate::solver::Stamper;

use super::linear::{save_two_terminal, TWO_TERMINAL_OUTPUTS};
use super::{DeviceClass, DeviceKind, DeviceState, Pins, Solution};

// Source value (V, A, V/V or S)
const VALUE: usize = 3;

static VOLTAGE_SOURCE_PROPS: [PropSpec; 1] =
    [PropSpec::number("voltage", None, Range::ANY, "Voltage (V)")];

/// Ideal voltage source. The branch enforces V[p] - V[n] = voltage.
pub static VOLTAGE_SOURCE: DeviceClass = DeviceClass {
    id: "VoltageSource",
    terminals: &["p", "n"],
    branches: 1,
    linear: true,
    props: &VOLTAGE_SOURCE_PROPS,
    outputs: &TWO_TERMINAL_OUTPUTS,
    kind: DeviceKind::VoltageSource,
};

static CURRENT_SOURCE_PROPS: [PropSpec; 1] =
    [PropSpec::number("current", None, Range::ANY, "Current (A)")];

/// Ideal current source. The current flows from p through the source to n.
pub static CURRENT_SOURCE: DeviceClass = DeviceClass {
    id: "CurrentSource",
    terminals: &["p", "n"],
    branches: 0,
    linear: true,
    props: &CURRENT_SOURCE_PROPS,
    outputs: &TWO_TERMINAL_OUTPUTS,
    kind: DeviceKind::CurrentSource,
};

static VCVS_PROPS: [PropSpec; 1] = [PropSpec::number("gain", Some(1.0), Range::ANY, "Voltage gain")];

pub static VCVS: DeviceClass = DeviceClass {
    id: "Vcvs",
    terminals: &["out+", "out-", "ctrl+", "ctrl-"],
    branches: 1,
    linear: true,
    props: &VCVS_PROPS,
    outputs: &TWO_TERMINAL_OUTPUTS,
    kind: DeviceKind::Vcvs,
};

static VCCS_PROPS: [PropSpec; 1] =
    [PropSpec::number("gm", Some(1e-3), Range::ANY, "Transconductance (S)")];

pub static VCCS: DeviceClass = DeviceClass {
    id: "Vccs",
    terminals: &["out+", "out-", "ctrl+", "ctrl-"],
    branches: 0,
    linear: true,
    props: &VCCS_PROPS,
    outputs: &TWO_TERMINAL_OUTPUTS,
    kind: DeviceKind::Vccs,
};

pub(super) fn reset_voltage_source(props: &Properties, state: &mut DeviceState) -> Result<()> {
    state[VALUE] = props.number("voltage")?;
    Ok(())
}

pub(super) fn reset_current_source(props: &Properties, state: &mut DeviceState) -> Result<()> {
    state[VALUE] = props.number("current")?;
    Ok(())
}

pub(super) fn reset_controlled(props: &Properties, state: &mut DeviceState) -> Result<()> {
    let name = props.schema()[0].name;
    state[VALUE] = props.number(name)?;
    Ok(())
}

pub(super) fn load_voltage_source(state: &DeviceState, pins: &Pins, st: &mut Stamper) -> Result<()> {
    let v = state[VALUE] * st.source_factor();
    st.stamp_voltage_source(pins.nodes[0], pins.nodes[1], pins.branches[0], v)
}

pub(super) fn load_current_source(state: &DeviceState, pins: &Pins, st: &mut Stamper) -> Result<()> {
    let i = state[VALUE] * st.source_factor();
    st.stamp_current_source(pins.nodes[0], pins.nodes[1], i)
}

/// V[out+] - V[out-] - gain * (V[ctrl+] - V[ctrl-]) = 0
pub(super) fn load_vcvs(state: &DeviceState, pins: &Pins, st: &mut Stamper) -> Result<()> {
    let branch = pins.branches[0];
    let gain = state[VALUE];
    st.stamp_voltage_source(pins.nodes[0], pins.nodes[1], branch, 0.0)?;
    st.stamp_a(branch, pins.nodes[2], -gain)?;
    st.stamp_a(branch, pins.nodes[3], gain)
}

pub(super) fn load_vccs(state: &DeviceState, pins: &Pins, st: &mut Stamper) -> Result<()> {
    let n = pins.nodes;
    st.stamp_transconductance(n[0], n[1], n[2], n[3], state[VALUE])
}

pub(super) fn save_voltage_source(state: &mut DeviceState, pins: &Pins, x: &Solution) {
    let v = x.across(pins.nodes[0], pins.nodes[1]);
    save_two_terminal(state, v, x.current(pins.branches[0]));
}

pub(super) fn save_current_source(state: &mut DeviceState, pins: &Pins, x: &Solution) {
    let v = x.across(pins.nodes[0], pins.nodes[1]);
    let i = state[VALUE];
    save_two_terminal(state, v, i);
}

pub(super) fn save_vcvs(state: &mut DeviceState, pins: &Pins, x: &Solution) {
    save_voltage_source(state, pins, x);
}

pub(super) fn save_vccs(state: &mut DeviceState, pins: &Pins, x: &Solution) {
    let v = x.across(pins.nodes[0], pins.nodes[1]);
    let i = state[VALUE] * x.across(pins.nodes[2], pins.nodes[3]);
    save_two_terminal(state, v, i);
}
