//! Operational Amplifier model.
//!
//! Finite-gain op-amp whose output saturates smoothly at the rails:
//!   Vout = Vmid + H * tanh(A * Vd / H)
//! with Vd = V+ - V-, H = (Vpos - Vneg) / 2 and Vmid = (Vpos + Vneg) / 2.
//! The output is an ideal voltage source to ground on the device's branch;
//! the inputs see only `rin`.
//!
//! Outside a narrow window around Vd = 0 the slope vanishes, so Newton
//! steps taken from a saturated iterate overshoot from rail to rail. The
//! differential voltage used for linearization may therefore move by at
//! most `2 * H / A` per iteration.

use crate::circuit::{Cmp, Properties, PropSpec, Range};
use crate::error::{Result, VoltaicError};
use crate::solver::Stamper;
use crate::units::Unit;

use super::{DeviceClass, DeviceKind, DeviceState, OutputSpec, Pins, Solution};

// Outputs
const VOUT: usize = 0;
const IOUT: usize = 1;
const VD: usize = 2;
const POWER: usize = 3;

const GAIN: usize = 4;
const HALF_SWING: usize = 5;
const MID: usize = 6;
const GIN: usize = 7;
const VD_LAST: usize = 8;

const POSITIVE: &[(Cmp, f64)] = &[(Cmp::Gt, 0.0)];

static OPAMP_PROPS: [PropSpec; 4] = [
    PropSpec::number("gain", Some(2e5), Range::real(POSITIVE), "Open-loop gain"),
    PropSpec::number("vpos", Some(15.0), Range::ANY, "Positive rail (V)"),
    PropSpec::number("vneg", Some(-15.0), Range::ANY, "Negative rail (V)"),
    PropSpec::number("rin", Some(2e6), Range::real(POSITIVE), "Input resistance (Ω)"),
];

static OPAMP_OUTPUTS: [OutputSpec; 4] = [
    OutputSpec::new("vout", Unit::Volt, VOUT),
    OutputSpec::new("iout", Unit::Ampere, IOUT),
    OutputSpec::new("vd", Unit::Volt, VD),
    OutputSpec::new("power", Unit::Watt, POWER),
];

pub static OPAMP: DeviceClass = DeviceClass {
    id: "OpAmp",
    terminals: &["in+", "in-", "out"],
    branches: 1,
    linear: false,
    props: &OPAMP_PROPS,
    outputs: &OPAMP_OUTPUTS,
    kind: DeviceKind::OpAmp,
};

fn check_rails(vpos: f64, vneg: f64) -> Result<()> {
    if vpos <= vneg {
        return Err(VoltaicError::InvalidProperty {
            device: String::new(),
            property: "vpos".to_string(),
            expected: format!("real > vneg ({vneg})"),
            value: vpos.to_string(),
        });
    }
    Ok(())
}

/// Rail check at construction. Rails bound to parameters have no value
/// yet and are checked on every reset instead.
pub(super) fn validate(props: &Properties, bindings: &[(usize, String)]) -> Result<()> {
    let bound = |name: &str| bindings.iter().any(|(slot, _)| props.schema()[*slot].name == name);
    if bound("vpos") || bound("vneg") {
        return Ok(());
    }
    check_rails(props.number("vpos")?, props.number("vneg")?)
}

pub(super) fn reset(props: &Properties, state: &mut DeviceState) -> Result<()> {
    let vpos = props.number("vpos")?;
    let vneg = props.number("vneg")?;
    check_rails(vpos, vneg)?;
    state[GAIN] = props.number("gain")?;
    state[HALF_SWING] = 0.5 * (vpos - vneg);
    state[MID] = 0.5 * (vpos + vneg);
    state[GIN] = 1.0 / props.number("rin")?;
    Ok(())
}

/// Output voltage and dVout/dVd at a differential input.
fn transfer(state: &DeviceState, vd: f64) -> (f64, f64) {
    let half = state[HALF_SWING];
    let t = (state[GAIN] * vd / half).tanh();
    (state[MID] + half * t, state[GAIN] * (1.0 - t * t))
}

/// Clamp a new differential voltage to one step of the active window.
fn limit_differential(state: &DeviceState, vd: f64) -> f64 {
    let window = 2.0 * state[HALF_SWING] / state[GAIN];
    let last = state[VD_LAST];
    if (vd - last).abs() > window {
        last + window.copysign(vd - last)
    } else {
        vd
    }
}

pub(super) fn load_dc(state: &mut DeviceState, pins: &Pins, x: &Solution, st: &mut Stamper) -> Result<()> {
    let (inp, inn, out) = (pins.nodes[0], pins.nodes[1], pins.nodes[2]);
    let branch = pins.branches[0];

    st.stamp_conductance(inp, inn, state[GIN])?;

    // Vout - g * Vd = f(Vd0) - g * Vd0
    let vd = limit_differential(state, x.across(inp, inn));
    state[VD_LAST] = vd;
    let (f, g) = transfer(state, vd);
    st.stamp_a(out, branch, 1.0)?;
    st.stamp_a(branch, out, 1.0)?;
    st.stamp_a(branch, inp, -g)?;
    st.stamp_a(branch, inn, g)?;
    st.stamp_b(branch, f - g * vd)
}

pub(super) fn save_dc(state: &mut DeviceState, pins: &Pins, x: &Solution) {
    let (inp, inn, out) = (pins.nodes[0], pins.nodes[1], pins.nodes[2]);
    let vout = x.voltage(out);
    let iout = x.current(pins.branches[0]);
    state[VOUT] = vout;
    state[IOUT] = iout;
    state[VD] = x.across(inp, inn);
    state[POWER] = vout * iout;
}
