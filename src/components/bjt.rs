//! BJT (Bipolar Junction Transistor) model.
//!
//! Ebers-Moll transport model for NPN and PNP transistors. Terminal
//! voltages are multiplied by the polarity (+1 NPN, -1 PNP) so the junction
//! law is always evaluated in NPN orientation:
//!   If = Is * (exp(Vbe/Vt) - 1)      forward transport current
//!   Ir = Is * (exp(Vbc/Vt) - 1)      reverse transport current
//!   Ic = If - Ir - Ir/BR
//!   Ib = If/BF + Ir/BR
//!
//! The linearized model is two base diodes (If/BF and Ir/BR) plus a
//! collector-emitter transport source controlled by both junctions.

use crate::circuit::{Cmp, Environment, Properties, PropSpec, Range};
use crate::error::Result;
use crate::solver::Stamper;
use crate::units::Unit;

use super::diode::junction_from;
use super::junction::{Junction, JUNCTION_SLOTS, SILICON_EG, SILICON_XTI};
use super::{DeviceClass, DeviceKind, DeviceState, OutputSpec, Pins, Solution};

// Outputs, in terminal sign convention
const IC: usize = 0;
const IB: usize = 1;
const IE: usize = 2;
const VBE: usize = 3;
const VCE: usize = 4;
const POWER: usize = 5;

// Cached constants
const JUNCTION: usize = 6;
const POLARITY: usize = JUNCTION + JUNCTION_SLOTS;
const BF: usize = POLARITY + 1;
const BR: usize = POLARITY + 2;

// Limited junction voltages of the previous iteration
const VBE_LAST: usize = POLARITY + 3;
const VBC_LAST: usize = POLARITY + 4;

const POSITIVE: &[(Cmp, f64)] = &[(Cmp::Gt, 0.0)];

static BJT_PROPS: [PropSpec; 7] = [
    PropSpec::text("type", Some("npn"), &["npn", "pnp"], "Polarity"),
    PropSpec::number("is", Some(1e-14), Range::real(POSITIVE), "Saturation current (A)"),
    PropSpec::number("bf", Some(100.0), Range::real(POSITIVE), "Forward current gain"),
    PropSpec::number("br", Some(1.0), Range::real(POSITIVE), "Reverse current gain"),
    PropSpec::number("n", Some(1.0), Range::real(POSITIVE), "Emission coefficient"),
    PropSpec::number("eg", Some(SILICON_EG), Range::real(POSITIVE), "Energy gap (eV)"),
    PropSpec::number("xti", Some(SILICON_XTI), Range::ANY, "Saturation current temperature exponent"),
];

static BJT_OUTPUTS: [OutputSpec; 6] = [
    OutputSpec::new("ic", Unit::Ampere, IC),
    OutputSpec::new("ib", Unit::Ampere, IB),
    OutputSpec::new("ie", Unit::Ampere, IE),
    OutputSpec::new("vbe", Unit::Volt, VBE),
    OutputSpec::new("vce", Unit::Volt, VCE),
    OutputSpec::new("power", Unit::Watt, POWER),
];

pub static BJT: DeviceClass = DeviceClass {
    id: "BJT",
    terminals: &["c", "b", "e"],
    branches: 0,
    linear: false,
    props: &BJT_PROPS,
    outputs: &BJT_OUTPUTS,
    kind: DeviceKind::Bjt,
};

/// +1 for the first choice of a polarity property, -1 for the second.
pub(super) fn polarity(props: &Properties, positive: &str) -> Result<f64> {
    Ok(if props.text("type")? == positive { 1.0 } else { -1.0 })
}

pub(super) fn reset(props: &Properties, env: &Environment, state: &mut DeviceState) -> Result<()> {
    junction_from(props, env)?.store(state, JUNCTION);
    state[POLARITY] = polarity(props, "npn")?;
    state[BF] = props.number("bf")?;
    state[BR] = props.number("br")?;
    Ok(())
}

pub(super) fn load_dc(state: &mut DeviceState, pins: &Pins, x: &Solution, st: &mut Stamper) -> Result<()> {
    let (c, b, e) = (pins.nodes[0], pins.nodes[1], pins.nodes[2]);
    let p = state[POLARITY];
    let (bf, br) = (state[BF], state[BR]);
    let junction = Junction::load(state, JUNCTION);

    let vbe = junction.limit(p * x.across(b, e), state[VBE_LAST]);
    let vbc = junction.limit(p * x.across(b, c), state[VBC_LAST]);
    state[VBE_LAST] = vbe;
    state[VBC_LAST] = vbc;

    let (i_f, gf) = junction.evaluate(vbe);
    let (i_r, gr) = junction.evaluate(vbc);
    let gpi = gf / bf;
    let gmu = gr / br;

    // Base-emitter and base-collector diodes
    st.stamp_conductance(b, e, gpi + st.gmin())?;
    st.stamp_current_source(b, e, p * (i_f / bf - gpi * vbe))?;
    st.stamp_conductance(b, c, gmu + st.gmin())?;
    st.stamp_current_source(b, c, p * (i_r / br - gmu * vbc))?;

    // Transport current If - Ir from collector to emitter
    st.stamp_transconductance(c, e, b, e, gf)?;
    st.stamp_transconductance(c, e, b, c, -gr)?;
    st.stamp_current_source(c, e, p * (i_f - i_r - gf * vbe + gr * vbc))
}

pub(super) fn save_dc(state: &mut DeviceState, pins: &Pins, x: &Solution) {
    let (c, b, e) = (pins.nodes[0], pins.nodes[1], pins.nodes[2]);
    let p = state[POLARITY];
    let (bf, br) = (state[BF], state[BR]);
    let junction = Junction::load(state, JUNCTION);

    let i_f = junction.current(p * x.across(b, e));
    let i_r = junction.current(p * x.across(b, c));
    let ic = p * (i_f - i_r - i_r / br);
    let ib = p * (i_f / bf + i_r / br);
    let vbe = x.across(b, e);
    let vce = x.across(c, e);

    state[IC] = ic;
    state[IB] = ib;
    state[IE] = -(ic + ib);
    state[VBE] = vbe;
    state[VCE] = vce;
    state[POWER] = vce * ic + vbe * ib;
}
