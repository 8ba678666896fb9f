//! Diode model.
//!
//! A single PN junction between anode and cathode. Each iteration the
//! junction voltage is limited against the previous iterate, then the
//! Shockley law is linearized around it:
//!   I ≈ Id + Gd * (V - Vd)
//! which stamps as a conductance `Gd + gmin` in parallel with a current
//! source `Id - Gd * Vd` flowing from anode to cathode.

use crate::circuit::{Cmp, Environment, Properties, PropSpec, Range};
use crate::error::Result;
use crate::solver::Stamper;
use crate::units::Unit;

use super::junction::{Junction, JUNCTION_SLOTS, SILICON_EG, SILICON_XTI};
use super::linear::{save_two_terminal, CURRENT, POWER, VOLTAGE};
use super::{DeviceClass, DeviceKind, DeviceState, OutputSpec, Pins, Solution};

const JUNCTION: usize = 3;
// Limited junction voltage of the previous iteration
const V_LAST: usize = JUNCTION + JUNCTION_SLOTS;
const CONDUCTANCE: usize = V_LAST + 1;

const POSITIVE: &[(Cmp, f64)] = &[(Cmp::Gt, 0.0)];

static JUNCTION_PROPS: [PropSpec; 4] = [
    PropSpec::number("is", Some(1e-14), Range::real(POSITIVE), "Saturation current (A)"),
    PropSpec::number("n", Some(1.0), Range::real(POSITIVE), "Emission coefficient"),
    PropSpec::number("eg", Some(SILICON_EG), Range::real(POSITIVE), "Energy gap (eV)"),
    PropSpec::number("xti", Some(SILICON_XTI), Range::ANY, "Saturation current temperature exponent"),
];

static DIODE_OUTPUTS: [OutputSpec; 4] = [
    OutputSpec::new("voltage", Unit::Volt, VOLTAGE),
    OutputSpec::new("current", Unit::Ampere, CURRENT),
    OutputSpec::new("power", Unit::Watt, POWER),
    OutputSpec::new("conductance", Unit::Siemens, CONDUCTANCE),
];

pub static DIODE: DeviceClass = DeviceClass {
    id: "Diode",
    terminals: &["anode", "cathode"],
    branches: 0,
    linear: false,
    props: &JUNCTION_PROPS,
    outputs: &DIODE_OUTPUTS,
    kind: DeviceKind::Diode,
};

/// Build a temperature-scaled junction from the shared junction properties.
pub(super) fn junction_from(props: &Properties, env: &Environment) -> Result<Junction> {
    Ok(Junction::new(
        props.number("is")?,
        props.number("n")?,
        props.number("eg")?,
        props.number("xti")?,
        env,
    ))
}

pub(super) fn reset(props: &Properties, env: &Environment, state: &mut DeviceState) -> Result<()> {
    junction_from(props, env)?.store(state, JUNCTION);
    Ok(())
}

pub(super) fn load_dc(state: &mut DeviceState, pins: &Pins, x: &Solution, st: &mut Stamper) -> Result<()> {
    let (anode, cathode) = (pins.nodes[0], pins.nodes[1]);
    let junction = Junction::load(state, JUNCTION);

    let v = junction.limit(x.across(anode, cathode), state[V_LAST]);
    state[V_LAST] = v;

    let (i, g) = junction.evaluate(v);
    st.stamp_conductance(anode, cathode, g + st.gmin())?;
    st.stamp_current_source(anode, cathode, i - g * v)
}

pub(super) fn save_dc(state: &mut DeviceState, pins: &Pins, x: &Solution) {
    let junction = Junction::load(state, JUNCTION);
    let v = x.across(pins.nodes[0], pins.nodes[1]);
    let (i, g) = junction.evaluate(v);
    save_two_terminal(state, v, i);
    state[CONDUCTANCE] = g;
}
