//! MOSFET model.
//!
//! Level 1 (Shichman-Hodges) enhancement/depletion MOSFET with β = KP·W/L:
//!   cutoff      Vgst <= 0           Id = 0
//!   saturation  0 < Vgst <= Vds     Id = β/2·Vgst²·(1 + λ·Vds)
//!   linear      Vds < Vgst          Id = β·(Vgst·Vds - Vds²/2)·(1 + λ·Vds)
//!
//! The gate draws no DC current. Bulk-drain and bulk-source junctions are
//! modeled as diodes so a forward-biased body conducts.

use crate::circuit::{Cmp, Environment, Properties, PropSpec, Range};
use crate::error::Result;
use crate::solver::Stamper;
use crate::units::Unit;

use super::bjt::polarity;
use super::jfet::{stamp_junction, Channel, GDS, GM, ID, IG, POWER, VDS, VGS};
use super::junction::{Junction, JUNCTION_SLOTS, SILICON_EG, SILICON_XTI};
use super::{DeviceClass, DeviceKind, DeviceState, OutputSpec, Pins, Solution};

// Bulk terminal current
const IB: usize = 7;

const JUNCTION: usize = 8;
const POLARITY: usize = JUNCTION + JUNCTION_SLOTS;
const VTO: usize = POLARITY + 1;
const BETA: usize = POLARITY + 2;
const LAMBDA: usize = POLARITY + 3;
const VBS_LAST: usize = POLARITY + 4;
const VBD_LAST: usize = POLARITY + 5;

const POSITIVE: &[(Cmp, f64)] = &[(Cmp::Gt, 0.0)];
const NON_NEGATIVE: &[(Cmp, f64)] = &[(Cmp::Ge, 0.0)];

static MOSFET_PROPS: [PropSpec; 7] = [
    PropSpec::text("type", Some("nmos"), &["nmos", "pmos"], "Polarity"),
    PropSpec::number("vto", Some(1.0), Range::ANY, "Threshold voltage (V)"),
    PropSpec::number("kp", Some(2e-5), Range::real(POSITIVE), "Process transconductance (A/V²)"),
    PropSpec::number("w", Some(1e-4), Range::real(POSITIVE), "Channel width (m)"),
    PropSpec::number("l", Some(1e-6), Range::real(POSITIVE), "Channel length (m)"),
    PropSpec::number("lambda", Some(0.0), Range::real(NON_NEGATIVE), "Channel-length modulation (1/V)"),
    PropSpec::number("is", Some(1e-14), Range::real(POSITIVE), "Bulk junction saturation current (A)"),
];

static MOSFET_OUTPUTS: [OutputSpec; 8] = [
    OutputSpec::new("id", Unit::Ampere, ID),
    OutputSpec::new("ig", Unit::Ampere, IG),
    OutputSpec::new("ib", Unit::Ampere, IB),
    OutputSpec::new("vgs", Unit::Volt, VGS),
    OutputSpec::new("vds", Unit::Volt, VDS),
    OutputSpec::new("power", Unit::Watt, POWER),
    OutputSpec::new("gm", Unit::Siemens, GM),
    OutputSpec::new("gds", Unit::Siemens, GDS),
];

pub static MOSFET: DeviceClass = DeviceClass {
    id: "MOSFET",
    terminals: &["d", "g", "s", "b"],
    branches: 0,
    linear: false,
    props: &MOSFET_PROPS,
    outputs: &MOSFET_OUTPUTS,
    kind: DeviceKind::Mosfet,
};

fn level1(vto: f64, beta: f64, lambda: f64) -> impl Fn(f64, f64) -> Channel {
    move |vgs, vds| {
        let vgst = vgs - vto;
        let clm = 1.0 + lambda * vds;
        if vgst <= 0.0 {
            Channel::default()
        } else if vgst <= vds {
            Channel {
                id: 0.5 * beta * vgst * vgst * clm,
                gm: beta * vgst * clm,
                gds: 0.5 * beta * lambda * vgst * vgst,
            }
        } else {
            let core = vgst * vds - 0.5 * vds * vds;
            Channel {
                id: beta * core * clm,
                gm: beta * vds * clm,
                gds: beta * (vgst - vds) * clm + beta * lambda * core,
            }
        }
    }
}

fn law(state: &DeviceState) -> impl Fn(f64, f64) -> Channel {
    level1(state[VTO], state[BETA], state[LAMBDA])
}

pub(super) fn reset(props: &Properties, env: &Environment, state: &mut DeviceState) -> Result<()> {
    let junction = Junction::new(props.number("is")?, 1.0, SILICON_EG, SILICON_XTI, env);
    junction.store(state, JUNCTION);
    state[POLARITY] = polarity(props, "nmos")?;
    state[VTO] = props.number("vto")?;
    state[BETA] = props.number("kp")? * props.number("w")? / props.number("l")?;
    state[LAMBDA] = props.number("lambda")?;
    Ok(())
}

pub(super) fn load_dc(state: &mut DeviceState, pins: &Pins, x: &Solution, st: &mut Stamper) -> Result<()> {
    let (d, g, s, b) = (pins.nodes[0], pins.nodes[1], pins.nodes[2], pins.nodes[3]);
    let p = state[POLARITY];
    let junction = Junction::load(state, JUNCTION);

    let vgs = p * x.across(g, s);
    let vds = p * x.across(d, s);
    Channel::oriented(vgs, vds, law(state)).stamp(p, vgs, vds, pins, st)?;

    stamp_junction(&junction, p, p * x.across(b, s), VBS_LAST, (b, s), state, st)?;
    stamp_junction(&junction, p, p * x.across(b, d), VBD_LAST, (b, d), state, st)
}

pub(super) fn save_dc(state: &mut DeviceState, pins: &Pins, x: &Solution) {
    let (d, g, s, b) = (pins.nodes[0], pins.nodes[1], pins.nodes[2], pins.nodes[3]);
    let p = state[POLARITY];
    let junction = Junction::load(state, JUNCTION);

    let vgs = p * x.across(g, s);
    let vds = p * x.across(d, s);
    let channel = Channel::oriented(vgs, vds, law(state));
    let ibs = junction.current(p * x.across(b, s));
    let ibd = junction.current(p * x.across(b, d));

    channel.save(state, p);
    // Bulk-drain diode current leaves through the drain.
    state[ID] -= p * ibd;
    state[IG] = 0.0;
    state[IB] = p * (ibs + ibd);
    state[VGS] = x.across(g, s);
    state[VDS] = x.across(d, s);
    state[POWER] = state[VDS] * state[ID] + x.across(b, s) * state[IB];
}
