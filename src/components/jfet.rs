//! JFET model.
//!
//! Shichman-Hodges channel with gate-source and gate-drain junctions.
//! With Vgst = Vgs - VTO:
//!   cutoff      Vgst <= 0           Id = 0
//!   saturation  0 < Vgst <= Vds     Id = β·Vgst²·(1 + λ·Vds)
//!   linear      Vds < Vgst          Id = β·Vds·(2·Vgst - Vds)·(1 + λ·Vds)
//!
//! VTO is negative for a depletion-mode N-channel device. P-channel devices
//! are evaluated in N-channel orientation through the polarity multiplier.

use crate::circuit::{Cmp, Environment, NodeId, Properties, PropSpec, Range};
use crate::error::Result;
use crate::solver::Stamper;
use crate::units::Unit;

use super::bjt::polarity;
use super::junction::{Junction, JUNCTION_SLOTS, SILICON_EG, SILICON_XTI};
use super::{DeviceClass, DeviceKind, DeviceState, OutputSpec, Pins, Solution};

// Outputs shared by every FET
pub(super) const ID: usize = 0;
pub(super) const IG: usize = 1;
pub(super) const VGS: usize = 2;
pub(super) const VDS: usize = 3;
pub(super) const POWER: usize = 4;
pub(super) const GM: usize = 5;
pub(super) const GDS: usize = 6;

const JUNCTION: usize = 7;
const POLARITY: usize = JUNCTION + JUNCTION_SLOTS;
const VTO: usize = POLARITY + 1;
const BETA: usize = POLARITY + 2;
const LAMBDA: usize = POLARITY + 3;
const VGS_LAST: usize = POLARITY + 4;
const VGD_LAST: usize = POLARITY + 5;

const POSITIVE: &[(Cmp, f64)] = &[(Cmp::Gt, 0.0)];
const NON_NEGATIVE: &[(Cmp, f64)] = &[(Cmp::Ge, 0.0)];

static JFET_PROPS: [PropSpec; 6] = [
    PropSpec::text("type", Some("nfet"), &["nfet", "pfet"], "Polarity"),
    PropSpec::number("vto", Some(-2.0), Range::ANY, "Threshold voltage (V)"),
    PropSpec::number("beta", Some(1e-4), Range::real(POSITIVE), "Transconductance parameter (A/V²)"),
    PropSpec::number("lambda", Some(0.0), Range::real(NON_NEGATIVE), "Channel-length modulation (1/V)"),
    PropSpec::number("is", Some(1e-14), Range::real(POSITIVE), "Gate saturation current (A)"),
    PropSpec::number("n", Some(1.0), Range::real(POSITIVE), "Gate emission coefficient"),
];

static JFET_OUTPUTS: [OutputSpec; 7] = [
    OutputSpec::new("id", Unit::Ampere, ID),
    OutputSpec::new("ig", Unit::Ampere, IG),
    OutputSpec::new("vgs", Unit::Volt, VGS),
    OutputSpec::new("vds", Unit::Volt, VDS),
    OutputSpec::new("power", Unit::Watt, POWER),
    OutputSpec::new("gm", Unit::Siemens, GM),
    OutputSpec::new("gds", Unit::Siemens, GDS),
];

pub static JFET: DeviceClass = DeviceClass {
    id: "JFET",
    terminals: &["d", "g", "s"],
    branches: 0,
    linear: false,
    props: &JFET_PROPS,
    outputs: &JFET_OUTPUTS,
    kind: DeviceKind::Jfet,
};

/// Drain current and its derivatives in N-channel orientation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(super) struct Channel {
    pub id: f64,
    pub gm: f64,
    pub gds: f64,
}

impl Channel {
    /// Evaluate a forward-only channel law for any sign of `vds`.
    ///
    /// For `vds < 0` drain and source swap roles: the law is evaluated at
    /// `(vgd, -vds)` and the result mapped back to the original terminals.
    pub fn oriented(vgs: f64, vds: f64, forward: impl Fn(f64, f64) -> Channel) -> Channel {
        if vds >= 0.0 {
            return forward(vgs, vds);
        }
        let f = forward(vgs - vds, -vds);
        Channel {
            id: -f.id,
            gm: -f.gm,
            gds: f.gm + f.gds,
        }
    }

    /// Stamp the linearized channel between drain and source.
    pub fn stamp(&self, p: f64, vgs: f64, vds: f64, pins: &Pins, st: &mut Stamper) -> Result<()> {
        let (d, g, s) = (pins.nodes[0], pins.nodes[1], pins.nodes[2]);
        st.stamp_transconductance(d, s, g, s, self.gm)?;
        st.stamp_conductance(d, s, self.gds)?;
        st.stamp_current_source(d, s, p * (self.id - self.gm * vgs - self.gds * vds))
    }

    /// Store the channel outputs with terminal signs applied.
    pub fn save(&self, state: &mut DeviceState, p: f64) {
        state[ID] = p * self.id;
        state[GM] = self.gm;
        state[GDS] = self.gds;
    }
}

/// Stamp a junction diode from anode to cathode, limited against
/// `state[last]`. `v` is the polarity-adjusted junction voltage.
pub(super) fn stamp_junction(
    junction: &Junction,
    p: f64,
    v: f64,
    last: usize,
    (anode, cathode): (NodeId, NodeId),
    state: &mut DeviceState,
    st: &mut Stamper,
) -> Result<()> {
    let v = junction.limit(v, state[last]);
    state[last] = v;
    let (i, g) = junction.evaluate(v);
    st.stamp_conductance(anode, cathode, g + st.gmin())?;
    st.stamp_current_source(anode, cathode, p * (i - g * v))
}

fn shichman_hodges(vto: f64, beta: f64, lambda: f64) -> impl Fn(f64, f64) -> Channel {
    move |vgs, vds| {
        let vgst = vgs - vto;
        let clm = 1.0 + lambda * vds;
        if vgst <= 0.0 {
            Channel::default()
        } else if vgst <= vds {
            Channel {
                id: beta * vgst * vgst * clm,
                gm: 2.0 * beta * vgst * clm,
                gds: beta * lambda * vgst * vgst,
            }
        } else {
            let core = vds * (2.0 * vgst - vds);
            Channel {
                id: beta * core * clm,
                gm: 2.0 * beta * vds * clm,
                gds: 2.0 * beta * (vgst - vds) * clm + beta * lambda * core,
            }
        }
    }
}

pub(super) fn reset(props: &Properties, env: &Environment, state: &mut DeviceState) -> Result<()> {
    let junction = Junction::new(props.number("is")?, props.number("n")?, SILICON_EG, SILICON_XTI, env);
    junction.store(state, JUNCTION);
    state[POLARITY] = polarity(props, "nfet")?;
    state[VTO] = props.number("vto")?;
    state[BETA] = props.number("beta")?;
    state[LAMBDA] = props.number("lambda")?;
    Ok(())
}

fn law(state: &DeviceState) -> impl Fn(f64, f64) -> Channel {
    shichman_hodges(state[VTO], state[BETA], state[LAMBDA])
}

pub(super) fn load_dc(state: &mut DeviceState, pins: &Pins, x: &Solution, st: &mut Stamper) -> Result<()> {
    let (d, g, s) = (pins.nodes[0], pins.nodes[1], pins.nodes[2]);
    let p = state[POLARITY];
    let junction = Junction::load(state, JUNCTION);

    let vgs = p * x.across(g, s);
    let vds = p * x.across(d, s);
    Channel::oriented(vgs, vds, law(state)).stamp(p, vgs, vds, pins, st)?;

    stamp_junction(&junction, p, vgs, VGS_LAST, (g, s), state, st)?;
    stamp_junction(&junction, p, vgs - vds, VGD_LAST, (g, d), state, st)
}

pub(super) fn save_dc(state: &mut DeviceState, pins: &Pins, x: &Solution) {
    let (d, g, s) = (pins.nodes[0], pins.nodes[1], pins.nodes[2]);
    let p = state[POLARITY];
    let junction = Junction::load(state, JUNCTION);

    let vgs = p * x.across(g, s);
    let vds = p * x.across(d, s);
    let channel = Channel::oriented(vgs, vds, law(state));
    let igs = junction.current(vgs);
    let igd = junction.current(vgs - vds);

    channel.save(state, p);
    // Gate-drain leakage leaves through the drain.
    state[ID] -= p * igd;
    state[IG] = p * (igs + igd);
    state[VGS] = x.across(g, s);
    state[VDS] = x.across(d, s);
    state[POWER] = state[VDS] * state[ID] + state[VGS] * state[IG];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::RawValue;
    use crate::components::test_support::device;
    use crate::components::Device;
    use approx::assert_relative_eq;

    fn jfet(kind: &str, lambda: f64) -> Device {
        device(
            &JFET,
            &[("type", RawValue::from(kind)), ("lambda", lambda.into())],
            &[NodeId(0), NodeId(1), NodeId(2)],
            &[],
        )
    }

    #[test]
    fn test_regions() {
        let law = shichman_hodges(-2.0, 1e-3, 0.0);
        assert_eq!(law(-3.0, 5.0), Channel::default());
        // Saturation at Vgs = 0: Idss = β·VTO²
        assert_relative_eq!(law(0.0, 5.0).id, 4e-3);
        // Linear: Vds = 1 < Vgst = 2
        assert_relative_eq!(law(0.0, 1.0).id, 1e-3 * 1.0 * 3.0);
        // Continuous at the region boundary
        assert_relative_eq!(law(0.0, 2.0).id, 4e-3);
    }

    #[test]
    fn test_derivatives_match_finite_difference() {
        let law = shichman_hodges(-2.0, 1e-3, 0.02);
        let h = 1e-6;
        for &(vgs, vds) in &[(-0.5, 4.0), (-0.5, 0.5), (-0.5, -0.7)] {
            let c = Channel::oriented(vgs, vds, &law);
            let gm = (Channel::oriented(vgs + h, vds, &law).id - Channel::oriented(vgs - h, vds, &law).id) / (2.0 * h);
            let gds = (Channel::oriented(vgs, vds + h, &law).id - Channel::oriented(vgs, vds - h, &law).id) / (2.0 * h);
            assert_relative_eq!(c.gm, gm, max_relative = 1e-5);
            assert_relative_eq!(c.gds, gds, max_relative = 1e-5);
        }
    }

    #[test]
    fn test_inverse_mode_is_antisymmetric() {
        let law = shichman_hodges(-2.0, 1e-3, 0.0);
        // Swapping drain and source negates the current.
        let fwd = Channel::oriented(-0.5, 1.0, &law);
        let rev = Channel::oriented(-0.5 - 1.0, -1.0, &law);
        assert_relative_eq!(rev.id, -fwd.id);
    }

    #[test]
    fn test_pfet_mirrors_nfet() {
        let mut n = jfet("nfet", 0.01);
        let mut p = jfet("pfet", 0.01);
        n.save_dc(&Solution(&[6.0, -0.5, 0.0]));
        p.save_dc(&Solution(&[-6.0, 0.5, 0.0]));
        assert!(n.state()[ID] > 0.0);
        assert_relative_eq!(p.state()[ID], -n.state()[ID]);
        assert_relative_eq!(p.state()[POWER], n.state()[POWER]);
    }
}
