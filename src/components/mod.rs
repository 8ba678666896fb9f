//! Device models for DC operating-point analysis.
//!
//! This module provides models for all supported devices:
//! - Linear: Resistor, Capacitor, Inductor
//! - Sources: Voltage Source, Current Source, VCVS, VCCS
//! - Probes: Voltmeter, Ammeter
//! - Nonlinear: Diode, BJT, JFET, MOSFET, Op-Amp
//!
//! A device class is pure data ([`DeviceClass`]): terminal names, property
//! schema, output schema and a [`DeviceKind`] tag. The physics lives in
//! free functions per module, selected with a `match` on the tag. Each
//! [`Device`] instance carries a fixed-size [`DeviceState`] buffer that its
//! kernel indexes with named constants.

mod bjt;
mod diode;
mod jfet;
mod junction;
mod linear;
mod mosfet;
mod opamp;
mod probes;
mod sources;

use std::ops::{Index, IndexMut};

use crate::circuit::{BranchId, Environment, NodeId, Properties, PropSpec, RawValue};
use crate::error::{Result, VoltaicError};
use crate::solver::Stamper;
use crate::units::Unit;

pub use junction::{limit_junction_voltage, Junction, JUNCTION_SLOTS};

/// Number of slots in every device state buffer.
pub const STATE_LEN: usize = 24;

/// Which physics kernel evaluates a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Resistor,
    Capacitor,
    Inductor,
    VoltageSource,
    CurrentSource,
    Vcvs,
    Vccs,
    Voltmeter,
    Ammeter,
    Diode,
    Bjt,
    Jfet,
    Mosfet,
    OpAmp,
}

impl DeviceKind {
    /// Number of terminals the kernel reads.
    pub const fn terminals(self) -> usize {
        match self {
            Self::Resistor
            | Self::Capacitor
            | Self::Inductor
            | Self::VoltageSource
            | Self::CurrentSource
            | Self::Voltmeter
            | Self::Ammeter
            | Self::Diode => 2,
            Self::Bjt | Self::Jfet | Self::OpAmp => 3,
            Self::Vcvs | Self::Vccs | Self::Mosfet => 4,
        }
    }

    /// Number of branch-current unknowns the kernel stamps.
    pub const fn branches(self) -> usize {
        match self {
            Self::Inductor | Self::VoltageSource | Self::Vcvs | Self::Ammeter | Self::OpAmp => 1,
            _ => 0,
        }
    }
}

/// A named output quantity read from a state slot after `save_dc`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputSpec {
    pub name: &'static str,
    pub unit: Unit,
    pub slot: usize,
}

impl OutputSpec {
    pub const fn new(name: &'static str, unit: Unit, slot: usize) -> Self {
        Self { name, unit, slot }
    }
}

/// Static description of a device class.
#[derive(Debug)]
pub struct DeviceClass {
    /// Registry identifier, e.g. "Resistor"
    pub id: &'static str,
    /// Terminal names; the length is the terminal count
    pub terminals: &'static [&'static str],
    /// Extra branch-current unknowns each instance needs
    pub branches: usize,
    /// Whether the kernel is linear in the terminal voltages
    pub linear: bool,
    pub props: &'static [PropSpec],
    pub outputs: &'static [OutputSpec],
    pub kind: DeviceKind,
}

/// All built-in device classes, in registration order.
pub fn builtin_classes() -> [&'static DeviceClass; 14] {
    [
        &linear::RESISTOR,
        &linear::CAPACITOR,
        &linear::INDUCTOR,
        &sources::VOLTAGE_SOURCE,
        &sources::CURRENT_SOURCE,
        &sources::VCVS,
        &sources::VCCS,
        &probes::VOLTMETER,
        &probes::AMMETER,
        &diode::DIODE,
        &bjt::BJT,
        &jfet::JFET,
        &mosfet::MOSFET,
        &opamp::OPAMP,
    ]
}

/// Memoized per-device quantities, indexed by each kernel's constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceState([f64; STATE_LEN]);

impl Default for DeviceState {
    fn default() -> Self {
        Self([0.0; STATE_LEN])
    }
}

impl DeviceState {
    /// Zero every slot.
    pub fn clear(&mut self) {
        self.0 = [0.0; STATE_LEN];
    }
}

impl Index<usize> for DeviceState {
    type Output = f64;

    fn index(&self, slot: usize) -> &f64 {
        &self.0[slot]
    }
}

impl IndexMut<usize> for DeviceState {
    fn index_mut(&mut self, slot: usize) -> &mut f64 {
        &mut self.0[slot]
    }
}

/// Terminal nodes and branches a device is connected to.
#[derive(Debug, Clone, Copy)]
pub struct Pins<'a> {
    pub nodes: &'a [NodeId],
    pub branches: &'a [BranchId],
}

/// Read-only view of a solution vector.
#[derive(Debug, Clone, Copy)]
pub struct Solution<'a>(pub &'a [f64]);

impl Solution<'_> {
    /// Node voltage; ground reads as 0.
    pub fn voltage(&self, node: NodeId) -> f64 {
        if node.is_ground() {
            0.0
        } else {
            self.0[node.0]
        }
    }

    /// V[a] - V[b].
    pub fn across(&self, a: NodeId, b: NodeId) -> f64 {
        self.voltage(a) - self.voltage(b)
    }

    /// Branch current.
    pub fn current(&self, branch: BranchId) -> f64 {
        self.0[branch.0]
    }
}

/// One device instance.
#[derive(Debug, Clone)]
pub struct Device {
    id: String,
    class: &'static DeviceClass,
    props: Properties,
    bindings: Vec<(usize, String)>,
    nodes: Vec<NodeId>,
    branches: Vec<BranchId>,
    state: DeviceState,
}

impl Device {
    /// Create a device, validating raw properties against the class schema.
    ///
    /// The device is unconnected until handed to
    /// [`Circuit::connect`](crate::circuit::Circuit::connect).
    pub fn new(class: &'static DeviceClass, id: impl Into<String>, raw: &[(String, RawValue)]) -> Result<Self> {
        let id = id.into();
        let (props, bindings) = Properties::validate(&id, class.props, raw)?;
        if class.kind == DeviceKind::OpAmp {
            opamp::validate(&props, &bindings).map_err(|e| e.in_device(&id))?;
        }
        Ok(Self {
            id,
            class,
            props,
            bindings,
            nodes: Vec::new(),
            branches: Vec::new(),
            state: DeviceState::default(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn class(&self) -> &'static DeviceClass {
        self.class
    }

    pub fn props(&self) -> &Properties {
        &self.props
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn branches(&self) -> &[BranchId] {
        &self.branches
    }

    /// Whether the kernel is linear.
    pub fn is_linear(&self) -> bool {
        self.class.linear
    }

    pub(crate) fn attach(&mut self, nodes: Vec<NodeId>, branches: Vec<BranchId>) {
        self.nodes = nodes;
        self.branches = branches;
    }

    pub(crate) fn set_state(&mut self, state: DeviceState) {
        self.state = state;
    }

    /// Parameter bindings as `(schema slot, parameter name)`.
    pub fn bindings(&self) -> &[(usize, String)] {
        &self.bindings
    }

    /// Resolve parameter bindings with `lookup`, then re-derive cached
    /// constants from the properties.
    pub fn reset(&mut self, env: &Environment, lookup: impl Fn(&str) -> Option<f64>) -> Result<()> {
        for (slot, param) in &self.bindings {
            let value = lookup(param).ok_or_else(|| VoltaicError::UnboundParameter {
                device: self.id.clone(),
                property: self.props.schema()[*slot].name.to_string(),
                param: param.clone(),
            })?;
            self.props.bind(&self.id, *slot, &RawValue::Number(value))?;
        }

        self.state.clear();
        let props = &self.props;
        let state = &mut self.state;
        let reset = match self.class.kind {
            DeviceKind::Resistor => linear::reset_resistor(props, state),
            DeviceKind::Capacitor => linear::reset_capacitor(props, state),
            DeviceKind::Inductor => Ok(()),
            DeviceKind::VoltageSource => sources::reset_voltage_source(props, state),
            DeviceKind::CurrentSource => sources::reset_current_source(props, state),
            DeviceKind::Vcvs | DeviceKind::Vccs => sources::reset_controlled(props, state),
            DeviceKind::Voltmeter | DeviceKind::Ammeter => Ok(()),
            DeviceKind::Diode => diode::reset(props, env, state),
            DeviceKind::Bjt => bjt::reset(props, env, state),
            DeviceKind::Jfet => jfet::reset(props, env, state),
            DeviceKind::Mosfet => mosfet::reset(props, env, state),
            DeviceKind::OpAmp => opamp::reset(props, state),
        };
        reset.map_err(|e| e.in_device(&self.id))
    }

    /// Evaluate at the current iterate and stamp the linearized model.
    pub fn load_dc(&mut self, x: &Solution, st: &mut Stamper) -> Result<()> {
        let pins = Pins {
            nodes: &self.nodes,
            branches: &self.branches,
        };
        let state = &mut self.state;
        match self.class.kind {
            DeviceKind::Resistor => linear::load_resistor(state, &pins, st),
            DeviceKind::Capacitor => Ok(()),
            DeviceKind::Inductor => linear::load_inductor(&pins, st),
            DeviceKind::VoltageSource => sources::load_voltage_source(state, &pins, st),
            DeviceKind::CurrentSource => sources::load_current_source(state, &pins, st),
            DeviceKind::Vcvs => sources::load_vcvs(state, &pins, st),
            DeviceKind::Vccs => sources::load_vccs(state, &pins, st),
            DeviceKind::Voltmeter => Ok(()),
            DeviceKind::Ammeter => probes::load_ammeter(&pins, st),
            DeviceKind::Diode => diode::load_dc(state, &pins, x, st),
            DeviceKind::Bjt => bjt::load_dc(state, &pins, x, st),
            DeviceKind::Jfet => jfet::load_dc(state, &pins, x, st),
            DeviceKind::Mosfet => mosfet::load_dc(state, &pins, x, st),
            DeviceKind::OpAmp => opamp::load_dc(state, &pins, x, st),
        }
    }

    /// Re-evaluate at the converged solution without voltage limiting and
    /// store the output quantities.
    pub fn save_dc(&mut self, x: &Solution) {
        let pins = Pins {
            nodes: &self.nodes,
            branches: &self.branches,
        };
        let state = &mut self.state;
        match self.class.kind {
            DeviceKind::Resistor => linear::save_resistor(state, &pins, x),
            DeviceKind::Capacitor => linear::save_capacitor(state, &pins, x),
            DeviceKind::Inductor => linear::save_inductor(state, &pins, x),
            DeviceKind::VoltageSource => sources::save_voltage_source(state, &pins, x),
            DeviceKind::CurrentSource => sources::save_current_source(state, &pins, x),
            DeviceKind::Vcvs => sources::save_vcvs(state, &pins, x),
            DeviceKind::Vccs => sources::save_vccs(state, &pins, x),
            DeviceKind::Voltmeter => probes::save_voltmeter(state, &pins, x),
            DeviceKind::Ammeter => probes::save_ammeter(state, &pins, x),
            DeviceKind::Diode => diode::save_dc(state, &pins, x),
            DeviceKind::Bjt => bjt::save_dc(state, &pins, x),
            DeviceKind::Jfet => jfet::save_dc(state, &pins, x),
            DeviceKind::Mosfet => mosfet::save_dc(state, &pins, x),
            DeviceKind::OpAmp => opamp::save_dc(state, &pins, x),
        }
    }

    /// Output quantities as `(spec, value)` pairs, in schema order.
    pub fn outputs(&self) -> impl Iterator<Item = (&'static OutputSpec, f64)> + '_ {
        self.class
            .outputs
            .iter()
            .map(move |spec| (spec, self.state[spec.slot]))
    }
}
