//! DC operating-point analysis front end.

use std::fmt;

use log::info;

use crate::circuit::{validate_circuit, Circuit};
use crate::error::Result;
use crate::units::{format_si, Unit};

use super::newton::{NewtonRaphson, Strategy};
use super::{DEFAULT_ABSTOL, DEFAULT_GMIN, DEFAULT_MAX_ITERATIONS, DEFAULT_RELTOL, DEFAULT_VNTOL};

/// Configuration for a DC solve.
#[derive(Debug, Clone, PartialEq)]
pub struct DcConfig {
    /// Maximum Newton-Raphson iterations per ramp step.
    pub max_iterations: usize,
    /// Relative tolerance on voltages and currents.
    pub reltol: f64,
    /// Absolute voltage tolerance (V).
    pub vntol: f64,
    /// Absolute current tolerance (A).
    pub abstol: f64,
    /// Conductance put across every junction (S).
    pub gmin: f64,
}

impl Default for DcConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            reltol: DEFAULT_RELTOL,
            vntol: DEFAULT_VNTOL,
            abstol: DEFAULT_ABSTOL,
            gmin: DEFAULT_GMIN,
        }
    }
}

impl DcConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum Newton-Raphson iterations per ramp step.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the relative tolerance.
    ///
    /// The default of 1e-3 gives about four significant digits. Tighten it
    /// when outputs are compared at more digits than that.
    pub fn with_reltol(mut self, reltol: f64) -> Self {
        self.reltol = reltol;
        self
    }

    pub fn with_vntol(mut self, vntol: f64) -> Self {
        self.vntol = vntol;
        self
    }

    pub fn with_abstol(mut self, abstol: f64) -> Self {
        self.abstol = abstol;
        self
    }

    pub fn with_gmin(mut self, gmin: f64) -> Self {
        self.gmin = gmin;
        self
    }
}

/// A value with its unit, displayed with an SI prefix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantity {
    pub value: f64,
    pub unit: Unit,
}

impl Quantity {
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", format_si(self.value, 3), self.unit)
    }
}

/// Solved voltage of one node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeReport {
    pub name: String,
    pub voltage: Quantity,
}

/// Output quantities of one device.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceReport {
    pub id: String,
    pub class: &'static str,
    pub outputs: Vec<(&'static str, Quantity)>,
}

impl DeviceReport {
    /// Look up an output by name.
    pub fn get(&self, name: &str) -> Option<Quantity> {
        self.outputs
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|&(_, q)| q)
    }
}

/// Result of a DC operating-point solve.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatingPoint {
    /// Strategy that converged
    pub strategy: Strategy,
    /// Newton iterations across every strategy tried
    pub iterations: usize,
    /// Node voltages, in creation order
    pub nodes: Vec<NodeReport>,
    /// Device outputs, in insertion order
    pub devices: Vec<DeviceReport>,
}

impl OperatingPoint {
    fn collect(circuit: &Circuit, strategy: Strategy, iterations: usize) -> Self {
        let nodes = circuit
            .nodes()
            .iter()
            .map(|n| NodeReport {
                name: n.id.clone(),
                voltage: Quantity::new(n.voltage, Unit::Volt),
            })
            .collect();
        let devices = circuit
            .devices()
            .iter()
            .map(|d| DeviceReport {
                id: d.id().to_string(),
                class: d.class().id,
                outputs: d
                    .outputs()
                    .map(|(spec, value)| (spec.name, Quantity::new(value, spec.unit)))
                    .collect(),
            })
            .collect();
        Self {
            strategy,
            iterations,
            nodes,
            devices,
        }
    }

    /// Voltage of a node by name.
    pub fn node(&self, name: &str) -> Option<Quantity> {
        self.nodes.iter().find(|n| n.name == name).map(|n| n.voltage)
    }

    /// Outputs of a device by id.
    pub fn device(&self, id: &str) -> Option<&DeviceReport> {
        self.devices.iter().find(|d| d.id == id)
    }
}

impl fmt::Display for OperatingPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Operating point ({}, {} iterations)", self.strategy, self.iterations)?;
        writeln!(f)?;
        writeln!(f, "Nodes:")?;
        for node in &self.nodes {
            writeln!(f, "  {:<12} {}", node.name, node.voltage)?;
        }
        writeln!(f)?;
        writeln!(f, "Devices:")?;
        for device in &self.devices {
            write!(f, "  {:<12} {:<14}", device.id, device.class)?;
            for (name, q) in &device.outputs {
                write!(f, " {}={}", name, q)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// DC operating-point simulator.
///
/// Owns the circuit so repeated solves (after changing parameters or the
/// temperature) reuse the same topology.
pub struct DcSimulator {
    circuit: Circuit,
    config: DcConfig,
}

impl DcSimulator {
    /// Create a new simulator for the given circuit with default configuration.
    pub fn new(circuit: Circuit) -> Self {
        Self::with_config(circuit, DcConfig::default())
    }

    /// Create a new simulator for the given circuit with custom configuration.
    pub fn with_config(circuit: Circuit, config: DcConfig) -> Self {
        Self { circuit, config }
    }

    pub fn config(&self) -> &DcConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: DcConfig) {
        self.config = config;
    }

    /// Solve for the operating point.
    ///
    /// The circuit is reset first, so every solve starts from zero and
    /// re-reads parameter bindings and the environment.
    pub fn solve(&mut self) -> Result<OperatingPoint> {
        validate_circuit(&self.circuit)?;
        self.circuit.reset()?;

        let size = self.circuit.matrix_size();
        info!(
            "Solving DC operating point: {} nodes, {} branches, {} devices",
            self.circuit.nodes().len(),
            self.circuit.branches().len(),
            self.circuit.devices().len()
        );
        let mut newton = NewtonRaphson::new(self.config.clone(), size);
        let result = newton.solve(&mut self.circuit)?;
        Ok(OperatingPoint::collect(&self.circuit, result.strategy, result.iterations))
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    pub fn circuit_mut(&mut self) -> &mut Circuit {
        &mut self.circuit
    }

    pub fn into_circuit(self) -> Circuit {
        self.circuit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{DeviceDecl, RawValue};
    use crate::error::ErrorKind;

    fn divider() -> Circuit {
        let mut circuit = Circuit::default();
        circuit
            .declare(&DeviceDecl::new("VoltageSource", "V1", &["in", "0"]).with("voltage", 10.0))
            .unwrap();
        circuit
            .declare(&DeviceDecl::new("Resistor", "R1", &["in", "out"]).with("resistance", 1e3))
            .unwrap();
        circuit
            .declare(&DeviceDecl::new("Resistor", "R2", &["out", "0"]).with("resistance", 1e3))
            .unwrap();
        circuit
    }

    #[test]
    fn test_config_builder() {
        let config = DcConfig::new().with_max_iterations(20).with_reltol(1e-5).with_gmin(0.0);
        assert_eq!(config.max_iterations, 20);
        assert_eq!(config.reltol, 1e-5);
        assert_eq!(config.vntol, DEFAULT_VNTOL);
        assert_eq!(config.gmin, 0.0);
    }

    #[test]
    fn test_quantity_display() {
        assert_eq!(Quantity::new(-0.005, Unit::Ampere).to_string(), "-5mA");
        assert_eq!(Quantity::new(3.0, Unit::Dimensionless).to_string(), "3");
    }

    #[test]
    fn test_divider_report() {
        let mut sim = DcSimulator::new(divider());
        let op = sim.solve().unwrap();
        assert_eq!(op.strategy, Strategy::Normal);
        assert_eq!(op.node("out").map(|q| q.to_string()), Some("5V".to_string()));
        let r1 = op.device("R1").unwrap();
        assert_eq!(r1.class, "Resistor");
        assert_eq!(r1.get("current").map(|q| q.to_string()), Some("5mA".to_string()));
        assert!(op.node("missing").is_none());
    }

    #[test]
    fn test_resolve_after_param_change() {
        let mut circuit = divider();
        circuit.set_param("rtop", 3e3);
        circuit
            .declare(&DeviceDecl::new("Resistor", "R3", &["in", "out"]).with("resistance", RawValue::Param("rtop".into())))
            .unwrap();
        let mut sim = DcSimulator::new(circuit);
        let first = sim.solve().unwrap().node("out").unwrap().value;
        sim.circuit_mut().set_param("rtop", 1e3);
        let second = sim.solve().unwrap().node("out").unwrap().value;
        assert!(second > first);
    }

    #[test]
    fn test_empty_circuit_rejected() {
        let mut sim = DcSimulator::new(Circuit::default());
        let err = sim.solve().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_display_lists_nodes_and_devices() {
        let mut sim = DcSimulator::new(divider());
        let text = sim.solve().unwrap().to_string();
        assert!(text.contains("normal"));
        assert!(text.contains("out"));
        assert!(text.contains("R2"));
        assert!(text.contains("current=5mA"));
    }
}
