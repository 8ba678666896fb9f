//! End-to-end tests: declare a circuit, solve the operating point, check
//! the reported quantities.

use approx::assert_relative_eq;
use voltaic_core::circuit::{Circuit, DeviceDecl, RawValue};
use voltaic_core::error::{ErrorKind, VoltaicError};
use voltaic_core::solver::{DcConfig, DcSimulator, OperatingPoint, Strategy};
use voltaic_core::netlist;

fn solve(circuit: Circuit, config: DcConfig) -> Result<OperatingPoint, VoltaicError> {
    DcSimulator::with_config(circuit, config).solve()
}

fn output(op: &OperatingPoint, device: &str, name: &str) -> String {
    op.device(device)
        .and_then(|d| d.get(name))
        .map(|q| q.to_string())
        .unwrap_or_else(|| panic!("{device} has no output {name}"))
}

fn value(op: &OperatingPoint, device: &str, name: &str) -> f64 {
    op.device(device)
        .and_then(|d| d.get(name))
        .map(|q| q.value)
        .unwrap_or_else(|| panic!("{device} has no output {name}"))
}

fn node(op: &OperatingPoint, name: &str) -> f64 {
    op.node(name).map(|q| q.value).unwrap_or_else(|| panic!("no node {name}"))
}

/// 5V source across a 1k resistor.
#[test]
fn test_resistor_divider() {
    let mut circuit = Circuit::default();
    circuit
        .declare(&DeviceDecl::new("VoltageSource", "V1", &["n1", "0"]).with("voltage", 5.0))
        .unwrap();
    circuit
        .declare(&DeviceDecl::new("Resistor", "R1", &["n1", "0"]).with("resistance", 1000.0))
        .unwrap();

    let op = solve(circuit, DcConfig::default()).unwrap();
    assert_eq!(op.strategy, Strategy::Normal);
    assert_eq!(op.iterations, 1);
    assert_eq!(op.node("n1").unwrap().to_string(), "5V");
    assert_eq!(output(&op, "V1", "current"), "-5mA");
    assert_eq!(output(&op, "V1", "power"), "-25mW");
    assert_eq!(output(&op, "R1", "current"), "5mA");
    assert_eq!(output(&op, "R1", "power"), "25mW");
}

/// A diode fed by 0.1A.
#[test]
fn test_single_diode() {
    let mut circuit = Circuit::default();
    circuit
        .declare(&DeviceDecl::new("CurrentSource", "I1", &["0", "n1"]).with("current", 0.1))
        .unwrap();
    circuit.declare(&DeviceDecl::new("Diode", "D1", &["n1", "0"])).unwrap();

    let op = solve(circuit, DcConfig::default().with_reltol(1e-5)).unwrap();
    assert_eq!(op.node("n1").unwrap().to_string(), "774.231mV");
    assert_eq!(output(&op, "D1", "voltage"), "774.231mV");
    assert_eq!(output(&op, "D1", "current"), "100mA");
    assert_eq!(output(&op, "D1", "power"), "77.423mW");
}

/// Two diodes in series fed by 1A.
#[test]
fn test_series_diodes() {
    let mut circuit = Circuit::default();
    circuit
        .declare(&DeviceDecl::new("CurrentSource", "I1", &["0", "n1"]).with("current", 1.0))
        .unwrap();
    circuit.declare(&DeviceDecl::new("Diode", "D1", &["n1", "n2"])).unwrap();
    circuit.declare(&DeviceDecl::new("Diode", "D2", &["n2", "0"])).unwrap();

    let op = solve(circuit, DcConfig::default().with_reltol(1e-5)).unwrap();
    assert_eq!(op.node("n1").unwrap().to_string(), "1.668V");
    assert_eq!(op.node("n2").unwrap().to_string(), "833.787mV");
    assert_eq!(output(&op, "D1", "current"), "1A");
    assert_eq!(output(&op, "D2", "current"), "1A");
    assert_relative_eq!(value(&op, "D1", "current"), value(&op, "D2", "current"), max_relative = 1e-4);
}

/// Two iterations per step are never enough to settle a junction.
#[test]
fn test_ladder_exhaustion() {
    let mut circuit = Circuit::default();
    circuit
        .declare(&DeviceDecl::new("CurrentSource", "I1", &["0", "n1"]).with("current", 0.1))
        .unwrap();
    circuit.declare(&DeviceDecl::new("Diode", "D1", &["n1", "0"])).unwrap();

    let err = solve(circuit, DcConfig::default().with_max_iterations(2)).unwrap_err();
    assert!(matches!(err, VoltaicError::ConvergenceFailure { .. }));
    assert_eq!(err.kind(), ErrorKind::Convergence);
}

/// A base junction driven hard through 1 ohm. Seven iterations are too few
/// at full drive but enough for every tenth of the source ramp.
#[test]
fn test_source_stepping_recovers() {
    let declarations = "VoltageSource V1 a 0 voltage=5\n\
                        Resistor R1 a b resistance=1\n\
                        Diode D1 b c\n\
                        Diode D2 c 0\n\
                        BJT Q1 a b 0\n";

    let op = solve(netlist::load(declarations).unwrap(), DcConfig::default().with_max_iterations(7)).unwrap();
    assert_eq!(op.strategy, Strategy::SourceStepping);
    assert_eq!(op.iterations, 39);

    let reference = solve(netlist::load(declarations).unwrap(), DcConfig::default()).unwrap();
    for name in ["a", "b", "c"] {
        assert_relative_eq!(node(&op, name), node(&reference, name), max_relative = 1e-2);
    }
    assert_relative_eq!(
        value(&op, "Q1", "ic"),
        value(&reference, "Q1", "ic"),
        max_relative = 1e-2
    );
}

/// A diode into 1M from 10V: both plain Newton and the source ramp run out
/// of iterations, the diagonal floor ramp does not.
#[test]
fn test_gmin_stepping_recovers() {
    let declarations = "VoltageSource V1 a 0 voltage=10\n\
                        Diode D1 a b\n\
                        Resistor R1 b 0 resistance=1meg\n";

    let op = solve(netlist::load(declarations).unwrap(), DcConfig::default().with_max_iterations(6)).unwrap();
    assert_eq!(op.strategy, Strategy::GMinStepping);
    // 6 normal, 6 on the first source step, 22 across the eight floors.
    assert_eq!(op.iterations, 34);

    let reference = solve(netlist::load(declarations).unwrap(), DcConfig::default()).unwrap();
    assert_eq!(reference.strategy, Strategy::Normal);
    assert_relative_eq!(node(&op, "a"), 10.0);
    assert_relative_eq!(node(&op, "b"), node(&reference, "b"), max_relative = 1e-3);
    assert_relative_eq!(
        value(&op, "D1", "current"),
        value(&reference, "D1", "current"),
        max_relative = 1e-3
    );
}

/// Each strategy starts over from the state before the solve. Starting
/// source stepping from the last normal iterate instead would let it
/// converge at 8 and 9 iterations.
#[test]
fn test_fallback_starts_from_backup() {
    let declarations = "VoltageSource V1 a 0 voltage=10\n\
                        Diode D1 a b\n\
                        Resistor R1 b 0 resistance=1meg\n";

    for max_iterations in 4..=9 {
        let op = solve(
            netlist::load(declarations).unwrap(),
            DcConfig::default().with_max_iterations(max_iterations),
        )
        .unwrap();
        assert_eq!(op.strategy, Strategy::GMinStepping, "max_iterations = {max_iterations}");
    }
}

#[test]
fn test_repeated_solves_agree() {
    let circuit = netlist::load(
        "CurrentSource I1 0 a current=1m\n\
         Resistor R1 a b resistance=1k\n\
         Diode D1 b 0\n",
    )
    .unwrap();
    let mut sim = DcSimulator::new(circuit);
    let first = sim.solve().unwrap();
    let second = sim.solve().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_configuration_errors() {
    let mut circuit = Circuit::default();

    let err = circuit
        .declare(&DeviceDecl::new("Resistor", "R1", &["a", "0"]).with("resistance", -5.0))
        .unwrap_err();
    assert!(matches!(
        err,
        VoltaicError::InvalidProperty { ref device, ref property, .. } if device == "R1" && property == "resistance"
    ));
    assert_eq!(err.kind(), ErrorKind::Configuration);

    let err = circuit
        .declare(&DeviceDecl::new("Resistor", "R1", &["a"]).with("resistance", 5.0))
        .unwrap_err();
    assert!(matches!(err, VoltaicError::TerminalCountMismatch { .. }));

    let err = circuit.declare(&DeviceDecl::new("Resistor", "R1", &["a", "0"])).unwrap_err();
    assert!(matches!(err, VoltaicError::MissingProperty { .. }));

    let err = circuit
        .declare(&DeviceDecl::new("Diode", "D1", &["a", "0"]).with("color", "red"))
        .unwrap_err();
    assert!(matches!(err, VoltaicError::UnknownProperty { .. }));

    let err = circuit.declare(&DeviceDecl::new("Flux", "F1", &["a", "0"])).unwrap_err();
    assert!(matches!(err, VoltaicError::UnknownDeviceClass { .. }));
}

#[test]
fn test_floating_circuit_rejected() {
    let circuit = netlist::load("Resistor R1 a b resistance=1k\n").unwrap();
    let err = solve(circuit, DcConfig::default()).unwrap_err();
    assert!(matches!(err, VoltaicError::InvalidTopology { .. }));
}

#[test]
fn test_unbound_parameter() {
    let mut circuit = Circuit::default();
    circuit
        .declare(&DeviceDecl::new("VoltageSource", "V1", &["a", "0"]).with("voltage", 1.0))
        .unwrap();
    circuit
        .declare(&DeviceDecl::new("Resistor", "R1", &["a", "0"]).with("resistance", RawValue::Param("rl".into())))
        .unwrap();
    let err = solve(circuit, DcConfig::default()).unwrap_err();
    assert!(matches!(err, VoltaicError::UnboundParameter { ref param, .. } if param == "rl"));
}

/// 10µA into the base, 1k collector load from 10V.
#[test]
fn test_common_emitter_bjt() {
    let circuit = netlist::load(
        "VoltageSource Vcc vcc 0 voltage=10\n\
         Resistor Rc vcc c resistance=1k\n\
         CurrentSource Ib 0 b current=10u\n\
         BJT Q1 c b 0 type=npn bf=100\n",
    )
    .unwrap();
    let op = solve(circuit, DcConfig::default().with_reltol(1e-6)).unwrap();
    assert_relative_eq!(value(&op, "Q1", "ic"), 1e-3, max_relative = 1e-4);
    assert_relative_eq!(value(&op, "Q1", "ib"), 10e-6, max_relative = 1e-4);
    assert_relative_eq!(value(&op, "Q1", "ie"), -1.01e-3, max_relative = 1e-4);
    assert_relative_eq!(node(&op, "c"), 9.0, max_relative = 1e-4);
    let vbe = value(&op, "Q1", "vbe");
    assert!(vbe > 0.5 && vbe < 0.8, "{vbe}");
}

/// Same stage built from a pnp with every polarity flipped.
#[test]
fn test_common_emitter_pnp() {
    let circuit = netlist::load(
        "VoltageSource Vee vee 0 voltage=-10\n\
         Resistor Rc vee c resistance=1k\n\
         CurrentSource Ib b 0 current=10u\n\
         BJT Q1 c b 0 type=pnp bf=100\n",
    )
    .unwrap();
    let op = solve(circuit, DcConfig::default().with_reltol(1e-6)).unwrap();
    assert_relative_eq!(value(&op, "Q1", "ic"), -1e-3, max_relative = 1e-4);
    assert_relative_eq!(node(&op, "c"), -9.0, max_relative = 1e-4);
}

/// Gate tied to source: Id = beta * Vto².
#[test]
fn test_jfet_saturation() {
    let circuit = netlist::load(
        "VoltageSource Vdd vdd 0 voltage=10\n\
         Resistor Rd vdd d resistance=1k\n\
         JFET J1 d 0 0 vto=-2 beta=1e-4\n",
    )
    .unwrap();
    let op = solve(circuit, DcConfig::default().with_reltol(1e-6)).unwrap();
    assert_relative_eq!(value(&op, "J1", "id"), 4e-4, max_relative = 1e-4);
    assert_relative_eq!(node(&op, "d"), 9.6, max_relative = 1e-4);
}

/// Vgs = 3V, beta = kp * W / L = 2mA/V²: Id = beta / 2 * (Vgs - Vto)².
#[test]
fn test_mosfet_saturation() {
    let circuit = netlist::load(
        "VoltageSource Vdd vdd 0 voltage=10\n\
         VoltageSource Vg g 0 voltage=3\n\
         Resistor Rd vdd d resistance=1k\n\
         MOSFET M1 d g 0 0 vto=1 kp=2e-5 w=100u l=1u\n",
    )
    .unwrap();
    let op = solve(circuit, DcConfig::default().with_reltol(1e-6)).unwrap();
    assert_relative_eq!(value(&op, "M1", "id"), 4e-3, max_relative = 1e-4);
    assert_relative_eq!(node(&op, "d"), 6.0, max_relative = 1e-4);
}

#[test]
fn test_opamp_follower() {
    let circuit = netlist::load(
        "VoltageSource Vin in 0 voltage=2\n\
         OpAmp U1 in out out\n\
         Resistor Rl out 0 resistance=10k\n",
    )
    .unwrap();
    let op = solve(circuit, DcConfig::default()).unwrap();
    assert_relative_eq!(node(&op, "out"), 2.0, max_relative = 1e-4);
}

#[test]
fn test_opamp_saturates_open_loop() {
    let circuit = netlist::load(
        "VoltageSource Vin in 0 voltage=2\n\
         OpAmp U1 in 0 out\n\
         Resistor Rl out 0 resistance=10k\n",
    )
    .unwrap();
    let op = solve(circuit, DcConfig::default()).unwrap();
    assert_relative_eq!(node(&op, "out"), 15.0, max_relative = 1e-3);
}

#[test]
fn test_controlled_sources_and_probes() {
    let circuit = netlist::load(
        "VoltageSource V1 a 0 voltage=1\n\
         Vcvs E1 b 0 a 0 gain=3\n\
         Ammeter A1 b c\n\
         Resistor R1 c 0 resistance=1k\n\
         Vccs G1 0 d a 0 gm=2m\n\
         Resistor R2 d 0 resistance=500\n\
         Voltmeter VM1 d 0\n",
    )
    .unwrap();
    let op = solve(circuit, DcConfig::default()).unwrap();
    assert_relative_eq!(node(&op, "b"), 3.0, epsilon = 1e-9);
    assert_relative_eq!(value(&op, "A1", "current"), 3e-3, epsilon = 1e-12);
    assert_relative_eq!(node(&op, "d"), 1.0, epsilon = 1e-9);
    assert_relative_eq!(value(&op, "VM1", "voltage"), 1.0, epsilon = 1e-9);
}

#[test]
fn test_temperature_shifts_diode_voltage() {
    let text = "CurrentSource I1 0 a current=1m\nDiode D1 a 0\n";
    let mut sim = DcSimulator::new(netlist::load(text).unwrap());
    let cold = node(&sim.solve().unwrap(), "a");
    sim.circuit_mut().env_mut().temperature = 100.0;
    let hot = node(&sim.solve().unwrap(), "a");
    assert!(hot < cold, "hot {hot} cold {cold}");
}

#[test]
fn test_model_cards_and_parameters() {
    let circuit = netlist::load(
        ".param iload 1m\n\
         .model Weak Diode is=1e-12\n\
         CurrentSource I1 0 a current={iload}\n\
         Diode D1 a 0 model=Weak\n\
         CurrentSource I2 0 b current={iload}\n\
         Diode D2 b 0\n",
    )
    .unwrap();
    let op = solve(circuit, DcConfig::default().with_reltol(1e-6)).unwrap();
    // 100x the saturation current drops the junction by Vt * ln(100).
    let shift = node(&op, "b") - node(&op, "a");
    assert_relative_eq!(shift, 0.0258649258 * 100f64.ln(), max_relative = 1e-3);
}
