//! Newton-Raphson iteration with a recovery ladder.
//!
//! Strategies are tried in order until one converges:
//! 1. [`Strategy::Normal`]: plain Newton with full sources.
//! 2. [`Strategy::SourceStepping`]: ramp every independent source from 10%
//!    to 100%, each step starting from the previous solution.
//! 3. [`Strategy::GMinStepping`]: add a shrinking conductance to every
//!    diagonal entry, ending with none.
//!
//! Each strategy starts from the same backup of node voltages, branch
//! currents and device states.

use std::fmt;

use log::{debug, info, warn};

use crate::circuit::{Circuit, Unknown};
use crate::components::{DeviceState, Solution};
use crate::error::{ErrorKind, Result, VoltaicError};

use super::linalg::LuSolver;
use super::mna::{MnaSystem, Stamper};
use super::{DcConfig, GMIN_STEPS, SOURCE_STEPS};

/// A rung of the recovery ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Normal,
    SourceStepping,
    GMinStepping,
}

impl Strategy {
    /// Strategies in the order they are tried.
    pub const LADDER: [Strategy; 3] = [Strategy::Normal, Strategy::SourceStepping, Strategy::GMinStepping];

    /// `(source factor, diagonal floor)` of every step.
    pub fn ramp(self) -> Vec<(f64, f64)> {
        match self {
            Strategy::Normal => vec![(1.0, 0.0)],
            Strategy::SourceStepping => SOURCE_STEPS.iter().map(|&f| (f, 0.0)).collect(),
            Strategy::GMinStepping => GMIN_STEPS.iter().map(|&g| (1.0, g)).collect(),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Normal => write!(f, "normal"),
            Strategy::SourceStepping => write!(f, "source stepping"),
            Strategy::GMinStepping => write!(f, "gmin stepping"),
        }
    }
}

/// Outcome of a successful solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Convergence {
    /// Strategy that converged
    pub strategy: Strategy,
    /// Iterations spent across every strategy tried
    pub iterations: usize,
}

/// Newton-Raphson solver for one circuit.
///
/// Buffers are sized once for the circuit's matrix and reused across
/// iterations and strategies.
pub struct NewtonRaphson {
    config: DcConfig,
    system: MnaSystem,
    /// Current iterate
    x: Vec<f64>,
    backup: Vec<f64>,
    backup_states: Vec<DeviceState>,
    /// Cached factorization of a linear circuit, keyed by diagonal floor
    lu: Option<(f64, LuSolver)>,
    iterations: usize,
    residual: f64,
}

impl NewtonRaphson {
    /// Create a solver for a system of dimension `size`.
    pub fn new(config: DcConfig, size: usize) -> Self {
        Self {
            config,
            system: MnaSystem::new(size),
            x: vec![0.0; size],
            backup: Vec::new(),
            backup_states: Vec::new(),
            lu: None,
            iterations: 0,
            residual: 0.0,
        }
    }

    pub fn config(&self) -> &DcConfig {
        &self.config
    }

    /// Solve for the DC operating point of `circuit`.
    ///
    /// On success the circuit holds the solution and every device has run
    /// `save_dc`. On failure the circuit is restored to its starting point.
    pub fn solve(&mut self, circuit: &mut Circuit) -> Result<Convergence> {
        if circuit.matrix_size() != self.system.size() {
            return Err(VoltaicError::DimensionMismatch {
                expected: self.system.size(),
                found: circuit.matrix_size(),
            });
        }

        self.backup = circuit.solution_vector();
        self.backup_states = circuit.device_states();
        self.iterations = 0;
        self.residual = 0.0;
        self.lu = None;
        let linear = circuit.is_linear();

        for strategy in Strategy::LADDER {
            self.restore(circuit)?;
            match self.run_strategy(circuit, strategy, linear) {
                Ok(()) => {
                    info!(
                        "DC operating point converged with {} after {} iterations",
                        strategy, self.iterations
                    );
                    let x = Solution(&self.x);
                    for device in circuit.devices_mut() {
                        device.save_dc(&x);
                    }
                    return Ok(Convergence {
                        strategy,
                        iterations: self.iterations,
                    });
                }
                Err(e) if matches!(e.kind(), ErrorKind::Numeric | ErrorKind::Convergence) => {
                    warn!("Strategy '{}' failed: {}", strategy, e);
                }
                Err(e) => return Err(e),
            }
        }

        self.restore(circuit)?;
        Err(VoltaicError::convergence_failure(self.iterations, self.residual))
    }

    /// Put the backup back into the circuit and clear the iteration history.
    fn restore(&mut self, circuit: &mut Circuit) -> Result<()> {
        circuit.apply_solution(&self.backup)?;
        circuit.restore_device_states(&self.backup_states);
        self.x.copy_from_slice(&self.backup);
        Ok(())
    }

    fn run_strategy(&mut self, circuit: &mut Circuit, strategy: Strategy, linear: bool) -> Result<()> {
        for (factor, floor) in strategy.ramp() {
            let iterations = if linear {
                self.solve_linear(circuit, factor, floor)?
            } else {
                self.iterate(circuit, factor, floor)?
            };
            debug!(
                "{} step: source factor {}, floor {:e}, {} iteration(s)",
                strategy, factor, floor, iterations
            );
        }
        Ok(())
    }

    /// Stamp every device at the current iterate.
    fn assemble(&mut self, circuit: &mut Circuit, factor: f64, floor: f64) -> Result<()> {
        self.system.clear();
        let mut st = Stamper::new(&mut self.system, factor, self.config.gmin);
        let x = Solution(&self.x);
        for device in circuit.devices_mut() {
            device.load_dc(&x, &mut st)?;
        }
        if floor > 0.0 {
            self.system.add_diagonal(floor);
        }
        Ok(())
    }

    /// A linear circuit needs one solve per step. Its matrix only changes
    /// with the diagonal floor, so the factorization is reused.
    fn solve_linear(&mut self, circuit: &mut Circuit, factor: f64, floor: f64) -> Result<usize> {
        self.assemble(circuit, factor, floor)?;
        let reusable = matches!(&self.lu, Some((f, _)) if *f == floor);
        if !reusable {
            self.lu = Some((floor, LuSolver::factor(&self.system.a)?));
        }
        let x = match &self.lu {
            Some((_, lu)) => lu.solve(&self.system.b)?,
            None => self.system.solve()?,
        };
        circuit.apply_solution(&x)?;
        self.x = x;
        self.iterations += 1;
        Ok(1)
    }

    /// Iterate until two successive solutions agree within tolerance.
    fn iterate(&mut self, circuit: &mut Circuit, factor: f64, floor: f64) -> Result<usize> {
        for iteration in 1..=self.config.max_iterations {
            self.assemble(circuit, factor, floor)?;
            let x_new = self.system.solve()?;
            circuit.apply_solution(&x_new)?;
            self.iterations += 1;

            let converged = iteration > 1 && self.converged(circuit.unknowns(), &x_new);
            self.x = x_new;
            debug!("Newton iteration {}: max step {:.3e}", iteration, self.residual);
            if converged {
                return Ok(iteration);
            }
        }
        Err(VoltaicError::convergence_failure(self.config.max_iterations, self.residual))
    }

    /// Compare `x_new` with the current iterate and record the largest step.
    fn converged(&mut self, unknowns: &[Unknown], x_new: &[f64]) -> bool {
        let mut ok = true;
        let mut largest = 0.0f64;
        for ((unknown, &new), &old) in unknowns.iter().zip(x_new).zip(&self.x) {
            let step = (new - old).abs();
            let floor = match unknown {
                Unknown::Voltage(_) => self.config.vntol,
                Unknown::Current(_) => self.config.abstol,
            };
            if step >= self.config.reltol * new.abs() + floor {
                ok = false;
            }
            largest = largest.max(step);
        }
        self.residual = largest;
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::DeviceDecl;
    use approx::assert_relative_eq;

    fn solve(circuit: &mut Circuit, config: DcConfig) -> Result<Convergence> {
        circuit.reset()?;
        NewtonRaphson::new(config, circuit.matrix_size()).solve(circuit)
    }

    #[test]
    fn test_ramps() {
        assert_eq!(Strategy::Normal.ramp(), vec![(1.0, 0.0)]);
        let sources = Strategy::SourceStepping.ramp();
        assert_eq!(sources.len(), 10);
        assert_eq!(sources[0], (0.1, 0.0));
        assert_eq!(sources[9], (1.0, 0.0));
        let gmin = Strategy::GMinStepping.ramp();
        assert_eq!(gmin.first(), Some(&(1.0, 1e-3)));
        assert_eq!(gmin.last(), Some(&(1.0, 0.0)));
    }

    #[test]
    fn test_linear_circuit_single_solve() {
        let mut circuit = Circuit::default();
        circuit
            .declare(&DeviceDecl::new("CurrentSource", "I1", &["0", "a"]).with("current", 1e-3))
            .unwrap();
        circuit
            .declare(&DeviceDecl::new("Resistor", "R1", &["a", "0"]).with("resistance", 2e3))
            .unwrap();
        let result = solve(&mut circuit, DcConfig::default()).unwrap();
        assert_eq!(result.strategy, Strategy::Normal);
        assert_eq!(result.iterations, 1);
        assert_relative_eq!(circuit.node_voltage("a").unwrap(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_diode_converges_normally() {
        let mut circuit = Circuit::default();
        circuit
            .declare(&DeviceDecl::new("CurrentSource", "I1", &["0", "a"]).with("current", 1e-3))
            .unwrap();
        circuit.declare(&DeviceDecl::new("Diode", "D1", &["a", "0"])).unwrap();
        let result = solve(&mut circuit, DcConfig::default()).unwrap();
        assert_eq!(result.strategy, Strategy::Normal);
        assert!(result.iterations > 2);
        let v = circuit.node_voltage("a").unwrap();
        assert!(v > 0.5 && v < 0.7, "{v}");
    }

    #[test]
    fn test_exhaustion_restores_circuit() {
        let mut circuit = Circuit::default();
        circuit
            .declare(&DeviceDecl::new("CurrentSource", "I1", &["0", "a"]).with("current", 0.1))
            .unwrap();
        circuit.declare(&DeviceDecl::new("Diode", "D1", &["a", "0"])).unwrap();
        circuit.reset().unwrap();
        let before = circuit.device_states();

        let config = DcConfig::default().with_max_iterations(2);
        let err = NewtonRaphson::new(config, circuit.matrix_size())
            .solve(&mut circuit)
            .unwrap_err();
        assert!(matches!(err, VoltaicError::ConvergenceFailure { .. }));
        assert_eq!(err.kind(), ErrorKind::Convergence);
        assert_eq!(circuit.solution_vector(), vec![0.0]);
        assert_eq!(circuit.device_states(), before);
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let mut circuit = Circuit::default();
        circuit
            .declare(&DeviceDecl::new("Resistor", "R1", &["a", "0"]).with("resistance", 1.0))
            .unwrap();
        let err = NewtonRaphson::new(DcConfig::default(), 5).solve(&mut circuit).unwrap_err();
        assert!(matches!(err, VoltaicError::DimensionMismatch { .. }));
    }
}
