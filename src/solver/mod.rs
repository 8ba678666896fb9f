//! MNA (Modified Nodal Analysis) solver.
//!
//! This module provides the numerical engine for DC operating-point
//! analysis.
//!
//! ## Modified Nodal Analysis
//!
//! MNA assembles a system of equations Ax = b where:
//! - x contains node voltages and branch currents
//! - A is the conductance/coefficient matrix
//! - b is the source vector
//!
//! The matrix structure is:
//! ```text
//! [ G   B ] [ v ]   [ i ]
//! [ C   D ] [ j ] = [ e ]
//! ```
//!
//! where:
//! - G is the conductance matrix (node equations)
//! - B, C connect voltage sources to nodes
//! - D is usually 0 (for ideal voltage sources)
//! - v is the vector of node voltages
//! - j is the vector of branch currents
//! - i is the sum of current sources into each node
//! - e is the vector of voltage source values
//!
//! Nonlinear devices are linearized around the current iterate and the
//! system is re-assembled every Newton-Raphson iteration. When plain
//! Newton fails, source stepping and then gmin stepping are tried.

pub mod linalg;
mod mna;
mod newton;
mod operating_point;

pub use mna::{MnaSystem, Stamper};
pub use newton::{Convergence, NewtonRaphson, Strategy};
pub use operating_point::{DcConfig, DcSimulator, DeviceReport, NodeReport, OperatingPoint, Quantity};

/// Maximum Newton-Raphson iterations per ramp step.
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Relative convergence tolerance.
pub const DEFAULT_RELTOL: f64 = 1e-3;

/// Absolute voltage tolerance (V).
pub const DEFAULT_VNTOL: f64 = 1e-6;

/// Absolute current tolerance (A).
pub const DEFAULT_ABSTOL: f64 = 1e-12;

/// Conductance devices put across their junctions (S).
pub const DEFAULT_GMIN: f64 = 1e-12;

/// Source factors tried by source stepping.
pub const SOURCE_STEPS: [f64; 10] = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0];

/// Diagonal conductances tried by gmin stepping, ending without a floor.
pub const GMIN_STEPS: [f64; 8] = [1e-3, 1e-4, 1e-5, 1e-6, 1e-7, 1e-8, 1e-9, 0.0];
