//! # Voltaic Core
//!
//! A nonlinear DC operating-point engine for analog circuits.
//!
//! This library provides:
//! - A circuit model of nets, branch unknowns and devices described by
//!   static, data-only device classes looked up in a registry
//! - Modified Nodal Analysis (MNA) based stamping into a dense system
//! - Physics kernels for linear elements, sources, probes, diodes, BJTs,
//!   JFETs, MOSFETs and op-amps
//! - A Newton-Raphson driver with source stepping and gmin stepping fallbacks
//! - A line-oriented declaration file reader
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`circuit`] - Nodes, branches, device registry, property schemas
//! - [`components`] - Device classes and their physics kernels
//! - [`solver`] - MNA assembly, dense linear algebra, Newton-Raphson
//! - [`netlist`] - Declaration file parser
//! - [`units`] - Physical constants and SI formatting
//!
//! ## Usage
//!
//! ### Native CLI
//!
//! ```bash
//! voltaic divider.cir --reltol 1e-5
//! ```
//!
//! ### Library
//!
//! ```no_run
//! use voltaic_core::{netlist, DcSimulator};
//!
//! let circuit = netlist::load(
//!     "VoltageSource V1 in 0 voltage=10\n\
//!      Resistor R1 in out resistance=1k\n\
//!      Resistor R2 out 0 resistance=1k\n",
//! )?;
//! let op = DcSimulator::new(circuit).solve()?;
//! println!("{op}");
//! # Ok::<(), voltaic_core::VoltaicError>(())
//! ```
//!
//! ## Solution Method
//!
//! 1. Assemble the system matrix A and source vector b from every device
//! 2. Solve Ax = b for node voltages and branch currents
//! 3. For nonlinear devices, re-linearize around the new solution and
//!    repeat until successive solutions agree
//! 4. If plain Newton fails, ramp the sources up from 10%, then shrink an
//!    added diagonal conductance down to zero

pub mod circuit;
pub mod components;
pub mod error;
pub mod netlist;
pub mod solver;
pub mod units;

// Re-export main types for convenience
pub use circuit::{Circuit, DeviceDecl, DeviceRegistry};
pub use error::{ErrorKind, Result, VoltaicError};
pub use solver::{DcConfig, DcSimulator, OperatingPoint};

// WASM bindings
#[cfg(feature = "wasm")]
mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::WasmDcSolver;
