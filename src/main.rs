//! Voltaic - DC operating-point solver
//!
//! # Usage
//!
//! ```bash
//! voltaic circuit.cir -v --reltol 1e-5 --temperature 50
//! ```

use std::path::PathBuf;

use clap::Parser;
use voltaic_core::{
    error::Result,
    netlist,
    solver::{DEFAULT_ABSTOL, DEFAULT_GMIN, DEFAULT_MAX_ITERATIONS, DEFAULT_RELTOL, DEFAULT_VNTOL},
    DcConfig, DcSimulator,
};

/// Nonlinear DC operating-point solver
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the circuit declaration file
    #[arg(value_name = "CIRCUIT_FILE")]
    circuit_file: PathBuf,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Relative convergence tolerance
    #[arg(long, default_value_t = DEFAULT_RELTOL)]
    reltol: f64,

    /// Absolute voltage tolerance in volts
    #[arg(long, default_value_t = DEFAULT_VNTOL)]
    vntol: f64,

    /// Absolute current tolerance in amperes
    #[arg(long, default_value_t = DEFAULT_ABSTOL)]
    abstol: f64,

    /// Maximum Newton-Raphson iterations per ramp step
    #[arg(long = "max-iter", default_value_t = DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,

    /// Junction shunt conductance in siemens
    #[arg(long, default_value_t = DEFAULT_GMIN)]
    gmin: f64,

    /// Circuit temperature in °C, overriding `.temp`
    #[arg(short, long)]
    temperature: Option<f64>,
}

impl Args {
    fn config(&self) -> DcConfig {
        DcConfig::new()
            .with_reltol(self.reltol)
            .with_vntol(self.vntol)
            .with_abstol(self.abstol)
            .with_max_iterations(self.max_iterations)
            .with_gmin(self.gmin)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    // Parse and build the circuit
    let mut circuit = netlist::parse_file(&args.circuit_file)?.build()?;
    if let Some(temperature) = args.temperature {
        circuit.env_mut().temperature = temperature;
    }

    let mut simulator = DcSimulator::with_config(circuit, args.config());

    let op = simulator.solve()?;
    print!("{op}");

    Ok(())
}
