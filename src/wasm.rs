//! WASM bindings for Voltaic Core.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmDcSolver } from 'voltaic_core';
//!
//! await init();
//!
//! const solver = new WasmDcSolver(`
//!   VoltageSource V1 in 0 voltage=5
//!   Resistor R1 in out resistance=1k
//!   Diode D1 out 0
//! `);
//!
//! solver.solve();
//! console.log(solver.node_voltage('out'), solver.output('D1', 'current'));
//! ```

use wasm_bindgen::prelude::*;

use crate::error::VoltaicError;
use crate::netlist;
use crate::solver::{DcConfig, DcSimulator, OperatingPoint};

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

fn to_js(e: VoltaicError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// WASM-compatible DC operating-point solver.
#[wasm_bindgen]
pub struct WasmDcSolver {
    simulator: DcSimulator,
    result: Option<OperatingPoint>,
}

#[wasm_bindgen]
impl WasmDcSolver {
    /// Create a solver from declaration text.
    #[wasm_bindgen(constructor)]
    pub fn new(declarations: &str) -> Result<WasmDcSolver, JsValue> {
        Self::with_config(declarations, crate::solver::DEFAULT_MAX_ITERATIONS, crate::solver::DEFAULT_RELTOL)
    }

    /// Create a solver with custom Newton-Raphson settings.
    #[wasm_bindgen]
    pub fn with_config(declarations: &str, max_iterations: usize, reltol: f64) -> Result<WasmDcSolver, JsValue> {
        let circuit = netlist::load(declarations).map_err(to_js)?;
        let config = DcConfig::new()
            .with_max_iterations(max_iterations)
            .with_reltol(reltol);
        Ok(WasmDcSolver {
            simulator: DcSimulator::with_config(circuit, config),
            result: None,
        })
    }

    /// Solve the operating point and return the report as text.
    #[wasm_bindgen]
    pub fn solve(&mut self) -> Result<String, JsValue> {
        let op = self.simulator.solve().map_err(to_js)?;
        let text = op.to_string();
        self.result = Some(op);
        Ok(text)
    }

    /// Set the circuit temperature in °C for the next solve.
    #[wasm_bindgen]
    pub fn set_temperature(&mut self, celsius: f64) {
        self.simulator.circuit_mut().env_mut().temperature = celsius;
    }

    /// Set a named parameter for the next solve.
    #[wasm_bindgen]
    pub fn set_param(&mut self, name: &str, value: f64) {
        self.simulator.circuit_mut().set_param(name, value);
    }

    /// Voltage at a named node, or `undefined` if the node doesn't exist.
    #[wasm_bindgen]
    pub fn node_voltage(&self, node_name: &str) -> Option<f64> {
        self.simulator.circuit().node_voltage(node_name)
    }

    /// A device output from the last solve.
    #[wasm_bindgen]
    pub fn output(&self, device: &str, name: &str) -> Result<f64, JsValue> {
        let op = self.result.as_ref().ok_or_else(|| {
            to_js(VoltaicError::WasmError {
                message: "no operating point, call solve() first".to_string(),
            })
        })?;
        op.device(device)
            .and_then(|d| d.get(name))
            .map(|q| q.value)
            .ok_or_else(|| {
                to_js(VoltaicError::WasmError {
                    message: format!("device '{device}' has no output '{name}'"),
                })
            })
    }
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
