//! Declaration file reader.
//!
//! A line-oriented serialization of device declarations. It is not a SPICE
//! grammar: each line is split into a class id, an instance id, net names
//! and `key=value` properties.
//!
//! # Grammar Overview
//!
//! ```text
//! file       = { line }
//! line       = [ directive | device ] [ comment ]
//! comment    = ('#' | ';') { any_char }
//! directive  = ".ground" net
//!            | ".temp" number
//!            | ".param" name number
//!            | ".model" name class { key '=' value }
//! device     = class id { net } { key '=' value }
//!
//! value      = '{' name '}' | number | word
//! number     = float [ 'f' | 'p' | 'n' | 'u' | 'µ' | 'm' | 'k' | 'meg' | 'M' | 'G' | 'T' ]
//! ```
//!
//! `model=NAME` on a device line references a model card; `{name}` binds a
//! property to a `.param` (or to `temp`, `time`, `freq`).
//!
//! # Example
//!
//! ```text
//! # Clamped divider
//! .param rload 2k
//! .model D1N4148 Diode is=2.52n n=1.752
//!
//! VoltageSource V1 in 0 voltage=5
//! Resistor R1 in out resistance={rload}
//! Diode D1 out gnd model=D1N4148
//! ```

mod ast;
mod parser;

use std::sync::Arc;

use log::debug;

pub use ast::{DeviceLine, ModelDef, Netlist};
pub use parser::Parser;

use crate::circuit::{Circuit, DeviceRegistry};
use crate::error::Result;

/// Parse declaration text.
pub fn parse(input: &str) -> Result<Netlist> {
    Parser::new(input).parse()
}

/// Parse a declaration file.
pub fn parse_file(path: &std::path::Path) -> Result<Netlist> {
    let content = std::fs::read_to_string(path).map_err(|e| crate::error::VoltaicError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse(&content)
}

impl Netlist {
    /// Build a circuit with the built-in device classes.
    pub fn build(&self) -> Result<Circuit> {
        self.build_with(Arc::new(DeviceRegistry::standard()))
    }

    /// Build a circuit resolving classes through `registry`.
    ///
    /// Directives are applied before any device, wherever they appear.
    pub fn build_with(&self, registry: Arc<DeviceRegistry>) -> Result<Circuit> {
        let mut circuit = Circuit::new(registry);
        if let Some(ground) = &self.ground {
            circuit.set_ground(ground.clone())?;
        }
        if let Some(temperature) = self.temperature {
            circuit.env_mut().temperature = temperature;
        }
        for (name, value) in &self.params {
            circuit.set_param(name.clone(), *value);
        }
        for model in &self.models {
            circuit.add_model(model.name.clone(), &model.class, model.props.clone())?;
        }
        for device in &self.devices {
            debug!("Line {}: declaring {} '{}'", device.line, device.decl.class, device.decl.id);
            circuit.declare(&device.decl)?;
        }
        Ok(circuit)
    }
}

/// Parse declaration text straight into a circuit.
pub fn load(input: &str) -> Result<Circuit> {
    parse(input)?.build()
}
