//! Parsed form of a declaration file.

use crate::circuit::{DeviceDecl, RawValue};

/// Every statement of a declaration file, in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Netlist {
    /// Name of the ground net from `.ground`
    pub ground: Option<String>,
    /// Circuit temperature in °C from `.temp`
    pub temperature: Option<f64>,
    /// `.param` definitions
    pub params: Vec<(String, f64)>,
    /// `.model` definitions
    pub models: Vec<ModelDef>,
    /// Device declarations
    pub devices: Vec<DeviceLine>,
}

impl Netlist {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A `.model` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDef {
    pub name: String,
    /// Device class the model applies to
    pub class: String,
    pub props: Vec<(String, RawValue)>,
    /// Source line number for error reporting
    pub line: usize,
}

/// A device statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceLine {
    pub decl: DeviceDecl,
    /// Source line number for error reporting
    pub line: usize,
}
