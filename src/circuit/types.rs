//! Core types for circuit representation.

use std::fmt;

/// Matrix position of a node voltage unknown.
///
/// Ground is the sentinel [`NodeId::GROUND`] and never maps to a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    /// The ground node.
    pub const GROUND: NodeId = NodeId(usize::MAX);

    /// Check if this is the ground node.
    pub fn is_ground(&self) -> bool {
        *self == Self::GROUND
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ground() {
            write!(f, "GND")
        } else {
            write!(f, "N{}", self.0)
        }
    }
}

/// Matrix position of a branch current unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BranchId(pub usize);

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I{}", self.0)
    }
}

/// Anything that can address a row/column of the MNA system.
pub trait MatrixIndex: Copy {
    /// Row in the system, or `None` for ground.
    fn row(self) -> Option<usize>;
}

impl MatrixIndex for NodeId {
    fn row(self) -> Option<usize> {
        if self.is_ground() {
            None
        } else {
            Some(self.0)
        }
    }
}

impl MatrixIndex for BranchId {
    fn row(self) -> Option<usize> {
        Some(self.0)
    }
}

/// What an entry of the solution vector stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unknown {
    /// Position in the circuit's node list
    Voltage(usize),
    /// Position in the circuit's branch list
    Current(usize),
}

/// One electrical net.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: String,
    pub index: NodeId,
    pub voltage: f64,
}

/// An auxiliary current unknown between two nodes.
#[derive(Debug, Clone)]
pub struct Branch {
    pub index: BranchId,
    pub from: NodeId,
    pub to: NodeId,
    pub current: f64,
}

/// Global quantities device equations may depend on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Environment {
    /// Circuit temperature in °C
    pub temperature: f64,
    /// Temperature at which model parameters were measured, in °C
    pub nominal_temperature: f64,
    /// Simulation time in seconds (0 for DC)
    pub time: f64,
    /// Analysis frequency in Hz (0 for DC)
    pub frequency: f64,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            temperature: 27.0,
            nominal_temperature: 27.0,
            time: 0.0,
            frequency: 0.0,
        }
    }
}

impl Environment {
    /// Absolute circuit temperature in kelvin.
    pub fn kelvin(&self) -> f64 {
        self.temperature + crate::units::CELSIUS_TO_KELVIN
    }

    /// Absolute nominal temperature in kelvin.
    pub fn nominal_kelvin(&self) -> f64 {
        self.nominal_temperature + crate::units::CELSIUS_TO_KELVIN
    }
}
