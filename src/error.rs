//! Error types for the Voltaic DC engine.
//!
//! This module provides a unified error type [`VoltaicError`] covering
//! topology assembly, numerical failures inside the solver and the terminal
//! convergence failure. [`VoltaicError::kind`] classifies an error so callers
//! can tell configuration mistakes apart from numerical trouble.

use thiserror::Error;

/// Result type alias using [`VoltaicError`].
pub type Result<T> = std::result::Result<T, VoltaicError>;

/// Coarse classification of a [`VoltaicError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad topology, unknown class, invalid property. Raised before solving.
    Configuration,
    /// NaN/Infinity or a singular system. Absorbed by the strategy ladder.
    Numeric,
    /// Every Newton strategy exhausted its budget.
    Convergence,
    /// Reading input failed.
    Io,
}

/// Unified error type for all Voltaic operations.
#[derive(Error, Debug)]
pub enum VoltaicError {
    // ============ Topology / Configuration Errors ============
    /// Node identifier allocated twice
    #[error("Duplicate node '{node}'")]
    DuplicateNode { node: String },

    /// Device identifier registered twice
    #[error("Duplicate device '{id}'")]
    DuplicateDevice { id: String },

    /// Device class identifier not present in the registry
    #[error("Unknown device class '{class}'")]
    UnknownDeviceClass { class: String },

    /// Device class registered twice in the same registry
    #[error("Device class '{class}' is already registered")]
    DuplicateDeviceClass { class: String },

    /// Device class schema is malformed
    #[error("Invalid schema for device class '{class}', property '{property}': {message}")]
    InvalidSchema {
        class: String,
        property: String,
        message: String,
    },

    /// Number of connected nodes does not match the class
    #[error("Device '{device}' of class '{class}' expects {expected} terminals, got {found}")]
    TerminalCountMismatch {
        device: String,
        class: String,
        expected: usize,
        found: usize,
    },

    /// Property name not declared by the class schema
    #[error("Unknown property '{property}' for device '{device}'")]
    UnknownProperty { device: String, property: String },

    /// Property value rejected by its schema
    #[error("Invalid value for property '{property}' of device '{device}': expected {expected}, got {value}")]
    InvalidProperty {
        device: String,
        property: String,
        expected: String,
        value: String,
    },

    /// Property without default was not provided
    #[error("Missing required property '{property}' for device '{device}'")]
    MissingProperty { device: String, property: String },

    /// Property bound to a parameter that is not defined
    #[error("Property '{property}' of device '{device}' is bound to undefined parameter '{param}'")]
    UnboundParameter {
        device: String,
        property: String,
        param: String,
    },

    /// Model card referenced but never defined
    #[error("Undefined model '{model}' referenced by device '{device}'")]
    UnknownModel { model: String, device: String },

    /// Model card defined twice
    #[error("Duplicate model name '{name}'")]
    DuplicateModel { name: String },

    /// Model card class differs from the device class
    #[error("Model '{model}' is a '{model_class}' model but device '{device}' is a '{device_class}'")]
    ModelClassMismatch {
        model: String,
        model_class: String,
        device: String,
        device_class: String,
    },

    /// Invalid circuit topology
    #[error("Invalid circuit topology: {message}")]
    InvalidTopology { message: String },

    /// Malformed declaration line
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    // ============ Numeric Errors ============
    /// NaN or Infinity produced while stamping or solving
    #[error("Numerical overflow at {location} (value: {value:.2e})")]
    NumericalOverflow { location: String, value: f64 },

    /// No usable pivot in a column
    #[error("Singular matrix at column {column} - circuit may have a floating node or a voltage-source loop")]
    SingularMatrix { column: usize },

    /// Matrix and vector sizes disagree
    #[error("Dimension mismatch: expected {expected}, got {found}")]
    DimensionMismatch { expected: usize, found: usize },

    // ============ Convergence Errors ============
    /// All Newton strategies failed
    #[error("DC operating point did not converge after {iterations} iterations (residual: {residual:.2e})")]
    ConvergenceFailure { iterations: usize, residual: f64 },

    // ============ I/O Errors ============
    /// Error reading a declaration file
    #[error("Failed to read circuit file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // ============ WASM Errors ============
    /// WASM-specific error
    #[cfg(feature = "wasm")]
    #[error("WASM error: {message}")]
    WasmError { message: String },
}

impl VoltaicError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NumericalOverflow { .. }
            | Self::SingularMatrix { .. }
            | Self::DimensionMismatch { .. } => ErrorKind::Numeric,
            Self::ConvergenceFailure { .. } => ErrorKind::Convergence,
            Self::FileReadError { .. } => ErrorKind::Io,
            #[cfg(feature = "wasm")]
            Self::WasmError { .. } => ErrorKind::Io,
            _ => ErrorKind::Configuration,
        }
    }

    /// Create a parse error
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            line,
            message: message.into(),
        }
    }

    /// Create an invalid topology error
    pub fn topology(message: impl Into<String>) -> Self {
        Self::InvalidTopology {
            message: message.into(),
        }
    }

    /// Create a numerical overflow error
    pub fn overflow(location: impl Into<String>, value: f64) -> Self {
        Self::NumericalOverflow {
            location: location.into(),
            value,
        }
    }

    /// Fill in the device id of a property error raised by a kernel, which
    /// only knows the property name.
    pub fn in_device(mut self, id: &str) -> Self {
        match &mut self {
            Self::InvalidProperty { device, .. } | Self::MissingProperty { device, .. }
                if device.is_empty() =>
            {
                *device = id.to_string();
            }
            _ => {}
        }
        self
    }

    /// Create a convergence failure error
    pub fn convergence_failure(iterations: usize, residual: f64) -> Self {
        Self::ConvergenceFailure {
            iterations,
            residual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            VoltaicError::DuplicateNode { node: "a".into() }.kind(),
            ErrorKind::Configuration
        );
        assert_eq!(VoltaicError::overflow("A[0,0]", f64::NAN).kind(), ErrorKind::Numeric);
        assert_eq!(VoltaicError::SingularMatrix { column: 2 }.kind(), ErrorKind::Numeric);
        assert_eq!(
            VoltaicError::convergence_failure(10, 1.0).kind(),
            ErrorKind::Convergence
        );
    }

    #[test]
    fn test_in_device_fills_only_missing_ids() {
        let err = VoltaicError::MissingProperty {
            device: String::new(),
            property: "is".into(),
        }
        .in_device("D1");
        assert!(matches!(err, VoltaicError::MissingProperty { ref device, .. } if device == "D1"));

        let err = VoltaicError::MissingProperty {
            device: "Q1".into(),
            property: "is".into(),
        }
        .in_device("D1");
        assert!(matches!(err, VoltaicError::MissingProperty { ref device, .. } if device == "Q1"));
    }

    #[test]
    fn test_invalid_property_message_names_everything() {
        let err = VoltaicError::InvalidProperty {
            device: "R1".into(),
            property: "resistance".into(),
            expected: "real > 0".into(),
            value: "-5".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("R1"));
        assert!(msg.contains("resistance"));
        assert!(msg.contains("real > 0"));
        assert!(msg.contains("-5"));
    }
}
