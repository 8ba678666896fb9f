//! Property schemas and validated device properties.
//!
//! A device class declares its parameters as a static list of [`PropSpec`].
//! Raw values coming from a netlist or an editor are checked against that
//! list exactly once, when the device is created; afterwards kernels read
//! them through [`Properties`] without further checks.

use std::fmt;

use crate::error::{Result, VoltaicError};

/// Comparison operator of a range bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    Gt,
    Ge,
    Lt,
    Le,
    Ne,
}

impl Cmp {
    fn holds(self, value: f64, limit: f64) -> bool {
        match self {
            Cmp::Gt => value > limit,
            Cmp::Ge => value >= limit,
            Cmp::Lt => value < limit,
            Cmp::Le => value <= limit,
            Cmp::Ne => value != limit,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Cmp::Gt => ">",
            Cmp::Ge => ">=",
            Cmp::Lt => "<",
            Cmp::Le => "<=",
            Cmp::Ne => "!=",
        }
    }
}

/// Numeric domain of a number property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Real,
    Integer,
}

/// Allowed values of a number property: a domain plus chained comparisons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub domain: Domain,
    pub bounds: &'static [(Cmp, f64)],
}

/// Longest comparison chain a range may declare.
pub const MAX_RANGE_BOUNDS: usize = 3;

impl Range {
    /// Any finite real.
    pub const ANY: Range = Range::real(&[]);

    /// Real domain with the given bounds.
    pub const fn real(bounds: &'static [(Cmp, f64)]) -> Self {
        Self {
            domain: Domain::Real,
            bounds,
        }
    }

    /// Integer domain with the given bounds.
    pub const fn integer(bounds: &'static [(Cmp, f64)]) -> Self {
        Self {
            domain: Domain::Integer,
            bounds,
        }
    }

    /// Check a value against the domain and every bound.
    pub fn contains(&self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        if self.domain == Domain::Integer && value.fract() != 0.0 {
            return false;
        }
        self.bounds.iter().all(|&(op, limit)| op.holds(value, limit))
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.domain {
            Domain::Real => write!(f, "real")?,
            Domain::Integer => write!(f, "integer")?,
        }
        for (op, limit) in self.bounds {
            write!(f, " {} {}", op.symbol(), limit)?;
        }
        Ok(())
    }
}

/// Type and constraint of one property.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropKind {
    Number {
        default: Option<f64>,
        range: Range,
    },
    Text {
        default: Option<&'static str>,
        choices: &'static [&'static str],
    },
}

/// Declaration of one named property.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropSpec {
    pub name: &'static str,
    pub title: &'static str,
    pub kind: PropKind,
}

impl PropSpec {
    /// A number property.
    pub const fn number(
        name: &'static str,
        default: Option<f64>,
        range: Range,
        title: &'static str,
    ) -> Self {
        Self {
            name,
            title,
            kind: PropKind::Number { default, range },
        }
    }

    /// A string property drawn from an enumerated set.
    pub const fn text(
        name: &'static str,
        default: Option<&'static str>,
        choices: &'static [&'static str],
        title: &'static str,
    ) -> Self {
        Self {
            name,
            title,
            kind: PropKind::Text { default, choices },
        }
    }

    /// Human-readable constraint, used in error messages.
    pub fn expected(&self) -> String {
        match self.kind {
            PropKind::Number { range, .. } => range.to_string(),
            PropKind::Text { choices, .. } => format!("one of [{}]", choices.join(", ")),
        }
    }

    /// Check the declaration itself: bound count and default inside range.
    pub fn check(&self, class: &str) -> Result<()> {
        let invalid = |message: String| VoltaicError::InvalidSchema {
            class: class.to_string(),
            property: self.name.to_string(),
            message,
        };
        match self.kind {
            PropKind::Number { default, range } => {
                if range.bounds.len() > MAX_RANGE_BOUNDS {
                    return Err(invalid(format!(
                        "range chains {} comparisons, at most {} allowed",
                        range.bounds.len(),
                        MAX_RANGE_BOUNDS
                    )));
                }
                if let Some(d) = default {
                    if !range.contains(d) {
                        return Err(invalid(format!("default {d} outside {range}")));
                    }
                }
            }
            PropKind::Text { default, choices } => {
                if choices.is_empty() {
                    return Err(invalid("empty choice list".to_string()));
                }
                if let Some(d) = default {
                    if !choices.contains(&d) {
                        return Err(invalid(format!("default '{d}' not among choices")));
                    }
                }
            }
        }
        Ok(())
    }

    fn default_value(&self) -> Option<PropValue> {
        match self.kind {
            PropKind::Number { default, .. } => default.map(PropValue::Number),
            PropKind::Text { default, .. } => default.map(PropValue::Text),
        }
    }
}

/// A raw, unvalidated property value as supplied by a caller.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Number(f64),
    Text(String),
    /// Bound to a named parameter, resolved on every circuit reset.
    Param(String),
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Number(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Text(v.to_string())
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Number(v) => write!(f, "{v}"),
            RawValue::Text(s) => write!(f, "'{s}'"),
            RawValue::Param(p) => write!(f, "{{{p}}}"),
        }
    }
}

/// A validated property value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropValue {
    Number(f64),
    Text(&'static str),
}

/// Validated properties of one device, ordered like the class schema.
#[derive(Debug, Clone)]
pub struct Properties {
    schema: &'static [PropSpec],
    values: Vec<Option<PropValue>>,
}

impl Properties {
    /// Validate raw values against a schema.
    ///
    /// Values bound to parameters are skipped here and returned as
    /// `(slot, parameter name)` pairs; they are resolved by
    /// [`Properties::bind`] on every reset.
    pub fn validate(
        device: &str,
        schema: &'static [PropSpec],
        raw: &[(String, RawValue)],
    ) -> Result<(Self, Vec<(usize, String)>)> {
        let mut values: Vec<Option<PropValue>> = schema.iter().map(PropSpec::default_value).collect();
        let mut bindings: Vec<(usize, String)> = Vec::new();

        for (name, value) in raw {
            let slot = schema
                .iter()
                .position(|spec| spec.name.eq_ignore_ascii_case(name))
                .ok_or_else(|| VoltaicError::UnknownProperty {
                    device: device.to_string(),
                    property: name.clone(),
                })?;
            bindings.retain(|(s, _)| *s != slot);
            match value {
                RawValue::Param(param) => {
                    bindings.push((slot, param.clone()));
                    values[slot] = None;
                }
                other => values[slot] = Some(coerce(device, &schema[slot], other)?),
            }
        }

        for (slot, spec) in schema.iter().enumerate() {
            let bound = bindings.iter().any(|(s, _)| *s == slot);
            if values[slot].is_none() && !bound {
                return Err(VoltaicError::MissingProperty {
                    device: device.to_string(),
                    property: spec.name.to_string(),
                });
            }
        }

        Ok((Self { schema, values }, bindings))
    }

    /// Set a bound property from a resolved parameter value.
    pub fn bind(&mut self, device: &str, slot: usize, value: &RawValue) -> Result<()> {
        let spec = &self.schema[slot];
        self.values[slot] = Some(coerce(device, spec, value)?);
        Ok(())
    }

    /// Schema these properties were validated against.
    pub fn schema(&self) -> &'static [PropSpec] {
        self.schema
    }

    /// Look up a number property.
    pub fn number(&self, name: &str) -> Result<f64> {
        match self.get(name)? {
            PropValue::Number(v) => Ok(v),
            PropValue::Text(s) => Err(VoltaicError::InvalidProperty {
                device: String::new(),
                property: name.to_string(),
                expected: "number".to_string(),
                value: s.to_string(),
            }),
        }
    }

    /// Look up a text property.
    pub fn text(&self, name: &str) -> Result<&'static str> {
        match self.get(name)? {
            PropValue::Text(s) => Ok(s),
            PropValue::Number(v) => Err(VoltaicError::InvalidProperty {
                device: String::new(),
                property: name.to_string(),
                expected: "text".to_string(),
                value: v.to_string(),
            }),
        }
    }

    fn get(&self, name: &str) -> Result<PropValue> {
        self.schema
            .iter()
            .position(|spec| spec.name == name)
            .and_then(|slot| self.values[slot])
            .ok_or_else(|| VoltaicError::MissingProperty {
                device: String::new(),
                property: name.to_string(),
            })
    }
}

fn coerce(device: &str, spec: &PropSpec, value: &RawValue) -> Result<PropValue> {
    let rejected = || VoltaicError::InvalidProperty {
        device: device.to_string(),
        property: spec.name.to_string(),
        expected: spec.expected(),
        value: value.to_string(),
    };
    match (&spec.kind, value) {
        (PropKind::Number { range, .. }, RawValue::Number(v)) if range.contains(*v) => {
            Ok(PropValue::Number(*v))
        }
        (PropKind::Text { choices, .. }, RawValue::Text(s)) => choices
            .iter()
            .copied()
            .find(|c| c.eq_ignore_ascii_case(s))
            .map(PropValue::Text)
            .ok_or_else(rejected),
        _ => Err(rejected()),
    }
}
