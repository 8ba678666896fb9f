//! Device class registry.

use crate::components::{builtin_classes, DeviceClass, STATE_LEN};
use crate::error::{Result, VoltaicError};

/// Lookup table from class id to [`DeviceClass`].
///
/// Built once at startup and shared between circuits through an `Arc`.
/// Class ids are matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    classes: Vec<&'static DeviceClass>,
}

impl DeviceRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in device class.
    pub fn standard() -> Self {
        Self {
            classes: builtin_classes().to_vec(),
        }
    }

    /// Add a class after checking its schema.
    ///
    /// A class may reuse a built-in kernel through its `kind` with a
    /// different id, terminal naming or defaults, as long as its schema
    /// declares the properties that kernel reads.
    pub fn register(&mut self, class: &'static DeviceClass) -> Result<()> {
        if self.get(class.id).is_some() {
            return Err(VoltaicError::DuplicateDeviceClass {
                class: class.id.to_string(),
            });
        }
        let shape = |property: &str, message: String| VoltaicError::InvalidSchema {
            class: class.id.to_string(),
            property: property.to_string(),
            message,
        };
        if class.terminals.len() != class.kind.terminals() {
            return Err(shape(
                "terminals",
                format!(
                    "{:?} kernel reads {} terminals, class declares {}",
                    class.kind,
                    class.kind.terminals(),
                    class.terminals.len()
                ),
            ));
        }
        if class.branches != class.kind.branches() {
            return Err(shape(
                "branches",
                format!(
                    "{:?} kernel stamps {} branches, class declares {}",
                    class.kind,
                    class.kind.branches(),
                    class.branches
                ),
            ));
        }
        if let Some(output) = class.outputs.iter().find(|o| o.slot >= STATE_LEN) {
            return Err(shape(output.name, format!("state slot {} out of range", output.slot)));
        }
        for spec in class.props {
            spec.check(class.id)?;
        }
        for (i, spec) in class.props.iter().enumerate() {
            if class.props[..i].iter().any(|other| other.name.eq_ignore_ascii_case(spec.name)) {
                return Err(VoltaicError::InvalidSchema {
                    class: class.id.to_string(),
                    property: spec.name.to_string(),
                    message: "declared twice".to_string(),
                });
            }
        }
        log::debug!("Registered device class '{}'", class.id);
        self.classes.push(class);
        Ok(())
    }

    /// Look up a class by id.
    pub fn get(&self, id: &str) -> Option<&'static DeviceClass> {
        self.classes
            .iter()
            .copied()
            .find(|class| class.id.eq_ignore_ascii_case(id))
    }

    /// Registered classes in registration order.
    pub fn classes(&self) -> impl Iterator<Item = &'static DeviceClass> + '_ {
        self.classes.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{Cmp, PropSpec, Range};
    use crate::components::{DeviceKind, OutputSpec};
    use crate::units::Unit;

    static LED_PROPS: [PropSpec; 4] = [
        PropSpec::number("is", Some(1e-18), Range::real(&[(Cmp::Gt, 0.0)]), "Saturation current (A)"),
        PropSpec::number("n", Some(2.0), Range::real(&[(Cmp::Gt, 0.0)]), "Emission coefficient"),
        PropSpec::number("eg", Some(1.9), Range::real(&[(Cmp::Gt, 0.0)]), "Energy gap (eV)"),
        PropSpec::number("xti", Some(3.0), Range::ANY, "Temperature exponent"),
    ];

    static LED_OUTPUTS: [OutputSpec; 1] = [OutputSpec::new("voltage", Unit::Volt, 0)];

    static LED: DeviceClass = DeviceClass {
        id: "Led",
        terminals: &["anode", "cathode"],
        branches: 0,
        linear: false,
        props: &LED_PROPS,
        outputs: &LED_OUTPUTS,
        kind: DeviceKind::Diode,
    };

    static BROKEN_PROPS: [PropSpec; 1] =
        [PropSpec::number("r", Some(-1.0), Range::real(&[(Cmp::Gt, 0.0)]), "R")];

    static BROKEN: DeviceClass = DeviceClass {
        id: "Broken",
        terminals: &["p", "n"],
        branches: 0,
        linear: true,
        props: &BROKEN_PROPS,
        outputs: &[],
        kind: DeviceKind::Resistor,
    };

    static AMMETER_NO_BRANCH: DeviceClass = DeviceClass {
        id: "Src",
        terminals: &["p", "n"],
        branches: 0,
        linear: true,
        props: &[],
        outputs: &[],
        kind: DeviceKind::Ammeter,
    };

    static BJT_TWO_PINS: DeviceClass = DeviceClass {
        id: "Q2",
        terminals: &["c", "b"],
        branches: 0,
        linear: false,
        props: &[],
        outputs: &[],
        kind: DeviceKind::Bjt,
    };

    static WIDE_OUTPUT: [OutputSpec; 1] = [OutputSpec::new("voltage", Unit::Volt, STATE_LEN)];

    static DIODE_WIDE_OUTPUT: DeviceClass = DeviceClass {
        id: "Wide",
        terminals: &["anode", "cathode"],
        branches: 0,
        linear: false,
        props: &[],
        outputs: &WIDE_OUTPUT,
        kind: DeviceKind::Diode,
    };

    #[test]
    fn test_builtins_match_their_kernels() {
        for class in builtin_classes() {
            assert_eq!(class.terminals.len(), class.kind.terminals(), "{}", class.id);
            assert_eq!(class.branches, class.kind.branches(), "{}", class.id);
            assert!(class.outputs.iter().all(|o| o.slot < STATE_LEN), "{}", class.id);
        }
    }

    #[test]
    fn test_kernel_shape_mismatch_rejected() {
        let mut registry = DeviceRegistry::standard();

        let err = registry.register(&AMMETER_NO_BRANCH).unwrap_err();
        assert!(matches!(err, VoltaicError::InvalidSchema { ref property, .. } if property == "branches"));

        let err = registry.register(&BJT_TWO_PINS).unwrap_err();
        assert!(matches!(err, VoltaicError::InvalidSchema { ref property, .. } if property == "terminals"));

        let err = registry.register(&DIODE_WIDE_OUTPUT).unwrap_err();
        assert!(matches!(err, VoltaicError::InvalidSchema { ref property, .. } if property == "voltage"));

        assert!(registry.get("Src").is_none());
        assert_eq!(registry.len(), 14);
    }

    #[test]
    fn test_standard_registry_has_builtins() {
        let registry = DeviceRegistry::standard();
        assert_eq!(registry.len(), 14);
        assert_eq!(registry.get("resistor").map(|c| c.id), Some("Resistor"));
        assert_eq!(registry.get("MOSFET").map(|c| c.terminals.len()), Some(4));
        assert!(registry.get("Transformer").is_none());
    }

    #[test]
    fn test_register_custom_class() {
        let mut registry = DeviceRegistry::standard();
        registry.register(&LED).unwrap();
        assert_eq!(registry.get("LED").map(|c| c.kind), Some(DeviceKind::Diode));
    }

    #[test]
    fn test_duplicate_class_rejected() {
        let mut registry = DeviceRegistry::standard();
        let err = registry.register(crate::components::builtin_classes()[0]).unwrap_err();
        assert!(matches!(err, VoltaicError::DuplicateDeviceClass { ref class } if class == "Resistor"));
    }

    #[test]
    fn test_bad_schema_rejected() {
        let mut registry = DeviceRegistry::new();
        let err = registry.register(&BROKEN).unwrap_err();
        assert!(matches!(err, VoltaicError::InvalidSchema { .. }));
        assert!(registry.is_empty());
    }
}
