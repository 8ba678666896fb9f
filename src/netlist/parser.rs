//! Line parser for declaration files.

use super::ast::{DeviceLine, ModelDef, Netlist};
use crate::circuit::{DeviceDecl, RawValue};
use crate::error::{Result, VoltaicError};
use crate::units::parse_value;

/// Parser for declaration text.
pub struct Parser<'a> {
    input: &'a str,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input }
    }

    /// Parse every line of the input.
    pub fn parse(&self) -> Result<Netlist> {
        let mut netlist = Netlist::new();
        for (i, raw) in self.input.lines().enumerate() {
            let line = i + 1;
            let words: Vec<&str> = strip_comment(raw).split_whitespace().collect();
            let Some(&head) = words.first() else {
                continue;
            };
            if head.starts_with('.') {
                parse_directive(&mut netlist, head, &words[1..], line)?;
            } else {
                netlist.devices.push(parse_device(&words, line)?);
            }
        }
        Ok(netlist)
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find(|c: char| c == '#' || c == ';') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn parse_directive(netlist: &mut Netlist, directive: &str, args: &[&str], line: usize) -> Result<()> {
    match directive.to_ascii_lowercase().as_str() {
        ".ground" => {
            let [name] = args else {
                return Err(VoltaicError::parse(line, ".ground expects one net name"));
            };
            if netlist.ground.is_some() {
                return Err(VoltaicError::parse(line, "ground net declared twice"));
            }
            netlist.ground = Some(name.to_string());
        }
        ".temp" => {
            let [value] = args else {
                return Err(VoltaicError::parse(line, ".temp expects one value"));
            };
            netlist.temperature = Some(number(value, line)?);
        }
        ".param" => {
            let [name, value] = args else {
                return Err(VoltaicError::parse(line, ".param expects a name and a value"));
            };
            netlist.params.push((name.to_string(), number(value, line)?));
        }
        ".model" => {
            let [name, class, rest @ ..] = args else {
                return Err(VoltaicError::parse(line, ".model expects a name and a device class"));
            };
            let mut props = Vec::with_capacity(rest.len());
            for word in rest {
                let (key, value) = assignment(word, line)?;
                props.push((key.to_string(), raw_value(value)));
            }
            netlist.models.push(ModelDef {
                name: name.to_string(),
                class: class.to_string(),
                props,
                line,
            });
        }
        other => {
            return Err(VoltaicError::parse(line, format!("unknown directive '{other}'")));
        }
    }
    Ok(())
}

/// `Class id node... key=value...`
fn parse_device(words: &[&str], line: usize) -> Result<DeviceLine> {
    let [class, id, rest @ ..] = words else {
        return Err(VoltaicError::parse(line, "expected a device class and an instance id"));
    };
    let mut decl = DeviceDecl::new(*class, *id, &[]);
    for word in rest {
        if word.contains('=') {
            let (key, value) = assignment(word, line)?;
            if key.eq_ignore_ascii_case("model") {
                decl.model = Some(value.to_string());
            } else {
                decl.props.push((key.to_string(), raw_value(value)));
            }
        } else if decl.props.is_empty() && decl.model.is_none() {
            decl.nodes.push(word.to_string());
        } else {
            return Err(VoltaicError::parse(
                line,
                format!("net name '{word}' after properties"),
            ));
        }
    }
    Ok(DeviceLine { decl, line })
}

fn assignment<'w>(word: &'w str, line: usize) -> Result<(&'w str, &'w str)> {
    match word.split_once('=') {
        Some((key, value)) if !key.is_empty() && !value.is_empty() => Ok((key, value)),
        _ => Err(VoltaicError::parse(line, format!("expected key=value, got '{word}'"))),
    }
}

fn number(text: &str, line: usize) -> Result<f64> {
    parse_value(text).ok_or_else(|| VoltaicError::parse(line, format!("invalid number '{text}'")))
}

/// `{name}` binds a parameter, numbers take SI suffixes, anything else is text.
fn raw_value(text: &str) -> RawValue {
    if let Some(name) = text.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
        return RawValue::Param(name.to_string());
    }
    match parse_value(text) {
        Some(v) => RawValue::Number(v),
        None => RawValue::Text(text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<Netlist> {
        Parser::new(input).parse()
    }

    #[test]
    fn test_parse_device() {
        let netlist = parse("Resistor R1 in out resistance=10k").unwrap();
        assert_eq!(netlist.devices.len(), 1);
        let decl = &netlist.devices[0].decl;
        assert_eq!(decl.class, "Resistor");
        assert_eq!(decl.id, "R1");
        assert_eq!(decl.nodes, vec!["in", "out"]);
        assert_eq!(decl.props, vec![("resistance".to_string(), RawValue::Number(10e3))]);
    }

    #[test]
    fn test_parse_values() {
        assert_eq!(raw_value("{rload}"), RawValue::Param("rload".to_string()));
        assert_eq!(raw_value("2meg"), RawValue::Number(2e6));
        assert_eq!(raw_value("pnp"), RawValue::Text("pnp".to_string()));
        assert_eq!(raw_value("-1.5"), RawValue::Number(-1.5));
    }

    #[test]
    fn test_parse_directives() {
        let netlist = parse(
            ".ground gnd\n\
             .temp 50\n\
             .param rload 2k\n\
             .model D1N4148 Diode is=2.52n n=1.752\n",
        )
        .unwrap();
        assert_eq!(netlist.ground.as_deref(), Some("gnd"));
        assert_eq!(netlist.temperature, Some(50.0));
        assert_eq!(netlist.params, vec![("rload".to_string(), 2e3)]);
        let model = &netlist.models[0];
        assert_eq!(model.name, "D1N4148");
        assert_eq!(model.class, "Diode");
        assert_eq!(model.line, 4);
        assert_eq!(model.props[1], ("n".to_string(), RawValue::Number(1.752)));
    }

    #[test]
    fn test_parse_with_comments() {
        let netlist = parse(
            "# divider\n\
             \n\
             VoltageSource V1 in 0 voltage=10 ; supply\n\
             Diode D1 out 0 model=D1N4148   # clamp\n",
        )
        .unwrap();
        assert_eq!(netlist.devices.len(), 2);
        assert_eq!(netlist.devices[0].line, 3);
        assert_eq!(netlist.devices[1].decl.model.as_deref(), Some("D1N4148"));
        assert!(netlist.devices[1].decl.props.is_empty());
    }

    #[test]
    fn test_errors_carry_line() {
        let err = parse("Resistor R1 a b\n.param x abc").unwrap_err();
        assert!(matches!(err, VoltaicError::ParseError { line: 2, .. }));

        let err = parse("\n\nResistor R1 a resistance=1 b").unwrap_err();
        assert!(matches!(err, VoltaicError::ParseError { line: 3, .. }));

        let err = parse(".subckt amp").unwrap_err();
        assert!(matches!(err, VoltaicError::ParseError { line: 1, .. }));

        let err = parse("Resistor").unwrap_err();
        assert!(matches!(err, VoltaicError::ParseError { line: 1, .. }));

        let err = parse("Resistor R1 a b resistance=").unwrap_err();
        assert!(matches!(err, VoltaicError::ParseError { line: 1, .. }));
    }
}
