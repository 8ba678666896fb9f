//! Physical constants, units and SI-prefixed number formatting/parsing.

use std::fmt;

/// Boltzmann constant (J/K)
pub const BOLTZMANN: f64 = 1.380649e-23;

/// Elementary charge (C)
pub const ELECTRON_CHARGE: f64 = 1.602176634e-19;

/// Offset between °C and K
pub const CELSIUS_TO_KELVIN: f64 = 273.15;

/// Thermal voltage kT/q at the given absolute temperature.
pub fn thermal_voltage(kelvin: f64) -> f64 {
    BOLTZMANN * kelvin / ELECTRON_CHARGE
}

/// Physical unit of a reported quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Volt,
    Ampere,
    Watt,
    Coulomb,
    Siemens,
    Dimensionless,
}

impl Unit {
    /// Unit symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Volt => "V",
            Unit::Ampere => "A",
            Unit::Watt => "W",
            Unit::Coulomb => "C",
            Unit::Siemens => "S",
            Unit::Dimensionless => "",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

const PREFIXES: [&str; 11] = ["f", "p", "n", "µ", "m", "", "k", "M", "G", "T", "P"];

/// Format a value scaled to the nearest SI prefix.
///
/// The scaled mantissa is rounded to `precision` decimals and trailing zeros
/// are trimmed: `0.0050000001` becomes `5m`, `0.77423050` becomes `774.231m`.
pub fn format_si(value: f64, precision: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value.abs() < 1e-24 {
        return "0".to_string();
    }

    let mut degree = ((value.abs().log10() / 3.0).floor() as i32).clamp(-5, 5);
    let mut text = scaled_mantissa(value, degree, precision);

    // Rounding can carry into the next prefix (999.9996m -> 1000m -> 1)
    if degree < 5 && text.trim_start_matches('-').parse::<f64>().unwrap_or(0.0) >= 1000.0 {
        degree += 1;
        text = scaled_mantissa(value, degree, precision);
    }

    format!("{}{}", text, PREFIXES[(degree + 5) as usize])
}

fn scaled_mantissa(value: f64, degree: i32, precision: usize) -> String {
    let scaled = value / 10f64.powi(degree * 3);
    let s = format!("{0:.1$}", scaled, precision);
    let s = if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    };
    if s == "-0" {
        "0".to_string()
    } else {
        s
    }
}

/// Parse a number with an optional SI suffix (`10k`, `4.7u`, `2meg`).
pub fn parse_value(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let lower = text.to_ascii_lowercase();
    if let Some(num) = lower.strip_suffix("meg") {
        return num.parse::<f64>().ok().map(|v| v * 1e6);
    }

    let last = text.chars().last()?;
    let mult = match last {
        'f' => 1e-15,
        'p' => 1e-12,
        'n' => 1e-9,
        'u' | 'µ' => 1e-6,
        'm' => 1e-3,
        'k' | 'K' => 1e3,
        'M' => 1e6,
        'G' => 1e9,
        'T' => 1e12,
        _ => 1.0,
    };
    let num_str = if mult != 1.0 {
        &text[..text.len() - last.len_utf8()]
    } else {
        text
    };

    num_str.parse::<f64>().ok().map(|v| v * mult)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_format_si() {
        assert_eq!(format_si(5.0, 3), "5");
        assert_eq!(format_si(-0.005, 3), "-5m");
        assert_eq!(format_si(0.025, 3), "25m");
        assert_eq!(format_si(0.774_230_503, 3), "774.231m");
        assert_eq!(format_si(1.667_573_39, 3), "1.668");
        assert_eq!(format_si(0.1, 3), "100m");
        assert_eq!(format_si(4.7e-6, 3), "4.7µ");
        assert_eq!(format_si(12_000.0, 3), "12k");
        assert_eq!(format_si(0.0, 3), "0");
    }

    #[test]
    fn test_format_si_rounding_carries_prefix() {
        assert_eq!(format_si(0.999_999_9, 3), "1");
        assert_eq!(format_si(-0.000_999_999_9, 3), "-1m");
    }

    #[test]
    fn test_parse_value() {
        assert_relative_eq!(parse_value("10k").unwrap(), 10_000.0);
        assert_relative_eq!(parse_value("100n").unwrap(), 100e-9);
        assert_relative_eq!(parse_value("4.7u").unwrap(), 4.7e-6);
        assert_relative_eq!(parse_value("2meg").unwrap(), 2e6);
        assert_relative_eq!(parse_value("1M").unwrap(), 1e6);
        assert_relative_eq!(parse_value("1e-9").unwrap(), 1e-9);
        assert_relative_eq!(parse_value("-2.5").unwrap(), -2.5);
        assert_eq!(parse_value("npn"), None);
        assert_eq!(parse_value(""), None);
    }

    #[test]
    fn test_thermal_voltage_at_room_temperature() {
        assert_relative_eq!(thermal_voltage(300.15), 0.025_864_9, epsilon = 1e-7);
    }
}
