//! PN junction law shared by diodes, BJTs, JFET gates and MOSFET bodies.
//!
//! Uses the Shockley equation restricted to forward bias:
//!   I = Is * (exp(V / Vt) - 1)   for V >= 0
//!   I = 0                        for V < 0
//!
//! For Newton-Raphson iteration the junction is linearized around the
//! current operating point:
//!   I ≈ I0 + G * (V - V0),   G = dI/dV = Is/Vt * exp(V0/Vt)
//!
//! A conductance floor (`gmin`) is stamped in parallel by the caller so a
//! reverse-biased junction never leaves a node floating.

use std::f64::consts::SQRT_2;

use crate::circuit::Environment;
use crate::units::thermal_voltage;

use super::DeviceState;

/// Silicon band gap (eV).
pub const SILICON_EG: f64 = 1.11;
/// Silicon saturation current temperature exponent.
pub const SILICON_XTI: f64 = 3.0;

/// State slots one junction occupies, starting at its base slot.
pub const JUNCTION_SLOTS: usize = 3;

/// Temperature-scaled constants of one junction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Junction {
    /// Saturation current at circuit temperature
    pub is: f64,
    /// Emission coefficient times thermal voltage
    pub vt: f64,
    /// Voltage above which steps are limited
    pub vcrit: f64,
}

impl Junction {
    /// Scale a junction measured at the nominal temperature to the circuit
    /// temperature.
    ///
    /// Is(T) = Is * (T/Tnom)^(XTI/N) * exp(Eg / (N*k*T/q) * (T/Tnom - 1))
    pub fn new(is: f64, n: f64, eg: f64, xti: f64, env: &Environment) -> Self {
        let t = env.kelvin();
        let ratio = t / env.nominal_kelvin();
        let vt = n * thermal_voltage(t);
        let is_t = is * ratio.powf(xti / n) * (eg / vt * (ratio - 1.0)).exp();
        Self {
            is: is_t,
            vt,
            vcrit: critical_voltage(is_t, vt),
        }
    }

    /// Junction current at `v`.
    pub fn current(&self, v: f64) -> f64 {
        if v >= 0.0 {
            self.is * ((v / self.vt).exp() - 1.0)
        } else {
            0.0
        }
    }

    /// dI/dV at `v`.
    pub fn conductance(&self, v: f64) -> f64 {
        if v >= 0.0 {
            self.is / self.vt * (v / self.vt).exp()
        } else {
            0.0
        }
    }

    /// Current and conductance at `v`.
    pub fn evaluate(&self, v: f64) -> (f64, f64) {
        (self.current(v), self.conductance(v))
    }

    /// Store the constants in `state[at..at + JUNCTION_SLOTS]`.
    pub fn store(&self, state: &mut DeviceState, at: usize) {
        state[at] = self.is;
        state[at + 1] = self.vt;
        state[at + 2] = self.vcrit;
    }

    /// Read constants written by [`Junction::store`].
    pub fn load(state: &DeviceState, at: usize) -> Self {
        Self {
            is: state[at],
            vt: state[at + 1],
            vcrit: state[at + 2],
        }
    }

    /// Limit a proposed voltage relative to the previous iterate.
    pub fn limit(&self, v_new: f64, v_old: f64) -> f64 {
        limit_junction_voltage(v_new, v_old, self.vt, self.vcrit)
    }
}

/// Vcrit = Vt * ln(Vt / (sqrt(2) * Is))
pub fn critical_voltage(is: f64, vt: f64) -> f64 {
    vt * (vt / (SQRT_2 * is)).ln()
}

/// Damp a junction voltage step.
///
/// Above `vcrit`, a step larger than `2*vt` is compressed logarithmically
/// around the previous voltage. When the previous voltage is not forward
/// biased there is nothing to step from, so the iterate restarts at `vcrit`.
pub fn limit_junction_voltage(v_new: f64, v_old: f64, vt: f64, vcrit: f64) -> f64 {
    let delta = v_new - v_old;
    if v_new > vcrit && delta.abs() > 2.0 * vt {
        if v_old > 0.0 {
            let step = vt * (2.0 + ((delta / vt).abs() - 2.0).ln());
            if delta > 0.0 {
                v_old + step
            } else {
                v_old - step
            }
        } else {
            vcrit
        }
    } else {
        v_new
    }
}
