//! Closed-form screening potentials used to start a calculation.
//!
//! Both return the electronic part only: a positive potential going to (Z-1)/r far
//! from the nucleus, so that v_nuc + v_el looks like -1/r to an outer electron.

use serde::{Deserialize, Serialize};

/// A parametric electronic potential. Parameters left as `None` take their default
/// value for the nuclear charge.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ParametricPotential {
    Green { h: Option<f64>, d: Option<f64> },
    Tietz { t: Option<f64>, g: Option<f64> },
}

impl Default for ParametricPotential {
    fn default() -> Self {
        Self::Green { h: None, d: None }
    }
}

impl ParametricPotential {
    pub fn build(&self, z: f64, r: &[f64]) -> Vec<f64> {
        match *self {
            Self::Green { h, d } => {
                let (h0, d0) = green_default_parameters(z);
                green(z, h.unwrap_or(h0), d.unwrap_or(d0), r)
            }
            Self::Tietz { t, g } => {
                let (t0, g0) = tietz_default_parameters(z);
                tietz(z, t.unwrap_or(t0), g.unwrap_or(g0), r)
            }
        }
    }
}

/// (H, d) for the Green potential: d = 0.4 Z^0.3, H = d (Z-1)^0.4
pub fn green_default_parameters(z: f64) -> (f64, f64) {
    let d = 0.4 * z.powf(0.3);
    let h = d * (z - 1.0).max(0.0).powf(0.4);
    (h, d)
}

/// (t, g) for the Tietz potential. t follows the Tietz fit to the Thomas-Fermi
/// screening function, which has no exponential tail.
pub fn tietz_default_parameters(z: f64) -> (f64, f64) {
    (0.6057 * z.cbrt(), 0.0)
}

/// Green potential: V(r) = (Z-1)/r x h/(1+h), h = H (e^(r/d) - 1)
pub fn green(z: f64, h: f64, d: f64, r: &[f64]) -> Vec<f64> {
    r.iter()
        .map(|&r| {
            // ratio tends to one well before e^(r/d) overflows
            let x = h * ((r / d).min(500.0).exp_m1());
            (z - 1.0) / r * x / (1.0 + x)
        })
        .collect()
}

/// Tietz potential: V(r) = (Z-1)/r x [1 - e^(-g r) / (1 + t r)^2]
pub fn tietz(z: f64, t: f64, g: f64, r: &[f64]) -> Vec<f64> {
    r.iter()
        .map(|&r| (z - 1.0) / r * (1.0 - (-g * r).exp() / (1.0 + t * r).powi(2)))
        .collect()
}
