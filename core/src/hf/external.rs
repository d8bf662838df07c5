use serde::{Deserialize, Serialize};

use crate::orbital::Orbital;

/// A correlation potential Sigma. Its action on an orbital is added to the non-local
/// source term when solving valence states.
pub trait CorrelationPotential: Sync {
    fn apply(&self, fa: &Orbital) -> Orbital;
}

/// A Breit interaction operator, added to the non-local source term of core and
/// valence orbitals.
pub trait BreitOperator: Sync {
    fn apply(&self, fa: &Orbital) -> Orbital;
}

/// The local core polarisation potential -alpha_d / (2 (r^2 + rho^2)^2), a simple
/// stand-in for the second-order correlation potential.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolarisationPotential {
    /// static dipole polarisability of the core
    pub alpha_d: f64,
    /// cut-off radius
    pub rho: f64,
}

impl PolarisationPotential {
    pub fn potential(&self, r: &[f64]) -> Vec<f64> {
        r.iter()
            .map(|r| -0.5 * self.alpha_d / (r * r + self.rho * self.rho).powi(2))
            .collect()
    }
}

impl CorrelationPotential for PolarisationPotential {
    fn apply(&self, fa: &Orbital) -> Orbital {
        fa.apply(&self.potential(fa.grid().r()))
    }
}

/// Radiative (QED) corrections as local potentials. The electric part may depend on
/// l; the last entry is used for all larger l. The magnetic part enters the radial
/// equation through the off-diagonal kappa/r terms.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RadiativePotential {
    electric: Vec<Vec<f64>>,
    magnetic: Option<Vec<f64>>,
}

impl RadiativePotential {
    pub fn new(electric: Vec<Vec<f64>>, magnetic: Option<Vec<f64>>) -> Self {
        Self { electric, magnetic }
    }

    pub fn electric(&self, l: i32) -> &[f64] {
        let index = (l.max(0) as usize).min(self.electric.len().saturating_sub(1));
        self.electric.get(index).map_or(&[], Vec::as_slice)
    }

    pub fn magnetic(&self, _l: i32) -> Option<&[f64]> {
        self.magnetic.as_deref()
    }
}
