use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The mapping between the uniform integration variable u and the radial coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GridKind {
    /// u = ln(r)
    Logarithmic,
    /// u = r + b ln(r). Logarithmic close to the nucleus, roughly linear beyond r ~ b.
    LogLinear { b: f64 },
}

/// Parameters used to construct a [`Grid`]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridParameters {
    /// first grid point
    pub r0: f64,
    /// last grid point
    pub rmax: f64,
    pub num_points: usize,
    pub kind: GridKind,
}

impl Default for GridParameters {
    fn default() -> Self {
        Self {
            r0: 1.0e-6,
            rmax: 120.0,
            num_points: 1600,
            kind: GridKind::LogLinear { b: 4.0 },
        }
    }
}

/// An immutable radial mesh, uniform in u. Every orbital and potential array is
/// defined on the points of one shared grid.
#[derive(Clone, Debug)]
pub struct Grid {
    r: Vec<f64>,
    drdu: Vec<f64>,
    du: f64,
    kind: GridKind,
}

impl Grid {
    pub fn new(parameters: &GridParameters) -> Result<Self> {
        let &GridParameters {
            r0,
            rmax,
            num_points,
            kind,
        } = parameters;

        if r0 <= 0.0 || !r0.is_finite() {
            return Err(Error::InvalidGrid(format!("r0 must be positive, got {r0}")));
        }
        if rmax <= r0 {
            return Err(Error::InvalidGrid(format!(
                "rmax ({rmax}) must be larger than r0 ({r0})"
            )));
        }
        if num_points < 10 {
            return Err(Error::InvalidGrid(format!(
                "at least 10 points required, got {num_points}"
            )));
        }

        let (r, drdu, du) = match kind {
            GridKind::Logarithmic => {
                let du = (rmax / r0).ln() / (num_points - 1) as f64;
                let r = (0..num_points)
                    .map(|i| r0 * (i as f64 * du).exp())
                    .collect::<Vec<_>>();
                let drdu = r.clone();
                (r, drdu, du)
            }
            GridKind::LogLinear { b } => {
                if b <= 0.0 {
                    return Err(Error::InvalidGrid(format!("b must be positive, got {b}")));
                }
                let u0 = r0 + b * r0.ln();
                let du = (rmax + b * rmax.ln() - u0) / (num_points - 1) as f64;

                let mut r = Vec::with_capacity(num_points);
                let mut x = r0.ln();
                for i in 0..num_points {
                    let u = u0 + i as f64 * du;
                    x = solve_log_linear(u, b, x);
                    r.push(x.exp());
                }
                // pin the end points exactly
                r[0] = r0;
                r[num_points - 1] = rmax;

                let drdu = r.iter().map(|&r| r / (r + b)).collect();
                (r, drdu, du)
            }
        };

        Ok(Self { r, drdu, du, kind })
    }

    pub fn num_points(&self) -> usize {
        self.r.len()
    }

    pub fn r(&self) -> &[f64] {
        &self.r
    }

    pub fn drdu(&self) -> &[f64] {
        &self.drdu
    }

    pub fn du(&self) -> f64 {
        self.du
    }

    pub fn kind(&self) -> GridKind {
        self.kind
    }

    pub fn rmax(&self) -> f64 {
        self.r[self.r.len() - 1]
    }

    /// Index of the grid point closest to `r`
    pub fn index_of(&self, r: f64) -> usize {
        let upper = self.r.partition_point(|&ri| ri < r);
        if upper == 0 {
            0
        } else if upper == self.r.len() {
            self.r.len() - 1
        } else if (self.r[upper] - r) < (r - self.r[upper - 1]) {
            upper
        } else {
            upper - 1
        }
    }

    /// Integrates `values` over r. `values` may be shorter than the grid, in which case
    /// the integrand is zero beyond its last entry.
    pub fn integrate(&self, values: &[f64]) -> f64 {
        let n = values.len().min(self.num_points());
        (0..n.saturating_sub(1))
            .map(|i| self.interval(values, n, i))
            .sum()
    }

    /// Returns I_i = int_{r_0}^{r_i} values dr for every grid point
    pub fn cumulative_forward(&self, values: &[f64]) -> Vec<f64> {
        let n = values.len().min(self.num_points());
        let mut out = vec![0.0; self.num_points()];
        let mut sum = 0.0;
        for i in 0..n.saturating_sub(1) {
            sum += self.interval(values, n, i);
            out[i + 1] = sum;
        }
        for entry in out.iter_mut().skip(n) {
            *entry = sum;
        }
        out
    }

    /// Returns I_i = int_{r_i}^{r_max} values dr for every grid point
    pub fn cumulative_backward(&self, values: &[f64]) -> Vec<f64> {
        let n = values.len().min(self.num_points());
        let mut out = vec![0.0; self.num_points()];
        let mut sum = 0.0;
        for i in (0..n.saturating_sub(1)).rev() {
            sum += self.interval(values, n, i);
            out[i] = sum;
        }
        out
    }

    /// Integral over [r_i, r_{i+1}] from a four point rule in u. The stencil is centred
    /// on the interval where possible and one sided at either end.
    #[inline(always)]
    fn interval(&self, values: &[f64], n: usize, i: usize) -> f64 {
        let h = |j: usize| values[j] * self.drdu[j];
        if n < 4 {
            return 0.5 * self.du * (h(i) + h(i + 1));
        }
        if i == 0 {
            self.du / 24.0 * (9.0 * h(0) + 19.0 * h(1) - 5.0 * h(2) + h(3))
        } else if i + 2 < n {
            self.du / 24.0 * (-h(i - 1) + 13.0 * h(i) + 13.0 * h(i + 1) - h(i + 2))
        } else {
            self.du / 24.0 * (9.0 * h(i + 1) + 19.0 * h(i) - 5.0 * h(i - 1) + h(i - 2))
        }
    }
}

/// Solves e^x + b x = u for x with Newton's method, starting from `x`
fn solve_log_linear(u: f64, b: f64, mut x: f64) -> f64 {
    for _ in 0..64 {
        let ex = x.exp();
        let delta = (ex + b * x - u) / (ex + b);
        x -= delta;
        if delta.abs() < 1.0e-15 * x.abs().max(1.0) {
            break;
        }
    }
    x
}
