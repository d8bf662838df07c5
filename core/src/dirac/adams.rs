use std::collections::VecDeque;

use nalgebra::{Matrix2, Vector2};

use super::{GreenPair, Potential, RadialSolver};
use crate::{
    grid::Grid,
    orbital::{l_of, Orbital},
};

/// Adams-Moulton weights, lowest order first. Entry 0 multiplies the derivative at
/// the new point, entry j the derivative j steps back.
const AM_COEFFICIENTS: [&[f64]; 5] = [
    &[1.0 / 2.0, 1.0 / 2.0],
    &[5.0 / 12.0, 8.0 / 12.0, -1.0 / 12.0],
    &[9.0 / 24.0, 19.0 / 24.0, -5.0 / 24.0, 1.0 / 24.0],
    &[
        251.0 / 720.0,
        646.0 / 720.0,
        -264.0 / 720.0,
        106.0 / 720.0,
        -19.0 / 720.0,
    ],
    &[
        475.0 / 1440.0,
        1427.0 / 1440.0,
        -798.0 / 1440.0,
        482.0 / 1440.0,
        -173.0 / 1440.0,
        27.0 / 1440.0,
    ],
];

const MAX_ORDER: usize = AM_COEFFICIENTS.len();

/// lambda (r - r_ctp) at which the wavefunction is treated as zero
const ASYMPTOTIC_DECAY: f64 = 45.0;

/// Implicit, self-starting Adams-Moulton integration of the radial Dirac equation on
/// the uniform u grid.
///
/// With Y = (f, g), dY/du = dr/du D(r) Y, where
///   D = [[-(kappa/r + alpha H), alpha (E - V) + 2/alpha], [-alpha (E - V), kappa/r + alpha H]]
#[derive(Clone, Copy, Debug)]
pub struct AdamsMoulton {
    /// cap on energy iterations for a bound state
    pub max_iterations: usize,
}

impl Default for AdamsMoulton {
    fn default() -> Self {
        Self { max_iterations: 100 }
    }
}

struct DiracMatrix<'a> {
    grid: &'a Grid,
    potential: Potential<'a>,
    kappa: f64,
    en: f64,
    alpha: f64,
}

impl DiracMatrix<'_> {
    /// dr/du D at grid point i
    #[inline(always)]
    fn at(&self, i: usize) -> Matrix2<f64> {
        let r = self.grid.r()[i];
        let h = self.potential.h_mag.map_or(0.0, |h| h[i]);
        let a = -(self.kappa / r + self.alpha * h);
        let e_minus_v = self.en - self.potential.v[i];
        let b = self.alpha * e_minus_v + 2.0 / self.alpha;
        let c = -self.alpha * e_minus_v;
        Matrix2::new(a, b, c, -a) * self.grid.drdu()[i]
    }

    /// Integrates from `from` to `to` (either direction, inclusive), writing every
    /// point visited into f and g.
    fn integrate(&self, from: usize, to: usize, y0: Vector2<f64>, f: &mut [f64], g: &mut [f64]) {
        let step = if to >= from {
            self.grid.du()
        } else {
            -self.grid.du()
        };

        let mut y = y0;
        f[from] = y.x;
        g[from] = y.y;
        let mut history = VecDeque::with_capacity(MAX_ORDER + 1);
        history.push_back(self.at(from) * y);

        let mut i = from;
        while i != to {
            let next = if to > from { i + 1 } else { i - 1 };
            let order = history.len().min(MAX_ORDER);
            let coefficients = AM_COEFFICIENTS[order - 1];

            let mut rhs = y;
            for (j, dy) in history.iter().rev().take(order).enumerate() {
                rhs += dy * (step * coefficients[j + 1]);
            }

            let d = self.at(next);
            let lhs = Matrix2::identity() - d * (step * coefficients[0]);
            // the step matrix is I + O(du), so it is always invertible on a sane grid
            y = lhs.try_inverse().map_or(rhs, |inverse| inverse * rhs);

            f[next] = y.x;
            g[next] = y.y;
            history.push_back(d * y);
            if history.len() > MAX_ORDER {
                history.pop_front();
            }
            i = next;
        }
    }
}

/// Classical turning point and practical infinity for a state of angular momentum l
/// at energy en.
fn turning_points(grid: &Grid, l: i32, en: f64, v: &[f64], alpha: f64) -> (usize, usize) {
    let num_points = grid.num_points();
    let r = grid.r();
    let centrifugal = (l * (l + 1)) as f64 / 2.0;

    let ctp = (0..num_points)
        .rev()
        .find(|&i| v[i] + centrifugal / (r[i] * r[i]) < en)
        .unwrap_or(num_points / 2)
        .clamp(20, num_points - 10);

    let lambda = decay_constant(en, alpha);
    let pinf = (ctp + 5..num_points)
        .find(|&i| lambda * (r[i] - r[ctp]) > ASYMPTOTIC_DECAY)
        .unwrap_or(num_points - 1);

    (ctp, pinf)
}

/// lambda = sqrt(-2E - alpha^2 E^2), the asymptotic decay constant of a bound state
fn decay_constant(en: f64, alpha: f64) -> f64 {
    (-2.0 * en - alpha * alpha * en * en).max(1.0e-12).sqrt()
}

/// (f, g) at the first grid point for a regular solution in the potential v
fn outward_start(kappa: i32, grid: &Grid, v: &[f64], alpha: f64) -> Vector2<f64> {
    let z_eff = (-grid.r()[0] * v[0]).max(1.0e-6);
    let az = alpha * z_eff;
    let kappa = kappa as f64;
    let gamma = (kappa * kappa - az * az).max(0.0).sqrt();
    let ratio = if kappa < 0.0 {
        -az / (gamma - kappa)
    } else {
        (gamma + kappa) / az
    };
    Vector2::new(1.0, ratio)
}

/// (f, g) at the practical infinity for a solution decaying as e^(-lambda r)
fn inward_start(en: f64, alpha: f64) -> Vector2<f64> {
    let lambda = decay_constant(en, alpha);
    Vector2::new(1.0, -alpha * lambda / (2.0 + alpha * alpha * en))
}

/// A trial solution at fixed energy, matched in f at the classical turning point
struct Trial {
    f: Vec<f64>,
    g: Vec<f64>,
    ctp: usize,
    pinf: usize,
    /// g from the outward solution at the turning point
    g_out: f64,
    /// g from the (rescaled) inward solution at the turning point
    g_in: f64,
    nodes: i32,
}

impl AdamsMoulton {
    fn trial(&self, kappa: i32, grid: &Grid, en: f64, potential: Potential<'_>, alpha: f64) -> Trial {
        let num_points = grid.num_points();
        let (ctp, pinf) = turning_points(grid, l_of(kappa), en, potential.v, alpha);
        let dirac = DiracMatrix {
            grid,
            potential,
            kappa: kappa as f64,
            en,
            alpha,
        };

        let mut f = vec![0.0; num_points];
        let mut g = vec![0.0; num_points];
        dirac.integrate(0, ctp, outward_start(kappa, grid, potential.v, alpha), &mut f, &mut g);
        let (f_out, g_out) = (f[ctp], g[ctp]);

        let mut fi = vec![0.0; num_points];
        let mut gi = vec![0.0; num_points];
        dirac.integrate(pinf, ctp, inward_start(en, alpha), &mut fi, &mut gi);

        let scale = f_out / fi[ctp];
        for i in ctp + 1..=pinf {
            f[i] = scale * fi[i];
            g[i] = scale * gi[i];
        }
        let g_in = scale * gi[ctp];

        let nodes = (1..=pinf).filter(|&i| f[i] * f[i - 1] < 0.0).count() as i32;

        Trial {
            f,
            g,
            ctp,
            pinf,
            g_out,
            g_in,
            nodes,
        }
    }
}

impl RadialSolver for AdamsMoulton {
    fn solve_bound(
        &self,
        orbital: &mut Orbital,
        en_guess: f64,
        potential: Potential<'_>,
        alpha: f64,
        tolerance: f64,
    ) {
        let grid = orbital.grid().clone();
        let required_nodes = orbital.n - orbital.l() - 1;

        let mut en = if en_guess < 0.0 {
            en_guess
        } else {
            -0.5 / (orbital.n * orbital.n) as f64
        };
        let (mut en_lo, mut en_hi) = (f64::NEG_INFINITY, 0.0f64);
        let mut eps = f64::INFINITY;
        let mut its = 0;
        let mut trial = None;

        while its < self.max_iterations {
            its += 1;
            let current = self.trial(orbital.kappa, &grid, en, potential, alpha);

            let new_en = if current.nodes != required_nodes {
                if current.nodes > required_nodes {
                    en_hi = en_hi.min(en);
                    if en_lo.is_finite() {
                        0.5 * (en + en_lo)
                    } else {
                        1.25 * en
                    }
                } else {
                    en_lo = en_lo.max(en);
                    if en_hi < 0.0 {
                        0.5 * (en + en_hi)
                    } else {
                        0.8 * en
                    }
                }
            } else {
                let norm = grid.integrate(
                    &(0..=current.pinf)
                        .map(|i| current.f[i] * current.f[i] + current.g[i] * current.g[i])
                        .collect::<Vec<_>>(),
                );
                let de = current.f[current.ctp] * (current.g_out - current.g_in) / (alpha * norm);
                let proposed = en + de;
                if proposed >= en_hi || proposed <= en_lo {
                    0.5 * (en + if de > 0.0 { en_hi } else { en_lo })
                } else {
                    proposed
                }
            };

            let matched = current.nodes == required_nodes;
            eps = ((new_en - en) / en).abs();
            en = new_en;
            trial = Some(current);
            if matched && eps < tolerance {
                break;
            }
        }

        if eps >= tolerance {
            log::debug!(
                "{}: bound state not converged after {its} iterations (eps = {eps:.2e})",
                orbital.short_symbol()
            );
        }

        if let Some(Trial { f, g, pinf, .. }) = trial {
            orbital.f = f;
            orbital.g = g;
            orbital.max_pt = pinf + 1;
        }
        orbital.en = en;
        orbital.eps = eps;
        orbital.its = its;
        orbital.normalise();
    }

    fn solve_inhomogeneous(
        &self,
        orbital: &Orbital,
        en: f64,
        potential: Potential<'_>,
        alpha: f64,
    ) -> GreenPair {
        let grid = orbital.grid().clone();
        let (ctp, pinf) = turning_points(&grid, orbital.l(), en, potential.v, alpha);
        let dirac = DiracMatrix {
            grid: &grid,
            potential,
            kappa: orbital.kappa as f64,
            en,
            alpha,
        };

        let mut regular = orbital.zeroed_like();
        let mut irregular = orbital.zeroed_like();
        dirac.integrate(
            0,
            pinf,
            outward_start(orbital.kappa, &grid, potential.v, alpha),
            &mut regular.f,
            &mut regular.g,
        );
        dirac.integrate(
            pinf,
            0,
            inward_start(en, alpha),
            &mut irregular.f,
            &mut irregular.g,
        );
        for solution in [&mut regular, &mut irregular] {
            solution.en = en;
            solution.max_pt = pinf + 1;
        }

        let wronskian =
            regular.f[ctp] * irregular.g[ctp] - irregular.f[ctp] * regular.g[ctp];

        GreenPair {
            regular,
            irregular,
            wronskian,
            energy: en,
        }
    }
}
