use super::{utils, HartreeFock};
use crate::{
    angular::{k_range, lambda_k},
    coulomb::yk_ab,
    dirac::RadialSolver,
    orbital::Orbital,
};

/// (Fa . Fb) / (Fa . Fa) at every point where |f_a| is above `cutoff` times its peak,
/// and zero elsewhere, scaled by -x.
fn density_ratio(fa: &Orbital, fb: &Orbital, x: f64, cutoff: f64) -> Vec<f64> {
    let peak = fa.f().iter().fold(0.0f64, |acc, f| acc.max(f.abs()));
    let cut = cutoff * peak;
    let max_pt = fa.max_pt().min(fb.max_pt());

    let mut ratio = vec![0.0; fa.f().len()];
    for i in 0..max_pt {
        if fa.f()[i].abs() < cut {
            continue;
        }
        let top = fa.f()[i] * fb.f()[i] + fa.g()[i] * fb.g()[i];
        let bottom = fa.f()[i] * fa.f()[i] + fa.g()[i] * fa.g()[i];
        ratio[i] = -x * top / bottom;
    }
    ratio
}

/// Localised exchange potential for an arbitrary orbital `fa` in the field of
/// `core`:
///   v_a(r) = sum_b sum_k Lambda^k_ab y^k_ab(r) x (-(2j_b+1) occ_b) (Fa.Fb) / (Fa.Fa)
/// Multipoles are computed here, up to `k_cut`.
pub fn vex_approx(fa: &Orbital, core: &[Orbital], k_cut: i32, cutoff: f64) -> Vec<f64> {
    let mut vex = vec![0.0; fa.f().len()];
    for fb in core {
        let ratio = density_ratio(fa, fb, fb.num_electrons(), cutoff);
        let max_pt = fa.max_pt().min(fb.max_pt());
        for k in k_range(fa.kappa(), fb.kappa()) {
            if k > k_cut {
                break;
            }
            let lambda = lambda_k(k, fa.kappa(), fb.kappa());
            if lambda == 0.0 {
                continue;
            }
            log::trace!("vex_approx: y^{k} ({} {})", fb.short_symbol(), fa.short_symbol());
            let y = yk_ab(k, fb, fa);
            for i in 0..max_pt {
                vex[i] += lambda * y[i] * ratio[i];
            }
        }
    }
    vex
}

/// The exact exchange operator applied to `fa`:
///   [V_x Fa](r) = -sum_b sum_k x_b Lambda^k_ab y^k_ba(r) Fb(r)
/// where x_b = (2j_b+1) occ_b, or 2j_b+1 when b is the same state as a.
/// Multipoles are computed here, so `fa` need not be a core orbital.
pub fn vex_fa(fa: &Orbital, core: &[Orbital], k_cut: i32) -> Orbital {
    let mut vx = fa.zeroed_like();
    vx.max_pt = fa.max_pt();
    for fb in core {
        vx.max_pt = vx.max_pt.max(fb.max_pt());
        let x = if fb.same_state(fa) {
            fb.twojp1() as f64
        } else {
            fb.num_electrons()
        };
        for k in k_range(fa.kappa(), fb.kappa()) {
            if k > k_cut {
                break;
            }
            let lambda = lambda_k(k, fa.kappa(), fb.kappa());
            if lambda == 0.0 {
                continue;
            }
            let y = yk_ab(k, fb, fa);
            let factor = -x * lambda;
            for i in 0..fb.max_pt() {
                let v = factor * y[i];
                vx.f[i] += v * fb.f()[i];
                vx.g[i] += v * fb.g()[i];
            }
        }
    }
    vx
}

impl<S: RadialSolver> HartreeFock<S> {
    /// The localised exchange potential of the core orbital `fa`, built from the
    /// multipole table. Zero for methods without explicit exchange.
    ///
    /// The b = a term needs no division by the density and is exact; it uses
    /// x = 2j_a+1 regardless of the occupation.
    pub fn vex_approx_core(&self, fa: &Orbital) -> Vec<f64> {
        let mut vex = vec![0.0; self.grid.num_points()];
        if !self.config.method.includes_exchange() {
            return vex;
        }

        for fb in self.core.iter().filter(|fb| !fb.same_state(fa)) {
            let ratio = density_ratio(fa, fb, fb.num_electrons(), self.config.exchange_cutoff);
            let max_pt = fa.max_pt().min(fb.max_pt());
            for k in k_range(fa.kappa(), fb.kappa()) {
                let lambda = lambda_k(k, fa.kappa(), fb.kappa());
                if lambda == 0.0 {
                    continue;
                }
                let Some(y) = self.yk.get(k, fb, fa) else {
                    continue;
                };
                for i in 0..max_pt {
                    vex[i] += lambda * y[i] * ratio[i];
                }
            }
        }

        let x = fa.twojp1() as f64;
        for k in 0..=fa.twoj() {
            let lambda = lambda_k(k, fa.kappa(), fa.kappa());
            if lambda == 0.0 {
                continue;
            }
            let y = self.yk.get(k, fa, fa).unwrap_or_else(|| {
                panic!("missing y^{k} for {} in the multipole table", fa.symbol())
            });
            for i in 0..fa.max_pt() {
                vex[i] -= lambda * y[i] * x;
            }
        }
        vex
    }

    /// The exact exchange operator applied to the core orbital `fa`, built from the
    /// multipole table. Zero for methods without explicit exchange.
    ///
    /// Panics if the table lacks a y^k for a pair of core states with non-zero
    /// angular factor, i.e. if it was not formed from the current core.
    pub fn vex_fa_core(&self, fa: &Orbital) -> Orbital {
        let mut vx = fa.zeroed_like();
        vx.max_pt = fa.max_pt();
        if !self.config.method.includes_exchange() {
            return vx;
        }

        for fb in &self.core {
            vx.max_pt = vx.max_pt.max(fb.max_pt());
            let x = if fb.same_state(fa) {
                fb.twojp1() as f64
            } else {
                fb.num_electrons()
            };
            for k in k_range(fa.kappa(), fb.kappa()) {
                let lambda = lambda_k(k, fa.kappa(), fb.kappa());
                if lambda == 0.0 {
                    continue;
                }
                let y = self.yk.get(k, fb, fa).unwrap_or_else(|| {
                    panic!("missing y^{k} for ({}, {}) in the multipole table", fb.symbol(), fa.symbol())
                });
                let factor = -x * lambda;
                for i in 0..fb.max_pt() {
                    let v = factor * y[i];
                    vx.f[i] += v * fb.f()[i];
                    vx.g[i] += v * fb.g()[i];
                }
            }
        }
        vx
    }

    /// Localised exchange potentials of every core orbital
    pub(crate) fn form_approx_vex_core(&self) -> Vec<Vec<f64>> {
        utils::par_map(&self.core, |_, fa| self.vex_approx_core(fa))
    }
}
