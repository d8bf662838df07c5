use super::{exchange::vex_fa, external::CorrelationPotential, HartreeFock};
use crate::{
    dirac::{GreenPair, Potential, RadialSolver},
    orbital::Orbital,
};

/// The Green's function of (H - E) for one state, at one energy, in a local potential
struct Green<'a, S: RadialSolver> {
    solver: &'a S,
    pair: GreenPair,
    alpha: f64,
}

impl<'a, S: RadialSolver> Green<'a, S> {
    fn new(solver: &'a S, state: &Orbital, en: f64, potential: Potential<'_>, alpha: f64) -> Self {
        let pair = solver.solve_inhomogeneous(state, en, potential, alpha);
        Self { solver, pair, alpha }
    }

    /// F with (H - E) F = S
    fn apply(&self, source: &Orbital) -> Orbital {
        let mut out = source.zeroed_like();
        self.solver.green_solution(&mut out, &self.pair, source, self.alpha);
        out
    }
}

impl<S: RadialSolver> HartreeFock<S> {
    /// Solves (H_l + V_nl - E) F = 0 given F0 = `fa`, the local potential `vl`, the
    /// non-local term applied to F0 and an estimate `en0` of the energy. Used for
    /// both core and valence states.
    ///
    /// F = F0 + Delta and E = en0 + shift are found together: each step applies G (at
    /// en0) to the energy shift and to the linear response of the non-local operator
    /// to the part of Delta orthogonal to F0. The response operator is the k <= 1
    /// exchange with `core`, the local `dv0` (the part of the direct potential left
    /// out of `vl` for core states), Breit and `sigma`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn green_correction(
        &self,
        fa: &Orbital,
        en0: f64,
        vl: &[f64],
        vnl: &Orbital,
        core: &[Orbital],
        dv0: Option<&[f64]>,
        sigma: Option<&dyn CorrelationPotential>,
    ) -> Orbital {
        let potential = Potential::with_magnetic(vl, self.h_mag(fa.l()));
        let green = Green::new(&self.solver, fa, en0, potential, self.config.alpha);

        let response = |delta: &Orbital| {
            let mut out = vex_fa(delta, core, 1);
            if let Some(dv0) = dv0 {
                out += &delta.apply(dv0);
            }
            if let Some(breit) = &self.breit {
                out += &breit.apply(delta);
            }
            if let Some(sigma) = sigma {
                out += &sigma.apply(delta);
            }
            out
        };

        let base = green.apply(&-vnl.clone()) - fa;
        let mut delta = base.clone();
        let mut shift = 0.0;
        let mut eps = f64::INFINITY;
        let mut tries = 0;
        while tries < self.config.green_max_tries {
            let trial = fa.clone() + &delta;
            let d = green.apply(&trial);
            let de = 0.5 * (1.0 - trial.overlap(&trial)) / trial.overlap(&d);
            if !de.is_finite() {
                log::warn!("{}: green correction broke down at try {tries}", fa.short_symbol());
                break;
            }
            shift += de;

            let perp = delta.clone() - &(fa * fa.overlap(&delta));
            let source = &trial * shift - &response(&perp);
            delta = base.clone() + &green.apply(&source);

            eps = (de / (en0 + shift)).abs();
            tries += 1;
            if eps < self.config.green_epsilon && tries > 1 {
                break;
            }
        }

        let mut out = fa.clone() + &delta;
        out.en = en0 + shift;
        out.eps = eps;
        out.its = tries;
        out.normalise();
        out
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use approx::assert_relative_eq;

    use super::*;
    use crate::{
        grid::{Grid, GridParameters},
        hf::{HartreeFockConfig, Method},
        nucleus::Nucleus,
    };

    // A constant shift c is a non-local operator whose action on F0 is c F0: the exact
    // solution is F0 itself, with energy E0 + c.
    fn shifted_hydrogenic(c: f64) -> (HartreeFock, Orbital, Orbital) {
        let grid = Arc::new(Grid::new(&GridParameters::default()).unwrap());
        let hf = HartreeFock::new(
            grid.clone(),
            &Nucleus::point(2.0),
            Vec::new(),
            HartreeFockConfig {
                method: Method::HartreeFock,
                green_epsilon: 1.0e-12,
                green_max_tries: 50,
                ..Default::default()
            },
        );
        let mut bound = Orbital::new(1, -1, grid);
        hf.solve_bound(&mut bound, -2.0, hf.vnuc(), 1.0e-15);
        let vnl = &bound * c;
        (hf, bound, vnl)
    }

    #[test]
    fn green_correction_of_constant_shift() {
        let c = 0.1;
        let (hf, bound, vnl) = shifted_hydrogenic(c);

        let en0 = bound.en() + 0.9 * c;
        let corrected = hf.green_correction(&bound, en0, hf.vnuc(), &vnl, &[], None, None);
        assert_relative_eq!(corrected.en(), bound.en() + c, max_relative = 1.0e-8);
        assert_relative_eq!(corrected.overlap(&bound), 1.0, max_relative = 1.0e-6);
        assert_relative_eq!(corrected.norm(), 1.0, max_relative = 1.0e-12);
        assert!(corrected.its() < 50);
    }

    // sigma = c is the same shift, now known to the response as well
    struct Shift(f64);

    impl CorrelationPotential for Shift {
        fn apply(&self, fa: &Orbital) -> Orbital {
            fa * self.0
        }
    }

    #[test]
    fn green_correction_with_correlation_response() {
        let c = 0.1;
        let (hf, bound, vnl) = shifted_hydrogenic(c);
        let zero = vec![0.0; hf.grid().num_points()];

        let en0 = bound.en() + 0.9 * c;
        let sigma: &dyn CorrelationPotential = &Shift(c);
        let corrected = hf.green_correction(&bound, en0, hf.vnuc(), &vnl, &[], Some(zero.as_slice()), Some(sigma));
        assert_relative_eq!(corrected.en(), bound.en() + c, max_relative = 1.0e-8);
        assert_relative_eq!(corrected.overlap(&bound), 1.0, max_relative = 1.0e-6);
    }
}
