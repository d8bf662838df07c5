use super::{
    exchange::{vex_approx, vex_fa},
    external::CorrelationPotential,
    guess::valence_energy_guess,
    utils, ConvergenceRecord, HartreeFock, Method,
};
use crate::{dirac::RadialSolver, orbital::Orbital};

impl<S: RadialSolver> HartreeFock<S> {
    /// Solves each valence orbital in the field of the (solved) core, in parallel.
    /// Exact exchange is used for the Hartree-Fock method, with the correlation
    /// potential `sigma` added to it if given; other methods use the local potential,
    /// plus localised exchange where the method has exchange.
    ///
    /// Orbitals with zero energy are first given a guess and solved in the local
    /// potential. The returned record is that of the worst orbital.
    pub fn solve_valence(
        &self,
        valence: &mut [Orbital],
        sigma: Option<&dyn CorrelationPotential>,
    ) -> ConvergenceRecord {
        if valence.is_empty() {
            return ConvergenceRecord::default();
        }

        let results = utils::par_for_each_mut(valence, |_, fa| {
            let en0 = fa.en();
            let record = match self.config.method {
                Method::HartreeFock => self.hf_valence(fa, sigma),
                _ => self.local_valence(fa),
            };
            (record, fa.en() - en0)
        });

        if sigma.is_some() {
            for (record, delta) in &results {
                log::info!("{}: delta = {delta:8.5} eps = {:5.0e} [its = {:3}]", record.worst, record.eps, record.iterations);
            }
        }

        let (index, _) = utils::worst(results.iter().map(|(record, _)| record.eps)).unwrap_or_default();
        let record = results[index].0.clone();
        log::info!("valence: {record}");

        let tolerance = self.config.tolerance();
        if !record.converged(tolerance) {
            log::warn!("valence didn't converge: {record}");
        }
        record
    }

    /// Gives `fa` a starting energy and solves it in the local potential, if it has
    /// not been solved yet. Returns whether it had to.
    fn bootstrap_valence(&self, fa: &mut Orbital, vl: &[f64]) -> bool {
        if fa.en() != 0.0 {
            return false;
        }
        let guess = valence_energy_guess(fa.n(), fa.kappa(), self.z, &self.core);
        self.solve_bound(fa, guess, vl, 1.0e-15);
        true
    }

    /// Valence state in the local potential plus the localised exchange potential
    /// it forms with the core. Without exchange the state is solved once and the
    /// record is empty.
    pub(crate) fn local_valence(&self, fa: &mut Orbital) -> ConvergenceRecord {
        let target = 0.01 * self.config.tolerance();
        let damping = self.config.damping.valence;
        let vl = self.vlocal(fa.l());

        self.bootstrap_valence(fa, &vl);
        if !self.config.method.includes_exchange() {
            return ConvergenceRecord {
                eps: 0.0,
                iterations: 0,
                worst: fa.short_symbol(),
            };
        }

        let mut prev_en = fa.en();
        let mut it = 1;
        let mut eps;
        loop {
            let vex = vex_approx(fa, &self.core, i32::MAX, self.config.exchange_cutoff);
            let vlx = utils::add(&vl, &vex);
            let prev = fa.clone();
            self.solve_bound(fa, fa.en(), &vlx, 1.0e-15);

            eps = ((prev_en - fa.en()) / fa.en()).abs();
            prev_en = fa.en();
            if eps <= target || it >= self.config.max_iterations {
                break;
            }

            let mut damped = fa.clone() * (1.0 - damping) + &(prev * damping);
            damped.normalise();
            *fa = damped;
            it += 1;
        }

        ConvergenceRecord {
            eps,
            iterations: it,
            worst: fa.short_symbol(),
        }
    }

    /// The non-local part of the valence Hamiltonian applied to `fa`: exact exchange
    /// with the core, Breit and the correlation potential
    fn valence_vnl(&self, fa: &Orbital, sigma: Option<&dyn CorrelationPotential>) -> Orbital {
        let mut vnl = vex_fa(fa, &self.core, i32::MAX);
        if let Some(breit) = &self.breit {
            vnl += &breit.apply(fa);
        }
        if let Some(sigma) = sigma {
            vnl += &sigma.apply(fa);
        }
        vnl
    }

    /// Valence state with exact exchange (and optionally correlation). Each
    /// iteration corrects the current orbital with the Green's function of the local
    /// Hamiltonian, as for the core but with the full direct potential in the local
    /// part. A new state is first solved with localised exchange.
    pub(crate) fn hf_valence(
        &self,
        fa: &mut Orbital,
        sigma: Option<&dyn CorrelationPotential>,
    ) -> ConvergenceRecord {
        if self.core.is_empty() {
            return self.local_valence(fa);
        }

        let target = 0.001 * self.config.tolerance();
        let damping = self.config.damping.valence;
        let vl = self.vlocal(fa.l());

        // <F|v_x|F> of the localised exchange a new state was solved with
        let mut localised = None;
        if self.bootstrap_valence(fa, &vl) {
            let vex = vex_approx(fa, &self.core, i32::MAX, self.config.exchange_cutoff);
            self.solve_bound(fa, fa.en(), &utils::add(&vl, &vex), 1.0e-15);
            localised = Some(fa.overlap(&fa.apply(&vex)));
        }

        let mut prev_en = fa.en();
        let mut it = 1;
        let mut eps;
        loop {
            let vnl = self.valence_vnl(fa, sigma);
            // first-order estimate when the energy is that of the localised exchange
            let en0 = match localised.take() {
                Some(vex) => fa.en() + fa.overlap(&vnl) - vex,
                None => fa.en(),
            };
            let new = self.green_correction(fa, en0, &vl, &vnl, &self.core, None, sigma);

            eps = ((prev_en - new.en()) / new.en()).abs();
            prev_en = new.en();
            log::debug!("{new} it {it} eps {eps:.1e} ({} green its)", new.its());
            if (eps <= target && it > 1) || it >= self.config.max_iterations {
                *fa = new;
                break;
            }

            let mut damped = new * (1.0 - damping) + &(&*fa * damping);
            damped.normalise();
            *fa = damped;
            it += 1;
        }

        ConvergenceRecord {
            eps,
            iterations: it,
            worst: fa.short_symbol(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use approx::assert_relative_eq;

    use super::*;
    use crate::{
        grid::{Grid, GridParameters},
        hf::{BreitOperator, HartreeFockConfig, PolarisationPotential},
        nucleus::Nucleus,
        periodic_table::ElementType,
    };

    fn unsolved(
        nucleus: &Nucleus,
        core: &[(i32, i32)],
        valence: &[(i32, i32)],
        method: Method,
    ) -> (HartreeFock, Vec<Orbital>) {
        let grid = Arc::new(Grid::new(&GridParameters::default()).unwrap());
        let orbitals = |states: &[(i32, i32)]| {
            states
                .iter()
                .map(|&(n, kappa)| Orbital::new(n, kappa, grid.clone()))
                .collect::<Vec<_>>()
        };
        let hf = HartreeFock::new(
            grid.clone(),
            nucleus,
            orbitals(core),
            HartreeFockConfig {
                method,
                ..Default::default()
            },
        );
        (hf, orbitals(valence))
    }

    fn lithium_unsolved(method: Method) -> (HartreeFock, Vec<Orbital>) {
        unsolved(&Nucleus::point(3.0), &[(1, -1)], &[(2, -1), (2, 1), (3, -1)], method)
    }

    fn lithium(method: Method) -> (HartreeFock, Vec<Orbital>) {
        let (mut hf, valence) = lithium_unsolved(method);
        hf.solve_core();
        (hf, valence)
    }

    /// Breit stand-in: a constant shift of every orbital energy
    struct ConstantBreit(f64);

    impl BreitOperator for ConstantBreit {
        fn apply(&self, fa: &Orbital) -> Orbital {
            fa * self.0
        }
    }

    #[test]
    fn lithium_hartree_fock() {
        let (hf, mut valence) = lithium(Method::HartreeFock);
        assert_relative_eq!(hf.core()[0].en(), -2.79263, max_relative = 1.0e-5);

        let record = hf.solve_valence(&mut valence, None);
        assert!(record.converged(hf.config().tolerance()), "{record}");

        assert_relative_eq!(valence[0].en(), -0.1963207, max_relative = 1.0e-5);
        assert_relative_eq!(valence[1].en(), -0.1286387, max_relative = 1.0e-5);
        assert_relative_eq!(valence[2].en(), -0.0738010, max_relative = 1.0e-5);
        for fv in &valence {
            assert_relative_eq!(fv.norm(), 1.0, max_relative = 1.0e-10);
        }
        // core and valence s states are eigenstates of the same operator
        assert!(valence[0].overlap(&hf.core()[0]).abs() < 1.0e-3);
        assert!(valence[2].overlap(&hf.core()[0]).abs() < 1.0e-3);
    }

    #[test]
    fn correlation_deepens_valence() {
        let (hf, mut valence) = lithium(Method::HartreeFock);
        let mut brueckner = valence.clone();
        hf.solve_valence(&mut valence, None);

        let sigma = PolarisationPotential {
            alpha_d: 0.19,
            rho: 1.0,
        };
        hf.solve_valence(&mut brueckner, Some(&sigma));
        for (hf_state, br_state) in valence.iter().zip(&brueckner) {
            assert!(br_state.en() < hf_state.en());
        }
    }

    #[test]
    fn localised_exchange_valence() {
        let (hf, mut valence) = lithium(Method::ApproxHF);
        let record = hf.solve_valence(&mut valence, None);
        assert!(record.converged(hf.config().tolerance()), "{record}");
        assert_relative_eq!(valence[0].en(), -0.1963207, max_relative = 0.05);
    }

    #[test]
    fn local_methods_solve_once() {
        for method in [Method::Local, Method::Hartree] {
            let (hf, mut valence) = lithium(method);
            let record = hf.solve_valence(&mut valence, None);
            assert_eq!(record.eps, 0.0);
            assert_eq!(record.iterations, 0);
            assert!(valence.iter().all(|fv| fv.en() < 0.0));
        }
    }

    #[test]
    fn no_valence() {
        let (hf, _) = lithium(Method::HartreeFock);
        assert_eq!(hf.solve_valence(&mut [], None), ConvergenceRecord::default());
    }

    #[test]
    fn sodium_hartree_fock() {
        let sodium = ElementType::from_z(11).unwrap();
        let (mut hf, mut valence) = unsolved(
            &Nucleus::for_element(sodium),
            &[(1, -1), (2, -1), (2, 1), (2, -2)],
            &[(3, -1), (3, 1), (3, -2), (4, -1)],
            Method::HartreeFock,
        );
        hf.solve_core();

        let record = hf.solve_valence(&mut valence, None);
        assert!(record.converged(hf.config().tolerance()), "{record}");
        assert_relative_eq!(valence[0].en(), -0.182032, max_relative = 1.0e-4);
        assert_relative_eq!(valence[1].en(), -0.109490, max_relative = 1.0e-4);
        // fine structure: 3p_3/2 just above 3p_1/2
        assert!(valence[2].en() > valence[1].en());
        assert!(valence[2].en() - valence[1].en() < 1.0e-3);
        assert!(valence[3].en() > valence[0].en() && valence[3].en() < 0.0);
        for fv in &valence {
            assert_relative_eq!(fv.norm(), 1.0, max_relative = 1.0e-10);
        }

        // the localised exchange is close, but not exact
        let mut localised = valence
            .iter()
            .map(|fv| Orbital::new(fv.n(), fv.kappa(), hf.grid().clone()))
            .collect::<Vec<_>>();
        for fv in localised.iter_mut() {
            hf.local_valence(fv);
        }
        for (exact, approx) in valence.iter().zip(&localised) {
            assert_relative_eq!(exact.en(), approx.en(), max_relative = 0.05);
        }
    }

    #[test]
    fn breit_shifts_core_and_valence() {
        let c = -2.0e-3;
        let (plain, mut valence) = lithium(Method::HartreeFock);
        plain.solve_valence(&mut valence, None);

        let (hf, mut shifted) = lithium_unsolved(Method::HartreeFock);
        let mut hf = hf.with_breit(ConstantBreit(c));
        hf.solve_core();
        assert_relative_eq!(hf.core()[0].en(), plain.core()[0].en() + c, max_relative = 1.0e-7);

        hf.solve_valence(&mut shifted, None);
        for (fv, fb) in valence.iter().zip(&shifted) {
            assert_relative_eq!(fb.en(), fv.en() + c, max_relative = 1.0e-6);
            assert_relative_eq!(fb.overlap(fv), 1.0, max_relative = 1.0e-6);
        }
    }
}
