use std::mem;

use super::{guess::core_energy_guess, utils, ConvergenceRecord, HartreeFock, Method, Rescale, ScfState};
use crate::{dirac::RadialSolver, orbital::Orbital, parametric::ParametricPotential};

/// Energy tolerance for the bound-state solves inside an SCF iteration; the
/// orbitals are re-solved more tightly once the loop ends.
const ITERATION_SOLVE_TOLERANCE: f64 = 1.0e-7;

impl<S: RadialSolver> HartreeFock<S> {
    /// Solves the core self-consistently with the configured method.
    ///
    /// Non-convergence is not an error: the returned record holds the achieved
    /// tolerance, and a warning is logged if it is above both the target and 1e-6.
    pub fn solve_core(&mut self) -> ConvergenceRecord {
        let tolerance = self.config.tolerance();
        if self.core.is_empty() {
            self.state = ScfState::Converged;
            return ConvergenceRecord::default();
        }

        log::info!("{}", self.config.method);

        let (record, converged) = if self.num_core_electrons() <= 1.0 {
            // nothing to be self-consistent with
            self.vdir = vec![0.0; self.grid.num_points()];
            let record = self.resolve_core(tolerance, false);
            self.yk.calculate(&self.core);
            let converged = record.eps <= tolerance;
            (record, converged)
        } else {
            self.set_parametric_potential();
            match self.config.method {
                Method::HartreeFock => {
                    self.solve_initial_core(1.0e-5);
                    self.update_vdir(Rescale::Yes);
                    self.hf_approx_core(1.0e-8);
                    self.yk.calculate(&self.core);
                    let vex_zero = utils::par_map(&self.core, |_, fz| fz.apply(&self.vex_approx_core(fz)));
                    self.hartree_fock_core(vex_zero)
                }
                Method::ApproxHF => {
                    self.solve_initial_core(1.0e-7);
                    self.update_vdir(Rescale::Yes);
                    let outcome = self.hf_approx_core(tolerance);
                    self.yk.calculate(&self.core);
                    outcome
                }
                Method::Hartree | Method::KohnSham => {
                    self.solve_initial_core(1.0e-7);
                    self.update_vdir(Rescale::Yes);
                    let outcome = self.local_core(tolerance);
                    self.yk.calculate(&self.core);
                    outcome
                }
                Method::Local => {
                    let record = self.solve_initial_core(1.0e-16);
                    self.yk.calculate(&self.core);
                    let converged = record.eps <= tolerance;
                    (record, converged)
                }
            }
        };

        self.finish(record, converged, "core")
    }

    /// Runs the SCF loop of the configured method once more, starting from the
    /// current core. On an already converged core this takes a single iteration.
    pub fn iterate_core(&mut self) -> ConvergenceRecord {
        let tolerance = self.config.tolerance();
        if self.core.is_empty() {
            self.state = ScfState::Converged;
            return ConvergenceRecord::default();
        }
        if self.num_core_electrons() <= 1.0 || self.config.method == Method::Local {
            let record = self.resolve_core(tolerance.min(1.0e-15), false);
            let converged = record.eps <= tolerance;
            return self.finish(record, converged, "core");
        }

        let (record, converged) = match self.config.method {
            Method::HartreeFock => {
                self.yk.calculate(&self.core);
                let vex_zero = utils::par_map(&self.core, |_, fz| self.vex_fa_core(fz));
                self.hartree_fock_core(vex_zero)
            }
            Method::ApproxHF => {
                let outcome = self.hf_approx_core(tolerance);
                self.yk.calculate(&self.core);
                outcome
            }
            _ => {
                let outcome = self.local_core(tolerance);
                self.yk.calculate(&self.core);
                outcome
            }
        };
        self.finish(record, converged, "core")
    }

    /// Records how the solve ended: `converged` says whether it met its target
    /// before running out of iterations. Only a record that also misses the 1e-6
    /// floor is warned about.
    fn finish(&mut self, record: ConvergenceRecord, converged: bool, what: &str) -> ConvergenceRecord {
        log::info!("{what}: {record}");
        self.state = if converged {
            ScfState::Converged
        } else {
            ScfState::MaxIterationsReached
        };
        if !record.converged(self.config.tolerance()) {
            log::warn!("{what} didn't converge: {record}");
        }
        record
    }

    /// Replaces the direct potential with a parametric one. Methods other than Local
    /// only use it as a starting point, and always start from the default Green
    /// potential.
    pub fn set_parametric_potential(&mut self) {
        let parametric = match self.config.method {
            Method::Local => self.config.parametric,
            _ => ParametricPotential::default(),
        };
        self.vdir = parametric.build(self.z, self.grid.r());
    }

    /// Solves every core orbital once in the current local potential, from energy
    /// guesses. The record holds the worst bound-state tolerance.
    pub(crate) fn solve_initial_core(&mut self, tolerance: f64) -> ConvergenceRecord {
        let mut core = mem::take(&mut self.core);
        let mut record = ConvergenceRecord::default();

        for i in 0..core.len() {
            let (n, kappa) = (core[i].n(), core[i].kappa());
            let guess = core_energy_guess(n, kappa, self.z, &core);
            // the upper member of a fine structure pair lies just above the lower
            let en0 = match i.checked_sub(1).map(|p| 0.95 * core[p].en()) {
                Some(en0) if kappa < -1 && en0 <= 0.0 => en0,
                _ => guess,
            };

            let v = self.vlocal(core[i].l());
            self.solve_bound(&mut core[i], en0, &v, tolerance);
            log::debug!("initial {} ({} its)", core[i], core[i].its());

            if core[i].eps() > record.eps {
                record = ConvergenceRecord {
                    eps: core[i].eps(),
                    iterations: core[i].its(),
                    worst: core[i].short_symbol(),
                };
            }
        }

        self.core = core;
        self.state = ScfState::Bootstrapped;
        record
    }

    /// Re-solves every core orbital in the current potential (plus its localised
    /// exchange potential if `with_vex`), starting from its own energy.
    fn resolve_core(&mut self, tolerance: f64, with_vex: bool) -> ConvergenceRecord {
        let mut core = mem::take(&mut self.core);
        let eps = utils::par_for_each_mut(&mut core, |i, fa| {
            let mut v = self.vlocal(fa.l());
            if with_vex {
                v = utils::add(&v, &self.vex[i]);
            }
            self.solve_bound(fa, fa.en(), &v, tolerance);
            fa.eps()
        });
        self.core = core;

        let (index, eps) = utils::worst(eps).unwrap_or_default();
        ConvergenceRecord {
            eps,
            iterations: 1,
            worst: self.core.get(index).map(Orbital::short_symbol).unwrap_or_default(),
        }
    }

    /// Solves the core in the direct potential only (Hartree or Kohn-Sham),
    /// damping the potential between iterations.
    fn local_core(&mut self, target: f64) -> (ConvergenceRecord, bool) {
        self.iterate_local(target, false)
    }

    /// Solves the core with localised exchange, damping both the direct and the
    /// exchange potentials between iterations.
    fn hf_approx_core(&mut self, target: f64) -> (ConvergenceRecord, bool) {
        self.iterate_local(target, true)
    }

    /// Returns the record of the last iteration and whether the loop stopped on
    /// reaching `target` rather than the iteration cap.
    fn iterate_local(&mut self, target: f64, with_vex: bool) -> (ConvergenceRecord, bool) {
        if self.core.is_empty() {
            return (ConvergenceRecord::default(), true);
        }
        self.state = ScfState::Iterating;

        let damping = if with_vex {
            self.config.damping.approx
        } else {
            self.config.damping.local
        };
        let num_points = self.grid.num_points();
        if self.vex.len() != self.core.len() {
            self.vex = vec![vec![0.0; num_points]; self.core.len()];
        }

        let mut hits = 1;
        let mut record;
        let converged = loop {
            let vdir_old = self.vdir.clone();
            let vex_old = self.vex.clone();

            self.update_vdir(Rescale::No);
            self.vdir = utils::damp(&self.vdir, &vdir_old, damping);
            if with_vex {
                self.vex = self
                    .form_approx_vex_core()
                    .iter()
                    .zip(&vex_old)
                    .map(|(new, old)| utils::damp(new, old, damping))
                    .collect();
            }

            let mut core = mem::take(&mut self.core);
            let changes = utils::par_for_each_mut(&mut core, |i, fa| {
                let en_old = fa.en();
                let dv = (0..num_points)
                    .map(|j| self.vdir[j] - vdir_old[j] + self.vex[i][j] - vex_old[i][j])
                    .collect::<Vec<_>>();
                // first-order estimate of the energy shift
                let de = fa.overlap(&fa.apply(&dv));
                let guess = if en_old < -de { en_old + de } else { en_old };

                let v = utils::add(&self.vlocal(fa.l()), &self.vex[i]);
                self.solve_bound(fa, guess, &v, ITERATION_SOLVE_TOLERANCE);
                ((fa.en() - en_old) / en_old).abs()
            });
            self.core = core;

            let (index, eps) = utils::worst(changes).unwrap_or_default();
            record = ConvergenceRecord {
                eps,
                iterations: hits,
                worst: self.core[index].short_symbol(),
            };
            log::info!("iteration {hits:<4} - eps {eps:1.3e} for {}", record.worst);

            if eps < target {
                break true;
            }
            if hits >= self.config.max_iterations {
                break false;
            }
            hits += 1;
        };

        let final_tolerance = if with_vex { 1.0e-14 } else { 1.0e-15 };
        self.resolve_core(final_tolerance, with_vex);
        (record, converged)
    }

    /// Solves the core with exact exchange, correcting each orbital with the Green's
    /// function of the local part of the Hamiltonian.
    ///
    /// `vex_zero` holds the exchange operator (of whichever kind the current orbital
    /// energies are eigenvalues for) applied to the current core. It is used to
    /// estimate each new energy from the current energies.
    ///
    /// The multipole table must be formed from the current core. Returns the record
    /// of the last pass and whether the loop stopped on reaching the target.
    fn hartree_fock_core(&mut self, vex_zero: Vec<Orbital>) -> (ConvergenceRecord, bool) {
        if self.core.is_empty() {
            return (ConvergenceRecord::default(), true);
        }
        self.state = ScfState::Iterating;

        let target = self.config.tolerance();
        let damping = self.config.damping.exact;
        let num_electrons = self.num_core_electrons();
        // half of the direct potential's self-interaction is removed from the local part
        let f_core = 0.5 * (1.0 + (num_electrons - 1.0) / num_electrons);

        let core_zero = self.core.clone();
        let vd0 = self.vdir.clone();

        let mut it = 1;
        let mut record;
        let converged = loop {
            let vl = self
                .vnuc
                .iter()
                .zip(&self.vdir)
                .map(|(vn, vd)| vn + f_core * vd)
                .collect::<Vec<_>>();
            let v0 = self.vdir.iter().map(|vd| (1.0 - f_core) * vd).collect::<Vec<_>>();

            let core_prev = self.core.clone();
            let vex_f = utils::par_map(&self.core, |_, fa| self.vex_fa_core(fa));

            let mut core = mem::take(&mut self.core);
            let changes = utils::par_for_each_mut(&mut core, |i, fa| {
                let fz = &core_zero[i];
                let vx_fa = &vex_f[i];

                let mut numerator = fz.overlap(vx_fa) - fa.overlap(&vex_zero[i])
                    + fz.overlap(&fa.apply(&self.vdir))
                    - fa.overlap(&fz.apply(&vd0));
                let mut vnl = fa.apply(&v0) + vx_fa;
                if let Some(breit) = &self.breit {
                    let vb_fa = breit.apply(fa);
                    numerator += fz.overlap(&vb_fa);
                    vnl += &vb_fa;
                }
                let en = fz.en() + numerator / fa.overlap(fz);

                let vl = self.add_radiative(vl.clone(), fa.l());
                let new = self.green_correction(fa, en, &vl, &vnl, &core_prev, Some(v0.as_slice()), None);
                log::debug!("{} ({} green its, eps {:.1e})", new, new.its(), new.eps());

                let prev_en = fa.en();
                let mut damped = new * (1.0 - damping) + &(&*fa * damping);
                damped.normalise();
                *fa = damped;
                ((prev_en - fa.en()) / fa.en()).abs()
            });
            self.core = core;

            let (index, eps) = utils::worst(changes).unwrap_or_default();
            record = ConvergenceRecord {
                eps,
                iterations: it,
                worst: self.core[index].short_symbol(),
            };
            log::info!("iteration {it:<4} - eps {eps:1.3e} for {}", record.worst);

            // at least two passes, so the change is measured between exact-exchange cores
            if eps <= target && it > 1 {
                break true;
            }
            if it >= self.config.max_iterations {
                break false;
            }
            self.update_vdir(Rescale::No);
            it += 1;
        };

        // leave the direct potential and multipoles consistent with the final core
        self.update_vdir(Rescale::No);
        (record, converged)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use approx::assert_relative_eq;

    use super::*;
    use crate::{
        constants::ALPHA,
        grid::{Grid, GridParameters},
        hf::{HartreeFockConfig, RadiativePotential},
        nucleus::Nucleus,
    };

    fn atom_with(z: f64, states: &[(i32, i32, f64)], config: HartreeFockConfig) -> HartreeFock {
        let grid = Arc::new(Grid::new(&GridParameters::default()).unwrap());
        let core = states
            .iter()
            .map(|&(n, kappa, occ)| Orbital::new(n, kappa, grid.clone()).with_occupation(occ))
            .collect();
        HartreeFock::new(grid, &Nucleus::point(z), core, config)
    }

    fn atom(z: f64, states: &[(i32, i32, f64)], method: Method, eps: f64) -> HartreeFock {
        atom_with(
            z,
            states,
            HartreeFockConfig {
                method,
                eps,
                ..Default::default()
            },
        )
    }

    fn dirac_coulomb(n: i32, kappa: i32, z: f64) -> f64 {
        let c = ALPHA.recip();
        let gamma = ((kappa * kappa) as f64 - (ALPHA * z).powi(2)).sqrt();
        let x = ALPHA * z / ((n - kappa.abs()) as f64 + gamma);
        c * c * ((1.0 + x * x).powf(-0.5) - 1.0)
    }

    #[test]
    fn hydrogen_like_ion_needs_no_iteration() {
        for method in [Method::HartreeFock, Method::ApproxHF, Method::KohnSham] {
            let mut hf = atom(1.0, &[(1, -1, 0.5)], method, 1.0e-13);
            assert_eq!(hf.state(), ScfState::Uninitialized);

            let record = hf.solve_core();
            assert_eq!(record.iterations, 1);
            assert!(record.eps < 1.0e-10);
            assert_eq!(hf.state(), ScfState::Converged);
            assert!(hf.vdir().iter().all(|v| *v == 0.0));
            assert_relative_eq!(hf.core()[0].en(), dirac_coulomb(1, -1, 1.0), max_relative = 1.0e-8);
        }
    }

    #[test]
    fn empty_core() {
        let mut hf = atom(3.0, &[], Method::HartreeFock, 1.0e-13);
        assert_eq!(hf.solve_core(), ConvergenceRecord::default());
        assert_eq!(hf.state(), ScfState::Converged);
        assert!(hf.vdir().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn helium() {
        let mut approx = atom(2.0, &[(1, -1, 1.0)], Method::ApproxHF, 1.0e-12);
        let record = approx.solve_core();
        assert!(record.converged(1.0e-12), "{record}");
        assert_relative_eq!(approx.core()[0].en(), -0.91799, max_relative = 1.0e-4);
        assert_relative_eq!(approx.core()[0].norm(), 1.0, max_relative = 1.0e-10);

        let mut exact = atom(2.0, &[(1, -1, 1.0)], Method::HartreeFock, 1.0e-12);
        let record = exact.solve_core();
        assert!(record.converged(1.0e-12), "{record}");
        // a closed s shell has only self-exchange, which the localised form has exactly
        assert_relative_eq!(exact.core()[0].en(), approx.core()[0].en(), max_relative = 1.0e-6);
        assert_relative_eq!(exact.calculate_core_energy(), -2.8618, max_relative = 1.0e-3);
    }

    #[test]
    fn beryllium_converges() {
        let mut hf = atom(4.0, &[(1, -1, 1.0), (2, -1, 1.0)], Method::ApproxHF, 1.0e-7);
        let record = hf.solve_core();
        assert!(record.eps < 1.0e-7, "{record}");
        assert!(record.iterations < 50);
        assert_eq!(hf.state(), ScfState::Converged);
        for orbital in hf.core() {
            assert!(orbital.en() < 0.0);
            assert_relative_eq!(orbital.norm(), 1.0, max_relative = 1.0e-10);
        }
        // 1s below 2s
        assert!(hf.core()[0].en() < 5.0 * hf.core()[1].en());
    }

    #[test]
    fn converged_core_is_a_fixed_point() {
        // exact exchange always makes a second pass to measure the change against
        for (method, passes) in [(Method::ApproxHF, 1), (Method::HartreeFock, 2)] {
            let mut hf = atom(2.0, &[(1, -1, 1.0)], method, 1.0e-9);
            hf.solve_core();
            let en = hf.core()[0].en();

            let record = hf.iterate_core();
            assert_eq!(record.iterations, passes, "{method}: {record}");
            assert!(record.eps < 1.0e-9);
            assert_eq!(hf.state(), ScfState::Converged);
            assert_relative_eq!(hf.core()[0].en(), en, max_relative = 1.0e-9);
        }
    }

    #[test]
    fn iteration_cap_is_not_convergence() {
        for method in [Method::ApproxHF, Method::HartreeFock] {
            let mut hf = atom_with(
                4.0,
                &[(1, -1, 1.0), (2, -1, 1.0)],
                HartreeFockConfig {
                    method,
                    eps: 1.0e-15,
                    max_iterations: 3,
                    ..Default::default()
                },
            );
            let record = hf.solve_core();
            assert_eq!(record.iterations, 3, "{method}: {record}");
            assert!(record.eps > 1.0e-15);
            assert_eq!(hf.state(), ScfState::MaxIterationsReached);
        }
    }

    #[test]
    fn radiative_potential_enters_the_core() {
        let grid = Arc::new(Grid::new(&GridParameters::default()).unwrap());
        let vrad = grid.r().iter().map(|r| -0.05 * (-r).exp()).collect::<Vec<_>>();
        let radiative = RadiativePotential::new(vec![vrad.clone()], None);

        let mut plain = atom(2.0, &[(1, -1, 1.0)], Method::ApproxHF, 1.0e-12);
        plain.solve_core();

        let mut energies = Vec::new();
        for method in [Method::ApproxHF, Method::HartreeFock] {
            let mut hf = atom(2.0, &[(1, -1, 1.0)], method, 1.0e-12).with_radiative(radiative.clone());
            let record = hf.solve_core();
            assert_eq!(hf.state(), ScfState::Converged, "{method}: {record}");

            let vl = hf.vlocal(0);
            for i in (0..grid.num_points()).step_by(100) {
                assert_relative_eq!(vl[i], hf.vnuc()[i] + hf.vdir()[i] + vrad[i], max_relative = 1.0e-12);
            }
            energies.push(hf.core()[0].en());
        }

        // attractive, and of the size of its expectation value
        let fz = &plain.core()[0];
        let first_order = fz.overlap(&fz.apply(&vrad));
        let shift = energies[0] - fz.en();
        assert!(shift < 0.0);
        assert!(shift > 2.0 * first_order && shift < 0.5 * first_order, "{shift} vs {first_order}");
        // a closed s shell still has exact localised exchange
        assert_relative_eq!(energies[1], energies[0], max_relative = 1.0e-6);
    }

    #[test]
    fn local_potential_is_not_iterated() {
        let mut hf = atom(11.0, &[(1, -1, 1.0), (2, -1, 1.0), (2, 1, 1.0), (2, -2, 1.0)], Method::Local, 1.0e-13);
        hf.solve_core();
        assert_eq!(hf.state(), ScfState::Converged);
        let energies = hf.core().iter().map(Orbital::en).collect::<Vec<_>>();
        assert!(energies.iter().all(|en| *en < 0.0));
        // 1s < 2s < 2p
        assert!(energies[0] < energies[1] && energies[1] < energies[2]);
        assert!(!hf.yk_table().is_empty());
    }
}
