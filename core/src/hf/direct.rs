use std::f64::consts::PI;

use super::{HartreeFock, Method, Rescale};
use crate::{coulomb::YkTable, dirac::RadialSolver, orbital::Orbital};

impl<S: RadialSolver> HartreeFock<S> {
    /// Rebuilds the multipole table from the current core and forms the direct
    /// potential from it. With [`Rescale::Yes`] the potential is scaled by (N-1)/N.
    pub fn update_vdir(&mut self, rescale: Rescale) {
        self.yk.calculate(&self.core);

        let scale = match rescale {
            Rescale::Yes => 1.0 - self.num_core_electrons().recip(),
            Rescale::No => 1.0,
        };
        self.vdir = form_vdir(&self.core, &self.yk, scale, self.grid.num_points());

        if self.config.method == Method::KohnSham {
            let rho = core_density(&self.core, self.grid.num_points());
            for (v, x) in self
                .vdir
                .iter_mut()
                .zip(local_density_exchange(&rho, self.grid.r()))
            {
                *v += x;
            }
            // Kohn-Sham is a V^N potential, so an outer electron sees one more charge
            let z_ion = self.zion() + 1.0;
            latter_correction(&mut self.vdir, &self.vnuc, self.grid.r(), z_ion);
        }
    }
}

/// sum_b scale (2j_b+1) occ_b y^0_bb
pub(crate) fn form_vdir(core: &[Orbital], yk: &YkTable, scale: f64, num_points: usize) -> Vec<f64> {
    let mut vdir = vec![0.0; num_points];
    for fb in core {
        let y0bb = yk
            .get(0, fb, fb)
            .unwrap_or_else(|| panic!("missing y^0 for {} in the multipole table", fb.symbol()));
        let x = scale * fb.num_electrons();
        for (v, y) in vdir.iter_mut().zip(y0bb) {
            *v += x * y;
        }
    }
    vdir
}

/// Total radial density of the core, sum_b (2j_b+1) occ_b (f_b^2 + g_b^2)
pub(crate) fn core_density(core: &[Orbital], num_points: usize) -> Vec<f64> {
    let mut rho = vec![0.0; num_points];
    for fb in core {
        for (total, x) in rho.iter_mut().zip(fb.rho()) {
            *total += x;
        }
    }
    rho
}

/// The local density exchange term (f/r) (r rho)^(1/3), with
/// f = -(2/3) (81 / 32 pi^2)^(1/3)
pub fn local_density_exchange(rho: &[f64], r: &[f64]) -> Vec<f64> {
    let f = -(2.0 / 3.0) * (81.0 / (32.0 * PI * PI)).cbrt();
    rho.iter()
        .zip(r)
        .map(|(rho, r)| (f / r) * (r * rho).cbrt())
        .collect()
}

/// Latter correction: working in from the last grid point, replaces the electronic
/// potential so that v_nuc + v = -z_ion/r, until |r (v_nuc + v)| first exceeds z_ion.
pub fn latter_correction(vdir: &mut [f64], vnuc: &[f64], r: &[f64], z_ion: f64) {
    for i in (1..vdir.len()).rev() {
        if r[i] * (vnuc[i] + vdir[i]).abs() > z_ion {
            break;
        }
        vdir[i] = -z_ion / r[i] - vnuc[i];
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use approx::assert_relative_eq;

    use super::*;
    use crate::{
        coulomb::yk_ab,
        grid::{Grid, GridParameters},
        hf::HartreeFockConfig,
        nucleus::Nucleus,
    };

    fn hydrogenic(n: i32, kappa: i32, zeta: f64, grid: &Arc<Grid>) -> Orbital {
        let mut orbital = Orbital::new(n, kappa, grid.clone());
        for (i, &r) in grid.r().iter().enumerate() {
            orbital.f[i] = r.powi(orbital.l() + 1) * (-zeta * r).exp();
        }
        orbital.normalise();
        orbital
    }

    fn neon_like(method: Method) -> HartreeFock {
        let grid = Arc::new(Grid::new(&GridParameters::default()).unwrap());
        let core = vec![
            hydrogenic(1, -1, 9.0, &grid),
            hydrogenic(2, -1, 3.0, &grid),
            hydrogenic(2, 1, 3.0, &grid),
            hydrogenic(2, -2, 3.0, &grid),
        ];
        HartreeFock::new(
            grid,
            &Nucleus::point(10.0),
            core,
            HartreeFockConfig {
                method,
                ..Default::default()
            },
        )
    }

    #[test]
    fn single_orbital_direct_potential() {
        let grid = Arc::new(Grid::new(&GridParameters::default()).unwrap());
        let s = hydrogenic(1, -1, 1.0, &grid).with_occupation(0.5);
        let mut hf = HartreeFock::new(
            grid.clone(),
            &Nucleus::point(1.0),
            vec![s.clone()],
            HartreeFockConfig::default(),
        );
        hf.update_vdir(Rescale::No);

        let y0 = yk_ab(0, &s, &s);
        for (v, y) in hf.vdir().iter().zip(&y0) {
            assert_relative_eq!(*v, *y, max_relative = 1e-14);
        }
    }

    #[test]
    fn rescaled_direct_potential() {
        let mut hf = neon_like(Method::Hartree);
        hf.update_vdir(Rescale::No);
        let full = hf.vdir().to_vec();
        hf.update_vdir(Rescale::Yes);

        let n = hf.num_core_electrons();
        assert_relative_eq!(n, 10.0);
        for (scaled, full) in hf.vdir().iter().zip(&full) {
            assert_relative_eq!(*scaled, full * (n - 1.0) / n, max_relative = 1e-14);
        }
    }

    #[test]
    fn kohn_sham_tail() {
        let mut hf = neon_like(Method::KohnSham);
        hf.update_vdir(Rescale::No);

        let r = hf.grid().r();
        let z_ion = hf.zion() + 1.0;
        assert_relative_eq!(z_ion, 1.0);

        let crossing = (1..r.len())
            .rev()
            .find(|&i| r[i] * (hf.vnuc()[i] + hf.vdir()[i]).abs() > z_ion + 1e-12)
            .unwrap();
        assert!(crossing < r.len() - 1);
        for i in crossing + 1..r.len() {
            assert_relative_eq!(hf.vnuc()[i] + hf.vdir()[i], -z_ion / r[i], max_relative = 1e-14);
        }
    }

    #[test]
    fn local_density_exchange_is_attractive() {
        let r = [0.5, 1.0, 2.0];
        let rho = [1.0, 0.5, 0.0];
        let v = local_density_exchange(&rho, &r);
        assert!(v[0] < v[1] && v[1] < 0.0);
        assert_eq!(v[2], 0.0);
    }
}
