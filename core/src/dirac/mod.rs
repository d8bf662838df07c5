mod adams;

pub use adams::AdamsMoulton;

use crate::orbital::Orbital;

/// The local and magnetic potentials an orbital is solved in
#[derive(Clone, Copy, Debug)]
pub struct Potential<'a> {
    /// local potential, including the nuclear part
    pub v: &'a [f64],
    /// off-diagonal (magnetic form factor) potential, if any
    pub h_mag: Option<&'a [f64]>,
}

impl<'a> Potential<'a> {
    pub fn local(v: &'a [f64]) -> Self {
        Self { v, h_mag: None }
    }

    pub fn with_magnetic(v: &'a [f64], h_mag: Option<&'a [f64]>) -> Self {
        Self { v, h_mag }
    }
}

/// Regular and irregular solutions of the homogeneous radial equation at a fixed
/// energy. Together they define the Green's function of (H - E).
#[derive(Clone, Debug)]
pub struct GreenPair {
    /// solution regular at the origin, integrated outwards
    pub regular: Orbital,
    /// solution decaying at large r, integrated inwards
    pub irregular: Orbital,
    /// f_0 g_i - f_i g_0, constant in r for an exact pair
    pub wronskian: f64,
    pub energy: f64,
}

/// Solves the radial Dirac equation in a local potential.
///
/// Implementations must report failure to converge through the orbital's `eps` and
/// `its` fields rather than panicking.
pub trait RadialSolver: Sync {
    /// Finds the bound state with the orbital's (n, kappa), starting from `en_guess`.
    /// On return the orbital is normalised and its energy, `eps`, `its` and `max_pt`
    /// are updated.
    fn solve_bound(
        &self,
        orbital: &mut Orbital,
        en_guess: f64,
        potential: Potential<'_>,
        alpha: f64,
        tolerance: f64,
    );

    /// Solutions of the homogeneous equation at energy `en` for the state of `orbital`
    fn solve_inhomogeneous(
        &self,
        orbital: &Orbital,
        en: f64,
        potential: Potential<'_>,
        alpha: f64,
    ) -> GreenPair;

    /// Overwrites `target` with the solution F of (H - E) F = S, for the source S and
    /// the energy E of `pair`.
    fn green_solution(&self, target: &mut Orbital, pair: &GreenPair, source: &Orbital, alpha: f64) {
        green_solution(target, pair, source, alpha)
    }
}

/// F(r) = -(alpha / W) [ Y_0(r) int_r^inf Y_i S + Y_i(r) int_0^r Y_0 S ]
pub fn green_solution(target: &mut Orbital, pair: &GreenPair, source: &Orbital, alpha: f64) {
    let GreenPair {
        regular,
        irregular,
        wronskian,
        ..
    } = pair;
    let grid = regular.grid().clone();
    let num_points = grid.num_points();
    let max_pt = regular.max_pt().min(irregular.max_pt()).min(num_points);

    let outer = grid.cumulative_backward(
        &(0..max_pt.min(source.max_pt()))
            .map(|i| irregular.f[i] * source.f[i] + irregular.g[i] * source.g[i])
            .collect::<Vec<_>>(),
    );
    let inner = grid.cumulative_forward(
        &(0..max_pt.min(source.max_pt()))
            .map(|i| regular.f[i] * source.f[i] + regular.g[i] * source.g[i])
            .collect::<Vec<_>>(),
    );

    let factor = -alpha / wronskian;
    for i in 0..max_pt {
        target.f[i] = factor * (regular.f[i] * outer[i] + irregular.f[i] * inner[i]);
        target.g[i] = factor * (regular.g[i] * outer[i] + irregular.g[i] * inner[i]);
    }
    for i in max_pt..num_points {
        target.f[i] = 0.0;
        target.g[i] = 0.0;
    }
    target.max_pt = max_pt;
}
