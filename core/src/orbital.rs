use std::{
    fmt,
    ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign},
    sync::Arc,
};

use serde::Serialize;

use crate::grid::Grid;

const SPECTROSCOPIC: [char; 9] = ['s', 'p', 'd', 'f', 'g', 'h', 'i', 'k', 'l'];

/// Orbital angular momentum of a relativistic angular quantum number
pub const fn l_of(kappa: i32) -> i32 {
    if kappa > 0 {
        kappa
    } else {
        -kappa - 1
    }
}

/// Twice the total angular momentum, 2j, of a relativistic angular quantum number
pub const fn twoj_of(kappa: i32) -> i32 {
    2 * kappa.abs() - 1
}

/// The spectroscopic letter of an orbital angular momentum
pub fn l_symbol(l: i32) -> char {
    SPECTROSCOPIC.get(l as usize).copied().unwrap_or('?')
}

/// One relativistic single-electron state, described by a large (f) and small (g)
/// radial component on a shared grid.
#[derive(Clone, Debug)]
pub struct Orbital {
    pub(crate) n: i32,
    pub(crate) kappa: i32,
    pub(crate) en: f64,
    pub(crate) f: Vec<f64>,
    pub(crate) g: Vec<f64>,
    pub(crate) occ_frac: f64,
    /// one past the last point at which f, g are non-zero
    pub(crate) max_pt: usize,
    /// relative energy change at the last solve
    pub(crate) eps: f64,
    /// iterations used at the last solve
    pub(crate) its: usize,
    grid: Arc<Grid>,
}

impl Orbital {
    /// Creates an unsolved orbital (zero energy, zero radial components) with unit
    /// occupation fraction.
    pub fn new(n: i32, kappa: i32, grid: Arc<Grid>) -> Self {
        assert!(kappa != 0, "kappa cannot be zero");
        assert!(n > l_of(kappa), "invalid state n={n} kappa={kappa}");
        let num_points = grid.num_points();
        Self {
            n,
            kappa,
            en: 0.0,
            f: vec![0.0; num_points],
            g: vec![0.0; num_points],
            occ_frac: 1.0,
            max_pt: num_points,
            eps: 0.0,
            its: 0,
            grid,
        }
    }

    pub fn with_occupation(mut self, occ_frac: f64) -> Self {
        self.occ_frac = occ_frac;
        self
    }

    /// An orbital with the same state and grid, with all radial values zero
    pub(crate) fn zeroed_like(&self) -> Self {
        Self::new(self.n, self.kappa, self.grid.clone())
    }

    pub fn n(&self) -> i32 {
        self.n
    }

    pub fn kappa(&self) -> i32 {
        self.kappa
    }

    pub fn en(&self) -> f64 {
        self.en
    }

    pub fn set_en(&mut self, en: f64) {
        self.en = en;
    }

    pub fn f(&self) -> &[f64] {
        &self.f
    }

    pub fn g(&self) -> &[f64] {
        &self.g
    }

    pub fn occ_frac(&self) -> f64 {
        self.occ_frac
    }

    pub fn max_pt(&self) -> usize {
        self.max_pt
    }

    pub fn eps(&self) -> f64 {
        self.eps
    }

    pub fn its(&self) -> usize {
        self.its
    }

    pub fn grid(&self) -> &Arc<Grid> {
        &self.grid
    }

    pub fn l(&self) -> i32 {
        l_of(self.kappa)
    }

    pub fn twoj(&self) -> i32 {
        twoj_of(self.kappa)
    }

    pub fn twojp1(&self) -> i32 {
        self.twoj() + 1
    }

    /// Number of electrons in this (possibly partially filled) orbital, (2j+1) x occupation
    pub fn num_electrons(&self) -> f64 {
        self.twojp1() as f64 * self.occ_frac
    }

    /// Whether two orbitals describe the same state, i.e. share n and kappa
    pub fn same_state(&self, other: &Orbital) -> bool {
        self.n == other.n && self.kappa == other.kappa
    }

    /// Short label, e.g. "2p-" for 2p_1/2 and "2p+" for 2p_3/2
    pub fn short_symbol(&self) -> String {
        let sign = if self.kappa < 0 { '+' } else { '-' };
        format!("{}{}{sign}", self.n, l_symbol(self.l()))
    }

    /// Full label, e.g. "2p_1/2"
    pub fn symbol(&self) -> String {
        format!("{}{}_{}/2", self.n, l_symbol(self.l()), self.twoj())
    }

    /// <a|b> = int (f_a f_b + g_a g_b) dr
    pub fn overlap(&self, other: &Orbital) -> f64 {
        let n = self.max_pt.min(other.max_pt);
        let integrand = (0..n)
            .map(|i| self.f[i] * other.f[i] + self.g[i] * other.g[i])
            .collect::<Vec<_>>();
        self.grid.integrate(&integrand)
    }

    pub fn norm(&self) -> f64 {
        self.overlap(self).sqrt()
    }

    pub fn normalise(&mut self) {
        let norm = self.norm();
        if norm > 0.0 {
            *self *= norm.recip();
        }
    }

    /// Electron density of the (sub)shell: (2j+1) x occupation x (f^2 + g^2)
    pub fn rho(&self) -> Vec<f64> {
        let x = self.num_electrons();
        (0..self.f.len())
            .map(|i| x * (self.f[i] * self.f[i] + self.g[i] * self.g[i]))
            .collect()
    }

    /// The orbital multiplied point-wise by a local potential
    pub fn apply(&self, v: &[f64]) -> Orbital {
        let mut out = self.clone();
        let n = out.max_pt.min(v.len());
        for i in 0..n {
            out.f[i] *= v[i];
            out.g[i] *= v[i];
        }
        for i in n..out.f.len() {
            out.f[i] = 0.0;
            out.g[i] = 0.0;
        }
        out
    }

    /// Trims max_pt to the last point with a non-negligible component
    pub(crate) fn trim(&mut self, threshold: f64) {
        let peak = self.f.iter().fold(0.0f64, |acc, x| acc.max(x.abs()));
        let cut = threshold * peak;
        let last = (0..self.f.len())
            .rev()
            .find(|&i| self.f[i].abs() > cut || self.g[i].abs() > cut)
            .unwrap_or(0);
        self.max_pt = (last + 1).min(self.f.len());
        for i in self.max_pt..self.f.len() {
            self.f[i] = 0.0;
            self.g[i] = 0.0;
        }
    }
}

impl fmt::Display for Orbital {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:+.8}", self.symbol(), self.en)
    }
}

/// Summary of an orbital suitable for printing or serialising
#[derive(Clone, Debug, Serialize)]
pub struct OrbitalSummary {
    pub symbol: String,
    pub kappa: i32,
    pub occupation: f64,
    pub energy: f64,
    pub eps: f64,
    pub its: usize,
}

impl From<&Orbital> for OrbitalSummary {
    fn from(orbital: &Orbital) -> Self {
        Self {
            symbol: orbital.short_symbol(),
            kappa: orbital.kappa,
            occupation: orbital.num_electrons(),
            energy: orbital.en,
            eps: orbital.eps,
            its: orbital.its,
        }
    }
}

/// The largest principal quantum number in a set of orbitals, 0 if empty
pub fn max_n(orbitals: &[Orbital]) -> i32 {
    orbitals.iter().map(|o| o.n).max().unwrap_or(0)
}

impl AddAssign<&Orbital> for Orbital {
    fn add_assign(&mut self, rhs: &Orbital) {
        assert_eq!(self.f.len(), rhs.f.len(), "orbitals on different grids");
        self.max_pt = self.max_pt.max(rhs.max_pt);
        for i in 0..rhs.max_pt {
            self.f[i] += rhs.f[i];
            self.g[i] += rhs.g[i];
        }
    }
}

impl SubAssign<&Orbital> for Orbital {
    fn sub_assign(&mut self, rhs: &Orbital) {
        assert_eq!(self.f.len(), rhs.f.len(), "orbitals on different grids");
        self.max_pt = self.max_pt.max(rhs.max_pt);
        for i in 0..rhs.max_pt {
            self.f[i] -= rhs.f[i];
            self.g[i] -= rhs.g[i];
        }
    }
}

impl MulAssign<f64> for Orbital {
    fn mul_assign(&mut self, rhs: f64) {
        self.f.iter_mut().for_each(|x| *x *= rhs);
        self.g.iter_mut().for_each(|x| *x *= rhs);
    }
}

impl Add<&Orbital> for Orbital {
    type Output = Orbital;

    fn add(mut self, rhs: &Orbital) -> Self::Output {
        self += rhs;
        self
    }
}

impl Sub<&Orbital> for Orbital {
    type Output = Orbital;

    fn sub(mut self, rhs: &Orbital) -> Self::Output {
        self -= rhs;
        self
    }
}

impl Mul<f64> for Orbital {
    type Output = Orbital;

    fn mul(mut self, rhs: f64) -> Self::Output {
        self *= rhs;
        self
    }
}

impl Mul<f64> for &Orbital {
    type Output = Orbital;

    fn mul(self, rhs: f64) -> Self::Output {
        self.clone() * rhs
    }
}

impl Neg for Orbital {
    type Output = Orbital;

    fn neg(self) -> Self::Output {
        self * -1.0
    }
}
