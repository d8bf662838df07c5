mod direct;
mod energy;
mod exchange;
mod external;
mod green;
mod guess;
mod scf;
pub(super) mod utils;
mod valence;

use std::{fmt, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};

pub use direct::{latter_correction, local_density_exchange};
pub use exchange::{vex_approx, vex_fa};
pub use external::{BreitOperator, CorrelationPotential, PolarisationPotential, RadiativePotential};
pub use guess::{core_energy_guess, valence_energy_guess};

use crate::{
    coulomb::YkTable,
    dirac::{AdamsMoulton, Potential, RadialSolver},
    error::Error,
    grid::Grid,
    nucleus::Nucleus,
    orbital::Orbital,
    parametric::ParametricPotential,
};

/// How the electron-electron interaction is treated in the mean field
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    /// exact non-local exchange, solved with Green's functions
    #[default]
    HartreeFock,
    /// localised approximation to the exchange potential
    ApproxHF,
    /// direct potential only, including the electron self-interaction
    Hartree,
    /// direct potential plus a local density exchange term and the Latter tail
    KohnSham,
    /// parametric potential only, no self-consistency
    Local,
}

impl Method {
    /// Whether the method has an explicit (exact or localised) exchange term
    pub fn includes_exchange(&self) -> bool {
        matches!(self, Self::HartreeFock | Self::ApproxHF)
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HartreeFock" => Ok(Self::HartreeFock),
            "ApproxHF" => Ok(Self::ApproxHF),
            "Hartree" => Ok(Self::Hartree),
            "KohnSham" => Ok(Self::KohnSham),
            "Local" => Ok(Self::Local),
            _ => Err(Error::UnknownMethod(s.to_string())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::HartreeFock => "Hartree-Fock",
            Self::ApproxHF => "Approximate (localised) Hartree-Fock",
            Self::Hartree => "Hartree (no exchange)",
            Self::KohnSham => "Kohn-Sham",
            Self::Local => "Local (parametric) potential",
        };
        f.write_str(name)
    }
}

/// Fraction of the previous iterate mixed into each new one
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Damping {
    pub local: f64,
    pub approx: f64,
    pub exact: f64,
    pub valence: f64,
}

impl Default for Damping {
    fn default() -> Self {
        Self {
            local: 0.5,
            approx: 0.55,
            exact: 0.35,
            valence: 0.4,
        }
    }
}

/// Everything tunable about a self-consistent field calculation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HartreeFockConfig {
    pub method: Method,
    /// the fine structure constant
    pub alpha: f64,
    /// convergence target for the worst relative energy change. Values of one or
    /// more are read as an exponent, i.e. 13 means 1e-13.
    pub eps: f64,
    /// the maximum number of SCF iterations
    pub max_iterations: usize,
    pub damping: Damping,
    /// fraction of the peak |f| below which the localised exchange is not formed
    pub exchange_cutoff: f64,
    /// target for the relative energy shift inside the Green's function correction
    pub green_epsilon: f64,
    pub green_max_tries: usize,
    /// the parametric potential of the Local method
    pub parametric: ParametricPotential,
}

impl Default for HartreeFockConfig {
    fn default() -> Self {
        Self {
            method: Method::HartreeFock,
            alpha: crate::constants::ALPHA,
            eps: 1.0e-13,
            max_iterations: 100,
            damping: Damping::default(),
            exchange_cutoff: 0.003,
            green_epsilon: 1.0e-18,
            green_max_tries: 32,
            parametric: ParametricPotential::default(),
        }
    }
}

impl HartreeFockConfig {
    /// The convergence target as a plain tolerance
    pub fn tolerance(&self) -> f64 {
        if self.eps.abs() < 1.0 {
            self.eps.abs()
        } else {
            10f64.powf(-self.eps.abs())
        }
    }
}

/// The outcome of one solve: worst relative energy change, number of iterations and
/// the orbital responsible for the worst change.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ConvergenceRecord {
    pub eps: f64,
    pub iterations: usize,
    pub worst: String,
}

impl ConvergenceRecord {
    /// Whether the record should be treated as converged for the target tolerance.
    /// Anything below 1e-6 is accepted regardless of the target.
    pub fn converged(&self, tolerance: f64) -> bool {
        self.eps <= tolerance || self.eps <= 1.0e-6
    }
}

impl fmt::Display for ConvergenceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "it: {:3} eps = {:6.1e} for {}",
            self.iterations, self.eps, self.worst
        )
    }
}

/// Where the core calculation is in its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScfState {
    Uninitialized,
    /// orbitals solved once in the starting potential
    Bootstrapped,
    Iterating,
    Converged,
    MaxIterationsReached,
}

/// Whether the direct potential is scaled by (N-1)/N, removing the average electron
/// self-interaction. Only used for the starting potential.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rescale {
    No,
    Yes,
}

/// A self-consistent mean field calculation for the core of an atom, and the
/// solution of valence states in the resulting potential.
pub struct HartreeFock<S: RadialSolver = AdamsMoulton> {
    grid: Arc<Grid>,
    z: f64,
    vnuc: Vec<f64>,
    vdir: Vec<f64>,
    /// localised exchange potential of each core orbital
    vex: Vec<Vec<f64>>,
    core: Vec<Orbital>,
    yk: YkTable,
    config: HartreeFockConfig,
    solver: S,
    radiative: Option<RadiativePotential>,
    breit: Option<Box<dyn BreitOperator>>,
    state: ScfState,
}

impl HartreeFock<AdamsMoulton> {
    pub fn new(
        grid: Arc<Grid>,
        nucleus: &Nucleus,
        core: Vec<Orbital>,
        config: HartreeFockConfig,
    ) -> Self {
        let vnuc = nucleus.potential(&grid);
        let num_points = grid.num_points();
        let yk = YkTable::default();
        Self {
            vdir: vec![0.0; num_points],
            vex: vec![vec![0.0; num_points]; core.len()],
            grid,
            z: nucleus.z(),
            vnuc,
            core,
            yk,
            config,
            solver: AdamsMoulton::default(),
            radiative: None,
            breit: None,
            state: ScfState::Uninitialized,
        }
    }
}

impl<S: RadialSolver> HartreeFock<S> {
    /// Replaces the radial equation solver
    pub fn with_solver<T: RadialSolver>(self, solver: T) -> HartreeFock<T> {
        HartreeFock {
            grid: self.grid,
            z: self.z,
            vnuc: self.vnuc,
            vdir: self.vdir,
            vex: self.vex,
            core: self.core,
            yk: self.yk,
            config: self.config,
            solver,
            radiative: self.radiative,
            breit: self.breit,
            state: self.state,
        }
    }

    pub fn with_radiative(mut self, radiative: RadiativePotential) -> Self {
        self.radiative = Some(radiative);
        self
    }

    pub fn with_breit(mut self, breit: impl BreitOperator + 'static) -> Self {
        self.breit = Some(Box::new(breit));
        self
    }

    pub fn grid(&self) -> &Arc<Grid> {
        &self.grid
    }

    pub fn config(&self) -> &HartreeFockConfig {
        &self.config
    }

    pub fn method(&self) -> Method {
        self.config.method
    }

    pub fn state(&self) -> ScfState {
        self.state
    }

    pub fn core(&self) -> &[Orbital] {
        &self.core
    }

    pub fn into_core(self) -> Vec<Orbital> {
        self.core
    }

    pub fn vnuc(&self) -> &[f64] {
        &self.vnuc
    }

    /// The direct (Hartree) potential of the core
    pub fn vdir(&self) -> &[f64] {
        &self.vdir
    }

    /// The localised exchange potentials last used for the core orbitals
    pub fn vex(&self) -> &[Vec<f64>] {
        &self.vex
    }

    pub fn yk_table(&self) -> &YkTable {
        &self.yk
    }

    pub fn z(&self) -> f64 {
        self.z
    }

    pub fn num_core_electrons(&self) -> f64 {
        self.core.iter().map(Orbital::num_electrons).sum()
    }

    /// Charge of the ion formed by the nucleus and the core
    pub fn zion(&self) -> f64 {
        self.z - self.num_core_electrons()
    }

    /// Local potential for orbital angular momentum l: nuclear + direct (+ radiative)
    pub fn vlocal(&self, l: i32) -> Vec<f64> {
        self.add_radiative(utils::add(&self.vnuc, &self.vdir), l)
    }

    /// Adds the radiative electric potential for orbital angular momentum l, if any
    pub(crate) fn add_radiative(&self, mut v: Vec<f64>, l: i32) -> Vec<f64> {
        if let Some(radiative) = &self.radiative {
            for (v, vr) in v.iter_mut().zip(radiative.electric(l)) {
                *v += vr;
            }
        }
        v
    }

    /// Radiative magnetic form factor potential for orbital angular momentum l
    pub(crate) fn h_mag(&self, l: i32) -> Option<&[f64]> {
        self.radiative.as_ref().and_then(|radiative| radiative.magnetic(l))
    }

    /// Solves the bound state of `orbital` in the local potential `v`
    pub(crate) fn solve_bound(&self, orbital: &mut Orbital, en_guess: f64, v: &[f64], tolerance: f64) {
        let h_mag = self.h_mag(orbital.l());
        self.solver.solve_bound(
            orbital,
            en_guess,
            Potential::with_magnetic(v, h_mag),
            self.config.alpha,
            tolerance,
        );
    }
}
