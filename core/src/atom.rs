use serde::Serialize;

use crate::{
    hf::{ConvergenceRecord, CorrelationPotential, HartreeFock, Method, PolarisationPotential},
    orbital::{Orbital, OrbitalSummary},
    periodic_table::ElementType,
};

/// An atom or ion: a core solved self-consistently and a set of valence states
/// solved in its field.
pub struct Atom {
    element: ElementType,
    hf: HartreeFock,
    valence: Vec<Orbital>,
    polarisation: Option<PolarisationPotential>,
}

/// Everything worth reporting about a solved atom
#[derive(Clone, Debug, Serialize)]
pub struct AtomSummary {
    pub element: ElementType,
    pub method: Method,
    pub core_convergence: ConvergenceRecord,
    pub valence_convergence: ConvergenceRecord,
    pub core: Vec<OrbitalSummary>,
    pub valence: Vec<OrbitalSummary>,
    pub core_energy: f64,
}

impl Atom {
    pub fn new(element: ElementType, hf: HartreeFock, valence: Vec<Orbital>) -> Self {
        Self {
            element,
            hf,
            valence,
            polarisation: None,
        }
    }

    /// Adds a core polarisation potential, used as the correlation potential for
    /// valence states
    pub fn with_polarisation(mut self, polarisation: PolarisationPotential) -> Self {
        self.polarisation = Some(polarisation);
        self
    }

    pub fn element(&self) -> ElementType {
        self.element
    }

    pub fn hartree_fock(&self) -> &HartreeFock {
        &self.hf
    }

    pub fn core(&self) -> &[Orbital] {
        self.hf.core()
    }

    pub fn valence(&self) -> &[Orbital] {
        &self.valence
    }

    /// Solves the core, then the valence states
    pub fn solve(&mut self) -> AtomSummary {
        let core_convergence = self.hf.solve_core();
        let sigma = self
            .polarisation
            .as_ref()
            .map(|sigma| sigma as &dyn CorrelationPotential);
        let valence_convergence = self.hf.solve_valence(&mut self.valence, sigma);

        AtomSummary {
            element: self.element,
            method: self.hf.method(),
            core_convergence,
            valence_convergence,
            core: self.hf.core().iter().map(OrbitalSummary::from).collect(),
            valence: self.valence.iter().map(OrbitalSummary::from).collect(),
            core_energy: self.hf.calculate_core_energy(),
        }
    }
}
