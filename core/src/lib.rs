//! Relativistic self-consistent field calculations for atoms: the Dirac-Hartree-Fock
//! core (exact or approximate exchange, Hartree, Kohn-Sham or a parametric
//! potential) and valence states in its field.

pub mod angular;
pub mod atom;
pub mod config;
pub mod constants;
pub mod coulomb;
pub mod dirac;
pub mod error;
pub mod grid;
pub mod hf;
pub mod nucleus;
pub mod orbital;
pub mod parametric;
pub mod periodic_table;

pub use error::{Error, Result};
