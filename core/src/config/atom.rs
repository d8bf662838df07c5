use std::{fs, path::Path, str::FromStr, sync::Arc};

use serde::Deserialize;

use super::terms::{parse_core, parse_valence};
use crate::{
    atom::Atom,
    error::{Error, Result},
    grid::{Grid, GridParameters},
    hf::{HartreeFock, HartreeFockConfig, PolarisationPotential},
    nucleus::{NuclearModel, Nucleus},
    orbital::Orbital,
    periodic_table::ElementType,
};

/// An atom as described in an input file, e.g.
///
/// ```json
/// {
///     "element": "Cs",
///     "core": "[Xe]",
///     "valence": "7sp5d",
///     "hartree_fock": { "method": "HartreeFock", "eps": 13 }
/// }
/// ```
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigAtom {
    pub element: ElementType,
    #[serde(default)]
    pub core: String,
    #[serde(default)]
    pub valence: String,
    #[serde(default)]
    pub grid: GridParameters,
    #[serde(default)]
    pub hartree_fock: HartreeFockConfig,
    /// defaults to a ball of the typical radius for the element
    #[serde(default)]
    pub nucleus: Option<NuclearModel>,
    #[serde(default)]
    pub polarisation: Option<PolarisationPotential>,
}

impl ConfigAtom {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        contents.parse()
    }
}

impl FromStr for ConfigAtom {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

impl TryFrom<ConfigAtom> for Atom {
    type Error = Error;

    fn try_from(value: ConfigAtom) -> Result<Self> {
        let grid = Arc::new(Grid::new(&value.grid)?);
        let nucleus = match value.nucleus {
            Some(model) => Nucleus::new(value.element.z() as f64, model),
            None => Nucleus::for_element(value.element),
        };

        let core = parse_core(&value.core)?
            .iter()
            .flat_map(|term| term.orbitals(&grid))
            .collect::<Vec<_>>();
        let valence = parse_valence(&value.valence, &core)?
            .into_iter()
            .map(|(n, kappa)| Orbital::new(n, kappa, grid.clone()))
            .collect();

        let hf = HartreeFock::new(grid, &nucleus, core, value.hartree_fock);
        let atom = Atom::new(value.element, hf, valence);
        Ok(match value.polarisation {
            Some(polarisation) => atom.with_polarisation(polarisation),
            None => atom,
        })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::hf::Method;

    #[test]
    fn minimal_input() {
        let config: ConfigAtom = r#"{ "element": "Na", "core": "[Ne]", "valence": "3sp" }"#.parse().unwrap();
        assert_eq!(config.hartree_fock, HartreeFockConfig::default());

        let atom = Atom::try_from(config).unwrap();
        assert_eq!(atom.core().len(), 4);
        assert_eq!(atom.valence().len(), 3);
        assert_eq!(atom.hartree_fock().z(), 11.0);
        assert_eq!(atom.hartree_fock().zion(), 1.0);
    }

    #[test]
    fn full_input() {
        let config: ConfigAtom = r#"{
            "element": 3,
            "core": "1s2",
            "valence": "2s",
            "grid": { "r0": 1e-5, "rmax": 80.0, "num_points": 1000 },
            "hartree_fock": { "method": "ApproxHF", "eps": 10, "damping": { "approx": 0.6 } },
            "nucleus": { "type": "Point" },
            "polarisation": { "alpha_d": 0.19, "rho": 1.0 }
        }"#
        .parse()
        .unwrap();

        assert_eq!(config.element.symbol(), "Li");
        assert_eq!(config.hartree_fock.method, Method::ApproxHF);
        assert_relative_eq!(config.hartree_fock.tolerance(), 1.0e-10, max_relative = 1e-12);
        assert_eq!(config.hartree_fock.damping.approx, 0.6);
        assert_eq!(config.hartree_fock.damping.exact, 0.35);
        assert_eq!(config.grid.num_points, 1000);

        let atom = Atom::try_from(config).unwrap();
        assert_eq!(atom.hartree_fock().grid().num_points(), 1000);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!("{ \"element\": \"Xx\" }".parse::<ConfigAtom>(), Err(Error::Json(_))));
        assert!(matches!("{ \"element\": \"H\", \"colour\": 1 }".parse::<ConfigAtom>(), Err(Error::Json(_))));

        let bad_core: ConfigAtom = r#"{ "element": "Na", "core": "[Ne],3q1" }"#.parse().unwrap();
        assert!(matches!(Atom::try_from(bad_core), Err(Error::InvalidTerm { .. })));

        let bad_grid: ConfigAtom = r#"{ "element": "Na", "grid": { "num_points": 3 } }"#.parse().unwrap();
        assert!(matches!(Atom::try_from(bad_grid), Err(Error::InvalidGrid(_))));

        assert!(matches!(ConfigAtom::load("/does/not/exist.json"), Err(Error::Io { .. })));
    }
}
