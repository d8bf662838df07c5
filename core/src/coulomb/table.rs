use std::collections::HashMap;

use itertools::Itertools;
use smallvec::SmallVec;

use crate::{
    angular::{k_range, lambda_k},
    orbital::Orbital,
};

use super::yk_ab;

/// (n, kappa) of an orbital
type StateKey = (i32, i32);

/// Multipoles of one orbital pair, indexed by k - k_min. Entries for multipoles with
/// vanishing angular weight are `None`.
#[derive(Clone, Debug, Default)]
struct PairMultipoles {
    k_min: i32,
    yk: SmallVec<[Option<Vec<f64>>; 4]>,
}

/// Cache of y^k_ab for every pair of orbitals in a set (typically the core).
///
/// Only multipoles with non-zero exchange angular weight are stored, which always
/// includes the k = 0 self-interaction y^0_aa used for the direct potential.
#[derive(Clone, Debug, Default)]
pub struct YkTable {
    data: HashMap<(StateKey, StateKey), PairMultipoles>,
}

impl YkTable {
    pub fn new(orbitals: &[Orbital]) -> Self {
        let mut table = Self::default();
        table.calculate(orbitals);
        table
    }

    #[inline(always)]
    fn key(a: &Orbital, b: &Orbital) -> (StateKey, StateKey) {
        let (ka, kb) = ((a.n(), a.kappa()), (b.n(), b.kappa()));
        if ka <= kb {
            (ka, kb)
        } else {
            (kb, ka)
        }
    }

    fn pair_multipoles(a: &Orbital, b: &Orbital) -> PairMultipoles {
        let ks = k_range(a.kappa(), b.kappa());
        let k_min = *ks.start();
        let yk = ks
            .map(|k| {
                if lambda_k(k, a.kappa(), b.kappa()) == 0.0 {
                    return None;
                }
                log::trace!("y^{k} ({} {})", a.short_symbol(), b.short_symbol());
                Some(yk_ab(k, a, b))
            })
            .collect();
        PairMultipoles { k_min, yk }
    }

    /// Recomputes every pair multipole from the given orbitals. Any previously stored
    /// pairs are discarded.
    pub fn calculate(&mut self, orbitals: &[Orbital]) {
        let pairs = (0..orbitals.len())
            .tuple_combinations()
            .chain((0..orbitals.len()).map(|i| (i, i)))
            .collect::<Vec<_>>();

        #[cfg(feature = "rayon")]
        let computed = {
            use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

            pairs
                .par_iter()
                .map(|&(i, j)| {
                    let (a, b) = (&orbitals[i], &orbitals[j]);
                    (Self::key(a, b), Self::pair_multipoles(a, b))
                })
                .collect::<Vec<_>>()
        };

        #[cfg(not(feature = "rayon"))]
        let computed = pairs
            .iter()
            .map(|&(i, j)| {
                let (a, b) = (&orbitals[i], &orbitals[j]);
                (Self::key(a, b), Self::pair_multipoles(a, b))
            })
            .collect::<Vec<_>>();

        self.data = computed.into_iter().collect();
    }

    /// y^k_ab, if a and b are both in the table and k has a non-zero angular weight
    pub fn get(&self, k: i32, a: &Orbital, b: &Orbital) -> Option<&[f64]> {
        let pair = self.data.get(&Self::key(a, b))?;
        let index = usize::try_from(k - pair.k_min).ok()?;
        pair.yk.get(index)?.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of orbital pairs stored
    pub fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use approx::assert_relative_eq;

    use super::*;
    use crate::grid::{Grid, GridParameters};

    fn slater_like(n: i32, kappa: i32, zeta: f64, grid: &Arc<Grid>) -> Orbital {
        let mut orbital = Orbital::new(n, kappa, grid.clone());
        for (i, &r) in grid.r().iter().enumerate() {
            orbital.f[i] = r.powi(n) * (-zeta * r).exp();
        }
        orbital.normalise();
        orbital
    }

    #[test]
    fn stores_allowed_pairs() {
        let grid = Arc::new(Grid::new(&GridParameters::default()).unwrap());
        let orbitals = vec![
            slater_like(1, -1, 2.0, &grid),
            slater_like(2, -1, 1.0, &grid),
            slater_like(2, 1, 1.0, &grid),
        ];
        let table = YkTable::new(&orbitals);
        assert_eq!(table.len(), 6);

        let (s1, s2, p) = (&orbitals[0], &orbitals[1], &orbitals[2]);
        assert!(table.get(0, s1, s1).is_some());
        assert!(table.get(0, s1, s2).is_some());
        // parity forbids odd k between two s states
        assert!(table.get(1, s1, s2).is_none());
        assert!(table.get(1, s2, p).is_some());
        assert!(table.get(0, s2, p).is_none());
        assert!(table.get(5, s1, s1).is_none());

        let direct = table.get(1, p, s2).unwrap();
        let computed = yk_ab(1, s2, p);
        for (x, y) in direct.iter().zip(&computed) {
            assert_relative_eq!(*x, *y);
        }
    }

    #[test]
    fn unknown_orbitals_are_missing() {
        let grid = Arc::new(Grid::new(&GridParameters::default()).unwrap());
        let s1 = slater_like(1, -1, 2.0, &grid);
        let s3 = slater_like(3, -1, 0.5, &grid);
        let table = YkTable::new(std::slice::from_ref(&s1));
        assert!(table.get(0, &s1, &s3).is_none());
        assert!(YkTable::new(&[]).is_empty());
    }
}
