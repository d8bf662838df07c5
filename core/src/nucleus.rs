use serde::{Deserialize, Serialize};

use crate::{constants::BOHR_FM, grid::Grid, periodic_table::ElementType};

/// Charge distribution of the nucleus
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NuclearModel {
    Point,
    /// uniformly charged ball with the given rms charge radius in fm
    Ball { rrms: f64 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Nucleus {
    z: f64,
    model: NuclearModel,
}

impl Nucleus {
    pub fn new(z: f64, model: NuclearModel) -> Self {
        Self { z, model }
    }

    pub fn point(z: f64) -> Self {
        Self::new(z, NuclearModel::Point)
    }

    /// A ball nucleus with an rms radius estimated from the mass number,
    /// r_rms = 0.836 A^(1/3) + 0.570 fm
    pub fn for_element(element: ElementType) -> Self {
        let a = element.mass_number() as f64;
        let rrms = if a > 9.0 {
            0.836 * a.cbrt() + 0.570
        } else {
            1.0 + 0.15 * a
        };
        Self::new(element.z() as f64, NuclearModel::Ball { rrms })
    }

    pub fn z(&self) -> f64 {
        self.z
    }

    pub fn model(&self) -> NuclearModel {
        self.model
    }

    /// The nuclear potential at every grid point
    pub fn potential(&self, grid: &Grid) -> Vec<f64> {
        match self.model {
            NuclearModel::Point => grid.r().iter().map(|r| -self.z / r).collect(),
            NuclearModel::Ball { rrms } => {
                let r_nuc = (5.0f64 / 3.0).sqrt() * rrms / BOHR_FM;
                grid.r()
                    .iter()
                    .map(|&r| {
                        if r < r_nuc {
                            -self.z / (2.0 * r_nuc) * (3.0 - (r / r_nuc).powi(2))
                        } else {
                            -self.z / r
                        }
                    })
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::grid::GridParameters;

    #[test]
    fn ball_matches_point_outside() {
        let grid = Grid::new(&GridParameters::default()).unwrap();
        let cs = "Cs".parse::<ElementType>().unwrap();
        let ball = Nucleus::for_element(cs).potential(&grid);
        let point = Nucleus::point(55.0).potential(&grid);

        let outside = grid.index_of(1.0e-3);
        assert_relative_eq!(ball[outside], point[outside], max_relative = 1e-14);
        // finite at the origin
        assert!(ball[0].abs() < point[0].abs());
        assert!(ball[0].is_finite());

        let r_nuc = match Nucleus::for_element(cs).model() {
            NuclearModel::Ball { rrms } => (5.0f64 / 3.0).sqrt() * rrms / BOHR_FM,
            NuclearModel::Point => unreachable!(),
        };
        assert_relative_eq!(ball[0], -1.5 * 55.0 / r_nuc, max_relative = 1e-3);
    }
}
