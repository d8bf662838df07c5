use super::HartreeFock;
use crate::{
    angular::{k_range, lambda_k},
    dirac::RadialSolver,
};

impl<S: RadialSolver> HartreeFock<S> {
    /// Total energy of the core:
    ///   E = sum_a x_a e_a - 1/2 sum_ab x_a x_b (R^0_abab - sum_k Lambda^k_ab R^k_abba)
    /// with x = (2j+1) occ and R^k_abcd = int (f_a f_c + g_a g_c) y^k_bd.
    ///
    /// Uses the current multipole table, so is only meaningful once the table has been
    /// formed from the current core.
    pub fn calculate_core_energy(&self) -> f64 {
        let mut total = 0.0;
        for (ia, fa) in self.core.iter().enumerate() {
            let xa = fa.num_electrons();
            let e1 = xa * fa.en();
            let mut e2 = 0.0;
            let mut e3 = 0.0;

            for (ib, fb) in self.core.iter().enumerate() {
                let xb = fb.num_electrons();
                let y0bb = self.yk.get(0, fb, fb).unwrap_or_else(|| {
                    panic!("missing y^0 for {} in the multipole table", fb.symbol())
                });
                e2 += xa * xb * fa.overlap(&fa.apply(y0bb));

                // each pair once
                if ib > ia {
                    continue;
                }
                let y = if ia == ib { 1.0 } else { 2.0 };
                for k in k_range(fa.kappa(), fb.kappa()) {
                    let lambda = lambda_k(k, fa.kappa(), fb.kappa());
                    if lambda == 0.0 {
                        continue;
                    }
                    let Some(yk) = self.yk.get(k, fa, fb) else {
                        continue;
                    };
                    e3 += y * xa * xb * lambda * fa.overlap(&fb.apply(yk));
                }
            }
            total += e1 - 0.5 * (e2 - e3);
        }
        total
    }
}
