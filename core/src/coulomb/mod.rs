mod table;

pub use table::YkTable;

use crate::orbital::Orbital;

/// The radial multipole integral
///   y^k_ab(r) = int r_<^k / r_>^(k+1) (f_a f_b + g_a g_b)(r') dr'
/// i.e. the rank k Coulomb potential of the overlap density of a and b.
pub fn yk_ab(k: i32, fa: &Orbital, fb: &Orbital) -> Vec<f64> {
    let grid = fa.grid();
    let r = grid.r();
    let max_pt = fa.max_pt().min(fb.max_pt());

    let rho = (0..max_pt)
        .map(|i| fa.f()[i] * fb.f()[i] + fa.g()[i] * fb.g()[i])
        .collect::<Vec<_>>();

    let inner = grid.cumulative_forward(
        &rho.iter()
            .zip(r)
            .map(|(rho, r)| rho * r.powi(k))
            .collect::<Vec<_>>(),
    );
    let outer = grid.cumulative_backward(
        &rho.iter()
            .zip(r)
            .map(|(rho, r)| rho / r.powi(k + 1))
            .collect::<Vec<_>>(),
    );

    r.iter()
        .enumerate()
        .map(|(i, r)| inner[i] / r.powi(k + 1) + r.powi(k) * outer[i])
        .collect()
}
