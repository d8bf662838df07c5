use crate::orbital::{l_of, max_n, Orbital};

/// Rough starting energy for a core state, from a screened hydrogen-like formula.
/// Screening counts every electron in lower shells plus half of those in the same
/// (n, l) shell.
pub fn core_energy_guess(n: i32, kappa: i32, z: f64, core: &[Orbital]) -> f64 {
    let l = l_of(kappa);
    let (below, this) = core.iter().fold((0.0, 0.0), |(below, this), fc| {
        let this = if fc.n() == n && fc.l() == l {
            this + fc.num_electrons()
        } else {
            this
        };
        let below = if fc.n() < n || (fc.n() == n && fc.l() < l) {
            below + fc.num_electrons()
        } else {
            below
        };
        (below, this)
    });

    let z_eff = f64::max(1.0, 1.0 + z - below - 0.5 * this);
    let mut en = -0.5 * (z_eff / n as f64).powi(2);
    if n > 1 {
        en *= 0.5;
    }
    if z_eff < 10.0 {
        match l {
            0 => en *= 2.5,
            1 => en *= 3.5,
            _ => {}
        }
    }
    en
}

/// Rough starting energy for a valence state outside `core`, from the ionic charge
/// and an effective principal quantum number.
pub fn valence_energy_guess(n: i32, kappa: i32, z: f64, core: &[Orbital]) -> f64 {
    let max_n = max_n(core);
    let l = l_of(kappa);
    let x: f64 = if max_n < 4 { 0.25 } else { 1.0 };
    let neff = 1.0
        + (n - max_n) as f64
        + match l {
            0 => 0.0,
            1 => 0.5 * x,
            2 => 2.0 * x.sqrt(),
            _ => 4.0 * x,
        };

    let z_eff = z - core.iter().map(Orbital::num_electrons).sum::<f64>();
    let z_eff = if z_eff <= 0.0 { 0.5 } else { z_eff };
    -0.5 * z_eff * z_eff / (neff * neff)
}
