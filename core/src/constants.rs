/// Fine structure constant (CODATA 2018)
pub const ALPHA: f64 = 1.0 / 137.035999084;

/// Bohr radius in femtometres
pub const BOHR_FM: f64 = 52917.721090380;
