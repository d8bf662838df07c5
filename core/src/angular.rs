//! Angular coefficients for the multipole expansion of the Coulomb interaction.
//!
//! All angular momenta are passed doubled, so half-integer values are exact integers.

use crate::orbital::{l_of, twoj_of};

/// n! as a float. Only small arguments occur in atomic calculations.
fn factorial(n: i32) -> f64 {
    debug_assert!(n >= 0);
    (2..=n).fold(1.0, |acc, x| acc * x as f64)
}

/// Whether the three (doubled) angular momenta satisfy the triangle rule
pub fn triangle(two_j1: i32, two_j2: i32, two_j3: i32) -> bool {
    two_j3 >= (two_j1 - two_j2).abs()
        && two_j3 <= two_j1 + two_j2
        && (two_j1 + two_j2 + two_j3) % 2 == 0
}

/// The parity selection rule for the Coulomb multipole of rank k between two orbital
/// angular momenta: l_a + l_b + k must be even.
pub fn parity(la: i32, lb: i32, k: i32) -> bool {
    (la + lb + k) % 2 == 0
}

/// Wigner 3j symbol (j1 j2 j3; m1 m2 m3) with all arguments doubled, via the Racah formula
pub fn threej_2(two_j1: i32, two_j2: i32, two_j3: i32, two_m1: i32, two_m2: i32, two_m3: i32) -> f64 {
    if two_m1 + two_m2 + two_m3 != 0 || !triangle(two_j1, two_j2, two_j3) {
        return 0.0;
    }
    for (two_j, two_m) in [(two_j1, two_m1), (two_j2, two_m2), (two_j3, two_m3)] {
        if two_m.abs() > two_j || (two_j + two_m) % 2 != 0 {
            return 0.0;
        }
    }

    // undoubled integer combinations
    let j1pj2mj3 = (two_j1 + two_j2 - two_j3) / 2;
    let j1mj2pj3 = (two_j1 - two_j2 + two_j3) / 2;
    let mj1pj2pj3 = (-two_j1 + two_j2 + two_j3) / 2;
    let jsum = (two_j1 + two_j2 + two_j3) / 2;

    let triangle_coefficient = factorial(j1pj2mj3) * factorial(j1mj2pj3) * factorial(mj1pj2pj3)
        / factorial(jsum + 1);

    let m_factor = factorial((two_j1 + two_m1) / 2)
        * factorial((two_j1 - two_m1) / 2)
        * factorial((two_j2 + two_m2) / 2)
        * factorial((two_j2 - two_m2) / 2)
        * factorial((two_j3 + two_m3) / 2)
        * factorial((two_j3 - two_m3) / 2);

    let a = (two_j3 - two_j2 + two_m1) / 2;
    let b = (two_j3 - two_j1 - two_m2) / 2;
    let c = (two_j1 - two_m1) / 2;
    let d = (two_j2 + two_m2) / 2;

    let t_min = 0.max(-a).max(-b);
    let t_max = j1pj2mj3.min(c).min(d);

    let sum = (t_min..=t_max)
        .map(|t| {
            let sign = if t % 2 == 0 { 1.0 } else { -1.0 };
            sign / (factorial(t)
                * factorial(a + t)
                * factorial(b + t)
                * factorial(j1pj2mj3 - t)
                * factorial(c - t)
                * factorial(d - t))
        })
        .sum::<f64>();

    let phase = if ((two_j1 - two_j2 - two_m3) / 2) % 2 == 0 {
        1.0
    } else {
        -1.0
    };

    phase * (triangle_coefficient * m_factor).sqrt() * sum
}

/// Lambda^k_ab = (j_a k j_b; -1/2 0 1/2)^2, zero unless l_a + l_b + k is even.
/// Weight of the rank k multipole in the exchange interaction of two orbitals.
pub fn lambda_k(k: i32, kappa_a: i32, kappa_b: i32) -> f64 {
    if !parity(l_of(kappa_a), l_of(kappa_b), k) {
        return 0.0;
    }
    let tjs = threej_2(twoj_of(kappa_a), 2 * k, twoj_of(kappa_b), -1, 0, 1);
    tjs * tjs
}

/// Range of multipoles k allowed by the triangle rule for two orbitals
pub fn k_range(kappa_a: i32, kappa_b: i32) -> std::ops::RangeInclusive<i32> {
    let (tja, tjb) = (twoj_of(kappa_a), twoj_of(kappa_b));
    ((tja - tjb).abs() / 2)..=((tja + tjb) / 2)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn known_threej_values() {
        // (1 1 0; 0 0 0) = -1/sqrt(3)
        assert_relative_eq!(threej_2(2, 2, 0, 0, 0, 0), -1.0 / 3f64.sqrt(), epsilon = 1e-14);
        // (1 1 2; 1 -1 0) = 1/sqrt(30)
        assert_relative_eq!(threej_2(2, 2, 4, 2, -2, 0), (1.0f64 / 30.0).sqrt(), epsilon = 1e-14);
        // (1/2 1/2 1; 1/2 -1/2 0) = 1/sqrt(6)
        assert_relative_eq!(threej_2(1, 1, 2, 1, -1, 0), 1.0 / 6f64.sqrt(), epsilon = 1e-14);
        // m's don't sum to zero
        assert_eq!(threej_2(2, 2, 2, 2, 2, 0), 0.0);
        // triangle rule violated
        assert_eq!(threej_2(2, 2, 6, 0, 0, 0), 0.0);
    }

    #[test]
    fn orthogonality() {
        // sum_{m1 m2} (j1 j2 j3; m1 m2 m3)^2 = 1 / (2 j3 + 1)
        let (two_j1, two_j2) = (3, 5);
        for two_j3 in ((two_j2 - two_j1)..=(two_j1 + two_j2)).step_by(2) {
            for two_m3 in (-two_j3..=two_j3).step_by(2) {
                let mut sum = 0.0;
                for two_m1 in (-two_j1..=two_j1).step_by(2) {
                    let two_m2 = -two_m1 - two_m3;
                    sum += threej_2(two_j1, two_j2, two_j3, two_m1, two_m2, two_m3).powi(2);
                }
                assert_relative_eq!(sum, 1.0 / (two_j3 + 1) as f64, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn exchange_weights() {
        assert_relative_eq!(lambda_k(0, -1, -1), 0.5, epsilon = 1e-14);
        assert_relative_eq!(lambda_k(1, -1, 1), 1.0 / 6.0, epsilon = 1e-14);
        assert_relative_eq!(lambda_k(1, -1, -2), 1.0 / 6.0, epsilon = 1e-14);
        // s with s for k=1 is forbidden by parity
        assert_eq!(lambda_k(1, -1, -1), 0.0);
        assert_eq!(k_range(-1, -2), 1..=2);
        assert_eq!(k_range(-2, -2), 0..=3);
    }
}
