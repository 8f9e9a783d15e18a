//! Special functions for the goodness-of-fit test
//!
//! The chi-squared survival function is the regularised upper incomplete
//! gamma function Q(k/2, x/2). Q is evaluated by its power series below
//! `a + 1` and by a continued fraction (modified Lentz) above it.

const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEFFICIENTS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

const MAX_ITERATIONS: usize = 1000;
const EPSILON: f64 = 1e-15;
const TINY: f64 = 1e-300;

/// Natural log of the gamma function, for `x > 0`
pub fn ln_gamma(x: f64) -> f64 {
    if x < 0.5 {
        // Reflection formula
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }

    let x = x - 1.0;
    let mut sum = LANCZOS_COEFFICIENTS[0];
    for (i, c) in LANCZOS_COEFFICIENTS.iter().enumerate().skip(1) {
        sum += c / (x + i as f64);
    }
    let t = x + LANCZOS_G + 0.5;
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + sum.ln()
}

/// Natural log of the binomial coefficient C(n, k)
pub fn ln_choose(n: u64, k: u64) -> f64 {
    ln_gamma(n as f64 + 1.0) - ln_gamma(k as f64 + 1.0) - ln_gamma((n - k) as f64 + 1.0)
}

/// Regularised upper incomplete gamma function Q(a, x)
pub fn regularized_gamma_q(a: f64, x: f64) -> f64 {
    if a <= 0.0 || x < 0.0 || a.is_nan() || x.is_nan() {
        return f64::NAN;
    }
    if x == 0.0 {
        return 1.0;
    }
    if x.is_infinite() {
        return 0.0;
    }

    if x < a + 1.0 {
        1.0 - lower_series(a, x)
    } else {
        upper_continued_fraction(a, x)
    }
}

/// Regularised lower incomplete gamma P(a, x) by series expansion
fn lower_series(a: f64, x: f64) -> f64 {
    let mut term = 1.0 / a;
    let mut sum = term;
    let mut ap = a;
    for _ in 0..MAX_ITERATIONS {
        ap += 1.0;
        term *= x / ap;
        sum += term;
        if term.abs() < sum.abs() * EPSILON {
            break;
        }
    }
    (sum.ln() - x + a * x.ln() - ln_gamma(a)).exp()
}

/// Regularised upper incomplete gamma Q(a, x) by continued fraction
fn upper_continued_fraction(a: f64, x: f64) -> f64 {
    let mut b = x + 1.0 - a;
    let mut c = 1.0 / TINY;
    let mut d = 1.0 / b;
    let mut h = d;
    for i in 1..=MAX_ITERATIONS {
        let an = -(i as f64) * (i as f64 - a);
        b += 2.0;
        d = an * d + b;
        if d.abs() < TINY {
            d = TINY;
        }
        c = b + an / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;
        if (delta - 1.0).abs() < EPSILON {
            break;
        }
    }
    (a * x.ln() - x - ln_gamma(a)).exp() * h
}

/// Probability of a chi-squared statistic at least this large
pub fn chi_squared_sf(statistic: f64, degrees_of_freedom: usize) -> f64 {
    if degrees_of_freedom == 0 {
        return f64::NAN;
    }
    if statistic <= 0.0 {
        return 1.0;
    }
    regularized_gamma_q(degrees_of_freedom as f64 / 2.0, statistic / 2.0)
}

/// Pearson's chi-squared goodness-of-fit test
///
/// Returns the statistic and its p-value with `len - 1` degrees of freedom.
/// Expected counts must be non-zero.
pub fn chi_square_test(observed: &[f64], expected: &[f64]) -> (f64, f64) {
    let statistic: f64 = observed
        .iter()
        .zip(expected)
        .map(|(o, e)| (o - e) * (o - e) / e)
        .sum();
    let dof = observed.len().saturating_sub(1);
    (statistic, chi_squared_sf(statistic, dof))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn test_ln_gamma_factorials() {
        assert!(close(ln_gamma(1.0), 0.0, 1e-12));
        assert!(close(ln_gamma(5.0), 24f64.ln(), 1e-12));
        assert!(close(ln_gamma(0.5), std::f64::consts::PI.sqrt().ln(), 1e-12));
        assert!(close(ln_gamma(101.0), (1..=100).map(|i| (i as f64).ln()).sum(), 1e-8));
    }

    #[test]
    fn test_ln_choose() {
        assert!(close(ln_choose(5, 2), 10f64.ln(), 1e-12));
        assert!(close(ln_choose(10, 0), 0.0, 1e-12));
    }

    #[test]
    fn test_chi_squared_survival() {
        // Critical value at 5% for one degree of freedom
        assert!(close(chi_squared_sf(3.841_458_820_694_124, 1), 0.05, 1e-9));
        // Two degrees of freedom is an exponential: Q = exp(-x/2)
        assert!(close(chi_squared_sf(2.0, 2), (-1.0f64).exp(), 1e-12));
        assert!(close(chi_squared_sf(20.0, 2), (-10.0f64).exp(), 1e-12));
        // Critical value at 5% for ten degrees of freedom
        assert!(close(chi_squared_sf(18.307_038_053_275_146, 10), 0.05, 1e-9));
        assert_eq!(chi_squared_sf(0.0, 3), 1.0);
        assert!(chi_squared_sf(1.0, 0).is_nan());
    }

    #[test]
    fn test_perfect_fit_has_p_one() {
        let (stat, p) = chi_square_test(&[25.0, 50.0, 25.0], &[25.0, 50.0, 25.0]);
        assert_eq!(stat, 0.0);
        assert_eq!(p, 1.0);
    }

    #[test]
    fn test_bad_fit_has_small_p() {
        let (stat, p) = chi_square_test(&[0.0, 0.0, 100.0], &[13.0, 27.0, 27.0]);
        assert!(stat > 100.0);
        assert!(p < 1e-10);
    }
}
