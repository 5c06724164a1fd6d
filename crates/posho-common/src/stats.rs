//! Normal-distribution helpers
//!
//! The likelihood convolves binned stellar tracks with Gaussian photometric
//! errors, which only needs the standard normal CDF. The error function is
//! evaluated with the Abramowitz & Stegun 7.1.26 rational approximation
//! (absolute error below 1.5e-7, well under photometric precision).

use std::f64::consts::SQRT_2;

/// Error function approximation (Abramowitz & Stegun 7.1.26)
pub fn erf(x: f64) -> f64 {
    const P: f64 = 0.327_591_1;
    const A1: f64 = 0.254_829_592;
    const A2: f64 = -0.284_496_736;
    const A3: f64 = 1.421_413_741;
    const A4: f64 = -1.453_152_027;
    const A5: f64 = 1.061_405_429;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + P * x);
    let poly = t * (A1 + t * (A2 + t * (A3 + t * (A4 + t * A5))));
    sign * (1.0 - poly * (-x * x).exp())
}

/// Standard normal cumulative distribution function
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / SQRT_2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_erf_reference_values() {
        assert_eq!(erf(0.0), 0.0);
        assert!((erf(1.0) - 0.842_700_79).abs() < 1e-6);
        assert!((erf(2.0) - 0.995_322_27).abs() < 1e-6);
        assert!((erf(-1.0) + 0.842_700_79).abs() < 1e-6);
    }

    #[test]
    fn test_norm_cdf_reference_values() {
        assert_eq!(norm_cdf(0.0), 0.5);
        assert!((norm_cdf(1.96) - 0.975_002_1).abs() < 1e-6);
        assert!((norm_cdf(-1.96) - 0.024_997_9).abs() < 1e-6);
        // Effectively saturated in the tails
        assert!(norm_cdf(6.0) > 0.999_999_99);
        assert!(norm_cdf(-6.0) < 1e-8);
    }

    proptest! {
        #[test]
        fn prop_norm_cdf_monotone(a in -8.0f64..8.0, b in -8.0f64..8.0) {
            let (lo, hi) = if a < b { (a, b) } else { (b, a) };
            prop_assert!(norm_cdf(lo) <= norm_cdf(hi));
        }

        #[test]
        fn prop_norm_cdf_symmetric(x in -8.0f64..8.0) {
            let total = norm_cdf(x) + norm_cdf(-x);
            prop_assert!((total - 1.0).abs() < 1e-6);
        }
    }
}
