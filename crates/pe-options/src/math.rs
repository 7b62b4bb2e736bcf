//! Normal distribution helpers and the Black-Scholes-Merton d1/d2 terms.

use pe_types::{precondition, PeResult};

const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;

/// Standard normal cumulative distribution function (Abramowitz & Stegun 26.2.17).
///
/// Absolute error is below 7.5e-8. The lower half is evaluated directly as
/// the mirrored upper tail, so small probabilities keep full precision and
/// `norm_cdf(-x) == 1 - norm_cdf(x)` up to rounding.
pub fn norm_cdf(x: f64) -> f64 {
    if x >= 8.0 {
        return 1.0;
    }
    if x <= -8.0 {
        return 0.0;
    }
    if x < 0.0 {
        upper_tail(-x)
    } else {
        1.0 - upper_tail(x)
    }
}

/// `1 - N(x)` for `x >= 0`.
fn upper_tail(x: f64) -> f64 {
    let b1 = 0.319381530_f64;
    let b2 = -0.356563782_f64;
    let b3 = 1.781477937_f64;
    let b4 = -1.821255978_f64;
    let b5 = 1.330274429_f64;
    let p = 0.2316419_f64;

    let t = 1.0 / (1.0 + p * x);
    let poly = ((((b5 * t + b4) * t + b3) * t + b2) * t + b1) * t;
    norm_pdf(x) * poly
}

/// Standard normal probability density function.
pub fn norm_pdf(x: f64) -> f64 {
    INV_SQRT_2PI * (-0.5 * x * x).exp()
}

/// Compute d1 and d2.
///
/// Returns `(0, 0)` when `t <= 0`; pricing at expiry is handled by the caller.
/// A non-positive `sigma`, spot or strike with time remaining is a domain error.
pub fn d1_d2(s: f64, k: f64, t: f64, r: f64, sigma: f64, q: f64) -> PeResult<(f64, f64)> {
    if t <= 0.0 {
        return Ok((0.0, 0.0));
    }
    if !(sigma > 0.0) || !sigma.is_finite() {
        return Err(precondition!("d1/d2 requires sigma > 0, got {}", sigma));
    }
    if !(s > 0.0) || !(k > 0.0) || !s.is_finite() || !k.is_finite() {
        return Err(precondition!(
            "d1/d2 requires positive spot and strike, got S={} K={}",
            s,
            k
        ));
    }

    let vol_sqrt_t = sigma * t.sqrt();
    let d1 = ((s / k).ln() + (r - q + 0.5 * sigma * sigma) * t) / vol_sqrt_t;
    let d2 = d1 - vol_sqrt_t;
    Ok((d1, d2))
}
