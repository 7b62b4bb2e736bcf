//! Put-call parity: `C + K·e^(-rT) = P + S·e^(-qT)`.

use serde::{Deserialize, Serialize};

/// Absolute tolerance for a parity match: one paisa/cent.
pub const PARITY_TOLERANCE: f64 = 0.01;

/// Diagnostic report for a call/put pair. Inputs are never adjusted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParityCheck {
    pub valid: bool,
    /// `(C + K·e^(-rT)) - (P + S·e^(-qT))`.
    pub discrepancy: f64,
    /// Call price implied by the put.
    pub synthetic_call: f64,
    /// Put price implied by the call.
    pub synthetic_put: f64,
}

/// Check put-call parity for a matched pair at the same strike and expiry.
pub fn check_parity(
    call_price: f64,
    put_price: f64,
    spot: f64,
    strike: f64,
    time_to_expiry: f64,
    risk_free_rate: f64,
    dividend_yield: f64,
) -> ParityCheck {
    let pv_strike = strike * (-risk_free_rate * time_to_expiry).exp();
    let pv_spot = spot * (-dividend_yield * time_to_expiry).exp();

    let discrepancy = (call_price + pv_strike) - (put_price + pv_spot);

    ParityCheck {
        valid: discrepancy.abs() < PARITY_TOLERANCE,
        discrepancy,
        synthetic_call: put_price + pv_spot - pv_strike,
        synthetic_put: call_price + pv_strike - pv_spot,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::OptionKind;
    use crate::pricing::{price, PricingInput};

    #[test]
    fn test_model_prices_satisfy_parity() {
        let inp = PricingInput {
            spot: 17450.0,
            risk_free_rate: 0.065,
            volatility: 0.15,
            dividend_yield: 0.0,
            time_to_expiry: 30.0 / 365.0,
        };
        let c = price(OptionKind::Call, 17450.0, &inp).unwrap();
        let p = price(OptionKind::Put, 17450.0, &inp).unwrap();
        let check = check_parity(c, p, 17450.0, 17450.0, inp.time_to_expiry, 0.065, 0.0);
        assert!(check.valid, "discrepancy = {}", check.discrepancy);
        assert!((check.synthetic_call - c).abs() < 1e-6);
        assert!((check.synthetic_put - p).abs() < 1e-6);
    }

    #[test]
    fn test_atm_straddle_call_minus_put() {
        // Call and put at the money differ by S·e^(-qT) - K·e^(-rT)
        let t = 30.0 / 365.0;
        let inp = PricingInput {
            spot: 17450.0,
            risk_free_rate: 0.065,
            volatility: 0.15,
            dividend_yield: 0.0,
            time_to_expiry: t,
        };
        let c = price(OptionKind::Call, 17450.0, &inp).unwrap();
        let p = price(OptionKind::Put, 17450.0, &inp).unwrap();
        let expected = 17450.0 - 17450.0 * (-0.065_f64 * t).exp();
        assert!(((c - p) - expected).abs() < 0.01);
        // positive carry makes the call the richer leg
        assert!(c > p);
    }

    #[test]
    fn test_mispriced_pair_is_flagged() {
        let check = check_parity(12.0, 5.0, 100.0, 100.0, 0.5, 0.05, 0.0);
        assert!(!check.valid);
        // C + K e^-rT = 12 + 97.531 = 109.531; P + S = 105
        assert!((check.discrepancy - 4.531).abs() < 0.001);
        assert!((check.synthetic_put - 9.531).abs() < 0.001);
        assert!((check.synthetic_call - 7.469).abs() < 0.001);
    }

    #[test]
    fn test_tolerance_is_absolute_one_cent() {
        let pv_k = 100.0 * (-0.05_f64 * 0.5).exp();
        let fair_call = 5.0 + 100.0 - pv_k;
        assert!(check_parity(fair_call + 0.009, 5.0, 100.0, 100.0, 0.5, 0.05, 0.0).valid);
        assert!(!check_parity(fair_call + 0.011, 5.0, 100.0, 100.0, 0.5, 0.05, 0.0).valid);
    }
}
