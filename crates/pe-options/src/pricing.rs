//! Black-Scholes-Merton pricing and greeks for European options.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pe_types::{precondition, years_from_days, MarketContext, PeResult};

use crate::contract::OptionKind;
use crate::greeks::Greeks;
use crate::math::{d1_d2, norm_cdf, norm_pdf};

/// Inputs shared by all pricing calls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingInput {
    /// Current underlying spot price.
    pub spot: f64,
    /// Annualised risk-free rate (e.g. 0.065 = 6.5 %).
    pub risk_free_rate: f64,
    /// Annualised implied volatility (e.g. 0.15 = 15 %).
    pub volatility: f64,
    /// Continuous dividend yield (e.g. 0.02 = 2 %).
    pub dividend_yield: f64,
    /// Time to expiry in years.
    pub time_to_expiry: f64,
}

impl PricingInput {
    /// Inputs for an option with `days` calendar days left under `ctx`.
    pub fn from_market(ctx: &MarketContext, days: f64) -> Self {
        Self {
            spot: ctx.spot,
            risk_free_rate: ctx.risk_free_rate,
            volatility: ctx.volatility,
            dividend_yield: ctx.dividend_yield,
            time_to_expiry: years_from_days(days),
        }
    }

    pub fn with_volatility(&self, volatility: f64) -> Self {
        Self { volatility, ..*self }
    }

    fn check(&self, strike: f64) -> PeResult<()> {
        if !(self.spot > 0.0) || !self.spot.is_finite() {
            return Err(precondition!("spot must be positive, got {}", self.spot));
        }
        if !(strike > 0.0) || !strike.is_finite() {
            return Err(precondition!("strike must be positive, got {}", strike));
        }
        if self.time_to_expiry.is_nan() {
            return Err(precondition!("time to expiry is NaN"));
        }
        Ok(())
    }
}

/// Result of a pricing calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingResult {
    /// Theoretical option price.
    pub price: Decimal,
    /// Greeks.
    pub greeks: Greeks,
    pub intrinsic: Decimal,
    /// Time value; never negative.
    pub extrinsic: Decimal,
    pub d1: f64,
    pub d2: f64,
    /// Risk-neutral probability of finishing in the money.
    pub prob_itm: f64,
}

impl PricingResult {
    /// Copy with prices and greeks rounded for display.
    pub fn rounded(&self) -> Self {
        Self {
            price: self.price.round_dp(2),
            greeks: self.greeks.rounded(),
            intrinsic: self.intrinsic.round_dp(2),
            extrinsic: self.extrinsic.round_dp(2),
            ..self.clone()
        }
    }
}

pub(crate) fn to_dec(v: f64) -> Decimal {
    Decimal::from_f64(v).unwrap_or(Decimal::ZERO)
}

/// Theoretical price only; the cheap path used by the IV solver and projections.
///
/// At `time_to_expiry <= 0` this is exactly the intrinsic value.
pub fn price(kind: OptionKind, strike: f64, input: &PricingInput) -> PeResult<f64> {
    input.check(strike)?;
    let s = input.spot;
    let t = input.time_to_expiry;

    if t <= 0.0 {
        return Ok(kind.intrinsic_value(s, strike));
    }

    let r = input.risk_free_rate;
    let q = input.dividend_yield;
    let (d1, d2) = d1_d2(s, strike, t, r, input.volatility, q)?;
    Ok(closed_form(kind, s, strike, (-r * t).exp(), (-q * t).exp(), d1, d2))
}

/// BSM closed form given the discount factors and d1/d2.
///
/// Floored at zero: the CDF approximation can leave a deep OTM price a few
/// ulps below it.
fn closed_form(kind: OptionKind, s: f64, k: f64, disc: f64, div_disc: f64, d1: f64, d2: f64) -> f64 {
    let value = match kind {
        OptionKind::Call => s * div_disc * norm_cdf(d1) - k * disc * norm_cdf(d2),
        OptionKind::Put => k * disc * norm_cdf(-d2) - s * div_disc * norm_cdf(-d1),
    };
    value.max(0.0)
}

/// Price a European option and its greeks.
pub fn greeks(kind: OptionKind, strike: f64, input: &PricingInput) -> PeResult<PricingResult> {
    input.check(strike)?;
    let s = input.spot;
    let k = strike;
    let r = input.risk_free_rate;
    let q = input.dividend_yield;
    let sigma = input.volatility;
    let t = input.time_to_expiry;
    let intrinsic = kind.intrinsic_value(s, k);

    // Degenerate: expired option
    if t <= 0.0 {
        let delta = match kind {
            OptionKind::Call if s > k => Decimal::ONE,
            OptionKind::Put if s < k => Decimal::NEGATIVE_ONE,
            _ => Decimal::ZERO,
        };
        return Ok(PricingResult {
            price: to_dec(intrinsic),
            greeks: Greeks {
                delta,
                ..Greeks::zero()
            },
            intrinsic: to_dec(intrinsic),
            extrinsic: Decimal::ZERO,
            d1: 0.0,
            d2: 0.0,
            prob_itm: if intrinsic > 0.0 { 1.0 } else { 0.0 },
        });
    }

    let (d1, d2) = d1_d2(s, k, t, r, sigma, q)?;
    let disc = (-r * t).exp();
    let div_disc = (-q * t).exp();
    let sqrt_t = t.sqrt();

    let price = closed_form(kind, s, k, disc, div_disc, d1, d2);

    // --- Greeks ---
    let delta = match kind {
        OptionKind::Call => div_disc * norm_cdf(d1),
        OptionKind::Put => div_disc * (norm_cdf(d1) - 1.0),
    };

    let gamma = div_disc * norm_pdf(d1) / (s * sigma * sqrt_t);

    let theta_common = -(s * sigma * div_disc * norm_pdf(d1)) / (2.0 * sqrt_t);
    let theta = match kind {
        OptionKind::Call => {
            theta_common + q * s * div_disc * norm_cdf(d1) - r * k * disc * norm_cdf(d2)
        }
        OptionKind::Put => {
            theta_common - q * s * div_disc * norm_cdf(-d1) + r * k * disc * norm_cdf(-d2)
        }
    };
    // Convert theta to per-calendar-day
    let theta_daily = theta / 365.0;

    // Vega per 1 % vol move
    let vega_pct = s * div_disc * sqrt_t * norm_pdf(d1) * 0.01;

    let rho_pct = match kind {
        OptionKind::Call => k * t * disc * norm_cdf(d2) * 0.01,
        OptionKind::Put => -k * t * disc * norm_cdf(-d2) * 0.01,
    };

    let prob_itm = match kind {
        OptionKind::Call => norm_cdf(d2),
        OptionKind::Put => norm_cdf(-d2),
    };

    let extrinsic = (price - intrinsic).max(0.0);

    Ok(PricingResult {
        price: to_dec(price),
        greeks: Greeks {
            delta: to_dec(delta),
            gamma: to_dec(gamma),
            theta: to_dec(theta_daily),
            vega: to_dec(vega_pct),
            rho: to_dec(rho_pct),
        },
        intrinsic: to_dec(intrinsic),
        extrinsic: to_dec(extrinsic),
        d1,
        d2,
        prob_itm,
    })
}
