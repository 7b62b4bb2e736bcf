use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// Option greeks computed from a pricing model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    /// Rate of change of option price w.r.t. underlying price.
    pub delta: Decimal,
    /// Rate of change of delta w.r.t. underlying price.
    pub gamma: Decimal,
    /// Rate of change of option price w.r.t. time (per calendar day).
    pub theta: Decimal,
    /// Rate of change of option price w.r.t. volatility (per 1% move).
    pub vega: Decimal,
    /// Rate of change of option price w.r.t. risk-free rate (per 1% move).
    pub rho: Decimal,
}

impl Greeks {
    pub fn zero() -> Self {
        Self {
            delta: Decimal::ZERO,
            gamma: Decimal::ZERO,
            theta: Decimal::ZERO,
            vega: Decimal::ZERO,
            rho: Decimal::ZERO,
        }
    }

    /// Display precision: delta 4 dp, gamma 6 dp, theta/vega/rho 2 dp.
    pub fn rounded(&self) -> Self {
        Self {
            delta: self.delta.round_dp(4),
            gamma: self.gamma.round_dp(6),
            theta: self.theta.round_dp(2),
            vega: self.vega.round_dp(2),
            rho: self.rho.round_dp(2),
        }
    }
}

impl Default for Greeks {
    fn default() -> Self {
        Self::zero()
    }
}

impl Add for Greeks {
    type Output = Greeks;

    fn add(self, other: Greeks) -> Greeks {
        Greeks {
            delta: self.delta + other.delta,
            gamma: self.gamma + other.gamma,
            theta: self.theta + other.theta,
            vega: self.vega + other.vega,
            rho: self.rho + other.rho,
        }
    }
}

impl AddAssign for Greeks {
    fn add_assign(&mut self, other: Greeks) {
        *self = *self + other;
    }
}
