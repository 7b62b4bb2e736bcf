//! Premium erosion projections driven by a quoted theta.
//!
//! These models extrapolate a single daily theta forward instead of
//! re-pricing; they answer "how much of this premium is gone by expiry if
//! decay keeps its current pace (with acceleration)".

use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;

use pe_options::Moneyness;
use pe_portfolio::OptionPosition;
use pe_types::{invalid_input, PeResult};

/// Default end-of-life theta acceleration.
pub const DEFAULT_ACCELERATION: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ErosionModel {
    /// Theta scaled linearly from 1× on the first day to `acceleration`× on the last.
    Linear { acceleration: f64 },
    /// Theta scaled by `1/√(days left)`, stronger for ATM strikes.
    NonLinear { atm: bool },
}

impl Default for ErosionModel {
    fn default() -> Self {
        ErosionModel::Linear {
            acceleration: DEFAULT_ACCELERATION,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErosionParams {
    pub premium: f64,
    /// Daily theta; negative for decay.
    pub theta: f64,
    /// Price change per 1 vol point.
    pub vega: f64,
    /// Expected IV change in percentage points over the life of the option.
    pub volatility_change: f64,
    pub days_to_expiry: u32,
    pub model: ErosionModel,
}

impl ErosionParams {
    /// Parameters taken from a priced position; no volatility change.
    pub fn from_position(position: &OptionPosition, model: ErosionModel) -> Self {
        Self {
            premium: position.premium_f64(),
            theta: position.greeks.theta.to_f64().unwrap_or(0.0),
            vega: position.greeks.vega.to_f64().unwrap_or(0.0),
            volatility_change: 0.0,
            days_to_expiry: position.days_to_expiry,
            model,
        }
    }

    /// Model suited to the position's moneyness.
    pub fn non_linear_for(moneyness: Moneyness) -> ErosionModel {
        ErosionModel::NonLinear {
            atm: moneyness == Moneyness::Atm,
        }
    }

    fn validate(&self) -> PeResult<()> {
        if !self.premium.is_finite() || self.premium < 0.0 {
            return Err(invalid_input!("premium", "must be a non-negative number, got {}", self.premium));
        }
        if !self.theta.is_finite() {
            return Err(invalid_input!("theta", "must be finite"));
        }
        if !self.vega.is_finite() || !self.volatility_change.is_finite() {
            return Err(invalid_input!("vega", "vega and volatility change must be finite"));
        }
        if !(1..=365).contains(&self.days_to_expiry) {
            return Err(invalid_input!(
                "days_to_expiry",
                "must be in [1, 365], got {}",
                self.days_to_expiry
            ));
        }
        if let ErosionModel::Linear { acceleration } = self.model {
            if !acceleration.is_finite() || acceleration <= 0.0 {
                return Err(invalid_input!("acceleration", "must be positive, got {}", acceleration));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErosionProjection {
    pub daily: f64,
    pub weekly: f64,
    /// Signed; never larger in magnitude than the premium.
    pub total_erosion: f64,
    pub premium_in_week: f64,
    pub premium_at_expiry: f64,
}

/// `Σ θ·(1 + (i/days)·(acceleration − 1))` for `i` in `0..days`.
pub fn linear_erosion(theta: f64, days: u32, acceleration: f64) -> f64 {
    if days == 0 {
        return 0.0;
    }
    let n = f64::from(days);
    (0..days)
        .map(|i| theta * (1.0 + (f64::from(i) / n) * (acceleration - 1.0)))
        .sum()
}

/// Square-root-of-time decay. Stops once a day's decay would exceed what is
/// left of the premium.
pub fn non_linear_erosion(premium: f64, theta: f64, days: u32, atm: bool) -> f64 {
    let weight = if atm { 1.2 } else { 0.8 };
    let mut total = 0.0;
    let mut remaining = premium;
    for i in 0..days {
        let left = f64::from(days - i);
        let daily = theta * (1.0 / left.sqrt()) * weight;
        if daily.abs() > remaining {
            break;
        }
        total += daily;
        remaining += daily;
    }
    total
}

pub fn project_erosion(params: &ErosionParams) -> PeResult<ErosionProjection> {
    params.validate()?;
    let p = params;

    let mut total = match p.model {
        ErosionModel::Linear { acceleration } => linear_erosion(p.theta, p.days_to_expiry, acceleration),
        ErosionModel::NonLinear { atm } => non_linear_erosion(p.premium, p.theta, p.days_to_expiry, atm),
    };
    if p.vega != 0.0 && p.volatility_change != 0.0 {
        total += p.vega * (p.volatility_change / 100.0);
    }
    let total_erosion = total.abs().min(p.premium) * total.signum();
    let weekly = p.theta * 7.0;

    Ok(ErosionProjection {
        daily: p.theta,
        weekly,
        total_erosion,
        premium_in_week: (p.premium + weekly).max(0.0),
        premium_at_expiry: (p.premium + total_erosion).max(0.0),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErosionPoint {
    pub day: u32,
    pub days_remaining: u32,
    pub premium: f64,
}

/// Day-by-day premium under accelerating linear decay, for `0..=projection_days`.
///
/// With `skip_weekends`, days where `d % 7 >= 5` add no decay.
pub fn erosion_path(
    premium: f64,
    theta: f64,
    projection_days: u32,
    acceleration: f64,
    skip_weekends: bool,
) -> Vec<ErosionPoint> {
    let n = f64::from(projection_days);
    let mut decay = 0.0;
    let mut path = Vec::with_capacity(projection_days as usize + 1);

    for day in 0..=projection_days {
        if day > 0 {
            let d = day - 1;
            if !(skip_weekends && d % 7 >= 5) {
                decay += theta * (1.0 + (f64::from(d) / n) * (acceleration - 1.0));
            }
        }
        path.push(ErosionPoint {
            day,
            days_remaining: projection_days - day,
            premium: (premium + decay).max(0.0),
        });
    }
    path
}

/// `|call θ / put θ|`; absent when the put has no theta.
pub fn erosion_ratio(call_theta: f64, put_theta: f64) -> Option<f64> {
    if put_theta == 0.0 {
        return None;
    }
    Some((call_theta / put_theta).abs())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfidenceBand {
    Low,
    Medium,
    High,
}

impl fmt::Display for ConfidenceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConfidenceBand::Low => "Low Erosion Risk",
            ConfidenceBand::Medium => "Medium Erosion Risk",
            ConfidenceBand::High => "High Erosion Risk",
        };
        write!(f, "{}", s)
    }
}

/// Band by daily theta as a percent of premium: ≥ 2 % high, ≥ 1 % medium.
pub fn confidence_band(premium: f64, daily_theta: f64) -> PeResult<ConfidenceBand> {
    if !(premium > 0.0) || !premium.is_finite() {
        return Err(invalid_input!("premium", "must be positive to rate erosion, got {}", premium));
    }
    let impact = daily_theta.abs() / premium * 100.0;
    Ok(if impact >= 2.0 {
        ConfidenceBand::High
    } else if impact >= 1.0 {
        ConfidenceBand::Medium
    } else {
        ConfidenceBand::Low
    })
}
