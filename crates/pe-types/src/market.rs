use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{PeError, PeResult};

/// Calendar days per year used for every day <-> year conversion.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Convert a whole number of calendar days into a year fraction.
pub fn years_from_days(days: f64) -> f64 {
    days / DAYS_PER_YEAR
}

/// Ambient market state passed explicitly to every pricing call.
///
/// Rates and volatility are decimals (0.065 = 6.5 %).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketContext {
    /// Underlying spot price.
    pub spot: f64,
    /// Annualised risk-free rate.
    pub risk_free_rate: f64,
    /// Annualised continuous dividend yield.
    #[serde(default)]
    pub dividend_yield: f64,
    /// Annualised implied volatility.
    pub volatility: f64,
}

impl MarketContext {
    pub fn new(spot: f64, risk_free_rate: f64, dividend_yield: f64, volatility: f64) -> Self {
        Self {
            spot,
            risk_free_rate,
            dividend_yield,
            volatility,
        }
    }

    /// Build a context and validate it in one step.
    pub fn try_new(
        spot: f64,
        risk_free_rate: f64,
        dividend_yield: f64,
        volatility: f64,
    ) -> PeResult<Self> {
        let ctx = Self::new(spot, risk_free_rate, dividend_yield, volatility);
        ctx.validate()?;
        Ok(ctx)
    }

    /// Same market, different volatility.
    pub fn with_volatility(&self, volatility: f64) -> Self {
        Self { volatility, ..*self }
    }

    /// Same market, different spot.
    pub fn with_spot(&self, spot: f64) -> Self {
        Self { spot, ..*self }
    }

    pub fn validate(&self) -> PeResult<()> {
        if !self.spot.is_finite() || self.spot <= 0.0 {
            return Err(PeError::invalid_input(
                "spot",
                format!("must be a positive finite number, got {}", self.spot),
            ));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(PeError::invalid_input("risk_free_rate", "must be finite"));
        }
        if !self.dividend_yield.is_finite() || self.dividend_yield < 0.0 {
            return Err(PeError::invalid_input(
                "dividend_yield",
                format!("must be a non-negative finite number, got {}", self.dividend_yield),
            ));
        }
        if !self.volatility.is_finite() || self.volatility <= 0.0 {
            return Err(PeError::invalid_input(
                "volatility",
                format!("must be a positive finite number, got {}", self.volatility),
            ));
        }
        Ok(())
    }
}

impl Default for MarketContext {
    fn default() -> Self {
        Self {
            spot: 17450.0,
            risk_free_rate: 0.065,
            dividend_yield: 0.0,
            volatility: 0.15,
        }
    }
}

impl fmt::Display for MarketContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "S={} r={:.4} q={:.4} σ={:.4}",
            self.spot, self.risk_free_rate, self.dividend_yield, self.volatility
        )
    }
}

/// Index underlyings with their own historical IV ranges and gamma thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Underlying {
    #[default]
    Nifty,
    BankNifty,
    FinNifty,
    Other,
}

impl Underlying {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "NIFTY" => Underlying::Nifty,
            "BANKNIFTY" => Underlying::BankNifty,
            "FINNIFTY" => Underlying::FinNifty,
            _ => Underlying::Other,
        }
    }
}

impl fmt::Display for Underlying {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Underlying::Nifty => "NIFTY",
            Underlying::BankNifty => "BANKNIFTY",
            Underlying::FinNifty => "FINNIFTY",
            Underlying::Other => "OTHER",
        };
        write!(f, "{}", s)
    }
}
