//! Engine configuration.
//!
//! Every section has a `Default` matching the calculator's stock settings, so
//! an empty JSON object is a valid configuration. Environment variables with
//! the `PE_` prefix override the market and projection defaults.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::errors::PeResult;
use crate::market::{MarketContext, Underlying};
use crate::config_error;

/// Bisection settings for the implied volatility solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IvSolverConfig {
    pub max_iterations: u32,
    /// Absolute price tolerance.
    pub tolerance: f64,
    /// Lower edge of the search bracket (0.001 = 0.1 % vol).
    pub min_vol: f64,
    /// Upper edge of the search bracket (5.0 = 500 % vol).
    pub max_vol: f64,
    pub initial_guess: f64,
}

impl Default for IvSolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 0.0001,
            min_vol: 0.001,
            max_vol: 5.0,
            initial_guess: 0.3,
        }
    }
}

/// Defaults for the decay and P&L projections.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub horizon_days: u32,
    /// Half-width of the P&L price window as a fraction of spot.
    pub price_range_pct: f64,
    pub steps: u32,
    pub include_premium: bool,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            horizon_days: 30,
            price_range_pct: 0.10,
            steps: 40,
            include_premium: true,
        }
    }
}

/// Strike-vs-spot bands for the five-tier moneyness classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoneynessBands {
    /// Half-width of the ATM band (0.005 = ±0.5 % of spot).
    pub atm: f64,
    /// Distance beyond which a strike is deep ITM/OTM (0.02 = 2 %).
    pub deep: f64,
}

impl Default for MoneynessBands {
    fn default() -> Self {
        Self {
            atm: 0.005,
            deep: 0.02,
        }
    }
}

/// Position book behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookConfig {
    /// Strike shift applied by `clone` (added for calls, subtracted for puts).
    pub clone_strike_offset: Decimal,
    /// Listed strike interval; default ATM positions round spot to it.
    pub strike_step: Decimal,
    /// Days to expiry for default ATM positions.
    pub default_days: u32,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            clone_strike_offset: Decimal::from(100),
            strike_step: Decimal::from(50),
            default_days: 30,
        }
    }
}

/// Historical IV range and gamma alert level for one underlying.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InstrumentProfile {
    /// Historical IV floor, in percent.
    pub iv_min: f64,
    /// Historical IV ceiling, in percent.
    pub iv_max: f64,
    pub gamma_threshold: f64,
}

/// Thresholds for dominant-risk detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotlightConfig {
    pub theta_days_max: u32,
    /// Daily decay as a percent of total premium.
    pub theta_decay_pct_min: f64,
    pub iv_high_percentile: f64,
    pub iv_low_percentile: f64,
    pub gamma_days_max: u32,
    /// Strike distance from spot, as a fraction, that counts as ATM here.
    pub gamma_atm_range: f64,
    pub net_delta_threshold: f64,
    pub nifty: InstrumentProfile,
    pub banknifty: InstrumentProfile,
    pub finnifty: InstrumentProfile,
    pub other: InstrumentProfile,
}

impl SpotlightConfig {
    pub fn profile(&self, underlying: Underlying) -> &InstrumentProfile {
        match underlying {
            Underlying::Nifty => &self.nifty,
            Underlying::BankNifty => &self.banknifty,
            Underlying::FinNifty => &self.finnifty,
            Underlying::Other => &self.other,
        }
    }
}

impl Default for SpotlightConfig {
    fn default() -> Self {
        Self {
            theta_days_max: 7,
            theta_decay_pct_min: 1.2,
            iv_high_percentile: 70.0,
            iv_low_percentile: 30.0,
            gamma_days_max: 10,
            gamma_atm_range: 0.01,
            net_delta_threshold: 0.25,
            nifty: InstrumentProfile {
                iv_min: 10.0,
                iv_max: 35.0,
                gamma_threshold: 0.0004,
            },
            banknifty: InstrumentProfile {
                iv_min: 15.0,
                iv_max: 45.0,
                gamma_threshold: 0.0006,
            },
            finnifty: InstrumentProfile {
                iv_min: 12.0,
                iv_max: 40.0,
                gamma_threshold: 0.0005,
            },
            other: InstrumentProfile {
                iv_min: 10.0,
                iv_max: 40.0,
                gamma_threshold: 0.0004,
            },
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub market: MarketContext,
    pub underlying: Underlying,
    pub solver: IvSolverConfig,
    pub projection: ProjectionConfig,
    pub moneyness: MoneynessBands,
    pub book: BookConfig,
    pub spotlight: SpotlightConfig,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> PeResult<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> PeResult<Self> {
        let path = path.as_ref();
        info!("Loading engine configuration from: {}", path.display());
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Apply `PE_*` environment overrides on top of the current values.
    pub fn apply_env(&mut self) -> PeResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup (the environment in
    /// production, a map in tests).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> PeResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse_f64 = |key: &str| -> PeResult<Option<f64>> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<f64>()
                    .map(Some)
                    .map_err(|e| config_error!("{}={:?}: {}", key, raw, e)),
                None => Ok(None),
            }
        };

        if let Some(v) = parse_f64("PE_SPOT")? {
            self.market.spot = v;
        }
        if let Some(v) = parse_f64("PE_RATE")? {
            self.market.risk_free_rate = v;
        }
        if let Some(v) = parse_f64("PE_DIVIDEND_YIELD")? {
            self.market.dividend_yield = v;
        }
        if let Some(v) = parse_f64("PE_VOLATILITY")? {
            self.market.volatility = v;
        }
        if let Some(raw) = lookup("PE_HORIZON_DAYS") {
            self.projection.horizon_days = raw
                .trim()
                .parse()
                .map_err(|e| config_error!("PE_HORIZON_DAYS={:?}: {}", raw, e))?;
        }
        if let Some(raw) = lookup("PE_UNDERLYING") {
            self.underlying = Underlying::parse(&raw);
        }
        debug!("Effective market context: {}", self.market);
        self.validate()
    }

    pub fn validate(&self) -> PeResult<()> {
        self.market
            .validate()
            .map_err(|e| config_error!("market: {}", e))?;

        let s = &self.solver;
        if s.max_iterations == 0 {
            return Err(config_error!("solver.max_iterations must be at least 1"));
        }
        if !(s.tolerance > 0.0) {
            return Err(config_error!("solver.tolerance must be positive"));
        }
        if !(s.min_vol > 0.0 && s.min_vol < s.max_vol) {
            return Err(config_error!(
                "solver bracket [{}, {}] is empty or non-positive",
                s.min_vol,
                s.max_vol
            ));
        }

        let p = &self.projection;
        if p.steps == 0 {
            return Err(config_error!("projection.steps must be at least 1"));
        }
        if !(p.price_range_pct > 0.0 && p.price_range_pct <= 1.0) {
            return Err(config_error!(
                "projection.price_range_pct must be in (0, 1], got {}",
                p.price_range_pct
            ));
        }

        let m = &self.moneyness;
        if !(m.atm >= 0.0 && m.atm <= m.deep) {
            return Err(config_error!(
                "moneyness bands must satisfy 0 <= atm <= deep (atm={}, deep={})",
                m.atm,
                m.deep
            ));
        }

        let b = &self.book;
        if b.clone_strike_offset < Decimal::ZERO {
            return Err(config_error!("book.clone_strike_offset must not be negative"));
        }
        if b.strike_step <= Decimal::ZERO {
            return Err(config_error!("book.strike_step must be positive"));
        }
        if !(1..=365).contains(&b.default_days) {
            return Err(config_error!(
                "book.default_days must be in [1, 365], got {}",
                b.default_days
            ));
        }
        Ok(())
    }
}
