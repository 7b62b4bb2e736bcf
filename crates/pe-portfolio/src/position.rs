use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use pe_options::{Greeks, Moneyness, OptionKind, PricingResult};
use pe_types::{invalid_input, PeError, PeResult};

/// Valid days-to-expiry range for a position.
pub const MIN_DAYS: u32 = 1;
pub const MAX_DAYS: u32 = 365;

/// Where a position's implied volatility comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolSource {
    /// Back-solved from the quoted premium on every refresh.
    Solved,
    /// Supplied directly (or taken from the market context) and left alone.
    Fixed,
}

/// One option contract under analysis.
///
/// `premium` is the quoted price and `theoretical_price` the model value;
/// refreshing never copies one into the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionPosition {
    pub id: u64,
    pub kind: OptionKind,
    pub strike: Decimal,
    pub premium: Decimal,
    pub days_to_expiry: u32,
    /// Implied volatility in percent (15.0 = 15 %).
    pub implied_vol: f64,
    pub vol_source: VolSource,
    pub greeks: Greeks,
    pub theoretical_price: Decimal,
    pub intrinsic: Decimal,
    pub extrinsic: Decimal,
    pub d1: f64,
    pub d2: f64,
    pub prob_itm: f64,
    pub moneyness: Moneyness,
    /// Set by any input edit; cleared by a refresh.
    pub stale: bool,
}

impl OptionPosition {
    pub(crate) fn new(id: u64, spec: &PositionSpec, implied_vol: f64, vol_source: VolSource) -> Self {
        Self {
            id,
            kind: spec.kind,
            strike: spec.strike,
            premium: spec.premium.unwrap_or(Decimal::ZERO),
            days_to_expiry: spec.days_to_expiry,
            implied_vol,
            vol_source,
            greeks: Greeks::zero(),
            theoretical_price: Decimal::ZERO,
            intrinsic: Decimal::ZERO,
            extrinsic: Decimal::ZERO,
            d1: 0.0,
            d2: 0.0,
            prob_itm: 0.0,
            moneyness: Moneyness::Atm,
            stale: true,
        }
    }

    /// Annualised volatility as a decimal.
    pub fn sigma(&self) -> f64 {
        self.implied_vol / 100.0
    }

    pub fn strike_f64(&self) -> f64 {
        self.strike.to_f64().unwrap_or(0.0)
    }

    pub fn premium_f64(&self) -> f64 {
        self.premium.to_f64().unwrap_or(0.0)
    }

    /// Quoted premium minus model value; positive when the quote is rich.
    pub fn premium_gap(&self) -> Decimal {
        self.premium - self.theoretical_price
    }

    pub(crate) fn apply_pricing(&mut self, result: &PricingResult, moneyness: Moneyness) {
        self.greeks = result.greeks;
        self.theoretical_price = result.price;
        self.intrinsic = result.intrinsic;
        self.extrinsic = result.extrinsic;
        self.d1 = result.d1;
        self.d2 = result.d2;
        self.prob_itm = result.prob_itm;
        self.moneyness = moneyness;
        self.stale = false;
    }

    pub(crate) fn apply(&mut self, value: FieldValue) {
        match value {
            FieldValue::Strike(v) => self.strike = v,
            FieldValue::Premium(v) => {
                self.premium = v;
                self.vol_source = VolSource::Solved;
            }
            FieldValue::Days(v) => self.days_to_expiry = v,
            FieldValue::ImpliedVol(v) => {
                self.implied_vol = v;
                self.vol_source = VolSource::Fixed;
            }
        }
        self.stale = true;
    }
}

/// Request to add a position. Missing premium is priced from the market;
/// missing IV is solved from the premium.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSpec {
    pub kind: OptionKind,
    pub strike: Decimal,
    #[serde(default)]
    pub premium: Option<Decimal>,
    pub days_to_expiry: u32,
    /// Percent.
    #[serde(default)]
    pub implied_vol: Option<f64>,
}

impl PositionSpec {
    pub fn new(kind: OptionKind, strike: Decimal, days_to_expiry: u32) -> Self {
        Self {
            kind,
            strike,
            premium: None,
            days_to_expiry,
            implied_vol: None,
        }
    }

    pub fn with_premium(mut self, premium: Decimal) -> Self {
        self.premium = Some(premium);
        self
    }

    pub fn with_implied_vol(mut self, implied_vol: f64) -> Self {
        self.implied_vol = Some(implied_vol);
        self
    }

    pub fn validate(&self) -> PeResult<()> {
        check_strike(self.strike)?;
        check_days(self.days_to_expiry)?;
        if let Some(premium) = self.premium {
            check_premium(premium)?;
        }
        if let Some(iv) = self.implied_vol {
            check_implied_vol(iv)?;
        }
        Ok(())
    }
}

/// Editable input fields of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionField {
    Strike,
    Premium,
    Days,
    ImpliedVol,
}

impl PositionField {
    pub fn name(&self) -> &'static str {
        match self {
            PositionField::Strike => "strike",
            PositionField::Premium => "premium",
            PositionField::Days => "days_to_expiry",
            PositionField::ImpliedVol => "implied_vol",
        }
    }

    /// Parse and range-check a raw input value for this field.
    pub fn parse_value(&self, raw: &str) -> PeResult<FieldValue> {
        let raw = raw.trim();
        match self {
            PositionField::Strike => {
                let v = parse_decimal(self.name(), raw)?;
                check_strike(v)?;
                Ok(FieldValue::Strike(v))
            }
            PositionField::Premium => {
                let v = parse_decimal(self.name(), raw)?;
                check_premium(v)?;
                Ok(FieldValue::Premium(v))
            }
            PositionField::Days => {
                let v: u32 = raw
                    .parse()
                    .map_err(|_| invalid_input!(self.name(), "expected whole days, got {:?}", raw))?;
                check_days(v)?;
                Ok(FieldValue::Days(v))
            }
            PositionField::ImpliedVol => {
                let v: f64 = raw
                    .parse()
                    .map_err(|_| invalid_input!(self.name(), "expected a number, got {:?}", raw))?;
                check_implied_vol(v)?;
                Ok(FieldValue::ImpliedVol(v))
            }
        }
    }
}

impl fmt::Display for PositionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for PositionField {
    type Err = PeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strike" => Ok(PositionField::Strike),
            "premium" => Ok(PositionField::Premium),
            "days" | "days_to_expiry" => Ok(PositionField::Days),
            "iv" | "implied_vol" => Ok(PositionField::ImpliedVol),
            other => Err(invalid_input!("field", "unknown position field {:?}", other)),
        }
    }
}

/// A validated value ready to be written into a position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Strike(Decimal),
    Premium(Decimal),
    Days(u32),
    ImpliedVol(f64),
}

/// Plain or scientific notation ("17500", "1.75e4").
fn parse_decimal(field: &str, raw: &str) -> PeResult<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| invalid_input!(field, "expected a number, got {:?}", raw))
}

fn check_strike(strike: Decimal) -> PeResult<()> {
    if strike <= Decimal::ZERO {
        return Err(invalid_input!("strike", "must be positive, got {}", strike));
    }
    Ok(())
}

fn check_premium(premium: Decimal) -> PeResult<()> {
    if premium < Decimal::ZERO {
        return Err(invalid_input!("premium", "must not be negative, got {}", premium));
    }
    Ok(())
}

fn check_days(days: u32) -> PeResult<()> {
    if !(MIN_DAYS..=MAX_DAYS).contains(&days) {
        return Err(invalid_input!(
            "days_to_expiry",
            "must be in [{}, {}], got {}",
            MIN_DAYS,
            MAX_DAYS,
            days
        ));
    }
    Ok(())
}

fn check_implied_vol(iv: f64) -> PeResult<()> {
    if !iv.is_finite() || iv <= 0.0 {
        return Err(invalid_input!("implied_vol", "must be a positive percentage, got {}", iv));
    }
    Ok(())
}
