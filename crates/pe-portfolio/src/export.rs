//! Flat, column-ordered view of positions for tabular export.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pe_options::{Moneyness, OptionKind};

use crate::position::OptionPosition;

/// Column headers, in the order of [`ExportRow::values`].
pub const EXPORT_HEADERS: [&str; 16] = [
    "Type",
    "Strike",
    "Premium",
    "Delta",
    "Gamma",
    "Theta",
    "Vega",
    "Rho",
    "Days",
    "Moneyness",
    "IV (%)",
    "Intrinsic",
    "Extrinsic",
    "Theoretical Price",
    "d1",
    "d2",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    pub kind: OptionKind,
    pub strike: Decimal,
    pub premium: Decimal,
    pub delta: Decimal,
    pub gamma: Decimal,
    pub theta: Decimal,
    pub vega: Decimal,
    pub rho: Decimal,
    pub days_to_expiry: u32,
    pub moneyness: Moneyness,
    pub implied_vol: f64,
    pub intrinsic: Decimal,
    pub extrinsic: Decimal,
    pub theoretical_price: Decimal,
    pub d1: f64,
    pub d2: f64,
}

impl ExportRow {
    /// Greeks and prices at display precision.
    pub fn from_position(p: &OptionPosition) -> Self {
        let g = p.greeks.rounded();
        Self {
            kind: p.kind,
            strike: p.strike,
            premium: p.premium,
            delta: g.delta,
            gamma: g.gamma,
            theta: g.theta,
            vega: g.vega,
            rho: g.rho,
            days_to_expiry: p.days_to_expiry,
            moneyness: p.moneyness,
            implied_vol: p.implied_vol,
            intrinsic: p.intrinsic.round_dp(2),
            extrinsic: p.extrinsic.round_dp(2),
            theoretical_price: p.theoretical_price.round_dp(2),
            d1: p.d1,
            d2: p.d2,
        }
    }

    /// Cell values matching [`EXPORT_HEADERS`].
    pub fn values(&self) -> Vec<String> {
        vec![
            self.kind.to_string(),
            self.strike.to_string(),
            self.premium.to_string(),
            self.delta.to_string(),
            self.gamma.to_string(),
            self.theta.to_string(),
            self.vega.to_string(),
            self.rho.to_string(),
            self.days_to_expiry.to_string(),
            self.moneyness.to_string(),
            format!("{:.2}", self.implied_vol),
            self.intrinsic.to_string(),
            self.extrinsic.to_string(),
            self.theoretical_price.to_string(),
            format!("{:.4}", self.d1),
            format!("{:.4}", self.d2),
        ]
    }
}

/// One row per position, in book order.
pub fn export_rows<'a>(positions: impl IntoIterator<Item = &'a OptionPosition>) -> Vec<ExportRow> {
    positions.into_iter().map(ExportRow::from_position).collect()
}
