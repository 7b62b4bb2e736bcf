//! Decay and payoff projections over a set of positions.
//!
//! Both series are recomputed from scratch on every call. The decay series
//! re-prices each position at every horizon day instead of extrapolating its
//! cached greeks.

use serde::{Deserialize, Serialize};
use tracing::debug;

use pe_options::{price, OptionKind, PricingInput};
use pe_types::{invalid_input, MarketContext, PeResult};

use crate::position::OptionPosition;

/// Aggregate model value of the live positions on one horizon day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecayPoint {
    pub day: u32,
    pub call_value: f64,
    pub put_value: f64,
}

impl DecayPoint {
    pub fn total(&self) -> f64 {
        self.call_value + self.put_value
    }
}

/// At-expiry P&L at one underlying price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlPoint {
    pub price: f64,
    pub call_pl: f64,
    pub put_pl: f64,
    pub net_pl: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlProjection {
    pub points: Vec<PlPoint>,
    pub max_profit: f64,
    pub max_loss: f64,
    /// Nearest price above spot where net P&L turns non-negative.
    pub upper_breakeven: Option<f64>,
    /// Nearest price below spot where net P&L turns non-negative.
    pub lower_breakeven: Option<f64>,
}

/// Model value per day for days `0..=horizon_days`.
///
/// A position counts on day `d` while `d <= days_to_expiry`; it is priced at
/// `T = (days_to_expiry - d) / 365` with the context's spot, rates and
/// volatility. On its expiry day it is worth intrinsic value.
pub fn decay_series(
    positions: &[OptionPosition],
    ctx: &MarketContext,
    horizon_days: u32,
) -> PeResult<Vec<DecayPoint>> {
    ctx.validate()?;

    let mut series = Vec::with_capacity(horizon_days as usize + 1);
    for day in 0..=horizon_days {
        let mut point = DecayPoint {
            day,
            call_value: 0.0,
            put_value: 0.0,
        };
        for p in positions.iter().filter(|p| day <= p.days_to_expiry) {
            let remaining = f64::from(p.days_to_expiry - day);
            let value = price(p.kind, p.strike_f64(), &PricingInput::from_market(ctx, remaining))?;
            match p.kind {
                OptionKind::Call => point.call_value += value,
                OptionKind::Put => point.put_value += value,
            }
        }
        series.push(point);
    }

    debug!(
        "Decay series: {} positions over {} days at {}",
        positions.len(),
        horizon_days,
        ctx
    );
    Ok(series)
}

/// At-expiry P&L for `steps + 1` prices spanning `spot·(1 ± range_pct)`.
///
/// Each position contributes its intrinsic value at the price, less its
/// premium when `include_premium` is set.
pub fn pl_series(
    positions: &[OptionPosition],
    ctx: &MarketContext,
    range_pct: f64,
    steps: u32,
    include_premium: bool,
) -> PeResult<PlProjection> {
    ctx.validate()?;
    if steps == 0 {
        return Err(invalid_input!("steps", "must be at least 1"));
    }
    if !(range_pct > 0.0 && range_pct <= 1.0) {
        return Err(invalid_input!("price_range_pct", "must be in (0, 1], got {}", range_pct));
    }

    let spot = ctx.spot;
    let low = spot * (1.0 - range_pct);
    let high = spot * (1.0 + range_pct);
    let width = high - low;

    let points: Vec<PlPoint> = (0..=steps)
        .map(|i| {
            let px = if i == steps {
                high
            } else {
                low + width * f64::from(i) / f64::from(steps)
            };
            pl_at(positions, px, include_premium)
        })
        .collect();

    let max_profit = points.iter().map(|p| p.net_pl).fold(f64::NEG_INFINITY, f64::max);
    let max_loss = points.iter().map(|p| p.net_pl).fold(f64::INFINITY, f64::min);

    Ok(PlProjection {
        upper_breakeven: upper_breakeven(&points, spot),
        lower_breakeven: lower_breakeven(&points, spot),
        max_profit,
        max_loss,
        points,
    })
}

fn pl_at(positions: &[OptionPosition], px: f64, include_premium: bool) -> PlPoint {
    let mut point = PlPoint {
        price: px,
        call_pl: 0.0,
        put_pl: 0.0,
        net_pl: 0.0,
    };
    for p in positions {
        let mut pl = p.kind.intrinsic_value(px, p.strike_f64());
        if include_premium {
            pl -= p.premium_f64();
        }
        match p.kind {
            OptionKind::Call => point.call_pl += pl,
            OptionKind::Put => point.put_pl += pl,
        }
    }
    point.net_pl = point.call_pl + point.put_pl;
    point
}

/// Linear interpolation of the zero crossing between `from` (negative) and `to`.
fn crossing(from: &PlPoint, to: &PlPoint) -> f64 {
    if to.net_pl == 0.0 {
        return to.price;
    }
    let frac = -from.net_pl / (to.net_pl - from.net_pl);
    from.price + (to.price - from.price) * frac
}

fn upper_breakeven(points: &[PlPoint], spot: f64) -> Option<f64> {
    points
        .windows(2)
        .filter(|w| w[1].price > spot)
        .filter(|w| w[0].net_pl < 0.0 && w[1].net_pl >= 0.0)
        .map(|w| crossing(&w[0], &w[1]))
        .find(|&x| x > spot)
}

fn lower_breakeven(points: &[PlPoint], spot: f64) -> Option<f64> {
    points
        .windows(2)
        .rev()
        .filter(|w| w[0].price < spot)
        .filter(|w| w[1].net_pl < 0.0 && w[0].net_pl >= 0.0)
        .map(|w| crossing(&w[1], &w[0]))
        .find(|&x| x < spot)
}
