//! Position book: lifecycle of the positions under analysis and their
//! aggregate metrics.
//!
//! Edits only touch inputs and mark the position stale; [`PositionBook::refresh`]
//! is the explicit recompute step. A refresh is a pure function of the
//! position inputs and the market context, so repeating it is harmless.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use pe_options::{greeks, IvSolver, Moneyness, OptionKind, PricingInput};
use pe_types::{invalid_input, BookConfig, EngineConfig, MarketContext, MoneynessBands, PeError, PeResult};

use crate::position::{OptionPosition, PositionField, PositionSpec, VolSource};

/// Portfolio totals. Theta is signed; negative means decay.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BookAggregate {
    pub total_theta: Decimal,
    pub total_delta: Decimal,
    pub total_gamma: Decimal,
    pub total_vega: Decimal,
    pub total_rho: Decimal,
    pub total_premium: Decimal,
    pub total_intrinsic: Decimal,
    pub total_extrinsic: Decimal,
    pub position_count: usize,
}

/// Ordered collection of option positions, in insertion order.
#[derive(Debug, Clone)]
pub struct PositionBook {
    positions: Vec<OptionPosition>,
    /// Next id to hand out; only ever moves up.
    next_id: u64,
    solver: IvSolver,
    bands: MoneynessBands,
    config: BookConfig,
}

impl Default for PositionBook {
    fn default() -> Self {
        Self::new(IvSolver::default(), MoneynessBands::default(), BookConfig::default())
    }
}

impl PositionBook {
    pub fn new(solver: IvSolver, bands: MoneynessBands, config: BookConfig) -> Self {
        Self {
            positions: Vec::new(),
            next_id: 1,
            solver,
            bands,
            config,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(IvSolver::new(config.solver), config.moneyness, config.book)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&OptionPosition> {
        self.positions.iter().find(|p| p.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OptionPosition> {
        self.positions.iter()
    }

    pub fn positions(&self) -> &[OptionPosition] {
        &self.positions
    }

    /// Add a position and price it against `ctx`.
    ///
    /// Without a premium the position is priced at the supplied IV (or the
    /// market volatility) and that price becomes its premium. With a premium
    /// and no IV, the IV is back-solved from the premium.
    pub fn add(&mut self, spec: PositionSpec, ctx: &MarketContext) -> PeResult<&OptionPosition> {
        if let Err(e) = spec.validate() {
            warn!("Rejected new {} position: {}", spec.kind, e);
            return Err(e);
        }
        ctx.validate()?;

        let id = self.next_id;
        let (implied_vol, source) = match (spec.premium, spec.implied_vol) {
            (_, Some(iv)) => (iv, VolSource::Fixed),
            (Some(_), None) => (0.0, VolSource::Solved),
            (None, None) => (ctx.volatility * 100.0, VolSource::Fixed),
        };

        let mut position = self.priced(OptionPosition::new(id, &spec, implied_vol, source), ctx)?;
        if spec.premium.is_none() {
            position.premium = position.theoretical_price.round_dp(2);
        }

        info!(
            "Added position #{}: {} K={} premium={} days={} iv={:.2}%",
            id, position.kind, position.strike, position.premium, position.days_to_expiry, position.implied_vol
        );
        self.next_id += 1;
        self.positions.push(position);
        Ok(&self.positions[self.positions.len() - 1])
    }

    /// Add an at-the-money position: spot rounded to the strike step, default
    /// days, priced from the market.
    pub fn add_default_atm(&mut self, kind: OptionKind, ctx: &MarketContext) -> PeResult<&OptionPosition> {
        let spot = Decimal::from_f64(ctx.spot)
            .ok_or_else(|| invalid_input!("spot", "cannot represent {} as a price", ctx.spot))?;
        let step = self.config.strike_step;
        if step <= Decimal::ZERO {
            return Err(invalid_input!("strike_step", "must be positive, got {}", step));
        }
        let mut strike = spot
            .checked_div(step)
            .ok_or_else(|| invalid_input!("strike_step", "cannot round {} to steps of {}", spot, step))?
            .round()
            * step;
        if strike <= Decimal::ZERO {
            strike = step;
        }
        self.add(PositionSpec::new(kind, strike, self.config.default_days), ctx)
    }

    /// Overwrite one input field. The position keeps its old greeks (marked
    /// stale) until the next refresh; a rejected value changes nothing.
    pub fn update(&mut self, id: u64, field: PositionField, raw: &str) -> PeResult<()> {
        let index = self.index_of(id)?;
        let value = field.parse_value(raw).map_err(|e| {
            warn!("Rejected update of position #{} {}: {}", id, field, e);
            e
        })?;
        self.positions[index].apply(value);
        debug!("Position #{} {} set to {}", id, field, raw.trim());
        Ok(())
    }

    /// Recompute greeks, theoretical price, moneyness and (for premium-driven
    /// positions) IV.
    pub fn refresh(&mut self, id: u64, ctx: &MarketContext) -> PeResult<&OptionPosition> {
        let index = self.index_of(id)?;
        ctx.validate()?;
        let refreshed = self.priced(self.positions[index].clone(), ctx)?;
        self.positions[index] = refreshed;
        Ok(&self.positions[index])
    }

    /// Refresh every position. Stops at the first failure; positions before
    /// it keep their new values.
    pub fn refresh_all(&mut self, ctx: &MarketContext) -> PeResult<()> {
        ctx.validate()?;
        for index in 0..self.positions.len() {
            let refreshed = self.priced(self.positions[index].clone(), ctx)?;
            self.positions[index] = refreshed;
        }
        debug!("Refreshed {} positions at {}", self.positions.len(), ctx);
        Ok(())
    }

    /// Duplicate a position under a new id with its strike shifted away from
    /// the source (up for calls, down for puts). The copy is stale.
    pub fn clone_position(&mut self, id: u64) -> PeResult<&OptionPosition> {
        let index = self.index_of(id)?;
        let offset = self.config.clone_strike_offset;
        let mut copy = self.positions[index].clone();
        copy.strike = match copy.kind {
            OptionKind::Call => copy.strike + offset,
            OptionKind::Put => copy.strike - offset,
        };
        if copy.strike <= Decimal::ZERO {
            return Err(invalid_input!(
                "strike",
                "cloning #{} would give non-positive strike {}",
                id,
                copy.strike
            ));
        }
        copy.id = self.next_id;
        copy.stale = true;

        info!("Cloned position #{} as #{} at K={}", id, copy.id, copy.strike);
        self.next_id += 1;
        self.positions.push(copy);
        Ok(&self.positions[self.positions.len() - 1])
    }

    /// Remove a position. Its id is not handed out again.
    pub fn remove(&mut self, id: u64) -> PeResult<OptionPosition> {
        let index = self.index_of(id)?;
        let removed = self.positions.remove(index);
        info!("Removed position #{}", id);
        Ok(removed)
    }

    /// Sum greeks and values across all positions.
    pub fn aggregate(&self) -> BookAggregate {
        self.positions.iter().fold(BookAggregate::default(), |mut acc, p| {
            acc.total_theta += p.greeks.theta;
            acc.total_delta += p.greeks.delta;
            acc.total_gamma += p.greeks.gamma;
            acc.total_vega += p.greeks.vega;
            acc.total_rho += p.greeks.rho;
            acc.total_premium += p.premium;
            acc.total_intrinsic += p.intrinsic;
            acc.total_extrinsic += p.extrinsic;
            acc.position_count += 1;
            acc
        })
    }

    fn index_of(&self, id: u64) -> PeResult<usize> {
        self.positions
            .iter()
            .position(|p| p.id == id)
            .ok_or(PeError::NotFound { id })
    }

    fn priced(&self, mut position: OptionPosition, ctx: &MarketContext) -> PeResult<OptionPosition> {
        let strike = position.strike_f64();
        let input = PricingInput::from_market(ctx, f64::from(position.days_to_expiry));

        if position.vol_source == VolSource::Solved {
            let sigma = self
                .solver
                .implied_vol(position.kind, strike, position.premium_f64(), &input)?;
            position.implied_vol = sigma * 100.0;
        }

        let result = greeks(position.kind, strike, &input.with_volatility(position.sigma()))?;
        let moneyness = Moneyness::classify(position.kind, strike, ctx.spot, &self.bands);
        position.apply_pricing(&result, moneyness);
        Ok(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ctx() -> MarketContext {
        MarketContext::default()
    }

    fn straddle() -> PositionBook {
        let mut book = PositionBook::default();
        book.add_default_atm(OptionKind::Call, &ctx()).unwrap();
        book.add_default_atm(OptionKind::Put, &ctx()).unwrap();
        book
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut book = straddle();
        assert_eq!(book.positions().iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 2]);

        // dropping the newest position must not free its id
        book.remove(2).unwrap();
        let id = book
            .add(PositionSpec::new(OptionKind::Call, dec!(17500), 14), &ctx())
            .unwrap()
            .id;
        assert_eq!(id, 3);

        let clone_id = book.clone_position(3).unwrap().id;
        assert_eq!(clone_id, 4);

        book.remove(1).unwrap();
        book.remove(3).unwrap();
        book.remove(4).unwrap();
        assert!(book.is_empty());
        let id = book
            .add(PositionSpec::new(OptionKind::Put, dec!(17400), 14), &ctx())
            .unwrap()
            .id;
        assert_eq!(id, 5);
    }

    #[test]
    fn test_default_atm_rejects_non_positive_step() {
        for step in [dec!(0), dec!(-50)] {
            let config = BookConfig {
                strike_step: step,
                ..BookConfig::default()
            };
            let mut book = PositionBook::new(IvSolver::default(), MoneynessBands::default(), config);
            let err = book.add_default_atm(OptionKind::Call, &ctx()).unwrap_err();
            assert!(err.is_invalid_input());
            assert!(book.is_empty());
        }
    }

    #[test]
    fn test_add_without_premium_prices_from_market() {
        let book = straddle();
        let call = book.get(1).unwrap();
        assert_eq!(call.strike, dec!(17450));
        assert_eq!(call.days_to_expiry, 30);
        assert_eq!(call.vol_source, VolSource::Fixed);
        assert!((call.implied_vol - 15.0).abs() < 1e-12);
        assert_eq!(call.premium, call.theoretical_price.round_dp(2));
        assert_eq!(call.moneyness, Moneyness::Atm);
        assert!(!call.stale);
        assert!(call.greeks.theta < Decimal::ZERO);
    }

    #[test]
    fn test_add_with_premium_solves_iv() {
        let mut book = PositionBook::default();
        let pos = book
            .add(
                PositionSpec::new(OptionKind::Call, dec!(17450), 30).with_premium(dec!(400)),
                &ctx(),
            )
            .unwrap();
        assert_eq!(pos.vol_source, VolSource::Solved);
        assert_eq!(pos.premium, dec!(400));
        // the model reproduces the quote at the solved IV
        assert!(pos.premium_gap().abs() < dec!(0.01), "gap {}", pos.premium_gap());
        // richer than the ~347 fair value at 15 %
        assert!(pos.implied_vol > 15.0);
    }

    #[test]
    fn test_add_with_premium_and_iv_keeps_both() {
        let mut book = PositionBook::default();
        let pos = book
            .add(
                PositionSpec::new(OptionKind::Put, dec!(17300), 10)
                    .with_premium(dec!(90))
                    .with_implied_vol(12.0),
                &ctx(),
            )
            .unwrap();
        assert_eq!(pos.vol_source, VolSource::Fixed);
        assert_eq!(pos.implied_vol, 12.0);
        assert_eq!(pos.premium, dec!(90));
        assert_ne!(pos.theoretical_price, pos.premium);
    }

    #[test]
    fn test_add_rejects_invalid_spec() {
        let mut book = PositionBook::default();
        let err = book
            .add(PositionSpec::new(OptionKind::Call, dec!(0), 30), &ctx())
            .unwrap_err();
        assert!(err.is_invalid_input());
        assert!(book.is_empty());

        // a rejected add does not burn an id
        let id = book
            .add(PositionSpec::new(OptionKind::Call, dec!(17450), 30), &ctx())
            .unwrap()
            .id;
        assert_eq!(id, 1);
    }

    #[test]
    fn test_update_does_not_refresh() {
        let mut book = straddle();
        let before = book.get(1).unwrap().clone();

        book.update(1, PositionField::Strike, "17600").unwrap();
        let after = book.get(1).unwrap();
        assert_eq!(after.strike, dec!(17600));
        assert!(after.stale);
        assert_eq!(after.greeks, before.greeks);
        assert_eq!(after.theoretical_price, before.theoretical_price);

        let refreshed = book.refresh(1, &ctx()).unwrap();
        assert!(!refreshed.stale);
        assert!(refreshed.theoretical_price < before.theoretical_price);
        assert_eq!(refreshed.moneyness, Moneyness::Otm);
    }

    #[test]
    fn test_rejected_update_leaves_state_unchanged() {
        let mut book = straddle();
        let snapshot: Vec<OptionPosition> = book.positions().to_vec();

        for (field, raw) in [
            (PositionField::Strike, "abc"),
            (PositionField::Days, "400"),
            (PositionField::Premium, "-1"),
            (PositionField::ImpliedVol, "-5"),
        ] {
            let err = book.update(1, field, raw).unwrap_err();
            assert!(err.is_invalid_input());
        }
        assert_eq!(book.positions(), snapshot.as_slice());
    }

    #[test]
    fn test_missing_id_is_not_found() {
        let mut book = straddle();
        assert!(book.update(9, PositionField::Days, "10").unwrap_err().is_not_found());
        assert!(book.refresh(9, &ctx()).unwrap_err().is_not_found());
        assert!(book.clone_position(9).unwrap_err().is_not_found());
        assert!(book.remove(9).unwrap_err().is_not_found());
        // unknown id wins over a bad value
        assert!(book.update(9, PositionField::Days, "x").unwrap_err().is_not_found());
        assert_eq!(book.len(), 2);
    }

    #[test]
    fn test_refresh_is_idempotent() {
        let mut book = PositionBook::default();
        book.add(
            PositionSpec::new(OptionKind::Put, dec!(17300), 21).with_premium(dec!(120.5)),
            &ctx(),
        )
        .unwrap();
        let first = book.refresh(1, &ctx()).unwrap().clone();
        let second = book.refresh(1, &ctx()).unwrap().clone();
        assert_eq!(first, second);
        assert_eq!(first.implied_vol.to_bits(), second.implied_vol.to_bits());
    }

    #[test]
    fn test_premium_edit_resolves_iv_on_refresh() {
        let mut book = straddle();
        let old_iv = book.get(1).unwrap().implied_vol;
        let old_premium = book.get(1).unwrap().premium;

        book.update(1, PositionField::Premium, &(old_premium * dec!(1.5)).to_string())
            .unwrap();
        let pos = book.refresh(1, &ctx()).unwrap();
        assert_eq!(pos.vol_source, VolSource::Solved);
        assert!(pos.implied_vol > old_iv);
    }

    #[test]
    fn test_iv_edit_fixes_vol() {
        let mut book = straddle();
        book.update(2, PositionField::ImpliedVol, "22").unwrap();
        let pos = book.refresh(2, &ctx()).unwrap();
        assert_eq!(pos.implied_vol, 22.0);
        assert_eq!(pos.vol_source, VolSource::Fixed);
        assert!(pos.theoretical_price > pos.premium);
    }

    #[test]
    fn test_clone_shifts_strike_by_kind() {
        let mut book = straddle();
        let call_clone = book.clone_position(1).unwrap().clone();
        assert_eq!(call_clone.id, 3);
        assert_eq!(call_clone.strike, dec!(17550));
        assert!(call_clone.stale);

        let put_clone = book.clone_position(2).unwrap().clone();
        assert_eq!(put_clone.id, 4);
        assert_eq!(put_clone.strike, dec!(17350));
        assert_eq!(put_clone.premium, book.get(2).unwrap().premium);
        assert_eq!(book.len(), 4);
    }

    #[test]
    fn test_clone_rejects_non_positive_strike() {
        let mut book = PositionBook::default();
        book.add(PositionSpec::new(OptionKind::Put, dec!(100), 30), &MarketContext::new(100.0, 0.05, 0.0, 0.2))
            .unwrap();
        assert!(book.clone_position(1).unwrap_err().is_invalid_input());
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn test_aggregate_is_exact_sum() {
        let mut book = straddle();
        book.add(PositionSpec::new(OptionKind::Call, dec!(17600), 7), &ctx()).unwrap();
        book.add(
            PositionSpec::new(OptionKind::Put, dec!(17200), 45).with_premium(dec!(140)),
            &ctx(),
        )
        .unwrap();
        book.refresh_all(&ctx()).unwrap();

        let agg = book.aggregate();
        let theta: Decimal = book.iter().map(|p| p.greeks.theta).sum();
        let delta: Decimal = book.iter().map(|p| p.greeks.delta).sum();
        let premium: Decimal = book.iter().map(|p| p.premium).sum();
        assert_eq!(agg.total_theta, theta);
        assert_eq!(agg.total_delta, delta);
        assert_eq!(agg.total_premium, premium);
        assert_eq!(agg.position_count, 4);
        assert!(agg.total_theta < Decimal::ZERO);
    }

    #[test]
    fn test_empty_aggregate_is_zero() {
        let agg = PositionBook::default().aggregate();
        assert_eq!(agg, BookAggregate::default());
    }
}
