//! Single dominant-risk detection over a position book.
//!
//! Detectors run in priority order (theta, IV, gamma, delta). The dominant
//! risk is the highest-priority triggered signal, ties broken by score; with
//! nothing triggered the book is reported as neutral.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::debug;

use pe_portfolio::PositionBook;
use pe_types::{MarketContext, SpotlightConfig, Underlying};

use crate::signal::{RiskKind, RiskSignal, SpotlightAssessment, SpotlightMetrics};

const THETA_EXPIRY_SCORE: u32 = 80;
const THETA_DECAY_SCORE: u32 = 70;
const IV_HIGH_SCORE: u32 = 65;
const IV_LOW_SCORE: u32 = 55;
const GAMMA_SCORE: u32 = 60;
const DELTA_SCORE: u32 = 40;
const NEUTRAL_SCORE: u32 = 10;

#[derive(Debug, Clone, Default)]
pub struct RiskSpotlight {
    config: SpotlightConfig,
    underlying: Underlying,
}

impl RiskSpotlight {
    pub fn new(config: SpotlightConfig, underlying: Underlying) -> Self {
        Self { config, underlying }
    }

    pub fn underlying(&self) -> Underlying {
        self.underlying
    }

    /// Market IV (decimal) as a 0-100 percentile of the underlying's
    /// historical range, rounded to a whole number.
    pub fn iv_percentile(&self, volatility: f64) -> f64 {
        let profile = self.config.profile(self.underlying);
        let iv = volatility * 100.0;
        let pct = (iv - profile.iv_min) / (profile.iv_max - profile.iv_min) * 100.0;
        pct.clamp(0.0, 100.0).round()
    }

    pub fn metrics(&self, book: &PositionBook, ctx: &MarketContext) -> SpotlightMetrics {
        let agg = book.aggregate();
        let atm_range = self.config.gamma_atm_range;
        let atm_gammas = book
            .iter()
            .filter(|p| ((p.strike_f64() - ctx.spot) / ctx.spot).abs() <= atm_range)
            .map(|p| dec_f64(p.greeks.gamma))
            .collect();

        SpotlightMetrics {
            total_theta: dec_f64(agg.total_theta).abs(),
            total_premium: dec_f64(agg.total_premium),
            net_delta: dec_f64(agg.total_delta),
            total_gamma: dec_f64(agg.total_gamma),
            nearest_days: book.iter().map(|p| p.days_to_expiry).min(),
            atm_gammas,
            iv_percentile: self.iv_percentile(ctx.volatility),
        }
    }

    pub fn evaluate(&self, book: &PositionBook, ctx: &MarketContext) -> SpotlightAssessment {
        let metrics = self.metrics(book, ctx);

        if book.is_empty() {
            let neutral = RiskSignal::new(RiskKind::Neutral, 0, "No options to analyse");
            return SpotlightAssessment::new(neutral, Vec::new(), metrics);
        }

        let mut signals: Vec<RiskSignal> = [
            self.theta_signal(&metrics),
            self.iv_signal(&metrics),
            self.gamma_signal(&metrics),
            self.delta_signal(&metrics),
        ]
        .into_iter()
        .flatten()
        .collect();
        signals.sort_by(|a, b| {
            a.kind
                .priority()
                .cmp(&b.kind.priority())
                .then(b.score.cmp(&a.score))
        });

        let dominant = signals.first().cloned().unwrap_or_else(|| {
            RiskSignal::new(RiskKind::Neutral, NEUTRAL_SCORE, "No dominant risk driver detected")
        });
        debug!(
            "Spotlight {}: {} ({} signals, iv pct {})",
            self.underlying,
            dominant.kind,
            signals.len(),
            metrics.iv_percentile
        );
        SpotlightAssessment::new(dominant, signals, metrics)
    }

    fn theta_signal(&self, m: &SpotlightMetrics) -> Option<RiskSignal> {
        let mut score = 0;
        let mut message = String::new();

        if m.nearest_days.is_some_and(|d| d <= self.config.theta_days_max) {
            score += THETA_EXPIRY_SCORE;
            message.push_str("Weekly expiry approaching");
        }
        if let Some(pct) = m.daily_decay_pct() {
            if pct >= self.config.theta_decay_pct_min {
                score += THETA_DECAY_SCORE;
                if message.is_empty() {
                    message = format!(
                        "High daily theta decay: {:.2}/day ({:.1}% of premium)",
                        m.total_theta, pct
                    );
                } else {
                    message.push_str(" with high decay");
                }
            }
        }
        (score > 0).then(|| RiskSignal::new(RiskKind::Theta, score, message))
    }

    fn iv_signal(&self, m: &SpotlightMetrics) -> Option<RiskSignal> {
        let pct = m.iv_percentile;
        if pct >= self.config.iv_high_percentile {
            Some(RiskSignal::new(
                RiskKind::IvHigh,
                IV_HIGH_SCORE,
                format!("IV at {pct:.0}th percentile of historical range"),
            ))
        } else if pct <= self.config.iv_low_percentile {
            Some(RiskSignal::new(
                RiskKind::IvLow,
                IV_LOW_SCORE,
                format!("IV compressed at {pct:.0}th percentile of historical range"),
            ))
        } else {
            None
        }
    }

    fn gamma_signal(&self, m: &SpotlightMetrics) -> Option<RiskSignal> {
        let near_expiry = m.nearest_days.is_some_and(|d| d <= self.config.gamma_days_max);
        if !near_expiry {
            return None;
        }
        let threshold = self.config.profile(self.underlying).gamma_threshold;
        let high = m.atm_gammas.iter().filter(|&&g| g >= threshold).count();
        (high > 0).then(|| {
            RiskSignal::new(
                RiskKind::Gamma,
                GAMMA_SCORE,
                format!("{high} ATM option(s) with gamma above {threshold}"),
            )
        })
    }

    fn delta_signal(&self, m: &SpotlightMetrics) -> Option<RiskSignal> {
        if m.net_delta.abs() < self.config.net_delta_threshold {
            return None;
        }
        let direction = if m.net_delta > 0.0 { '+' } else { '-' };
        Some(RiskSignal::new(
            RiskKind::Delta,
            DELTA_SCORE,
            format!("Net delta {}{:.2}", direction, m.net_delta.abs()),
        ))
    }
}

fn dec_f64(v: Decimal) -> f64 {
    v.to_f64().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pe_options::OptionKind;
    use pe_portfolio::PositionSpec;
    use rust_decimal_macros::dec;

    // 20 % IV sits at the 40th percentile of the NIFTY range: no IV signal.
    fn ctx() -> MarketContext {
        MarketContext::new(17450.0, 0.065, 0.0, 0.20)
    }

    fn book(specs: &[(OptionKind, Decimal, u32)]) -> PositionBook {
        let mut book = PositionBook::default();
        for &(kind, strike, days) in specs {
            book.add(PositionSpec::new(kind, strike, days), &ctx()).unwrap();
        }
        book
    }

    #[test]
    fn test_empty_book_is_neutral() {
        let a = RiskSpotlight::default().evaluate(&PositionBook::default(), &ctx());
        assert_eq!(a.kind(), RiskKind::Neutral);
        assert_eq!(a.dominant.score, 0);
        assert!(a.signals.is_empty());
    }

    #[test]
    fn test_iv_percentile_per_underlying() {
        let nifty = RiskSpotlight::new(SpotlightConfig::default(), Underlying::Nifty);
        assert_eq!(nifty.iv_percentile(0.20), 40.0);
        assert_eq!(nifty.iv_percentile(0.05), 0.0);
        assert_eq!(nifty.iv_percentile(0.60), 100.0);

        let bank = RiskSpotlight::new(SpotlightConfig::default(), Underlying::BankNifty);
        assert_eq!(bank.iv_percentile(0.30), 50.0);
    }

    #[test]
    fn test_long_dated_straddle_is_neutral() {
        let b = book(&[
            (OptionKind::Call, dec!(17450), 45),
            (OptionKind::Put, dec!(17450), 45),
        ]);
        let a = RiskSpotlight::default().evaluate(&b, &ctx());
        assert_eq!(a.kind(), RiskKind::Neutral, "signals: {:?}", a.signals);
        assert_eq!(a.dominant.score, 10);
    }

    #[test]
    fn test_near_expiry_is_theta_even_with_other_signals() {
        let b = book(&[(OptionKind::Call, dec!(17450), 5)]);
        let a = RiskSpotlight::default().evaluate(&b, &ctx());
        assert_eq!(a.kind(), RiskKind::Theta);
        // 5 days out an ATM option also decays > 1.2 % a day
        assert_eq!(a.dominant.score, 150);
        assert!(a.signals.iter().any(|s| s.kind == RiskKind::Delta));
        assert_eq!(a.runner_up().map(|s| s.kind), Some(RiskKind::Gamma));
    }

    #[test]
    fn test_high_iv_outranks_delta() {
        let high_vol = ctx().with_volatility(0.33);
        let mut b = PositionBook::default();
        b.add(PositionSpec::new(OptionKind::Call, dec!(17000), 60), &high_vol)
            .unwrap();
        let a = RiskSpotlight::default().evaluate(&b, &high_vol);
        assert_eq!(a.kind(), RiskKind::IvHigh);
        assert_eq!(a.dominant.score, 65);
        assert_eq!(a.runner_up().map(|s| s.kind), Some(RiskKind::Delta));
    }

    #[test]
    fn test_low_iv() {
        let low_vol = ctx().with_volatility(0.11);
        let mut b = PositionBook::default();
        b.add(PositionSpec::new(OptionKind::Call, dec!(17450), 60), &low_vol)
            .unwrap();
        b.add(PositionSpec::new(OptionKind::Put, dec!(17450), 60), &low_vol)
            .unwrap();
        let a = RiskSpotlight::default().evaluate(&b, &low_vol);
        assert_eq!(a.kind(), RiskKind::IvLow);
        assert_eq!(a.signals.len(), 1);
    }

    #[test]
    fn test_directional_book_flags_delta() {
        let b = book(&[(OptionKind::Call, dec!(17000), 60)]);
        let a = RiskSpotlight::default().evaluate(&b, &ctx());
        assert_eq!(a.kind(), RiskKind::Delta);
        assert!(a.dominant.message.starts_with("Net delta +"));
        assert!(a.metrics.net_delta > 0.25);
    }

    #[test]
    fn test_gamma_needs_atm_strike() {
        let cfg = SpotlightConfig {
            theta_days_max: 0,
            theta_decay_pct_min: 1000.0,
            ..SpotlightConfig::default()
        };
        let spotlight = RiskSpotlight::new(cfg, Underlying::Nifty);

        let atm = book(&[
            (OptionKind::Call, dec!(17450), 9),
            (OptionKind::Put, dec!(17450), 9),
        ]);
        assert_eq!(spotlight.evaluate(&atm, &ctx()).kind(), RiskKind::Gamma);

        let wide = book(&[
            (OptionKind::Call, dec!(18000), 9),
            (OptionKind::Put, dec!(16900), 9),
        ]);
        let a = spotlight.evaluate(&wide, &ctx());
        assert!(a.metrics.atm_gammas.is_empty());
        assert_ne!(a.kind(), RiskKind::Gamma);
    }

    #[test]
    fn test_metrics_sum_book() {
        let b = book(&[
            (OptionKind::Call, dec!(17450), 30),
            (OptionKind::Put, dec!(17400), 20),
        ]);
        let m = RiskSpotlight::default().metrics(&b, &ctx());
        let agg = b.aggregate();
        assert_eq!(m.nearest_days, Some(20));
        assert_eq!(m.atm_gammas.len(), 2);
        assert!((m.total_theta - agg.total_theta.abs().to_f64().unwrap()).abs() < 1e-12);
        assert!((m.total_premium - agg.total_premium.to_f64().unwrap()).abs() < 1e-12);
    }
}
