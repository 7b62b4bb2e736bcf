//! Dominant-risk signal types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Kind of risk the spotlight can surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskKind {
    /// Expiry close or daily decay large relative to premium.
    Theta,
    /// IV high in its historical range; favourable for premium sellers.
    IvHigh,
    /// IV compressed; little premium left to erode.
    IvLow,
    /// ATM positions with high gamma close to expiry.
    Gamma,
    /// Net directional exposure.
    Delta,
    Neutral,
}

impl RiskKind {
    /// Lower is more important. Both IV kinds share a rank.
    pub fn priority(&self) -> u8 {
        match self {
            RiskKind::Theta => 1,
            RiskKind::IvHigh | RiskKind::IvLow => 2,
            RiskKind::Gamma => 3,
            RiskKind::Delta => 4,
            RiskKind::Neutral => 5,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            RiskKind::Theta => "High Theta Risk",
            RiskKind::IvHigh => "IV Favorable for Premium Selling",
            RiskKind::IvLow => "Low IV Environment",
            RiskKind::Gamma => "High Gamma Sensitivity",
            RiskKind::Delta => "Directional Exposure Detected",
            RiskKind::Neutral => "Balanced Risk Profile",
        }
    }
}

impl fmt::Display for RiskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskKind::Theta => "THETA",
            RiskKind::IvHigh => "IV HIGH",
            RiskKind::IvLow => "IV LOW",
            RiskKind::Gamma => "GAMMA",
            RiskKind::Delta => "DELTA",
            RiskKind::Neutral => "NEUTRAL",
        };
        write!(f, "{}", s)
    }
}

/// One triggered detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSignal {
    pub kind: RiskKind,
    /// 0-150; only compared between signals of equal priority.
    pub score: u32,
    pub message: String,
}

impl RiskSignal {
    pub fn new(kind: RiskKind, score: u32, message: impl Into<String>) -> Self {
        Self {
            kind,
            score,
            message: message.into(),
        }
    }
}

/// Portfolio figures the detectors read.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpotlightMetrics {
    /// `|Σ theta|` per day.
    pub total_theta: f64,
    pub total_premium: f64,
    pub net_delta: f64,
    pub total_gamma: f64,
    /// Fewest days to expiry across the book.
    pub nearest_days: Option<u32>,
    /// Gammas of positions struck within the ATM range of spot.
    pub atm_gammas: Vec<f64>,
    /// Market IV percentile within the underlying's historical range.
    pub iv_percentile: f64,
}

impl SpotlightMetrics {
    /// Daily decay as a percent of total premium.
    pub fn daily_decay_pct(&self) -> Option<f64> {
        (self.total_premium > 0.0).then(|| self.total_theta / self.total_premium * 100.0)
    }
}

/// Result of one spotlight evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotlightAssessment {
    pub id: Uuid,
    pub assessed_at: DateTime<Utc>,
    pub dominant: RiskSignal,
    /// Every triggered signal, dominant first.
    pub signals: Vec<RiskSignal>,
    pub metrics: SpotlightMetrics,
}

impl SpotlightAssessment {
    pub fn new(dominant: RiskSignal, signals: Vec<RiskSignal>, metrics: SpotlightMetrics) -> Self {
        Self {
            id: Uuid::new_v4(),
            assessed_at: Utc::now(),
            dominant,
            signals,
            metrics,
        }
    }

    pub fn kind(&self) -> RiskKind {
        self.dominant.kind
    }

    /// The next most important triggered signal after the dominant one.
    pub fn runner_up(&self) -> Option<&RiskSignal> {
        self.signals
            .iter()
            .find(|s| s.kind.priority() > self.dominant.kind.priority())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        let mut kinds = vec![
            RiskKind::Neutral,
            RiskKind::Delta,
            RiskKind::IvLow,
            RiskKind::Gamma,
            RiskKind::Theta,
        ];
        kinds.sort_by_key(|k| k.priority());
        assert_eq!(
            kinds,
            vec![RiskKind::Theta, RiskKind::IvLow, RiskKind::Gamma, RiskKind::Delta, RiskKind::Neutral]
        );
        assert_eq!(RiskKind::IvHigh.priority(), RiskKind::IvLow.priority());
    }

    #[test]
    fn test_decay_pct_needs_premium() {
        let mut m = SpotlightMetrics::default();
        assert_eq!(m.daily_decay_pct(), None);
        m.total_theta = 3.0;
        m.total_premium = 200.0;
        assert!((m.daily_decay_pct().unwrap() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_runner_up_skips_same_priority() {
        let theta = RiskSignal::new(RiskKind::Theta, 150, "expiry");
        let delta = RiskSignal::new(RiskKind::Delta, 40, "directional");
        let a = SpotlightAssessment::new(
            theta.clone(),
            vec![theta, delta.clone()],
            SpotlightMetrics::default(),
        );
        assert_eq!(a.kind(), RiskKind::Theta);
        assert_eq!(a.runner_up(), Some(&delta));
        assert_eq!(RiskKind::IvHigh.to_string(), "IV HIGH");
    }
}
