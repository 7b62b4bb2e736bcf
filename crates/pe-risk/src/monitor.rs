//! Spotlight monitor: re-evaluates the book on every change and publishes an
//! assessment on a channel whenever the dominant risk shifts.

use crossbeam_channel::Sender;
use tracing::{info, warn};

use pe_portfolio::PositionBook;
use pe_types::MarketContext;

use crate::signal::{RiskKind, SpotlightAssessment};
use crate::spotlight::RiskSpotlight;

/// Call [`SpotlightMonitor::update`] after every book edit or market move.
pub struct SpotlightMonitor {
    spotlight: RiskSpotlight,
    tx: Sender<SpotlightAssessment>,
    last: Option<SpotlightAssessment>,
}

impl SpotlightMonitor {
    pub fn new(spotlight: RiskSpotlight, tx: Sender<SpotlightAssessment>) -> Self {
        Self {
            spotlight,
            tx,
            last: None,
        }
    }

    pub fn last_assessment(&self) -> Option<&SpotlightAssessment> {
        self.last.as_ref()
    }

    /// Re-run the spotlight. The assessment is sent only when the dominant
    /// kind differs from the previous one (the first call always sends).
    pub fn update(&mut self, book: &PositionBook, ctx: &MarketContext) -> SpotlightAssessment {
        let assessment = self.spotlight.evaluate(book, ctx);
        let previous = self.last.as_ref().map(SpotlightAssessment::kind);

        if previous != Some(assessment.kind()) {
            self.emit(previous, &assessment);
        }

        self.last = Some(assessment.clone());
        assessment
    }

    fn emit(&self, previous: Option<RiskKind>, assessment: &SpotlightAssessment) {
        let message = &assessment.dominant.message;
        match assessment.kind() {
            RiskKind::Neutral => info!(%message, ?previous, "SPOTLIGHT NEUTRAL"),
            kind => warn!(%message, ?previous, score = assessment.dominant.score, "SPOTLIGHT {}", kind),
        }
        let _ = self.tx.try_send(assessment.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use pe_options::OptionKind;
    use pe_portfolio::PositionSpec;
    use rust_decimal_macros::dec;

    fn ctx() -> MarketContext {
        MarketContext::new(17450.0, 0.065, 0.0, 0.20)
    }

    #[test]
    fn test_first_update_publishes() {
        let (tx, rx) = unbounded();
        let mut monitor = SpotlightMonitor::new(RiskSpotlight::default(), tx);
        assert!(monitor.last_assessment().is_none());

        let a = monitor.update(&PositionBook::default(), &ctx());
        let sent = rx.try_recv().expect("expected first assessment");
        assert_eq!(sent.id, a.id);
        assert_eq!(sent.kind(), RiskKind::Neutral);
        assert_eq!(monitor.last_assessment().map(|l| l.id), Some(a.id));
    }

    #[test]
    fn test_unchanged_kind_is_quiet() {
        let (tx, rx) = unbounded();
        let mut monitor = SpotlightMonitor::new(RiskSpotlight::default(), tx);
        let book = PositionBook::default();
        monitor.update(&book, &ctx());
        monitor.update(&book, &ctx());
        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn test_kind_change_publishes() {
        let (tx, rx) = unbounded();
        let mut monitor = SpotlightMonitor::new(RiskSpotlight::default(), tx);
        let mut book = PositionBook::default();
        monitor.update(&book, &ctx());

        book.add(PositionSpec::new(OptionKind::Call, dec!(17000), 60), &ctx())
            .unwrap();
        monitor.update(&book, &ctx());

        let kinds: Vec<RiskKind> = rx.try_iter().map(|a| a.kind()).collect();
        assert_eq!(kinds, vec![RiskKind::Neutral, RiskKind::Delta]);
    }

    #[test]
    fn test_closed_receiver_does_not_panic() {
        let (tx, rx) = unbounded();
        drop(rx);
        let mut monitor = SpotlightMonitor::new(RiskSpotlight::default(), tx);
        let a = monitor.update(&PositionBook::default(), &ctx());
        assert_eq!(a.kind(), RiskKind::Neutral);
    }
}
