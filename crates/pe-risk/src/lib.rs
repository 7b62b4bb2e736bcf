//! Risk views over a position book.
//!
//! Provides:
//! - Premium erosion projections (linear and moneyness-aware models)
//! - Single dominant-risk detection ("spotlight")
//! - Change-driven publication of spotlight assessments via channels

pub mod erosion;
pub mod monitor;
pub mod signal;
pub mod spotlight;

pub use erosion::*;
pub use monitor::SpotlightMonitor;
pub use signal::{RiskKind, RiskSignal, SpotlightAssessment, SpotlightMetrics};
pub use spotlight::RiskSpotlight;
