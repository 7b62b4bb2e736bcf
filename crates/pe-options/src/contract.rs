use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use pe_types::{MoneynessBands, PeError};

/// Call or put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionKind {
    Call,
    Put,
}

impl OptionKind {
    /// Payoff of exercising now: `max(S-K, 0)` for calls, `max(K-S, 0)` for puts.
    pub fn intrinsic_value(&self, spot: f64, strike: f64) -> f64 {
        let iv = match self {
            OptionKind::Call => spot - strike,
            OptionKind::Put => strike - spot,
        };
        if iv > 0.0 {
            iv
        } else {
            0.0
        }
    }

    /// True when the option is in-the-money.
    pub fn is_itm(&self, spot: f64, strike: f64) -> bool {
        self.intrinsic_value(spot, strike) > 0.0
    }

    pub fn is_call(&self) -> bool {
        matches!(self, OptionKind::Call)
    }
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionKind::Call => write!(f, "Call"),
            OptionKind::Put => write!(f, "Put"),
        }
    }
}

impl FromStr for OptionKind {
    type Err = PeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CALL" | "C" | "CE" => Ok(OptionKind::Call),
            "PUT" | "P" | "PE" => Ok(OptionKind::Put),
            other => Err(PeError::invalid_input(
                "type",
                format!("expected CALL or PUT, got {other:?}"),
            )),
        }
    }
}

/// Where a strike sits relative to spot, from the holder's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Moneyness {
    DeepItm,
    Itm,
    Atm,
    Otm,
    DeepOtm,
}

impl Moneyness {
    /// Five-tier classification of `strike` against `spot`.
    ///
    /// Calls: below `spot·(1-deep)` is deep ITM, below `spot·(1-atm)` ITM,
    /// up to `spot·(1+atm)` ATM, up to `spot·(1+deep)` OTM, beyond that deep
    /// OTM. Puts mirror the bands around spot.
    pub fn classify(kind: OptionKind, strike: f64, spot: f64, bands: &MoneynessBands) -> Self {
        let deep_below = spot * (1.0 - bands.deep);
        let atm_below = spot * (1.0 - bands.atm);
        let atm_above = spot * (1.0 + bands.atm);
        let deep_above = spot * (1.0 + bands.deep);

        match kind {
            OptionKind::Call => {
                if strike < deep_below {
                    Moneyness::DeepItm
                } else if strike < atm_below {
                    Moneyness::Itm
                } else if strike <= atm_above {
                    Moneyness::Atm
                } else if strike <= deep_above {
                    Moneyness::Otm
                } else {
                    Moneyness::DeepOtm
                }
            }
            OptionKind::Put => {
                if strike > deep_above {
                    Moneyness::DeepItm
                } else if strike > atm_above {
                    Moneyness::Itm
                } else if strike >= atm_below {
                    Moneyness::Atm
                } else if strike >= deep_below {
                    Moneyness::Otm
                } else {
                    Moneyness::DeepOtm
                }
            }
        }
    }

    pub fn is_itm(&self) -> bool {
        matches!(self, Moneyness::DeepItm | Moneyness::Itm)
    }
}

impl fmt::Display for Moneyness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Moneyness::DeepItm => "Deep ITM",
            Moneyness::Itm => "ITM",
            Moneyness::Atm => "ATM",
            Moneyness::Otm => "OTM",
            Moneyness::DeepOtm => "Deep OTM",
        };
        write!(f, "{}", s)
    }
}
