//! Implied volatility by bisection.
//!
//! Option prices are monotonically non-decreasing in volatility for T > 0, so
//! a bracket over `[min_vol, max_vol]` always narrows toward the solution. When
//! the observed price is unreachable (below intrinsic or above the price at
//! `max_vol`) the search converges to the nearest edge of the bracket instead
//! of failing.

use tracing::{debug, warn};

use pe_types::{precondition, IvSolverConfig, PeResult};

use crate::contract::OptionKind;
use crate::pricing::{price, PricingInput};

/// Outcome of a solve, including diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IvSolution {
    /// Annualised volatility (0.15 = 15 %).
    pub sigma: f64,
    pub iterations: u32,
    pub converged: bool,
    /// Model price minus observed price at `sigma`.
    pub residual: f64,
}

/// Bisection-based implied volatility solver.
#[derive(Debug, Clone, Default)]
pub struct IvSolver {
    config: IvSolverConfig,
}

impl IvSolver {
    pub fn new(config: IvSolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IvSolverConfig {
        &self.config
    }

    /// Solve for the volatility that reproduces `observed_price`.
    ///
    /// `input.volatility` is ignored. Returns 0 when the option has expired.
    pub fn implied_vol(
        &self,
        kind: OptionKind,
        strike: f64,
        observed_price: f64,
        input: &PricingInput,
    ) -> PeResult<f64> {
        Ok(self.solve(kind, strike, observed_price, input)?.sigma)
    }

    /// Like [`IvSolver::implied_vol`] but also reports iterations and residual.
    pub fn solve(
        &self,
        kind: OptionKind,
        strike: f64,
        observed_price: f64,
        input: &PricingInput,
    ) -> PeResult<IvSolution> {
        if input.time_to_expiry <= 0.0 {
            return Ok(IvSolution {
                sigma: 0.0,
                iterations: 0,
                converged: true,
                residual: 0.0,
            });
        }

        let cfg = &self.config;
        if !(cfg.min_vol > 0.0 && cfg.min_vol < cfg.max_vol && cfg.max_vol.is_finite()) {
            return Err(precondition!(
                "IV search bracket [{}, {}] is empty or non-positive",
                cfg.min_vol,
                cfg.max_vol
            ));
        }
        if !cfg.initial_guess.is_finite() {
            return Err(precondition!("IV initial guess must be finite, got {}", cfg.initial_guess));
        }
        let mut lo = cfg.min_vol;
        let mut hi = cfg.max_vol;
        let mut sigma = cfg.initial_guess.clamp(lo, hi);
        let mut residual = f64::NAN;

        for i in 0..cfg.max_iterations {
            let model = price(kind, strike, &input.with_volatility(sigma))?;
            residual = model - observed_price;

            if residual.abs() < cfg.tolerance {
                debug!(
                    "IV converged: {} K={} σ={:.6} after {} iterations",
                    kind,
                    strike,
                    sigma,
                    i + 1
                );
                return Ok(IvSolution {
                    sigma,
                    iterations: i + 1,
                    converged: true,
                    residual,
                });
            }

            if residual > 0.0 {
                hi = sigma;
            } else {
                lo = sigma;
            }
            sigma = 0.5 * (lo + hi);
        }

        warn!(
            "IV did not converge for {} K={} observed={} (best σ={:.6}, residual={:.6})",
            kind, strike, observed_price, sigma, residual
        );
        Ok(IvSolution {
            sigma,
            iterations: cfg.max_iterations,
            converged: false,
            residual,
        })
    }
}

/// Implied volatility with the default solver settings.
pub fn implied_volatility(
    kind: OptionKind,
    strike: f64,
    observed_price: f64,
    input: &PricingInput,
) -> PeResult<f64> {
    IvSolver::default().implied_vol(kind, strike, observed_price, input)
}
