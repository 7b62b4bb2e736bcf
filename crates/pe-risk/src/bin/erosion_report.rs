use anyhow::Context;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use tracing::info;

use pe_options::OptionKind;
use pe_portfolio::{decay_series, export_rows, pl_series, BookAggregate, DecayPoint, ExportRow, PositionBook};
use pe_risk::{
    confidence_band, erosion_ratio, project_erosion, ConfidenceBand, ErosionModel, ErosionParams,
    ErosionProjection, RiskSpotlight, SpotlightAssessment,
};
use pe_types::{EngineConfig, MarketContext};

#[derive(Serialize)]
struct PositionErosion {
    id: u64,
    kind: OptionKind,
    linear: ErosionProjection,
    non_linear: ErosionProjection,
    confidence: ConfidenceBand,
}

#[derive(Serialize)]
struct PlSummary {
    max_profit: f64,
    max_loss: f64,
    upper_breakeven: Option<f64>,
    lower_breakeven: Option<f64>,
}

#[derive(Serialize)]
struct Report {
    market: MarketContext,
    positions: Vec<ExportRow>,
    aggregate: BookAggregate,
    decay: Vec<DecayPoint>,
    pl: PlSummary,
    erosion: Vec<PositionErosion>,
    /// Call theta over put theta; absent when the put does not decay.
    erosion_ratio: Option<f64>,
    spotlight: SpotlightAssessment,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = match std::env::var("PE_CONFIG") {
        Ok(path) => EngineConfig::from_json_file(&path)
            .with_context(|| format!("loading config from {path}"))?,
        Err(_) => EngineConfig::default(),
    };
    config.apply_env().context("applying PE_* overrides")?;
    let ctx = config.market;
    info!("Erosion report for {} at {}", config.underlying, ctx);

    let mut book = PositionBook::from_config(&config);
    book.add_default_atm(OptionKind::Call, &ctx)?;
    book.add_default_atm(OptionKind::Put, &ctx)?;
    book.refresh_all(&ctx)?;

    let decay = decay_series(book.positions(), &ctx, config.projection.horizon_days)?;
    let pl = pl_series(
        book.positions(),
        &ctx,
        config.projection.price_range_pct,
        config.projection.steps,
        config.projection.include_premium,
    )?;

    let mut erosion = Vec::with_capacity(book.len());
    for p in book.iter() {
        let linear = project_erosion(&ErosionParams::from_position(p, ErosionModel::default()))?;
        let non_linear = project_erosion(&ErosionParams::from_position(
            p,
            ErosionParams::non_linear_for(p.moneyness),
        ))?;
        let theta = p.greeks.theta.to_f64().unwrap_or(0.0);
        erosion.push(PositionErosion {
            id: p.id,
            kind: p.kind,
            linear,
            non_linear,
            confidence: confidence_band(p.premium_f64(), theta)?,
        });
    }

    let theta_of = |kind: OptionKind| -> f64 {
        book.iter()
            .filter(|p| p.kind == kind)
            .filter_map(|p| p.greeks.theta.to_f64())
            .sum()
    };
    let ratio = erosion_ratio(theta_of(OptionKind::Call), theta_of(OptionKind::Put));

    let spotlight = RiskSpotlight::new(config.spotlight.clone(), config.underlying).evaluate(&book, &ctx);
    info!("Dominant risk: {} ({})", spotlight.kind(), spotlight.dominant.message);

    let report = Report {
        market: ctx,
        positions: export_rows(book.iter()),
        aggregate: book.aggregate(),
        decay,
        pl: PlSummary {
            max_profit: pl.max_profit,
            max_loss: pl.max_loss,
            upper_breakeven: pl.upper_breakeven,
            lower_breakeven: pl.lower_breakeven,
        },
        erosion,
        erosion_ratio: ratio,
        spotlight,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
