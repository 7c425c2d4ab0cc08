//! Pricecast forecast - one-shot training and prediction over a price history
//!
//! Reads a CSV of `timestamp,close` bars, trains the model ensemble over lag
//! windows, the single-series price predictor and the risk scorer, then prints
//! a JSON report to stdout.
//!
//! # Usage
//! ```sh
//! LOG_FORMAT=json cargo run --bin forecast -- --input data/btc.csv --asset BTC
//! ```
//!
//! # Environment Variables
//! See `pricecast::config` for the full list (`ENSEMBLE_*`, `RF_*`, `GB_*`,
//! `SEQUENCE_*`, `RISK_*`, `LOG_FORMAT`).

use anyhow::{Context, Result};
use clap::Parser;
use pricecast::application::ml::{
    EnsembleCoordinator, EnsembleResult, LagWindowBuilder, PricePrediction, PricePredictor,
    SequenceTrainingReport, TrainingReport,
};
use pricecast::application::risk_management::{RiskAssessment, RiskScorer, RiskTrainingReport};
use pricecast::config::Config;
use pricecast::infrastructure::{init_tracing, load_bars};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the price history CSV (timestamp,close)
    #[arg(long, default_value = "data/prices.csv")]
    input: PathBuf,

    /// Asset label used in logs and the report
    #[arg(long, default_value = "BTC")]
    asset: String,

    /// Override SEQUENCE_LOOKBACK for the lag windows
    #[arg(long)]
    lookback: Option<usize>,

    /// Train and predict models one after another instead of on the rayon pool
    #[arg(long)]
    sequential: bool,
}

#[derive(Serialize)]
struct ForecastReport {
    asset: String,
    bars: usize,
    last_close: Option<f64>,
    ensemble_training: TrainingReport,
    ensemble: EnsembleResult,
    sequence_training: SequenceTrainingReport,
    price: PricePrediction,
    risk_training: RiskTrainingReport,
    risk: RiskAssessment,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = Config::from_env()?;
    init_tracing(&config.observability)?;
    if let Some(lookback) = args.lookback {
        config.ensemble.sequence_lookback = lookback;
    }
    if args.sequential {
        config.ensemble.parallel = false;
    }

    let history = load_bars(&args.input)?;
    let closes = history.closes();

    // Ensemble over lag windows of the close series
    let builder = LagWindowBuilder::new(config.ensemble.sequence_lookback);
    let mut ensemble = EnsembleCoordinator::standard(config.ensemble.ensemble_config());
    let ensemble_training = ensemble
        .train_all(&builder, closes.as_slice())
        .context("Ensemble training failed")?;
    let latest = builder
        .latest_window(&closes)
        .context("Not enough bars for the latest window")?;
    let ensemble_result = ensemble
        .predict(&latest)
        .context("Ensemble prediction failed")?;

    // Single-series sequence predictor
    let mut predictor =
        PricePredictor::new(config.ensemble.price_predictor_config(args.asset.clone()));
    let sequence_training = predictor
        .train(&closes)
        .context("Price predictor training failed")?;
    let price = predictor
        .predict(&closes)
        .context("Price prediction failed")?;

    // Risk scoring on the most recent segment
    let risk_config = config.risk.scorer_config();
    let mut scorer = RiskScorer::new(risk_config);
    let risk_training = scorer
        .train(&history)
        .context("Risk scorer training failed")?;
    let risk = scorer
        .assess(&history.tail(risk_config.segment_len))
        .context("Risk assessment failed")?;

    info!(
        "{}: ensemble={:?}, sequence={:.4}, risk={:.4}",
        args.asset, ensemble_result.prediction, price.predicted_price, risk.model_risk
    );

    let report = ForecastReport {
        asset: args.asset,
        bars: history.len(),
        last_close: history.last_close(),
        ensemble_training,
        ensemble: ensemble_result,
        sequence_training,
        price,
        risk_training,
        risk,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to serialize report")?
    );
    Ok(())
}
