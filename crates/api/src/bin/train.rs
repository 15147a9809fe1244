//! Train the yield model and write its artifact.
//!
//! Usage: `mavuno-train [config.toml]`

use anyhow::Context;
use api::{init_logging, ApiConfig};
use data_cleaner::{Cleaner, RawTable};
use inference_engine::Trainer;
use std::path::PathBuf;
use tracing::info;

fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = ApiConfig::load(config_path.as_deref()).context("loading configuration")?;
    init_logging(config.level()).context("installing tracing subscriber")?;

    let raw = RawTable::from_path(&config.data_path)
        .with_context(|| format!("reading {}", config.data_path.display()))?;
    let (table, cleaning) = Cleaner::new(config.cleaning.clone())
        .clean_with_report(raw)
        .context("cleaning source data")?;
    info!(
        "Cleaned {} of {} rows ({} incomplete, {} unparsable, {} invalid, {} other countries)",
        cleaning.rows_kept,
        cleaning.rows_read,
        cleaning.dropped_incomplete,
        cleaning.dropped_unparsable,
        cleaning.dropped_invalid,
        cleaning.dropped_country
    );

    let (artifact, report) = Trainer::new(config.trainer.clone())
        .train(&table)
        .context("training model")?;
    artifact
        .save(&config.model_dir)
        .with_context(|| format!("saving model to {}", config.model_dir.display()))?;

    info!(
        "Saved model to {}: {} features, base year {:?}, {} train / {} test rows",
        config.model_dir.display(),
        report.feature_count,
        report.base_year,
        report.train_rows,
        report.test_rows
    );
    info!("RMSE: {:.2}", report.metrics.rmse);
    info!("MAE: {:.2}", report.metrics.mae);

    Ok(())
}
