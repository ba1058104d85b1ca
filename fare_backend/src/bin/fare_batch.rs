//! Fare batch runner
//!
//! One periodic run of the engine: refresh flight and hotel baselines, then
//! rebuild the package set from the freshly scored observations.
//!
//! # Usage
//!
//! ```bash
//! # Run against the in-memory store with a seed file
//! FARE_SEED=observations.json cargo run --bin fare-batch
//!
//! # Use an explicit config file
//! FARE_CONFIG=/etc/fare/fare.toml cargo run --bin fare-batch
//! ```
//!
//! # Environment Variables
//!
//! - `FARE_CONFIG`: Path to `fare.toml` (default: search standard locations)
//! - `FARE_SEED`: JSON array of observations to load before the run
//! - `RUST_LOG`: Log filter (default: info)

use std::env;
use std::fs;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fare_backend::config::EngineConfig;
use fare_backend::db::{FullRepository, RepositoryFactory};
use fare_backend::models::PriceObservation;
use fare_backend::services::{build_packages, refresh_all_baselines, ServiceError};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging (also captures `log` records from the library)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("Starting fare batch run");

    let config = EngineConfig::load().context("loading engine configuration")?;
    let repository = RepositoryFactory::from_type_name(&config.repository.repo_type)?;
    if !repository.health_check().await? {
        anyhow::bail!("repository is not healthy");
    }
    info!("Repository initialized ({})", config.repository.repo_type);

    if let Ok(path) = env::var("FARE_SEED") {
        let seeded = seed(repository.as_ref(), &path).await?;
        info!("Seeded {} observations from {}", seeded, path);
    }

    match refresh_all_baselines(repository.as_ref(), &config.model).await {
        Ok(summary) => info!(
            "Baselines: {} flight groups, {} hotel groups, {} records updated",
            summary.flights.groups_processed, summary.hotels.groups_processed, summary.total_records
        ),
        Err(ServiceError::NothingToRefresh) => {
            warn!("Baselines: no series long enough to fit, keeping previous fields")
        }
        Err(e) => return Err(e).context("refreshing baselines"),
    }

    let packages = build_packages(repository.as_ref(), &config.packages)
        .await
        .context("building packages")?;
    info!(
        "Packages: {} created from {} candidates ({} superseded)",
        packages.created, packages.candidates, packages.superseded
    );

    info!("Fare batch run complete");
    Ok(())
}

async fn seed(repo: &dyn FullRepository, path: &str) -> anyhow::Result<usize> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading seed file {}", path))?;
    let observations: Vec<PriceObservation> =
        serde_json::from_str(&content).with_context(|| format!("parsing seed file {}", path))?;

    let count = observations.len();
    for observation in observations {
        repo.store_observation(observation).await?;
    }
    Ok(count)
}
