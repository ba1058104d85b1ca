//! Engine configuration file support.
//!
//! The batch engine reads a single TOML file (`fare.toml`):
//!
//! ```toml
//! [repository]
//! type = "local"
//!
//! [model]
//! anomaly_threshold = 2.0
//! history_days = 180
//!
//! [model.holt_winters]
//! seasonal_period = 7
//! alpha_grid = [0.1, 0.3, 0.5, 0.7]
//!
//! [smoothing]
//! alpha = 0.3
//!
//! [packages]
//! window_days = 30
//! hotel_markup = 1.2
//! stay_policy = { max_nights = 14 }
//!
//! [packages.dest_regions]
//! MCO = "ORL"
//! ```
//!
//! Every section and key is optional; missing values take their defaults.

use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::algorithms::holt_winters::SimpleSmoothingConfig;
use crate::db::factory::RepositoryType;
use crate::db::repository::{ErrorContext, RepositoryError};
use crate::services::baselines::BaselineConfig;
use crate::services::packages::{PackageConfig, StayPolicy};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "FARE_CONFIG";

/// Engine configuration from file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub repository: RepositorySettings,
    pub model: BaselineConfig,
    pub smoothing: SimpleSmoothingConfig,
    pub packages: PackageConfig,
}

/// Repository type settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositorySettings {
    #[serde(rename = "type", default = "default_repo_type")]
    pub repo_type: String,
}

fn default_repo_type() -> String {
    RepositoryType::default().to_string()
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            repo_type: default_repo_type(),
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    [
        PathBuf::from("fare.toml"),
        PathBuf::from("fare_backend/fare.toml"),
        PathBuf::from("../fare.toml"),
    ]
    .into_iter()
    .find(|path| path.exists())
}

fn config_error(message: String) -> RepositoryError {
    RepositoryError::configuration_with_context(message, ErrorContext::new("load_config"))
}

impl EngineConfig {
    /// Parse configuration from TOML text and validate it.
    pub fn from_toml_str(content: &str) -> Result<Self, RepositoryError> {
        let config: EngineConfig = toml::from_str(content)
            .map_err(|e| config_error(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Ok(EngineConfig)` if successful
    /// * `Err(RepositoryError)` if the file cannot be read, parsed or validated
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            config_error(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load configuration from the default location.
    ///
    /// Searches for `fare.toml` in:
    /// 1. Current directory
    /// 2. `fare_backend/` directory
    /// 3. Parent directory
    ///
    /// # Returns
    /// * `Ok(EngineConfig)` if found and parsed successfully
    /// * `Err(RepositoryError)` if no config file found or parse error
    pub fn from_default_location() -> Result<Self, RepositoryError> {
        match default_config_path() {
            Some(path) => Self::from_file(path),
            None => Err(config_error(
                "No fare.toml found in standard locations".to_string(),
            )),
        }
    }

    /// Resolve the configuration the batch binary should run with.
    ///
    /// `FARE_CONFIG` wins when set (and must be loadable); otherwise the
    /// default locations are searched, falling back to built-in defaults when
    /// no file exists.
    pub fn load() -> Result<Self, RepositoryError> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            info!("Loading configuration from {} ({})", path, CONFIG_ENV_VAR);
            return Self::from_file(path);
        }
        match default_config_path() {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                Self::from_file(path)
            }
            None => {
                info!("No fare.toml found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Get the repository type from configuration.
    pub fn repository_type(&self) -> Result<RepositoryType, RepositoryError> {
        self.repository
            .repo_type
            .parse()
            .map_err(|e| config_error(format!("Invalid repository type: {}", e)))
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), RepositoryError> {
        self.repository_type()?;

        let hw = &self.model.holt_winters;
        if hw.seasonal_period == 0 {
            return Err(config_error(
                "model.holt_winters.seasonal_period must be positive".to_string(),
            ));
        }
        if hw.alpha_grid.is_empty() || hw.beta_grid.is_empty() || hw.gamma_grid.is_empty() {
            return Err(config_error(
                "model.holt_winters grids must not be empty".to_string(),
            ));
        }
        if !(self.model.anomaly_threshold.is_finite() && self.model.anomaly_threshold > 0.0) {
            return Err(config_error(format!(
                "model.anomaly_threshold must be positive, got {}",
                self.model.anomaly_threshold
            )));
        }
        if self.model.history_days.is_some_and(|d| d <= 0) {
            return Err(config_error(
                "model.history_days must be positive when set".to_string(),
            ));
        }
        if !(self.smoothing.alpha > 0.0 && self.smoothing.alpha < 1.0) {
            return Err(config_error(format!(
                "smoothing.alpha must lie in (0, 1), got {}",
                self.smoothing.alpha
            )));
        }

        let p = &self.packages;
        if p.window_days <= 0 {
            return Err(config_error(format!(
                "packages.window_days must be positive, got {}",
                p.window_days
            )));
        }
        if !(p.hotel_markup.is_finite() && p.hotel_markup > 0.0) {
            return Err(config_error(format!(
                "packages.hotel_markup must be positive, got {}",
                p.hotel_markup
            )));
        }
        match &p.stay_policy {
            StayPolicy::Allowed(nights) if nights.is_empty() || nights.contains(&0) => {
                return Err(config_error(
                    "packages.stay_policy.allowed must list positive night counts".to_string(),
                ));
            }
            StayPolicy::MaxNights(0) => {
                return Err(config_error(
                    "packages.stay_policy.max_nights must be positive".to_string(),
                ));
            }
            _ => {}
        }

        Ok(())
    }
}
