//! Screener configuration (`cefscreen.toml`).
//!
//! Every field has a default, so an empty or absent file is a valid
//! configuration for demo mode.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Local;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use cefscreen_core::client::{ClientError, HttpQueryClient, QueryClient};
use cefscreen_core::engine::{synthetic_universe, LocalEngine};
use cefscreen_core::expr::Fill;
use cefscreen_core::request::{ExecOptions, Mode};

use crate::dashboard::DEFAULT_LOG_CAPACITY;
use crate::screen::{QueryBuilder, ScreenParams, DEFAULT_MAIN_GROUP_FIELD, DEFAULT_SUB_GROUP_FIELD};

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "cefscreen.toml";

/// Seed of the demo universe.
pub const DEMO_SEED: u64 = 2024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("no service endpoint configured (set [service] endpoint or use --demo)")]
    MissingEndpoint,
    #[error(transparent)]
    Client(#[from] ClientError),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FillSetting {
    Prev,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    /// URL of the hosted query service.
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
    pub mode: Mode,
    pub fill: FillSetting,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: 120,
            mode: Mode::Cached,
            fill: FillSetting::Prev,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScreenConfig {
    pub main_group_field: String,
    pub sub_group_field: String,
    /// Group selected at startup; empty until groups are reloaded.
    pub default_main_group: String,
    pub min_market_cap_mm: u64,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            main_group_field: DEFAULT_MAIN_GROUP_FIELD.into(),
            sub_group_field: DEFAULT_SUB_GROUP_FIELD.into(),
            default_main_group: String::new(),
            min_market_cap_mm: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    /// Entries kept in the activity log.
    pub log_capacity: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScreenerConfig {
    pub service: ServiceConfig,
    pub screen: ScreenConfig,
    pub display: DisplayConfig,
}

impl ScreenerConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Load `path` if given, else `cefscreen.toml` if present, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::from_file(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn exec_options(&self) -> ExecOptions {
        ExecOptions {
            fill: match self.service.fill {
                FillSetting::Prev => Some(Fill::Prev),
                FillSetting::None => None,
            },
            mode: self.service.mode,
        }
    }

    pub fn query_builder(&self) -> QueryBuilder {
        QueryBuilder::new(
            self.screen.main_group_field.as_str(),
            self.screen.sub_group_field.as_str(),
        )
        .with_options(self.exec_options())
    }

    pub fn initial_params(&self) -> ScreenParams {
        ScreenParams::new(
            self.screen.default_main_group.as_str(),
            self.screen.min_market_cap_mm,
        )
    }

    /// The configured query client, or the local engine over the demo
    /// universe when `demo` is set.
    pub fn client(&self, demo: bool) -> Result<Box<dyn QueryClient>, ConfigError> {
        if demo {
            let today = Local::now().date_naive();
            tracing::info!(seed = DEMO_SEED, "using local engine over demo universe");
            return Ok(Box::new(LocalEngine::new(synthetic_universe(DEMO_SEED, today))));
        }
        let endpoint = self
            .service
            .endpoint
            .as_deref()
            .ok_or(ConfigError::MissingEndpoint)?;
        tracing::info!(endpoint, "using hosted query service");
        let timeout = Duration::from_secs(self.service.timeout_secs);
        let client = HttpQueryClient::new(endpoint, timeout)?;
        Ok(Box::new(client))
    }
}
