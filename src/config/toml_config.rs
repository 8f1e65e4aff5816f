use crate::adapters::http::{DEFAULT_ACCEPT_LANGUAGE, DEFAULT_USER_AGENT};
use crate::core::batch::Pacing;
use crate::core::fbref::DEFAULT_FBREF_URL;
use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_base_url, validate_pause_window, validate_path, validate_range, validate_required,
    Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

pub const BASE_DATA_DIR_ENV: &str = "BASE_DATA_DIR";
pub const DEFAULT_BASE_URL: &str = "https://es.whoscored.com";

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("static regex"));

/// Settings file. Every section and key is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub fetch: FetchConfig,
    pub batch: BatchConfig,
    pub output: OutputConfig,
    pub monitoring: MonitoringConfig,
    pub fbref: FbrefConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub base_data_dir: String,
    /// Team crests; defaults to `<base_data_dir>/assets/logos`.
    pub assets_dir: Option<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            base_data_dir: "./data".to_string(),
            assets_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub accept_language: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_seconds: 30,
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub pause_min_secs: f64,
    pub pause_max_secs: f64,
    pub cooldown_every: usize,
    pub cooldown_secs: f64,
    pub limit: Option<usize>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        let pacing = Pacing::default();
        Self {
            pause_min_secs: pacing.pause_min_secs,
            pause_max_secs: pacing.pause_max_secs,
            cooldown_every: pacing.cooldown_every,
            cooldown_secs: pacing.cooldown_secs,
            limit: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FbrefConfig {
    pub base_url: String,
    pub season: String,
    pub retry_attempts: u32,
    /// Wait before retry `n` is `retry_backoff_secs^n` seconds.
    pub retry_backoff_secs: f64,
}

impl Default for FbrefConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_FBREF_URL.to_string(),
            season: "2025-2026".to_string(),
            retry_attempts: 3,
            retry_backoff_secs: 1.5,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub archive: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl AppConfig {
    /// Load from a TOML file, then apply environment overrides.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);
        let mut config: AppConfig = toml::from_str(&processed)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Defaults plus environment overrides, for runs without `--config`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Replace `${VAR}` with the variable's value; unknown variables stay as written.
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_RE
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var(BASE_DATA_DIR_ENV) {
            if !dir.trim().is_empty() {
                tracing::debug!("{} overrides base_data_dir: {}", BASE_DATA_DIR_ENV, dir);
                self.paths.base_data_dir = dir;
            }
        }
    }

    pub fn assets_dir(&self) -> PathBuf {
        match &self.paths.assets_dir {
            Some(dir) => PathBuf::from(dir),
            None => self.base_data_dir().join("assets").join("logos"),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.timeout_seconds)
    }

    pub fn pacing(&self) -> Pacing {
        Pacing {
            pause_min_secs: self.batch.pause_min_secs,
            pause_max_secs: self.batch.pause_max_secs,
            cooldown_every: self.batch.cooldown_every,
            cooldown_secs: self.batch.cooldown_secs,
        }
    }

    /// Page pauses for FBRef: the batch window without the cooldown.
    pub fn fbref_pacing(&self) -> Pacing {
        Pacing {
            cooldown_every: 0,
            ..self.pacing()
        }
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.enabled
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_path("paths.base_data_dir", &self.paths.base_data_dir)?;
        if let Some(assets) = &self.paths.assets_dir {
            validate_path("paths.assets_dir", assets)?;
        }
        validate_base_url("fetch.base_url", &self.fetch.base_url)?;
        validate_required("fetch.user_agent", &self.fetch.user_agent)?;
        validate_range("fetch.timeout_seconds", self.fetch.timeout_seconds, 1, 600)?;
        validate_pause_window(self.batch.pause_min_secs, self.batch.pause_max_secs)?;
        validate_range("batch.cooldown_secs", self.batch.cooldown_secs, 0.0, 3600.0)?;
        if let Some(limit) = self.batch.limit {
            validate_range("batch.limit", limit, 1, usize::MAX)?;
        }
        validate_base_url("fbref.base_url", &self.fbref.base_url)?;
        validate_required("fbref.season", &self.fbref.season)?;
        validate_range("fbref.retry_attempts", self.fbref.retry_attempts, 1, 10)?;
        validate_range("fbref.retry_backoff_secs", self.fbref.retry_backoff_secs, 0.0, 60.0)?;
        Ok(())
    }
}

impl ConfigProvider for AppConfig {
    fn base_data_dir(&self) -> PathBuf {
        PathBuf::from(&self.paths.base_data_dir)
    }

    fn base_url(&self) -> &str {
        &self.fetch.base_url
    }

    fn fbref_url(&self) -> &str {
        &self.fbref.base_url
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
