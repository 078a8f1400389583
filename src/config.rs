use color_eyre::{eyre::eyre, Result};
use paramcache::ParameterOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENDPOINT_ENV: &str = "PARAMCACHE_ENDPOINT";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub source: SourceConfig,
  #[serde(default)]
  pub client: ClientConfig,
  /// Policy applied to every fetched parameter unless overridden on the command line
  #[serde(default)]
  pub defaults: DefaultsConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
  /// Base URL of the parameter store endpoint
  pub endpoint: String,
  /// Transport-level retries for transient failures
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
  #[serde(default = "default_timeout_ms")]
  pub timeout_ms: u64,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      timeout_ms: default_timeout_ms(),
    }
  }
}

impl ClientConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_millis(self.timeout_ms)
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefaultsConfig {
  /// Seconds a fetched value stays valid; unset means values never expire
  pub expiry_secs: Option<u64>,
  #[serde(default)]
  pub auto_refresh: bool,
}

impl DefaultsConfig {
  pub fn parameter_options(&self) -> ParameterOptions {
    match self.expiry_secs {
      Some(secs) => ParameterOptions::expiring(Duration::from_secs(secs)).auto_refresh(self.auto_refresh),
      None => ParameterOptions {
        auto_refresh: self.auto_refresh,
        ..ParameterOptions::default()
      },
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
  /// Filter directive used when RUST_LOG is not set
  #[serde(default = "default_log_level")]
  pub level: String,
  /// Write logs here instead of stderr
  pub file: Option<PathBuf>,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      file: None,
    }
  }
}

fn default_max_retries() -> u32 {
  2
}

fn default_timeout_ms() -> u64 {
  1000
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./paramcache.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/paramcache/config.yaml
  ///
  /// `PARAMCACHE_ENDPOINT` replaces the configured endpoint when set.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::from_env_only()?,
    };

    Ok(config.with_endpoint_override(std::env::var(ENDPOINT_ENV).ok()))
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("paramcache.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("paramcache").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  /// Without a config file the endpoint must come from the environment.
  fn from_env_only() -> Result<Self> {
    let endpoint = std::env::var(ENDPOINT_ENV).map_err(|_| {
      eyre!(
        "No configuration file found and {} is not set. Create ~/.config/paramcache/config.yaml \
         or set the endpoint in the environment.",
        ENDPOINT_ENV
      )
    })?;

    Ok(Self {
      source: SourceConfig {
        endpoint,
        max_retries: default_max_retries(),
      },
      client: ClientConfig::default(),
      defaults: DefaultsConfig::default(),
      log: LogConfig::default(),
    })
  }

  pub fn parse(contents: &str) -> Result<Self> {
    Ok(serde_yaml::from_str(contents)?)
  }

  fn with_endpoint_override(mut self, endpoint: Option<String>) -> Self {
    if let Some(endpoint) = endpoint.filter(|e| !e.is_empty()) {
      self.source.endpoint = endpoint;
    }
    self
  }
}
