use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub monday: MondayConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub server: ServerConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MondayConfig {
  /// GraphQL endpoint
  pub api_url: String,
  /// Value sent in the API-Version header
  pub api_version: String,
  /// Board searched when resolving an email address
  pub board_id: String,
  /// Column on `board_id` holding the tenant email
  pub email_column_id: String,
  /// Items requested per page when listing a board
  pub listing_page_size: u32,
  /// Items requested per page when scanning for an email
  pub email_page_size: u32,
  /// Per-request timeout; unset leaves the transport default
  pub request_timeout_secs: Option<u64>,
}

impl Default for MondayConfig {
  fn default() -> Self {
    Self {
      api_url: "https://api.monday.com/v2".to_string(),
      api_version: "2023-10".to_string(),
      board_id: "273895529".to_string(),
      email_column_id: "email".to_string(),
      listing_page_size: 25,
      email_page_size: 50,
      request_timeout_secs: None,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// How long a board listing is served from memory
  pub ttl_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self { ttl_secs: 5 * 60 }
  }
}

impl CacheConfig {
  /// Longest accepted TTL (one year)
  pub const MAX_TTL_SECS: u64 = 365 * 24 * 60 * 60;

  pub fn ttl(&self) -> chrono::Duration {
    chrono::Duration::seconds(self.ttl_secs as i64)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host: String,
  pub port: u16,
  /// Directory of static panel assets served at `/`
  pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host: "0.0.0.0".to_string(),
      port: 5000,
      static_dir: None,
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
  /// Also write logs to this file
  pub file: Option<PathBuf>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./missive-monday.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/missive-monday/config.yaml
  ///
  /// When no file is found the built-in defaults are used. `PORT` in the
  /// environment overrides the configured port.
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

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    if let Ok(port) = std::env::var("PORT") {
      config.server.port = port
        .parse()
        .map_err(|e| eyre!("Invalid PORT value {:?}: {}", port, e))?;
    }

    config.validate()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("missive-monday.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("missive-monday").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }

  fn validate(&self) -> Result<()> {
    url::Url::parse(&self.monday.api_url)
      .map_err(|e| eyre!("Invalid monday.api_url {:?}: {}", self.monday.api_url, e))?;

    if self.monday.listing_page_size == 0 || self.monday.email_page_size == 0 {
      return Err(eyre!("Page sizes must be greater than zero"));
    }
    if self.monday.board_id.trim().is_empty() {
      return Err(eyre!("monday.board_id must not be empty"));
    }
    if self.cache.ttl_secs > CacheConfig::MAX_TTL_SECS {
      return Err(eyre!(
        "cache.ttl_secs must be at most {} (got {})",
        CacheConfig::MAX_TTL_SECS,
        self.cache.ttl_secs
      ));
    }

    Ok(())
  }

  /// Get the Monday.com API key from environment variables.
  ///
  /// Checks MONDAY_API_KEY first, then MISSIVE_MONDAY_API_KEY. A missing key
  /// is not an error here: requests go out without credentials and the remote
  /// rejects them.
  pub fn get_api_key() -> Option<String> {
    std::env::var("MONDAY_API_KEY")
      .or_else(|_| std::env::var("MISSIVE_MONDAY_API_KEY"))
      .ok()
  }
}

impl MondayConfig {
  pub fn request_timeout(&self) -> Option<Duration> {
    self.request_timeout_secs.map(Duration::from_secs)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults_match_remote_constants() {
    let config = Config::default();
    assert_eq!(config.monday.api_version, "2023-10");
    assert_eq!(config.monday.listing_page_size, 25);
    assert_eq!(config.monday.email_page_size, 50);
    assert_eq!(config.cache.ttl(), chrono::Duration::minutes(5));
    assert!(config.validate().is_ok());
  }

  #[test]
  fn test_partial_yaml_keeps_defaults() {
    let config = Config::from_yaml(
      "monday:\n  board_id: \"42\"\n  email_page_size: 10\ncache:\n  ttl_secs: 30\n",
    )
    .unwrap();

    assert_eq!(config.monday.board_id, "42");
    assert_eq!(config.monday.email_page_size, 10);
    assert_eq!(config.monday.listing_page_size, 25);
    assert_eq!(config.monday.email_column_id, "email");
    assert_eq!(config.cache.ttl_secs, 30);
    assert_eq!(config.server.port, 5000);
  }

  #[test]
  fn test_invalid_api_url_rejected() {
    let config = Config::from_yaml("monday:\n  api_url: \"not a url\"\n").unwrap();
    assert!(config.validate().is_err());
  }

  #[test]
  fn test_oversized_ttl_rejected() {
    let config = Config::from_yaml("cache:\n  ttl_secs: 18446744073709551615\n").unwrap();
    assert!(config.validate().is_err());

    let config = Config::from_yaml("cache:\n  ttl_secs: 31536000\n").unwrap();
    assert!(config.validate().is_ok());
  }

  #[test]
  fn test_zero_page_size_rejected() {
    let config = Config::from_yaml("monday:\n  listing_page_size: 0\n").unwrap();
    assert!(config.validate().is_err());
  }
}
