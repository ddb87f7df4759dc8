use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub server: ServerConfig,
  #[serde(default)]
  pub client: ClientConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  /// Address the API server binds to
  #[serde(default = "default_bind")]
  pub bind: String,
  /// Origins allowed by the CORS layer; requests without an Origin header
  /// (curl, tooling) are unaffected
  #[serde(default)]
  pub allowed_origins: Vec<String>,
  /// Database file path (defaults to the platform data directory)
  pub database: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
  /// Base URL of the API server the client talks to
  #[serde(default = "default_url")]
  pub url: String,
}

fn default_bind() -> String {
  "127.0.0.1:3500".to_string()
}

fn default_url() -> String {
  "http://127.0.0.1:3500".to_string()
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      bind: default_bind(),
      allowed_origins: Vec::new(),
      database: None,
    }
  }
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self { url: default_url() }
  }
}

impl ServerConfig {
  /// Resolve the database path, falling back to the platform data directory.
  pub fn database_path(&self) -> Result<PathBuf> {
    if let Some(path) = &self.database {
      return Ok(path.clone());
    }

    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("notedesk").join("notedesk.db"))
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./notedesk.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/notedesk/config.yaml
  ///
  /// Every field has a default, so a missing file yields a usable config.
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

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("notedesk.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("notedesk").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Get the API token from the environment, if set.
  ///
  /// The token is the shared secret checked by the bearer middleware on
  /// note routes; when unset, the server skips the check and the client
  /// sends no Authorization header.
  pub fn api_token() -> Option<String> {
    std::env::var("NOTEDESK_API_TOKEN").ok()
  }
}
