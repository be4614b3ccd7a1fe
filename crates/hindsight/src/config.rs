//! Configuration for the memory, its encoder and the REST server.
//!
//! Every field has a default, so an empty `{}` file is valid and no file at
//! all is fine too.

use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::memory::retrieval::RetrievalSettings;

/// Overrides `data_dir` from any config file
pub const DATA_DIR_ENV: &str = "HINDSIGHT_DATA_DIR";

const CONFIG_FILE: &str = "config.json";
const LOCAL_CONFIG_PATHS: &[&str] = &[".hindsight.json", "hindsight.json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderKind {
  /// Hashed bag-of-words, always available
  Lexical,
  /// ONNX sentence embeddings, needs the `neural` feature
  Neural,
  Disabled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_bind")]
  pub bind: SocketAddr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
  #[serde(default = "default_data_dir")]
  pub data_dir: PathBuf,
  #[serde(default = "default_enabled")]
  pub enabled: bool,
  #[serde(default = "default_encoder")]
  pub encoder: EncoderKind,
  #[serde(default = "default_lexical_dimensions")]
  pub lexical_dimensions: usize,
  #[serde(default)]
  pub retrieval: RetrievalSettings,
  #[serde(default)]
  pub server: ServerConfig,
}

fn default_data_dir() -> PathBuf {
  dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".hindsight")
}
fn default_enabled() -> bool {
  true
}
fn default_encoder() -> EncoderKind {
  EncoderKind::Lexical
}
fn default_lexical_dimensions() -> usize {
  384
}
fn default_bind() -> SocketAddr {
  SocketAddr::from(([127, 0, 0, 1], 3000))
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self { bind: default_bind() }
  }
}

impl Default for Config {
  fn default() -> Self {
    Self {
      data_dir: default_data_dir(),
      enabled: default_enabled(),
      encoder: default_encoder(),
      lexical_dimensions: default_lexical_dimensions(),
      retrieval: RetrievalSettings::default(),
      server: ServerConfig::default(),
    }
  }
}

impl Config {
  pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
      .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
    serde_json::from_str(&content)
      .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
  }

  /// Resolve configuration: an explicit file if given, else the first of
  /// `.hindsight.json`, `hindsight.json`, `<data_dir>/config.json`, else
  /// defaults. `HINDSIGHT_DATA_DIR` always wins for the data directory.
  pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
    let env_dir = env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()).map(PathBuf::from);

    let mut config = match explicit {
      Some(path) => Self::load_from_file(path)?,
      None => {
        let data_dir = env_dir.clone().unwrap_or_else(default_data_dir);
        let candidates = LOCAL_CONFIG_PATHS
          .iter()
          .map(PathBuf::from)
          .chain(std::iter::once(data_dir.join(CONFIG_FILE)));

        let mut found = None;
        for candidate in candidates {
          if candidate.is_file() {
            found = Some(Self::load_from_file(&candidate)?);
            break;
          }
        }
        found.unwrap_or_default()
      }
    };

    if let Some(dir) = env_dir {
      config.data_dir = dir;
    }
    Ok(config)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;
  use tempfile::TempDir;

  #[test]
  fn test_empty_object_uses_defaults() {
    let config: Config = serde_json::from_str("{}").unwrap();
    assert!(config.enabled);
    assert_eq!(config.encoder, EncoderKind::Lexical);
    assert_eq!(config.retrieval, RetrievalSettings::default());
    assert_eq!(config.server.bind, default_bind());
  }

  #[test]
  fn test_partial_retrieval_block() {
    let config: Config =
      serde_json::from_str(r#"{"encoder": "disabled", "retrieval": {"max_suggestions": 5}}"#).unwrap();
    assert_eq!(config.encoder, EncoderKind::Disabled);
    assert_eq!(config.retrieval.max_suggestions, 5);
    assert_eq!(config.retrieval.suggestion_threshold, 0.85);
    assert_eq!(config.retrieval.similar_threshold, 0.8);
    assert_eq!(config.retrieval.max_similar, None);
  }

  #[test]
  #[serial]
  fn test_env_overrides_explicit_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("custom.json");
    std::fs::write(&path, r#"{"data_dir": "/somewhere/else", "lexical_dimensions": 64}"#).unwrap();

    env::set_var(DATA_DIR_ENV, temp.path());
    let config = Config::load(Some(&path)).unwrap();
    env::remove_var(DATA_DIR_ENV);

    assert_eq!(config.data_dir, temp.path());
    assert_eq!(config.lexical_dimensions, 64);
  }

  #[test]
  #[serial]
  fn test_config_in_data_dir_is_found() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join(CONFIG_FILE), r#"{"enabled": false}"#).unwrap();

    env::set_var(DATA_DIR_ENV, temp.path());
    let config = Config::load(None).unwrap();
    env::remove_var(DATA_DIR_ENV);

    assert!(!config.enabled);
    assert_eq!(config.data_dir, temp.path());
  }

  #[test]
  fn test_bad_file_is_a_parse_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("broken.json");
    std::fs::write(&path, "not json").unwrap();
    assert!(matches!(Config::load_from_file(&path), Err(ConfigError::Parse { .. })));
  }
}
