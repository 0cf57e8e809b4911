use std::io;

use thiserror::Error;

/// Error type for quire-config operations
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("Configuration error: {0}")]
  Config(String),

  /// A `--config` key that names no setting.
  #[error(
    "Unknown configuration key: '{0}'. See documentation for supported keys."
  )]
  UnknownKey(String),

  /// Values that parsed but are out of range, one message per field.
  #[error("Configuration validation errors:\n{}", .0.join("\n"))]
  Invalid(Vec<String>),

  #[error("Template error: {0}")]
  Template(String),

  #[error("I/O error: {0}")]
  Io(#[from] io::Error),

  #[error("Serde error: {0}")]
  Serde(#[from] serde_json::Error),
}
