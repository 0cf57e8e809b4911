use std::io;

use quire_config::ConfigError;
use thiserror::Error;

/// Top-level error type for the quire crate.
#[derive(Debug, Error)]
pub enum QuireError {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error("Input error: {0}")]
  Input(String),

  #[error("Template error: {0}")]
  Template(String),

  #[error("I/O error: {0}")]
  Io(#[from] io::Error),

  #[error("Serde error: {0}")]
  Serde(#[from] serde_json::Error),

  #[error("Thread pool error: {0}")]
  ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
