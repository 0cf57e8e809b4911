pub mod config;
pub mod error;
pub mod templates;

pub use config::{Config, MarkdownConfig, PaginationConfig};
pub use error::ConfigError;
