use std::{
  fs,
  path::{Path, PathBuf},
  str::FromStr,
  sync::OnceLock,
};

use indexmap::IndexMap;
use quire_commonmark::{LineMeasure, MarkdownOptions};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Config file names looked up, in order, relative to a directory.
const CONFIG_FILENAMES: [&str; 6] = [
  "quire.toml",
  "quire.json",
  ".quire.toml",
  ".quire.json",
  ".config/quire.toml",
  ".config/quire.json",
];

/// Configuration for the quire compiler.
///
/// [`Config`] controls how documents are compiled and segmented. Fields are
/// typically loaded from a TOML or JSON config file and adjusted with
/// `--config KEY=VALUE` overrides on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Document title, used when the front matter has none.
  pub title: Option<String>,

  /// Number of threads for compiling several inputs.
  pub jobs: Option<usize>,

  /// Markdown compiler options.
  pub markdown: MarkdownConfig,

  /// Page capacity used by the line-count measure.
  pub pagination: PaginationConfig,

  /// Host attributes, substituted for `{{key}}` placeholders.
  pub attributes: IndexMap<String, String>,
}

/// Markdown compiler options, mirrors [`MarkdownOptions`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(
  clippy::struct_excessive_bools,
  reason = "Config struct with related boolean flags"
)]
pub struct MarkdownConfig {
  pub gfm:                     bool,
  pub hard_breaks:             bool,
  pub smart_punctuation:       bool,
  pub allow_html:              bool,
  pub wikilinks_search_prefix: Option<String>,
}

impl Default for MarkdownConfig {
  fn default() -> Self {
    let options = MarkdownOptions::default();
    Self {
      gfm:                     options.gfm,
      hard_breaks:             options.hard_breaks,
      smart_punctuation:       options.smart_punctuation,
      allow_html:              options.allow_html,
      wikilinks_search_prefix: options.wikilinks_search_prefix,
    }
  }
}

/// Page geometry for [`LineMeasure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
  pub lines_per_page: u32,
  pub chars_per_line: u32,
  pub block_spacing:  u32,
}

impl Default for PaginationConfig {
  fn default() -> Self {
    let measure = LineMeasure::default();
    Self {
      lines_per_page: measure.lines_per_page,
      chars_per_line: measure.chars_per_line,
      block_spacing:  measure.block_spacing,
    }
  }
}

impl Default for Config {
  fn default() -> Self {
    Self {
      title:      None,
      jobs:       None,
      markdown:   MarkdownConfig::default(),
      pagination: PaginationConfig::default(),
      attributes: IndexMap::new(),
    }
  }
}

impl Config {
  /// Load configuration from a file (TOML or JSON).
  ///
  /// # Errors
  ///
  /// Returns an error if the file cannot be read or parsed, or if the format is
  /// unsupported.
  pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
      ConfigError::Config(format!(
        "Failed to read config file: {}: {}",
        path.display(),
        e
      ))
    })?;

    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
      return Err(ConfigError::Config(format!(
        "Config file has no extension: {}",
        path.display()
      )));
    };

    match ext.to_lowercase().as_str() {
      "json" => {
        serde_json::from_str(&content).map_err(|e| {
          ConfigError::Config(format!(
            "Failed to parse JSON config from {}: {}",
            path.display(),
            e
          ))
        })
      },
      "toml" => {
        toml::from_str(&content).map_err(|e| {
          ConfigError::Config(format!(
            "Failed to parse TOML config from {}: {}",
            path.display(),
            e
          ))
        })
      },
      _ => {
        Err(ConfigError::Config(format!(
          "Unsupported config file format: {}",
          path.display()
        )))
      },
    }
  }

  /// Load configuration from config files and `KEY=VALUE` overrides.
  ///
  /// Explicit `config_files` are loaded and merged in order. Without any, a
  /// config file is looked up with [`Config::find_config_file`]; failing that
  /// the defaults are used. Overrides are applied last.
  ///
  /// # Errors
  ///
  /// Returns an error if a config file cannot be loaded, an override is
  /// malformed, or the resulting configuration is invalid.
  pub fn load(
    config_files: &[PathBuf],
    config_overrides: &[String],
  ) -> Result<Self, ConfigError> {
    let mut files = config_files.iter();
    let mut config = if let Some(first) = files.next() {
      let mut merged_config = Self::from_file(first)?;
      for config_path in files {
        merged_config.merge(Self::from_file(config_path)?);
      }

      if config_files.len() > 1 {
        log::info!("Loaded and merged {} config files", config_files.len());
      }

      merged_config
    } else if let Some(discovered_config) = Self::find_config_file() {
      log::info!(
        "Using discovered config file: {}",
        discovered_config.display()
      );
      Self::from_file(&discovered_config).map_err(|e| {
        ConfigError::Config(format!(
          "Failed to load discovered config from {}: {}",
          discovered_config.display(),
          e
        ))
      })?
    } else {
      Self::default()
    };

    if !config_overrides.is_empty() {
      config.apply_overrides(config_overrides)?;
    }

    config.validate()?;
    Ok(config)
  }

  /// Apply configuration overrides from KEY=VALUE strings.
  ///
  /// Nested keys use dots: `markdown.gfm=false`, `pagination.lines_per_page=30`
  /// or `attributes.author=Jane`.
  ///
  /// # Errors
  ///
  /// Returns an error if:
  ///
  /// - An override string is not in KEY=VALUE format
  /// - A key is not recognized
  /// - A value cannot be parsed as the expected type
  pub fn apply_overrides(
    &mut self,
    overrides: &[String],
  ) -> Result<(), ConfigError> {
    for override_str in overrides {
      let (key, value) = override_str.split_once('=').ok_or_else(|| {
        ConfigError::Config(format!(
          "Invalid config override format: '{override_str}'. Expected \
           KEY=VALUE"
        ))
      })?;

      self.apply_override(key.trim(), value.trim())?;
    }

    Ok(())
  }

  /// Apply a single override. An empty value clears optional fields and
  /// removes attributes.
  ///
  /// # Errors
  ///
  /// Returns an error for unknown keys and unparsable values.
  pub fn apply_override(
    &mut self,
    key: &str,
    value: &str,
  ) -> Result<(), ConfigError> {
    if let Some(name) = key.strip_prefix("attributes.") {
      if name.is_empty() {
        return Err(ConfigError::Config(
          "Attribute override needs a name: 'attributes.NAME=VALUE'"
            .to_string(),
        ));
      }
      if value.is_empty() {
        self.attributes.shift_remove(name);
      } else {
        self.attributes.insert(name.to_string(), value.to_string());
      }
      return Ok(());
    }

    match key {
      "title" => self.title = optional_string(value),
      "jobs" => {
        self.jobs = if value.is_empty() {
          None
        } else {
          Some(parse_positive(key, value)?)
        };
      },
      "markdown.gfm" => self.markdown.gfm = parse_bool(key, value)?,
      "markdown.hard_breaks" => {
        self.markdown.hard_breaks = parse_bool(key, value)?;
      },
      "markdown.smart_punctuation" => {
        self.markdown.smart_punctuation = parse_bool(key, value)?;
      },
      "markdown.allow_html" => {
        self.markdown.allow_html = parse_bool(key, value)?;
      },
      "markdown.wikilinks_search_prefix" => {
        self.markdown.wikilinks_search_prefix = optional_string(value);
      },
      "pagination.lines_per_page" => {
        self.pagination.lines_per_page = parse_positive(key, value)?;
      },
      "pagination.chars_per_line" => {
        self.pagination.chars_per_line = parse_positive(key, value)?;
      },
      "pagination.block_spacing" => {
        self.pagination.block_spacing = parse_value(key, value)?;
      },
      _ => return Err(ConfigError::UnknownKey(key.to_string())),
    }

    Ok(())
  }

  /// Merge another config into this one, with the other config's values taking
  /// precedence.
  ///
  /// # Merge Rules
  ///
  /// - [`Option<T>`] fields: Other's [`Some`] value replaces this config's
  ///   value
  /// - Plain fields (bool, integers): Other's value always replaces
  /// - `attributes`: Other's entries are merged in (can override individual
  ///   keys)
  pub fn merge(&mut self, other: Self) {
    if other.title.is_some() {
      self.title = other.title;
    }
    if other.jobs.is_some() {
      self.jobs = other.jobs;
    }

    let MarkdownConfig {
      gfm,
      hard_breaks,
      smart_punctuation,
      allow_html,
      wikilinks_search_prefix,
    } = other.markdown;
    self.markdown.gfm = gfm;
    self.markdown.hard_breaks = hard_breaks;
    self.markdown.smart_punctuation = smart_punctuation;
    self.markdown.allow_html = allow_html;
    if wikilinks_search_prefix.is_some() {
      self.markdown.wikilinks_search_prefix = wikilinks_search_prefix;
    }

    self.pagination = other.pagination;
    self.attributes.extend(other.attributes);
  }

  /// Check values that deserialization alone cannot rule out.
  ///
  /// # Errors
  ///
  /// Returns an error listing every invalid field.
  pub fn validate(&self) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if self.jobs == Some(0) {
      errors.push("jobs must be at least 1".to_string());
    }
    if self.pagination.lines_per_page == 0 {
      errors.push("pagination.lines_per_page must be at least 1".to_string());
    }
    if self.pagination.chars_per_line == 0 {
      errors.push("pagination.chars_per_line must be at least 1".to_string());
    }

    if errors.is_empty() {
      Ok(())
    } else {
      Err(ConfigError::Invalid(errors))
    }
  }

  /// Search for config files in common locations
  #[must_use]
  pub fn find_config_file() -> Option<PathBuf> {
    static RESULT: OnceLock<Option<PathBuf>> = OnceLock::new();
    RESULT
      .get_or_init(|| {
        if let Some(found) = std::env::current_dir()
          .ok()
          .and_then(|dir| Self::find_config_file_in(&dir))
        {
          return Some(found);
        }

        if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
          let xdg_config_dir = PathBuf::from(xdg_config_home);
          for filename in &["quire.toml", "quire.json"] {
            let config_path = xdg_config_dir.join(filename);
            if config_path.exists() {
              return Some(config_path);
            }
          }
        }

        if let Ok(home) = std::env::var("HOME") {
          let home_config_dir =
            PathBuf::from(home).join(".config").join("quire");
          for filename in &["config.toml", "config.json"] {
            let config_path = home_config_dir.join(filename);
            if config_path.exists() {
              return Some(config_path);
            }
          }
        }

        None
      })
      .clone()
  }

  /// First known config file name present in `dir`.
  #[must_use]
  pub fn find_config_file_in(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILENAMES
      .iter()
      .map(|filename| dir.join(filename))
      .find(|path| path.is_file())
  }

  /// Generate a default configuration file with commented explanations
  ///
  /// # Errors
  ///
  /// Returns an error if the format is unsupported or the file cannot be
  /// written.
  pub fn generate_default_config(
    format: &str,
    path: &Path,
  ) -> Result<(), ConfigError> {
    let config_content = crate::templates::get_template(format)?;

    fs::write(path, config_content).map_err(|e| {
      ConfigError::Config(format!(
        "Failed to write default config to {}: {}",
        path.display(),
        e
      ))
    })?;

    log::info!("Created default configuration file: {}", path.display());
    Ok(())
  }

  /// Options for [`quire_commonmark::MarkdownProcessor`].
  #[must_use]
  pub fn markdown_options(&self) -> MarkdownOptions {
    MarkdownOptions {
      gfm:                     self.markdown.gfm,
      hard_breaks:             self.markdown.hard_breaks,
      smart_punctuation:       self.markdown.smart_punctuation,
      allow_html:              self.markdown.allow_html,
      wikilinks_search_prefix: self.markdown.wikilinks_search_prefix.clone(),
    }
  }

  #[must_use]
  pub const fn line_measure(&self) -> LineMeasure {
    LineMeasure::new(
      self.pagination.lines_per_page,
      self.pagination.chars_per_line,
      self.pagination.block_spacing,
    )
  }

  /// Host attributes handed to the compiler.
  ///
  /// The configured `title` is added as the `title` attribute unless the
  /// attributes already carry one.
  #[must_use]
  pub fn host_attributes(&self) -> IndexMap<String, String> {
    let mut attributes = self.attributes.clone();
    if let Some(ref title) = self.title
      && !attributes.contains_key("title")
    {
      attributes.insert("title".to_string(), title.clone());
    }
    attributes
  }
}

fn optional_string(value: &str) -> Option<String> {
  if value.is_empty() {
    None
  } else {
    Some(value.to_string())
  }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
  match value.to_lowercase().as_str() {
    "true" | "yes" | "1" => Ok(true),
    "false" | "no" | "0" => Ok(false),
    _ => {
      Err(ConfigError::Config(format!(
        "Invalid boolean value for '{key}': '{value}'. Expected true/false, \
         yes/no, or 1/0"
      )))
    },
  }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  value.parse().map_err(|e| {
    ConfigError::Config(format!("Invalid value for '{key}': '{value}' - {e}"))
  })
}

fn parse_positive<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
  T: FromStr + Default + PartialEq,
{
  match value.parse::<T>() {
    Ok(parsed) if parsed != T::default() => Ok(parsed),
    _ => {
      Err(ConfigError::Config(format!(
        "Invalid value for '{key}': '{value}'. Expected a positive integer"
      )))
    },
  }
}
