use crate::{Config, ConfigError};

/// Default configuration template in TOML, commented so that a fresh
/// `quire init` explains every field.
pub const DEFAULT_TOML_TEMPLATE: &str = r#"# quire configuration file

# Document title. Used for even page headers when the document has no
# `title` in its front matter.
# title = "My Document"

# Number of threads used when compiling several inputs at once
# (defaults to the number of CPU cores)
# jobs = 4

[markdown]
# GitHub Flavored Markdown: tables, strikethrough, bare URL autolinks and
# task lists
gfm = true

# Render single newlines inside a paragraph as <br>
hard_breaks = true

# Typographic quotes, dashes and ellipses
smart_punctuation = true

# Pass raw HTML through. When false it is escaped
allow_html = true

# Turn [[wikilinks]] into search fragments (#&prefix=target) instead of
# links to target.html
# wikilinks_search_prefix = "search"

[pagination]
# Lines available on one page
lines_per_page = 40

# Characters that fit on one line
chars_per_line = 80

# Extra lines charged after every block element
block_spacing = 1

# Host attributes, substituted for {{key}} placeholders before compiling.
# `title` and `wikilinks-search-prefix` are also read by the compiler.
[attributes]
# author = "Jane Doe"
"#;

/// Get the default configuration template for `format`.
///
/// # Errors
///
/// Returns [`ConfigError::Template`] if `format` is neither `toml` nor
/// `json`.
pub fn get_template(format: &str) -> Result<String, ConfigError> {
  match format.to_lowercase().as_str() {
    "toml" => Ok(DEFAULT_TOML_TEMPLATE.to_string()),
    "json" => Ok(serde_json::to_string_pretty(&Config::default())?),
    other => {
      Err(ConfigError::Template(format!(
        "Unsupported config format: {other}"
      )))
    },
  }
}
