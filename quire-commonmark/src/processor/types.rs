//! Type definitions for the Markdown processor.
//!
//! # Examples
//!
//! ```
//! use quire_commonmark::{MarkdownOptions, MarkdownProcessor};
//!
//! let options = MarkdownOptions {
//!   hard_breaks: false,
//!   ..Default::default()
//! };
//!
//! let processor = MarkdownProcessor::new(options);
//! ```
use std::sync::Arc;

use crate::{block::BlockTokenizer, render::Renderer};

/// Options for configuring the Markdown processor.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(
  clippy::struct_excessive_bools,
  reason = "Config struct with related boolean flags"
)]
pub struct MarkdownOptions {
  /// Enable GitHub Flavored Markdown: tables, strikethrough, bare URL
  /// autolinks and task lists.
  pub gfm: bool,

  /// Render soft line breaks as `<br>`.
  pub hard_breaks: bool,

  /// Replace straight quotes, dashes and ellipses with typographic ones.
  pub smart_punctuation: bool,

  /// Pass raw HTML through. When `false` it is escaped.
  pub allow_html: bool,

  /// Optional: Turn wikilinks into search fragments (`#&prefix=target`)
  /// instead of `.html` links. When `None`, the `wikilinks-search-prefix`
  /// host attribute is consulted.
  pub wikilinks_search_prefix: Option<String>,
}

impl Default for MarkdownOptions {
  fn default() -> Self {
    Self {
      gfm:                     true,
      hard_breaks:             true,
      smart_punctuation:       true,
      allow_html:              true,
      wikilinks_search_prefix: None,
    }
  }
}

/// Main Markdown processor.
///
/// Can be cheaply cloned since the tokenizer and renderer are shared.
#[derive(Clone)]
pub struct MarkdownProcessor {
  pub(crate) options:   MarkdownOptions,
  pub(crate) tokenizer: Arc<BlockTokenizer>,
  pub(crate) renderer:  Arc<Renderer>,
}

/// Builder for constructing `MarkdownOptions` with method chaining.
#[derive(Debug, Clone)]
pub struct MarkdownOptionsBuilder {
  options: MarkdownOptions,
}

impl MarkdownOptionsBuilder {
  /// Create a new builder with default options.
  #[must_use]
  pub fn new() -> Self {
    Self {
      options: MarkdownOptions::default(),
    }
  }

  /// Enable or disable GitHub Flavored Markdown.
  #[must_use]
  pub const fn gfm(mut self, enabled: bool) -> Self {
    self.options.gfm = enabled;
    self
  }

  /// Enable or disable `<br>` for soft line breaks.
  #[must_use]
  pub const fn hard_breaks(mut self, enabled: bool) -> Self {
    self.options.hard_breaks = enabled;
    self
  }

  /// Enable or disable typographic punctuation.
  #[must_use]
  pub const fn smart_punctuation(mut self, enabled: bool) -> Self {
    self.options.smart_punctuation = enabled;
    self
  }

  /// Enable or disable raw HTML passthrough.
  #[must_use]
  pub const fn allow_html(mut self, enabled: bool) -> Self {
    self.options.allow_html = enabled;
    self
  }

  /// Set the wikilink search prefix.
  #[must_use]
  pub fn wikilinks_search_prefix<S: Into<String>>(
    mut self,
    prefix: Option<S>,
  ) -> Self {
    self.options.wikilinks_search_prefix = prefix.map(Into::into);
    self
  }

  /// Build the final `MarkdownOptions`.
  #[must_use]
  pub fn build(self) -> MarkdownOptions {
    self.options
  }
}

impl Default for MarkdownOptionsBuilder {
  fn default() -> Self {
    Self::new()
  }
}
