//! The compile pipeline.
//!
//! - [`core`]: `MarkdownProcessor` and its compile modes
//! - [`process`]: Panic-recovering twins of every compile mode
//! - [`types`]: Options and the processor type
pub mod core;
pub mod process;
pub mod types;

pub use core::{WIKILINKS_SEARCH_PREFIX_ATTRIBUTE, collect_markdown_files};

pub use process::{
  ERROR_PLACEHOLDER,
  chapters_with_recovery,
  pages_with_recovery,
  process_with_recovery,
  slides_with_recovery,
};
pub use types::{MarkdownOptions, MarkdownOptionsBuilder, MarkdownProcessor};
