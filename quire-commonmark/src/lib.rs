//! # Quire - an extended Markdown compiler
//!
//! Compiles a Markdown dialect for long-form documents into HTML, and cuts
//! the result into chapters, slides or fixed-capacity pages while keeping
//! footnotes attached to the unit that references them.
//!
//! ## Quick Start
//!
//! ```rust
//! use quire_commonmark::{MarkdownOptions, MarkdownProcessor};
//!
//! let processor = MarkdownProcessor::new(MarkdownOptions::default());
//! let result = processor.render("---\ntitle: Demo\n---\n# $title\n\n:::note\nHello\n:::");
//!
//! assert!(result.html.contains("<h1>Demo</h1>"));
//! assert!(result.html.contains("<aside class=\"note\">"));
//! ```
//!
//! ## Syntax
//!
//! On top of CommonMark (and GFM tables, strikethrough, autolinks and task
//! lists) the compiler understands:
//!
//! - **Front matter** and `$name` placeholders resolved from it
//! - **Host attributes**: `{{key}}` placeholders supplied by the caller
//! - **Asides**: `:::note` ... `:::`
//! - **Figures**: `![[image.png]] alt` followed by a caption line
//! - **Wikilinks**: `[[Page]]`, `[[Page|target]]`, `![[image.png|alt]]`
//! - **Abbreviations**: `*[HTML]: Hyper Text Markup Language`
//! - **Footnotes**: `[^id]` with `[^id]: text` definitions
//! - **Quote attribution**: a `cite:` line ending a blockquote
//! - **Diagrams**: `chart`, `network` and `mermaid` fenced blocks
//!
//! ## Segmentation
//!
//! ```rust
//! use quire_commonmark::{LineMeasure, MarkdownOptions, MarkdownProcessor};
//!
//! let processor = MarkdownProcessor::new(MarkdownOptions::default());
//! let book = "# One\n\nFirst.\n---\n# Two\n\nSecond.";
//!
//! assert_eq!(processor.render_chapters(book).chapters.len(), 2);
//!
//! let pages = processor.paginate(book, &mut LineMeasure::default());
//! assert_eq!(pages.pagination.total_pages, 2);
//! ```
pub mod block;
pub mod diagram;
pub mod front_matter;
pub mod host;
pub mod node;
pub mod passes;
pub mod processor;
pub mod render;
pub mod segment;
mod types;
pub mod utils;
pub mod variables;

pub use crate::{
  front_matter::{FrontMatterError, Metadata},
  processor::{MarkdownOptions, MarkdownOptionsBuilder, MarkdownProcessor},
  segment::{FootnoteMap, LineMeasure, Measure},
  types::{
    Chapter,
    CompiledChapters,
    CompiledDocument,
    CompiledPages,
    CompiledSlides,
    Page,
    Pagination,
    Parity,
    Slide,
  },
};
