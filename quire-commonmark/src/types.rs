//! Types for quire-commonmark public API.
use serde::Serialize;

use crate::front_matter::Metadata;
pub use crate::segment::{Page, Pagination, Parity};

/// Result of compiling a whole document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompiledDocument {
  /// Front matter of the document.
  pub metadata: Metadata,

  /// Rendered HTML, followed by the footnote list if any.
  pub html: String,
}

/// One chapter of a chapter-mode compile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Chapter {
  /// First ATX heading of the chapter, or empty.
  pub title: String,
  pub html:  String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompiledChapters {
  pub metadata: Metadata,
  pub chapters: Vec<Chapter>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Slide {
  /// One-based position in the deck.
  pub index:             usize,
  pub html:              String,
  pub footnote_ids_used: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompiledSlides {
  pub metadata: Metadata,
  pub slides:   Vec<Slide>,
}

/// Pages of a document together with its metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompiledPages {
  pub metadata:   Metadata,
  #[serde(flatten)]
  pub pagination: Pagination,
}
