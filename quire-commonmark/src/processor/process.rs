//! Compile entry points that survive a panicking stage.
//!
//! Each compile mode has a recovering twin. When any stage panics the error
//! is logged and the caller gets a result of the same shape holding
//! [`ERROR_PLACEHOLDER`] as its only unit, so a batch run keeps going.
use std::panic::{AssertUnwindSafe, catch_unwind};

use indexmap::IndexMap;
use log::error;

use super::types::MarkdownProcessor;
use crate::{
  front_matter::Metadata,
  segment::{Measure, Page, Pagination, Parity},
  types::{
    Chapter,
    CompiledChapters,
    CompiledDocument,
    CompiledPages,
    CompiledSlides,
    Slide,
  },
};

/// HTML returned in place of a document whose compile panicked.
pub const ERROR_PLACEHOLDER: &str =
  "<div class=\"error\">Critical error processing markdown content</div>";

/// Run `compile`, falling back to `fallback()` if it panics.
fn recover<T>(
  mode: &str,
  compile: impl FnOnce() -> T,
  fallback: impl FnOnce() -> T,
) -> T {
  match catch_unwind(AssertUnwindSafe(compile)) {
    Ok(result) => result,
    Err(panic) => {
      let message = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
      error!("Panic during {mode} compile: {message}");
      fallback()
    },
  }
}

/// Compile a whole document, or the placeholder if any stage panics.
#[must_use]
pub fn process_with_recovery(
  processor: &MarkdownProcessor,
  content: &str,
  attributes: &IndexMap<String, String>,
) -> CompiledDocument {
  recover(
    "document",
    || processor.render_with(content, attributes),
    || {
      CompiledDocument {
        metadata: Metadata::new(),
        html:     ERROR_PLACEHOLDER.to_string(),
      }
    },
  )
}

/// Chapter-mode compile with the same recovery.
#[must_use]
pub fn chapters_with_recovery(
  processor: &MarkdownProcessor,
  content: &str,
  attributes: &IndexMap<String, String>,
) -> CompiledChapters {
  recover(
    "chapter",
    || processor.render_chapters_with(content, attributes),
    || {
      CompiledChapters {
        metadata: Metadata::new(),
        chapters: vec![Chapter {
          title: String::new(),
          html:  ERROR_PLACEHOLDER.to_string(),
        }],
      }
    },
  )
}

#[must_use]
pub fn slides_with_recovery(
  processor: &MarkdownProcessor,
  content: &str,
  attributes: &IndexMap<String, String>,
) -> CompiledSlides {
  recover(
    "slide",
    || processor.render_slides_with(content, attributes),
    || {
      CompiledSlides {
        metadata: Metadata::new(),
        slides:   vec![Slide {
          index:             1,
          html:              ERROR_PLACEHOLDER.to_string(),
          footnote_ids_used: Vec::new(),
        }],
      }
    },
  )
}

/// Paginate, falling back to a single odd page holding the placeholder.
#[must_use]
pub fn pages_with_recovery(
  processor: &MarkdownProcessor,
  content: &str,
  attributes: &IndexMap<String, String>,
  measure: &mut dyn Measure,
) -> CompiledPages {
  recover(
    "page",
    || processor.paginate_with(content, attributes, measure),
    || {
      CompiledPages {
        metadata:   Metadata::new(),
        pagination: Pagination {
          pages:       vec![Page {
            index:             1,
            parity:            Parity::Odd,
            header_text:       String::new(),
            chapter:           0,
            body:              ERROR_PLACEHOLDER.to_string(),
            footnote_ids_used: Vec::new(),
            footnote_html:     String::new(),
          }],
          total_pages: 1,
        },
      }
    },
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{processor::types::MarkdownOptions, segment::LineMeasure};

  fn processor() -> MarkdownProcessor {
    MarkdownProcessor::new(MarkdownOptions::default())
  }

  #[test]
  #[allow(clippy::panic, reason = "Exercises the unwind path")]
  fn test_recover_falls_back_on_panic() {
    let value = recover("test", || panic!("stage failed"), || 7);
    assert_eq!(value, 7);

    let owned = recover("test", || panic!("{}", String::from("owned")), || 8);
    assert_eq!(owned, 8);

    assert_eq!(recover("test", || 1, || 2), 1);
  }

  #[test]
  fn test_process_with_recovery_attributes() {
    let mut attributes = IndexMap::new();
    attributes.insert("who".to_string(), "World".to_string());

    let result =
      process_with_recovery(&processor(), "Hello {{who}}", &attributes);
    assert!(result.html.contains("Hello World"));
  }

  #[test]
  fn test_segment_modes_compile_normally() {
    let attributes = IndexMap::new();
    let source = "# One\n\nText[^1]\n---\n# Two\n\n[^1]: Note";

    let chapters = chapters_with_recovery(&processor(), source, &attributes);
    assert_eq!(chapters.chapters.len(), 2);
    assert_eq!(chapters.chapters[1].title, "Two");

    let slides =
      slides_with_recovery(&processor(), "A\n\n***\n\nB", &attributes);
    assert_eq!(slides.slides.len(), 2);
    assert!(!slides.slides[0].html.contains(ERROR_PLACEHOLDER));

    let mut measure = LineMeasure::default();
    let pages =
      pages_with_recovery(&processor(), source, &attributes, &mut measure);
    assert_eq!(pages.pagination.total_pages, 2);
    assert_eq!(pages.pagination.pages[0].header_text, "One");
  }
}
