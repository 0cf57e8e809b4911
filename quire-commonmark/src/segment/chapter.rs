use serde::Serialize;

use crate::utils::{FenceState, atx_heading_text};

/// Markdown source of one chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterSource {
  /// Text of the first ATX heading outside a fence, or empty.
  pub title:    String,
  pub markdown: String,
}

/// Text of the first ATX heading in `markdown` that is not inside a fenced
/// code block.
#[must_use]
pub fn chapter_title(markdown: &str) -> String {
  let mut fence = FenceState::new();
  for line in markdown.lines() {
    if !fence.in_fence() {
      if let Some(text) = atx_heading_text(line) {
        return text.to_string();
      }
    }
    fence = fence.advance(line);
  }
  String::new()
}

/// Split a document body into chapters at `---` lines outside fences.
///
/// Chapters that contain only whitespace are dropped. Joining the result with
/// `\n---\n` reproduces the input when every chapter is non-empty.
#[must_use]
pub fn split_chapters(text: &str) -> Vec<ChapterSource> {
  let mut chunks: Vec<Vec<&str>> = vec![Vec::new()];
  let mut fence = FenceState::new();

  for line in text.lines() {
    if !fence.in_fence() && line == "---" {
      chunks.push(Vec::new());
      continue;
    }
    fence = fence.advance(line);
    if let Some(chunk) = chunks.last_mut() {
      chunk.push(line);
    }
  }

  chunks
    .into_iter()
    .map(|lines| lines.join("\n"))
    .filter(|markdown| !markdown.trim().is_empty())
    .map(|markdown| {
      ChapterSource {
        title: chapter_title(&markdown),
        markdown,
      }
    })
    .collect()
}
