use std::sync::LazyLock;

use regex::Regex;

use crate::utils::never_matching_regex;

static SLIDE_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?i)<hr\s*/?>").unwrap_or_else(|e| {
    log::error!("Failed to compile SLIDE_BREAK_RE regex: {e}");
    never_matching_regex()
  })
});

/// Split rendered HTML into slide fragments at thematic breaks.
///
/// Fragments are trimmed and empty ones are dropped.
#[must_use]
pub fn split_slides(html: &str) -> Vec<String> {
  SLIDE_BREAK_RE
    .split(html)
    .map(str::trim)
    .filter(|fragment| !fragment.is_empty())
    .map(str::to_string)
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_split_slides() {
    let slides = split_slides("<h1>A</h1>\n<hr>\n<p>B</p>\n<hr />\n<p>C</p>\n");
    assert_eq!(slides, ["<h1>A</h1>", "<p>B</p>", "<p>C</p>"]);
  }

  #[test]
  fn test_empty_fragments_dropped() {
    assert_eq!(split_slides("<hr>\n<hr/>\n<p>x</p>\n<hr>"), ["<p>x</p>"]);
    assert!(split_slides("  ").is_empty());
  }

  #[test]
  fn test_split_is_idempotent() {
    let once = split_slides("<p>a</p><hr><p>b</p>");
    let twice: Vec<String> =
      once.iter().flat_map(|s| split_slides(s)).collect();
    assert_eq!(once, twice);
  }
}
