//! Insertion of compiled HTML into a host page.
use std::sync::LazyLock;

use quire_commonmark::utils::never_matching_regex;
use regex::{NoExpand, Regex};

/// `<mark-down ...>...</mark-down>`, lazily matched so that several
/// elements in one page are replaced separately.
static MARK_DOWN_ELEMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?is)<mark-down[^>]*>.*?</mark-down>").unwrap_or_else(|e| {
    log::error!("Failed to compile MARK_DOWN_ELEMENT_RE regex: {e}");
    never_matching_regex()
  })
});

static MARK_DOWN_SELF_CLOSING_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?i)<mark-down[^>]*/>").unwrap_or_else(|e| {
    log::error!("Failed to compile MARK_DOWN_SELF_CLOSING_RE regex: {e}");
    never_matching_regex()
  })
});

/// Replace every `<mark-down>` element of `template` with `html`.
///
/// Paired elements are replaced when present; otherwise self-closing
/// `<mark-down/>` elements are. A template with neither is returned
/// unchanged.
#[must_use]
pub fn insert_into_template(template: &str, html: &str) -> String {
  let pattern = if MARK_DOWN_ELEMENT_RE.is_match(template) {
    &*MARK_DOWN_ELEMENT_RE
  } else if MARK_DOWN_SELF_CLOSING_RE.is_match(template) {
    &*MARK_DOWN_SELF_CLOSING_RE
  } else {
    log::warn!("Template has no <mark-down> element, output is the template");
    return template.to_string();
  };

  pattern.replace_all(template, NoExpand(html)).into_owned()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_replaces_paired_element() {
    let template =
      "<main><mark-down src=\"x\">\nplaceholder\n</mark-down></main>";
    assert_eq!(
      insert_into_template(template, "<p>Hi</p>"),
      "<main><p>Hi</p></main>"
    );
  }

  #[test]
  fn test_replaces_every_element_case_insensitively() {
    let template = "<MARK-DOWN></MARK-DOWN><hr><mark-down>b</mark-down>";
    assert_eq!(insert_into_template(template, "X"), "X<hr>X");
  }

  #[test]
  fn test_self_closing_fallback() {
    let template = "<body><mark-down /></body>";
    assert_eq!(insert_into_template(template, "<p>A</p>"), "<body><p>A</p></body>");
  }

  #[test]
  fn test_dollar_signs_are_literal() {
    let template = "<mark-down/>";
    assert_eq!(insert_into_template(template, "$1 and $0"), "$1 and $0");
  }

  #[test]
  fn test_template_without_element() {
    let template = "<p>static</p>";
    assert_eq!(insert_into_template(template, "ignored"), template);
  }
}
