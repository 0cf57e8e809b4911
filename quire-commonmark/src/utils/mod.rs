pub mod codeblock;

use regex::Regex;

pub use self::codeblock::FenceState;

/// Extensions accepted by [`is_image_url`] regardless of where the resource
/// lives.
const IMAGE_EXTENSIONS: &[&str] =
  &["jpg", "jpeg", "webp", "png", "gif", "svg", "mp4"];

/// Decide whether a wikilink or figure target should be treated as an image.
///
/// The heuristic is intentionally loose: anything with a known media
/// extension, anything mentioning `placehold` (placeholder services), and any
/// absolute or remote URL counts.
#[must_use]
pub fn is_image_url(url: &str) -> bool {
  let has_extension = url.rsplit_once('.').is_some_and(|(_, ext)| {
    IMAGE_EXTENSIONS
      .iter()
      .any(|known| ext.eq_ignore_ascii_case(known))
  });

  has_extension
    || url.contains("placehold")
    || url.starts_with("http")
    || url.starts_with('/')
}

/// Number of leading spaces on a line, with tabs counted as four columns.
#[must_use]
pub fn indent_width(line: &str) -> usize {
  let mut width = 0;
  for c in line.chars() {
    match c {
      ' ' => width += 1,
      '\t' => width += 4 - (width % 4),
      _ => break,
    }
  }
  width
}

/// Remove up to `width` columns of leading indentation from `line`.
#[must_use]
pub fn strip_indent(line: &str, width: usize) -> &str {
  let mut consumed = 0;
  let mut offset = 0;
  for (idx, c) in line.char_indices() {
    if consumed >= width {
      break;
    }
    match c {
      ' ' => consumed += 1,
      '\t' => consumed += 4 - (consumed % 4),
      _ => break,
    }
    offset = idx + c.len_utf8();
  }
  &line[offset..]
}

/// Text of an ATX heading line (`# Title ##`), or `None` if the line is not
/// one.
#[must_use]
pub fn atx_heading_text(line: &str) -> Option<&str> {
  if indent_width(line) > 3 {
    return None;
  }
  let trimmed = line.trim_start();
  let hashes = trimmed.chars().take_while(|&c| c == '#').count();
  if hashes == 0 || hashes > 6 {
    return None;
  }

  let rest = &trimmed[hashes..];
  if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
    return None;
  }

  let text = rest.trim();
  let without_closing = text.trim_end_matches('#');
  // A closing sequence only counts when separated by whitespace
  let text = if without_closing.is_empty() {
    ""
  } else if without_closing.len() != text.len()
    && without_closing.ends_with([' ', '\t'])
  {
    without_closing.trim_end()
  } else {
    text
  };
  Some(text)
}

/// Create a regex that never matches anything.
///
/// Used as the fallback when a static pattern fails to compile so that the
/// processor degrades instead of panicking.
#[must_use]
#[allow(
  clippy::expect_used,
  reason = "Constant pattern, compiling it cannot fail"
)]
pub fn never_matching_regex() -> Regex {
  Regex::new(r"[^\s\S]").expect("never-matching pattern is valid")
}
