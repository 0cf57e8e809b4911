//! Footnote extraction and per-unit redistribution.
//!
//! Definitions are pulled out of the source once per document. Each display
//! unit (the whole document, a chapter, a slide or a page) then rewrites the
//! references it contains and gets its own footnote list. Identifiers are
//! namespaced by the unit's position so that several units can share one
//! HTML page.
use std::sync::LazyLock;

use html_escape::{encode_double_quoted_attribute, encode_text};
use indexmap::IndexMap;
use log::debug;
use regex::{Captures, Regex};
use serde::Serialize;

use crate::utils::{FenceState, never_matching_regex};

static DEFINITION_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^\[\^([^\]]+)\]:\s*(.+)$").unwrap_or_else(|e| {
    log::error!("Failed to compile DEFINITION_RE regex: {e}");
    never_matching_regex()
  })
});

static REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"\[\^([^\]\s]+)\]").unwrap_or_else(|e| {
    log::error!("Failed to compile REFERENCE_RE regex: {e}");
    never_matching_regex()
  })
});

/// Spans copied verbatim: literal elements, then any other tag with its
/// attributes.
static LITERAL_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?is)<pre\b.*?</pre>|<code\b.*?</code>|<[^>]*>")
    .unwrap_or_else(|e| {
      log::error!("Failed to compile LITERAL_RE regex: {e}");
      never_matching_regex()
    })
});

/// Footnote id to content, in definition order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FootnoteMap(IndexMap<String, String>);

impl FootnoteMap {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  /// Insert a definition. The first definition of an id wins.
  pub fn insert(&mut self, id: impl Into<String>, content: impl Into<String>) {
    let id = id.into();
    if self.0.contains_key(&id) {
      debug!("Ignoring duplicate footnote definition '{id}'");
      return;
    }
    self.0.insert(id, content.into());
  }

  #[must_use]
  pub fn get(&self, id: &str) -> Option<&str> {
    self.0.get(id).map(String::as_str)
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  /// Transform every content string, e.g. to render it as HTML.
  #[must_use]
  pub fn map_contents<F>(self, mut f: F) -> Self
  where
    F: FnMut(&str) -> String,
  {
    Self(self.0.into_iter().map(|(id, c)| (id, f(&c))).collect())
  }
}

fn is_continuation(line: &str) -> bool {
  line.starts_with("    ") || line.starts_with('\t')
}

/// Remove footnote definitions from `markdown`.
///
/// A definition is a line `[^id]: content` outside any fenced block, followed
/// by any number of continuation lines indented by four spaces or a tab.
/// Continuation lines are trimmed and joined to the content with newlines.
#[must_use]
pub fn extract_footnote_definitions(markdown: &str) -> (FootnoteMap, String) {
  let mut map = FootnoteMap::new();
  let mut body: Vec<&str> = Vec::new();
  let mut fence = FenceState::new();
  let mut current: Option<(String, Vec<String>)> = None;

  for line in markdown.lines() {
    if let Some((id, mut parts)) = current.take() {
      if is_continuation(line) && !line.trim().is_empty() {
        parts.push(line.trim().to_string());
        current = Some((id, parts));
        continue;
      }
      map.insert(id, parts.join("\n"));
    }

    if !fence.in_fence() {
      if let Some(caps) = DEFINITION_RE.captures(line) {
        current = Some((caps[1].to_string(), vec![caps[2].trim().to_string()]));
        continue;
      }
    }

    fence = fence.advance(line);
    body.push(line);
  }

  if let Some((id, parts)) = current {
    map.insert(id, parts.join("\n"));
  }

  debug!("Extracted {} footnote definitions", map.len());
  (map, body.join("\n"))
}

/// One display unit after footnote redistribution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FootnotedUnit {
  /// Body with references rewritten to links.
  pub html:              String,
  /// Referenced ids, first-seen order, without duplicates.
  pub footnote_ids_used: Vec<String>,
  /// The unit's footnote list, empty if nothing defined was referenced.
  pub footnote_html:     String,
}

impl FootnotedUnit {
  /// Body followed by the footnote list.
  #[must_use]
  pub fn into_html(self) -> String {
    if self.footnote_html.is_empty() {
      self.html
    } else {
      format!("{}\n{}", self.html.trim_end(), self.footnote_html)
    }
  }
}

fn rewrite_references(
  text: &str,
  unit: usize,
  ids: &mut Vec<String>,
) -> String {
  REFERENCE_RE
    .replace_all(text, |caps: &Captures| {
      let id = &caps[1];
      if !ids.iter().any(|seen| seen == id) {
        ids.push(id.to_string());
      }
      let attr = encode_double_quoted_attribute(id);
      format!(
        "<sup class=\"footnote-ref\"><a href=\"#fn-def-{unit}-{attr}\" \
         id=\"fn-ref-{unit}-{attr}\">[{}]</a></sup>",
        encode_text(id)
      )
    })
    .into_owned()
}

/// Rewrite the footnote references in one unit and build its footnote list.
///
/// `unit` is the zero-based position of the unit and namespaces every id.
/// References inside `<pre>` and `<code>` elements or inside a tag's
/// attributes are left alone. References to undefined ids are rewritten but
/// not listed.
#[must_use]
pub fn apply_footnotes(
  html: &str,
  unit: usize,
  map: &FootnoteMap,
) -> FootnotedUnit {
  let mut ids = Vec::new();
  let mut out = String::with_capacity(html.len());
  let mut last = 0;

  for literal in LITERAL_RE.find_iter(html) {
    let text = &html[last..literal.start()];
    out.push_str(&rewrite_references(text, unit, &mut ids));
    out.push_str(literal.as_str());
    last = literal.end();
  }
  out.push_str(&rewrite_references(&html[last..], unit, &mut ids));

  let mut items = String::new();
  for id in &ids {
    let Some(content) = map.get(id) else {
      debug!("Footnote '{id}' is referenced but never defined");
      continue;
    };
    let attr = encode_double_quoted_attribute(id);
    items.push_str(&format!(
      "<li id=\"fn-def-{unit}-{attr}\">{content} <a href=\"#fn-ref-{unit}-{attr}\" \
       class=\"footnote-backref\">↩</a></li>\n"
    ));
  }

  let footnote_html = if items.is_empty() {
    String::new()
  } else {
    format!("<div class=\"footnotes\"><ol>\n{items}</ol></div>\n")
  };

  FootnotedUnit {
    html: out,
    footnote_ids_used: ids,
    footnote_html,
  }
}
