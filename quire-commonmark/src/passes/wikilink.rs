use std::sync::LazyLock;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::{Captures, Regex};

use super::InlinePass;
use crate::{
  node::{Nesting, Node, NodeKind},
  utils::{is_image_url, never_matching_regex},
};

static WIKILINK_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(
    r"!\[\[([^|\]]+)(?:\|([^\]]+))?\]\]|\[\[([^|\]]+)(?:\|([^\]]+))?\]\]",
  )
  .unwrap_or_else(|e| {
    log::error!("Failed to compile WIKILINK_RE regex: {e}");
    never_matching_regex()
  })
});

/// Characters left unescaped by JavaScript's `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
  .remove(b'-')
  .remove(b'_')
  .remove(b'.')
  .remove(b'!')
  .remove(b'~')
  .remove(b'*')
  .remove(b'\'')
  .remove(b'(')
  .remove(b')');

/// Resolves `[[Page]]`, `[[Page|target]]` and `![[image.png|alt]]`.
///
/// Links display the page name and point at the alias when one is given.
/// With a search prefix the destination becomes a search fragment instead of
/// a `.html` path.
#[derive(Debug, Clone, Default)]
pub struct WikilinkPass {
  search_prefix: Option<String>,
}

impl WikilinkPass {
  #[must_use]
  pub fn new(search_prefix: Option<String>) -> Self {
    Self {
      search_prefix: search_prefix.filter(|p| !p.is_empty()),
    }
  }

  #[must_use]
  pub fn href(&self, target: &str) -> String {
    match &self.search_prefix {
      Some(prefix) => {
        format!("#&{prefix}={}", utf8_percent_encode(target, URI_COMPONENT))
      },
      None => format!("{target}.html"),
    }
  }

  fn resolve(&self, caps: &Captures, out: &mut Vec<Node>) {
    let image = caps.get(1).is_some();
    let (title, alias) = if image {
      (&caps[1], caps.get(2).map(|m| m.as_str()))
    } else {
      (&caps[3], caps.get(4).map(|m| m.as_str()))
    };

    if image && is_image_url(title) {
      out.push(
        Node::leaf(NodeKind::Image, "img")
          .with_attr("src", title)
          .with_attr("alt", alias.unwrap_or_default()),
      );
      return;
    }

    let target = alias.unwrap_or(title);
    out.push(Node::open(NodeKind::Link, "a").with_attr("href", self.href(target)));
    out.push(Node::text(title));
    out.push(Node::close(NodeKind::Link, "a"));
  }
}

impl InlinePass for WikilinkPass {
  fn name(&self) -> &'static str {
    "wikilink"
  }

  fn rewrite(&self, children: &mut Vec<Node>) {
    if !children
      .iter()
      .any(|c| c.kind == NodeKind::Text && c.content.contains("[["))
    {
      return;
    }

    let mut out = Vec::with_capacity(children.len());
    let mut inside_link = 0usize;
    for child in children.drain(..) {
      match (child.kind, child.nesting) {
        (NodeKind::Link, Nesting::Open) => inside_link += 1,
        (NodeKind::Link, Nesting::Close) => {
          inside_link = inside_link.saturating_sub(1);
        },
        _ => {},
      }

      if child.kind != NodeKind::Text || inside_link > 0 {
        out.push(child);
        continue;
      }

      let text = child.content.as_str();
      let mut last = 0;
      for caps in WIKILINK_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
          continue;
        };
        if whole.start() > last {
          out.push(Node::text(&text[last..whole.start()]));
        }
        self.resolve(&caps, &mut out);
        last = whole.end();
      }
      if last < text.len() {
        out.push(Node::text(&text[last..]));
      }
    }
    *children = out;
  }
}
