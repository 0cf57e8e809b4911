use std::sync::LazyLock;

use regex::Regex;

use super::{BlockRule, BlockState};
use crate::{
  node::{Node, NodeKind},
  utils::{FenceState, is_image_url, never_matching_regex},
};

static FIGURE_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^!\[\[([^\]]+)\]\](?:[ \t]+(\S.*))?$").unwrap_or_else(|e| {
    log::error!("Failed to compile FIGURE_RE regex: {e}");
    never_matching_regex()
  })
});

/// Captioned figures.
///
/// ```text
/// ![[diagram.png]] optional alt text
/// Caption on the next line
/// ```
///
/// Without alt text the caption doubles as the alt attribute. Targets that do
/// not look like images are left for the inline wikilink pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct FigureRule;

impl BlockRule for FigureRule {
  fn name(&self) -> &'static str {
    "figure"
  }

  fn parse(&self, state: &mut BlockState<'_>) -> bool {
    let line = state.current_line();
    if !line.starts_with("![[") {
      return false;
    }
    let Some(caps) = FIGURE_RE.captures(line.trim_end()) else {
      return false;
    };
    let src = caps[1].trim();
    if !is_image_url(src) {
      return false;
    }

    let Some(caption) = state
      .lines
      .get(state.line + 1)
      .map(|l| l.trim())
      .filter(|l| !l.is_empty() && !FenceState::new().advance(l).in_fence())
    else {
      return false;
    };
    let alt = caps.get(2).map_or(caption, |m| m.as_str().trim());

    let start = state.document_line(state.line);
    state.nodes.extend([
      Node::block_open(NodeKind::Figure, "figure").with_range(start, start + 2),
      Node::leaf(NodeKind::Image, "img")
        .into_block()
        .with_attr("src", src)
        .with_attr("alt", alt),
      Node::block_open(NodeKind::Figcaption, "figcaption"),
      Node::inline(vec![Node::text(caption)]).with_range(start + 1, start + 2),
      Node::block_close(NodeKind::Figcaption, "figcaption"),
      Node::block_close(NodeKind::Figure, "figure"),
    ]);
    state.line += 2;
    true
  }
}

#[cfg(test)]
mod tests {
  use crate::{
    block::BlockTokenizer,
    host::ComrakHost,
    node::{Node, NodeKind, is_well_formed},
  };

  fn tokenize(text: &str) -> Vec<Node> {
    BlockTokenizer::with_default_rules(Box::new(ComrakHost::default()))
      .tokenize(text)
  }

  fn attr<'a>(node: &'a Node, key: &str) -> Option<&'a str> {
    node.attrs.get(key).map(String::as_str)
  }

  #[test]
  fn test_caption_doubles_as_alt() {
    let nodes = tokenize("![[a.png]]\nA caption");
    assert!(is_well_formed(&nodes));
    assert!(nodes[0].is_open(NodeKind::Figure));
    assert_eq!(attr(&nodes[1], "src"), Some("a.png"));
    assert_eq!(attr(&nodes[1], "alt"), Some("A caption"));
    assert_eq!(nodes[3].children[0].content, "A caption");
  }

  #[test]
  fn test_same_line_alt_text() {
    let nodes = tokenize("![[/img/chart.svg]] Sales chart\nQuarterly sales");
    assert_eq!(attr(&nodes[1], "src"), Some("/img/chart.svg"));
    assert_eq!(attr(&nodes[1], "alt"), Some("Sales chart"));
    assert_eq!(nodes[3].children[0].content, "Quarterly sales");
  }

  #[test]
  fn test_non_image_target_is_untouched() {
    let nodes = tokenize("![[Some Page]]\nnext line");
    assert!(nodes[0].is_open(NodeKind::Paragraph));
  }

  #[test]
  fn test_missing_caption_is_untouched() {
    let nodes = tokenize("![[a.png]]\n\nparagraph");
    assert!(nodes[0].is_open(NodeKind::Paragraph));
  }

  #[test]
  fn test_fence_after_image_is_not_a_caption() {
    let nodes = tokenize("![[a.png]]\n```\n# not a heading\n```\nafter");
    assert!(is_well_formed(&nodes));
    assert!(!nodes.iter().any(|n| n.kind == NodeKind::Figure));
    let code = nodes.iter().find(|n| n.kind == NodeKind::CodeBlock);
    assert_eq!(code.map(|n| n.content.as_str()), Some("# not a heading\n"));
    assert!(!nodes.iter().any(|n| n.kind == NodeKind::Heading));
  }

  #[test]
  fn test_inside_fence_is_literal() {
    let nodes = tokenize("```\n![[a.png]]\ncaption\n```");
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].kind, NodeKind::CodeBlock);
  }
}
