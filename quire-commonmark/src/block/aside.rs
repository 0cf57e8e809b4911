use log::debug;

use super::{BlockRule, BlockState};
use crate::{
  node::{Node, NodeKind},
  utils::{FenceState, indent_width, strip_indent},
};

/// Whether `line` is an aside opening marker.
pub(super) fn opens_aside(line: &str) -> bool {
  indent_width(line) <= 3 && line.trim_start().starts_with(":::")
}

/// `:::` containers rendered as `<aside>`.
///
/// The opening marker is a run of three or more colons, optionally followed
/// by a class name (`:::note`). The block ends at a line holding exactly the
/// same marker, at a non-empty line indented less than the opener, or at the
/// end of input.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsideRule;

impl BlockRule for AsideRule {
  fn name(&self) -> &'static str {
    "aside"
  }

  fn parse(&self, state: &mut BlockState<'_>) -> bool {
    let line = state.current_line();
    if !opens_aside(line) {
      return false;
    }

    let indent = indent_width(line);
    let rest = line.trim_start();
    let marker_len = rest.chars().take_while(|&c| c == ':').count();
    let marker = &rest[..marker_len];
    let class = rest[marker_len..].split_whitespace().next().filter(|word| {
      word
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    });

    let start = state.line;
    let mut next = start + 1;
    let mut fence = FenceState::new();
    let mut closed = false;
    while next < state.lines.len() {
      let candidate = &state.lines[next];
      if !fence.in_fence() {
        if candidate.trim() == marker {
          closed = true;
          break;
        }
        if !candidate.trim().is_empty() && indent_width(candidate) < indent {
          break;
        }
      }
      fence = fence.advance(candidate);
      next += 1;
    }

    if !closed && next == state.lines.len() {
      debug!(
        "Aside opened at line {} has no closing marker, closing at end of input",
        state.document_line(start)
      );
    }

    let content: Vec<String> = state.lines[start + 1..next]
      .iter()
      .map(|l| strip_indent(l, indent).to_owned())
      .collect();
    let inner = state.tokenize_nested(&content, state.document_line(start + 1));

    let mut open = Node::block_open(NodeKind::Aside, "aside")
      .with_markup(marker)
      .with_range(state.document_line(start), state.document_line(next));
    if let Some(class) = class {
      open = open.with_attr("class", class);
    }
    let close = Node::block_close(NodeKind::Aside, "aside").with_markup(marker);

    state.nodes.push(open);
    state.nodes.extend(inner);
    state.nodes.push(close);
    state.line = if closed { next + 1 } else { next };
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

  #[test]
  fn test_explicit_close() {
    let nodes = tokenize(":::\nHello\n:::\nAfter");
    assert!(is_well_formed(&nodes));
    assert!(nodes[0].is_open(NodeKind::Aside));
    assert_eq!(nodes[0].markup, ":::");
    assert_eq!(nodes[0].source_range, Some((0, 2)));
    assert_eq!(nodes[2].children[0].content, "Hello");
    assert!(nodes[4].is_close(NodeKind::Aside));
    assert_eq!(nodes[4].markup, ":::");
    assert_eq!(nodes[6].children[0].content, "After");
  }

  #[test]
  fn test_class_name() {
    let nodes = tokenize(":::note\nHello\n:::");
    assert_eq!(nodes[0].attrs.get("class").map(String::as_str), Some("note"));
    assert_eq!(nodes[0].markup, ":::");
  }

  #[test]
  fn test_auto_close_at_end() {
    let nodes = tokenize("::::\nnever closed\n\nstill inside");
    assert!(is_well_formed(&nodes));
    assert_eq!(nodes[0].source_range, Some((0, 4)));
    assert!(nodes.last().is_some_and(|n| n.is_close(NodeKind::Aside)));
  }

  #[test]
  fn test_implicit_close_on_dedent() {
    let nodes = tokenize("  :::\n  inside\nout");
    assert!(is_well_formed(&nodes));
    let close = nodes
      .iter()
      .position(|n| n.is_close(NodeKind::Aside))
      .unwrap_or_default();
    assert_eq!(nodes[close + 2].children[0].content, "out");
  }

  #[test]
  fn test_longer_marker_nests_shorter() {
    let nodes = tokenize("::::\nouter\n:::\ninner\n:::\n::::");
    assert!(is_well_formed(&nodes));
    let opens = nodes.iter().filter(|n| n.is_open(NodeKind::Aside)).count();
    assert_eq!(opens, 2);
  }

  #[test]
  fn test_marker_inside_fence_does_not_close() {
    let nodes = tokenize(":::\n```\n:::\n```\n:::");
    assert!(is_well_formed(&nodes));
    assert_eq!(nodes.len(), 3);
    assert_eq!(nodes[1].kind, NodeKind::CodeBlock);
    assert_eq!(nodes[1].content, ":::\n");
  }

  #[test]
  fn test_two_colons_is_text() {
    let nodes = tokenize("::\ntext");
    assert!(nodes[0].is_open(NodeKind::Paragraph));
  }
}
