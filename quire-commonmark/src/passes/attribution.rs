use crate::node::{Node, NodeKind, matching_close};

const MARKER: &str = "cite:";

/// Split the attribution line off a blockquote's final paragraph.
///
/// Returns the attribution's inline nodes and whether the paragraph is left
/// empty.
fn take_attribution(children: &mut Vec<Node>) -> Option<(Vec<Node>, bool)> {
  let line_start = children
    .iter()
    .rposition(|n| matches!(n.kind, NodeKind::SoftBreak | NodeKind::HardBreak))
    .map_or(0, |idx| idx + 1);

  let first = children.get(line_start)?;
  if first.kind != NodeKind::Text || !first.content.trim_start().starts_with(MARKER)
  {
    return None;
  }

  let mut attribution = children.split_off(line_start);
  if line_start > 0 {
    // Drop the line break that preceded the attribution
    children.pop();
  }

  let text = attribution[0].content.trim_start();
  let text = text[MARKER.len()..].trim_start().to_string();
  if text.is_empty() {
    attribution.remove(0);
  } else {
    attribution[0].content = text;
  }

  Some((attribution, children.is_empty()))
}

/// Wrap blockquotes ending in a `cite:` line in a figure with a caption.
///
/// ```text
/// > Simplicity is prerequisite for reliability.
/// > cite: Edsger Dijkstra
/// ```
pub fn apply_attribution(nodes: &mut Vec<Node>) {
  let mut idx = 0;
  while idx < nodes.len() {
    if !nodes[idx].is_open(NodeKind::BlockQuote) {
      idx += 1;
      continue;
    }
    let Some(close) = matching_close(nodes, idx) else {
      idx += 1;
      continue;
    };

    let has_last_paragraph = close >= idx + 4
      && nodes[close - 1].is_close(NodeKind::Paragraph)
      && nodes[close - 2].kind == NodeKind::Inline
      && nodes[close - 3].is_open(NodeKind::Paragraph);
    let taken = if has_last_paragraph {
      take_attribution(&mut nodes[close - 2].children)
    } else {
      None
    };
    let Some((attribution, emptied)) = taken else {
      idx += 1;
      continue;
    };

    if emptied {
      for node in &mut nodes[close - 3..close] {
        node.hidden = true;
      }
    }

    let range = nodes[idx].source_range;
    let mut figure = Node::block_open(NodeKind::Figure, "figure")
      .with_attr("class", "quote");
    figure.source_range = range;

    nodes.splice(close + 1..close + 1, [
      Node::block_open(NodeKind::Figcaption, "figcaption")
        .with_attr("class", "attribution"),
      Node::inline(attribution),
      Node::block_close(NodeKind::Figcaption, "figcaption"),
      Node::block_close(NodeKind::Figure, "figure"),
    ]);
    nodes.insert(idx, figure);

    // Step past the opening figure and blockquote; nested quotes are still
    // visited on the way through
    idx += 2;
  }
}
