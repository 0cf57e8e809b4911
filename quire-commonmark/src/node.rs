//! The flat node stream every compile stage reads and rewrites.
//!
//! Block structure is expressed with paired open/close nodes in one ordered
//! sequence. Inline content lives in the `children` of [`NodeKind::Inline`]
//! nodes, which use the same open/close convention.
use indexmap::IndexMap;

/// What a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
  // Block containers
  Paragraph,
  Heading,
  BlockQuote,
  BulletList,
  OrderedList,
  ListItem,
  Table,
  TableHead,
  TableBody,
  TableRow,
  TableHeaderCell,
  TableCell,
  Aside,
  Figure,
  Figcaption,

  // Block leaves
  CodeBlock,
  HtmlBlock,
  ThematicBreak,

  /// Container for inline children of a paragraph, heading, cell or caption.
  Inline,

  // Inline
  Text,
  SoftBreak,
  HardBreak,
  CodeInline,
  HtmlInline,
  Emphasis,
  Strong,
  Strikethrough,
  Link,
  Image,
  Abbreviation,
  Checkbox,
}

/// Nesting delta of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nesting {
  Open,
  Close,
  SelfContained,
}

impl Nesting {
  #[must_use]
  pub const fn delta(self) -> i32 {
    match self {
      Self::Open => 1,
      Self::Close => -1,
      Self::SelfContained => 0,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
  pub kind:         NodeKind,
  pub tag:          &'static str,
  pub nesting:      Nesting,
  /// Raw text for leaves (text, code, html).
  pub content:      String,
  /// Inline children, only populated on [`NodeKind::Inline`] nodes.
  pub children:     Vec<Self>,
  pub attrs:        IndexMap<String, String>,
  pub markup:       String,
  /// Fence info string for code blocks.
  pub info:         String,
  /// Zero-based `[start, end)` source lines.
  pub source_range: Option<(usize, usize)>,
  /// Hidden nodes are skipped by the renderer (their children are not).
  pub hidden:       bool,
  pub block:        bool,
}

impl Node {
  fn new(kind: NodeKind, tag: &'static str, nesting: Nesting) -> Self {
    Self {
      kind,
      tag,
      nesting,
      content: String::new(),
      children: Vec::new(),
      attrs: IndexMap::new(),
      markup: String::new(),
      info: String::new(),
      source_range: None,
      hidden: false,
      block: false,
    }
  }

  #[must_use]
  pub fn open(kind: NodeKind, tag: &'static str) -> Self {
    Self::new(kind, tag, Nesting::Open)
  }

  #[must_use]
  pub fn close(kind: NodeKind, tag: &'static str) -> Self {
    Self::new(kind, tag, Nesting::Close)
  }

  #[must_use]
  pub fn leaf(kind: NodeKind, tag: &'static str) -> Self {
    Self::new(kind, tag, Nesting::SelfContained)
  }

  /// Block-level open node.
  #[must_use]
  pub fn block_open(kind: NodeKind, tag: &'static str) -> Self {
    Self::open(kind, tag).into_block()
  }

  /// Block-level close node.
  #[must_use]
  pub fn block_close(kind: NodeKind, tag: &'static str) -> Self {
    Self::close(kind, tag).into_block()
  }

  /// An inline container holding `children`.
  #[must_use]
  pub fn inline(children: Vec<Self>) -> Self {
    let mut node = Self::leaf(NodeKind::Inline, "").into_block();
    node.children = children;
    node
  }

  #[must_use]
  pub fn text(content: impl Into<String>) -> Self {
    let mut node = Self::leaf(NodeKind::Text, "");
    node.content = content.into();
    node
  }

  #[must_use]
  pub const fn into_block(mut self) -> Self {
    self.block = true;
    self
  }

  #[must_use]
  pub fn with_attr(
    mut self,
    key: impl Into<String>,
    value: impl Into<String>,
  ) -> Self {
    self.attrs.insert(key.into(), value.into());
    self
  }

  #[must_use]
  pub fn with_markup(mut self, markup: impl Into<String>) -> Self {
    self.markup = markup.into();
    self
  }

  #[must_use]
  pub fn with_content(mut self, content: impl Into<String>) -> Self {
    self.content = content.into();
    self
  }

  #[must_use]
  pub const fn with_range(mut self, start: usize, end: usize) -> Self {
    self.source_range = Some((start, end));
    self
  }

  #[must_use]
  pub fn is_open(&self, kind: NodeKind) -> bool {
    self.kind == kind && self.nesting == Nesting::Open
  }

  #[must_use]
  pub fn is_close(&self, kind: NodeKind) -> bool {
    self.kind == kind && self.nesting == Nesting::Close
  }

  /// Concatenated text of this node's inline children.
  #[must_use]
  pub fn text_content(&self) -> String {
    let mut out = String::new();
    for child in &self.children {
      match child.kind {
        NodeKind::Text | NodeKind::CodeInline => out.push_str(&child.content),
        NodeKind::SoftBreak | NodeKind::HardBreak => out.push('\n'),
        NodeKind::Image => {
          out.push_str(child.attrs.get("alt").map_or("", String::as_str));
        },
        _ => {},
      }
    }
    out
  }
}

/// Find the close node matching the open node at `open`.
///
/// Returns `None` when `open` is not an open node or has no matching close.
#[must_use]
pub fn matching_close(nodes: &[Node], open: usize) -> Option<usize> {
  let start = nodes.get(open)?;
  if start.nesting != Nesting::Open {
    return None;
  }
  let kind = start.kind;
  let mut depth = 0usize;
  for (idx, node) in nodes.iter().enumerate().skip(open) {
    if node.kind != kind {
      continue;
    }
    match node.nesting {
      Nesting::Open => depth += 1,
      Nesting::Close => {
        depth = depth.checked_sub(1)?;
        if depth == 0 {
          return Some(idx);
        }
      },
      Nesting::SelfContained => {},
    }
  }
  None
}

/// Check that opens and closes pair up in order and nesting never goes
/// negative, recursing into inline children.
#[must_use]
pub fn is_well_formed(nodes: &[Node]) -> bool {
  let mut stack: Vec<NodeKind> = Vec::new();
  for node in nodes {
    match node.nesting {
      Nesting::Open => stack.push(node.kind),
      Nesting::Close => {
        if stack.pop() != Some(node.kind) {
          return false;
        }
      },
      Nesting::SelfContained => {},
    }
    if !node.children.is_empty() && !is_well_formed(&node.children) {
      return false;
    }
  }
  stack.is_empty()
}

/// Append `node` to an inline list, merging it into a preceding text node.
pub fn push_inline(children: &mut Vec<Node>, node: Node) {
  if node.kind == NodeKind::Text {
    if node.content.is_empty() {
      return;
    }
    if let Some(last) = children.last_mut() {
      if last.kind == NodeKind::Text {
        last.content.push_str(&node.content);
        return;
      }
    }
  }
  children.push(node);
}

#[cfg(test)]
mod tests {
  use super::*;

  fn paragraph(text: &str) -> Vec<Node> {
    vec![
      Node::block_open(NodeKind::Paragraph, "p"),
      Node::inline(vec![Node::text(text)]),
      Node::block_close(NodeKind::Paragraph, "p"),
    ]
  }

  #[test]
  fn test_well_formed_stream() {
    let mut nodes = vec![Node::block_open(NodeKind::Aside, "aside")];
    nodes.extend(paragraph("hello"));
    nodes.push(Node::block_close(NodeKind::Aside, "aside"));
    assert!(is_well_formed(&nodes));
  }

  #[test]
  fn test_malformed_streams() {
    let unclosed = vec![Node::block_open(NodeKind::Aside, "aside")];
    assert!(!is_well_formed(&unclosed));

    let negative = vec![Node::block_close(NodeKind::Aside, "aside")];
    assert!(!is_well_formed(&negative));

    let crossed = vec![
      Node::block_open(NodeKind::Aside, "aside"),
      Node::block_open(NodeKind::BlockQuote, "blockquote"),
      Node::block_close(NodeKind::Aside, "aside"),
      Node::block_close(NodeKind::BlockQuote, "blockquote"),
    ];
    assert!(!is_well_formed(&crossed));

    let bad_inline = vec![Node::inline(vec![Node::open(
      NodeKind::Strong,
      "strong",
    )])];
    assert!(!is_well_formed(&bad_inline));
  }

  #[test]
  fn test_matching_close_skips_nested() {
    let nodes = vec![
      Node::block_open(NodeKind::Aside, "aside"),
      Node::block_open(NodeKind::Aside, "aside"),
      Node::block_close(NodeKind::Aside, "aside"),
      Node::block_close(NodeKind::Aside, "aside"),
    ];
    assert_eq!(matching_close(&nodes, 0), Some(3));
    assert_eq!(matching_close(&nodes, 1), Some(2));
  }

  #[test]
  fn test_matching_close_needs_an_open_node() {
    let nodes = vec![
      Node::block_open(NodeKind::Aside, "aside"),
      Node::block_close(NodeKind::Aside, "aside"),
      Node::block_close(NodeKind::Aside, "aside"),
      Node::leaf(NodeKind::Image, "img"),
    ];
    assert_eq!(matching_close(&nodes, 1), None);
    assert_eq!(matching_close(&nodes, 2), None);
    assert_eq!(matching_close(&nodes, 3), None);
    assert_eq!(matching_close(&nodes, 9), None);
    assert_eq!(matching_close(&nodes, 0), Some(1));
  }

  #[test]
  fn test_push_inline_merges_text() {
    let mut children = Vec::new();
    push_inline(&mut children, Node::text("[["));
    push_inline(&mut children, Node::text("Page"));
    push_inline(&mut children, Node::text(""));
    push_inline(&mut children, Node::text("]]"));
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].content, "[[Page]]");
  }
}
