//! Baseline CommonMark parsing.
//!
//! The compiler does not parse standard Markdown itself. Runs of source lines
//! that no block rule claimed are handed to a [`HostParser`], whose output is
//! expressed in the same node stream the rest of the pipeline uses.
use comrak::{
  Arena,
  nodes::{AstNode, ListType, NodeValue},
  options::Options,
  parse_document,
};

use crate::node::{Node, NodeKind, push_inline};

/// A CommonMark parser producing block-level nodes.
pub trait HostParser: Send + Sync {
  /// Parse `text`, whose first line is line `line_offset` (zero-based) of the
  /// original document. Source ranges are reported in document lines.
  fn parse(&self, text: &str, line_offset: usize) -> Vec<Node>;
}

/// Parse settings forwarded to comrak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(
  clippy::struct_excessive_bools,
  reason = "Mirrors independent comrak switches"
)]
pub struct HostOptions {
  pub tables:        bool,
  pub strikethrough: bool,
  pub autolink:      bool,
  pub smart:         bool,
}

impl Default for HostOptions {
  fn default() -> Self {
    Self {
      tables:        true,
      strikethrough: true,
      autolink:      true,
      smart:         true,
    }
  }
}

/// [`HostParser`] backed by comrak.
#[derive(Debug, Clone, Default)]
pub struct ComrakHost {
  options: HostOptions,
}

impl ComrakHost {
  #[must_use]
  pub const fn new(options: HostOptions) -> Self {
    Self { options }
  }

  fn comrak_options(&self) -> Options<'_> {
    let mut options = Options::default();
    options.extension.table = self.options.tables;
    options.extension.strikethrough = self.options.strikethrough;
    options.extension.autolink = self.options.autolink;
    options.parse.smart = self.options.smart;
    options
  }
}

impl HostParser for ComrakHost {
  fn parse(&self, text: &str, line_offset: usize) -> Vec<Node> {
    let arena = Arena::new();
    let options = self.comrak_options();
    let root = parse_document(&arena, text, &options);

    let mut converter = Converter {
      out: Vec::new(),
      line_offset,
    };
    for child in root.children() {
      converter.block(child, false);
    }
    converter.out
  }
}

struct Converter {
  out:         Vec<Node>,
  line_offset: usize,
}

impl Converter {
  fn range<'a>(&self, node: &'a AstNode<'a>) -> (usize, usize) {
    let pos = node.data.borrow().sourcepos;
    let start = pos.start.line.saturating_sub(1) + self.line_offset;
    let end = pos.end.line.max(pos.start.line) + self.line_offset;
    (start, end)
  }

  fn wrap<'a>(
    &mut self,
    node: &'a AstNode<'a>,
    open: Node,
    tight: bool,
  ) {
    let (start, end) = self.range(node);
    let kind = open.kind;
    let tag = open.tag;
    self.out.push(open.with_range(start, end));
    for child in node.children() {
      self.block(child, tight);
    }
    self.out.push(Node::block_close(kind, tag));
  }

  fn inline_container<'a>(
    &mut self,
    node: &'a AstNode<'a>,
    kind: NodeKind,
    tag: &'static str,
    hidden: bool,
  ) {
    let (start, end) = self.range(node);
    let mut open = Node::block_open(kind, tag).with_range(start, end);
    let mut close = Node::block_close(kind, tag);
    open.hidden = hidden;
    close.hidden = hidden;

    let mut children = Vec::new();
    for child in node.children() {
      inline(child, &mut children);
    }

    self.out.push(open);
    self.out.push(Node::inline(children).with_range(start, end));
    self.out.push(close);
  }

  fn block<'a>(&mut self, node: &'a AstNode<'a>, tight: bool) {
    let value = node.data.borrow().value.clone();
    match value {
      NodeValue::Paragraph => {
        self.inline_container(node, NodeKind::Paragraph, "p", tight);
      },
      NodeValue::Heading(heading) => {
        self.inline_container(
          node,
          NodeKind::Heading,
          heading_tag(heading.level),
          false,
        );
      },
      NodeValue::BlockQuote => {
        let open = Node::block_open(NodeKind::BlockQuote, "blockquote");
        self.wrap(node, open, false);
      },
      NodeValue::List(list) => {
        let open = match list.list_type {
          ListType::Bullet => Node::block_open(NodeKind::BulletList, "ul"),
          ListType::Ordered => {
            let open = Node::block_open(NodeKind::OrderedList, "ol");
            if list.start == 1 {
              open
            } else {
              open.with_attr("start", list.start.to_string())
            }
          },
        };
        self.wrap(node, open, list.tight);
      },
      NodeValue::Item(_) => {
        self.wrap(node, Node::block_open(NodeKind::ListItem, "li"), tight);
      },
      NodeValue::CodeBlock(code) => {
        let (start, end) = self.range(node);
        let mut leaf = Node::leaf(NodeKind::CodeBlock, "code")
          .into_block()
          .with_content(code.literal.to_string())
          .with_range(start, end);
        leaf.info = code.info.trim().to_string();
        if code.fenced {
          leaf.markup =
            char::from(code.fence_char).to_string().repeat(code.fence_length);
        }
        self.out.push(leaf);
      },
      NodeValue::HtmlBlock(html) => {
        let (start, end) = self.range(node);
        self.out.push(
          Node::leaf(NodeKind::HtmlBlock, "")
            .into_block()
            .with_content(html.literal.to_string())
            .with_range(start, end),
        );
      },
      NodeValue::ThematicBreak => {
        let (start, end) = self.range(node);
        self.out.push(
          Node::leaf(NodeKind::ThematicBreak, "hr")
            .into_block()
            .with_range(start, end),
        );
      },
      NodeValue::Table(_) => self.table(node),
      _ => {
        for child in node.children() {
          self.block(child, tight);
        }
      },
    }
  }

  fn table<'a>(&mut self, node: &'a AstNode<'a>) {
    let (start, end) = self.range(node);
    self.out.push(
      Node::block_open(NodeKind::Table, "table").with_range(start, end),
    );

    let mut body_open = false;
    for row in node.children() {
      let header = matches!(row.data.borrow().value, NodeValue::TableRow(true));
      if header {
        self.out.push(Node::block_open(NodeKind::TableHead, "thead"));
      } else if !body_open {
        self.out.push(Node::block_open(NodeKind::TableBody, "tbody"));
        body_open = true;
      }

      self.out.push(Node::block_open(NodeKind::TableRow, "tr"));
      for cell in row.children() {
        if header {
          self.inline_container(cell, NodeKind::TableHeaderCell, "th", false);
        } else {
          self.inline_container(cell, NodeKind::TableCell, "td", false);
        }
      }
      self.out.push(Node::block_close(NodeKind::TableRow, "tr"));

      if header {
        self.out.push(Node::block_close(NodeKind::TableHead, "thead"));
      }
    }

    if body_open {
      self.out.push(Node::block_close(NodeKind::TableBody, "tbody"));
    }
    self.out.push(Node::block_close(NodeKind::Table, "table"));
  }
}

const fn heading_tag(level: u8) -> &'static str {
  match level {
    1 => "h1",
    2 => "h2",
    3 => "h3",
    4 => "h4",
    5 => "h5",
    _ => "h6",
  }
}

fn inline_wrap<'a>(
  node: &'a AstNode<'a>,
  open: Node,
  out: &mut Vec<Node>,
) {
  let kind = open.kind;
  let tag = open.tag;
  out.push(open);
  for child in node.children() {
    inline(child, out);
  }
  out.push(Node::close(kind, tag));
}

fn inline<'a>(node: &'a AstNode<'a>, out: &mut Vec<Node>) {
  let value = node.data.borrow().value.clone();
  match value {
    NodeValue::Text(text) => push_inline(out, Node::text(text.to_string())),
    NodeValue::SoftBreak => out.push(Node::leaf(NodeKind::SoftBreak, "")),
    NodeValue::LineBreak => out.push(Node::leaf(NodeKind::HardBreak, "br")),
    NodeValue::Code(code) => {
      out.push(
        Node::leaf(NodeKind::CodeInline, "code")
          .with_content(code.literal.to_string()),
      );
    },
    NodeValue::HtmlInline(html) => {
      out.push(
        Node::leaf(NodeKind::HtmlInline, "").with_content(html.to_string()),
      );
    },
    NodeValue::Emph => {
      inline_wrap(node, Node::open(NodeKind::Emphasis, "em"), out);
    },
    NodeValue::Strong => {
      inline_wrap(node, Node::open(NodeKind::Strong, "strong"), out);
    },
    NodeValue::Strikethrough => {
      inline_wrap(node, Node::open(NodeKind::Strikethrough, "s"), out);
    },
    NodeValue::Link(link) => {
      let mut open =
        Node::open(NodeKind::Link, "a").with_attr("href", link.url.to_string());
      if !link.title.is_empty() {
        open = open.with_attr("title", link.title.to_string());
      }
      inline_wrap(node, open, out);
    },
    NodeValue::Image(link) => {
      let mut alt = Vec::new();
      for child in node.children() {
        inline(child, &mut alt);
      }
      let alt = Node::inline(alt).text_content();
      let mut image = Node::leaf(NodeKind::Image, "img")
        .with_attr("src", link.url.to_string())
        .with_attr("alt", alt);
      if !link.title.is_empty() {
        image = image.with_attr("title", link.title.to_string());
      }
      out.push(image);
    },
    _ => {
      for child in node.children() {
        inline(child, out);
      }
    },
  }
}
