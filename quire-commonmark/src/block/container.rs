//! Block quotes and lists that hold asides.
//!
//! The host parser never sees `:::` as anything but text, so a quote or list
//! whose content opens an aside is split into its inner lines here and
//! tokenized recursively. Containers without an aside are left to the host.
use std::sync::LazyLock;

use regex::Regex;

use super::{BlockRule, BlockState, aside::opens_aside};
use crate::{
  node::{Nesting, Node, NodeKind},
  utils::{FenceState, indent_width, never_matching_regex, strip_indent},
};

static QUOTE_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^ {0,3}> ?").unwrap_or_else(|e| {
    log::error!("Failed to compile QUOTE_RE regex: {e}");
    never_matching_regex()
  })
});

static ITEM_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^( {0,3})(?:([-+*])|(\d{1,9})([.)]))(?:[ \t]+|$)")
    .unwrap_or_else(|e| {
      log::error!("Failed to compile ITEM_RE regex: {e}");
      never_matching_regex()
    })
});

/// Whether any line of `lines` opens an aside outside a fenced block.
fn holds_aside(lines: &[String]) -> bool {
  let mut fence = FenceState::new();
  lines.iter().any(|line| {
    let opens = !fence.in_fence() && opens_aside(line);
    fence = fence.advance(line);
    opens
  })
}

/// `>` block quotes.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuoteRule;

impl BlockRule for QuoteRule {
  fn name(&self) -> &'static str {
    "quote"
  }

  fn parse(&self, state: &mut BlockState<'_>) -> bool {
    let start = state.line;
    let content: Vec<String> = state.lines[start..]
      .iter()
      .map_while(|line| {
        QUOTE_RE
          .find(line)
          .map(|prefix| line[prefix.end()..].to_string())
      })
      .collect();
    if content.is_empty() || !holds_aside(&content) {
      return false;
    }

    let end = start + content.len();
    let inner = state.tokenize_nested(&content, state.document_line(start));
    state.nodes.push(
      Node::block_open(NodeKind::BlockQuote, "blockquote")
        .with_range(state.document_line(start), state.document_line(end)),
    );
    state.nodes.extend(inner);
    state.nodes.push(Node::block_close(NodeKind::BlockQuote, "blockquote"));
    state.line = end;
    true
  }
}

/// One list item marker.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Marker {
  /// Bullet character, or the delimiter after an ordered number.
  delimiter: char,
  ordered:   bool,
  number:    u64,
  /// Column where the item's content starts.
  content:   usize,
}

impl Marker {
  fn parse(line: &str) -> Option<Self> {
    let caps = ITEM_RE.captures(line)?;
    let whole = caps.get(0)?.as_str();
    let padding = whole.len() - whole.trim_end().len();
    // Content indented five or more columns starts a code block
    let content = if padding > 4 {
      whole.trim_end().len() + 1
    } else {
      whole.len()
    };

    if let Some(bullet) = caps.get(2) {
      return Some(Self {
        delimiter: bullet.as_str().chars().next()?,
        ordered:   false,
        number:    0,
        content,
      });
    }
    Some(Self {
      delimiter: caps.get(4)?.as_str().chars().next()?,
      ordered:   true,
      number:    caps.get(3)?.as_str().parse().ok()?,
      content,
    })
  }

  fn continues(&self, other: &Self) -> bool {
    self.ordered == other.ordered && self.delimiter == other.delimiter
  }
}

/// An item's content lines with the marker and indentation removed.
struct Item {
  start: usize,
  end:   usize,
  lines: Vec<String>,
}

/// Bullet and ordered lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListRule;

impl ListRule {
  /// Collect the items of the list starting at `start`.
  fn items(lines: &[String], start: usize, first: &Marker) -> Vec<Item> {
    let mut items: Vec<Item> = Vec::new();
    let mut line = start;

    while let Some(marker) = lines.get(line).and_then(|l| Marker::parse(l)) {
      if !first.continues(&marker) {
        break;
      }
      let first_line = &lines[line];
      let rest = first_line.get(marker.content..).unwrap_or_default();
      let mut content = vec![rest.to_string()];
      let mut next = line + 1;
      while let Some(candidate) = lines.get(next) {
        if candidate.trim().is_empty() {
          content.push(String::new());
        } else if indent_width(candidate) >= marker.content {
          content.push(strip_indent(candidate, marker.content).to_string());
        } else {
          break;
        }
        next += 1;
      }

      // Trailing blank lines separate items and belong to neither
      while content.last().is_some_and(|l| l.trim().is_empty()) {
        content.pop();
        next -= 1;
      }
      items.push(Item {
        start: line,
        end:   next,
        lines: content,
      });

      line = next;
      while lines.get(line).is_some_and(|l| l.trim().is_empty()) {
        line += 1;
      }
    }

    items
  }

  /// A list is loose when a blank line separates two of its blocks.
  fn is_loose(items: &[Item]) -> bool {
    let gap = items.windows(2).any(|pair| pair[0].end < pair[1].start);
    gap
      || items.iter().any(|item| {
        let mut fence = FenceState::new();
        item.lines.iter().any(|line| {
          let blank = !fence.in_fence() && line.trim().is_empty();
          fence = fence.advance(line);
          blank
        })
      })
  }
}

/// Hide the paragraph tags directly inside a tight list item.
fn hide_paragraphs(nodes: &mut [Node]) {
  let mut depth = 0usize;
  for node in nodes {
    match node.nesting {
      Nesting::Open => {
        node.hidden |= depth == 0 && node.kind == NodeKind::Paragraph;
        depth += 1;
      },
      Nesting::Close => {
        depth = depth.saturating_sub(1);
        node.hidden |= depth == 0 && node.kind == NodeKind::Paragraph;
      },
      Nesting::SelfContained => {},
    }
  }
}

impl BlockRule for ListRule {
  fn name(&self) -> &'static str {
    "list"
  }

  fn parse(&self, state: &mut BlockState<'_>) -> bool {
    let Some(first) = Marker::parse(state.current_line()) else {
      return false;
    };
    let items = Self::items(state.lines, state.line, &first);
    if !items.iter().any(|item| holds_aside(&item.lines)) {
      return false;
    }
    let Some(end) = items.last().map(|item| item.end) else {
      return false;
    };

    let tight = !Self::is_loose(&items);
    let open = if first.ordered {
      let open = Node::block_open(NodeKind::OrderedList, "ol");
      if first.number == 1 {
        open
      } else {
        open.with_attr("start", first.number.to_string())
      }
    } else {
      Node::block_open(NodeKind::BulletList, "ul")
    };
    let (kind, tag) = (open.kind, open.tag);
    let start = state.document_line(state.line);
    state
      .nodes
      .push(open.with_range(start, state.document_line(end)));

    for item in &items {
      let mut inner =
        state.tokenize_nested(&item.lines, state.document_line(item.start));
      if tight {
        hide_paragraphs(&mut inner);
      }
      state.nodes.push(
        Node::block_open(NodeKind::ListItem, "li").with_range(
          state.document_line(item.start),
          state.document_line(item.end),
        ),
      );
      state.nodes.extend(inner);
      state.nodes.push(Node::block_close(NodeKind::ListItem, "li"));
    }

    state.nodes.push(Node::block_close(kind, tag));
    state.line = end;
    true
  }
}
