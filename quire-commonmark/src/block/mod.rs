//! Line-oriented block tokenizer.
//!
//! Block rules get the first look at every line outside a fenced code block.
//! Lines no rule claims are collected into runs and parsed by the
//! [`HostParser`]. Rules that contain nested Markdown (asides, and quotes or
//! lists holding one) tokenize their content recursively through
//! [`BlockState::tokenize_nested`].
mod aside;
mod container;
mod figure;

use log::trace;

pub use self::{
  aside::AsideRule,
  container::{ListRule, QuoteRule},
  figure::FigureRule,
};
use crate::{host::HostParser, node::Node, utils::FenceState};

/// A block-level syntax extension.
pub trait BlockRule: Send + Sync {
  fn name(&self) -> &'static str;

  /// Try to parse a block starting at `state.line`.
  ///
  /// On success the rule pushes its nodes, advances `state.line` past the
  /// lines it consumed and returns `true`. On failure it must leave the state
  /// untouched.
  fn parse(&self, state: &mut BlockState<'_>) -> bool;
}

/// Cursor over the lines being tokenized.
pub struct BlockState<'a> {
  tokenizer:       &'a BlockTokenizer,
  pub lines:       &'a [String],
  /// Index into `lines` of the line under consideration.
  pub line:        usize,
  /// Document line number of `lines[0]`.
  pub line_offset: usize,
  pub nodes:       Vec<Node>,
}

impl<'a> BlockState<'a> {
  #[must_use]
  pub fn current_line(&self) -> &'a str {
    self.lines.get(self.line).map_or("", String::as_str)
  }

  /// Document line number of `index` in `lines`.
  #[must_use]
  pub const fn document_line(&self, index: usize) -> usize {
    self.line_offset + index
  }

  /// Tokenize nested content with the same rules and host parser.
  #[must_use]
  pub fn tokenize_nested(
    &self,
    lines: &[String],
    line_offset: usize,
  ) -> Vec<Node> {
    self.tokenizer.tokenize_lines(lines, line_offset)
  }
}

/// Drives block rules and the host parser over a document.
pub struct BlockTokenizer {
  rules: Vec<Box<dyn BlockRule>>,
  host:  Box<dyn HostParser>,
}

impl BlockTokenizer {
  #[must_use]
  pub fn new(host: Box<dyn HostParser>) -> Self {
    Self {
      rules: Vec::new(),
      host,
    }
  }

  /// Tokenizer with the figure and aside rules registered, plus the quote
  /// and list rules that let asides nest inside those containers.
  #[must_use]
  pub fn with_default_rules(host: Box<dyn HostParser>) -> Self {
    let mut tokenizer = Self::new(host);
    tokenizer.push_rule(Box::new(FigureRule));
    tokenizer.push_rule(Box::new(AsideRule));
    tokenizer.push_rule(Box::new(QuoteRule));
    tokenizer.push_rule(Box::new(ListRule));
    tokenizer
  }

  /// Register a rule. Rules are tried in registration order.
  pub fn push_rule(&mut self, rule: Box<dyn BlockRule>) {
    self.rules.push(rule);
  }

  #[must_use]
  pub fn tokenize(&self, text: &str) -> Vec<Node> {
    let lines: Vec<String> = text.lines().map(str::to_owned).collect();
    self.tokenize_lines(&lines, 0)
  }

  /// Tokenize `lines`, the first of which is document line `line_offset`.
  #[must_use]
  pub fn tokenize_lines(
    &self,
    lines: &[String],
    line_offset: usize,
  ) -> Vec<Node> {
    let mut state = BlockState {
      tokenizer: self,
      lines,
      line: 0,
      line_offset,
      nodes: Vec::new(),
    };
    let mut fence = FenceState::new();
    let mut pending: Option<usize> = None;

    while state.line < lines.len() {
      if !fence.in_fence() {
        let before = state.nodes.len();
        let start = state.line;
        let matched = self.rules.iter().find(|rule| rule.parse(&mut state));
        if let Some(rule) = matched {
          trace!(
            "Block rule '{}' matched lines {}..{}",
            rule.name(),
            state.document_line(start),
            state.document_line(state.line)
          );
          let produced = state.nodes.split_off(before);
          if let Some(from) = pending.take() {
            self.flush(&mut state, from, start);
          }
          state.nodes.extend(produced);
          continue;
        }
      }

      fence = fence.advance(&lines[state.line]);
      pending.get_or_insert(state.line);
      state.line += 1;
    }

    if let Some(from) = pending {
      let end = lines.len();
      self.flush(&mut state, from, end);
    }

    state.nodes
  }

  fn flush(&self, state: &mut BlockState<'_>, from: usize, to: usize) {
    let chunk = state.lines[from..to].join("\n");
    let parsed = self.host.parse(&chunk, state.document_line(from));
    state.nodes.extend(parsed);
  }
}
