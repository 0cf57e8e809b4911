use std::sync::LazyLock;

use indexmap::IndexMap;
use log::{debug, error};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::InlinePass;
use crate::{
  node::{Node, NodeKind, Nesting},
  utils::never_matching_regex,
};

static DEFINITION_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^\*\[([^\]\s]+)\]:\s+(.+)$").unwrap_or_else(|e| {
    error!("Failed to compile DEFINITION_RE regex: {e}");
    never_matching_regex()
  })
});

/// A single `*[TERM]: Expansion` definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Abbreviation {
  pub term:      String,
  pub expansion: String,
}

/// Abbreviations defined anywhere in a document, keyed by term.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AbbreviationSet(IndexMap<String, String>);

impl AbbreviationSet {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  /// Add a definition; a later definition of the same term wins.
  pub fn insert(&mut self, term: impl Into<String>, expansion: impl Into<String>) {
    self.0.insert(term.into(), expansion.into());
  }

  /// Merge every definition of `other` into this set.
  pub fn merge(&mut self, other: Self) {
    self.0.extend(other.0);
  }

  #[must_use]
  pub fn expansion(&self, term: &str) -> Option<&str> {
    self.0.get(term).map(String::as_str)
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = Abbreviation> + '_ {
    self.0.iter().map(|(term, expansion)| {
      Abbreviation {
        term:      term.clone(),
        expansion: expansion.clone(),
      }
    })
  }
}

/// Parse an inline children list as a block of definitions.
///
/// Every non-blank line must be a definition; anything else (including
/// formatted inline content) disqualifies the whole paragraph.
fn parse_definitions(children: &[Node]) -> Option<Vec<(String, String)>> {
  let mut text = String::new();
  for child in children {
    match child.kind {
      NodeKind::Text => text.push_str(&child.content),
      NodeKind::SoftBreak | NodeKind::HardBreak => text.push('\n'),
      _ => return None,
    }
  }

  let mut definitions = Vec::new();
  for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
    let caps = DEFINITION_RE.captures(line)?;
    definitions.push((caps[1].to_string(), caps[2].trim().to_string()));
  }

  (!definitions.is_empty()).then_some(definitions)
}

/// Hide definition-only paragraphs and collect their definitions.
pub fn collect_abbreviations(nodes: &mut [Node]) -> AbbreviationSet {
  let mut set = AbbreviationSet::new();
  let mut idx = 0;
  while idx + 2 < nodes.len() {
    if nodes[idx].is_open(NodeKind::Paragraph)
      && nodes[idx + 1].kind == NodeKind::Inline
      && nodes[idx + 2].is_close(NodeKind::Paragraph)
    {
      if let Some(definitions) = parse_definitions(&nodes[idx + 1].children) {
        debug!("Collected {} abbreviation definitions", definitions.len());
        for (term, expansion) in definitions {
          set.insert(term, expansion);
        }
        for node in &mut nodes[idx..idx + 3] {
          node.hidden = true;
        }
        nodes[idx + 1].children.clear();
        idx += 3;
        continue;
      }
    }
    idx += 1;
  }
  set
}

/// Wraps occurrences of defined terms in `<abbr title="...">`.
///
/// Terms are matched longest first on word boundaries, so with both `ID` and
/// `IDE` defined the text "IDE" is a single `IDE` abbreviation. Text already
/// inside an abbreviation is left alone, which makes the pass idempotent.
pub struct AbbreviationPass {
  set:     AbbreviationSet,
  pattern: Option<Regex>,
}

impl AbbreviationPass {
  #[must_use]
  pub fn new(set: &AbbreviationSet) -> Self {
    let pattern = if set.is_empty() {
      None
    } else {
      let mut terms: Vec<&str> = set.0.keys().map(String::as_str).collect();
      terms.sort_by(|a, b| {
        b.chars()
          .count()
          .cmp(&a.chars().count())
          .then_with(|| a.cmp(b))
      });
      let alternation = terms
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|");
      match Regex::new(&format!(r"\b(?:{alternation})\b")) {
        Ok(re) => Some(re),
        Err(e) => {
          error!("Failed to build abbreviation pattern: {e}");
          None
        },
      }
    };

    Self {
      set: set.clone(),
      pattern,
    }
  }

  fn split_text(&self, re: &Regex, text: &str, out: &mut Vec<Node>) {
    let mut last = 0;
    for m in re.find_iter(text) {
      let Some(expansion) = self.set.expansion(m.as_str()) else {
        continue;
      };
      if m.start() > last {
        out.push(Node::text(&text[last..m.start()]));
      }
      out.push(
        Node::open(NodeKind::Abbreviation, "abbr").with_attr("title", expansion),
      );
      out.push(Node::text(m.as_str()));
      out.push(Node::close(NodeKind::Abbreviation, "abbr"));
      last = m.end();
    }
    if last < text.len() {
      out.push(Node::text(&text[last..]));
    }
  }
}

impl InlinePass for AbbreviationPass {
  fn name(&self) -> &'static str {
    "abbreviation"
  }

  fn rewrite(&self, children: &mut Vec<Node>) {
    let Some(re) = &self.pattern else {
      return;
    };

    let mut out = Vec::with_capacity(children.len());
    let mut inside_abbr = 0usize;
    for child in children.drain(..) {
      match (child.kind, child.nesting) {
        (NodeKind::Abbreviation, Nesting::Open) => inside_abbr += 1,
        (NodeKind::Abbreviation, Nesting::Close) => {
          inside_abbr = inside_abbr.saturating_sub(1);
        },
        _ => {},
      }

      if child.kind == NodeKind::Text && inside_abbr == 0 && !child.hidden {
        self.split_text(re, &child.content, &mut out);
      } else {
        out.push(child);
      }
    }
    *children = out;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn definitions_paragraph(lines: &[&str]) -> Vec<Node> {
    let mut children = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
      if idx > 0 {
        children.push(Node::leaf(NodeKind::SoftBreak, ""));
      }
      children.push(Node::text(*line));
    }
    vec![
      Node::block_open(NodeKind::Paragraph, "p"),
      Node::inline(children),
      Node::block_close(NodeKind::Paragraph, "p"),
    ]
  }

  fn set(pairs: &[(&str, &str)]) -> AbbreviationSet {
    let mut set = AbbreviationSet::new();
    for (term, expansion) in pairs {
      set.insert(*term, *expansion);
    }
    set
  }

  #[test]
  fn test_collect_hides_definition_paragraph() {
    let mut nodes = definitions_paragraph(&[
      "*[HTML]: Hyper Text Markup Language",
      "*[W3C]: World Wide Web Consortium",
    ]);
    let set = collect_abbreviations(&mut nodes);
    assert_eq!(set.len(), 2);
    assert_eq!(set.expansion("W3C"), Some("World Wide Web Consortium"));
    assert!(nodes.iter().all(|n| n.hidden));
    assert!(nodes[1].children.is_empty());
  }

  #[test]
  fn test_one_bad_line_disqualifies_paragraph() {
    let mut nodes =
      definitions_paragraph(&["*[HTML]: Hyper Text Markup Language", "not a definition"]);
    let set = collect_abbreviations(&mut nodes);
    assert!(set.is_empty());
    assert!(nodes.iter().all(|n| !n.hidden));
  }

  #[test]
  fn test_longest_term_wins() {
    let pass = AbbreviationPass::new(&set(&[
      ("ID", "Identifier"),
      ("IDE", "Integrated Development Environment"),
    ]));
    let mut children = vec![Node::text("My IDE shows an ID")];
    pass.rewrite(&mut children);

    assert_eq!(children.len(), 8);
    assert_eq!(
      children[1].attrs.get("title").map(String::as_str),
      Some("Integrated Development Environment")
    );
    assert_eq!(children[2].content, "IDE");
    assert_eq!(
      children[5].attrs.get("title").map(String::as_str),
      Some("Identifier")
    );
    assert_eq!(children[6].content, "ID");
  }

  #[test]
  fn test_word_boundaries() {
    let pass = AbbreviationPass::new(&set(&[("ID", "Identifier")]));
    let mut children = vec![Node::text("IDEA and IDs")];
    pass.rewrite(&mut children);
    assert_eq!(children.len(), 1);
  }

  #[test]
  fn test_rewrite_is_idempotent() {
    let pass = AbbreviationPass::new(&set(&[("CSS", "Cascading Style Sheets")]));
    let mut children = vec![Node::text("CSS is CSS")];
    pass.rewrite(&mut children);
    let once = children.clone();
    pass.rewrite(&mut children);
    assert_eq!(children, once);
  }
}
