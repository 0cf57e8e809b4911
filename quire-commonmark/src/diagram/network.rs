//! The `network` diagram language.
//!
//! ```text
//! ---
//! layout: force
//! ---
//! Server:
//!     # Server
//!     Handles requests.
//! Client:
//!     A browser.
//! Request Edge:
//!     HTTP over TLS.
//! ---
//! (Client|color:blue) -[Request Edge]-> (Server)
//! (Server) <-- (Cache)
//! ```
//!
//! The optional front matter becomes attributes of the visualization. Each
//! un-indented line in the definitions section names an item; items whose
//! name contains "edge" are edges, all others are nodes. The connections
//! section links items and may attach attributes to them.
use std::{fmt::Write as _, sync::LazyLock};

use html_escape::{encode_double_quoted_attribute, encode_text};
use indexmap::IndexMap;
use log::debug;
use regex::Regex;
use serde::Serialize;

use super::DiagramError;
use crate::utils::never_matching_regex;

static FRONT_MATTER_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^([\w-]+):\s*(.+)$").unwrap_or_else(|e| {
    log::error!("Failed to compile FRONT_MATTER_LINE_RE regex: {e}");
    never_matching_regex()
  })
});

static REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"\(([^|)]+)(?:\|([^)]+))?\)").unwrap_or_else(|e| {
    log::error!("Failed to compile REFERENCE_RE regex: {e}");
    never_matching_regex()
  })
});

static CONNECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(
    r"\(([^|)]+)(?:\|[^)]+)?\)\s*(<?-(?:\[([^\]]+)\])?-?>?)\s*\(([^|)]+)(?:\|[^)]+)?\)",
  )
  .unwrap_or_else(|e| {
    log::error!("Failed to compile CONNECTION_RE regex: {e}");
    never_matching_regex()
  })
});

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^(#+)\s*(.+)$").unwrap_or_else(|e| {
    log::error!("Failed to compile HEADING_RE regex: {e}");
    never_matching_regex()
  })
});

/// Which way a connection arrow points in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
  Forward,
  Backward,
}

/// A resolved connection. `source` and `target` are normalized so that the
/// edge always points from source to target, whichever way it was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
  pub source:    String,
  pub target:    String,
  pub label:     Option<String>,
  pub direction: Direction,
}

/// A named node or edge definition with its rendered description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagramItem {
  pub name:    String,
  pub is_edge: bool,
  pub html:    String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiagramBlock {
  pub front_matter:    IndexMap<String, String>,
  pub items:           Vec<DiagramItem>,
  pub connections:     Vec<String>,
  pub edges:           Vec<Edge>,
  pub node_attributes: IndexMap<String, IndexMap<String, String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
  FrontMatter,
  Definitions,
  Connections,
}

/// Render the description of an item: headings and paragraphs only.
fn render_description(lines: &[&str]) -> String {
  let mut html = String::new();
  let mut paragraph: Vec<&str> = Vec::new();

  let flush = |paragraph: &mut Vec<&str>, html: &mut String| {
    if !paragraph.is_empty() {
      let _ = writeln!(html, "\t\t<p>{}</p>", encode_text(&paragraph.join(" ")));
      paragraph.clear();
    }
  };

  for line in lines {
    let trimmed = line.trim();
    if trimmed.starts_with('#') {
      flush(&mut paragraph, &mut html);
      if let Some(caps) = HEADING_RE.captures(trimmed) {
        let level = caps[1].len().min(6);
        let _ = writeln!(
          html,
          "\t\t<h{level}>{}</h{level}>",
          encode_text(caps[2].trim())
        );
      }
    } else if trimmed.is_empty() {
      flush(&mut paragraph, &mut html);
    } else {
      paragraph.push(trimmed);
    }
  }
  flush(&mut paragraph, &mut html);

  html
}

fn parse_attributes(raw: &str) -> IndexMap<String, String> {
  let mut attrs = IndexMap::new();
  for pair in raw.split(';') {
    let Some((key, value)) = pair.split_once(':') else {
      continue;
    };
    let (key, value) = (key.trim(), value.trim());
    if !key.is_empty() && !value.is_empty() {
      attrs.insert(key.to_string(), value.to_string());
    }
  }
  attrs
}

fn resolve_connections(block: &mut DiagramBlock) {
  for connection in &block.connections {
    for caps in REFERENCE_RE.captures_iter(connection) {
      let Some(raw) = caps.get(2) else {
        continue;
      };
      let name = caps[1].trim().to_string();
      block
        .node_attributes
        .entry(name)
        .or_default()
        .extend(parse_attributes(raw.as_str()));
    }

    // Chains like (A) --> (B) --> (C) share the middle reference, so resume
    // the search at each match's target
    let mut pos = 0;
    while let Some(caps) = CONNECTION_RE.captures_at(connection, pos) {
      let (Some(symbol), Some(target)) = (caps.get(2), caps.get(4)) else {
        break;
      };
      let from = caps[1].trim().to_string();
      let to = target.as_str().trim().to_string();
      let label = caps.get(3).map(|m| m.as_str().trim().to_string());

      let edge = if symbol.as_str().starts_with('<') {
        Edge {
          source: to,
          target: from,
          label,
          direction: Direction::Backward,
        }
      } else {
        Edge {
          source: from,
          target: to,
          label,
          direction: Direction::Forward,
        }
      };
      block.edges.push(edge);

      // The target's opening parenthesis directly precedes its name
      pos = target.start().saturating_sub(1);
    }
  }
}

/// Parse a `network` block body.
///
/// # Errors
///
/// Returns [`DiagramError::UnterminatedFrontMatter`] when a front matter
/// section is opened but never closed, and [`DiagramError::EmptyBody`] when
/// the block defines neither items nor connections.
pub fn parse_network(content: &str) -> Result<DiagramBlock, DiagramError> {
  let mut block = DiagramBlock::default();
  let mut pending: Vec<(String, Vec<&str>)> = Vec::new();

  let first_content = content.lines().find(|l| !l.trim().is_empty());
  let mut section = if first_content.is_some_and(|l| l.trim() == "---") {
    None
  } else {
    Some(Section::Definitions)
  };

  for line in content.lines() {
    if line.trim() == "---" {
      section = match section {
        None => Some(Section::FrontMatter),
        Some(Section::FrontMatter) => Some(Section::Definitions),
        Some(Section::Definitions | Section::Connections) => {
          Some(Section::Connections)
        },
      };
      continue;
    }

    match section {
      None => {},
      Some(Section::FrontMatter) => {
        if let Some(caps) = FRONT_MATTER_LINE_RE.captures(line.trim()) {
          block
            .front_matter
            .insert(caps[1].to_string(), caps[2].trim().to_string());
        }
      },
      Some(Section::Definitions) => {
        if !line.is_empty() && !line.starts_with(char::is_whitespace) {
          let name = line.replacen(':', "", 1).trim().to_string();
          pending.push((name, Vec::new()));
        } else if let Some((_, lines)) = pending.last_mut() {
          lines.push(line.strip_prefix('\t').unwrap_or(line));
        }
      },
      Some(Section::Connections) => {
        let trimmed = line.trim();
        if !trimmed.is_empty() {
          block.connections.push(trimmed.to_string());
        }
      },
    }
  }

  if section == Some(Section::FrontMatter) {
    return Err(DiagramError::UnterminatedFrontMatter);
  }

  for (name, lines) in pending {
    let is_edge = name.to_lowercase().contains("edge");
    block.items.push(DiagramItem {
      html: render_description(&lines),
      name,
      is_edge,
    });
  }

  if block.items.is_empty() && block.connections.is_empty() {
    return Err(DiagramError::EmptyBody);
  }

  resolve_connections(&mut block);
  debug!(
    "Parsed network block with {} items and {} edges",
    block.items.len(),
    block.edges.len()
  );
  Ok(block)
}

fn is_attribute_name(key: &str) -> bool {
  key.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
    && key
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
}

fn push_attr(html: &mut String, key: &str, value: &str) {
  if is_attribute_name(key) {
    let _ = write!(html, " {key}=\"{}\"", encode_double_quoted_attribute(value));
  } else {
    debug!("Dropping invalid attribute name '{key}'");
  }
}

impl DiagramBlock {
  /// Serialize as a `<network-visualization>` element.
  #[must_use]
  pub fn to_html(&self) -> String {
    let nodes: Vec<&DiagramItem> =
      self.items.iter().filter(|i| !i.is_edge).collect();
    let defined_edges: Vec<&DiagramItem> =
      self.items.iter().filter(|i| i.is_edge).collect();

    let mut html = String::from("<network-visualization");
    for (key, value) in &self.front_matter {
      push_attr(&mut html, key, value);
    }
    html.push_str(">\n");

    for (idx, node) in nodes.iter().enumerate() {
      let _ = write!(
        html,
        "\t<network-node id=\"{idx}\" name=\"{}\"",
        encode_double_quoted_attribute(&node.name)
      );
      if let Some(attrs) = self.node_attributes.get(&node.name) {
        for (key, value) in attrs {
          push_attr(&mut html, key, value);
        }
      }
      html.push_str(">\n");
      html.push_str(&node.html);
      html.push_str("\t</network-node>\n");
      if idx + 1 < nodes.len() || !defined_edges.is_empty() || !self.edges.is_empty()
      {
        html.push_str("\t\n");
      }
    }

    for (idx, edge) in defined_edges.iter().enumerate() {
      let _ = writeln!(
        html,
        "\t<network-edge name=\"{}\">",
        encode_double_quoted_attribute(&edge.name)
      );
      html.push_str(&edge.html);
      html.push_str("\t</network-edge>\n");
      if idx + 1 < defined_edges.len() || !self.edges.is_empty() {
        html.push_str("\t\n");
      }
    }

    for edge in &self.edges {
      let _ = write!(
        html,
        "\t<network-edge source=\"{}\" target=\"{}\"",
        encode_double_quoted_attribute(&edge.source),
        encode_double_quoted_attribute(&edge.target)
      );
      if let Some(label) = &edge.label {
        push_attr(&mut html, "label", label);
      }
      html.push_str("></network-edge>\n");
    }

    html.push_str("</network-visualization>\n");
    html
  }
}

/// Parse and render a `network` block body.
///
/// # Errors
///
/// See [`parse_network`].
pub fn render_network(content: &str) -> Result<String, DiagramError> {
  parse_network(content).map(|block| block.to_html())
}

#[cfg(test)]
mod tests {
  #![allow(clippy::unwrap_used, reason = "Fine in tests")]
  use super::*;

  const SAMPLE: &str = "---\nlayout: force\n---\nServer:\n\t# Server\n\tHandles \
                        requests.\nClient:\n\tA browser.\nRequest Edge:\n\tHTTP \
                        over TLS.\n---\n(Client|color:blue;size:3) -[Request \
                        Edge]-> (Server)\n(Server) <-- (Cache|color:red)\n";

  #[test]
  fn test_sections_and_items() {
    let block = parse_network(SAMPLE).unwrap();
    assert_eq!(
      block.front_matter.get("layout").map(String::as_str),
      Some("force")
    );
    let names: Vec<_> = block.items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, ["Server", "Client", "Request Edge"]);
    assert!(block.items[2].is_edge);
    assert_eq!(
      block.items[0].html,
      "\t\t<h1>Server</h1>\n\t\t<p>Handles requests.</p>\n"
    );
    assert_eq!(block.connections.len(), 2);
  }

  #[test]
  fn test_forward_labelled_edge() {
    let block = parse_network("---\nx: y\n---\nA\n---\n(A) -[Label]-> (B)").unwrap();
    assert_eq!(block.edges, [Edge {
      source:    "A".to_string(),
      target:    "B".to_string(),
      label:     Some("Label".to_string()),
      direction: Direction::Forward,
    }]);
  }

  #[test]
  fn test_backward_edge_is_normalized() {
    let block = parse_network("A\n---\n(A) <-- (B)").unwrap();
    assert_eq!(block.edges, [Edge {
      source:    "B".to_string(),
      target:    "A".to_string(),
      label:     None,
      direction: Direction::Backward,
    }]);
  }

  #[test]
  fn test_chained_connections() {
    let block = parse_network("A\n---\n(A) --> (B) --> (C)").unwrap();
    let pairs: Vec<_> = block
      .edges
      .iter()
      .map(|e| (e.source.as_str(), e.target.as_str()))
      .collect();
    assert_eq!(pairs, [("A", "B"), ("B", "C")]);
  }

  #[test]
  fn test_later_attributes_win() {
    let block =
      parse_network("A\n---\n(A|color:red;shape:box) --> (B)\n(A|color:blue) --> (C)")
        .unwrap();
    let attrs = &block.node_attributes["A"];
    assert_eq!(attrs.get("color").map(String::as_str), Some("blue"));
    assert_eq!(attrs.get("shape").map(String::as_str), Some("box"));
  }

  #[test]
  fn test_blank_lines_separate_paragraphs() {
    let block = parse_network("A:\n\tone\n\ttwo\n\n\tthree").unwrap();
    assert_eq!(
      block.items[0].html,
      "\t\t<p>one two</p>\n\t\t<p>three</p>\n"
    );
  }

  #[test]
  fn test_html_output() {
    let html = render_network(SAMPLE).unwrap();
    assert!(html.starts_with("<network-visualization layout=\"force\">\n"));
    assert!(html.contains(
      "\t<network-node id=\"1\" name=\"Client\" color=\"blue\" size=\"3\">\n"
    ));
    assert!(html.contains("\t<network-edge name=\"Request Edge\">\n"));
    assert!(html.contains(
      "\t<network-edge source=\"Client\" target=\"Server\" label=\"Request \
       Edge\"></network-edge>\n"
    ));
    assert!(html.contains(
      "\t<network-edge source=\"Cache\" target=\"Server\"></network-edge>\n"
    ));
    assert!(html.ends_with("</network-visualization>\n"));
  }

  #[test]
  fn test_errors() {
    assert!(matches!(
      parse_network("---\nlayout: force\n"),
      Err(DiagramError::UnterminatedFrontMatter)
    ));
    assert!(matches!(
      parse_network("\n\n"),
      Err(DiagramError::EmptyBody)
    ));
  }
}
