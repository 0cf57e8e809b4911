//! Fenced mini-languages rendered to custom elements.
//!
//! - `chart`: YAML chart description to `<dataroom-chart>`
//! - `network`: node/edge definitions to `<network-visualization>`
//! - `mermaid`: passed through to a `<div class="mermaid">`
//!
//! A block that fails to decode renders as an ordinary code block.
pub mod chart;
pub mod network;

use html_escape::encode_text;
use log::warn;
use thiserror::Error;

pub use self::network::{DiagramBlock, Direction, Edge, parse_network};
use crate::{
  node::{Node, NodeKind},
  render::Renderer,
};

/// Error raised when a diagram block cannot be decoded.
#[derive(Debug, Error)]
pub enum DiagramError {
  #[error("Invalid chart YAML: {0}")]
  Yaml(#[from] serde_yaml::Error),

  #[error("Chart definition must be a mapping")]
  NotAMapping,

  #[error("Network front matter is not terminated")]
  UnterminatedFrontMatter,

  #[error("Network block is empty")]
  EmptyBody,
}

/// Render a mermaid block for client-side rendering.
#[must_use]
pub fn render_mermaid(content: &str) -> String {
  format!("<div class=\"mermaid\">{}</div>\n", encode_text(content))
}

/// Register the `chart`, `network` and `mermaid` fence overrides.
pub fn register(renderer: &mut Renderer) {
  renderer.add_rule(
    NodeKind::CodeBlock,
    Box::new(|node: &Node, _: &Renderer| {
      let language = node.info.split_whitespace().next()?;
      let rendered = match language {
        "chart" => chart::render_chart(&node.content),
        "network" => network::render_network(&node.content),
        "mermaid" => return Some(render_mermaid(&node.content)),
        _ => return None,
      };
      match rendered {
        Ok(html) => Some(html),
        Err(e) => {
          warn!("Rendering '{language}' block as code: {e}");
          None
        },
      }
    }),
  );
}
