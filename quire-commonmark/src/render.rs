//! HTML serialization of the node stream.
//!
//! Every node kind has a default rendering. Overrides registered with
//! [`Renderer::add_rule`] are consulted first, in registration order; a rule
//! returning `None` defers to the next rule and finally to the default.
use std::collections::HashMap;

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::node::{Nesting, Node, NodeKind};

/// Override for rendering one node kind.
pub trait RenderRule: Send + Sync {
  fn render(&self, node: &Node, renderer: &Renderer) -> Option<String>;
}

impl<F> RenderRule for F
where
  F: Fn(&Node, &Renderer) -> Option<String> + Send + Sync,
{
  fn render(&self, node: &Node, renderer: &Renderer) -> Option<String> {
    self(node, renderer)
  }
}

#[derive(Default)]
pub struct Renderer {
  rules:      HashMap<NodeKind, Vec<Box<dyn RenderRule>>>,
  /// Render soft line breaks as `<br>`.
  breaks:     bool,
  /// Pass raw HTML through instead of escaping it.
  allow_html: bool,
}

impl Renderer {
  #[must_use]
  pub fn new(breaks: bool, allow_html: bool) -> Self {
    Self {
      rules: HashMap::new(),
      breaks,
      allow_html,
    }
  }

  /// Register an override for `kind`.
  pub fn add_rule(&mut self, kind: NodeKind, rule: Box<dyn RenderRule>) {
    self.rules.entry(kind).or_default().push(rule);
  }

  /// Render a block stream.
  #[must_use]
  pub fn render(&self, nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
      if node.hidden {
        continue;
      }
      out.push_str(&self.render_node(node));
    }
    out
  }

  /// Render an inline children list.
  #[must_use]
  pub fn render_inline(&self, children: &[Node]) -> String {
    let mut out = String::new();
    for child in children.iter().filter(|c| !c.hidden) {
      out.push_str(&self.render_node(child));
    }
    out
  }

  fn render_node(&self, node: &Node) -> String {
    if let Some(rules) = self.rules.get(&node.kind) {
      for rule in rules {
        if let Some(html) = rule.render(node, self) {
          return html;
        }
      }
    }
    self.render_default(node)
  }

  /// Default rendering, bypassing overrides.
  #[must_use]
  pub fn render_default(&self, node: &Node) -> String {
    match node.kind {
      NodeKind::Inline => self.render_inline(&node.children),
      NodeKind::Text => encode_text(&node.content).into_owned(),
      NodeKind::SoftBreak => {
        if self.breaks {
          "<br>\n".to_string()
        } else {
          "\n".to_string()
        }
      },
      NodeKind::HardBreak => "<br>\n".to_string(),
      NodeKind::CodeInline => {
        format!("<code>{}</code>", encode_text(&node.content))
      },
      NodeKind::HtmlInline | NodeKind::HtmlBlock => {
        if self.allow_html {
          node.content.clone()
        } else {
          encode_text(&node.content).into_owned()
        }
      },
      NodeKind::CodeBlock => render_code_block(node),
      NodeKind::ThematicBreak => "<hr>\n".to_string(),
      NodeKind::Image | NodeKind::Checkbox => {
        let html = format!("<{}{}>", node.tag, render_attrs(node));
        if node.block { html + "\n" } else { html }
      },
      _ => render_tag(node),
    }
  }
}

/// `<tag attrs>` / `</tag>` for container nodes.
#[must_use]
pub fn render_tag(node: &Node) -> String {
  let mut out = match node.nesting {
    Nesting::Open => format!("<{}{}>", node.tag, render_attrs(node)),
    Nesting::Close => format!("</{}>", node.tag),
    Nesting::SelfContained => format!("<{}{}>", node.tag, render_attrs(node)),
  };
  if node.block && needs_newline(node) {
    out.push('\n');
  }
  out
}

/// Block opens whose content starts on its own line.
fn needs_newline(node: &Node) -> bool {
  match node.nesting {
    Nesting::Close => true,
    Nesting::SelfContained => true,
    Nesting::Open => {
      matches!(
        node.kind,
        NodeKind::BlockQuote
          | NodeKind::BulletList
          | NodeKind::OrderedList
          | NodeKind::Table
          | NodeKind::TableHead
          | NodeKind::TableBody
          | NodeKind::TableRow
          | NodeKind::Aside
          | NodeKind::Figure
      )
    },
  }
}

#[must_use]
pub fn render_attrs(node: &Node) -> String {
  let mut out = String::new();
  for (key, value) in &node.attrs {
    out.push(' ');
    out.push_str(key);
    if !value.is_empty() {
      out.push_str("=\"");
      out.push_str(&encode_double_quoted_attribute(value));
      out.push('"');
    }
  }
  out
}

/// Plain `<pre><code>` rendering of a fenced or indented block.
#[must_use]
pub fn render_code_block(node: &Node) -> String {
  let language = node.info.split_whitespace().next().unwrap_or_default();
  let class = if language.is_empty() {
    String::new()
  } else {
    format!(
      " class=\"language-{}\"",
      encode_double_quoted_attribute(language)
    )
  };
  format!(
    "<pre><code{class}>{}</code></pre>\n",
    encode_text(&node.content)
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::host::{ComrakHost, HostParser};

  fn render(text: &str) -> String {
    let nodes = ComrakHost::default().parse(text, 0);
    Renderer::new(true, true).render(&nodes)
  }

  #[test]
  fn test_basic_blocks() {
    assert_eq!(render("# Title"), "<h1>Title</h1>\n");
    assert_eq!(render("Hello *there*"), "<p>Hello <em>there</em></p>\n");
    assert_eq!(render("---"), "<hr>\n");
  }

  #[test]
  fn test_tight_list_has_no_paragraphs() {
    assert_eq!(render("- a\n- b"), "<ul>\n<li>a</li>\n<li>b</li>\n</ul>\n");
  }

  #[test]
  fn test_soft_breaks_follow_option() {
    assert_eq!(render("one\ntwo"), "<p>one<br>\ntwo</p>\n");
    let nodes = ComrakHost::default().parse("one\ntwo", 0);
    assert_eq!(
      Renderer::new(false, true).render(&nodes),
      "<p>one\ntwo</p>\n"
    );
  }

  #[test]
  fn test_text_and_code_are_escaped() {
    assert_eq!(render("`<b>`"), "<p><code>&lt;b&gt;</code></p>\n");
    assert_eq!(
      render("```rust\nlet a = 1 < 2;\n```"),
      "<pre><code class=\"language-rust\">let a = 1 &lt; 2;\n</code></pre>\n"
    );
  }

  #[test]
  fn test_raw_html_switch() {
    let nodes = ComrakHost::default().parse("<div>x</div>", 0);
    assert!(Renderer::new(true, true).render(&nodes).contains("<div>x</div>"));
    assert!(
      Renderer::new(true, false)
        .render(&nodes)
        .contains("&lt;div&gt;")
    );
  }

  #[test]
  fn test_override_chain() {
    let nodes = ComrakHost::default().parse("```a\nx\n```\n\n```b\ny\n```", 0);
    let mut renderer = Renderer::new(true, true);
    renderer.add_rule(
      NodeKind::CodeBlock,
      Box::new(|node: &Node, _: &Renderer| {
        (node.info == "a").then(|| "<A>\n".to_string())
      }),
    );
    let html = renderer.render(&nodes);
    assert!(html.starts_with("<A>\n"));
    assert!(html.contains("language-b"));
  }

  #[test]
  fn test_empty_attribute_values_are_bare() {
    let node = Node::leaf(NodeKind::Checkbox, "input")
      .with_attr("type", "checkbox")
      .with_attr("disabled", "");
    assert_eq!(render_attrs(&node), " type=\"checkbox\" disabled");
  }
}
