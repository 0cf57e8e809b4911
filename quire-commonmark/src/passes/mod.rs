//! Rewrites applied to the node stream between tokenizing and rendering.
//!
//! Core passes see the whole block stream. Inline passes implement
//! [`InlinePass`] and are run over the children of every visible inline
//! container, in registration order.
mod abbreviation;
mod attribution;
mod tasklist;
mod wikilink;

pub use self::{
  abbreviation::{
    Abbreviation,
    AbbreviationPass,
    AbbreviationSet,
    collect_abbreviations,
  },
  attribution::apply_attribution,
  tasklist::apply_task_lists,
  wikilink::WikilinkPass,
};
use crate::node::{Node, NodeKind};

/// A rewrite of one inline children list.
pub trait InlinePass {
  fn name(&self) -> &'static str;

  fn rewrite(&self, children: &mut Vec<Node>);
}

/// Run `passes` over every visible inline container in `nodes`.
pub fn run_inline_passes(nodes: &mut [Node], passes: &[&dyn InlinePass]) {
  for node in nodes
    .iter_mut()
    .filter(|n| n.kind == NodeKind::Inline && !n.hidden)
  {
    for pass in passes {
      pass.rewrite(&mut node.children);
    }
  }
}
