use crate::node::{Nesting, Node, NodeKind};

fn task_marker(text: &str) -> Option<(bool, &str)> {
  let (checked, rest) = if let Some(rest) = text.strip_prefix("[ ]") {
    (false, rest)
  } else if let Some(rest) =
    text.strip_prefix("[x]").or_else(|| text.strip_prefix("[X]"))
  {
    (true, rest)
  } else {
    return None;
  };

  if rest.is_empty() {
    Some((checked, rest))
  } else if rest.starts_with([' ', '\t']) {
    Some((checked, &rest[1..]))
  } else {
    None
  }
}

/// Turn list items starting with `[ ]` or `[x]` into disabled checkboxes.
pub fn apply_task_lists(nodes: &mut [Node]) {
  let mut lists: Vec<usize> = Vec::new();
  let mut task_lists: Vec<usize> = Vec::new();

  for idx in 0..nodes.len() {
    let (kind, nesting) = (nodes[idx].kind, nodes[idx].nesting);
    match (kind, nesting) {
      (NodeKind::BulletList | NodeKind::OrderedList, Nesting::Open) => {
        lists.push(idx);
      },
      (NodeKind::BulletList | NodeKind::OrderedList, Nesting::Close) => {
        lists.pop();
      },
      (NodeKind::ListItem, Nesting::Open) => {
        if convert_item(nodes, idx) {
          if let Some(&list) = lists.last() {
            task_lists.push(list);
          }
        }
      },
      _ => {},
    }
  }

  for list in task_lists {
    nodes[list]
      .attrs
      .insert("class".to_string(), "contains-task-list".to_string());
  }
}

fn convert_item(nodes: &mut [Node], item: usize) -> bool {
  let inline_idx = item + 2;
  if inline_idx >= nodes.len()
    || !nodes[item + 1].is_open(NodeKind::Paragraph)
    || nodes[inline_idx].kind != NodeKind::Inline
  {
    return false;
  }

  let children = &mut nodes[inline_idx].children;
  let Some(first) = children.first_mut() else {
    return false;
  };
  if first.kind != NodeKind::Text {
    return false;
  }
  let Some((checked, rest)) = task_marker(&first.content) else {
    return false;
  };
  let rest = rest.to_string();

  if rest.is_empty() {
    children.remove(0);
  } else {
    children[0].content = rest;
  }

  let mut checkbox = Node::leaf(NodeKind::Checkbox, "input")
    .with_attr("class", "task-list-item-checkbox")
    .with_attr("type", "checkbox")
    .with_attr("disabled", "");
  if checked {
    checkbox = checkbox.with_attr("checked", "");
  }
  children.insert(0, Node::text(" "));
  children.insert(0, checkbox);

  let line = nodes[item].source_range.map(|(start, _)| start);
  let li = &mut nodes[item];
  li.attrs
    .insert("class".to_string(), "task-list-item".to_string());
  if let Some(line) = line {
    li.attrs.insert("data-line".to_string(), line.to_string());
  }
  true
}
