//! Greedy fixed-capacity pagination.
//!
//! Each chapter's HTML is cut into atomic units: its top-level elements, with
//! lists expanded into their items. Units are appended to the current page
//! until the injected [`Measure`] reports that the page overflows; the unit
//! that caused the overflow moves to a fresh page. A unit that does not fit on
//! an empty page is placed anyway, so every step makes progress.
use std::sync::LazyLock;

use html_escape::{
  decode_html_entities,
  encode_double_quoted_attribute,
  encode_text,
};
use kuchikikiki::{ElementData, NodeRef, parse_fragment};
use log::{debug, trace, warn};
use markup5ever::{QualName, local_name, ns};
use regex::Regex;
use serde::Serialize;
use tendril::TendrilSink;

use super::footnote::{FootnoteMap, apply_footnotes};
use crate::{types::Chapter, utils::never_matching_regex};

static BLOCK_END_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(
    r"(?i)</(?:p|h[1-6]|li|pre|blockquote|tr|figure|figcaption|aside|div|dt|dd)>",
  )
  .unwrap_or_else(|e| {
    log::error!("Failed to compile BLOCK_END_RE regex: {e}");
    never_matching_regex()
  })
});

static LINE_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?i)<(?:br|hr|img)\b[^>]*>").unwrap_or_else(|e| {
    log::error!("Failed to compile LINE_BREAK_RE regex: {e}");
    never_matching_regex()
  })
});

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"<[^>]*>").unwrap_or_else(|e| {
    log::error!("Failed to compile TAG_RE regex: {e}");
    never_matching_regex()
  })
});

/// Measures how much of a page a body fragment occupies.
///
/// Both values are in the same abstract unit; the default [`LineMeasure`]
/// counts lines of text.
pub trait Measure {
  /// Extent of a complete page body.
  fn extent(&mut self, body_html: &str) -> u32;

  /// Extent a page can hold.
  fn capacity(&self) -> u32;
}

/// Estimates the number of text lines a fragment renders to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineMeasure {
  pub lines_per_page: u32,
  pub chars_per_line: u32,
  /// Extra lines charged after every block element.
  pub block_spacing:  u32,
}

impl Default for LineMeasure {
  fn default() -> Self {
    Self {
      lines_per_page: 40,
      chars_per_line: 80,
      block_spacing:  1,
    }
  }
}

impl LineMeasure {
  #[must_use]
  pub const fn new(
    lines_per_page: u32,
    chars_per_line: u32,
    block_spacing: u32,
  ) -> Self {
    Self {
      lines_per_page,
      chars_per_line,
      block_spacing,
    }
  }
}

impl Measure for LineMeasure {
  fn extent(&mut self, body_html: &str) -> u32 {
    let blocks = BLOCK_END_RE.find_iter(body_html).count();
    let text = BLOCK_END_RE.replace_all(body_html, "\n");
    let text = LINE_BREAK_RE.replace_all(&text, "\n");
    let text = TAG_RE.replace_all(&text, "");
    let text = decode_html_entities(&text);

    let width = self.chars_per_line.max(1) as usize;
    let lines: usize = text
      .lines()
      .map(|line| line.trim().chars().count())
      .filter(|&chars| chars > 0)
      .map(|chars| chars.div_ceil(width))
      .sum();

    let spacing = blocks.saturating_mul(self.block_spacing as usize);
    u32::try_from(lines.saturating_add(spacing)).unwrap_or(u32::MAX)
  }

  fn capacity(&self) -> u32 {
    self.lines_per_page
  }
}

/// Odd pages sit on the right of a spread, even pages on the left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
  Odd,
  Even,
}

impl Parity {
  #[must_use]
  pub const fn of(index: usize) -> Self {
    if index % 2 == 1 { Self::Odd } else { Self::Even }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
  /// One-based, numbered across all chapters.
  pub index:             usize,
  pub parity:            Parity,
  /// Chapter title on odd pages, document title on even pages.
  pub header_text:       String,
  /// Zero-based index of the owning chapter.
  pub chapter:           usize,
  pub body:              String,
  pub footnote_ids_used: Vec<String>,
  pub footnote_html:     String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Pagination {
  pub pages:       Vec<Page>,
  pub total_pages: usize,
}

/// A list whose items were split into separate units.
#[derive(Debug)]
struct ListContainer {
  tag:   String,
  attrs: Vec<(String, String)>,
  /// First item number of an ordered list.
  start: i64,
}

#[derive(Debug)]
struct Unit {
  html: String,
  /// Owning list and the item's position in it.
  list: Option<(usize, usize)>,
}

/// A chapter cut into atomic units.
#[derive(Debug, Default)]
struct ChapterLayout {
  units: Vec<Unit>,
  lists: Vec<ListContainer>,
}

fn serialize_node(node: &NodeRef) -> String {
  let mut buf = Vec::new();
  if let Err(e) = node.serialize(&mut buf) {
    warn!("Failed to serialize HTML node: {e}");
  }
  String::from_utf8(buf).unwrap_or_default()
}

fn is_list(element: &ElementData) -> bool {
  element.name.local == local_name!("ul")
    || element.name.local == local_name!("ol")
}

impl ChapterLayout {
  fn parse(html: &str) -> Self {
    let mut layout = Self::default();
    // Parsed in a body context so head-only elements stay where they are
    let context = QualName::new(None, ns!(html), local_name!("body"));
    let document = parse_fragment(context, Vec::new()).one(html);
    let Some(root) = document.first_child() else {
      warn!("Chapter HTML produced no fragment root, keeping it as one unit");
      layout.units.push(Unit {
        html: html.trim().to_string(),
        list: None,
      });
      return layout;
    };

    for child in root.children() {
      if let Some(text) = child.as_text() {
        let text = text.borrow();
        if !text.trim().is_empty() {
          layout.units.push(Unit {
            html: encode_text(text.trim()).into_owned(),
            list: None,
          });
        }
        continue;
      }

      if child.as_comment().is_some() {
        layout.units.push(Unit {
          html: serialize_node(&child),
          list: None,
        });
        continue;
      }

      let Some(element) = child.as_element() else {
        continue;
      };
      if is_list(element) {
        layout.push_list(&child, element);
      } else {
        layout.units.push(Unit {
          html: serialize_node(&child),
          list: None,
        });
      }
    }

    layout
  }

  fn push_list(&mut self, node: &NodeRef, element: &ElementData) {
    let attrs: Vec<(String, String)> = element
      .attributes
      .borrow()
      .map
      .iter()
      .map(|(name, attr)| (name.local.to_string(), attr.value.clone()))
      .collect();
    let start = attrs
      .iter()
      .find(|(name, _)| name == "start")
      .and_then(|(_, value)| value.trim().parse().ok())
      .unwrap_or(1);

    let list = self.lists.len();
    self.lists.push(ListContainer {
      tag: element.name.local.to_string(),
      attrs,
      start,
    });

    let items = node.children().filter(|c| c.as_element().is_some());
    for (position, item) in items.enumerate() {
      self.units.push(Unit {
        html: serialize_node(&item),
        list: Some((list, position)),
      });
    }
  }

  fn open_list(&self, list: usize, position: usize) -> String {
    let Some(container) = self.lists.get(list) else {
      return String::new();
    };
    let continued = container.tag == "ol" && position > 0;

    let mut tag = format!("<{}", container.tag);
    for (name, value) in &container.attrs {
      if continued && name == "start" {
        continue;
      }
      tag.push_str(&format!(
        " {name}=\"{}\"",
        encode_double_quoted_attribute(value)
      ));
    }
    if continued {
      let offset = i64::try_from(position).unwrap_or(i64::MAX);
      tag.push_str(&format!(
        " start=\"{}\"",
        container.start.saturating_add(offset)
      ));
    }
    tag.push('>');
    tag
  }

  /// Serialize the units at `indices`, re-wrapping list items in their list.
  fn assemble(&self, indices: &[usize]) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut open: Option<usize> = None;

    for unit in indices.iter().filter_map(|&i| self.units.get(i)) {
      let list = unit.list.map(|(list, _)| list);
      if open.is_some() && open != list {
        if let Some(container) = open.and_then(|l| self.lists.get(l)) {
          parts.push(format!("</{}>", container.tag));
        }
        open = None;
      }
      if open.is_none() {
        if let Some((list, position)) = unit.list {
          parts.push(self.open_list(list, position));
          open = Some(list);
        }
      }
      parts.push(unit.html.clone());
    }

    if let Some(container) = open.and_then(|l| self.lists.get(l)) {
      parts.push(format!("</{}>", container.tag));
    }
    parts.join("\n")
  }
}

/// Extent of a page body together with the footnote list it would carry.
fn page_extent(
  measure: &mut dyn Measure,
  body: &str,
  position: usize,
  footnotes: &FootnoteMap,
) -> u32 {
  measure.extent(&apply_footnotes(body, position, footnotes).into_html())
}

/// Lay `chapters` out on pages of `measure.capacity()`.
///
/// Every chapter starts on a new page. Footnotes are redistributed per page,
/// namespaced by the page's zero-based position, and a page's footnote list
/// counts against its capacity.
pub fn paginate(
  chapters: &[Chapter],
  document_title: &str,
  footnotes: &FootnoteMap,
  measure: &mut dyn Measure,
) -> Pagination {
  let capacity = measure.capacity();
  let mut bodies: Vec<(usize, String)> = Vec::new();

  for (chapter_idx, chapter) in chapters.iter().enumerate() {
    let layout = ChapterLayout::parse(&chapter.html);
    if layout.units.is_empty() {
      debug!("Chapter {chapter_idx} has no content, no pages emitted");
      continue;
    }

    let mut current: Vec<usize> = Vec::new();
    for unit_idx in 0..layout.units.len() {
      current.push(unit_idx);
      let body = layout.assemble(&current);
      if page_extent(measure, &body, bodies.len(), footnotes) <= capacity {
        continue;
      }
      if current.len() > 1 {
        current.pop();
        bodies.push((chapter_idx, layout.assemble(&current)));
        current = vec![unit_idx];
        let body = layout.assemble(&current);
        if page_extent(measure, &body, bodies.len(), footnotes) <= capacity {
          continue;
        }
      }
      debug!(
        "Unit {unit_idx} of chapter {chapter_idx} exceeds page capacity \
         {capacity}, placing it alone"
      );
    }
    if !current.is_empty() {
      bodies.push((chapter_idx, layout.assemble(&current)));
    }
  }

  let pages: Vec<Page> = bodies
    .into_iter()
    .enumerate()
    .map(|(position, (chapter, body))| {
      let index = position + 1;
      let parity = Parity::of(index);
      let header_text = match parity {
        Parity::Odd => {
          chapters
            .get(chapter)
            .map(|c| c.title.clone())
            .unwrap_or_default()
        },
        Parity::Even => document_title.to_string(),
      };
      let unit = apply_footnotes(&body, position, footnotes);
      Page {
        index,
        parity,
        header_text,
        chapter,
        body: unit.html,
        footnote_ids_used: unit.footnote_ids_used,
        footnote_html: unit.footnote_html,
      }
    })
    .collect();

  trace!("Paginated {} chapters into {} pages", chapters.len(), pages.len());
  Pagination {
    total_pages: pages.len(),
    pages,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  /// Counts paragraphs and list items; each takes one unit of capacity.
  struct CountMeasure(u32);

  impl Measure for CountMeasure {
    fn extent(&mut self, body_html: &str) -> u32 {
      let count = body_html.matches("<p>").count()
        + body_html.matches("<li>").count();
      u32::try_from(count).unwrap_or(u32::MAX)
    }

    fn capacity(&self) -> u32 {
      self.0
    }
  }

  fn chapter(title: &str, html: &str) -> Chapter {
    Chapter {
      title: title.to_string(),
      html:  html.to_string(),
    }
  }

  fn paragraphs(pages: &Pagination) -> Vec<String> {
    let re =
      Regex::new(r"<p>(.*?)</p>").unwrap_or_else(|_| never_matching_regex());
    pages
      .pages
      .iter()
      .flat_map(|p| {
        re.captures_iter(&p.body)
          .map(|c| c[1].to_string())
          .collect::<Vec<_>>()
      })
      .collect()
  }

  #[test]
  fn test_greedy_fill_and_headers() {
    let chapters = [
      chapter("One", "<p>1</p>\n<p>2</p>\n<p>3</p>\n"),
      chapter("Two", "<p>4</p>\n"),
    ];
    let result = paginate(
      &chapters,
      "Book",
      &FootnoteMap::new(),
      &mut CountMeasure(2),
    );
    assert_eq!(result.total_pages, 3);
    assert_eq!(result.pages[0].body, "<p>1</p>\n<p>2</p>");
    assert_eq!(result.pages[1].body, "<p>3</p>");
    assert_eq!(result.pages[2].chapter, 1);

    assert_eq!(result.pages[0].parity, Parity::Odd);
    assert_eq!(result.pages[0].header_text, "One");
    assert_eq!(result.pages[1].parity, Parity::Even);
    assert_eq!(result.pages[1].header_text, "Book");
    assert_eq!(result.pages[2].header_text, "Two");
  }

  #[test]
  fn test_no_unit_lost_or_duplicated() {
    let html: String = (0..17).map(|i| format!("<p>{i}</p>\n")).collect();
    for capacity in [0, 1, 2, 3, 5, 100] {
      let result = paginate(
        &[chapter("", &html)],
        "",
        &FootnoteMap::new(),
        &mut CountMeasure(capacity),
      );
      let expected: Vec<String> = (0..17).map(|i| i.to_string()).collect();
      assert_eq!(paragraphs(&result), expected, "capacity {capacity}");
      assert_eq!(result.total_pages, result.pages.len());
    }
  }

  #[test]
  fn test_oversized_unit_is_force_placed() {
    let result = paginate(
      &[chapter("", "<p>a</p><p>b</p>")],
      "",
      &FootnoteMap::new(),
      &mut CountMeasure(0),
    );
    assert_eq!(result.total_pages, 2);
    assert_eq!(result.pages[0].body, "<p>a</p>");
    assert_eq!(result.pages[1].body, "<p>b</p>");
  }

  #[test]
  fn test_list_items_are_rewrapped() {
    let result = paginate(
      &[chapter("", "<ul class=\"x\"><li>a</li><li>b</li><li>c</li></ul>")],
      "",
      &FootnoteMap::new(),
      &mut CountMeasure(2),
    );
    assert_eq!(result.total_pages, 2);
    assert_eq!(
      result.pages[0].body,
      "<ul class=\"x\">\n<li>a</li>\n<li>b</li>\n</ul>"
    );
    assert_eq!(result.pages[1].body, "<ul class=\"x\">\n<li>c</li>\n</ul>");
  }

  #[test]
  fn test_ordered_list_numbering_continues() {
    let result = paginate(
      &[chapter("", "<ol start=\"3\"><li>x</li><li>y</li></ol>")],
      "",
      &FootnoteMap::new(),
      &mut CountMeasure(1),
    );
    assert_eq!(result.pages[0].body, "<ol start=\"3\">\n<li>x</li>\n</ol>");
    assert_eq!(result.pages[1].body, "<ol start=\"4\">\n<li>y</li>\n</ol>");
  }

  #[test]
  fn test_footnotes_per_page() {
    let mut footnotes = FootnoteMap::new();
    footnotes.insert("1", "Note");
    let result = paginate(
      &[chapter("", "<p>a[^1]</p><p>b[^1]</p>")],
      "",
      &footnotes,
      &mut CountMeasure(1),
    );
    assert_eq!(result.pages[0].footnote_ids_used, ["1"]);
    assert!(result.pages[0].body.contains("fn-ref-0-1"));
    assert!(result.pages[1].body.contains("fn-ref-1-1"));
    assert!(result.pages[1].footnote_html.contains("fn-def-1-1"));
  }

  #[test]
  fn test_line_measure_estimates() {
    let mut measure = LineMeasure::new(10, 10, 1);
    assert_eq!(measure.extent("<p>short</p>"), 2);
    assert_eq!(measure.extent("<p>exactly twenty chars</p>"), 3);
    assert_eq!(measure.extent("<p>a<br>b</p><h1>T</h1>"), 5);
    assert_eq!(measure.capacity(), 10);
  }

  #[test]
  fn test_comments_and_head_elements_are_kept() {
    let html = "<!-- keep -->\n<style>p{}</style>\n<p>a</p>\n\
                <link rel=\"stylesheet\" href=\"x.css\">\n\
                <script>go()</script>\n<meta charset=\"utf-8\">";
    let result = paginate(
      &[chapter("", html)],
      "",
      &FootnoteMap::new(),
      &mut CountMeasure(10),
    );
    assert_eq!(result.total_pages, 1);
    assert_eq!(
      result.pages[0].body,
      "<!-- keep -->\n<style>p{}</style>\n<p>a</p>\n\
       <link rel=\"stylesheet\" href=\"x.css\">\n\
       <script>go()</script>\n<meta charset=\"utf-8\">"
    );
  }

  #[test]
  fn test_comment_is_its_own_unit() {
    let result = paginate(
      &[chapter("", "<p>a</p><!-- between --><p>b</p>")],
      "",
      &FootnoteMap::new(),
      &mut CountMeasure(1),
    );
    assert_eq!(result.total_pages, 2);
    assert_eq!(result.pages[0].body, "<p>a</p>\n<!-- between -->");
    assert_eq!(result.pages[1].body, "<p>b</p>");
  }

  #[test]
  fn test_footnote_list_counts_against_capacity() {
    let mut footnotes = FootnoteMap::new();
    footnotes.insert("1", "Note");
    // Two lines of body text fit, but not with the footnote below them.
    let result = paginate(
      &[chapter("", "<p>a[^1]</p><p>b</p>")],
      "",
      &footnotes,
      &mut LineMeasure::new(2, 80, 0),
    );
    assert_eq!(result.total_pages, 2);
    assert_eq!(result.pages[0].footnote_ids_used, ["1"]);
    assert!(result.pages[0].footnote_html.contains("fn-def-0-1"));
    assert_eq!(result.pages[1].body, "<p>b</p>");

    let plain = paginate(
      &[chapter("", "<p>a</p><p>b</p>")],
      "",
      &footnotes,
      &mut LineMeasure::new(2, 80, 0),
    );
    assert_eq!(plain.total_pages, 1);
  }
}
