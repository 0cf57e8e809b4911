use quire_commonmark::{
  MarkdownOptions,
  MarkdownProcessor,
  Measure,
  Parity,
  segment::{split_chapters, split_slides},
};

/// Each paragraph, heading and list item takes one unit of capacity.
struct BlockCount {
  capacity: u32,
  calls:    usize,
}

impl Measure for BlockCount {
  fn extent(&mut self, body_html: &str) -> u32 {
    self.calls += 1;
    let count = ["<p>", "<h1>", "<h2>", "<li>"]
      .iter()
      .map(|tag| body_html.matches(tag).count())
      .sum::<usize>();
    u32::try_from(count).unwrap_or(u32::MAX)
  }

  fn capacity(&self) -> u32 {
    self.capacity
  }
}

fn processor() -> MarkdownProcessor {
  MarkdownProcessor::new(MarkdownOptions::default())
}

#[test]
fn test_chapters_round_trip() {
  let chapters = ["# One\n\nalpha", "# Two\n\n```\n# not a title\n```", "no title"];
  let joined = chapters.join("\n---\n");
  let split: Vec<String> = split_chapters(&joined)
    .into_iter()
    .map(|c| c.markdown)
    .collect();
  assert_eq!(split, chapters);

  let compiled = processor().render_chapters(&joined);
  let titles: Vec<&str> = compiled.chapters.iter().map(|c| c.title.as_str()).collect();
  assert_eq!(titles, ["One", "Two", ""]);
}

#[test]
fn test_chapter_footnotes_are_namespaced() {
  let markdown = "A[^1]\n---\nB[^1] C[^2]\n\n[^1]: First\n[^2]: Second";
  let compiled = processor().render_chapters(markdown);
  assert_eq!(compiled.chapters.len(), 2);

  let first = &compiled.chapters[0].html;
  assert!(first.contains("id=\"fn-ref-0-1\""));
  assert!(first.contains("<li id=\"fn-def-0-1\">First"));
  assert!(!first.contains("Second"));

  let second = &compiled.chapters[1].html;
  assert!(second.contains("id=\"fn-ref-1-1\""));
  assert!(second.contains("<li id=\"fn-def-1-2\">Second"));
}

#[test]
fn test_slides_split_on_rules() {
  let compiled = processor().render_slides("# Intro\n\n***\n\nMiddle\n\n* * *\n\n***\n\nEnd");
  let html: Vec<&str> = compiled.slides.iter().map(|s| s.html.as_str()).collect();
  assert_eq!(html, ["<h1>Intro</h1>", "<p>Middle</p>", "<p>End</p>"]);
  let indices: Vec<usize> = compiled.slides.iter().map(|s| s.index).collect();
  assert_eq!(indices, [1, 2, 3]);
  assert_eq!(split_slides(&html.join("<hr>")), html);
}

#[test]
fn test_pagination_keeps_every_unit() {
  let mut markdown = String::from("---\ntitle: Book\n---\n");
  for chapter in 0..3 {
    markdown.push_str(&format!("# Chapter {chapter}\n\n"));
    for item in 0..5 {
      markdown.push_str(&format!("Paragraph {chapter}-{item}\n\n"));
    }
    markdown.push_str("- one\n- two\n- three\n---\n");
  }

  let mut measure = BlockCount {
    capacity: 3,
    calls:    0,
  };
  let compiled = processor().paginate(&markdown, &mut measure);
  let pagination = compiled.pagination;
  assert!(measure.calls > 0);
  assert_eq!(pagination.total_pages, pagination.pages.len());

  let joined: String = pagination.pages.iter().map(|p| p.body.as_str()).collect();
  for chapter in 0..3 {
    assert_eq!(joined.matches(&format!("<h1>Chapter {chapter}</h1>")).count(), 1);
    for item in 0..5 {
      let needle = format!("<p>Paragraph {chapter}-{item}</p>");
      assert_eq!(joined.matches(&needle).count(), 1, "{needle}");
    }
  }
  assert_eq!(joined.matches("<li>one</li>").count(), 3);
  assert_eq!(joined.matches("<li>three</li>").count(), 3);

  for (position, page) in pagination.pages.iter().enumerate() {
    assert_eq!(page.index, position + 1);
    match page.parity {
      Parity::Odd => assert!(page.header_text.starts_with("Chapter")),
      Parity::Even => assert_eq!(page.header_text, "Book"),
    }
  }

  // Chapters never share a page
  for pair in pagination.pages.windows(2) {
    if pair[0].chapter != pair[1].chapter {
      assert!(pair[1].body.starts_with("<h1>"));
    }
  }
}

#[test]
fn test_oversized_unit_does_not_stall() {
  let mut measure = BlockCount {
    capacity: 0,
    calls:    0,
  };
  let compiled = processor().paginate("a\n\nb\n\nc", &mut measure);
  assert_eq!(compiled.pagination.total_pages, 3);
}

#[test]
fn test_page_footnotes_follow_references() {
  let mut measure = BlockCount {
    capacity: 1,
    calls:    0,
  };
  let compiled = processor().paginate("x[^a]\n\ny\n\nz[^a]\n\n[^a]: Note", &mut measure);
  let pages = &compiled.pagination.pages;
  assert_eq!(pages.len(), 3);
  assert_eq!(pages[0].footnote_ids_used, ["a"]);
  assert!(pages[1].footnote_ids_used.is_empty());
  assert!(pages[1].footnote_html.is_empty());
  assert!(pages[2].footnote_html.contains("fn-def-2-a"));
}
