#![allow(clippy::expect_used, reason = "Fine in tests")]
use std::{fs, path::PathBuf};

use quire::compile::{Session, compile_html_files, to_json};
use quire_config::Config;
use serde_json::Value;
use tempfile::tempdir;

fn session_with(overrides: &[&str]) -> Session {
  let mut config = Config::default();
  let overrides: Vec<String> =
    overrides.iter().map(|s| (*s).to_string()).collect();
  config
    .apply_overrides(&overrides)
    .expect("Failed to apply overrides in test");
  Session::new(&config)
}

#[test]
fn test_single_file_with_template() {
  let temp_dir = tempdir().expect("Failed to create temp dir in test");
  let input = temp_dir.path().join("doc.md");
  let template = temp_dir.path().join("page.html");
  let output = temp_dir.path().join("out/doc.html");

  fs::write(&input, "\n---\ntitle: Demo\n---\n# $title\n\n:::note\nHello\n:::\n")
    .expect("Failed to write input in test");
  fs::write(
    &template,
    "<html><body><mark-down>loading</mark-down></body></html>",
  )
  .expect("Failed to write template in test");

  let written = compile_html_files(
    &session_with(&[]),
    &[input],
    Some(&template),
    Some(&output),
  )
  .expect("Failed to compile in test");
  assert_eq!(written, 1);

  let html = fs::read_to_string(&output).expect("Failed to read output");
  assert!(html.starts_with("<html><body><h1>Demo</h1>"));
  assert!(html.contains("<aside class=\"note\">"));
  assert!(html.ends_with("</body></html>"));
  assert!(!html.contains("loading"));
}

#[test]
fn test_directory_input_mirrors_tree() {
  let temp_dir = tempdir().expect("Failed to create temp dir in test");
  let docs = temp_dir.path().join("docs");
  let out = temp_dir.path().join("site");
  fs::create_dir_all(docs.join("guide")).expect("Failed to create dir");
  fs::write(docs.join("index.md"), "# Home\n\nSee [[guide/start]].")
    .expect("Failed to write index.md");
  fs::write(docs.join("guide/start.md"), "# Start")
    .expect("Failed to write start.md");

  let written = compile_html_files(&session_with(&[]), &[docs], None, Some(&out))
    .expect("Failed to compile in test");
  assert_eq!(written, 2);

  let index = fs::read_to_string(out.join("index.html"))
    .expect("Failed to read index.html");
  assert!(index.contains("<h1>Home</h1>"));
  assert!(index.contains("guide/start.html"));
  assert!(out.join("guide/start.html").is_file());
}

#[test]
fn test_several_inputs_need_output_directory() {
  let temp_dir = tempdir().expect("Failed to create temp dir in test");
  let a = temp_dir.path().join("a.md");
  let b = temp_dir.path().join("b.md");
  fs::write(&a, "A").expect("Failed to write a.md");
  fs::write(&b, "B").expect("Failed to write b.md");

  let err = compile_html_files(&session_with(&[]), &[a, b], None, None)
    .expect_err("Several inputs without --output should fail");
  assert!(err.to_string().contains("--output"));
}

#[test]
fn test_missing_template_is_reported() {
  let temp_dir = tempdir().expect("Failed to create temp dir in test");
  let input = temp_dir.path().join("a.md");
  fs::write(&input, "A").expect("Failed to write a.md");

  let err = compile_html_files(
    &session_with(&[]),
    &[input],
    Some(&temp_dir.path().join("missing.html")),
    None,
  )
  .expect_err("Missing template should fail");
  assert!(err.to_string().contains("Failed to read template"));
}

#[test]
fn test_config_overrides_reach_the_compiler() {
  let temp_dir = tempdir().expect("Failed to create temp dir in test");
  let input = temp_dir.path().join("a.md");
  let out = temp_dir.path().join("out");
  fs::create_dir_all(&out).expect("Failed to create dir");
  fs::write(&input, "[[Home]] by {{author}}\n<b>raw</b>")
    .expect("Failed to write a.md");

  compile_html_files(
    &session_with(&[
      "markdown.allow_html=false",
      "markdown.wikilinks_search_prefix=q",
      "attributes.author=Ada",
    ]),
    &[input],
    None,
    Some(&out),
  )
  .expect("Failed to compile in test");

  let html =
    fs::read_to_string(out.join("a.html")).expect("Failed to read a.html");
  assert!(html.contains("#&amp;q=Home"));
  assert!(html.contains("by Ada"));
  assert!(html.contains("&lt;b&gt;raw&lt;/b&gt;"));
}

#[test]
fn test_chapters_json() {
  let temp_dir = tempdir().expect("Failed to create temp dir in test");
  let input = temp_dir.path().join("book.md");
  fs::write(&input, "---\ntitle: Book\n---\n# One\n\nFirst.\n---\n# Two\n")
    .expect("Failed to write book.md");

  let chapters = session_with(&[])
    .chapters(&input)
    .expect("Failed to compile chapters");
  let json: Value = serde_json::from_str(
    &to_json(&chapters, false).expect("Failed to serialize"),
  )
  .expect("Output is not JSON");

  assert_eq!(json["metadata"]["title"], "Book");
  assert_eq!(json["chapters"][0]["title"], "One");
  assert_eq!(json["chapters"][1]["title"], "Two");
}

#[test]
fn test_pages_json_uses_configured_measure() {
  let temp_dir = tempdir().expect("Failed to create temp dir in test");
  let input: PathBuf = temp_dir.path().join("book.md");
  let paragraphs: Vec<String> =
    (1..=6).map(|i| format!("Paragraph {i}.")).collect();
  fs::write(&input, format!("# Title\n\n{}", paragraphs.join("\n\n")))
    .expect("Failed to write book.md");

  // One line of text plus one of spacing per block, four lines per page.
  let pages = session_with(&["pagination.lines_per_page=4"])
    .pages(&input)
    .expect("Failed to paginate");
  let json: Value =
    serde_json::from_str(&to_json(&pages, true).expect("Failed to serialize"))
      .expect("Output is not JSON");

  assert_eq!(json["total_pages"], 4);
  assert_eq!(json["pages"][0]["parity"], "odd");
  assert_eq!(json["pages"][0]["header_text"], "Title");
  assert_eq!(json["pages"][1]["parity"], "even");
}

#[test]
fn test_slides_json() {
  let temp_dir = tempdir().expect("Failed to create temp dir in test");
  let input = temp_dir.path().join("deck.md");
  fs::write(&input, "# Intro\n\n***\n\nSecond[^n]\n\n[^n]: Aside")
    .expect("Failed to write deck.md");

  let slides = session_with(&[])
    .slides(&input)
    .expect("Failed to compile slides");
  let json: Value = serde_json::from_str(
    &to_json(&slides, false).expect("Failed to serialize"),
  )
  .expect("Output is not JSON");

  assert_eq!(json["slides"].as_array().map(Vec::len), Some(2));
  assert_eq!(json["slides"][1]["footnote_ids_used"][0], "n");
  let html = json["slides"][1]["html"].as_str().unwrap_or_default();
  assert!(!html.contains("Critical error"));
  assert!(html.contains("Second"));
}
