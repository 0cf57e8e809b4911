//! Core implementation of the Markdown processor.
//!
//! Every compile runs the same stages in order:
//!
//! 1. `{{key}}` host attribute substitution
//! 2. front matter extraction
//! 3. `$name` metadata substitution
//! 4. footnote definition extraction
//! 5. block tokenizing (block rules, then the host parser)
//! 6. core passes: abbreviation definitions, task lists, quote attribution
//! 7. inline passes: wikilinks, then abbreviations
//! 8. rendering with the diagram overrides
//!
//! Chapter, slide and page compiles split the document between stages 4 and 5
//! (chapters) or after stage 8 (slides), so footnotes and abbreviations are
//! always document-wide.
use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use indexmap::IndexMap;
use log::{debug, trace};
use walkdir::WalkDir;

use super::types::{MarkdownOptions, MarkdownProcessor};
use crate::{
  block::BlockTokenizer,
  diagram,
  front_matter::{Metadata, extract_front_matter},
  host::{ComrakHost, HostOptions},
  node::Node,
  passes::{
    AbbreviationPass,
    AbbreviationSet,
    InlinePass,
    WikilinkPass,
    apply_attribution,
    apply_task_lists,
    collect_abbreviations,
    run_inline_passes,
  },
  render::Renderer,
  segment::{
    FootnoteMap,
    Measure,
    apply_footnotes,
    extract_footnote_definitions,
    paginate,
    split_chapters,
    split_slides,
  },
  types::{
    Chapter,
    CompiledChapters,
    CompiledDocument,
    CompiledPages,
    CompiledSlides,
    Slide,
  },
  variables::{substitute_attributes, substitute_variables},
};

/// Host attribute consulted when no search prefix is configured.
pub const WIKILINKS_SEARCH_PREFIX_ATTRIBUTE: &str = "wikilinks-search-prefix";

/// Document state shared by every unit of one compile.
struct Prepared {
  metadata:  Metadata,
  body:      String,
  footnotes: FootnoteMap,
  wikilinks: WikilinkPass,
  title:     String,
}

impl MarkdownProcessor {
  /// Create a new `MarkdownProcessor` with the given options.
  #[must_use]
  pub fn new(options: MarkdownOptions) -> Self {
    let host = ComrakHost::new(HostOptions {
      tables:        options.gfm,
      strikethrough: options.gfm,
      autolink:      options.gfm,
      smart:         options.smart_punctuation,
    });
    let tokenizer = BlockTokenizer::with_default_rules(Box::new(host));

    let mut renderer = Renderer::new(options.hard_breaks, options.allow_html);
    diagram::register(&mut renderer);

    Self {
      options,
      tokenizer: Arc::new(tokenizer),
      renderer: Arc::new(renderer),
    }
  }

  /// Access processor options.
  #[must_use]
  pub const fn options(&self) -> &MarkdownOptions {
    &self.options
  }

  /// Compile a whole document.
  #[must_use]
  pub fn render(&self, markdown: &str) -> CompiledDocument {
    self.render_with(markdown, &IndexMap::new())
  }

  /// Compile a whole document with host attributes for `{{key}}`.
  #[must_use]
  pub fn render_with(
    &self,
    markdown: &str,
    attributes: &IndexMap<String, String>,
  ) -> CompiledDocument {
    let prepared = self.prepare(markdown, attributes);
    let html = self
      .compile_units(&[prepared.body.as_str()], &prepared.wikilinks)
      .into_iter()
      .next()
      .unwrap_or_default();

    CompiledDocument {
      html:     apply_footnotes(&html, 0, &prepared.footnotes).into_html(),
      metadata: prepared.metadata,
    }
  }

  /// Compile a document split into chapters at `---` lines.
  #[must_use]
  pub fn render_chapters(&self, markdown: &str) -> CompiledChapters {
    self.render_chapters_with(markdown, &IndexMap::new())
  }

  #[must_use]
  pub fn render_chapters_with(
    &self,
    markdown: &str,
    attributes: &IndexMap<String, String>,
  ) -> CompiledChapters {
    let prepared = self.prepare(markdown, attributes);
    let chapters = self
      .compile_chapters(&prepared)
      .into_iter()
      .enumerate()
      .map(|(position, chapter)| {
        Chapter {
          html:  apply_footnotes(&chapter.html, position, &prepared.footnotes)
            .into_html(),
          title: chapter.title,
        }
      })
      .collect();

    CompiledChapters {
      metadata: prepared.metadata,
      chapters,
    }
  }

  /// Compile a document and split the HTML into slides at `<hr>`.
  #[must_use]
  pub fn render_slides(&self, markdown: &str) -> CompiledSlides {
    self.render_slides_with(markdown, &IndexMap::new())
  }

  #[must_use]
  pub fn render_slides_with(
    &self,
    markdown: &str,
    attributes: &IndexMap<String, String>,
  ) -> CompiledSlides {
    let prepared = self.prepare(markdown, attributes);
    let html = self
      .compile_units(&[prepared.body.as_str()], &prepared.wikilinks)
      .into_iter()
      .next()
      .unwrap_or_default();

    let slides = split_slides(&html)
      .into_iter()
      .enumerate()
      .map(|(position, fragment)| {
        let unit = apply_footnotes(&fragment, position, &prepared.footnotes);
        Slide {
          index:             position + 1,
          footnote_ids_used: unit.footnote_ids_used.clone(),
          html:              unit.into_html(),
        }
      })
      .collect::<Vec<_>>();
    debug!("Compiled {} slides", slides.len());

    CompiledSlides {
      metadata: prepared.metadata,
      slides,
    }
  }

  /// Compile a document into chapters and lay them out on pages.
  ///
  /// The document title used for even page headers is the `title` metadata
  /// key, falling back to the `title` host attribute.
  #[must_use]
  pub fn paginate(
    &self,
    markdown: &str,
    measure: &mut dyn Measure,
  ) -> CompiledPages {
    self.paginate_with(markdown, &IndexMap::new(), measure)
  }

  #[must_use]
  pub fn paginate_with(
    &self,
    markdown: &str,
    attributes: &IndexMap<String, String>,
    measure: &mut dyn Measure,
  ) -> CompiledPages {
    let prepared = self.prepare(markdown, attributes);
    let chapters = self.compile_chapters(&prepared);
    let pagination =
      paginate(&chapters, &prepared.title, &prepared.footnotes, measure);

    CompiledPages {
      metadata: prepared.metadata,
      pagination,
    }
  }

  /// Run the text stages shared by every compile mode.
  fn prepare(
    &self,
    markdown: &str,
    attributes: &IndexMap<String, String>,
  ) -> Prepared {
    let source = substitute_attributes(markdown, attributes);
    let (metadata, body) = extract_front_matter(&source);
    let body = substitute_variables(body, &metadata);
    let (footnotes, body) = extract_footnote_definitions(&body);
    trace!(
      "Prepared document with {} metadata keys and {} footnotes",
      metadata.len(),
      footnotes.len()
    );

    let prefix = self.options.wikilinks_search_prefix.clone().or_else(|| {
      attributes.get(WIKILINKS_SEARCH_PREFIX_ATTRIBUTE).cloned()
    });
    let wikilinks = WikilinkPass::new(prefix);
    let footnotes = footnotes
      .map_contents(|content| self.render_fragment(content, &wikilinks));

    let title = metadata
      .get_string("title")
      .or_else(|| attributes.get("title").cloned())
      .unwrap_or_default();

    Prepared {
      metadata,
      body,
      footnotes,
      wikilinks,
      title,
    }
  }

  fn compile_chapters(&self, prepared: &Prepared) -> Vec<Chapter> {
    let sources = split_chapters(&prepared.body);
    let markdown: Vec<&str> =
      sources.iter().map(|c| c.markdown.as_str()).collect();
    let htmls = self.compile_units(&markdown, &prepared.wikilinks);

    sources
      .into_iter()
      .zip(htmls)
      .map(|(source, html)| {
        Chapter {
          title: source.title,
          html,
        }
      })
      .collect()
  }

  /// Tokenize and render several sources that form one document.
  ///
  /// Abbreviations defined in any source apply to all of them.
  fn compile_units(
    &self,
    sources: &[&str],
    wikilinks: &WikilinkPass,
  ) -> Vec<String> {
    let mut streams: Vec<Vec<Node>> =
      sources.iter().map(|s| self.tokenizer.tokenize(s)).collect();

    let mut abbreviations = AbbreviationSet::new();
    for nodes in &mut streams {
      abbreviations.merge(collect_abbreviations(nodes));
    }
    let abbreviation_pass = AbbreviationPass::new(&abbreviations);

    streams
      .into_iter()
      .map(|mut nodes| {
        if self.options.gfm {
          apply_task_lists(&mut nodes);
        }
        apply_attribution(&mut nodes);
        let passes: [&dyn InlinePass; 2] = [wikilinks, &abbreviation_pass];
        run_inline_passes(&mut nodes, &passes);
        self.renderer.render(&nodes)
      })
      .collect()
  }

  /// Render a short Markdown fragment, unwrapping a lone paragraph.
  fn render_fragment(
    &self,
    markdown: &str,
    wikilinks: &WikilinkPass,
  ) -> String {
    let mut nodes = self.tokenizer.tokenize(markdown);
    let passes: [&dyn InlinePass; 1] = [wikilinks];
    run_inline_passes(&mut nodes, &passes);
    let html = self.renderer.render(&nodes);
    let html = html.trim();

    html
      .strip_prefix("<p>")
      .and_then(|rest| rest.strip_suffix("</p>"))
      .filter(|inner| !inner.contains("<p>"))
      .unwrap_or(html)
      .to_string()
  }
}

/// Collect all Markdown files under `input_dir`, sorted.
#[must_use]
pub fn collect_markdown_files(input_dir: &Path) -> Vec<PathBuf> {
  let mut files: Vec<PathBuf> = WalkDir::new(input_dir)
    .follow_links(true)
    .into_iter()
    .filter_map(Result::ok)
    .filter(|entry| {
      entry.file_type().is_file()
        && entry
          .path()
          .extension()
          .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
    })
    .map(walkdir::DirEntry::into_path)
    .collect();
  files.sort();
  trace!("Found {} markdown files in {}", files.len(), input_dir.display());
  files
}
