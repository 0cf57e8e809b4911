//! File-level compile commands behind the CLI.
use std::{
  collections::HashSet,
  fs,
  io::{self, Write},
  path::{Path, PathBuf},
};

use indexmap::IndexMap;
use log::{debug, error, info};
use quire_commonmark::{
  CompiledChapters,
  CompiledPages,
  CompiledSlides,
  LineMeasure,
  MarkdownProcessor,
  processor::{
    chapters_with_recovery,
    collect_markdown_files,
    pages_with_recovery,
    process_with_recovery,
    slides_with_recovery,
  },
};
use quire_config::Config;
use rayon::prelude::*;
use serde::Serialize;

use crate::{error::QuireError, template::insert_into_template};

/// A Markdown input and the path of its HTML output, relative to the output
/// directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlJob {
  pub source: PathBuf,
  pub target: PathBuf,
}

/// Everything needed to compile documents with one configuration.
#[derive(Clone)]
pub struct Session {
  processor:  MarkdownProcessor,
  attributes: IndexMap<String, String>,
  measure:    LineMeasure,
}

impl Session {
  #[must_use]
  pub fn new(config: &Config) -> Self {
    Self {
      processor:  MarkdownProcessor::new(config.markdown_options()),
      attributes: config.host_attributes(),
      measure:    config.line_measure(),
    }
  }

  /// Compile one file to HTML, optionally placed into `template`.
  ///
  /// # Errors
  ///
  /// Returns an error if the file cannot be read.
  pub fn compile_html(
    &self,
    input: &Path,
    template: Option<&str>,
  ) -> Result<String, QuireError> {
    let source = read_source(input)?;
    let html = process_with_recovery(&self.processor, &source, &self.attributes)
      .html;
    Ok(match template {
      Some(template) => insert_into_template(template, &html),
      None => html,
    })
  }

  /// Compile one file into chapters. A panicking stage yields a single
  /// placeholder chapter instead of aborting the run.
  ///
  /// # Errors
  ///
  /// Returns an error if the file cannot be read.
  pub fn chapters(&self, input: &Path) -> Result<CompiledChapters, QuireError> {
    let source = read_source(input)?;
    Ok(chapters_with_recovery(
      &self.processor,
      &source,
      &self.attributes,
    ))
  }

  /// # Errors
  ///
  /// Returns an error if the file cannot be read.
  pub fn slides(&self, input: &Path) -> Result<CompiledSlides, QuireError> {
    let source = read_source(input)?;
    Ok(slides_with_recovery(&self.processor, &source, &self.attributes))
  }

  /// Paginate one file with the configured [`LineMeasure`].
  ///
  /// # Errors
  ///
  /// Returns an error if the file cannot be read.
  pub fn pages(&self, input: &Path) -> Result<CompiledPages, QuireError> {
    let source = read_source(input)?;
    let mut measure = self.measure;
    Ok(pages_with_recovery(
      &self.processor,
      &source,
      &self.attributes,
      &mut measure,
    ))
  }
}

/// Read a Markdown source, trimmed of surrounding whitespace.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn read_source(path: &Path) -> Result<String, QuireError> {
  let content = fs::read_to_string(path).map_err(|e| {
    QuireError::Input(format!("Failed to read {}: {e}", path.display()))
  })?;
  Ok(content.trim().to_string())
}

/// Expand files and directories into compile jobs.
///
/// Files map to `<stem>.html`; Markdown files found under a directory keep
/// their path relative to it.
///
/// # Errors
///
/// Returns an error if an input does not exist or two inputs would write the
/// same output.
pub fn expand_inputs(inputs: &[PathBuf]) -> Result<Vec<HtmlJob>, QuireError> {
  let mut jobs = Vec::new();

  for input in inputs {
    if input.is_dir() {
      for source in collect_markdown_files(input) {
        let relative = source.strip_prefix(input).unwrap_or(&source);
        jobs.push(HtmlJob {
          target: relative.with_extension("html"),
          source,
        });
      }
    } else if input.is_file() {
      let name = input.file_name().map_or_else(
        || PathBuf::from("index"),
        PathBuf::from,
      );
      jobs.push(HtmlJob {
        target: name.with_extension("html"),
        source: input.clone(),
      });
    } else {
      return Err(QuireError::Input(format!(
        "Input does not exist: {}",
        input.display()
      )));
    }
  }

  let mut seen = HashSet::new();
  for job in &jobs {
    if !seen.insert(&job.target) {
      return Err(QuireError::Input(format!(
        "Several inputs would be written to {}",
        job.target.display()
      )));
    }
  }

  debug!("Expanded {} inputs into {} documents", inputs.len(), jobs.len());
  Ok(jobs)
}

/// Compile inputs to HTML files.
///
/// A single file input goes to `output` or stdout, unless `output` is an
/// existing directory. Everything else is written under the `output`
/// directory in parallel. Returns the number of documents written.
///
/// # Errors
///
/// Returns an error if an input or the template cannot be read, if several
/// inputs are given without an output directory, or if any output cannot be
/// written.
pub fn compile_html_files(
  session: &Session,
  inputs: &[PathBuf],
  template: Option<&Path>,
  output: Option<&Path>,
) -> Result<usize, QuireError> {
  let template = template
    .map(|path| {
      fs::read_to_string(path).map_err(|e| {
        QuireError::Template(format!(
          "Failed to read template {}: {e}",
          path.display()
        ))
      })
    })
    .transpose()?;

  let single_file = match inputs {
    [input] if input.is_file() => Some(input),
    _ => None,
  };
  if let Some(input) = single_file
    && !output.is_some_and(Path::is_dir)
  {
    let html = session.compile_html(input, template.as_deref())?;
    write_output(output, &html)?;
    if let Some(output) = output {
      info!("Compiled {} to {}", input.display(), output.display());
    }
    return Ok(1);
  }

  let Some(output_dir) = output else {
    return Err(QuireError::Input(
      "Compiling several documents needs --output to name a directory"
        .to_string(),
    ));
  };

  let jobs = expand_inputs(inputs)?;
  fs::create_dir_all(output_dir)?;

  let failures: Vec<String> = jobs
    .par_iter()
    .filter_map(|job| {
      let target = output_dir.join(&job.target);
      let result = session
        .compile_html(&job.source, template.as_deref())
        .and_then(|html| write_file(&target, &html));
      match result {
        Ok(()) => {
          debug!("Compiled {} to {}", job.source.display(), target.display());
          None
        },
        Err(e) => {
          error!("{e}");
          Some(job.source.display().to_string())
        },
      }
    })
    .collect();

  if !failures.is_empty() {
    return Err(QuireError::Input(format!(
      "Failed to compile {} of {} documents: {}",
      failures.len(),
      jobs.len(),
      failures.join(", ")
    )));
  }

  info!(
    "Compiled {} documents into {}",
    jobs.len(),
    output_dir.display()
  );
  Ok(jobs.len())
}

/// Serialize a compile result as JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json<T: Serialize>(
  value: &T,
  pretty: bool,
) -> Result<String, QuireError> {
  let json = if pretty {
    serde_json::to_string_pretty(value)?
  } else {
    serde_json::to_string(value)?
  };
  Ok(json)
}

/// Write `content` to `output`, or to stdout followed by a newline.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_output(
  output: Option<&Path>,
  content: &str,
) -> Result<(), QuireError> {
  match output {
    Some(path) => write_file(path, content),
    None => {
      let mut stdout = io::stdout().lock();
      stdout.write_all(content.as_bytes())?;
      if !content.ends_with('\n') {
        stdout.write_all(b"\n")?;
      }
      stdout.flush()?;
      Ok(())
    },
  }
}

fn write_file(path: &Path, content: &str) -> Result<(), QuireError> {
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    fs::create_dir_all(parent)?;
  }
  fs::write(path, content).map_err(|e| {
    QuireError::Io(io::Error::new(
      e.kind(),
      format!("Failed to write {}: {e}", path.display()),
    ))
  })
}
