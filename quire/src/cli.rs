use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Command line interface for quire
#[derive(Parser, Debug)]
#[command(author, version, about = "quire: extended Markdown compiler")]
pub struct Cli {
  /// Subcommand to execute (see [`Commands`])
  #[command(subcommand)]
  pub command: Commands,

  /// Enable verbose debug logging
  #[arg(short, long, global = true)]
  pub verbose: bool,

  /// Path to configuration file(s) (TOML or JSON, can be specified multiple
  /// times) Multiple files are merged in order, with later files overriding
  /// earlier ones
  #[arg(
    short = 'c',
    long = "config-file",
    global = true,
    action = clap::ArgAction::Append
  )]
  pub config_files: Vec<PathBuf>,

  /// Override configuration values (KEY=VALUE format, can be used multiple
  /// times)
  #[arg(long = "config", global = true, action = clap::ArgAction::Append)]
  pub config_overrides: Vec<String>,
}

/// All supported subcommands for the quire CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
  /// Initialize a new quire configuration file
  Init {
    /// Path to create the configuration file at
    #[arg(short, long, default_value = "quire.toml")]
    output: PathBuf,

    /// Format of the configuration file.
    #[arg(short = 'F', long, default_value = "toml", value_parser = ["toml", "json"])]
    format: String,

    /// Force overwrite if file already exists
    #[arg(short, long)]
    force: bool,
  },

  /// Compile Markdown to HTML.
  ///
  /// A single input file is written to `--output` or stdout. Several inputs,
  /// or a directory, need `--output` to name a directory that receives one
  /// `.html` file per document.
  Html {
    /// Markdown files or directories containing them.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// HTML template file with a `<mark-down>` element to replace.
    #[arg(short, long)]
    template: Option<PathBuf>,

    /// Output file, or output directory for several inputs.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of threads to use for parallel processing.
    #[arg(short = 'p', long = "jobs")]
    jobs: Option<usize>,
  },

  /// Compile a document split into chapters at `---` lines, as JSON.
  Chapters(SegmentArgs),

  /// Compile a document into slides split at horizontal rules, as JSON.
  Slides(SegmentArgs),

  /// Lay a document out on fixed-size pages, as JSON.
  Pages {
    #[command(flatten)]
    segment: SegmentArgs,

    /// Lines available on one page.
    #[arg(long)]
    lines_per_page: Option<u32>,

    /// Characters that fit on one line.
    #[arg(long)]
    chars_per_line: Option<u32>,

    /// Extra lines charged after every block element.
    #[arg(long)]
    block_spacing: Option<u32>,
  },
}

/// Input and output shared by the segmenting subcommands.
#[derive(Args, Debug)]
pub struct SegmentArgs {
  /// Markdown file to compile.
  pub input: PathBuf,

  /// Output file (default: stdout).
  #[arg(short, long)]
  pub output: Option<PathBuf>,

  /// Pretty-print the JSON output.
  #[arg(long)]
  pub pretty: bool,
}

impl Cli {
  /// Parse command line arguments into a [`Cli`] struct.
  #[must_use]
  pub fn parse_args() -> Self {
    Self::parse()
  }

  /// Configuration overrides implied by subcommand flags, applied after the
  /// `--config` ones.
  #[must_use]
  pub fn flag_overrides(&self) -> Vec<String> {
    let mut overrides = Vec::new();
    match &self.command {
      Commands::Html {
        jobs: Some(jobs), ..
      } => overrides.push(format!("jobs={jobs}")),
      Commands::Pages {
        lines_per_page,
        chars_per_line,
        block_spacing,
        ..
      } => {
        let fields = [
          ("lines_per_page", lines_per_page),
          ("chars_per_line", chars_per_line),
          ("block_spacing", block_spacing),
        ];
        for (key, value) in fields {
          if let Some(value) = value {
            overrides.push(format!("pagination.{key}={value}"));
          }
        }
      },
      _ => {},
    }
    overrides
  }
}

#[cfg(test)]
mod tests {
  use clap::CommandFactory;

  use super::*;

  #[test]
  fn test_cli_definition_is_valid() {
    Cli::command().debug_assert();
  }

  #[test]
  fn test_flag_overrides() {
    let cli = Cli::parse_from([
      "quire",
      "pages",
      "doc.md",
      "--lines-per-page",
      "30",
      "--block-spacing",
      "0",
      "--config",
      "title=X",
    ]);
    assert_eq!(cli.config_overrides, vec!["title=X".to_string()]);
    assert_eq!(cli.flag_overrides(), vec![
      "pagination.lines_per_page=30".to_string(),
      "pagination.block_spacing=0".to_string(),
    ]);

    let cli = Cli::parse_from(["quire", "-v", "html", "a.md", "b.md", "-p", "2"]);
    assert!(cli.verbose);
    assert_eq!(cli.flag_overrides(), vec!["jobs=2".to_string()]);
  }
}
