use std::fs;

use color_eyre::eyre::{Context, Result, bail};
use log::{LevelFilter, info};
use quire::{
  cli::{Cli, Commands, SegmentArgs},
  compile::{Session, compile_html_files, to_json, write_output},
};
use quire_config::Config;
use serde::Serialize;

fn main() -> Result<()> {
  color_eyre::install()?;

  let cli = Cli::parse_args();

  // Initialize logging first so we can log during command handling
  env_logger::Builder::new()
    .filter_level(if cli.verbose {
      LevelFilter::Debug
    } else {
      LevelFilter::Info
    })
    .write_style(env_logger::WriteStyle::Always)
    .init();

  if let Commands::Init {
    output,
    format,
    force,
  } = &cli.command
  {
    if output.exists() && !force {
      bail!(
        "Configuration file already exists: {}. Use --force to overwrite.",
        output.display()
      );
    }

    if let Some(parent) = output.parent()
      && !parent.as_os_str().is_empty()
      && !parent.exists()
    {
      fs::create_dir_all(parent).wrap_err_with(|| {
        format!("Failed to create directory: {}", parent.display())
      })?;
      info!("Created directory: {}", parent.display());
    }

    Config::generate_default_config(format, output).wrap_err_with(|| {
      format!("Failed to generate configuration file: {}", output.display())
    })?;

    info!("Configuration file created successfully.");
    return Ok(());
  }

  let mut overrides = cli.config_overrides.clone();
  overrides.extend(cli.flag_overrides());
  let config = Config::load(&cli.config_files, &overrides)
    .wrap_err("Failed to load configuration")?;
  let session = Session::new(&config);

  match &cli.command {
    Commands::Html {
      inputs,
      template,
      output,
      ..
    } => {
      let thread_count = config.jobs.unwrap_or_else(num_cpus::get);
      rayon::ThreadPoolBuilder::new()
        .num_threads(thread_count)
        .build_global()?;

      compile_html_files(
        &session,
        inputs,
        template.as_deref(),
        output.as_deref(),
      )
      .wrap_err("Failed to compile HTML")?;
    },
    Commands::Chapters(args) => {
      let chapters = session
        .chapters(&args.input)
        .wrap_err_with(|| format!("Failed to compile {}", args.input.display()))?;
      emit(args, &chapters)?;
    },
    Commands::Slides(args) => {
      let slides = session
        .slides(&args.input)
        .wrap_err_with(|| format!("Failed to compile {}", args.input.display()))?;
      emit(args, &slides)?;
    },
    Commands::Pages { segment, .. } => {
      let pages = session.pages(&segment.input).wrap_err_with(|| {
        format!("Failed to paginate {}", segment.input.display())
      })?;
      emit(segment, &pages)?;
    },
    Commands::Init { .. } => {},
  }

  Ok(())
}

/// Write a segmented compile result as JSON.
fn emit<T: Serialize>(args: &SegmentArgs, value: &T) -> Result<()> {
  let json = to_json(value, args.pretty)?;
  write_output(args.output.as_deref(), &json).wrap_err("Failed to write output")?;
  if let Some(ref output) = args.output {
    info!("Compiled {} to {}", args.input.display(), output.display());
  }
  Ok(())
}
