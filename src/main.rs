mod app;
mod color;
mod config;
mod data;
mod error;
mod mask;
mod pipeline;
mod publish;
mod state;
mod ui;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use config::Config;
use pipeline::Pipeline;

/// Decode echosounder school masks and push them to LSSS.
#[derive(Debug, Parser)]
#[command(name = "echomask", version, about)]
struct Cli {
    /// Mask files to process. Defaults to the first configured file.
    files: Vec<PathBuf>,

    /// Process every configured file instead of just the first.
    #[arg(long, conflicts_with = "files")]
    all: bool,

    /// JSON configuration file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// LSSS API root.
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Write `<stem>.png` beside each input file.
    #[arg(long)]
    save_png: bool,

    /// Open the interactive viewer for each file.
    #[arg(long)]
    show: bool,

    /// Skip posting masks to LSSS.
    #[arg(long)]
    no_publish: bool,

    /// Print each region's ping records as JSON.
    #[arg(long)]
    print_json: bool,
}

impl Cli {
    /// Layer command-line overrides on top of `config`.
    fn apply(&self, config: &mut Config) {
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if self.save_png {
            config.outputs.save_image = true;
        }
        if self.show {
            config.outputs.show = true;
        }
        if self.no_publish {
            config.outputs.publish = false;
        }
    }

    fn select_files(&self, config: &Config) -> Vec<PathBuf> {
        if !self.files.is_empty() {
            self.files.clone()
        } else if self.all {
            config.files.clone()
        } else {
            config.files.iter().take(1).cloned().collect()
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    cli.apply(&mut config);
    config.validate()?;

    let files = cli.select_files(&config);
    if files.is_empty() {
        anyhow::bail!("no input files given or configured");
    }
    if !config.outputs.any() && !cli.print_json {
        log::warn!("all outputs disabled; files will only be decoded");
    }

    let mut pipeline = Pipeline::from_config(&config, cli.print_json)?;
    log::info!(
        "outputs: [{}], files: {}",
        pipeline.sink_names().join(", "),
        files.len()
    );

    for path in &files {
        let survey = pipeline.run_file(path)?;
        log::info!(
            "{}: {} regions, {} mask pings",
            path.display(),
            survey.len(),
            survey.ping_count()
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
