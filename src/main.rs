use anyhow::{Context, Result};
use choucroute::{
    config::Config,
    llm::OllamaVisionProvider,
    models::{PlacementMode, RunSummary},
    pipeline::Pipeline,
    processor::{CancelFlag, ParallelProcessor},
    scanner::ImageScanner,
    vocabulary::CategoryVocabulary,
};
use clap::Parser;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "choucroute")]
#[command(about = "Tag images with a local vision model and sort them into category folders")]
#[command(version)]
struct Cli {
    /// Directory containing the images to process
    #[arg(value_name = "INPUT_DIR")]
    input_dir: PathBuf,

    /// Vision model served by Ollama (overrides config)
    #[arg(short, long)]
    model: Option<String>,

    /// Number of tags per image, the first one being the category
    #[arg(short, long)]
    tags: Option<usize>,

    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of images processed at once
    #[arg(short, long)]
    workers: Option<usize>,

    /// Move files instead of copying them
    #[arg(long = "move")]
    move_files: bool,

    /// Category list, one per line
    #[arg(long)]
    categories: Option<PathBuf>,

    /// Settings file (default: config/settings.toml, ./choucroute.toml, ~/.config/choucroute/settings.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Ollama base URL (overrides config)
    #[arg(long)]
    ollama_url: Option<String>,

    /// Seconds to wait for one LLM answer
    #[arg(long)]
    timeout: Option<u64>,

    /// Only look at direct children of INPUT_DIR
    #[arg(long)]
    non_recursive: bool,

    /// Do not write tags into the placed files
    #[arg(long)]
    no_metadata: bool,

    /// Write the run summary as JSON to this file
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Skip the confirmation prompt for --move
    #[arg(short, long)]
    yes: bool,
}

impl Cli {
    fn apply_to(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.ollama.model = model.clone();
        }
        if let Some(url) = &self.ollama_url {
            config.ollama.url = url.clone();
        }
        if let Some(timeout) = self.timeout {
            config.ollama.timeout_secs = timeout;
        }
        if let Some(tags) = self.tags {
            config.tagging.tag_count = tags;
        }
        if let Some(categories) = &self.categories {
            config.tagging.categories = categories.clone();
        }
        if let Some(output) = &self.output {
            config.organizer.output_dir = output.clone();
        }
        if self.move_files {
            config.organizer.mode = PlacementMode::Move;
        }
        if self.no_metadata {
            config.organizer.write_metadata = false;
        }
        if self.non_recursive {
            config.scan.recursive = false;
        }
        if let Some(workers) = self.workers {
            config.processing.workers = workers;
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "choucroute=debug" } else { "choucroute=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load().context("Failed to load configuration")?,
    };
    cli.apply_to(&mut config);
    config.validate()?;

    let vocabulary = CategoryVocabulary::from_file(&config.tagging.categories)?;
    info!(
        "Loaded {} categories from {} (fallback: {})",
        vocabulary.len(),
        config.tagging.categories.display(),
        vocabulary.fallback()
    );

    let scanner = ImageScanner::new(&cli.input_dir, config.scan.recursive)?
        .with_exclude(&config.organizer.output_dir);
    let tasks = scanner.collect_sorted();
    if tasks.is_empty() {
        println!("No images found in {}", cli.input_dir.display());
        return Ok(());
    }
    println!("Found {} images in {}", tasks.len(), cli.input_dir.display());

    let provider = OllamaVisionProvider::from_config(&config)?;
    match provider.has_model().await {
        Ok(true) => info!("Using model {} at {}", config.ollama.model, provider.base_url()),
        Ok(false) => warn!(
            "Model {} is not listed by {}; run `ollama pull {}` first",
            config.ollama.model,
            provider.base_url(),
            config.ollama.model
        ),
        Err(e) => warn!("Ollama health check failed: {}", e),
    }

    if config.organizer.mode == PlacementMode::Move && !cli.yes {
        let proceed = Confirm::new()
            .with_prompt(format!(
                "Move {} images out of {}? Originals will not be kept.",
                tasks.len(),
                cli.input_dir.display()
            ))
            .default(false)
            .interact()
            .context("Failed to read user input")?;

        if !proceed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    std::fs::create_dir_all(&config.organizer.output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            config.organizer.output_dir.display()
        )
    })?;

    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if cancel.signal() {
                    warn!("Interrupted again, exiting without waiting");
                    std::process::exit(130);
                }
                warn!("Interrupted, finishing images in progress (Ctrl-C again to quit)");
            }
        });
    }

    let processor = ParallelProcessor::new(config.processing.workers).with_cancel_flag(cancel);
    let pipeline = Pipeline::from_config(&config, Arc::new(provider), vocabulary);

    let pb = ProgressBar::new(tasks.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} images ({msg})")
            .context("Invalid progress bar template")?
            .progress_chars("#>-"),
    );

    let summary = pipeline
        .run(tasks, &processor, |record, _done, _total| {
            pb.set_message(record.task.display_name());
            pb.inc(1);
        })
        .await;
    pb.finish_with_message("done");

    print_summary(&summary, &config);

    if let Some(report) = &cli.report {
        let json = serde_json::to_string_pretty(&summary).context("Failed to serialize report")?;
        std::fs::write(report, json)
            .with_context(|| format!("Failed to write report: {}", report.display()))?;
        println!("Report written to {}", report.display());
    }

    Ok(())
}

fn print_summary(summary: &RunSummary, config: &Config) {
    println!();
    println!(
        "{} images: {} placed in {}, {} failed",
        summary.total,
        summary.placed,
        config.organizer.output_dir.display(),
        summary.failed
    );
    if summary.cancelled > 0 {
        println!("{} images were not started (interrupted)", summary.cancelled);
    }
    if summary.metadata_skipped > 0 {
        println!("Tags not embedded in {} files (unsupported format or metadata)", summary.metadata_skipped);
    }

    for entry in summary.failures() {
        println!(
            "  ✗ {} [{}] {}",
            entry.source.display(),
            entry.error_kind.as_deref().unwrap_or("Error"),
            entry.error.as_deref().unwrap_or("")
        );
    }
}
