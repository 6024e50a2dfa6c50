use crate::config::Config;
use crate::error::{Error, Result};
use crate::llm::VisionProvider;
use crate::metadata;
use crate::models::{ImageTask, MetadataOutcome, PlacementResult, RunSummary, TaskRecord};
use crate::organizer::FileRelocator;
use crate::processor::ParallelProcessor;
use crate::tagger::TagClient;
use crate::vocabulary::CategoryVocabulary;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything a worker needs to take one image from the input tree to its category
/// folder. Cloning is cheap; each worker gets its own handle.
#[derive(Clone)]
pub struct Pipeline {
    tag_client: TagClient,
    vocabulary: Arc<CategoryVocabulary>,
    relocator: FileRelocator,
    tag_count: usize,
    write_metadata: bool,
}

impl Pipeline {
    pub fn new(tag_client: TagClient, vocabulary: CategoryVocabulary, relocator: FileRelocator) -> Self {
        Self {
            tag_client,
            vocabulary: Arc::new(vocabulary),
            relocator,
            tag_count: crate::constants::DEFAULT_TAG_COUNT,
            write_metadata: true,
        }
    }

    /// Build a pipeline from settings, a vision provider and a loaded vocabulary
    pub fn from_config(
        config: &Config,
        provider: Arc<dyn VisionProvider>,
        vocabulary: CategoryVocabulary,
    ) -> Self {
        let tag_client = TagClient::new(provider)
            .with_fallback_keyword(config.tagging.fallback_keyword.clone())
            .with_retry_backoff(config.retry_backoff());
        let relocator = FileRelocator::new(&config.organizer.output_dir, config.organizer.mode)
            .with_max_tags_in_filename(config.organizer.max_tags_in_filename);

        Self::new(tag_client, vocabulary, relocator)
            .with_tag_count(config.tagging.tag_count)
            .with_metadata(config.organizer.write_metadata)
    }

    /// Number of tags requested per image (default: 8)
    pub fn with_tag_count(mut self, tag_count: usize) -> Self {
        self.tag_count = tag_count;
        self
    }

    /// Turn keyword embedding on or off
    pub fn with_metadata(mut self, enabled: bool) -> Self {
        self.write_metadata = enabled;
        self
    }

    pub fn relocator(&self) -> &FileRelocator {
        &self.relocator
    }

    pub fn vocabulary(&self) -> &CategoryVocabulary {
        &self.vocabulary
    }

    /// Tag one image, place it, then embed its tags into the placed copy.
    ///
    /// Tagging and placement failures fail the image. A metadata failure does not:
    /// the file stays placed and the outcome says why nothing was written.
    pub async fn process_image(&self, task: ImageTask) -> Result<PlacementResult> {
        let tags = self
            .tag_client
            .generate_tags(&task.source_path, self.tag_count, &self.vocabulary)
            .await?;
        debug!("{}: tags {:?}", task.display_name(), tags);

        let relocator = self.relocator.clone();
        let write_metadata = self.write_metadata;
        let source = task.source_path.clone();
        let placed_tags = tags.clone();

        let (destination, metadata) = tokio::task::spawn_blocking(move || {
            place_and_embed(&relocator, source, &placed_tags, write_metadata)
        })
        .await
        .map_err(|e| Error::WorkerPanicked(e.to_string()))??;

        info!(
            "{} -> {}",
            task.source_path.display(),
            destination.display()
        );

        Ok(PlacementResult {
            source: task.source_path,
            destination,
            tags,
            metadata,
        })
    }

    /// Process every task with `processor` and summarize the run
    pub async fn run<P>(&self, tasks: Vec<ImageTask>, processor: &ParallelProcessor, progress: P) -> RunSummary
    where
        P: FnMut(&TaskRecord<PlacementResult>, usize, usize),
    {
        info!(
            "Processing {} images with {} workers (model {})",
            tasks.len(),
            processor.worker_limit(),
            self.tag_client.model()
        );

        let records = processor
            .process_all_with_progress(
                tasks,
                |task| {
                    let pipeline = self.clone();
                    async move { pipeline.process_image(task).await }
                },
                progress,
            )
            .await;

        for record in &records {
            if let Err(e) = &record.outcome {
                warn!("{}: {}", record.task.source_path.display(), e);
            }
        }

        let summary = RunSummary::from_records(records);
        info!(
            "Run finished: {} placed, {} failed ({} cancelled), metadata skipped for {}",
            summary.placed, summary.failed, summary.cancelled, summary.metadata_skipped
        );
        summary
    }
}

fn place_and_embed(
    relocator: &FileRelocator,
    source: PathBuf,
    tags: &[String],
    write_metadata: bool,
) -> Result<(PathBuf, MetadataOutcome)> {
    let destination = relocator.place(&source, tags)?;

    if !write_metadata {
        return Ok((destination, MetadataOutcome::Disabled));
    }

    let outcome = match metadata::embed_tags(&destination, tags) {
        Ok(()) => MetadataOutcome::Written,
        Err(Error::MetadataWriteSkipped { reason, .. }) => {
            warn!("{}: metadata skipped: {}", destination.display(), reason);
            MetadataOutcome::Skipped(reason)
        }
        Err(e) => {
            warn!("{}: metadata skipped: {}", destination.display(), e);
            MetadataOutcome::Skipped(e.to_string())
        }
    };
    Ok((destination, outcome))
}
