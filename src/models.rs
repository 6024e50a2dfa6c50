use crate::error::Error;
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One image found by the scanner, consumed once by the processor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTask {
    /// Full path to the source image
    pub source_path: PathBuf,
    /// Format guessed from the extension
    pub detected_format: ImageFormat,
}

impl ImageTask {
    pub fn new(source_path: PathBuf, detected_format: ImageFormat) -> Self {
        Self {
            source_path,
            detected_format,
        }
    }

    /// File name for display, falls back to the full path
    pub fn display_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source_path.display().to_string())
    }
}

/// How a file reaches its destination.
///
/// `Move` removes the original and cannot be undone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacementMode {
    #[default]
    Copy,
    Move,
}

/// Result of embedding tags into the placed file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum MetadataOutcome {
    Written,
    Skipped(String),
    Disabled,
}

impl MetadataOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, MetadataOutcome::Written)
    }
}

/// Terminal record of a successfully placed image
#[derive(Debug, Clone, Serialize)]
pub struct PlacementResult {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub tags: Vec<String>,
    pub metadata: MetadataOutcome,
}

/// Terminal record of one task: the task itself and what became of it
#[derive(Debug)]
pub struct TaskRecord<T> {
    pub task: ImageTask,
    pub outcome: Result<T, Error>,
}

impl<T> TaskRecord<T> {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Line of the end-of-run report
#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    pub source: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement: Option<PlacementResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// End-of-run summary, sorted by source path
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub placed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub metadata_skipped: usize,
    pub entries: Vec<ReportEntry>,
}

impl RunSummary {
    pub fn from_records(records: Vec<TaskRecord<PlacementResult>>) -> Self {
        let mut summary = RunSummary {
            total: records.len(),
            ..Default::default()
        };

        for record in records {
            let entry = match record.outcome {
                Ok(placement) => {
                    summary.placed += 1;
                    if matches!(placement.metadata, MetadataOutcome::Skipped(_)) {
                        summary.metadata_skipped += 1;
                    }
                    ReportEntry {
                        source: record.task.source_path,
                        placement: Some(placement),
                        error_kind: None,
                        error: None,
                    }
                }
                Err(err) => {
                    summary.failed += 1;
                    if matches!(err, Error::Cancelled) {
                        summary.cancelled += 1;
                    }
                    ReportEntry {
                        source: record.task.source_path,
                        placement: None,
                        error_kind: Some(err.kind().to_string()),
                        error: Some(err.to_string()),
                    }
                }
            };
            summary.entries.push(entry);
        }

        summary.entries.sort_by(|a, b| a.source.cmp(&b.source));
        summary
    }

    pub fn failures(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(|e| e.placement.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(name: &str) -> ImageTask {
        ImageTask::new(PathBuf::from(name), ImageFormat::Jpeg)
    }

    fn placed(name: &str, metadata: MetadataOutcome) -> TaskRecord<PlacementResult> {
        TaskRecord {
            task: task(name),
            outcome: Ok(PlacementResult {
                source: PathBuf::from(name),
                destination: PathBuf::from("out/Nature").join(name),
                tags: vec!["Nature".into()],
                metadata,
            }),
        }
    }

    #[test]
    fn test_display_name() {
        assert_eq!(task("/photos/a.jpg").display_name(), "a.jpg");
    }

    #[test]
    fn test_placement_mode_serde() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: PlacementMode,
        }
        let w: Wrapper = toml::from_str("mode = \"move\"").unwrap();
        assert_eq!(w.mode, PlacementMode::Move);
        assert_eq!(PlacementMode::default(), PlacementMode::Copy);
    }

    #[test]
    fn test_summary_counts_and_sorting() {
        let records = vec![
            placed("c.jpg", MetadataOutcome::Written),
            TaskRecord {
                task: task("b.jpg"),
                outcome: Err(Error::ServiceUnavailable("refused".into())),
            },
            TaskRecord {
                task: task("d.jpg"),
                outcome: Err(Error::Cancelled),
            },
            placed("a.bmp", MetadataOutcome::Skipped("no EXIF in BMP".into())),
        ];

        let summary = RunSummary::from_records(records);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.placed, 2);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.placed + summary.failed, summary.total);
        assert_eq!(summary.cancelled, 1);
        assert_eq!(summary.metadata_skipped, 1);

        let order: Vec<_> = summary.entries.iter().map(|e| e.source.clone()).collect();
        assert_eq!(
            order,
            vec![
                PathBuf::from("a.bmp"),
                PathBuf::from("b.jpg"),
                PathBuf::from("c.jpg"),
                PathBuf::from("d.jpg")
            ]
        );
        assert_eq!(summary.failures().count(), 2);
    }

    #[test]
    fn test_summary_serialization() {
        let summary = RunSummary::from_records(vec![TaskRecord {
            task: task("b.jpg"),
            outcome: Err(Error::InvalidResponse("empty".into())),
        }]);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["failed"], 1);
        assert_eq!(json["entries"][0]["error_kind"], "InvalidResponse");
        assert!(json["entries"][0].get("placement").is_none());
    }
}
