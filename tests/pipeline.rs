use async_trait::async_trait;
use choucroute::{
    metadata, CancelFlag, CategoryVocabulary, Error, FileRelocator, ImageScanner, ParallelProcessor,
    Pipeline, PlacementMode, Result, TagClient, VisionProvider,
};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Answers by file name; unknown names get a refused connection
struct ScriptedProvider {
    answers: HashMap<String, String>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(answers: &[(&str, &str)]) -> Self {
        Self {
            answers: answers
                .iter()
                .map(|(name, answer)| (name.to_string(), answer.to_string()))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl VisionProvider for ScriptedProvider {
    async fn describe(&self, image_path: &Path, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(prompt.contains("Nature, Personnes, Nourriture, Autres"));

        let name = image_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.answers
            .get(&name)
            .cloned()
            .ok_or_else(|| Error::ServiceUnavailable("connection refused".into()))
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

fn write_image(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    image::RgbImage::from_pixel(12, 12, image::Rgb([90, 90, 200]))
        .save(path)
        .unwrap();
}

fn vocabulary() -> CategoryVocabulary {
    CategoryVocabulary::parse("Nature\nPersonnes\nNourriture\nAutres\n").unwrap()
}

fn build_pipeline(provider: Arc<ScriptedProvider>, output: &Path, mode: PlacementMode) -> Pipeline {
    let client = TagClient::new(provider).with_retry_backoff(Duration::from_millis(1));
    Pipeline::new(client, vocabulary(), FileRelocator::new(output, mode)).with_tag_count(4)
}

#[tokio::test]
async fn test_full_run_copy_mode() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_image(&input.path().join("a.jpg"));
    write_image(&input.path().join("trip/b.png"));
    write_image(&input.path().join("trip/c.bmp"));
    write_image(&input.path().join("down.jpg"));
    fs::write(input.path().join("notes.txt"), b"not an image").unwrap();

    let provider = Arc::new(ScriptedProvider::new(&[
        ("a.jpg", "Nature, Montagne, Lac, Neige"),
        ("b.png", "Mots-clés : nourriture, Pizza, Restaurant"),
        ("c.bmp", "Chat, Salon"),
    ]));

    let tasks = ImageScanner::new(input.path(), true).unwrap().collect_sorted();
    assert_eq!(tasks.len(), 4);

    let summary = build_pipeline(provider.clone(), output.path(), PlacementMode::Copy)
        .run(tasks, &ParallelProcessor::new(3), |_, _, _| {})
        .await;

    assert_eq!(summary.total, 4);
    assert_eq!(summary.placed, 3);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.metadata_skipped, 1);

    let nature = output.path().join("Nature/a_Montagne_Lac_Neige.jpg");
    assert!(nature.is_file());
    assert_eq!(
        metadata::read_tags(&nature).unwrap(),
        vec!["Nature", "Montagne", "Lac", "Neige"]
    );

    let food = output.path().join("Nourriture/b_Pizza_Restaurant_Divers.png");
    assert!(food.is_file());

    // First keyword outside the vocabulary goes to the fallback category
    assert!(output.path().join("Autres/c_Salon_Divers_Divers.bmp").is_file());

    // Copy mode leaves every source in place, including the failed one
    assert!(input.path().join("a.jpg").exists());
    assert!(input.path().join("down.jpg").exists());

    let failure = summary.failures().next().unwrap();
    assert_eq!(failure.source, input.path().join("down.jpg"));
    assert_eq!(failure.error_kind.as_deref(), Some("ServiceUnavailable"));

    // One call per image plus one retry for the unreachable one
    assert_eq!(provider.calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_move_mode_with_colliding_names() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_image(&input.path().join("one/photo.jpg"));
    write_image(&input.path().join("two/photo.jpg"));

    let provider = Arc::new(ScriptedProvider::new(&[("photo.jpg", "Personnes, Sourire")]));
    let tasks = ImageScanner::new(input.path(), true).unwrap().collect_sorted();

    let summary = build_pipeline(provider, output.path(), PlacementMode::Move)
        .run(tasks, &ParallelProcessor::new(2), |_, _, _| {})
        .await;

    assert_eq!(summary.placed, 2);
    assert!(!input.path().join("one/photo.jpg").exists());
    assert!(!input.path().join("two/photo.jpg").exists());

    let mut placed: Vec<String> = fs::read_dir(output.path().join("Personnes"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    placed.sort();
    assert_eq!(
        placed,
        vec!["photo_Sourire_Divers_Divers.jpg", "photo_Sourire_Divers_Divers_1.jpg"]
    );
}

#[tokio::test]
async fn test_cancelled_run_touches_nothing() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_image(&input.path().join("a.jpg"));
    write_image(&input.path().join("b.jpg"));

    let provider = Arc::new(ScriptedProvider::new(&[("a.jpg", "Nature"), ("b.jpg", "Nature")]));
    let cancel = CancelFlag::new();
    cancel.cancel();

    let tasks = ImageScanner::new(input.path(), false).unwrap().collect_sorted();
    let processor = ParallelProcessor::new(2).with_cancel_flag(cancel);
    let summary = build_pipeline(provider.clone(), output.path(), PlacementMode::Move)
        .run(tasks, &processor, |_, _, _| {})
        .await;

    assert_eq!(summary.cancelled, 2);
    assert_eq!(summary.placed, 0);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    assert!(input.path().join("a.jpg").exists());
    assert_eq!(fs::read_dir(output.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_output_inside_input_is_not_rescanned() {
    let input = TempDir::new().unwrap();
    write_image(&input.path().join("a.jpg"));
    let output = input.path().join("sorted");
    write_image(&output.join("Nature/old.jpg"));

    let tasks = ImageScanner::new(input.path(), true)
        .unwrap()
        .with_exclude(&output)
        .collect_sorted();

    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].display_name(), "a.jpg");
}
