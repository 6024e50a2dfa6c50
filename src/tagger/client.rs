use crate::constants::{DEFAULT_RETRY_BACKOFF_MS, FALLBACK_KEYWORD};
use crate::error::{Error, Result};
use crate::llm::VisionProvider;
use crate::tagger::{parser, prompt};
use crate::vocabulary::CategoryVocabulary;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// First attempt plus one retry
const MAX_ATTEMPTS: usize = 2;

/// Asks the vision model for keywords and turns its answer into tags
#[derive(Clone)]
pub struct TagClient {
    provider: Arc<dyn VisionProvider>,
    fallback_keyword: String,
    retry_backoff: Duration,
}

impl TagClient {
    pub fn new(provider: Arc<dyn VisionProvider>) -> Self {
        Self {
            provider,
            fallback_keyword: FALLBACK_KEYWORD.to_string(),
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
        }
    }

    /// Keyword used to pad short answers (default: "Divers")
    pub fn with_fallback_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.fallback_keyword = keyword.into();
        self
    }

    /// Pause before the single retry
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// Generate exactly `desired_count` tags for one image, the first one a category.
    ///
    /// An unreachable service or an empty answer is retried once after the backoff.
    /// After that the last failure is returned: `ServiceUnavailable` for transport
    /// problems, `InvalidResponse` for an empty answer. Any non-empty answer succeeds,
    /// even when nothing usable can be parsed from it.
    pub async fn generate_tags(
        &self,
        image_path: &Path,
        desired_count: usize,
        vocabulary: &CategoryVocabulary,
    ) -> Result<Vec<String>> {
        if desired_count == 0 {
            return Err(Error::Configuration("tag count must be at least 1".into()));
        }

        let prompt = prompt::build_prompt(desired_count, vocabulary);
        let mut last_error = None;

        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(self.retry_backoff).await;
            }

            match self.provider.describe(image_path, &prompt).await {
                Ok(raw) if !raw.trim().is_empty() => {
                    debug!("{}: raw answer {:?}", image_path.display(), raw);
                    return Ok(parser::normalize_tags(
                        &raw,
                        desired_count,
                        vocabulary,
                        &self.fallback_keyword,
                    ));
                }
                Ok(_) => {
                    warn!(
                        "{}: empty answer from {} (attempt {}/{})",
                        image_path.display(),
                        self.provider.model(),
                        attempt + 1,
                        MAX_ATTEMPTS
                    );
                    last_error = Some(Error::InvalidResponse("empty answer".into()));
                }
                Err(e @ Error::ServiceUnavailable(_)) => {
                    warn!(
                        "{}: {} (attempt {}/{})",
                        image_path.display(),
                        e,
                        attempt + 1,
                        MAX_ATTEMPTS
                    );
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| Error::InvalidResponse("no answer".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays canned answers in order
    struct ScriptedProvider {
        answers: Mutex<VecDeque<Result<String>>>,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(answers: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                answers: Mutex::new(answers.into()),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl VisionProvider for ScriptedProvider {
        async fn describe(&self, _image_path: &Path, prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(Error::ServiceUnavailable("script exhausted".into())))
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    fn vocab() -> CategoryVocabulary {
        CategoryVocabulary::new(["Nature", "Personnes"]).unwrap()
    }

    fn client(provider: Arc<ScriptedProvider>) -> TagClient {
        TagClient::new(provider).with_retry_backoff(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_generate_tags_success() {
        let provider = ScriptedProvider::new(vec![Ok("Nature, Arbre, Arbre, Foret".into())]);
        let tags = client(provider.clone())
            .generate_tags(Path::new("a.jpg"), 3, &vocab())
            .await
            .unwrap();

        assert_eq!(tags, vec!["Nature", "Arbre", "Foret"]);
        assert_eq!(provider.calls(), 1);
        let prompts = provider.prompts.lock().unwrap();
        assert!(prompts[0].contains("Écris 3 mots-clés"));
        assert!(prompts[0].contains("Nature, Personnes"));
    }

    #[tokio::test]
    async fn test_retries_once_after_unavailable() {
        let provider = ScriptedProvider::new(vec![
            Err(Error::ServiceUnavailable("refused".into())),
            Ok("Personnes, Fête".into()),
        ]);
        let tags = client(provider.clone())
            .generate_tags(Path::new("a.jpg"), 2, &vocab())
            .await
            .unwrap();

        assert_eq!(tags, vec!["Personnes", "Fête"]);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_one_retry() {
        let provider = ScriptedProvider::new(vec![
            Err(Error::ServiceUnavailable("refused".into())),
            Err(Error::ServiceUnavailable("refused again".into())),
            Ok("Nature".into()),
        ]);
        let err = client(provider.clone())
            .generate_tags(Path::new("a.jpg"), 2, &vocab())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ServiceUnavailable(_)));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_answers_are_invalid_response() {
        let provider = ScriptedProvider::new(vec![Ok("".into()), Ok("  \n ".into())]);
        let err = client(provider.clone())
            .generate_tags(Path::new("a.jpg"), 2, &vocab())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidResponse(_)));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let provider = ScriptedProvider::new(vec![
            Err(Error::InvalidResponse("model not found".into())),
            Ok("Nature".into()),
        ]);
        let err = client(provider.clone())
            .generate_tags(Path::new("a.jpg"), 2, &vocab())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidResponse(_)));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_unparseable_answer_falls_back() {
        let provider = ScriptedProvider::new(vec![Ok("!!! ???".into())]);
        let tags = client(provider)
            .with_fallback_keyword("Misc")
            .generate_tags(Path::new("a.jpg"), 3, &vocab())
            .await
            .unwrap();

        assert_eq!(tags, vec!["Nature", "Misc", "Misc"]);
    }

    #[tokio::test]
    async fn test_zero_count_is_rejected() {
        let provider = ScriptedProvider::new(vec![]);
        let err = client(provider.clone())
            .generate_tags(Path::new("a.jpg"), 0, &vocab())
            .await
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(provider.calls(), 0);
    }
}
