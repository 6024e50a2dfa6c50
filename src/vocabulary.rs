use crate::constants::RESERVED_FALLBACK_CATEGORY;
use crate::error::{Error, Result};
use std::path::Path;

/// Ordered list of allowed top-level categories.
///
/// Loaded once at startup and shared read-only by every worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryVocabulary {
    categories: Vec<String>,
    fallback: usize,
}

impl CategoryVocabulary {
    /// Build a vocabulary from entries in order. Blank entries are ignored,
    /// case-insensitive duplicates keep their first spelling.
    pub fn new<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut categories: Vec<String> = Vec::new();
        for entry in entries {
            let entry = entry.as_ref().trim();
            if entry.is_empty() {
                continue;
            }
            let lowered = entry.to_lowercase();
            if !categories.iter().any(|c| c.to_lowercase() == lowered) {
                categories.push(entry.to_string());
            }
        }

        if categories.is_empty() {
            return Err(Error::Configuration(
                "category vocabulary must contain at least one entry".into(),
            ));
        }

        let fallback = categories
            .iter()
            .position(|c| c.to_lowercase() == RESERVED_FALLBACK_CATEGORY.to_lowercase())
            .unwrap_or(0);

        Ok(Self {
            categories,
            fallback,
        })
    }

    /// Parse a vocabulary from text, one category per line
    pub fn parse(text: &str) -> Result<Self> {
        Self::new(text.lines())
    }

    /// Load a vocabulary file, one category per line
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!(
                "cannot read category file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&text)
    }

    /// Canonical spelling of `keyword` if it names a category (case-insensitive)
    pub fn lookup(&self, keyword: &str) -> Option<&str> {
        let needle = keyword.trim().to_lowercase();
        self.categories
            .iter()
            .find(|c| c.to_lowercase() == needle)
            .map(String::as_str)
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.lookup(keyword).is_some()
    }

    /// Category used when the model picks something outside the vocabulary:
    /// the reserved "Autres" entry when listed, the first entry otherwise
    pub fn fallback(&self) -> &str {
        &self.categories[self.fallback]
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Categories as a comma-separated list, the way the prompt presents them
    pub fn joined(&self) -> String {
        self.categories.join(", ")
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_skips_blank_lines() {
        let vocab = CategoryVocabulary::parse("Nature\n\n  Personnes  \n\nAnimaux\n").unwrap();
        assert_eq!(vocab.categories(), &["Nature", "Personnes", "Animaux"]);
        assert_eq!(vocab.len(), 3);
    }

    #[test]
    fn test_empty_vocabulary_is_configuration_error() {
        let err = CategoryVocabulary::parse("\n   \n").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let err = CategoryVocabulary::from_file("/no/such/categories.txt").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_fallback_prefers_reserved_entry() {
        let vocab = CategoryVocabulary::new(["Nature", "Personnes", "autres"]).unwrap();
        assert_eq!(vocab.fallback(), "autres");

        let vocab = CategoryVocabulary::new(["Nature", "Personnes"]).unwrap();
        assert_eq!(vocab.fallback(), "Nature");
    }

    #[test]
    fn test_lookup_is_case_insensitive_and_canonical() {
        let vocab = CategoryVocabulary::new(["Nature", "Équipement"]).unwrap();
        assert_eq!(vocab.lookup("nature"), Some("Nature"));
        assert_eq!(vocab.lookup("ÉQUIPEMENT"), Some("Équipement"));
        assert_eq!(vocab.lookup("Ville"), None);
    }

    #[test]
    fn test_duplicates_keep_first_spelling() {
        let vocab = CategoryVocabulary::new(["Nature", "NATURE", "Ville"]).unwrap();
        assert_eq!(vocab.categories(), &["Nature", "Ville"]);
        assert_eq!(vocab.joined(), "Nature, Ville");
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("categories.txt");
        std::fs::write(&path, "Nature\nPersonnes\n").unwrap();

        let vocab = CategoryVocabulary::from_file(&path).unwrap();
        assert!(vocab.contains("personnes"));
    }
}
