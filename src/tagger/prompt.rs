use crate::vocabulary::CategoryVocabulary;

/// Instruction sent with every image.
///
/// Asks for `tag_count` comma-separated French keywords, most general first, the
/// first one taken from the category vocabulary.
pub fn build_prompt(tag_count: usize, vocabulary: &CategoryVocabulary) -> String {
    format!(
        "Écris {count} mots-clés en français décrivant cette image, séparés par une virgule, \
         du plus général au plus spécifique. Le premier mot-clé DOIT être choisi parmi cette liste : \
         {categories}. N'écris que les mots-clés. Ne répète aucun mot-clé. \
         Tu peux inventer librement les mots-clés suivants. \
         Exemple : \"{example}\". Mots-clés :",
        count = tag_count,
        categories = vocabulary.joined(),
        example = example_answer(vocabulary),
    )
}

fn example_answer(vocabulary: &CategoryVocabulary) -> String {
    format!("{}, Chat, Salon, Tapis", vocabulary.categories()[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_mentions_count_and_categories() {
        let vocab = CategoryVocabulary::new(["Personnes", "Nature"]).unwrap();
        let prompt = build_prompt(6, &vocab);
        assert!(prompt.starts_with("Écris 6 mots-clés"));
        assert!(prompt.contains("parmi cette liste : Personnes, Nature."));
        assert!(prompt.contains("\"Personnes, Chat, Salon, Tapis\""));
        assert!(prompt.ends_with("Mots-clés :"));
    }
}
