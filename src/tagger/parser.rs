use crate::vocabulary::CategoryVocabulary;

/// Labels a model sometimes echoes before its answer ("Mots-clés : ...")
const ANSWER_LABELS: &[&str] = &["mots-clés", "mots-clé", "mots clés", "mots-cles", "keywords", "tags"];

/// Split a raw answer into cleaned keywords, in order, without duplicates.
///
/// Delimiters are commas, semicolons, line breaks and numbered-list markers, even
/// when the whole list sits on one line ("1. Nature 2. Arbre"). Bullet markers,
/// surrounding quotes and punctuation other than `-` are removed, inner whitespace
/// is collapsed, empty fragments are dropped and duplicates (case-insensitive)
/// keep their first occurrence.
pub fn parse_keywords(raw: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();

    for (index, fragment) in raw.split(|c| matches!(c, ',' | ';' | '\n' | '\r')).enumerate() {
        let fragment = if index == 0 {
            strip_answer_label(fragment)
        } else {
            fragment
        };

        for item in split_numbered_items(fragment) {
            let keyword = clean_fragment(item);
            if keyword.is_empty() {
                continue;
            }

            let lowered = keyword.to_lowercase();
            if !keywords.iter().any(|k| k.to_lowercase() == lowered) {
                keywords.push(keyword);
            }
        }
    }

    keywords
}

/// Parse a raw answer into exactly `desired_count` tags whose first entry belongs
/// to `vocabulary`.
///
/// A first keyword outside the vocabulary is replaced by the vocabulary's fallback
/// category; a matching one takes the vocabulary's spelling. Missing entries are
/// filled with `fallback_keyword`, so an answer with no usable keyword at all yields
/// the fallback category followed by padding.
pub fn normalize_tags(
    raw: &str,
    desired_count: usize,
    vocabulary: &CategoryVocabulary,
    fallback_keyword: &str,
) -> Vec<String> {
    if desired_count == 0 {
        return Vec::new();
    }

    let mut keywords = parse_keywords(raw);
    let category = keywords
        .first()
        .and_then(|first| vocabulary.lookup(first))
        .unwrap_or_else(|| vocabulary.fallback())
        .to_string();

    if !keywords.is_empty() {
        keywords.remove(0);
    }
    let lowered = category.to_lowercase();
    keywords.retain(|k| k.to_lowercase() != lowered);

    let mut tags = Vec::with_capacity(desired_count);
    tags.push(category);
    tags.extend(keywords);
    tags.truncate(desired_count);
    while tags.len() < desired_count {
        tags.push(fallback_keyword.to_string());
    }

    tags
}

/// Split tags into the category and the keywords that decorate the filename
pub fn split_tags(tags: &[String]) -> Option<(&str, &[String])> {
    tags.split_first().map(|(first, rest)| (first.as_str(), rest))
}

fn strip_answer_label(fragment: &str) -> &str {
    if let Some((label, rest)) = fragment.split_once(':') {
        let label = label.trim().trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
        if ANSWER_LABELS.contains(&label.as_str()) {
            return rest;
        }
    }
    fragment
}

/// Cut a fragment before every inline `<space><digits>.` or `<space><digits>)` marker.
/// Each piece keeps its marker; [`strip_list_marker`] removes it.
fn split_numbered_items(fragment: &str) -> Vec<&str> {
    let bytes = fragment.as_bytes();
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i].is_ascii_whitespace() {
            let digits_start = i + 1;
            let mut j = digits_start;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            let is_marker = j > digits_start
                && j < bytes.len()
                && matches!(bytes[j], b'.' | b')')
                && (j + 1 == bytes.len() || bytes[j + 1].is_ascii_whitespace());
            if is_marker {
                pieces.push(&fragment[start..i]);
                start = digits_start;
                i = j + 1;
                continue;
            }
        }
        i += 1;
    }

    pieces.push(&fragment[start..]);
    pieces
}

fn clean_fragment(fragment: &str) -> String {
    let trimmed = strip_list_marker(fragment.trim());
    let trimmed = trimmed.trim_matches(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-'));
    if !trimmed.chars().any(char::is_alphanumeric) {
        return String::new();
    }
    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drop a leading "1." / "2)" / "- " / "*" / "•" list marker
fn strip_list_marker(fragment: &str) -> &str {
    let digits = fragment.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &fragment[digits..];
        if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                return rest.trim_start();
            }
        }
        return fragment;
    }

    if let Some(rest) = fragment.strip_prefix('-') {
        if rest.starts_with(char::is_whitespace) {
            return rest.trim_start();
        }
        return fragment;
    }

    for marker in ['*', '•'] {
        if let Some(rest) = fragment.strip_prefix(marker) {
            return rest.trim_start();
        }
    }
    fragment
}
