use crate::constants::MAX_SEGMENT_LEN;
use std::path::Path;

/// Get file extension from path (without the dot)
pub fn get_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
}

/// Reduce a keyword to a filename segment: letters, digits and underscores only.
///
/// Whitespace and hyphens become underscores, everything else is dropped, runs of
/// underscores collapse and the result is trimmed and capped at `MAX_SEGMENT_LEN`
/// characters. Letters keep their accents.
pub fn sanitize_segment(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_underscore = false;

    for c in name.chars() {
        let mapped = if c.is_alphanumeric() {
            Some(c)
        } else if c == '_' || c == '-' || c.is_whitespace() {
            Some('_')
        } else {
            None
        };

        match mapped {
            Some('_') if last_underscore => {}
            Some('_') => {
                out.push('_');
                last_underscore = true;
            }
            Some(c) => {
                out.push(c);
                last_underscore = false;
            }
            None => {}
        }
    }

    out.trim_matches('_')
        .chars()
        .take(MAX_SEGMENT_LEN)
        .collect::<String>()
        .trim_end_matches('_')
        .to_string()
}
