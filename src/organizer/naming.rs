use crate::constants::{MAX_FILENAME_BYTES, UNCATEGORIZED_DIR};
use crate::utils::sanitize_segment;
use std::ffi::{OsStr, OsString};
use std::path::Path;

/// Folder name for a category: sanitized, never empty
pub fn category_dir_name(category: &str) -> String {
    let name = sanitize_segment(category);
    if name.is_empty() {
        UNCATEGORIZED_DIR.to_string()
    } else {
        name
    }
}

/// `<stem>_<tag>_..._<tag><.ext>` with at most `max_tags` sanitized tags.
///
/// The original stem and extension are kept byte for byte. Tags that sanitize to
/// nothing are skipped, as are tags that would push the name past the byte budget.
pub fn build_filename(original: &Path, tags: &[String], max_tags: usize) -> OsString {
    build_numbered_filename(original, tags, max_tags, 0)
}

/// Same as [`build_filename`] with `_<counter>` before the extension when `counter > 0`
pub fn build_numbered_filename(
    original: &Path,
    tags: &[String],
    max_tags: usize,
    counter: usize,
) -> OsString {
    let stem = original.file_stem().unwrap_or_else(|| OsStr::new("image"));
    let extension = original.extension();

    let counter_len = if counter > 0 {
        counter.to_string().len() + 1
    } else {
        0
    };
    let suffix_len = counter_len + extension.map(|e| e.len() + 1).unwrap_or(0);

    let mut name = stem.to_os_string();
    for tag in tags.iter().take(max_tags) {
        let segment = sanitize_segment(tag);
        if segment.is_empty() {
            continue;
        }
        if name.len() + 1 + segment.len() + suffix_len > MAX_FILENAME_BYTES {
            break;
        }
        name.push("_");
        name.push(&segment);
    }

    if counter > 0 {
        name.push(format!("_{}", counter));
    }
    if let Some(ext) = extension {
        name.push(".");
        name.push(ext);
    }
    name
}
