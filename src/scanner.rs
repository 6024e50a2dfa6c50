use crate::constants::IMAGE_EXTENSIONS;
use crate::error::{Error, Result};
use crate::models::ImageTask;
use crate::utils;
use image::ImageFormat;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Walks an input directory and yields supported images.
///
/// Depth is fixed per scanner: the whole subtree when `recursive`, direct children
/// otherwise. Calling [`ImageScanner::scan`] again walks the directory again.
#[derive(Debug, Clone)]
pub struct ImageScanner {
    root: PathBuf,
    recursive: bool,
    exclude: Option<PathBuf>,
}

impl ImageScanner {
    /// Create a scanner for `root`. Fails if it is missing or not a directory.
    pub fn new<P: AsRef<Path>>(root: P, recursive: bool) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.exists() {
            return Err(Error::DirectoryNotFound(root));
        }
        if !root.is_dir() {
            return Err(Error::NotADirectory(root));
        }
        Ok(Self {
            root,
            recursive,
            exclude: None,
        })
    }

    /// Skip everything under `dir` (typically the output directory when it sits
    /// inside the input directory)
    pub fn with_exclude<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.exclude = dir.as_ref().canonicalize().ok();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lazily yield every supported image under the root
    pub fn scan(&self) -> impl Iterator<Item = ImageTask> + '_ {
        let mut walker = WalkDir::new(&self.root).min_depth(1);
        if !self.recursive {
            walker = walker.max_depth(1);
        }

        walker
            .into_iter()
            .filter_entry(move |entry| !self.is_excluded(entry.path()))
            .filter_map(|entry| match entry {
                Ok(e) => Some(e),
                Err(e) => {
                    warn!("Error accessing entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let path = entry.into_path();
                detect_format(&path).map(|format| ImageTask::new(path, format))
            })
    }

    /// Collect every image, sorted by path
    pub fn collect_sorted(&self) -> Vec<ImageTask> {
        let mut tasks: Vec<ImageTask> = self.scan().collect();
        tasks.sort_by(|a, b| a.source_path.cmp(&b.source_path));
        tasks
    }

    fn is_excluded(&self, path: &Path) -> bool {
        match (&self.exclude, path.canonicalize()) {
            (Some(exclude), Ok(path)) => path.starts_with(exclude),
            _ => false,
        }
    }
}

/// Format of a supported image, from its extension (case-insensitive)
pub fn detect_format(path: &Path) -> Option<ImageFormat> {
    let ext = utils::get_extension(path)?;
    if !IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }
    ImageFormat::from_extension(&ext)
}

/// Whether `path` has a supported image extension
pub fn is_supported_image(path: &Path) -> bool {
    detect_format(path).is_some()
}
