use crate::constants::DEFAULT_MAX_TAGS_IN_FILENAME;
use crate::error::{Error, Result};
use crate::models::PlacementMode;
use crate::organizer::naming;
use crate::tagger::split_tags;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Places tagged images under `<output_root>/<Category>/` with decorated names.
///
/// Existing files are never overwritten: a free name is reserved with an exclusive
/// create before any bytes are written, so concurrent workers cannot collide.
#[derive(Debug, Clone)]
pub struct FileRelocator {
    output_root: PathBuf,
    mode: PlacementMode,
    max_tags_in_filename: usize,
}

impl FileRelocator {
    pub fn new<P: Into<PathBuf>>(output_root: P, mode: PlacementMode) -> Self {
        Self {
            output_root: output_root.into(),
            mode,
            max_tags_in_filename: DEFAULT_MAX_TAGS_IN_FILENAME,
        }
    }

    /// Cap the number of tags appended to filenames (default: 5)
    pub fn with_max_tags_in_filename(mut self, max: usize) -> Self {
        self.max_tags_in_filename = max;
        self
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn mode(&self) -> PlacementMode {
        self.mode
    }

    /// Folder an image tagged with `category` ends up in
    pub fn destination_dir(&self, category: &str) -> PathBuf {
        self.output_root.join(naming::category_dir_name(category))
    }

    /// Copy or move `image_path` to its category folder and return the new path.
    ///
    /// `tags[0]` is the category, the rest decorate the filename. On failure nothing
    /// is left at the destination and the source is where it was.
    pub fn place(&self, image_path: &Path, tags: &[String]) -> Result<PathBuf> {
        if !image_path.is_file() {
            return Err(Error::ImageUnreadable {
                path: image_path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "source image is missing"),
            });
        }

        let (category, extra) = split_tags(tags).unwrap_or(("", &[]));
        let dir = self.destination_dir(category);
        fs::create_dir_all(&dir).map_err(|source| Error::DestinationWrite {
            path: dir.clone(),
            source,
        })?;

        let (destination, placeholder) = self.reserve(&dir, image_path, extra)?;
        drop(placeholder);

        let result = match self.mode {
            PlacementMode::Copy => fs::copy(image_path, &destination).map(|_| ()),
            PlacementMode::Move => move_file(image_path, &destination),
        };

        if let Err(source) = result {
            if let Err(e) = fs::remove_file(&destination) {
                warn!("Failed to clean up {}: {}", destination.display(), e);
            }
            return Err(Error::DestinationWrite {
                path: destination,
                source,
            });
        }

        debug!(
            "{:?} {} -> {}",
            self.mode,
            image_path.display(),
            destination.display()
        );
        Ok(destination)
    }

    /// Create an empty file at the first free `<name>`, `<name>_1`, `<name>_2`, ...
    fn reserve(&self, dir: &Path, image_path: &Path, extra: &[String]) -> Result<(PathBuf, File)> {
        let mut counter = 0;
        loop {
            let name = naming::build_numbered_filename(
                image_path,
                extra,
                self.max_tags_in_filename,
                counter,
            );
            let candidate = dir.join(name);

            match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(file) => return Ok((candidate, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => counter += 1,
                Err(source) => {
                    return Err(Error::DestinationWrite {
                        path: candidate,
                        source,
                    })
                }
            }
        }
    }
}

/// Rename, falling back to copy + delete when source and destination sit on
/// different filesystems
fn move_file(source: &Path, destination: &Path) -> io::Result<()> {
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            debug!(
                "rename {} failed ({}), copying instead",
                source.display(),
                rename_err
            );
            fs::copy(source, destination)?;
            fs::remove_file(source)
        }
    }
}

/// Place one image under `output_root` with default filename settings
pub fn place(image_path: &Path, tags: &[String], output_root: &Path, mode: PlacementMode) -> Result<PathBuf> {
    FileRelocator::new(output_root, mode).place(image_path, tags)
}
