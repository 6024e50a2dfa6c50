use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while tagging and placing images.
///
/// `DirectoryNotFound`, `NotADirectory` and `Configuration` abort a run before any image
/// is touched. Every other variant is recorded against a single image and the batch
/// carries on.
#[derive(Debug, Error)]
pub enum Error {
    #[error("directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("LLM service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("invalid LLM response: {0}")]
    InvalidResponse(String),

    #[error("cannot read image {}: {source}", path.display())]
    ImageUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {}: {source}", path.display())]
    DestinationWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("metadata not written to {}: {reason}", path.display())]
    MetadataWriteSkipped { path: PathBuf, reason: String },

    #[error("cancelled before processing started")]
    Cancelled,

    #[error("worker panicked: {0}")]
    WorkerPanicked(String),
}

impl Error {
    /// Whether this error must stop the run before processing begins
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::DirectoryNotFound(_) | Error::NotADirectory(_) | Error::Configuration(_)
        )
    }

    /// Short machine-friendly name, used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            Error::DirectoryNotFound(_) => "DirectoryNotFound",
            Error::NotADirectory(_) => "NotADirectory",
            Error::Configuration(_) => "ConfigurationError",
            Error::ServiceUnavailable(_) => "ServiceUnavailable",
            Error::InvalidResponse(_) => "InvalidResponse",
            Error::ImageUnreadable { .. } => "ImageUnreadable",
            Error::DestinationWrite { .. } => "DestinationWriteError",
            Error::MetadataWriteSkipped { .. } => "MetadataWriteSkipped",
            Error::Cancelled => "Cancelled",
            Error::WorkerPanicked(_) => "WorkerPanicked",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_errors_are_fatal() {
        assert!(Error::DirectoryNotFound(PathBuf::from("/nope")).is_fatal());
        assert!(Error::NotADirectory(PathBuf::from("/etc/hosts")).is_fatal());
        assert!(Error::Configuration("empty vocabulary".into()).is_fatal());
    }

    #[test]
    fn test_per_image_errors_are_not_fatal() {
        assert!(!Error::ServiceUnavailable("refused".into()).is_fatal());
        assert!(!Error::InvalidResponse("empty".into()).is_fatal());
        assert!(!Error::Cancelled.is_fatal());
        assert!(!Error::MetadataWriteSkipped {
            path: PathBuf::from("a.bmp"),
            reason: "unsupported".into()
        }
        .is_fatal());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(Error::Cancelled.kind(), "Cancelled");
        let err = Error::DestinationWrite {
            path: PathBuf::from("out/a.jpg"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert_eq!(err.kind(), "DestinationWriteError");
        assert!(err.to_string().contains("out/a.jpg"));
    }
}
