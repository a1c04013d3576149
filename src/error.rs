use std::path::PathBuf;
use thiserror::Error;

/// A specialized `Result` type for minimap and icon-matching operations.
pub type VisionResult<T> = Result<T, VisionError>;

/// Coarse classification of a [`VisionError`], used by the CLI to pick a message
/// and by callers that only care whether a run can be retried with other inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad caller-supplied settings (output directory, fourcc, frame geometry).
    Configuration,
    /// The input video could not be opened or produced no frames.
    SourceUnreadable,
    /// No usable champion icons were found.
    AssetMissing,
    /// The video backend failed while decoding or encoding.
    Backend,
}

/// The error type for all cropping and matching operations.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("The specified output directory does not exist: {path:?}")]
    OutputDirectoryMissing { path: PathBuf },

    #[error("Could not open the video from {path:?}: {reason}")]
    VideoOpen { path: PathBuf, reason: String },

    #[error("Couldn't read the first frame of the video {path:?}")]
    EmptyVideo { path: PathBuf },

    #[error("Frame size {width}x{height} does not fit the expected geometry: {reason}")]
    InvalidFrameSize {
        width: u32,
        height: u32,
        reason: String,
    },

    #[error("No icons found. Place {extension} icons in the {} folder.", folder.display())]
    NoIcons { folder: PathBuf, extension: String },

    #[error("Invalid fourcc '{value}': expected exactly four ASCII characters")]
    InvalidFourcc { value: String },

    #[error("No video backend is compiled in. Rebuild with `--features {feature}`.")]
    BackendUnavailable { feature: &'static str },

    #[error("Video backend '{backend}' failed: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Image error: {source}")]
    Image {
        #[from]
        source: image::ImageError,
    },

    #[error("Failed to encode report: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl VisionError {
    pub fn backend_failure(backend: &'static str, message: impl Into<String>) -> Self {
        VisionError::Backend {
            backend,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            VisionError::OutputDirectoryMissing { .. }
            | VisionError::InvalidFrameSize { .. }
            | VisionError::InvalidFourcc { .. } => ErrorKind::Configuration,
            VisionError::VideoOpen { .. } | VisionError::EmptyVideo { .. } => {
                ErrorKind::SourceUnreadable
            }
            VisionError::NoIcons { .. } => ErrorKind::AssetMissing,
            VisionError::BackendUnavailable { .. }
            | VisionError::Backend { .. }
            | VisionError::Io { .. }
            | VisionError::Image { .. }
            | VisionError::Json { .. } => ErrorKind::Backend,
        }
    }
}
