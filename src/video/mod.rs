//! Video I/O seam
//!
//! The croppers and matchers never talk to a codec library directly. They read
//! frames from a [`VideoSource`] and write frames to a [`VideoSink`], both handed
//! out by a [`VideoBackend`]:
//! - [`memory::MemoryBackend`] keeps whole clips in process (tests, library callers)
//! - `ffmpeg::FfmpegBackend` decodes and encodes real files (feature `backend-ffmpeg`)

pub mod memory;

#[cfg(feature = "backend-ffmpeg")]
pub mod ffmpeg;

use crate::error::{VisionError, VisionResult};
use image::RgbImage;
use std::fmt;
use std::path::Path;

pub use memory::MemoryBackend;

/// A decoded video frame in RGB channel order.
pub type Frame = RgbImage;

/// Stream properties reported by a source once it is open
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

/// Four-character codec identifier used when creating an output stream.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fourcc([u8; 4]);

impl Fourcc {
    pub const MP4V: Fourcc = Fourcc(*b"mp4v");

    pub fn parse(value: &str) -> VisionResult<Self> {
        let bytes = value.as_bytes();
        if bytes.len() != 4 || !bytes.iter().all(|b| b.is_ascii_graphic()) {
            return Err(VisionError::InvalidFourcc {
                value: value.to_string(),
            });
        }
        Ok(Fourcc([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn as_str(&self) -> &str {
        // Only ASCII bytes get past `parse`
        std::str::from_utf8(&self.0).unwrap_or("????")
    }
}

impl Default for Fourcc {
    fn default() -> Self {
        Fourcc::MP4V
    }
}

impl fmt::Debug for Fourcc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fourcc({})", self.as_str())
    }
}

impl fmt::Display for Fourcc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for a new output stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SinkSettings {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub fourcc: Fourcc,
}

/// An ordered, finite, restartable sequence of frames.
pub trait VideoSource {
    fn info(&self) -> VideoInfo;

    /// Next frame, or `None` once the stream is exhausted.
    fn read_frame(&mut self) -> VisionResult<Option<Frame>>;

    /// Restart reading at the first frame.
    fn rewind(&mut self) -> VisionResult<()>;
}

/// An append-only output stream. Frames must match the configured size.
pub trait VideoSink {
    fn write_frame(&mut self, frame: &Frame) -> VisionResult<()>;

    /// Flush buffered frames and close the container.
    ///
    /// A sink dropped without `finish` still releases its handles, but the file
    /// may be incomplete.
    fn finish(&mut self) -> VisionResult<()>;
}

pub trait VideoBackend {
    fn name(&self) -> &'static str;

    fn open_source(&self, path: &Path) -> VisionResult<Box<dyn VideoSource>>;

    fn create_sink(&self, path: &Path, settings: SinkSettings) -> VisionResult<Box<dyn VideoSink>>;
}

/// Backend used by the command-line tool.
#[cfg(feature = "backend-ffmpeg")]
pub fn default_backend() -> VisionResult<Box<dyn VideoBackend>> {
    Ok(Box::new(ffmpeg::FfmpegBackend::new()?))
}

/// Backend used by the command-line tool.
#[cfg(not(feature = "backend-ffmpeg"))]
pub fn default_backend() -> VisionResult<Box<dyn VideoBackend>> {
    Err(VisionError::BackendUnavailable {
        feature: "backend-ffmpeg",
    })
}

pub(crate) fn check_frame_size(frame: &Frame, settings: &SinkSettings) -> VisionResult<()> {
    if frame.width() != settings.width || frame.height() != settings.height {
        return Err(VisionError::InvalidFrameSize {
            width: frame.width(),
            height: frame.height(),
            reason: format!(
                "output stream expects {}x{} frames",
                settings.width, settings.height
            ),
        });
    }
    Ok(())
}
