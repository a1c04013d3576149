//! In-process video backend
//!
//! Clips live in a shared registry keyed by path. Sources clone the registered
//! frames when opened; sinks publish their frames under their path on `finish`.

use super::{Frame, SinkSettings, VideoBackend, VideoInfo, VideoSink, VideoSource, check_frame_size};
use crate::error::{VisionError, VisionResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

const BACKEND_NAME: &str = "memory";

/// A stored clip: frame rate plus frames in presentation order
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    pub fps: f64,
    pub frames: Vec<Frame>,
}

#[derive(Debug, Default)]
struct Registry {
    clips: HashMap<PathBuf, Clip>,
    open_handles: usize,
}

/// Video backend that never touches the filesystem.
///
/// Cloning the backend shares the registry, so a clip written through one clone
/// can be read back through another.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    registry: Arc<Mutex<Registry>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a clip under `path`.
    pub fn insert_clip(&self, path: impl Into<PathBuf>, fps: f64, frames: Vec<Frame>) {
        self.lock().clips.insert(path.into(), Clip { fps, frames });
    }

    /// A copy of the clip stored under `path`, if any.
    pub fn clip(&self, path: &Path) -> Option<Clip> {
        self.lock().clips.get(path).cloned()
    }

    /// Number of sources and sinks that have not been dropped yet.
    pub fn open_handles(&self) -> usize {
        self.lock().open_handles
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        // A poisoned registry only means another test thread panicked mid-insert
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn acquire_handle(&self) -> HandleGuard {
        self.lock().open_handles += 1;
        HandleGuard {
            backend: self.clone(),
        }
    }
}

impl VideoBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn open_source(&self, path: &Path) -> VisionResult<Box<dyn VideoSource>> {
        let clip = self.clip(path).ok_or_else(|| VisionError::VideoOpen {
            path: path.to_path_buf(),
            reason: "no clip registered under this path".to_string(),
        })?;
        let (width, height) = clip
            .frames
            .first()
            .map(|frame| frame.dimensions())
            .unwrap_or((0, 0));
        Ok(Box::new(MemorySource {
            info: VideoInfo {
                width,
                height,
                fps: clip.fps,
            },
            frames: clip.frames,
            position: 0,
            _handle: self.acquire_handle(),
        }))
    }

    fn create_sink(&self, path: &Path, settings: SinkSettings) -> VisionResult<Box<dyn VideoSink>> {
        if settings.width == 0 || settings.height == 0 {
            return Err(VisionError::backend_failure(
                BACKEND_NAME,
                format!(
                    "cannot create a {}x{} output stream",
                    settings.width, settings.height
                ),
            ));
        }
        Ok(Box::new(MemorySink {
            path: path.to_path_buf(),
            settings,
            frames: Vec::new(),
            finished: false,
            handle: self.acquire_handle(),
        }))
    }
}

struct HandleGuard {
    backend: MemoryBackend,
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        let mut registry = self.backend.lock();
        registry.open_handles = registry.open_handles.saturating_sub(1);
    }
}

struct MemorySource {
    info: VideoInfo,
    frames: Vec<Frame>,
    position: usize,
    _handle: HandleGuard,
}

impl VideoSource for MemorySource {
    fn info(&self) -> VideoInfo {
        self.info
    }

    fn read_frame(&mut self) -> VisionResult<Option<Frame>> {
        let frame = self.frames.get(self.position).cloned();
        if frame.is_some() {
            self.position += 1;
        }
        Ok(frame)
    }

    fn rewind(&mut self) -> VisionResult<()> {
        self.position = 0;
        Ok(())
    }
}

struct MemorySink {
    path: PathBuf,
    settings: SinkSettings,
    frames: Vec<Frame>,
    finished: bool,
    handle: HandleGuard,
}

impl VideoSink for MemorySink {
    fn write_frame(&mut self, frame: &Frame) -> VisionResult<()> {
        if self.finished {
            return Err(VisionError::backend_failure(
                BACKEND_NAME,
                "write after finish",
            ));
        }
        check_frame_size(frame, &self.settings)?;
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> VisionResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        let frames = std::mem::take(&mut self.frames);
        self.handle
            .backend
            .insert_clip(self.path.clone(), self.settings.fps, frames);
        Ok(())
    }
}
