//! Champion icon detection over a minimap video
//!
//! A [`MatchSession`] derives the icon size from the first frame, loads the icon
//! library for that size, rewinds, and then scores every icon against every
//! frame. Each frame produces a [`FrameReport`].

use super::annotate::annotate;
use super::config::MatchConfig;
use super::icons::{IconLibrary, icon_size_for};
use crate::error::{VisionError, VisionResult};
use crate::geometry::BoundingBox;
use crate::template_matching::{TemplateMatcher, to_luma};
use crate::video::{Frame, VideoBackend, VideoInfo, VideoSource};
use serde::Serialize;
use std::ops::ControlFlow;
use std::path::Path;

/// Lifecycle of a matching run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchState {
    Init,
    SizeDerived,
    IconsLoaded,
    Streaming,
    Done,
    Error,
}

impl MatchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchState::Done | MatchState::Error)
    }
}

/// A champion found in a frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub champion: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    /// Overlay text, e.g. `Ahri (0.93)`
    pub fn label(&self) -> String {
        format!("{} ({:.2})", self.champion, self.confidence)
    }
}

/// Best score of one icon in one frame, reported whether or not it passed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IconScore {
    pub champion: String,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct FrameReport {
    /// Zero-based frame number
    pub index: usize,
    /// One entry per icon that fit the frame, in library order
    pub scores: Vec<IconScore>,
    pub detections: Vec<Detection>,
    /// Frame with detection boxes drawn, when annotation is enabled
    pub annotated: Option<Frame>,
}

impl FrameReport {
    pub fn best_detection(&self) -> Option<&Detection> {
        self.detections.iter().max_by(|a, b| {
            a.confidence
                .partial_cmp(&b.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }
}

/// Receives frame reports as a session runs.
///
/// Returning `ControlFlow::Break` stops the run early, the same way the quit key
/// ends an interactive viewer.
pub trait FrameConsumer {
    fn on_frame(&mut self, report: &FrameReport) -> VisionResult<ControlFlow<()>>;
}

impl<F> FrameConsumer for F
where
    F: FnMut(&FrameReport) -> VisionResult<ControlFlow<()>>,
{
    fn on_frame(&mut self, report: &FrameReport) -> VisionResult<ControlFlow<()>> {
        self(report)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: usize,
    pub detections: usize,
    /// The consumer asked to stop before the stream ended
    pub interrupted: bool,
}

pub struct ChampionIconMatcher {
    config: MatchConfig,
}

impl ChampionIconMatcher {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Open `video` and prepare a session positioned at its first frame.
    ///
    /// Fails if the video cannot be opened, yields no frames, or no icons load
    /// for the derived icon size.
    pub fn open(&self, backend: &dyn VideoBackend, video: &Path) -> VisionResult<MatchSession> {
        let mut state = MatchState::Init;
        let mut source = backend.open_source(video)?;
        let first = source.read_frame()?.ok_or_else(|| VisionError::EmptyVideo {
            path: video.to_path_buf(),
        })?;

        let (width, height) = first.dimensions();
        let icon_size = icon_size_for(width, height, &self.config.icons.icon_ratio);
        advance(&mut state, MatchState::SizeDerived);
        log::debug!(
            "Minimap {}x{} -> icon size {}px",
            width,
            height,
            icon_size
        );

        let library = IconLibrary::load(&self.config.icons.folder, icon_size, &self.config.icons)?;
        if library.is_empty() {
            return Err(VisionError::NoIcons {
                folder: self.config.icons.folder.clone(),
                extension: self.config.icons.extension.to_uppercase(),
            });
        }
        advance(&mut state, MatchState::IconsLoaded);
        log::debug!("Loaded {} icons from {:?}", library.len(), library.folder());

        for icon in library.iter().filter(|icon| !icon.fits_in(width, height)) {
            log::warn!(
                "⚠️ Icon {} ({}x{}) is larger than the {}x{} minimap and will never match",
                icon.name,
                icon.width(),
                icon.height(),
                width,
                height
            );
        }

        source.rewind()?;
        advance(&mut state, MatchState::Streaming);

        Ok(MatchSession {
            source,
            library,
            matcher: TemplateMatcher::new(self.config.method),
            threshold: self.config.threshold,
            annotate: self.config.annotate,
            state,
            next_index: 0,
        })
    }
}

fn advance(state: &mut MatchState, next: MatchState) {
    log::trace!("match state {:?} -> {:?}", state, next);
    *state = next;
}

/// A running detection pass over one video.
///
/// The session owns the video source; dropping it (or finishing `run`) releases
/// the handle whether the stream ended, failed, or was stopped.
pub struct MatchSession {
    source: Box<dyn VideoSource>,
    library: IconLibrary,
    matcher: TemplateMatcher,
    threshold: f32,
    annotate: bool,
    state: MatchState,
    next_index: usize,
}

impl MatchSession {
    pub fn state(&self) -> MatchState {
        self.state
    }

    pub fn library(&self) -> &IconLibrary {
        &self.library
    }

    pub fn icon_size(&self) -> u32 {
        self.library.icon_size()
    }

    pub fn video_info(&self) -> VideoInfo {
        self.source.info()
    }

    /// Score every icon against one frame.
    pub fn process_frame(&self, index: usize, frame: &Frame) -> FrameReport {
        let gray = to_luma(frame);
        let mut scores = Vec::with_capacity(self.library.len());
        let mut detections = Vec::new();

        for icon in &self.library {
            let Some(best) = self.matcher.best_for(&gray, &icon.image) else {
                continue;
            };
            scores.push(IconScore {
                champion: icon.name.clone(),
                score: best.score,
            });
            if best.score >= self.threshold {
                log::debug!("✅ Frame {}: {}", index, best.describe(&icon.name));
                detections.push(Detection {
                    champion: icon.name.clone(),
                    confidence: best.score,
                    bbox: BoundingBox::new(best.x, best.y, icon.width(), icon.height()),
                });
            }
        }

        let annotated = self.annotate.then(|| annotate(frame, &detections));
        FrameReport {
            index,
            scores,
            detections,
            annotated,
        }
    }

    /// Drive the session to the end of the stream or until `consumer` breaks.
    pub fn run(mut self, consumer: &mut dyn FrameConsumer) -> VisionResult<RunSummary> {
        let mut summary = RunSummary::default();
        while let Some(report) = self.next() {
            let report = report?;
            summary.frames += 1;
            summary.detections += report.detections.len();
            let flow = match consumer.on_frame(&report) {
                Ok(flow) => flow,
                Err(e) => {
                    advance(&mut self.state, MatchState::Error);
                    return Err(e);
                }
            };
            if flow.is_break() {
                summary.interrupted = true;
                advance(&mut self.state, MatchState::Done);
                break;
            }
        }
        log::info!(
            "Processed {} frames, {} detections{}",
            summary.frames,
            summary.detections,
            if summary.interrupted { " (stopped early)" } else { "" }
        );
        Ok(summary)
    }
}

impl Iterator for MatchSession {
    type Item = VisionResult<FrameReport>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state != MatchState::Streaming {
            return None;
        }
        match self.source.read_frame() {
            Ok(Some(frame)) => {
                let index = self.next_index;
                self.next_index += 1;
                Some(Ok(self.process_frame(index, &frame)))
            }
            Ok(None) => {
                advance(&mut self.state, MatchState::Done);
                None
            }
            Err(e) => {
                advance(&mut self.state, MatchState::Error);
                Some(Err(e))
            }
        }
    }
}
