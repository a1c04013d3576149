//! Frame consumers used by the command-line tool
//!
//! Each consumer handles one output: score telemetry, JSON lines, an annotated
//! video, or a frame limit. [`Tee`] fans a report out to several of them.

use crate::champions::{Detection, FrameConsumer, FrameReport, IconScore};
use crate::error::VisionResult;
use crate::video::VideoSink;
use serde::Serialize;
use std::io::Write;
use std::ops::ControlFlow;

/// Prints every icon's best score for every frame.
pub struct ScoreLogger<W: Write> {
    out: W,
}

impl<W: Write> ScoreLogger<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> FrameConsumer for ScoreLogger<W> {
    fn on_frame(&mut self, report: &FrameReport) -> VisionResult<ControlFlow<()>> {
        for score in &report.scores {
            writeln!(self.out, "{}: max_val = {}", score.champion, score.score)?;
        }
        Ok(ControlFlow::Continue(()))
    }
}

#[derive(Serialize)]
struct FrameRecord<'a> {
    frame: usize,
    detections: &'a [Detection],
    scores: &'a [IconScore],
}

/// Writes one JSON object per frame, newline separated.
pub struct JsonLinesReport<W: Write> {
    out: W,
    include_scores: bool,
}

impl<W: Write> JsonLinesReport<W> {
    pub fn new(out: W, include_scores: bool) -> Self {
        Self {
            out,
            include_scores,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> FrameConsumer for JsonLinesReport<W> {
    fn on_frame(&mut self, report: &FrameReport) -> VisionResult<ControlFlow<()>> {
        let record = FrameRecord {
            frame: report.index,
            detections: &report.detections,
            scores: if self.include_scores {
                &report.scores[..]
            } else {
                &[]
            },
        };
        serde_json::to_writer(&mut self.out, &record)?;
        self.out.write_all(b"\n")?;
        Ok(ControlFlow::Continue(()))
    }
}

/// Appends annotated frames to a video sink.
pub struct AnnotatedVideoWriter {
    sink: Box<dyn VideoSink>,
    written: usize,
    missing: usize,
}

impl AnnotatedVideoWriter {
    pub fn new(sink: Box<dyn VideoSink>) -> Self {
        Self {
            sink,
            written: 0,
            missing: 0,
        }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and close the underlying sink.
    pub fn finish(mut self) -> VisionResult<usize> {
        self.sink.finish()?;
        if self.missing > 0 {
            log::warn!(
                "⚠️ {} frames had no annotated image and were not written",
                self.missing
            );
        }
        Ok(self.written)
    }
}

impl FrameConsumer for AnnotatedVideoWriter {
    fn on_frame(&mut self, report: &FrameReport) -> VisionResult<ControlFlow<()>> {
        match &report.annotated {
            Some(frame) => {
                self.sink.write_frame(frame)?;
                self.written += 1;
            }
            None => self.missing += 1,
        }
        Ok(ControlFlow::Continue(()))
    }
}

/// Stops the run after a fixed number of frames.
pub struct FrameLimit {
    remaining: usize,
}

impl FrameLimit {
    pub fn new(max_frames: usize) -> Self {
        Self {
            remaining: max_frames,
        }
    }
}

impl FrameConsumer for FrameLimit {
    fn on_frame(&mut self, _report: &FrameReport) -> VisionResult<ControlFlow<()>> {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            return Ok(ControlFlow::Break(()));
        }
        Ok(ControlFlow::Continue(()))
    }
}

/// Forwards each report to every consumer; breaks if any of them breaks.
#[derive(Default)]
pub struct Tee<'a> {
    consumers: Vec<&'a mut dyn FrameConsumer>,
}

impl<'a> Tee<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, consumer: &'a mut dyn FrameConsumer) -> Self {
        self.consumers.push(consumer);
        self
    }

    pub fn push(&mut self, consumer: &'a mut dyn FrameConsumer) {
        self.consumers.push(consumer);
    }
}

impl FrameConsumer for Tee<'_> {
    fn on_frame(&mut self, report: &FrameReport) -> VisionResult<ControlFlow<()>> {
        let mut flow = ControlFlow::Continue(());
        for consumer in self.consumers.iter_mut() {
            if consumer.on_frame(report)?.is_break() {
                flow = ControlFlow::Break(());
            }
        }
        Ok(flow)
    }
}
