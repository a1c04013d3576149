//! Minimap cropping
//!
//! Cuts the square minimap out of the bottom-right corner of every frame of a
//! gameplay recording and writes the result as a new video at the same frame rate.

pub mod region;

pub use region::CropRegion;

use crate::error::{VisionError, VisionResult};
use crate::geometry::Ratio;
use crate::video::{Fourcc, SinkSettings, VideoBackend};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct CropConfig {
    /// Fraction of the frame height that lies above the minimap
    pub minimap_ratio: Ratio,
    /// File created inside the output directory (overwritten if present)
    pub output_file_name: String,
    /// Codec identifier for the output stream
    pub fourcc: Fourcc,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            minimap_ratio: Ratio::new(800, 1080),
            output_file_name: "minimap.mp4".to_string(),
            fourcc: Fourcc::MP4V,
        }
    }
}

/// Result of a successful crop
#[derive(Debug, Clone, PartialEq)]
pub struct CropOutcome {
    pub output_path: PathBuf,
    pub region: CropRegion,
    pub frames_written: usize,
    pub fps: f64,
}

pub struct MinimapCropper {
    config: CropConfig,
}

impl MinimapCropper {
    pub fn new(config: CropConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CropConfig {
        &self.config
    }

    /// Crop `input` into `<output_dir>/<output_file_name>`.
    ///
    /// The output directory is checked before the input is opened. A run that
    /// fails midway may leave a partial output file behind.
    pub fn crop(
        &self,
        backend: &dyn VideoBackend,
        input: &Path,
        output_dir: &Path,
    ) -> VisionResult<CropOutcome> {
        if !output_dir.is_dir() {
            return Err(VisionError::OutputDirectoryMissing {
                path: output_dir.to_path_buf(),
            });
        }
        let output_path = output_dir.join(&self.config.output_file_name);

        let mut source = backend.open_source(input)?;
        let first = source.read_frame()?.ok_or_else(|| VisionError::EmptyVideo {
            path: input.to_path_buf(),
        })?;
        let (width, height) = first.dimensions();
        let region = CropRegion::from_frame_size(width, height, &self.config.minimap_ratio)?;
        let fps = source.info().fps;

        log::info!(
            "Cropping {:?} ({}x{} @ {:.2} fps): minimap {}px at ({}, {})",
            input,
            width,
            height,
            fps,
            region.size,
            region.x,
            region.y
        );

        let mut sink = backend.create_sink(
            &output_path,
            SinkSettings {
                width: region.size,
                height: region.size,
                fps,
                fourcc: self.config.fourcc,
            },
        )?;

        source.rewind()?;
        let mut frames_written = 0usize;
        while let Some(frame) = source.read_frame()? {
            if frame.dimensions() != (width, height) {
                return Err(VisionError::InvalidFrameSize {
                    width: frame.width(),
                    height: frame.height(),
                    reason: format!(
                        "frame {frames_written} differs from the first frame ({width}x{height})"
                    ),
                });
            }
            let minimap = region.crop(&frame)?;
            sink.write_frame(&minimap)?;
            frames_written += 1;
            if frames_written % 100 == 0 {
                log::debug!("  ⏳ Cropped {} frames", frames_written);
            }
        }
        sink.finish()?;

        log::info!("Wrote {} frames to {:?}", frames_written, output_path);

        Ok(CropOutcome {
            output_path,
            region,
            frames_written,
            fps,
        })
    }
}
