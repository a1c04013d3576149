//! Square minimap region anchored at the bottom-right corner of a frame

use crate::error::{VisionError, VisionResult};
use crate::geometry::{BoundingBox, Ratio};
use crate::video::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub size: u32,
}

impl CropRegion {
    /// Derive the region from the first frame's size.
    ///
    /// `minimap_size = height − floor(height × ratio)`, placed so the square's
    /// bottom-right corner is the frame's bottom-right corner.
    pub fn from_frame_size(width: u32, height: u32, ratio: &Ratio) -> VisionResult<Self> {
        let minimap_x = ratio.floor_of(height);
        let size = height.saturating_sub(minimap_x);

        if size == 0 {
            return Err(VisionError::InvalidFrameSize {
                width,
                height,
                reason: format!(
                    "minimap ratio {}/{} leaves no rows for the minimap",
                    ratio.numerator, ratio.denominator
                ),
            });
        }
        if size > width {
            return Err(VisionError::InvalidFrameSize {
                width,
                height,
                reason: format!("a {size}px square minimap does not fit horizontally"),
            });
        }

        Ok(Self {
            x: width - size,
            y: height - size,
            size,
        })
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::new(self.x, self.y, self.size, self.size)
    }

    /// Whether the region lies fully inside a `width × height` frame
    pub fn fits(&self, width: u32, height: u32) -> bool {
        self.bounding_box().fits_within(width, height)
    }

    /// Copy the region out of `frame`.
    pub fn crop(&self, frame: &Frame) -> VisionResult<Frame> {
        if !self.fits(frame.width(), frame.height()) {
            return Err(VisionError::InvalidFrameSize {
                width: frame.width(),
                height: frame.height(),
                reason: format!(
                    "crop region [{},{},{},{}] exceeds the frame",
                    self.x, self.y, self.size, self.size
                ),
            });
        }
        Ok(image::imageops::crop_imm(frame, self.x, self.y, self.size, self.size).to_image())
    }
}
