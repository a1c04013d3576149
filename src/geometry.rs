//! Integer geometry shared by the cropper and the icon matcher

use serde::{Deserialize, Serialize};

/// An exact fraction, so `floor(value × n / d)` never suffers float rounding
/// (1080 × 800/1080 must land on 800, not 799).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ratio {
    pub numerator: u32,
    pub denominator: u32,
}

impl Ratio {
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// `floor(value × numerator / denominator)`; zero when the denominator is zero.
    pub fn floor_of(&self, value: u32) -> u32 {
        if self.denominator == 0 {
            return 0;
        }
        (u64::from(value) * u64::from(self.numerator) / u64::from(self.denominator)) as u32
    }
}

/// Axis-aligned box in pixel coordinates, top-left inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive bottom-right corner.
    pub fn bottom_right(&self) -> (u32, u32) {
        (self.x + self.width, self.y + self.height)
    }

    pub fn center(&self) -> (u32, u32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        let (right, bottom) = self.bottom_right();
        right <= width && bottom <= height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_of_is_exact() {
        let minimap = Ratio::new(800, 1080);
        assert_eq!(minimap.floor_of(1080), 800);
        assert_eq!(minimap.floor_of(720), 533);
        assert_eq!(minimap.floor_of(1440), 1066);

        let icon = Ratio::new(25, 280);
        assert_eq!(icon.floor_of(280), 25);
        assert_eq!(icon.floor_of(187), 16);
    }

    #[test]
    fn test_zero_denominator() {
        assert_eq!(Ratio::new(1, 0).floor_of(100), 0);
    }

    #[test]
    fn test_bounding_box_corners() {
        let bbox = BoundingBox::new(10, 20, 13, 13);
        assert_eq!(bbox.bottom_right(), (23, 33));
        assert_eq!(bbox.center(), (16, 26));
        assert!(bbox.fits_within(23, 33));
        assert!(!bbox.fits_within(22, 33));
    }
}
