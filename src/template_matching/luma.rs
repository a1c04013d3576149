//! BT.601 luma conversion shared by frames and icon templates

use image::{GrayImage, Luma, RgbImage};

// 14-bit fixed point weights for 0.299 / 0.587 / 0.114, summing to 1 << 14
const R_WEIGHT: u32 = 4899;
const G_WEIGHT: u32 = 9617;
const B_WEIGHT: u32 = 1868;
const SHIFT: u32 = 14;

/// Luma of one RGB pixel, rounded half up.
pub fn luma_of(rgb: [u8; 3]) -> u8 {
    let [r, g, b] = rgb.map(u32::from);
    let weighted = r * R_WEIGHT + g * G_WEIGHT + b * B_WEIGHT + (1 << (SHIFT - 1));
    // 255 * (1 << 14) + rounding still shifts down to at most 255
    (weighted >> SHIFT) as u8
}

/// Convert an RGB image to luma with BT.601 weights.
pub fn to_luma(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([luma_of(image.get_pixel(x, y).0)])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_primary_colours() {
        assert_eq!(luma_of([255, 0, 0]), 76);
        assert_eq!(luma_of([0, 255, 0]), 150);
        assert_eq!(luma_of([0, 0, 255]), 29);
    }

    #[test]
    fn test_greys_are_preserved() {
        for value in [0u8, 1, 127, 128, 254, 255] {
            assert_eq!(luma_of([value; 3]), value);
        }
    }

    #[test]
    fn test_image_conversion() {
        let mut image = RgbImage::from_pixel(3, 2, Rgb([255, 255, 0]));
        image.put_pixel(2, 1, Rgb([0, 0, 255]));

        let gray = to_luma(&image);
        assert_eq!(gray.dimensions(), (3, 2));
        assert_eq!(gray.get_pixel(0, 0), &Luma([226]));
        assert_eq!(gray.get_pixel(2, 1), &Luma([29]));
    }
}
