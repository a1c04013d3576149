//! Debug overlay for detections

use super::detector::Detection;
use crate::video::Frame;
use ab_glyph::{Font, FontRef, PxScale, ScaleFont};
use image::Rgb;
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

/// Yellow box colour, shared by the label text
pub const BOX_COLOR: Rgb<u8> = Rgb([255, 255, 0]);

/// Outline thickness in pixels
const BOX_THICKNESS: u32 = 2;

/// Label glyph height in pixels
const LABEL_SCALE: f32 = 13.0;

/// Gap between the label baseline and the top of the box
const LABEL_GAP: i32 = 5;

static LABEL_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSansMono.ttf");

/// Copy of `frame` with a box and a `"{champion} ({confidence:.2})"` label
/// drawn for every detection
pub fn annotate(frame: &Frame, detections: &[Detection]) -> Frame {
    let mut canvas = frame.clone();
    if detections.is_empty() {
        return canvas;
    }

    let font = match FontRef::try_from_slice(LABEL_FONT) {
        Ok(font) => Some(font),
        Err(err) => {
            log::warn!("Label font unusable, drawing boxes only: {err}");
            None
        }
    };
    for detection in detections {
        draw_box(&mut canvas, detection);
        if let Some(font) = &font {
            draw_label(&mut canvas, font, detection);
        }
    }
    canvas
}

/// Baseline sits `LABEL_GAP` above the box; pushed down to row 0 when the
/// box is too close to the top edge.
fn draw_label(canvas: &mut Frame, font: &FontRef<'_>, detection: &Detection) {
    let scale = PxScale::from(LABEL_SCALE);
    let ascent = font.as_scaled(scale).ascent().ceil() as i32;
    let top = (detection.bbox.y as i32 - LABEL_GAP - ascent).max(0);
    draw_text_mut(
        canvas,
        BOX_COLOR,
        detection.bbox.x as i32,
        top,
        scale,
        font,
        &detection.label(),
    );
}

fn draw_box(canvas: &mut Frame, detection: &Detection) {
    let bbox = detection.bbox;
    // Inner rings go inward so the outline never leaves the matched area
    for inset in 0..BOX_THICKNESS {
        let (width, height) = (
            bbox.width.saturating_sub(inset * 2),
            bbox.height.saturating_sub(inset * 2),
        );
        if width == 0 || height == 0 {
            break;
        }
        let rect = Rect::at((bbox.x + inset) as i32, (bbox.y + inset) as i32).of_size(width, height);
        draw_hollow_rect_mut(canvas, rect, BOX_COLOR);
    }
}
