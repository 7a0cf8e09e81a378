//! Aspect-preserving resize onto a square model input.
//!
//! Ultralytics exports are trained on letterboxed frames: the frame is scaled
//! to fit the input square, centered, and the remainder is filled with gray.
//! Boxes come back in input pixels and are mapped to the source frame with
//! `Letterbox::unmap`.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

use crate::detect::result::RawDetection;

/// Padding fill used by Ultralytics preprocessing.
pub const PAD_COLOR: Rgb<u8> = Rgb([114, 114, 114]);

/// Geometry for fitting one frame size into a square input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Letterbox {
    side: u32,
    scale: f32,
    pad_x: u32,
    pad_y: u32,
    scaled_width: u32,
    scaled_height: u32,
    source_width: u32,
    source_height: u32,
}

impl Letterbox {
    /// Fit a `width`×`height` frame into a `side`×`side` input. `None` for empty sizes.
    pub fn fit(width: u32, height: u32, side: u32) -> Option<Self> {
        if width == 0 || height == 0 || side == 0 {
            return None;
        }
        let scale = (side as f32 / width as f32).min(side as f32 / height as f32);
        let scaled_width = ((width as f32 * scale).round() as u32).clamp(1, side);
        let scaled_height = ((height as f32 * scale).round() as u32).clamp(1, side);
        Some(Self {
            side,
            scale,
            pad_x: (side - scaled_width) / 2,
            pad_y: (side - scaled_height) / 2,
            scaled_width,
            scaled_height,
            source_width: width,
            source_height: height,
        })
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Left and top padding, in input pixels.
    pub fn padding(&self) -> (u32, u32) {
        (self.pad_x, self.pad_y)
    }

    /// Resize `image` and paste it centered on a gray square.
    pub fn apply(&self, image: &RgbImage) -> RgbImage {
        let resized = imageops::resize(
            image,
            self.scaled_width,
            self.scaled_height,
            FilterType::Triangle,
        );
        let mut canvas = RgbImage::from_pixel(self.side, self.side, PAD_COLOR);
        imageops::replace(&mut canvas, &resized, self.pad_x as i64, self.pad_y as i64);
        canvas
    }

    /// Map a box from input pixels back to the source frame, clamped to its bounds.
    pub fn unmap(&self, raw: &RawDetection) -> RawDetection {
        let max_x = self.source_width as f32;
        let max_y = self.source_height as f32;
        let x = |v: f32| ((v - self.pad_x as f32) / self.scale).clamp(0.0, max_x);
        let y = |v: f32| ((v - self.pad_y as f32) / self.scale).clamp(0.0, max_y);
        RawDetection::new(x(raw.x1), y(raw.y1), x(raw.x2), y(raw.y2), raw.confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_frames_are_padded_vertically() {
        let letterbox = Letterbox::fit(1280, 720, 640).unwrap();
        assert_eq!(letterbox.scale(), 0.5);
        assert_eq!(letterbox.padding(), (0, 140));
    }

    #[test]
    fn square_frames_need_no_padding() {
        let letterbox = Letterbox::fit(640, 640, 640).unwrap();
        assert_eq!(letterbox.scale(), 1.0);
        assert_eq!(letterbox.padding(), (0, 0));
    }

    #[test]
    fn empty_sizes_do_not_fit() {
        assert!(Letterbox::fit(0, 720, 640).is_none());
        assert!(Letterbox::fit(1280, 720, 0).is_none());
    }

    #[test]
    fn boxes_map_back_without_distortion() {
        let letterbox = Letterbox::fit(1280, 720, 640).unwrap();
        // A 100x100 square in the input is a 200x200 square in the frame.
        let mapped = letterbox.unmap(&RawDetection::new(100.0, 150.0, 200.0, 250.0, 0.7));
        assert_eq!(mapped, RawDetection::new(200.0, 20.0, 400.0, 220.0, 0.7));
    }

    #[test]
    fn boxes_in_the_padding_are_clamped() {
        let letterbox = Letterbox::fit(1280, 720, 640).unwrap();
        let mapped = letterbox.unmap(&RawDetection::new(0.0, 0.0, 640.0, 640.0, 0.4));
        assert_eq!(mapped, RawDetection::new(0.0, 0.0, 1280.0, 720.0, 0.4));
    }

    #[test]
    fn frame_is_centered_on_gray() {
        let frame = RgbImage::from_pixel(1280, 720, Rgb([255, 255, 255]));
        let input = Letterbox::fit(1280, 720, 640).unwrap().apply(&frame);
        assert_eq!(input.dimensions(), (640, 640));
        assert_eq!(*input.get_pixel(10, 100), PAD_COLOR);
        assert_eq!(*input.get_pixel(10, 560), PAD_COLOR);
        assert!(input.get_pixel(10, 320)[0] >= 250);
        assert!(input.get_pixel(630, 141)[0] >= 250);
    }
}
