//! Decoded video frames.
//!
//! A `Frame` pairs a decoded RGB image with its zero-based position in the
//! source video. Frames are produced by an ingest source in strictly
//! increasing index order and handed to the detector one at a time.

use image::RgbImage;

/// One decoded frame and its index within the video.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Zero-based frame index in decode order.
    pub index: u64,
    /// Decoded pixels, RGB24.
    pub image: RgbImage,
}

impl Frame {
    pub fn new(index: u64, image: RgbImage) -> Self {
        Self { index, image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Mean absolute luma difference against another frame of the same size.
    ///
    /// Returns `None` when the dimensions differ.
    pub fn mean_luma_delta(&self, other: &Frame) -> Option<f64> {
        if self.image.dimensions() != other.image.dimensions() {
            return None;
        }
        let pixel_count = (self.width() as u64) * (self.height() as u64);
        if pixel_count == 0 {
            return Some(0.0);
        }
        let total: f64 = self
            .image
            .pixels()
            .zip(other.image.pixels())
            .map(|(a, b)| (luma(a.0) - luma(b.0)).abs())
            .sum();
        Some(total / pixel_count as f64)
    }
}

/// Rec. 601 luma of an RGB pixel, in the 0..=255 range.
pub(crate) fn luma(rgb: [u8; 3]) -> f64 {
    0.299 * rgb[0] as f64 + 0.587 * rgb[1] as f64 + 0.114 * rgb[2] as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn luma_delta_is_zero_for_identical_frames() {
        let a = Frame::new(0, RgbImage::from_pixel(4, 4, Rgb([10, 20, 30])));
        let b = Frame::new(1, RgbImage::from_pixel(4, 4, Rgb([10, 20, 30])));
        assert_eq!(a.mean_luma_delta(&b), Some(0.0));
    }

    #[test]
    fn luma_delta_averages_over_all_pixels() {
        let a = Frame::new(0, RgbImage::from_pixel(2, 2, Rgb([0, 0, 0])));
        let mut img = RgbImage::from_pixel(2, 2, Rgb([0, 0, 0]));
        img.put_pixel(0, 0, Rgb([255, 255, 255]));
        let b = Frame::new(1, img);
        let delta = a.mean_luma_delta(&b).unwrap();
        assert!((delta - 255.0 / 4.0).abs() < 1e-6);
    }

    #[test]
    fn luma_delta_rejects_mismatched_sizes() {
        let a = Frame::new(0, RgbImage::new(2, 2));
        let b = Frame::new(1, RgbImage::new(3, 2));
        assert!(a.mean_luma_delta(&b).is_none());
    }
}
