//! Bounding-box cropping of captured buffers.
//!
//! Trims left, right and bottom background while keeping a margin around the
//! content. The top edge is never trimmed. The output never shrinks below a
//! fixed share of the input, so a mostly empty capture still has a sensible
//! size.

use image::{GenericImageView, Rgba, RgbaImage};
use log::debug;
use serde::{Deserialize, Serialize};

use super::{CapturedBuffer, CroppedBuffer};
use crate::rendering::raster::WHITE;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropPolicy {
    /// Channel value above which a pixel counts as background.
    pub threshold: u8,
    /// Alpha at or above which a near-white pixel counts as background.
    pub alpha_threshold: u8,
    pub margin: u32,
    pub min_width_ratio: f32,
    pub min_height_ratio: f32,
}

impl Default for CropPolicy {
    fn default() -> Self {
        Self {
            threshold: 250,
            alpha_threshold: 250,
            margin: 10,
            min_width_ratio: 0.5,
            min_height_ratio: 0.7,
        }
    }
}

impl CropPolicy {
    pub fn is_background(&self, px: &Rgba<u8>) -> bool {
        px[0] > self.threshold && px[1] > self.threshold && px[2] > self.threshold && px[3] >= self.alpha_threshold
    }

    pub fn validate(&self) -> Result<()> {
        let ratio_ok = |r: f32| r.is_finite() && r > 0.0 && r <= 1.0;
        if !ratio_ok(self.min_width_ratio) || !ratio_ok(self.min_height_ratio) {
            return Err(Error::ConfigError(format!(
                "crop ratios must be in (0, 1], got {} and {}",
                self.min_width_ratio, self.min_height_ratio
            )));
        }
        Ok(())
    }
}

/// Source region kept by a crop: `[left, 0, width, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBounds {
    pub left: u32,
    pub width: u32,
    pub height: u32,
}

impl CropBounds {
    /// Scan `image` for content and compute the region to keep.
    pub fn detect(image: &RgbaImage, policy: &CropPolicy) -> Self {
        let (w, h) = image.dimensions();
        let mut first_col: Option<u32> = None;
        let mut last_col: Option<u32> = None;
        let mut last_row: Option<u32> = None;

        for (x, y, px) in image.enumerate_pixels() {
            if policy.is_background(px) {
                continue;
            }
            first_col = Some(first_col.map_or(x, |c| c.min(x)));
            last_col = Some(last_col.map_or(x, |c| c.max(x)));
            last_row = Some(last_row.map_or(y, |r| r.max(y)));
        }

        let left = first_col.map_or(0, |c| c.saturating_sub(policy.margin));
        let right = last_col.map_or(w, |c| c.saturating_add(policy.margin));
        let bottom = last_row.map_or(h, |r| r.saturating_add(policy.margin));

        let min_w = (w as f64 * f64::from(policy.min_width_ratio)).ceil() as u32;
        let min_h = (h as f64 * f64::from(policy.min_height_ratio)).ceil() as u32;

        CropBounds {
            left,
            width: right.saturating_sub(left).max(min_w),
            height: bottom.max(min_h),
        }
    }
}

/// Crop `buffer` into a new buffer. Pixels outside the source are filled
/// with opaque white.
pub fn crop(buffer: &CapturedBuffer, policy: &CropPolicy) -> Result<CroppedBuffer> {
    let (w, h) = buffer.dimensions();
    if w == 0 || h == 0 {
        return Err(Error::CropFailure(format!("cannot crop a {}x{} buffer", w, h)));
    }
    policy.validate().map_err(|e| Error::CropFailure(e.to_string()))?;

    let bounds = CropBounds::detect(buffer, policy);
    if bounds.width == 0 || bounds.height == 0 {
        return Err(Error::CropFailure(format!("empty crop region {:?}", bounds)));
    }

    let mut out = RgbaImage::from_pixel(bounds.width, bounds.height, WHITE);
    let copy_w = bounds.width.min(w.saturating_sub(bounds.left));
    let copy_h = bounds.height.min(h);
    if copy_w > 0 && copy_h > 0 {
        let view = buffer.view(bounds.left, 0, copy_w, copy_h);
        for (x, y, px) in view.pixels() {
            out.put_pixel(x, y, px);
        }
    }
    debug!(
        "Cropped {}x{} -> {}x{} (left {})",
        w, h, bounds.width, bounds.height, bounds.left
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, WHITE)
    }

    #[test]
    fn small_square_clamps_to_minimum_share() {
        let mut img = white(1000, 1000);
        for y in 100..120 {
            for x in 100..120 {
                img.put_pixel(x, y, Rgba([255, 0, 0, 255]));
            }
        }
        let out = crop(&img, &CropPolicy::default()).unwrap();
        assert_eq!(out.dimensions(), (500, 700));
        assert_eq!(*out.get_pixel(10, 100), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn corner_square_keeps_left_edge() {
        let mut img = white(1000, 1000);
        for y in 0..20 {
            for x in 0..20 {
                img.put_pixel(x, y, Rgba([255, 0, 0, 255]));
            }
        }
        let policy = CropPolicy::default();
        let bounds = CropBounds::detect(&img, &policy);
        assert_eq!(bounds.left, 0);
        let out = crop(&img, &policy).unwrap();
        assert_eq!(out.dimensions(), (500, 700));
        assert_eq!(*out.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
        assert_eq!(*out.get_pixel(19, 19), Rgba([255, 0, 0, 255]));
        assert_eq!(*out.get_pixel(20, 20), WHITE);
    }

    #[test]
    fn all_background_keeps_dimensions() {
        let out = crop(&white(320, 240), &CropPolicy::default()).unwrap();
        assert_eq!(out.dimensions(), (320, 240));
    }

    #[test]
    fn translucent_white_counts_as_content() {
        let mut img = white(100, 100);
        img.put_pixel(50, 90, Rgba([255, 255, 255, 10]));
        let bounds = CropBounds::detect(&img, &CropPolicy::default());
        assert_eq!(bounds.left, 40);
        assert_eq!(bounds.height, 100);
    }

    #[test]
    fn margins_are_kept_around_content() {
        let mut img = white(400, 400);
        for y in 0..380 {
            for x in 30..370 {
                img.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
        let bounds = CropBounds::detect(&img, &CropPolicy::default());
        assert_eq!(bounds, CropBounds { left: 20, width: 359, height: 389 });
    }

    #[test]
    fn recrop_changes_size_by_at_most_the_margin() {
        let mut img = white(600, 500);
        for y in 40..460 {
            for x in 80..520 {
                img.put_pixel(x, y, Rgba([10, 20, 30, 255]));
            }
        }
        let policy = CropPolicy::default();
        let once = crop(&img, &policy).unwrap();
        let twice = crop(&once, &policy).unwrap();
        assert!(once.width().abs_diff(twice.width()) <= policy.margin);
        assert!(once.height().abs_diff(twice.height()) <= policy.margin);
    }

    #[test]
    fn output_never_below_minimum_share() {
        let mut img = white(777, 333);
        img.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        let out = crop(&img, &CropPolicy::default()).unwrap();
        assert!(out.width() as f32 >= 0.5 * 777.0);
        assert!(out.height() as f32 >= 0.7 * 333.0);
    }

    #[test]
    fn zero_sized_buffer_is_a_crop_failure() {
        let err = crop(&RgbaImage::new(0, 10), &CropPolicy::default()).unwrap_err();
        assert!(matches!(err, Error::CropFailure(_)));
    }
}
