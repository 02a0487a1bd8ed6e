//! Icon normalization.
//!
//! Measures how much of its bounds an icon's visible silhouette covers and
//! derives the scale that makes it sit comfortably inside an adaptive-icon
//! mask. Also answers whether an icon already has the mask's silhouette and
//! whether a bitmap is mostly transparent.

use std::f32::consts::PI;

use image::{RgbaImage, imageops};

use super::blend::resize_unfiltered;
use super::svg::adaptive_icon_mask;
use crate::icon::{Drawable, RectPx, SizePx};

/// Pixels at or below this alpha are treated as empty.
pub const MIN_VISIBLE_ALPHA: u8 = 40;

const MAX_CIRCLE_AREA_FACTOR: f32 = 380.0 / 576.0;
const MAX_SQUARE_AREA_FACTOR: f32 = 375.0 / 576.0;
const CIRCLE_AREA_BY_RECT: f32 = PI / 4.0;
const LINEAR_SCALE_SLOPE: f32 =
    (MAX_CIRCLE_AREA_FACTOR - MAX_SQUARE_AREA_FACTOR) / (1.0 - CIRCLE_AREA_BY_RECT);

/// Fraction of differing pixels still accepted as "same silhouette".
const PIXEL_DIFF_PERCENTAGE_THRESHOLD: f32 = 0.005;

/// Result of measuring one icon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    /// Scale to apply so the icon's visible area fits the mask.
    pub scale: f32,
    /// True when the icon already matches the mask silhouette.
    pub matches_shape: bool,
    /// Bounds of the visible pixels, in normalizer space.
    pub bounds: Option<RectPx>,
}

impl Normalization {
    fn empty() -> Self {
        Self {
            scale: 1.0,
            matches_shape: false,
            bounds: None,
        }
    }
}

/// Measures icons at a fixed working resolution.
#[derive(Debug, Clone)]
pub struct IconNormalizer {
    size: u32,
    adaptive_mask: Option<RgbaImage>,
}

impl IconNormalizer {
    /// Creates a normalizer working at `size x size` pixels.
    pub fn new(size: u32) -> Self {
        let size = size.max(8);
        let adaptive_mask = adaptive_icon_mask(size);
        if adaptive_mask.is_none() {
            tracing::warn!(size, "failed to render adaptive icon mask, shape checks disabled");
        }
        Self {
            size,
            adaptive_mask,
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Scale only, measured without any silhouette comparison.
    pub fn scale(&self, drawable: &Drawable) -> f32 {
        self.normalize(drawable, None).scale
    }

    /// Scale and silhouette match against the neutral adaptive-icon mask.
    pub fn against_adaptive_mask(&self, drawable: &Drawable) -> Normalization {
        self.normalize(drawable, self.adaptive_mask.as_ref())
    }

    /// Measures `drawable`, optionally comparing it against `shape`.
    pub fn normalize(&self, drawable: &Drawable, shape: Option<&RgbaImage>) -> Normalization {
        let raster = drawable.rasterize(SizePx::square(self.size));

        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        let mut area: u64 = 0;
        for y in 0..raster.height() {
            let mut left = None;
            let mut right = 0;
            for x in 0..raster.width() {
                if is_visible(&raster, x, y) {
                    left.get_or_insert(x);
                    right = x;
                }
            }
            let Some(left) = left else { continue };
            area += (right - left + 1) as u64;
            bounds = Some(match bounds {
                None => (left, y, right, y),
                Some((l, t, r, _)) => (l.min(left), t, r.max(right), y),
            });
        }

        let Some((l, t, r, b)) = bounds else {
            return Normalization::empty();
        };
        let rect = RectPx::new(l, t, r - l + 1, b - t + 1);

        let hull_by_rect = area as f32 / rect.area() as f32;
        let scale_required = if hull_by_rect < CIRCLE_AREA_BY_RECT {
            MAX_CIRCLE_AREA_FACTOR
        } else {
            MAX_SQUARE_AREA_FACTOR + LINEAR_SCALE_SLOPE * (1.0 - hull_by_rect)
        };

        let area_scale = area as f32 / (self.size as f32 * self.size as f32);
        let scale = if area_scale > scale_required {
            (scale_required / area_scale).sqrt()
        } else {
            1.0
        };

        let matches_shape = shape
            .map(|mask| matches_silhouette(&raster, rect, mask))
            .unwrap_or(false);

        Normalization {
            scale,
            matches_shape,
            bounds: Some(rect),
        }
    }
}

/// True when more than `threshold` of the bitmap's pixels are invisible.
pub fn is_transparent_bitmap(image: &RgbaImage, threshold: f32) -> bool {
    let total = image.width() as u64 * image.height() as u64;
    if total == 0 {
        return true;
    }
    let transparent = image
        .pixels()
        .filter(|p| p[3] <= MIN_VISIBLE_ALPHA)
        .count() as u64;
    transparent as f32 / total as f32 > threshold
}

fn is_visible(image: &RgbaImage, x: u32, y: u32) -> bool {
    image.get_pixel(x, y)[3] > MIN_VISIBLE_ALPHA
}

/// Bounds of the visible pixels, if any.
fn visible_bounds(image: &RgbaImage) -> Option<RectPx> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel[3] <= MIN_VISIBLE_ALPHA {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((l, t, r, b)) => (l.min(x), t.min(y), r.max(x), b.max(y)),
        });
    }
    bounds.map(|(l, t, r, b)| RectPx::new(l, t, r - l + 1, b - t + 1))
}

/// Compares the visible pixels inside `rect` with the mask's silhouette
/// stretched over the same box.
fn matches_silhouette(raster: &RgbaImage, rect: RectPx, mask: &RgbaImage) -> bool {
    let Some(mask_rect) = visible_bounds(mask) else {
        return false;
    };
    let cropped = imageops::crop_imm(mask, mask_rect.x, mask_rect.y, mask_rect.width, mask_rect.height)
        .to_image();
    let scaled_mask = if cropped.dimensions() == (rect.width, rect.height) {
        cropped
    } else {
        resize_unfiltered(&cropped, SizePx::new(rect.width, rect.height))
    };
    let mut differing = 0u64;
    for y in 0..rect.height {
        for x in 0..rect.width {
            let icon_visible = is_visible(raster, rect.x + x, rect.y + y);
            let mask_visible = is_visible(&scaled_mask, x, y);
            if icon_visible != mask_visible {
                differing += 1;
            }
        }
    }
    (differing as f32 / rect.area() as f32) < PIXEL_DIFF_PERCENTAGE_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn circle_icon(size: u32) -> Drawable {
        Drawable::bitmap(adaptive_icon_mask(size).unwrap())
    }

    #[test]
    fn full_square_is_scaled_down() {
        let normalizer = IconNormalizer::new(64);
        let square = Drawable::solid(64, [200, 10, 10, 255]);
        let n = normalizer.normalize(&square, None);

        assert_eq!(n.bounds, Some(RectPx::from_size(64, 64)));
        assert!((n.scale - MAX_SQUARE_AREA_FACTOR.sqrt()).abs() < 0.01);
        assert!(!n.matches_shape);
    }

    #[test]
    fn small_icon_is_left_alone() {
        let normalizer = IconNormalizer::new(64);
        let mut img = RgbaImage::new(64, 64);
        for y in 24..40 {
            for x in 24..40 {
                img.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
        let n = normalizer.normalize(&Drawable::bitmap(img), None);
        assert_eq!(n.scale, 1.0);
        assert_eq!(n.bounds, Some(RectPx::new(24, 24, 16, 16)));
    }

    #[test]
    fn empty_icon_has_unit_scale() {
        let normalizer = IconNormalizer::new(32);
        let n = normalizer.against_adaptive_mask(&Drawable::placeholder(32));
        assert_eq!(n, Normalization::empty());
    }

    #[test]
    fn circle_matches_adaptive_mask() {
        let normalizer = IconNormalizer::new(64);
        let n = normalizer.against_adaptive_mask(&circle_icon(64));
        assert!(n.matches_shape);

        let square = normalizer.against_adaptive_mask(&Drawable::solid(64, [1, 2, 3, 255]));
        assert!(!square.matches_shape);
    }

    #[test]
    fn transparency_check() {
        let opaque = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]));
        assert!(!is_transparent_bitmap(&opaque, 0.5));

        let mut ring = RgbaImage::new(10, 10);
        for x in 0..10 {
            ring.put_pixel(x, 0, Rgba([0, 0, 0, 255]));
        }
        assert!(is_transparent_bitmap(&ring, 0.5));
    }
}
