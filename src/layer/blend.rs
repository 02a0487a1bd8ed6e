//! Pixel compositing primitives used when building adaptive icons.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::icon::SizePx;

// ============================================================================
// Scaling
// ============================================================================

/// Resizes with bilinear filtering to exactly `size`.
pub fn resize_exact(src: &RgbaImage, size: SizePx) -> RgbaImage {
    let size = size.at_least_one();
    imageops::resize(src, size.width, size.height, FilterType::Triangle)
}

/// Resizes without filtering, like an unfiltered scaled-bitmap copy.
pub fn resize_unfiltered(src: &RgbaImage, size: SizePx) -> RgbaImage {
    let size = size.at_least_one();
    imageops::resize(src, size.width, size.height, FilterType::Nearest)
}

/// Offset that centers an `inner` box inside an `outer` box.
pub fn centered_offset(outer: SizePx, inner: SizePx) -> (i32, i32) {
    (
        (outer.width as i32 - inner.width as i32) / 2,
        (outer.height as i32 - inner.height as i32) / 2,
    )
}

// ============================================================================
// Compositing
// ============================================================================

/// Composites a source image onto a destination image at the specified position.
///
/// Uses standard alpha blending (source over destination).
pub fn composite_over(dest: &mut RgbaImage, src: &RgbaImage, x: i32, y: i32) {
    let dest_width = dest.width() as i32;
    let dest_height = dest.height() as i32;

    for sy in 0..src.height() {
        for sx in 0..src.width() {
            let dx = x + sx as i32;
            let dy = y + sy as i32;

            if dx < 0 || dy < 0 || dx >= dest_width || dy >= dest_height {
                continue;
            }

            let src_pixel = src.get_pixel(sx, sy);
            let dst_pixel = dest.get_pixel(dx as u32, dy as u32);
            let blended = alpha_blend(*src_pixel, *dst_pixel);
            dest.put_pixel(dx as u32, dy as u32, blended);
        }
    }
}

/// Gates `layer` by the alpha of `mask` (destination-in).
///
/// Both images are aligned at the origin; pixels of `layer` outside the mask
/// are cleared.
pub fn mask_destination_in(layer: &mut RgbaImage, mask: &RgbaImage) {
    for (x, y, pixel) in layer.enumerate_pixels_mut() {
        let mask_alpha = if x < mask.width() && y < mask.height() {
            mask.get_pixel(x, y)[3]
        } else {
            0
        };
        pixel[3] = ((pixel[3] as u16 * mask_alpha as u16 + 127) / 255) as u8;
        if pixel[3] == 0 {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }
}

/// Alpha blends two RGBA pixels (source over destination).
fn alpha_blend(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    let sa = src[3] as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;

    let out_a = sa + da * (1.0 - sa);

    if out_a == 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend = |s: u8, d: u8| -> u8 {
        let sf = s as f32 / 255.0;
        let df = d as f32 / 255.0;
        let out = (sf * sa + df * da * (1.0 - sa)) / out_a;
        (out * 255.0).round() as u8
    };

    Rgba([
        blend(src[0], dst[0]),
        blend(src[1], dst[1]),
        blend(src[2], dst[2]),
        (out_a * 255.0).round() as u8,
    ])
}
