//! SVG rendering utilities using resvg/usvg.
//!
//! Vector drawables shipped by icon packs and the neutral adaptive-icon mask
//! are both rasterized through here.

use image::{Rgba, RgbaImage};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{Options, Tree};

/// Outline of the neutral adaptive-icon mask: a full circle in a 100x100 box.
pub const ADAPTIVE_MASK_PATH: &str = "M50 0A50 50,0,1,1,50 100A50 50,0,1,1,50 0Z";

/// Renders an SVG string to an RGBA image at the specified size.
///
/// The SVG is scaled to fit within `size x size` pixels while preserving
/// aspect ratio (the larger dimension will be `size`).
///
/// Returns `None` if the SVG cannot be parsed or rendered.
pub fn render_svg(svg_data: &str, size: u32) -> Option<RgbaImage> {
    let opts = Options::default();
    let tree = Tree::from_str(svg_data, &opts).ok()?;

    let svg_size = tree.size();
    let scale = (size as f32) / svg_size.width().max(svg_size.height());
    let width = (svg_size.width() * scale).ceil() as u32;
    let height = (svg_size.height() * scale).ceil() as u32;

    let mut pixmap = Pixmap::new(width, height)?;
    let transform = Transform::from_scale(scale, scale);
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    Some(pixmap_to_rgba_image(&pixmap))
}

/// Renders the neutral adaptive-icon mask as an opaque silhouette.
pub fn adaptive_icon_mask(size: u32) -> Option<RgbaImage> {
    let svg = format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100" viewBox="0 0 100 100"><path d="{ADAPTIVE_MASK_PATH}" fill="#000000"/></svg>"##
    );
    render_svg(&svg, size)
}

/// Converts a tiny_skia Pixmap to an image::RgbaImage.
fn pixmap_to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let width = pixmap.width();
    let height = pixmap.height();
    let mut img = RgbaImage::new(width, height);

    for (x, y, out) in img.enumerate_pixels_mut() {
        if let Some(pixel) = pixmap.pixel(x, y) {
            // tiny_skia uses premultiplied alpha
            let (r, g, b, a) =
                unpremultiply(pixel.red(), pixel.green(), pixel.blue(), pixel.alpha());
            *out = Rgba([r, g, b, a]);
        }
    }

    img
}

/// Unpremultiplies a premultiplied alpha pixel.
fn unpremultiply(r: u8, g: u8, b: u8, a: u8) -> (u8, u8, u8, u8) {
    if a == 0 {
        (0, 0, 0, 0)
    } else {
        let a_f = a as f32 / 255.0;
        (
            (r as f32 / a_f).round().min(255.0) as u8,
            (g as f32 / a_f).round().min(255.0) as u8,
            (b as f32 / a_f).round().min(255.0) as u8,
            a,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100"><circle cx="50" cy="50" r="40" fill="#ff0000"/></svg>"##;

    #[test]
    fn render_simple_svg() {
        let img = render_svg(SIMPLE_SVG, 50).unwrap();
        assert!(img.width() <= 50);
        assert!(img.height() <= 50);

        let center = img.get_pixel(img.width() / 2, img.height() / 2);
        assert_eq!(center.0, [255, 0, 0, 255]);
    }

    #[test]
    fn render_invalid_svg_is_none() {
        assert!(render_svg("<not-svg", 32).is_none());
    }

    #[test]
    fn adaptive_mask_is_a_circle() {
        let mask = adaptive_icon_mask(64).unwrap();
        assert_eq!(mask.dimensions(), (64, 64));
        assert_eq!(mask.get_pixel(32, 32)[3], 255);
        assert_eq!(mask.get_pixel(0, 0)[3], 0);
        assert_eq!(mask.get_pixel(63, 63)[3], 0);
    }

    #[test]
    fn unpremultiply_restores_channels() {
        assert_eq!(unpremultiply(200, 0, 0, 255), (200, 0, 0, 255));
        assert_eq!(unpremultiply(20, 0, 0, 51), (100, 0, 0, 51));
        assert_eq!(unpremultiply(10, 10, 10, 0), (0, 0, 0, 0));
    }
}
