//! Adaptive icon composition.
//!
//! Icon packs that do not ship adaptive icons describe a recipe instead: one
//! or more back plates, an optional mask, an optional front overlay and a
//! scale factor. [`AdaptiveIconComposer`] applies that recipe to an
//! application's default icon and produces a two-layer [`Drawable`].
//!
//! # Composition
//!
//! ```text
//! base icon ──► rasterize ──► scale (pack factor, or 0.7 on opaque backs)
//!                                  │
//!                                  ▼
//!                     centered on a plate-sized layer
//!                                  │
//!                     gated by the mask alpha
//!                                  │
//!                     front overlay drawn on top
//!                                  │
//!                                  ▼
//!  Adaptive(back plate, FixedScale(layer, normalization scale))
//! ```

pub mod blend;
pub mod normalizer;
pub mod svg;

use std::sync::Arc;

use image::RgbaImage;
use rand::seq::SliceRandom;

use crate::cache::{CacheKey, DiskIconCache};
use crate::config::EngineConfig;
use crate::icon::{ComponentName, Drawable, SizePx};
use blend::{centered_offset, composite_over, mask_destination_in, resize_unfiltered};
use normalizer::{IconNormalizer, is_transparent_bitmap};

/// Largest accepted foreground scale factor. Larger factors would only crop
/// the icon while costing memory proportional to their square.
pub const MAX_SCALE_FACTOR: f32 = 2.0;

// ============================================================================
// LayerRole
// ============================================================================

/// Which part of an icon a cache entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerRole {
    /// A flat icon used as-is.
    None,
    /// The foreground layer of a composed adaptive icon.
    Front,
    /// The background layer of a composed adaptive icon.
    Back,
}

impl LayerRole {
    /// File name suffix for cache entries of this role.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Front => "_front",
            Self::Back => "_back",
        }
    }
}

// ============================================================================
// LayerAssets
// ============================================================================

/// Pack-supplied artwork used to build adaptive icons.
///
/// Parsed once per pack load and shared read-only by every compositing call
/// while the pack is active.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerAssets {
    /// Background plates; one is picked per application.
    pub back_images: Vec<Arc<RgbaImage>>,
    /// Silhouette gating the foreground.
    pub mask_image: Option<Arc<RgbaImage>>,
    /// Decorative overlay drawn last.
    pub front_image: Option<Arc<RgbaImage>>,
    /// Size of the foreground relative to the back plate.
    pub scale_factor: f32,
}

impl Default for LayerAssets {
    fn default() -> Self {
        Self {
            back_images: Vec::new(),
            mask_image: None,
            front_image: None,
            scale_factor: 1.0,
        }
    }
}

impl LayerAssets {
    pub fn has_back_images(&self) -> bool {
        !self.back_images.is_empty()
    }
}

// ============================================================================
// Composition
// ============================================================================

/// What the composer did with a base icon.
#[derive(Debug, Clone, PartialEq)]
pub enum Composition {
    /// The base icon was returned untouched.
    Unchanged(Drawable),
    /// The base icon was wrapped into an adaptive icon on a plain background.
    Wrapped(Drawable),
    /// The pack recipe was applied.
    Layered {
        background: Drawable,
        foreground: Drawable,
    },
}

impl Composition {
    pub fn into_drawable(self) -> Drawable {
        match self {
            Self::Unchanged(d) | Self::Wrapped(d) => d,
            Self::Layered {
                background,
                foreground,
            } => Drawable::adaptive(background, foreground),
        }
    }
}

// ============================================================================
// AdaptiveIconComposer
// ============================================================================

/// Builds adaptive icons from a base icon and the active pack's layers.
#[derive(Debug, Clone)]
pub struct AdaptiveIconComposer {
    normalizer: IconNormalizer,
    opaque_back_scale: f32,
    transparency_threshold: f32,
    legacy_background: [u8; 4],
}

impl AdaptiveIconComposer {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            normalizer: IconNormalizer::new(config.normalizer_size),
            opaque_back_scale: config.opaque_back_scale,
            transparency_threshold: config.transparency_threshold,
            legacy_background: config.legacy_background,
        }
    }

    pub fn normalizer(&self) -> &IconNormalizer {
        &self.normalizer
    }

    /// Composes `base` for `component` and writes the layers through to the
    /// cache. Never fails; at worst the base icon comes back unchanged.
    pub fn compose(
        &self,
        base: &Drawable,
        component: &ComponentName,
        pack: &str,
        layers: &LayerAssets,
        cache: &DiskIconCache,
    ) -> Drawable {
        match self.compose_layers(base, layers) {
            Composition::Layered {
                background,
                foreground,
            } => {
                cache.store_drawable(&CacheKey::new(pack, component, LayerRole::Back), &background);
                cache.store_drawable(&CacheKey::new(pack, component, LayerRole::Front), &foreground);
                Drawable::adaptive(background, foreground)
            }
            other => other.into_drawable(),
        }
    }

    /// Applies the pack recipe without touching the cache.
    pub fn compose_layers(&self, base: &Drawable, layers: &LayerAssets) -> Composition {
        let Some(back) = layers.back_images.choose(&mut rand::thread_rng()) else {
            return self.ensure_adaptive(base);
        };

        let base_bitmap = base.to_bitmap();
        let size = SizePx::new(back.width(), back.height()).at_least_one();

        let factor = if is_transparent_bitmap(back, self.transparency_threshold) {
            layers.scale_factor
        } else {
            self.opaque_back_scale
        };
        let factor = if factor.is_finite() && factor > 0.0 {
            factor.min(MAX_SCALE_FACTOR)
        } else {
            1.0
        };

        let scaled = resize_unfiltered(&base_bitmap, size.scaled(factor).at_least_one());
        let mut layer = RgbaImage::new(size.width, size.height);
        let (x, y) = centered_offset(size, SizePx::new(scaled.width(), scaled.height()));
        composite_over(&mut layer, &scaled, x, y);

        // An undeclared mask is fully transparent; drawn in destination mode
        // it leaves the foreground as it is.
        if let Some(mask) = &layers.mask_image {
            let mut mask_canvas = RgbaImage::new(size.width, size.height);
            composite_over(&mut mask_canvas, mask, 0, 0);
            mask_destination_in(&mut layer, &mask_canvas);
        }

        if let Some(front) = &layers.front_image {
            composite_over(&mut layer, front, 0, 0);
        }

        let scale = self.normalizer.scale(base);
        Composition::Layered {
            background: Drawable::Bitmap(Arc::clone(back)),
            foreground: Drawable::fixed_scale(Drawable::bitmap(layer), scale),
        }
    }

    /// Without back plates every icon still ends up adaptive unless it
    /// already is, or already has the adaptive silhouette.
    fn ensure_adaptive(&self, base: &Drawable) -> Composition {
        if base.is_adaptive() {
            return Composition::Unchanged(base.clone());
        }
        let normalization = self.normalizer.against_adaptive_mask(base);
        if normalization.matches_shape {
            return Composition::Unchanged(base.clone());
        }
        Composition::Wrapped(self.wrap_to_adaptive(base, normalization.scale))
    }

    fn wrap_to_adaptive(&self, base: &Drawable, scale: f32) -> Drawable {
        let size = base.intrinsic_size();
        let side = size.width.max(size.height);
        Drawable::adaptive(
            Drawable::solid(side, self.legacy_background),
            Drawable::fixed_scale(base.clone(), scale),
        )
    }
}
