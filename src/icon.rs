//! Icon and identity types shared by the resolver, the composer and the cache.
//!
//! A [`Drawable`] is the engine's stand-in for a platform drawable: either a
//! flat bitmap, a two-layer adaptive icon, or a drawable drawn at a fixed
//! scale inside its bounds.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use image::{Rgba, RgbaImage};

use crate::layer::blend::{composite_over, resize_exact};

/// A rectangle defined in pixel coordinates.
///
/// The normalizer uses it for the bounds of an icon's visible pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RectPx {
    /// X offset from the left edge of the image
    pub x: u32,
    /// Y offset from the top edge of the image
    pub y: u32,
    /// Width of the rectangle
    pub width: u32,
    /// Height of the rectangle
    pub height: u32,
}

impl RectPx {
    /// Creates a new rectangle with the given position and dimensions.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Creates a rectangle starting at origin (0, 0) with the given dimensions.
    pub fn from_size(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }

    /// Returns the right edge coordinate (x + width).
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Returns the bottom edge coordinate (y + height).
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// A 2D size in pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SizePx {
    pub width: u32,
    pub height: u32,
}

impl SizePx {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn square(side: u32) -> Self {
        Self::new(side, side)
    }

    /// Returns true if width equals height.
    pub fn is_square(&self) -> bool {
        self.width == self.height
    }

    /// Scales both dimensions, truncating like an integer bitmap allocation.
    pub fn scaled(&self, factor: f32) -> Self {
        Self::new(
            (self.width as f32 * factor) as u32,
            (self.height as f32 * factor) as u32,
        )
    }

    /// Clamps both dimensions to at least one pixel.
    pub fn at_least_one(&self) -> Self {
        Self::new(self.width.max(1), self.height.max(1))
    }
}

// ============================================================================
// Drawable
// ============================================================================

/// The two layers of an adaptive icon.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveIcon {
    pub background: Box<Drawable>,
    pub foreground: Box<Drawable>,
}

/// Something that can be drawn as an icon.
///
/// Bitmaps are reference counted so pack assets can be shared by every
/// compositing call without copying pixels.
#[derive(Debug, Clone, PartialEq)]
pub enum Drawable {
    /// A flat RGBA bitmap.
    Bitmap(Arc<RgbaImage>),

    /// A background/foreground pair composited at display time.
    Adaptive(AdaptiveIcon),

    /// A drawable drawn at `scale` of its bounds, centered.
    FixedScale { inner: Box<Drawable>, scale: f32 },
}

impl Drawable {
    /// Wraps a bitmap.
    pub fn bitmap(image: RgbaImage) -> Self {
        Self::Bitmap(Arc::new(image))
    }

    /// Builds an adaptive icon from its two layers.
    pub fn adaptive(background: Drawable, foreground: Drawable) -> Self {
        Self::Adaptive(AdaptiveIcon {
            background: Box::new(background),
            foreground: Box::new(foreground),
        })
    }

    /// Wraps a drawable so it is drawn at a fixed fraction of its bounds.
    pub fn fixed_scale(inner: Drawable, scale: f32) -> Self {
        Self::FixedScale {
            inner: Box::new(inner),
            scale,
        }
    }

    /// A fully transparent square bitmap.
    pub fn placeholder(side: u32) -> Self {
        Self::bitmap(RgbaImage::new(side.max(1), side.max(1)))
    }

    /// A square bitmap filled with a single color.
    pub fn solid(side: u32, color: [u8; 4]) -> Self {
        Self::bitmap(RgbaImage::from_pixel(side.max(1), side.max(1), Rgba(color)))
    }

    /// Returns true for the dual-layer form.
    pub fn is_adaptive(&self) -> bool {
        matches!(self, Self::Adaptive(_))
    }

    /// Returns the underlying bitmap if this is a flat bitmap.
    pub fn as_bitmap(&self) -> Option<&Arc<RgbaImage>> {
        match self {
            Self::Bitmap(image) => Some(image),
            _ => None,
        }
    }

    /// The size the drawable renders at when no bounds are imposed.
    pub fn intrinsic_size(&self) -> SizePx {
        match self {
            Self::Bitmap(image) => SizePx::new(image.width(), image.height()),
            Self::Adaptive(layers) => layers.background.intrinsic_size(),
            Self::FixedScale { inner, .. } => inner.intrinsic_size(),
        }
    }

    /// Rasterizes at the intrinsic size.
    ///
    /// Flat bitmaps are returned as-is.
    pub fn to_bitmap(&self) -> RgbaImage {
        match self {
            Self::Bitmap(image) => image.as_ref().clone(),
            _ => self.rasterize(self.intrinsic_size().at_least_one()),
        }
    }

    /// Rasterizes into a bitmap of exactly `size`.
    pub fn rasterize(&self, size: SizePx) -> RgbaImage {
        let size = size.at_least_one();
        match self {
            Self::Bitmap(image) => {
                if image.width() == size.width && image.height() == size.height {
                    image.as_ref().clone()
                } else {
                    resize_exact(image, size)
                }
            }
            Self::Adaptive(layers) => {
                let mut canvas = layers.background.rasterize(size);
                let front = layers.foreground.rasterize(size);
                composite_over(&mut canvas, &front, 0, 0);
                canvas
            }
            Self::FixedScale { inner, scale } => {
                let mut canvas = RgbaImage::new(size.width, size.height);
                let scaled = size.scaled(*scale).at_least_one();
                let drawn = inner.rasterize(scaled);
                let x = (size.width as i32 - scaled.width as i32) / 2;
                let y = (size.height as i32 - scaled.height as i32) / 2;
                composite_over(&mut canvas, &drawn, x, y);
                canvas
            }
        }
    }
}

impl From<RgbaImage> for Drawable {
    fn from(image: RgbaImage) -> Self {
        Self::bitmap(image)
    }
}

// ============================================================================
// Identities
// ============================================================================

/// The launchable entry point of an application: package plus class name.
///
/// Displays as `ComponentInfo{package/class}`, which is also the form icon
/// pack appfilter documents use in their `component` attributes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentName {
    package: String,
    class: String,
}

impl ComponentName {
    pub fn new(package: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            class: class.into(),
        }
    }

    /// Parses the flat `package/class` form.
    ///
    /// A class starting with `.` is relative to the package.
    pub fn unflatten(flat: &str) -> Option<Self> {
        let (package, class) = flat.split_once('/')?;
        if package.is_empty() || class.is_empty() {
            return None;
        }
        let class = if class.starts_with('.') {
            format!("{package}{class}")
        } else {
            class.to_string()
        };
        Some(Self::new(package, class))
    }

    /// Returns the `package/class` form.
    pub fn flatten_to_string(&self) -> String {
        format!("{}/{}", self.package, self.class)
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn class_name(&self) -> &str {
        &self.class
    }
}

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentInfo{{{}/{}}}", self.package, self.class)
    }
}

impl FromStr for ComponentName {
    type Err = InvalidComponentName;

    /// Accepts both `ComponentInfo{package/class}` and `package/class`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let flat = trimmed
            .strip_prefix("ComponentInfo{")
            .and_then(|rest| rest.strip_suffix('}'))
            .unwrap_or(trimmed);
        Self::unflatten(flat).ok_or_else(|| InvalidComponentName(s.to_string()))
    }
}

/// Returned when a string is not a component name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("`{0}` is not a component name")]
pub struct InvalidComponentName(pub String);

/// The user profile an item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UserHandle(pub u32);

impl UserHandle {
    /// The primary user.
    pub const SYSTEM: Self = Self(0);
}

/// The themed target: a component as seen by one user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemIdentity {
    pub component: ComponentName,
    pub user: UserHandle,
}

impl ItemIdentity {
    pub fn new(component: ComponentName, user: UserHandle) -> Self {
        Self { component, user }
    }

    /// An item owned by the primary user.
    pub fn for_system_user(component: ComponentName) -> Self {
        Self::new(component, UserHandle::SYSTEM)
    }
}
