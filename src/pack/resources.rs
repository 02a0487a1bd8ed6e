//! Access to an icon pack's bundled resources.
//!
//! A pack exposes markup documents (`appfilter`, `drawable`) and named
//! drawables. [`DirectoryPackResources`] reads an unpacked pack laid out as
//!
//! ```text
//! <root>/xml/appfilter.xml
//! <root>/xml/drawable.xml
//! <root>/drawable/<name>.png | .webp | .jpg | .svg
//! ```

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbaImage;

use crate::error::ResourceError;
use crate::icon::Drawable;
use crate::layer::svg::render_svg;

/// Resources of one installed icon pack.
pub trait PackResources: Send + Sync + fmt::Debug {
    /// The pack's package identity.
    fn package(&self) -> &str;

    /// Raw bytes of the markup document `name`, or `None` when the pack does
    /// not ship it.
    fn xml(&self, name: &str) -> Result<Option<Vec<u8>>, ResourceError>;

    /// True when `name` resolves to an image resource.
    fn has_drawable(&self, name: &str) -> bool;

    /// Loads the drawable `name`, or `None` when it does not exist.
    fn drawable(&self, name: &str) -> Result<Option<Drawable>, ResourceError>;

    /// Loads `name` as a flat bitmap. Lookup failures are logged and yield
    /// `None`.
    fn bitmap(&self, name: &str) -> Option<Arc<RgbaImage>> {
        match self.drawable(name) {
            Ok(Some(Drawable::Bitmap(image))) => Some(image),
            Ok(Some(other)) => Some(Arc::new(other.to_bitmap())),
            Ok(None) => {
                tracing::debug!(pack = self.package(), drawable = name, "drawable not found in pack");
                None
            }
            Err(e) => {
                tracing::debug!(pack = self.package(), drawable = name, error = %e, "failed to load drawable");
                None
            }
        }
    }
}

/// Resource names are flat identifiers; anything that could escape the
/// pack directory is rejected.
fn is_resource_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains(['/', '\\'])
        && name != "."
        && name != ".."
}

// ============================================================================
// DirectoryPackResources
// ============================================================================

const RASTER_EXTENSIONS: [&str; 4] = ["png", "webp", "jpg", "jpeg"];

/// A pack unpacked on the local filesystem.
#[derive(Debug, Clone)]
pub struct DirectoryPackResources {
    package: String,
    root: PathBuf,
    vector_size: u32,
}

impl DirectoryPackResources {
    /// Opens the pack rooted at `root`. Vector drawables are rasterized at
    /// `vector_size` pixels.
    pub fn new(package: impl Into<String>, root: impl Into<PathBuf>, vector_size: u32) -> Self {
        Self {
            package: package.into(),
            root: root.into(),
            vector_size: vector_size.max(1),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn drawable_path(&self, name: &str) -> Option<PathBuf> {
        if !is_resource_name(name) {
            return None;
        }
        let dir = self.root.join("drawable");
        RASTER_EXTENSIONS
            .iter()
            .chain(std::iter::once(&"svg"))
            .map(|ext| dir.join(format!("{name}.{ext}")))
            .find(|path| path.is_file())
    }
}

impl PackResources for DirectoryPackResources {
    fn package(&self) -> &str {
        &self.package
    }

    fn xml(&self, name: &str) -> Result<Option<Vec<u8>>, ResourceError> {
        if !is_resource_name(name) {
            return Ok(None);
        }
        let path = self.root.join("xml").join(format!("{name}.xml"));
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn has_drawable(&self, name: &str) -> bool {
        self.drawable_path(name).is_some()
    }

    fn drawable(&self, name: &str) -> Result<Option<Drawable>, ResourceError> {
        let Some(path) = self.drawable_path(name) else {
            return Ok(None);
        };

        if path.extension().is_some_and(|ext| ext == "svg") {
            let svg = fs::read_to_string(&path)?;
            let image =
                render_svg(&svg, self.vector_size).ok_or_else(|| ResourceError::Svg(name.to_string()))?;
            return Ok(Some(Drawable::bitmap(image)));
        }

        let image = image::open(&path).map_err(|source| ResourceError::Image {
            name: name.to_string(),
            source,
        })?;
        Ok(Some(Drawable::bitmap(image.to_rgba8())))
    }
}

// ============================================================================
// MemoryPackResources
// ============================================================================

/// A pack held entirely in memory, for embedders that ship packs inside
/// their own assets.
#[derive(Debug, Clone, Default)]
pub struct MemoryPackResources {
    package: String,
    documents: HashMap<String, Vec<u8>>,
    drawables: HashMap<String, Drawable>,
}

impl MemoryPackResources {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            ..Self::default()
        }
    }

    /// Adds a markup document.
    pub fn with_xml(mut self, name: impl Into<String>, markup: impl Into<Vec<u8>>) -> Self {
        self.documents.insert(name.into(), markup.into());
        self
    }

    /// Adds a named drawable.
    pub fn with_drawable(mut self, name: impl Into<String>, drawable: impl Into<Drawable>) -> Self {
        self.drawables.insert(name.into(), drawable.into());
        self
    }
}

impl PackResources for MemoryPackResources {
    fn package(&self) -> &str {
        &self.package
    }

    fn xml(&self, name: &str) -> Result<Option<Vec<u8>>, ResourceError> {
        Ok(self.documents.get(name).cloned())
    }

    fn has_drawable(&self, name: &str) -> bool {
        self.drawables.contains_key(name)
    }

    fn drawable(&self, name: &str) -> Result<Option<Drawable>, ResourceError> {
        Ok(self.drawables.get(name).cloned())
    }
}
