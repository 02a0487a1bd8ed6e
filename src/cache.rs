//! Persistent cache for composed icon layers.
//!
//! Entries live as PNG files under `<root>/icons/`, named after the active
//! pack, a hash of the component's string form and the layer role. The
//! cache is append-only per key: once a file exists it is never rewritten
//! until [`DiskIconCache::clear`] wipes the directory on a pack switch.

use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use image::{DynamicImage, ImageFormat};

use crate::error::CacheError;
use crate::icon::{ComponentName, Drawable};
use crate::layer::LayerRole;

/// Sub-directory of the cache root holding icon entries.
pub const CACHE_NAMESPACE: &str = "icons";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// 32-bit polynomial string hash over UTF-16 code units.
///
/// Distinct components can collide; the cache accepts that.
pub fn component_hash(s: &str) -> i32 {
    s.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as i32))
}

// ============================================================================
// CacheKey
// ============================================================================

/// Identifies one cached layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pack: String,
    component_hash: i32,
    role: LayerRole,
}

impl CacheKey {
    pub fn new(pack: &str, component: &ComponentName, role: LayerRole) -> Self {
        Self {
            pack: pack.to_string(),
            component_hash: component_hash(&component.to_string()),
            role,
        }
    }

    pub fn role(&self) -> LayerRole {
        self.role
    }

    /// File name of the entry inside the cache namespace.
    pub fn file_name(&self) -> String {
        format!("{}_{}{}.png", self.pack, self.component_hash, self.role.suffix())
    }
}

/// Counters describing cache traffic since creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
}

// ============================================================================
// DiskIconCache
// ============================================================================

/// Content-addressed, write-once store of encoded icon bitmaps.
#[derive(Debug)]
pub struct DiskIconCache {
    dir: PathBuf,
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
}

impl DiskIconCache {
    /// Creates a cache rooted at `root`. The namespace directory is created
    /// on first write.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            dir: root.as_ref().join(CACHE_NAMESPACE),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    /// The namespace directory holding the entries.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.path_for(key).is_file()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
        }
    }

    // ---- Raw bytes ----

    /// Reads the entry for `key`, reporting I/O failures.
    pub fn try_get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Reads the entry for `key`. Failures are logged and reported as a miss.
    pub fn get(&self, key: &CacheKey) -> Option<Vec<u8>> {
        let bytes = match self.try_get(key) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(entry = %key.file_name(), error = %e, "unable to read cached icon");
                None
            }
        };
        let counter = if bytes.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        bytes
    }

    /// Writes `bytes` under `key` unless an entry already exists.
    ///
    /// Returns `Ok(true)` when this call created the entry. The file is
    /// written under a temporary name and linked into place, so readers never
    /// see a partial entry and a racing writer never replaces a winner.
    pub fn try_put(&self, key: &CacheKey, bytes: &[u8]) -> Result<bool, CacheError> {
        let target = self.path_for(key);
        if target.is_file() {
            return Ok(false);
        }
        fs::create_dir_all(&self.dir)?;

        let temp = self.dir.join(format!(
            ".{}.{}.{}.tmp",
            key.file_name(),
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        fs::write(&temp, bytes)?;
        let linked = fs::hard_link(&temp, &target);
        if let Err(e) = fs::remove_file(&temp) {
            tracing::debug!(path = %temp.display(), error = %e, "failed to remove temporary cache file");
        }

        match linked {
            Ok(()) => {
                self.writes.fetch_add(1, Ordering::Relaxed);
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes `bytes` under `key` unless an entry already exists. Failures
    /// are logged and dropped.
    pub fn put(&self, key: &CacheKey, bytes: &[u8]) {
        if let Err(e) = self.try_put(key, bytes) {
            tracing::warn!(entry = %key.file_name(), error = %e, "unable to store icon in cache");
        }
    }

    // ---- Drawables ----

    /// Loads and decodes the entry for `key` as a bitmap drawable.
    pub fn load_drawable(&self, key: &CacheKey) -> Option<Drawable> {
        let bytes = self.get(key)?;
        match image::load_from_memory_with_format(&bytes, ImageFormat::Png) {
            Ok(image) => Some(Drawable::bitmap(image.to_rgba8())),
            Err(e) => {
                tracing::warn!(
                    entry = %key.file_name(),
                    error = %CacheError::Decode(e),
                    "unable to get drawable from cache"
                );
                None
            }
        }
    }

    /// Rasterizes `drawable` at its intrinsic size and stores it as PNG,
    /// unless an entry already exists.
    pub fn store_drawable(&self, key: &CacheKey, drawable: &Drawable) {
        if self.contains(key) {
            return;
        }
        match encode_png(drawable) {
            Ok(bytes) => self.put(key, &bytes),
            Err(e) => {
                tracing::warn!(entry = %key.file_name(), error = %e, "unable to store drawable in cache")
            }
        }
    }

    // ---- Maintenance ----

    /// Deletes every entry. Per-file failures are logged and skipped.
    ///
    /// Returns the number of files removed.
    pub fn clear(&self) -> usize {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return 0,
            Err(e) => {
                tracing::warn!(dir = %self.dir.display(), error = %e, "unable to list icon cache");
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to delete cached icon")
                }
            }
        }
        tracing::debug!(removed, "cleared icon cache");
        removed
    }
}

fn encode_png(drawable: &Drawable) -> Result<Vec<u8>, CacheError> {
    let bitmap = drawable.to_bitmap();
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(bitmap)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(CacheError::Encode)?;
    Ok(bytes)
}
