//! Engine configuration.
//!
//! # JSON Format
//!
//! ```json
//! {
//!   "cacheDir": "/home/me/.cache/iconpack-engine",
//!   "defaultIconPack": "default",
//!   "iconSize": 192,
//!   "opaqueBackScale": 0.7,
//!   "transparencyThreshold": 0.5,
//!   "legacyBackground": [255, 255, 255, 255],
//!   "normalizerSize": 64
//! }
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Identity of the unthemed pseudo-pack.
pub const DEFAULT_ICON_PACK: &str = "default";

const CACHE_DIR_NAME: &str = "iconpack-engine";

// ============================================================================
// EngineConfig
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Root of the private cache area. Icons go under `icons/` inside it.
    pub cache_dir: PathBuf,

    /// Identity that means "no pack".
    pub default_icon_pack: String,

    /// Edge length for vector drawables and placeholder icons.
    pub icon_size: u32,

    /// Foreground scale used on opaque back plates, whatever the pack
    /// declares.
    pub opaque_back_scale: f32,

    /// Fraction of invisible pixels above which a back plate counts as
    /// transparent.
    pub transparency_threshold: f32,

    /// RGBA fill behind legacy icons wrapped into adaptive form.
    pub legacy_background: [u8; 4],

    /// Working resolution of the icon normalizer.
    pub normalizer_size: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            default_icon_pack: DEFAULT_ICON_PACK.to_string(),
            icon_size: 192,
            opaque_back_scale: 0.7,
            transparency_threshold: 0.5,
            legacy_background: [255, 255, 255, 255],
            normalizer_size: 64,
        }
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(CACHE_DIR_NAME)
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `dir` as the cache root.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Sets the identity of the unthemed pseudo-pack.
    pub fn with_default_icon_pack(mut self, package: impl Into<String>) -> Self {
        self.default_icon_pack = package.into();
        self
    }

    /// Case-insensitive comparison with the default pack identity.
    pub fn is_default_pack(&self, package: &str) -> bool {
        package.eq_ignore_ascii_case(&self.default_icon_pack)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Reads a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path.as_ref())?;
        Ok(Self::from_json(&text)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
