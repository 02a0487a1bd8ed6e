//! Durable user preferences.
//!
//! The engine persists a single value: the selected icon pack.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::PreferenceError;

/// Storage for the selected icon pack.
pub trait PreferenceStore: Send + Sync {
    /// The stored pack identity, or `None` when never set.
    fn icon_pack(&self) -> Result<Option<String>, PreferenceError>;

    /// Durably records the selected pack.
    fn set_icon_pack(&self, package: &str) -> Result<(), PreferenceError>;
}

/// The persisted preference document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_pack: Option<String>,
}

impl Preferences {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// ============================================================================
// JsonPreferenceStore
// ============================================================================

/// Preferences kept in a JSON file.
///
/// Writes go to a sibling temporary file that is renamed over the target,
/// so a crash leaves either the old or the new document.
#[derive(Debug)]
pub struct JsonPreferenceStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonPreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Preferences, PreferenceError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Preferences::from_json(&text)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Preferences::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, prefs: &Preferences) -> Result<(), PreferenceError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp = self.path.with_extension("json.tmp");
        fs::write(&temp, prefs.to_json()?)?;
        fs::rename(&temp, &self.path)?;
        Ok(())
    }
}

impl PreferenceStore for JsonPreferenceStore {
    fn icon_pack(&self) -> Result<Option<String>, PreferenceError> {
        let _guard = self.lock.lock();
        Ok(self.read()?.icon_pack)
    }

    fn set_icon_pack(&self, package: &str) -> Result<(), PreferenceError> {
        let _guard = self.lock.lock();
        // A corrupt document is replaced rather than blocking the write.
        let mut prefs = self.read().unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "discarding unreadable preferences");
            Preferences::default()
        });
        prefs.icon_pack = Some(package.to_string());
        self.write(&prefs)
    }
}

// ============================================================================
// MemoryPreferenceStore
// ============================================================================

/// Preferences held in memory.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    icon_pack: Mutex<Option<String>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_icon_pack(package: impl Into<String>) -> Self {
        Self {
            icon_pack: Mutex::new(Some(package.into())),
        }
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn icon_pack(&self) -> Result<Option<String>, PreferenceError> {
        Ok(self.icon_pack.lock().clone())
    }

    fn set_icon_pack(&self, package: &str) -> Result<(), PreferenceError> {
        *self.icon_pack.lock() = Some(package.to_string());
        Ok(())
    }
}
