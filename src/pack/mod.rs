//! Icon packs: their resources, metadata and the active-pack snapshot.

pub mod catalog;
pub mod parser;
pub mod resources;

pub use catalog::{ICON_PACK_ACTIONS, IconPackCatalog, IconPackInfo};
pub use parser::{
    AppFilterTable, CatalogParse, CatalogSource, DrawableCatalog, FilterParse, PackMetadata,
    PackMetadataParser, ParseMode, ParseOutcome,
};
pub use resources::{DirectoryPackResources, MemoryPackResources, PackResources};

use std::sync::Arc;

use crate::error::ParseError;
use crate::host::PackageHost;
use crate::icon::{ComponentName, Drawable};
use crate::layer::LayerAssets;

/// Everything resolution needs from the active pack.
///
/// A snapshot is immutable once built. Switching packs builds a new one and
/// swaps it in whole, so readers see either the old pack or the new one.
#[derive(Debug)]
pub struct PackState {
    package: String,
    is_default: bool,
    resources: Option<Arc<dyn PackResources>>,
    app_filter: AppFilterTable,
    layers: LayerAssets,
    outcome: ParseOutcome,
}

impl PackState {
    /// The unthemed state: no mapping, no layers.
    pub fn unthemed(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            is_default: true,
            resources: None,
            app_filter: AppFilterTable::default(),
            layers: LayerAssets::default(),
            outcome: ParseOutcome::Absent,
        }
    }

    /// Loads `package` through `host`.
    ///
    /// `default_pack` names the unthemed pseudo-pack; loading it performs no
    /// I/O. A pack whose resources cannot be opened loads as an empty state
    /// with a [`ParseOutcome::Failed`] outcome.
    pub fn load(package: &str, default_pack: &str, host: &dyn PackageHost) -> Self {
        if package.eq_ignore_ascii_case(default_pack) {
            return Self::unthemed(package);
        }

        let resources = match host.resources_for_application(package) {
            Ok(resources) => resources,
            Err(e) => {
                tracing::warn!(pack = package, error = %e, "unable to open icon pack");
                return Self {
                    is_default: false,
                    outcome: ParseOutcome::Failed(ParseError::MissingResources(package.to_string())),
                    ..Self::unthemed(package)
                };
            }
        };

        let parsed = PackMetadataParser::new(resources.as_ref()).parse_filter();
        Self::from_parts(package, resources, parsed)
    }

    /// Builds a snapshot from an already parsed appfilter.
    pub fn from_parts(package: &str, resources: Arc<dyn PackResources>, parsed: FilterParse) -> Self {
        Self {
            package: package.to_string(),
            is_default: false,
            resources: Some(resources),
            app_filter: parsed.table,
            layers: parsed.layers,
            outcome: parsed.outcome,
        }
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    pub fn resources(&self) -> Option<&Arc<dyn PackResources>> {
        self.resources.as_ref()
    }

    pub fn app_filter(&self) -> &AppFilterTable {
        &self.app_filter
    }

    pub fn layers(&self) -> &LayerAssets {
        &self.layers
    }

    pub fn outcome(&self) -> &ParseOutcome {
        &self.outcome
    }

    /// Loads a named drawable from this pack.
    pub fn drawable(&self, name: &str) -> Option<Drawable> {
        let resources = self.resources.as_ref()?;
        match resources.drawable(name) {
            Ok(found) => found,
            Err(e) => {
                tracing::debug!(pack = %self.package, drawable = name, error = %e, "unable to load drawable");
                None
            }
        }
    }

    /// The pack's own artwork for `component`, if it maps one that exists.
    pub fn mapped_drawable(&self, component: &ComponentName) -> Option<Drawable> {
        let name = self.app_filter.get(&component.to_string())?;
        let drawable = self.drawable(name);
        if drawable.is_none() {
            tracing::debug!(
                pack = %self.package,
                component = %component,
                drawable = name,
                "mapped drawable missing from pack"
            );
        }
        drawable
    }
}
