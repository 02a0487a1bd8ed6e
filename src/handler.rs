//! The icon theming service.
//!
//! [`IconsHandler`] owns the active pack snapshot, the composer and the disk
//! cache, and answers every icon query. One instance is built at startup and
//! shared by handle with whoever needs icons.
//!
//! # Resolution order
//!
//! 1. When the pack has back plates: cached `front` and `back` layers.
//! 2. Otherwise: the cached flat icon.
//! 3. The drawable the pack's appfilter maps to the component.
//! 4. The host's default icon, composed with the pack's layers.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::cache::{CacheKey, DiskIconCache};
use crate::config::EngineConfig;
use crate::error::SwitchError;
use crate::host::PackageHost;
use crate::icon::{ComponentName, Drawable, ItemIdentity};
use crate::layer::{AdaptiveIconComposer, LayerRole};
use crate::pack::{
    CatalogSource, DrawableCatalog, IconPackCatalog, IconPackInfo, PackMetadataParser, PackResources,
    PackState,
};
use crate::preferences::PreferenceStore;

/// A pack opened for browsing its drawables, independent of the active one.
#[derive(Debug)]
struct BrowsedPack {
    package: String,
    resources: Arc<dyn PackResources>,
    catalog: DrawableCatalog,
}

pub struct IconsHandler {
    config: EngineConfig,
    host: Arc<dyn PackageHost>,
    cache: DiskIconCache,
    catalog: IconPackCatalog,
    composer: AdaptiveIconComposer,
    state: RwLock<Arc<PackState>>,
    browsed: RwLock<Option<BrowsedPack>>,
}

impl IconsHandler {
    /// Creates a handler with the default pack active and an empty catalog.
    pub fn new(config: EngineConfig, host: Arc<dyn PackageHost>) -> Self {
        let cache = DiskIconCache::new(&config.cache_dir);
        let composer = AdaptiveIconComposer::new(&config);
        let state = PackState::unthemed(config.default_icon_pack.clone());
        Self {
            config,
            host,
            cache,
            catalog: IconPackCatalog::new(),
            composer,
            state: RwLock::new(Arc::new(state)),
            browsed: RwLock::new(None),
        }
    }

    /// Creates a handler, discovers installed packs and activates the pack
    /// recorded in `preferences`.
    ///
    /// The disk cache is kept; entries written under the same pack on a
    /// previous run are still valid.
    pub fn from_preferences(
        config: EngineConfig,
        host: Arc<dyn PackageHost>,
        preferences: &dyn PreferenceStore,
    ) -> Self {
        let handler = Self::new(config, host);
        let package = match preferences.icon_pack() {
            Ok(Some(package)) => package,
            Ok(None) => handler.config.default_icon_pack.clone(),
            Err(e) => {
                tracing::warn!(error = %e, "unable to read icon pack preference, using default");
                handler.config.default_icon_pack.clone()
            }
        };

        handler.catalog.refresh(handler.host.as_ref());
        let state = handler.parse_pack(&package);
        *handler.state.write() = Arc::new(state);
        tracing::info!(pack = %package, "icon pack loaded");
        handler
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &DiskIconCache {
        &self.cache
    }

    pub fn catalog(&self) -> &IconPackCatalog {
        &self.catalog
    }

    pub fn composer(&self) -> &AdaptiveIconComposer {
        &self.composer
    }

    pub fn host(&self) -> &Arc<dyn PackageHost> {
        &self.host
    }

    // ---- Active pack ----

    /// The active pack state. Holding the snapshot keeps it alive across a
    /// concurrent switch.
    pub fn snapshot(&self) -> Arc<PackState> {
        self.state.read().clone()
    }

    pub fn current_icon_pack(&self) -> String {
        self.snapshot().package().to_string()
    }

    pub fn is_default_icon_pack(&self) -> bool {
        self.config.is_default_pack(self.snapshot().package())
    }

    /// Reads `package`'s metadata into a fresh snapshot without activating
    /// it. Blocks on pack I/O.
    pub fn parse_pack(&self, package: &str) -> PackState {
        PackState::load(package, &self.config.default_icon_pack, self.host.as_ref())
    }

    /// Makes `state` the active pack and clears the disk cache.
    ///
    /// Readers holding the previous snapshot finish against it.
    pub fn install(&self, state: PackState) -> Arc<PackState> {
        let state = Arc::new(state);
        let previous = std::mem::replace(&mut *self.state.write(), Arc::clone(&state));
        let removed = self.cache.clear();
        tracing::debug!(
            from = %previous.package(),
            to = %state.package(),
            removed,
            "installed icon pack"
        );
        state
    }

    /// Parses and installs `package` on the calling thread.
    pub fn load_icon_pack(&self, package: &str) -> Arc<PackState> {
        let state = self.parse_pack(package);
        self.install(state)
    }

    /// Works out which pack a switch request should activate.
    ///
    /// Asking for the active pack again turns theming off unless `update`
    /// is set. Anything other than the default pack must be in the catalog.
    pub fn resolve_switch_target(&self, package: &str, update: bool) -> Result<String, SwitchError> {
        let current = self.current_icon_pack();
        let target = if package == current && !update {
            self.config.default_icon_pack.clone()
        } else {
            package.to_string()
        };

        if target == self.config.default_icon_pack || self.catalog.contains(&target) {
            Ok(target)
        } else {
            Err(SwitchError::Rejected(target))
        }
    }

    /// Re-discovers installed packs, sorted by label.
    pub fn all_icon_packs(&self) -> Vec<IconPackInfo> {
        self.catalog.refresh(self.host.as_ref())
    }

    // ---- Resolution ----

    /// The themed icon for `item`. Never fails.
    pub fn resolve_icon(&self, item: &ItemIdentity) -> Drawable {
        let state = self.snapshot();
        let component = &item.component;

        if let Some(cached) = self.cached_icon(&state, component) {
            return cached;
        }

        if let Some(mapped) = state.mapped_drawable(component) {
            self.cache.store_drawable(
                &CacheKey::new(state.package(), component, LayerRole::None),
                &mapped,
            );
            return mapped;
        }

        match self.host.application_icon(component) {
            Ok(base) => self
                .composer
                .compose(&base, component, state.package(), state.layers(), &self.cache),
            Err(e) => {
                tracing::warn!(component = %component, error = %e, "unable to find component icon");
                Drawable::placeholder(self.config.icon_size)
            }
        }
    }

    /// The icon `item` would have with no per-item override.
    pub fn reset_icon(&self, item: &ItemIdentity) -> Drawable {
        self.resolve_icon(item)
    }

    fn cached_icon(&self, state: &PackState, component: &ComponentName) -> Option<Drawable> {
        let pack = state.package();
        if state.layers().has_back_images() {
            let front = self
                .cache
                .load_drawable(&CacheKey::new(pack, component, LayerRole::Front));
            let back = self
                .cache
                .load_drawable(&CacheKey::new(pack, component, LayerRole::Back));
            match (back, front) {
                (Some(back), Some(front)) => Some(Drawable::adaptive(back, front)),
                _ => None,
            }
        } else {
            self.cache
                .load_drawable(&CacheKey::new(pack, component, LayerRole::None))
        }
    }

    // ---- Browsing ----

    /// Every drawable `package` offers, sorted case-insensitively.
    ///
    /// The pack becomes the browsed pack for [`Self::matching_drawables`]
    /// and [`Self::load_drawable`].
    pub fn all_drawables(&self, package: &str) -> Vec<String> {
        let resources = match self.host.resources_for_application(package) {
            Ok(resources) => resources,
            Err(e) => {
                tracing::warn!(pack = package, error = %e, "unable to open icon pack for browsing");
                *self.browsed.write() = None;
                return Vec::new();
            }
        };

        let parsed = PackMetadataParser::new(resources.as_ref()).parse_catalog();
        if parsed.source == CatalogSource::Empty {
            tracing::info!(pack = package, "icon pack lists no drawables");
        }
        let mut catalog = parsed.catalog;
        catalog.sort();
        let names = catalog.names().to_vec();

        *self.browsed.write() = Some(BrowsedPack {
            package: package.to_string(),
            resources,
            catalog,
        });
        names
    }

    /// Drawables of the browsed pack whose names loosely match the label of
    /// application `package`.
    ///
    /// When the host does not know the application, the package string
    /// itself is matched.
    pub fn matching_drawables(&self, package: &str) -> Vec<String> {
        let label = match self.host.application_label(package) {
            Ok(label) => label,
            Err(e) => {
                tracing::debug!(package, error = %e, "no label for package, matching its identity");
                package.to_string()
            }
        };

        self.browsed
            .read()
            .as_ref()
            .map(|browsed| browsed.catalog.matching(&label))
            .unwrap_or_default()
    }

    /// Loads drawable `name` from `package`, or from the active pack when no
    /// package is given.
    pub fn load_drawable(&self, package: Option<&str>, name: &str) -> Option<Drawable> {
        let resources = match package {
            None => self.snapshot().resources().cloned()?,
            Some(package) => self.resources_for(package)?,
        };
        match resources.drawable(name) {
            Ok(found) => found,
            Err(e) => {
                tracing::debug!(pack = resources.package(), drawable = name, error = %e, "unable to load drawable");
                None
            }
        }
    }

    fn resources_for(&self, package: &str) -> Option<Arc<dyn PackResources>> {
        if let Some(browsed) = self.browsed.read().as_ref() {
            if browsed.package == package {
                return Some(Arc::clone(&browsed.resources));
            }
        }
        let state = self.snapshot();
        if state.package() == package {
            if let Some(resources) = state.resources() {
                return Some(Arc::clone(resources));
            }
        }
        match self.host.resources_for_application(package) {
            Ok(resources) => Some(resources),
            Err(e) => {
                tracing::debug!(pack = package, error = %e, "unable to open icon pack");
                None
            }
        }
    }
}
