//! iconpack-engine: icon pack theming for app launchers
//!
//! This crate resolves the icon a launcher shows for an application when a
//! third-party icon pack is active. It parses a pack's `appfilter` and
//! `drawable` documents, composes adaptive icons from a pack's back, mask
//! and front artwork, caches the results on disk, and switches packs in the
//! background.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use iconpack_engine::{
//!     ComponentName, DirectoryPackResources, Drawable, EngineConfig, ICON_PACK_ACTIONS,
//!     IconsHandler, ItemIdentity, MemoryHost,
//! };
//!
//! let host = Arc::new(MemoryHost::new());
//! host.install_app("com.example", "Example", Drawable::solid(96, [30, 120, 200, 255]));
//! host.install_pack(
//!     "Round Icons",
//!     ICON_PACK_ACTIONS[0],
//!     None,
//!     Arc::new(DirectoryPackResources::new("com.round.icons", "/opt/packs/round", 192)),
//! );
//!
//! let handler = IconsHandler::new(EngineConfig::default(), host);
//! handler.all_icon_packs();
//! handler.load_icon_pack("com.round.icons");
//!
//! let item = ItemIdentity::for_system_user(ComponentName::new("com.example", "com.example.Main"));
//! let icon = handler.resolve_icon(&item);
//! ```
//!
//! # Switching packs
//!
//! [`PackSwitchCoordinator`] persists the choice, parses the pack on the
//! tokio blocking pool, swaps it in and tells the host to reload:
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use iconpack_engine::*;
//! # async fn run(handler: Arc<IconsHandler>, host: Arc<MemoryHost>) -> Result<(), SwitchError> {
//! let prefs = Arc::new(JsonPreferenceStore::new("/var/lib/launcher/prefs.json"));
//! let coordinator = PackSwitchCoordinator::new(
//!     handler,
//!     prefs,
//!     host.clone(),
//!     host,
//!     tokio::runtime::Handle::current(),
//! );
//! let state = coordinator.switch_icon_packs("com.round.icons", false)?.wait().await?;
//! assert_eq!(state.package(), "com.round.icons");
//! # Ok(())
//! # }
//! ```

mod cache;
mod config;
mod error;
mod handler;
mod host;
mod icon;
mod layer;
mod pack;
mod preferences;
mod provider;
mod switcher;

pub use cache::{CACHE_NAMESPACE, CacheKey, CacheStats, DiskIconCache, component_hash};
pub use config::{DEFAULT_ICON_PACK, EngineConfig};
pub use error::{
    CacheError, ConfigError, HostError, ParseError, PreferenceError, ResourceError, SwitchError,
};
pub use handler::IconsHandler;
pub use host::{HostIconCache, MemoryHost, ModelReloader, PackageHost, ResolvedActivity};
pub use icon::{
    AdaptiveIcon, ComponentName, Drawable, InvalidComponentName, ItemIdentity, RectPx, SizePx,
    UserHandle,
};
pub use layer::normalizer::{IconNormalizer, Normalization};
pub use layer::svg::{ADAPTIVE_MASK_PATH, adaptive_icon_mask, render_svg};
pub use layer::{AdaptiveIconComposer, Composition, LayerAssets, LayerRole};
pub use pack::parser::{APPFILTER_DOCUMENT, DRAWABLE_DOCUMENT};
pub use pack::{
    AppFilterTable, CatalogParse, CatalogSource, DirectoryPackResources, DrawableCatalog,
    FilterParse, ICON_PACK_ACTIONS, IconPackCatalog, IconPackInfo, MemoryPackResources,
    PackMetadata, PackMetadataParser, PackResources, PackState, ParseMode, ParseOutcome,
};
pub use preferences::{JsonPreferenceStore, MemoryPreferenceStore, PreferenceStore, Preferences};
pub use provider::CustomIconProvider;
pub use switcher::{PackSwitchCoordinator, SwitchTask};
