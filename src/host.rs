//! Collaborators supplied by the launcher embedding the engine.
//!
//! The engine never talks to the platform directly. It asks a
//! [`PackageHost`] about installed applications and packs, tells a
//! [`HostIconCache`] to forget displayed icons, and asks a
//! [`ModelReloader`] to rebuild the launcher model after a switch.
//! [`MemoryHost`] implements all three in memory.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::error::HostError;
use crate::icon::{ComponentName, Drawable, ItemIdentity};
use crate::pack::resources::PackResources;

/// One activity answering an intent action query.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedActivity {
    /// Package that owns the activity.
    pub package: String,
    /// User-visible label of the owning application.
    pub label: String,
    /// Launcher icon of the owning application, if it could be loaded.
    pub icon: Option<Drawable>,
}

/// Application and package queries.
pub trait PackageHost: Send + Sync {
    /// Activities declaring a handler for `action`.
    fn query_intent_activities(&self, action: &str) -> Vec<ResolvedActivity>;

    /// Opens the bundled resources of an installed package.
    fn resources_for_application(&self, package: &str) -> Result<Arc<dyn PackResources>, HostError>;

    /// The unthemed icon the host would show for `component`.
    fn application_icon(&self, component: &ComponentName) -> Result<Drawable, HostError>;

    /// The user-visible label of an installed package.
    fn application_label(&self, package: &str) -> Result<String, HostError>;
}

/// The host's own store of currently displayed icons.
pub trait HostIconCache: Send + Sync {
    /// Drops every persisted icon record.
    fn clear_icon_database(&self);

    /// Evicts in-memory icons so they are reloaded on next display.
    fn flush(&self);

    /// A per-item icon chosen by the user, overriding any pack.
    fn custom_icon(&self, _item: &ItemIdentity) -> Option<Drawable> {
        None
    }
}

/// Rebuilds the launcher's item model.
pub trait ModelReloader: Send + Sync {
    fn force_reload(&self);
}

// ============================================================================
// MemoryHost
// ============================================================================

#[derive(Debug, Clone)]
struct InstalledApp {
    label: String,
    icons: HashMap<String, Drawable>,
    default_icon: Option<Drawable>,
    actions: Vec<String>,
    resources: Option<Arc<dyn PackResources>>,
}

impl InstalledApp {
    fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            icons: HashMap::new(),
            default_icon: None,
            actions: Vec::new(),
            resources: None,
        }
    }
}

/// In-memory host: installed packages, custom icons and call counters.
#[derive(Debug, Default)]
pub struct MemoryHost {
    apps: RwLock<Vec<(String, InstalledApp)>>,
    custom_icons: RwLock<HashMap<ItemIdentity, Drawable>>,
    clears: AtomicUsize,
    flushes: AtomicUsize,
    reloads: AtomicUsize,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_app<R>(&self, package: &str, f: impl FnOnce(&mut InstalledApp) -> R) -> Option<R> {
        let mut apps = self.apps.write();
        apps.iter_mut().find(|(p, _)| p == package).map(|(_, app)| f(app))
    }

    fn upsert(&self, package: &str, label: &str) {
        if self.with_app(package, |app| app.label = label.to_string()).is_none() {
            self.apps
                .write()
                .push((package.to_string(), InstalledApp::new(label)));
        }
    }

    /// Installs an application with a default icon used for all of its
    /// components.
    pub fn install_app(&self, package: &str, label: &str, icon: Drawable) {
        self.upsert(package, label);
        self.with_app(package, |app| app.default_icon = Some(icon));
    }

    /// Installs an application with no loadable icon.
    pub fn install_app_without_icon(&self, package: &str, label: &str) {
        self.upsert(package, label);
    }

    /// Overrides the icon of one component.
    pub fn set_component_icon(&self, component: &ComponentName, icon: Drawable) {
        self.with_app(component.package(), |app| {
            app.icons.insert(component.class_name().to_string(), icon)
        });
    }

    /// Installs an icon pack answering `action`.
    pub fn install_pack(
        &self,
        label: &str,
        action: &str,
        icon: Option<Drawable>,
        resources: Arc<dyn PackResources>,
    ) {
        let package = resources.package().to_string();
        self.upsert(&package, label);
        self.with_app(&package, |app| {
            if !app.actions.iter().any(|a| a == action) {
                app.actions.push(action.to_string());
            }
            app.default_icon = icon;
            app.resources = Some(resources);
        });
    }

    /// Removes a package entirely.
    pub fn uninstall(&self, package: &str) {
        self.apps.write().retain(|(p, _)| p != package);
    }

    pub fn set_custom_icon(&self, item: ItemIdentity, icon: Drawable) {
        self.custom_icons.write().insert(item, icon);
    }

    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    pub fn reload_count(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }
}

impl PackageHost for MemoryHost {
    fn query_intent_activities(&self, action: &str) -> Vec<ResolvedActivity> {
        self.apps
            .read()
            .iter()
            .filter(|(_, app)| app.actions.iter().any(|a| a == action))
            .map(|(package, app)| ResolvedActivity {
                package: package.clone(),
                label: app.label.clone(),
                icon: app.default_icon.clone(),
            })
            .collect()
    }

    fn resources_for_application(&self, package: &str) -> Result<Arc<dyn PackResources>, HostError> {
        self.with_app(package, |app| app.resources.clone())
            .ok_or_else(|| HostError::PackageNotFound(package.to_string()))?
            .ok_or_else(|| HostError::ResourcesUnavailable(package.to_string()))
    }

    fn application_icon(&self, component: &ComponentName) -> Result<Drawable, HostError> {
        let package = component.package();
        self.with_app(package, |app| {
            app.icons
                .get(component.class_name())
                .cloned()
                .or_else(|| app.default_icon.clone())
        })
        .ok_or_else(|| HostError::PackageNotFound(package.to_string()))?
        .ok_or_else(|| HostError::ResourcesUnavailable(package.to_string()))
    }

    fn application_label(&self, package: &str) -> Result<String, HostError> {
        self.with_app(package, |app| app.label.clone())
            .ok_or_else(|| HostError::PackageNotFound(package.to_string()))
    }
}

impl HostIconCache for MemoryHost {
    fn clear_icon_database(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }

    fn flush(&self) {
        self.flushes.fetch_add(1, Ordering::SeqCst);
    }

    fn custom_icon(&self, item: &ItemIdentity) -> Option<Drawable> {
        self.custom_icons.read().get(item).cloned()
    }
}

impl ModelReloader for MemoryHost {
    fn force_reload(&self) {
        self.reloads.fetch_add(1, Ordering::SeqCst);
    }
}
