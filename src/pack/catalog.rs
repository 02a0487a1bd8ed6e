//! Discovery of installed icon packs.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::host::PackageHost;
use crate::icon::Drawable;

/// Intent actions icon packs declare so launchers can find them.
pub const ICON_PACK_ACTIONS: [&str; 6] = [
    "com.fede.launcher.THEME_ICONPACK",
    "com.anddoes.launcher.THEME",
    "com.teslacoilsw.launcher.THEME",
    "com.gau.go.launcherex.theme",
    "org.adw.launcher.THEMES",
    "org.adw.launcher.icons.ACTION_PICK_ICON",
];

/// One discoverable icon pack.
#[derive(Debug, Clone, PartialEq)]
pub struct IconPackInfo {
    pub package: String,
    pub label: String,
    pub icon: Option<Drawable>,
}

/// The set of installed icon packs, rebuilt wholesale on every refresh.
#[derive(Debug, Default)]
pub struct IconPackCatalog {
    packs: RwLock<Vec<IconPackInfo>>,
}

impl IconPackCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queries the host for every known pack action and replaces the
    /// catalog with the result, sorted case-insensitively by label.
    ///
    /// A package answering several actions appears once; the last activity
    /// resolved for it wins.
    pub fn refresh(&self, host: &dyn PackageHost) -> Vec<IconPackInfo> {
        let mut by_package: HashMap<String, IconPackInfo> = HashMap::new();
        for action in ICON_PACK_ACTIONS {
            for activity in host.query_intent_activities(action) {
                by_package.insert(
                    activity.package.clone(),
                    IconPackInfo {
                        package: activity.package,
                        label: activity.label,
                        icon: activity.icon,
                    },
                );
            }
        }

        let mut packs: Vec<IconPackInfo> = by_package.into_values().collect();
        packs.sort_by(|a, b| {
            a.label
                .to_lowercase()
                .cmp(&b.label.to_lowercase())
                .then_with(|| a.package.cmp(&b.package))
        });

        tracing::debug!(count = packs.len(), "refreshed icon pack catalog");
        *self.packs.write() = packs.clone();
        packs
    }

    pub fn contains(&self, package: &str) -> bool {
        self.packs.read().iter().any(|p| p.package == package)
    }

    pub fn get(&self, package: &str) -> Option<IconPackInfo> {
        self.packs.read().iter().find(|p| p.package == package).cloned()
    }

    /// The packs found by the last refresh.
    pub fn packs(&self) -> Vec<IconPackInfo> {
        self.packs.read().clone()
    }

    pub fn len(&self) -> usize {
        self.packs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.packs.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::host::MemoryHost;
    use crate::pack::resources::MemoryPackResources;

    fn install(host: &MemoryHost, package: &str, label: &str, action: &str) {
        host.install_pack(label, action, None, Arc::new(MemoryPackResources::new(package)));
    }

    #[test]
    fn refresh_dedupes_and_sorts_by_label() {
        let host = MemoryHost::new();
        install(&host, "com.zeta", "zeta icons", ICON_PACK_ACTIONS[0]);
        install(&host, "com.alpha", "Alpha", ICON_PACK_ACTIONS[1]);
        install(&host, "com.alpha", "Alpha", ICON_PACK_ACTIONS[4]);
        install(&host, "com.beta", "beta", ICON_PACK_ACTIONS[5]);
        host.install_app("com.other", "Other", Drawable::placeholder(4));

        let catalog = IconPackCatalog::new();
        let packs = catalog.refresh(&host);
        let labels: Vec<_> = packs.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, ["Alpha", "beta", "zeta icons"]);
        assert!(catalog.contains("com.beta"));
        assert!(!catalog.contains("com.other"));
    }

    #[test]
    fn refresh_replaces_previous_contents() {
        let host = MemoryHost::new();
        install(&host, "com.alpha", "Alpha", ICON_PACK_ACTIONS[2]);
        let catalog = IconPackCatalog::new();
        catalog.refresh(&host);
        assert_eq!(catalog.len(), 1);

        host.uninstall("com.alpha");
        catalog.refresh(&host);
        assert!(catalog.is_empty());
        assert!(catalog.get("com.alpha").is_none());
    }
}
