//! Icon lookup for the launcher's icon loading pipeline.

use std::sync::Arc;

use crate::handler::IconsHandler;
use crate::host::HostIconCache;
use crate::icon::{Drawable, ItemIdentity};

/// Chooses the icon shown for an item: the user's own choice first, then
/// the active pack.
pub struct CustomIconProvider {
    handler: Arc<IconsHandler>,
    icon_cache: Arc<dyn HostIconCache>,
}

impl CustomIconProvider {
    pub fn new(handler: Arc<IconsHandler>, icon_cache: Arc<dyn HostIconCache>) -> Self {
        Self {
            handler,
            icon_cache,
        }
    }

    pub fn icon(&self, item: &ItemIdentity) -> Drawable {
        if let Some(custom) = self.icon_cache.custom_icon(item) {
            tracing::trace!(component = %item.component, "using custom icon");
            return custom;
        }
        self.handler.resolve_icon(item)
    }

    /// The icon the item returns to when its custom icon is removed.
    pub fn reset_icon(&self, item: &ItemIdentity) -> Drawable {
        self.handler.reset_icon(item)
    }
}
