//! Switching the active icon pack.
//!
//! A switch runs in three phases:
//!
//! 1. The chosen pack is written to preferences on the caller's thread.
//! 2. The pack is parsed on the blocking pool and installed as the active
//!    snapshot.
//! 3. The host's icon cache is cleared and flushed and the launcher model is
//!    reloaded.
//!
//! The caller owns the returned [`SwitchTask`]. Dropping it cancels the
//! switch; a cancelled switch never installs its pack. Overlapping switches
//! are not serialized here.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::error::SwitchError;
use crate::handler::IconsHandler;
use crate::host::{HostIconCache, ModelReloader};
use crate::pack::PackState;
use crate::preferences::PreferenceStore;

pub struct PackSwitchCoordinator {
    handler: Arc<IconsHandler>,
    preferences: Arc<dyn PreferenceStore>,
    icon_cache: Arc<dyn HostIconCache>,
    model: Arc<dyn ModelReloader>,
    runtime: Handle,
}

impl PackSwitchCoordinator {
    /// Background work is spawned onto `runtime`.
    pub fn new(
        handler: Arc<IconsHandler>,
        preferences: Arc<dyn PreferenceStore>,
        icon_cache: Arc<dyn HostIconCache>,
        model: Arc<dyn ModelReloader>,
        runtime: Handle,
    ) -> Self {
        Self {
            handler,
            preferences,
            icon_cache,
            model,
            runtime,
        }
    }

    pub fn handler(&self) -> &Arc<IconsHandler> {
        &self.handler
    }

    /// Starts a switch to `package`.
    ///
    /// Requesting the active pack without `update` switches to the default
    /// pack instead. Fails with [`SwitchError::Rejected`] when the target is
    /// not installed; nothing is persisted in that case.
    pub fn switch_icon_packs(&self, package: &str, update: bool) -> Result<SwitchTask, SwitchError> {
        let target = match self.handler.resolve_switch_target(package, update) {
            Ok(target) => target,
            Err(e) => {
                tracing::info!(pack = package, error = %e, "ignoring icon pack switch");
                return Err(e);
            }
        };
        tracing::info!(pack = %target, update, "switching icon pack");

        if let Err(e) = self.preferences.set_icon_pack(&target) {
            tracing::warn!(pack = %target, error = %e, "unable to persist icon pack choice");
        }

        let handler = Arc::clone(&self.handler);
        let icon_cache = Arc::clone(&self.icon_cache);
        let model = Arc::clone(&self.model);
        let package = target.clone();
        let handle = self.runtime.spawn(async move {
            let parser = Arc::clone(&handler);
            let parsed = tokio::task::spawn_blocking(move || parser.parse_pack(&package)).await?;
            let installed = handler.install(parsed);

            icon_cache.clear_icon_database();
            icon_cache.flush();
            model.force_reload();
            tracing::info!(pack = %installed.package(), "icon pack switch complete");
            Ok::<_, SwitchError>(installed)
        });

        Ok(SwitchTask {
            package: target,
            handle: Some(handle),
        })
    }
}

// ============================================================================
// SwitchTask
// ============================================================================

/// Handle to an in-flight switch. Dropping it aborts the switch.
#[derive(Debug)]
#[must_use = "dropping a SwitchTask cancels the switch"]
pub struct SwitchTask {
    package: String,
    handle: Option<JoinHandle<Result<Arc<PackState>, SwitchError>>>,
}

impl SwitchTask {
    /// The pack being switched to.
    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn abort(&self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Waits for the switch and returns the installed snapshot.
    pub async fn wait(mut self) -> Result<Arc<PackState>, SwitchError> {
        let Some(handle) = self.handle.take() else {
            return Err(SwitchError::Cancelled(self.package.clone()));
        };
        match handle.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(SwitchError::Cancelled(self.package.clone())),
            Err(e) => Err(SwitchError::Join(e)),
        }
    }

    /// Lets the switch run to completion without an owner.
    pub fn detach(mut self) {
        self.handle.take();
    }
}

impl Drop for SwitchTask {
    fn drop(&mut self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }
}
