//! Installation mechanisms.
//!
//! Each mechanism implements [`Installer`]. The [`InstallerRegistry`] maps a
//! catalog entry's mechanism to the installer that handles it.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::catalog::{AppDescriptor, InstallMechanism};
use crate::config::Config;
use crate::error::InstallError;
use crate::outcome::InstallOutcome;

pub mod direct;
pub mod download;
pub mod package_manager;
mod process;
#[cfg(test)]
mod test_server;

pub use direct::DirectDownloadInstaller;
pub use package_manager::PackageManagerInstaller;

#[async_trait]
pub trait Installer: Send + Sync {
    fn mechanism(&self) -> InstallMechanism;

    /// Install one application.
    ///
    /// Never returns an error: every failure is reported as a failed outcome.
    async fn install(&self, app: &AppDescriptor) -> InstallOutcome;

    /// Warning to show before a batch that uses this installer, if any.
    fn preflight(&self) -> Option<String> {
        None
    }
}

pub type SharedInstaller = Arc<dyn Installer>;

pub struct InstallerRegistry {
    installers: HashMap<InstallMechanism, SharedInstaller>,
}

impl InstallerRegistry {
    /// Empty registry; every lookup fails until installers are registered.
    pub fn empty() -> Self {
        Self {
            installers: HashMap::new(),
        }
    }

    /// Registry with both built-in mechanisms configured from `config`.
    pub fn from_config(config: &Config) -> Result<Self, InstallError> {
        let mut registry = Self::empty();
        registry.register(Arc::new(PackageManagerInstaller::from_config(config)));
        registry.register(Arc::new(DirectDownloadInstaller::from_config(config)?));
        Ok(registry)
    }

    /// Register `installer` under its own mechanism, replacing any previous one.
    pub fn register(&mut self, installer: SharedInstaller) {
        self.installers.insert(installer.mechanism(), installer);
    }

    pub fn select(&self, mechanism: InstallMechanism) -> Result<SharedInstaller, InstallError> {
        self.installers
            .get(&mechanism)
            .cloned()
            .ok_or(InstallError::UnsupportedMechanism(mechanism))
    }
}
