//! Application catalog.
//!
//! The built-in table is initialized once and never changes. A [`Catalog`]
//! is the built-in table plus any extra entries from the settings file,
//! assembled at startup and only read afterwards.

mod model;

pub use model::{AppDescriptor, InstallMechanism, InstallMode, name_key};

use anyhow::{Result, bail};
use std::collections::HashSet;

use InstallMechanism::{DirectDownload, PackageManager};
use InstallMode::{Interactive, Silent};

lazy_static::lazy_static! {
    static ref BUILTIN_APPS: Vec<AppDescriptor> = vec![
        // Installer UI is shown
        AppDescriptor::new("Google Chrome", "Google.Chrome", PackageManager, Interactive),
        AppDescriptor::new("ONLYOFFICE Desktop", "ONLYOFFICE.DesktopEditors", PackageManager, Interactive),
        AppDescriptor::new("OBS Studio", "OBSProject.OBSStudio", PackageManager, Silent),

        // Unattended
        AppDescriptor::new("7-Zip", "7zip.7zip", PackageManager, Silent),
        AppDescriptor::new("AnyDesk", "AnyDesk.AnyDesk", PackageManager, Silent),
        AppDescriptor::new("Telegram", "Telegram.TelegramDesktop", PackageManager, Silent),
        AppDescriptor::new("WhatsApp", "9NKSQGP7F2NH", PackageManager, Silent),
        AppDescriptor::new("Synology Drive Client", "Synology.DriveClient", PackageManager, Silent),
        AppDescriptor::new("Handbrake", "HandBrake.HandBrake", PackageManager, Silent),
        AppDescriptor::new(".Net Runtime 10", "Microsoft.DotNet.Runtime.10", PackageManager, Silent),
        AppDescriptor::new("Veyon", "VeyonSolutions.Veyon", PackageManager, Interactive),

        // Direct downloads
        AppDescriptor::new("Affinity", "https://downloads.affinity.studio/Affinity%20x64.msix", DirectDownload, Interactive),
        AppDescriptor::new("Nvidia App", "https://tr.download.nvidia.com/nvapp/client/11.0.5.420/NVIDIA_app_v11.0.5.420.exe", DirectDownload, Interactive),
        AppDescriptor::new("Intel Driver Support Assistant", "https://dsadata.intel.com/installer/weberror", DirectDownload, Interactive),
    ];
}

/// The fixed, built-in application table.
pub fn builtin_apps() -> &'static [AppDescriptor] {
    &BUILTIN_APPS
}

#[derive(Debug, Clone)]
pub struct Catalog {
    apps: Vec<AppDescriptor>,
}

impl Catalog {
    /// Built-in entries only.
    pub fn builtin() -> Self {
        Self {
            apps: builtin_apps().to_vec(),
        }
    }

    /// Built-in entries followed by `extra`. Names must stay unique
    /// (case-insensitive) across the whole catalog.
    pub fn with_extra(extra: &[AppDescriptor]) -> Result<Self> {
        let mut catalog = Self::builtin();
        let mut seen: HashSet<String> = catalog.apps.iter().map(AppDescriptor::name_key).collect();

        for app in extra {
            if app.name.trim().is_empty() {
                bail!("Catalog entry with source '{}' has an empty name", app.source);
            }
            if !seen.insert(app.name_key()) {
                bail!("Duplicate catalog entry: {}", app.name);
            }
            catalog.apps.push(app.clone());
        }

        Ok(catalog)
    }

    pub fn apps(&self) -> &[AppDescriptor] {
        &self.apps
    }

    /// Case-insensitive exact name lookup.
    pub fn find(&self, name: &str) -> Option<&AppDescriptor> {
        let needle = name_key(name);
        self.apps.iter().find(|a| a.name_key() == needle)
    }

    /// Resolve names to entries in the order given.
    pub fn select_by_names<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<AppDescriptor>> {
        let mut selected = Vec::with_capacity(names.len());
        let mut unknown = Vec::new();

        for name in names {
            match self.find(name.as_ref()) {
                Some(app) => selected.push(app.clone()),
                None => unknown.push(name.as_ref().to_string()),
            }
        }

        if !unknown.is_empty() {
            bail!("Unknown application(s): {}", unknown.join(", "));
        }

        Ok(selected)
    }
}
