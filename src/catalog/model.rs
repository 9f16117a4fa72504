//! Catalog entry types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How an application gets onto the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallMechanism {
    /// Installed through the package-manager tool by exact package id
    PackageManager,
    /// Installer artifact downloaded over HTTP and executed locally
    DirectDownload,
}

impl InstallMechanism {
    /// Single-letter tag used in compact listings.
    pub fn tag(self) -> char {
        match self {
            Self::PackageManager => 'W',
            Self::DirectDownload => 'D',
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::PackageManager => "Package manager",
            Self::DirectDownload => "Direct download",
        }
    }
}

impl fmt::Display for InstallMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallMode {
    /// The installer shows its own UI and may ask questions
    Interactive,
    /// Fully unattended, no installer window
    Silent,
}

impl InstallMode {
    pub fn tag(self) -> char {
        match self {
            Self::Interactive => 'I',
            Self::Silent => 'S',
        }
    }

    pub fn is_silent(self) -> bool {
        matches!(self, Self::Silent)
    }
}

/// One installable application.
///
/// `source` is a package id for [`InstallMechanism::PackageManager`] entries
/// and a download URL for [`InstallMechanism::DirectDownload`] entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDescriptor {
    pub name: String,
    pub source: String,
    pub mechanism: InstallMechanism,
    pub mode: InstallMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub silent_args: Option<String>,
}

impl AppDescriptor {
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        mechanism: InstallMechanism,
        mode: InstallMode,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            mechanism,
            mode,
            silent_args: None,
        }
    }

    #[cfg(test)]
    pub fn with_silent_args(mut self, args: impl Into<String>) -> Self {
        self.silent_args = Some(args.into());
        self
    }

    /// Name with whitespace removed and path-hostile characters replaced,
    /// safe to embed in a file name.
    pub fn file_stem(&self) -> String {
        self.name
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect()
    }

    /// Case-folded name used for every name comparison.
    pub fn name_key(&self) -> String {
        name_key(&self.name)
    }
}

/// Case-folded form of an application name.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl fmt::Display for AppDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{} {}]",
            self.name,
            self.mechanism.tag(),
            self.mode.tag()
        )
    }
}
