//! Package-manager (winget) backend.

use async_trait::async_trait;

use super::Installer;
use super::process::{command, display_command};
use crate::catalog::{AppDescriptor, InstallMechanism, InstallMode};
use crate::config::Config;
use crate::error::InstallError;
use crate::outcome::InstallOutcome;
use crate::ui::prelude::*;

/// Exit codes reported by the package-manager tool.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    /// APPINSTALLER_CLI_ERROR_UPDATE_NOT_APPLICABLE (0x8A15002B)
    pub const ALREADY_INSTALLED: i32 = -1_978_335_189;
    pub const ALREADY_INSTALLED_ALT: i32 = 1_978_335_217;
}

pub struct PackageManagerInstaller {
    program: String,
}

impl PackageManagerInstaller {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.package_manager.clone())
    }

    /// Whether the tool can be found on `PATH` (or at the configured path).
    pub fn is_available(&self) -> bool {
        which::which(&self.program).is_ok()
    }

    async fn run(&self, app: &AppDescriptor) -> Result<InstallOutcome, InstallError> {
        let args = build_arguments(app);
        debug(
            "install.package_manager.command",
            &display_command(&self.program, &args),
        );

        let status = command(&self.program, false)
            .args(&args)
            .status()
            .await
            .map_err(|e| InstallError::launch(&self.program, e))?;

        Ok(match status.code() {
            Some(code) => map_exit_code(code),
            None => InstallOutcome::failed(format!("{} was terminated", self.program)),
        })
    }
}

#[async_trait]
impl Installer for PackageManagerInstaller {
    fn mechanism(&self) -> InstallMechanism {
        InstallMechanism::PackageManager
    }

    async fn install(&self, app: &AppDescriptor) -> InstallOutcome {
        InstallOutcome::from_result(self.run(app).await)
    }

    fn preflight(&self) -> Option<String> {
        if self.is_available() {
            None
        } else {
            Some(format!(
                "{} was not found on PATH; package-manager installs will fail",
                self.program
            ))
        }
    }
}

pub fn build_arguments(app: &AppDescriptor) -> Vec<String> {
    let mode = match app.mode {
        InstallMode::Silent => "--silent",
        InstallMode::Interactive => "--interactive",
    };

    [
        "install",
        "--id",
        app.source.as_str(),
        "--accept-source-agreements",
        "--accept-package-agreements",
        "--exact",
        mode,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub fn map_exit_code(code: i32) -> InstallOutcome {
    match code {
        exit_codes::SUCCESS => InstallOutcome::succeeded(),
        exit_codes::ALREADY_INSTALLED | exit_codes::ALREADY_INSTALLED_ALT => {
            InstallOutcome::already_installed()
        }
        other => InstallOutcome::failed(format!("Exit code: {}", other)),
    }
}
