//! Download-then-execute backend.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use super::Installer;
use super::download::{DownloadArtifact, DownloadSettings, Downloader};
use super::process::{command, display_command};
use crate::catalog::{AppDescriptor, InstallMechanism};
use crate::config::Config;
use crate::error::InstallError;
use crate::outcome::InstallOutcome;
use crate::ui::prelude::*;

const POWERSHELL: &str = "powershell.exe";
const MSIEXEC: &str = "msiexec.exe";
/// CERT_E_UNTRUSTEDROOT
const UNTRUSTED_ROOT_CODE: &str = "0x800B0109";

pub struct DirectDownloadInstaller {
    downloader: Downloader,
    cleanup_delay: Duration,
    powershell: String,
    msiexec: String,
}

/// How a downloaded artifact gets executed.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LaunchPlan {
    /// Package deployment through PowerShell, output captured
    Msix { program: String, args: Vec<String> },
    /// Installer process, judged by exit code only
    Installer { program: String, args: Vec<String> },
}

impl DirectDownloadInstaller {
    pub fn new(settings: DownloadSettings, cleanup_delay: Duration) -> Result<Self, InstallError> {
        Ok(Self {
            downloader: Downloader::new(settings)?,
            cleanup_delay,
            powershell: POWERSHELL.to_string(),
            msiexec: MSIEXEC.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, InstallError> {
        Self::new(DownloadSettings::from_config(config), config.cleanup_delay())
    }

    fn plan(&self, extension: &str, path: &Path) -> LaunchPlan {
        let path_arg = path.to_string_lossy().to_string();
        match extension {
            ".msix" => LaunchPlan::Msix {
                program: self.powershell.clone(),
                args: msix_arguments(path),
            },
            ".msi" => LaunchPlan::Installer {
                program: self.msiexec.clone(),
                args: vec!["/i".to_string(), path_arg],
            },
            _ => LaunchPlan::Installer {
                program: path_arg,
                args: Vec::new(),
            },
        }
    }

    async fn execute(
        &self,
        app: &AppDescriptor,
        artifact: &DownloadArtifact,
    ) -> Result<InstallOutcome, InstallError> {
        match self.plan(artifact.extension(), artifact.path()) {
            LaunchPlan::Msix { program, args } => install_msix(&program, &args).await,
            LaunchPlan::Installer { program, args } => run_installer(app, &program, &args).await,
        }
    }
}

#[async_trait]
impl Installer for DirectDownloadInstaller {
    fn mechanism(&self) -> InstallMechanism {
        InstallMechanism::DirectDownload
    }

    async fn install(&self, app: &AppDescriptor) -> InstallOutcome {
        let artifact = match self.downloader.download(app).await {
            Ok(artifact) => artifact,
            Err(err) => {
                emit(
                    Level::Error,
                    &format!("install.download.{}", err.category()),
                    &format!("  Download error: {}", err),
                    Some(serde_json::json!({ "app": app.name })),
                );
                return InstallOutcome::from_error(&err);
            }
        };

        let outcome = InstallOutcome::from_result(self.execute(app, &artifact).await);
        artifact.release(self.cleanup_delay).await;
        outcome
    }
}

/// Launch an installer and wait for it.
///
/// Exit code 0 is success. Any other exit is taken to mean the application
/// was already present or the user cancelled; installers do not report
/// either reliably.
async fn run_installer(
    app: &AppDescriptor,
    program: &str,
    base_args: &[String],
) -> Result<InstallOutcome, InstallError> {
    let silent = app.mode.is_silent();
    let extra = if silent {
        app.silent_args.as_deref().unwrap_or("")
    } else {
        ""
    };

    let mut cmd = command(program, silent);
    cmd.args(base_args);
    push_raw_args(&mut cmd, extra)?;
    debug(
        "install.direct.command",
        &format!("{} {}", display_command(program, base_args), extra),
    );

    let status = cmd
        .status()
        .await
        .map_err(|e| InstallError::launch(program, e))?;

    Ok(if status.success() {
        InstallOutcome::succeeded()
    } else {
        debug(
            "install.direct.nonzero_exit",
            &format!("{} exited with {:?}", app.name, status.code()),
        );
        InstallOutcome::already_installed()
    })
}

// Windows installers parse their own command line, so the configured string
// is passed through untouched there.
#[cfg(windows)]
fn push_raw_args(cmd: &mut tokio::process::Command, args: &str) -> Result<(), InstallError> {
    if !args.trim().is_empty() {
        cmd.raw_arg(args);
    }
    Ok(())
}

#[cfg(not(windows))]
fn push_raw_args(cmd: &mut tokio::process::Command, args: &str) -> Result<(), InstallError> {
    let words = shell_words::split(args)
        .map_err(|e| InstallError::Unexpected(format!("invalid silent arguments: {}", e)))?;
    cmd.args(words);
    Ok(())
}

pub(crate) fn msix_arguments(path: &Path) -> Vec<String> {
    let quoted = path.to_string_lossy().replace('\'', "''");
    vec![
        "-NoProfile".to_string(),
        "-ExecutionPolicy".to_string(),
        "Bypass".to_string(),
        "-Command".to_string(),
        format!("Add-AppxPackage -Path '{}'", quoted),
    ]
}

pub(crate) fn needs_certificate_hint(stderr: &str) -> bool {
    stderr.contains(UNTRUSTED_ROOT_CODE) || stderr.contains("certificate")
}

fn msix_error_message(stderr: &[u8]) -> String {
    let stderr = String::from_utf8_lossy(stderr).trim().to_string();
    if stderr.is_empty() {
        "MSIX installation failed".to_string()
    } else {
        stderr
    }
}

async fn install_msix(program: &str, args: &[String]) -> Result<InstallOutcome, InstallError> {
    debug("install.msix.command", &display_command(program, args));

    let output = command(program, true)
        .args(args)
        .stdin(std::process::Stdio::null())
        .output()
        .await
        .map_err(|e| InstallError::launch(program, e))?;

    if output.status.success() {
        return Ok(InstallOutcome::succeeded());
    }

    let message = msix_error_message(&output.stderr);
    if needs_certificate_hint(&message) {
        emit(
            Level::Warn,
            "install.msix.certificate_hint",
            "Hint: the MSIX package is unsigned or its certificate is not trusted",
            None,
        );
        emit(
            Level::Warn,
            "install.msix.certificate_hint",
            "Enable Developer Mode or install the file manually",
            None,
        );
    }

    Err(InstallError::ChildProcess(message))
}
