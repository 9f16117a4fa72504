use thiserror::Error;

use crate::catalog::InstallMechanism;

/// Faults raised while installing a single application.
///
/// Installers never let these escape `install`; they are turned into a
/// failed [`crate::outcome::InstallOutcome`] at the installer boundary.
#[derive(Error, Debug)]
pub enum InstallError {
    #[error("HTTP {code} ({reason})")]
    HttpStatus { code: u16, reason: String },

    #[error("download timed out ({minutes} minutes)")]
    Timeout { minutes: u64 },

    #[error("{0}")]
    Transport(String),

    #[error("downloaded file invalid")]
    InvalidArtifact,

    #[error("{0}")]
    ChildProcess(String),

    #[error("failed to start {program}: {message}")]
    Launch { program: String, message: String },

    #[error("{0}")]
    Unexpected(String),

    #[error("Unsupported install mechanism: {0}")]
    UnsupportedMechanism(InstallMechanism),
}

impl InstallError {
    pub fn launch(program: impl Into<String>, err: std::io::Error) -> Self {
        InstallError::Launch {
            program: program.into(),
            message: err.to_string(),
        }
    }

    /// Map a reqwest error, singling out timeouts.
    pub fn from_reqwest(err: &reqwest::Error, timeout_minutes: u64) -> Self {
        if err.is_timeout() {
            InstallError::Timeout {
                minutes: timeout_minutes,
            }
        } else {
            InstallError::Transport(describe_reqwest(err))
        }
    }

    /// Short machine-friendly category, used as the JSON event code suffix.
    pub fn category(&self) -> &'static str {
        match self {
            InstallError::HttpStatus { .. }
            | InstallError::Timeout { .. }
            | InstallError::Transport(_) => "http",
            InstallError::InvalidArtifact => "invalid_artifact",
            InstallError::ChildProcess(_) | InstallError::Launch { .. } => "child_process",
            InstallError::Unexpected(_) => "unexpected",
            InstallError::UnsupportedMechanism(_) => "unsupported_mechanism",
        }
    }
}

impl From<std::io::Error> for InstallError {
    fn from(err: std::io::Error) -> Self {
        InstallError::Unexpected(err.to_string())
    }
}

// reqwest's Display stops at the outermost layer ("error sending request"),
// the useful part is further down the source chain.
fn describe_reqwest(err: &reqwest::Error) -> String {
    use std::error::Error as _;

    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
