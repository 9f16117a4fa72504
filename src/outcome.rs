use colored::*;
use serde::Serialize;
use std::fmt;

use crate::error::InstallError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Succeeded,
    AlreadyInstalled,
    Failed,
}

impl OutcomeKind {
    pub fn status_text(self) -> &'static str {
        match self {
            OutcomeKind::Succeeded => "OK",
            OutcomeKind::AlreadyInstalled => "SKIP",
            OutcomeKind::Failed => "FAIL",
        }
    }

    pub fn color_status(self) -> ColoredString {
        match self {
            OutcomeKind::Succeeded => self.status_text().green(),
            OutcomeKind::AlreadyInstalled => self.status_text().yellow(),
            OutcomeKind::Failed => self.status_text().red(),
        }
    }
}

/// Terminal result of one installation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallOutcome {
    pub success: bool,
    pub kind: OutcomeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl InstallOutcome {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            kind: OutcomeKind::Succeeded,
            detail: None,
        }
    }

    pub fn already_installed() -> Self {
        Self {
            success: true,
            kind: OutcomeKind::AlreadyInstalled,
            detail: None,
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            success: false,
            kind: OutcomeKind::Failed,
            detail: Some(detail.into()),
        }
    }

    /// The one place a fault becomes an outcome.
    pub fn from_error(err: &InstallError) -> Self {
        Self::failed(err.to_string())
    }

    /// Collapse an installer pipeline result into an outcome.
    pub fn from_result(result: Result<InstallOutcome, InstallError>) -> Self {
        result.unwrap_or_else(|err| Self::from_error(&err))
    }

    pub fn is_failure(&self) -> bool {
        self.kind == OutcomeKind::Failed
    }

    pub fn message(&self) -> String {
        match self.kind {
            OutcomeKind::Succeeded => "Completed".to_string(),
            OutcomeKind::AlreadyInstalled => "Already installed".to_string(),
            OutcomeKind::Failed => match &self.detail {
                Some(detail) => format!("Error: {}", detail),
                None => "Error".to_string(),
            },
        }
    }
}

impl fmt::Display for InstallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.kind.status_text(), self.message())
    }
}
