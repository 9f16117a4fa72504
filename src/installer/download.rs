//! Download phase of the direct-download installer.
//!
//! An artifact is staged in a uniquely named temp file. The file belongs to
//! the [`DownloadArtifact`] and is removed when the artifact is released or
//! dropped, whichever comes first; removal errors are ignored.

use futures_util::StreamExt;
use reqwest::header::CONTENT_DISPOSITION;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;

use crate::catalog::AppDescriptor;
use crate::config::Config;
use crate::error::InstallError;
use crate::ui::prelude::*;

/// Extensions recognized in a final URL, checked in this order.
const URL_EXTENSIONS: &[&str] = &[".exe", ".msix", ".msi"];
/// Suffixes recognized at the end of the requested URL.
const SOURCE_SUFFIXES: &[&str] = &[".msix", ".msi"];
const DEFAULT_EXTENSION: &str = ".exe";

const LARGE_DOWNLOAD_BYTES: u64 = 100 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct DownloadSettings {
    pub timeout: Duration,
    pub max_redirects: usize,
    pub user_agent: String,
    pub staging_dir: PathBuf,
    /// Pause after the file is written, before it is handed out
    pub settle: Duration,
}

impl DownloadSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: config.download_timeout(),
            max_redirects: config.max_redirects,
            user_agent: config.user_agent.clone(),
            staging_dir: config.staging_dir(),
            settle: config.filesystem_settle(),
        }
    }

    fn timeout_minutes(&self) -> u64 {
        self.timeout.as_secs() / 60
    }
}

/// A downloaded installer staged on disk.
#[derive(Debug)]
pub struct DownloadArtifact {
    path: TempPath,
    extension: String,
}

impl DownloadArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lower-case extension including the dot, e.g. `.msi`.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Wait `delay` for the installer process to let go of the file, then
    /// delete it. Never fails, also when the file is already gone.
    pub async fn release(self, delay: Duration) {
        if self.exists() {
            tokio::time::sleep(delay).await;
        }
        let path = self.path.to_path_buf();
        if let Err(e) = self.path.close() {
            debug(
                "install.cleanup.ignored",
                &format!("Could not remove {}: {}", path.display(), e),
            );
        }
    }
}

pub struct Downloader {
    client: reqwest::Client,
    settings: DownloadSettings,
}

impl Downloader {
    pub fn new(settings: DownloadSettings) -> Result<Self, InstallError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(settings.max_redirects))
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| InstallError::Unexpected(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, settings })
    }

    fn map_reqwest(&self, err: reqwest::Error) -> InstallError {
        InstallError::from_reqwest(&err, self.settings.timeout_minutes())
    }

    pub async fn download(&self, app: &AppDescriptor) -> Result<DownloadArtifact, InstallError> {
        let response = self
            .client
            .get(&app.source)
            .send()
            .await
            .map_err(|e| self.map_reqwest(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InstallError::HttpStatus {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let final_url = response.url().to_string();
        let extension = resolve_extension(disposition.as_deref(), &final_url, &app.source);
        debug(
            "install.download.resolved",
            &format!("{} -> {} ({})", app.source, final_url, extension),
        );

        if let Some(size) = response
            .content_length()
            .filter(|len| *len > LARGE_DOWNLOAD_BYTES)
        {
            emit(
                Level::Warn,
                "install.download.large",
                &format!(
                    "  Large file ({} MB), the download may take a while...",
                    size / 1024 / 1024
                ),
                Some(serde_json::json!({ "app": app.name, "bytes": size })),
            );
        }

        let staged = tempfile::Builder::new()
            .prefix(&format!("{}_", app.file_stem()))
            .suffix(&extension)
            .tempfile_in(&self.settings.staging_dir)?;
        let (file, path) = staged.into_parts();
        debug("install.download.staged", &path.display().to_string());

        // `path` removes the partial file if anything below bails out
        let mut file = tokio::fs::File::from_std(file);
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| self.map_reqwest(e))?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);

        let valid = tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false);
        if !valid {
            let _ = path.close();
            return Err(InstallError::InvalidArtifact);
        }

        tokio::time::sleep(self.settings.settle).await;

        Ok(DownloadArtifact { path, extension })
    }
}

/// Pick the artifact extension: the `Content-Disposition` file name wins,
/// then a known extension anywhere in the final URL, then a known suffix of
/// the requested URL, then `.exe`.
pub fn resolve_extension(
    content_disposition: Option<&str>,
    final_url: &str,
    original_url: &str,
) -> String {
    if let Some(ext) = content_disposition
        .and_then(disposition_filename)
        .and_then(|name| file_extension(&name))
    {
        return ext;
    }

    let final_url = final_url.to_ascii_lowercase();
    if let Some(ext) = URL_EXTENSIONS.iter().find(|ext| final_url.contains(*ext)) {
        return ext.to_string();
    }

    let original_url = original_url.to_ascii_lowercase();
    if let Some(ext) = SOURCE_SUFFIXES.iter().find(|ext| original_url.ends_with(*ext)) {
        return ext.to_string();
    }

    DEFAULT_EXTENSION.to_string()
}

/// File name from a `Content-Disposition` value. `filename*` (RFC 5987) is
/// preferred over `filename`.
fn disposition_filename(value: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for (key, val) in disposition_params(value) {
        match key.to_ascii_lowercase().as_str() {
            "filename" => plain = Some(val),
            // charset'language'encoded-name
            "filename*" => extended = val.rsplit('\'').next().map(str::to_string),
            _ => {}
        }
    }

    extended.or(plain).filter(|name| !name.is_empty())
}

/// `key=value` parameters of a header value. Quoted values may contain `;`
/// and backslash escapes.
fn disposition_params(value: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut chars = value.chars().peekable();

    loop {
        // key, up to `=` or the next separator
        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c == ';' {
                break;
            }
            key.push(c);
            chars.next();
        }

        let mut val = String::new();
        if chars.peek() == Some(&'=') {
            chars.next();
            while chars.peek().is_some_and(|c| c.is_whitespace()) {
                chars.next();
            }
            if chars.peek() == Some(&'"') {
                chars.next();
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                val.push(escaped);
                            }
                        }
                        '"' => break,
                        _ => val.push(c),
                    }
                }
                // skip anything between the closing quote and `;`
                while chars.peek().is_some_and(|c| *c != ';') {
                    chars.next();
                }
            } else {
                while let Some(&c) = chars.peek() {
                    if c == ';' {
                        break;
                    }
                    val.push(c);
                    chars.next();
                }
                val = val.trim().to_string();
            }
            let key = key.trim();
            if !key.is_empty() {
                params.push((key.to_string(), val));
            }
        }

        if chars.next().is_none() {
            break;
        }
    }

    params
}

fn file_extension(name: &str) -> Option<String> {
    let ext = Path::new(name).extension()?.to_str()?;
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(format!(".{}", ext.to_ascii_lowercase()))
}
