use colored::*;
use lazy_static::lazy_static;
use serde::Serialize;
use std::io::{self, Write};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::catalog::AppDescriptor;
use crate::orchestrator::BatchSummary;
use crate::outcome::InstallOutcome;

pub mod console;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy)]
pub enum Level {
    Info,
    Success,
    Warn,
    Error,
    Debug,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Success => "success",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Debug => "debug",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Renderer {
    pub format: OutputFormat,
    pub color: bool,
}

impl Default for Renderer {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            color: true,
        }
    }
}

lazy_static! {
    static ref RENDERER: RwLock<Renderer> = RwLock::new(Renderer::default());
}

// Global debug state
static DEBUG_MODE: AtomicBool = AtomicBool::new(false);

pub fn set_debug_mode(enabled: bool) {
    DEBUG_MODE.store(enabled, Ordering::Relaxed);
}

pub fn is_debug_enabled() -> bool {
    DEBUG_MODE.load(Ordering::Relaxed)
}

pub fn init(format: OutputFormat, color: bool) {
    if let Ok(mut r) = RENDERER.write() {
        r.format = format;
        r.color = color;
    }
    colored::control::set_override(color);
}

pub const SEPARATOR_HEAVY: &str = "━";
pub const SEPARATOR_LIGHT: &str = "─";

#[derive(Serialize)]
struct Event<'a> {
    level: &'a str,
    code: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

fn colorize(level: Level, s: &str, enable: bool) -> String {
    if !enable {
        return s.to_string();
    }
    match level {
        Level::Info => s.normal().to_string(),
        Level::Success => s.green().bold().to_string(),
        Level::Warn => s.yellow().bold().to_string(),
        Level::Error => s.red().bold().to_string(),
        Level::Debug => s.cyan().to_string(),
    }
}

fn strip_ansi(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            // CSI sequences end with a byte in @..=~
            for c in chars.by_ref() {
                if ('@'..='~').contains(&c) {
                    break;
                }
            }
            continue;
        }
        out.push(c);
    }
    out
}

fn render(r: &Renderer, level: Level, code: &str, message: &str, data: Option<serde_json::Value>) -> String {
    match r.format {
        OutputFormat::Text => colorize(level, message, r.color),
        OutputFormat::Json => {
            let clean_msg = strip_ansi(message);
            let ev = Event {
                level: level.as_str(),
                code,
                message: &clean_msg,
                data,
            };
            serde_json::to_string(&ev).unwrap_or_else(|_| clean_msg.clone())
        }
    }
}

pub fn emit(level: Level, code: &str, message: &str, data: Option<serde_json::Value>) {
    if matches!(level, Level::Debug) && !is_debug_enabled() {
        return;
    }
    let r = RENDERER.read().map(|r| r.clone()).unwrap_or_default();
    let line = render(&r, level, code, message, data);
    let mut out: Box<dyn Write> = match level {
        Level::Error | Level::Warn => Box::new(io::stderr()),
        _ => Box::new(io::stdout()),
    };
    let _ = writeln!(out, "{}", line);
}

/// Debug-only event.
pub fn debug(code: &str, message: &str) {
    emit(Level::Debug, code, message, None);
}

pub fn get_output_format() -> OutputFormat {
    RENDERER
        .read()
        .map(|r| r.format)
        .unwrap_or(OutputFormat::Text)
}

pub fn separator(light: bool) {
    if matches!(get_output_format(), OutputFormat::Json) {
        return;
    }
    let glyph = if light {
        SEPARATOR_LIGHT
    } else {
        SEPARATOR_HEAVY
    };
    let _ = writeln!(io::stdout(), "{}", glyph.repeat(80));
}

/// Presentation side of an installation run.
///
/// Implementations must not panic; everything except `prompt_selection` is
/// fire-and-forget reporting.
pub trait InstallerUi {
    /// Ask which catalog entries to install.
    fn prompt_selection(&self, catalog: &[AppDescriptor]) -> anyhow::Result<Vec<AppDescriptor>>;

    fn report_empty_selection(&self);

    fn report_batch_start(&self, selected: &[AppDescriptor]);

    fn report_item_start(&self, _index: usize, _total: usize, _app: &AppDescriptor) {}

    fn report_outcome(&self, app: &AppDescriptor, outcome: &InstallOutcome);

    /// An install attempt that ended without producing an outcome.
    fn report_exception(&self, app: &AppDescriptor, message: &str);

    fn report_batch_complete(&self, summary: &BatchSummary);
}

pub mod prelude {
    pub use super::{Level, OutputFormat, debug, emit, get_output_format, separator};
}
