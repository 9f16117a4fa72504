//! Sequential installation of a selected batch.
//!
//! One application is fully handled (download, install, cleanup) before the
//! next starts. A failing, panicking or unsupported entry only affects its own
//! report line.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashSet;

use crate::catalog::{AppDescriptor, Catalog, InstallMechanism};
use crate::installer::InstallerRegistry;
use crate::outcome::{InstallOutcome, OutcomeKind};
use crate::ui::InstallerUi;
use crate::ui::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    SelectionPending,
    Installing { index: usize, total: usize },
    Done,
}

/// How the batch gets its applications.
#[derive(Debug, Clone)]
pub enum Selection {
    /// Ask the UI
    Prompt,
    /// Already decided (command line)
    Preset(Vec<AppDescriptor>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub already_installed: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn record(&mut self, outcome: &InstallOutcome) {
        match outcome.kind {
            OutcomeKind::Succeeded => self.succeeded += 1,
            OutcomeKind::AlreadyInstalled => self.already_installed += 1,
            OutcomeKind::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.already_installed + self.failed
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub results: Vec<(AppDescriptor, InstallOutcome)>,
    pub summary: BatchSummary,
}

impl BatchReport {
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

pub struct Orchestrator<'a> {
    registry: &'a InstallerRegistry,
    ui: &'a dyn InstallerUi,
    state: RunState,
}

impl<'a> Orchestrator<'a> {
    pub fn new(registry: &'a InstallerRegistry, ui: &'a dyn InstallerUi) -> Self {
        Self {
            registry,
            ui,
            state: RunState::NotStarted,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Run one batch. Only a failing selection prompt is an error; every
    /// per-application problem ends up in the report.
    pub async fn run(&mut self, catalog: &Catalog, selection: Selection) -> Result<BatchReport> {
        let selected = match selection {
            Selection::Preset(apps) => apps,
            Selection::Prompt => {
                self.state = RunState::SelectionPending;
                self.ui
                    .prompt_selection(catalog.apps())
                    .context("Failed to read application selection")?
            }
        };

        let selected = dedup_by_name(selected);
        if selected.is_empty() {
            self.ui.report_empty_selection();
            self.state = RunState::Done;
            return Ok(BatchReport::default());
        }

        Ok(self.install_all(&selected).await)
    }

    async fn install_all(&mut self, selected: &[AppDescriptor]) -> BatchReport {
        let total = selected.len();
        self.ui.report_batch_start(selected);
        self.preflight(selected);

        let mut report = BatchReport::default();
        for (index, app) in selected.iter().enumerate() {
            self.state = RunState::Installing { index, total };
            self.ui.report_item_start(index, total, app);

            let outcome = match self.install_one(app).await {
                Ok(outcome) => {
                    self.ui.report_outcome(app, &outcome);
                    outcome
                }
                Err(message) => {
                    self.ui.report_exception(app, &message);
                    InstallOutcome::failed(message)
                }
            };

            report.summary.record(&outcome);
            report.results.push((app.clone(), outcome));
        }

        self.ui.report_batch_complete(&report.summary);
        self.state = RunState::Done;
        report
    }

    /// Install on a separate task so a panicking installer cannot take the
    /// batch down with it.
    async fn install_one(&self, app: &AppDescriptor) -> Result<InstallOutcome, String> {
        let installer = self
            .registry
            .select(app.mechanism)
            .map_err(|e| e.to_string())?;

        let owned = app.clone();
        tokio::spawn(async move { installer.install(&owned).await })
            .await
            .map_err(|e| {
                if e.is_panic() {
                    panic_message(e.into_panic())
                } else {
                    "installation task was cancelled".to_string()
                }
            })
    }

    fn preflight(&self, selected: &[AppDescriptor]) {
        let mechanisms: HashSet<InstallMechanism> = selected.iter().map(|a| a.mechanism).collect();
        for mechanism in mechanisms {
            let Ok(installer) = self.registry.select(mechanism) else {
                continue;
            };
            if let Some(warning) = installer.preflight() {
                emit(
                    Level::Warn,
                    "install.preflight",
                    &warning,
                    Some(serde_json::json!({ "mechanism": mechanism })),
                );
            }
        }
    }
}

/// Keep the first occurrence of each name.
fn dedup_by_name(apps: Vec<AppDescriptor>) -> Vec<AppDescriptor> {
    let mut seen = HashSet::new();
    apps.into_iter()
        .filter(|app| {
            let fresh = seen.insert(app.name_key());
            if !fresh {
                debug(
                    "install.selection.duplicate",
                    &format!("Skipping duplicate selection: {}", app.name),
                );
            }
            fresh
        })
        .collect()
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("installer panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("installer panicked: {}", s)
    } else {
        "installer panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InstallMode;
    use crate::installer::Installer;
    use async_trait::async_trait;
    use std::cell::RefCell;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Empty,
        Start(Vec<String>),
        Item(usize, usize, String),
        Outcome(String, InstallOutcome),
        Exception(String, String),
        Complete(BatchSummary),
    }

    struct RecordingUi {
        selection: Option<Vec<AppDescriptor>>,
        events: RefCell<Vec<Event>>,
    }

    impl RecordingUi {
        fn new(selection: Option<Vec<AppDescriptor>>) -> Self {
            Self {
                selection,
                events: RefCell::new(Vec::new()),
            }
        }

        fn events(&self) -> Vec<Event> {
            self.events.borrow().clone()
        }
    }

    impl InstallerUi for RecordingUi {
        fn prompt_selection(&self, _catalog: &[AppDescriptor]) -> Result<Vec<AppDescriptor>> {
            self.selection
                .clone()
                .ok_or_else(|| anyhow::anyhow!("terminal closed"))
        }

        fn report_empty_selection(&self) {
            self.events.borrow_mut().push(Event::Empty);
        }

        fn report_batch_start(&self, selected: &[AppDescriptor]) {
            let names = selected.iter().map(|a| a.name.clone()).collect();
            self.events.borrow_mut().push(Event::Start(names));
        }

        fn report_item_start(&self, index: usize, total: usize, app: &AppDescriptor) {
            self.events
                .borrow_mut()
                .push(Event::Item(index, total, app.name.clone()));
        }

        fn report_outcome(&self, app: &AppDescriptor, outcome: &InstallOutcome) {
            self.events
                .borrow_mut()
                .push(Event::Outcome(app.name.clone(), outcome.clone()));
        }

        fn report_exception(&self, app: &AppDescriptor, message: &str) {
            self.events
                .borrow_mut()
                .push(Event::Exception(app.name.clone(), message.to_string()));
        }

        fn report_batch_complete(&self, summary: &BatchSummary) {
            self.events.borrow_mut().push(Event::Complete(*summary));
        }
    }

    /// Outcome chosen by app name; "Boom" panics.
    struct Scripted {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Installer for Scripted {
        fn mechanism(&self) -> InstallMechanism {
            InstallMechanism::PackageManager
        }

        async fn install(&self, app: &AppDescriptor) -> InstallOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match app.name.as_str() {
                "7-Zip" => InstallOutcome::succeeded(),
                "Foo" => InstallOutcome::already_installed(),
                "Boom" => panic!("installer exploded"),
                _ => InstallOutcome::failed("Exit code: 1"),
            }
        }
    }

    fn winget(name: &str) -> AppDescriptor {
        AppDescriptor::new(name, name, InstallMechanism::PackageManager, InstallMode::Silent)
    }

    fn download(name: &str) -> AppDescriptor {
        AppDescriptor::new(
            name,
            "https://x/y.exe",
            InstallMechanism::DirectDownload,
            InstallMode::Interactive,
        )
    }

    fn registry(calls: &Arc<AtomicUsize>) -> InstallerRegistry {
        let mut registry = InstallerRegistry::empty();
        registry.register(Arc::new(Scripted {
            calls: calls.clone(),
        }));
        registry
    }

    #[tokio::test]
    async fn test_empty_selection_installs_nothing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = registry(&calls);
        let ui = RecordingUi::new(Some(vec![]));
        let mut orchestrator = Orchestrator::new(&registry, &ui);

        let report = orchestrator
            .run(&Catalog::builtin(), Selection::Prompt)
            .await
            .unwrap();

        assert!(report.is_empty());
        assert_eq!(ui.events(), vec![Event::Empty]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(orchestrator.state(), RunState::Done);
    }

    #[tokio::test]
    async fn test_every_item_reported_in_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = registry(&calls);
        let ui = RecordingUi::new(None);
        let mut orchestrator = Orchestrator::new(&registry, &ui);

        let selected = vec![
            winget("Bad"),
            winget("Boom"),
            download("Bar"),
            winget("7-Zip"),
            winget("Foo"),
        ];
        let report = orchestrator
            .run(&Catalog::builtin(), Selection::Preset(selected))
            .await
            .unwrap();

        let names: Vec<_> = report.results.iter().map(|(a, _)| a.name.as_str()).collect();
        assert_eq!(names, ["Bad", "Boom", "Bar", "7-Zip", "Foo"]);
        assert_eq!(
            report.summary,
            BatchSummary {
                succeeded: 1,
                already_installed: 1,
                failed: 3,
            }
        );
        // "Bar" has no registered installer and never reaches one
        assert_eq!(calls.load(Ordering::SeqCst), 4);

        let events = ui.events();
        assert_eq!(events.len(), 1 + 5 * 2 + 1);
        assert_eq!(
            events[4],
            Event::Exception(
                "Boom".to_string(),
                "installer panicked: installer exploded".to_string()
            )
        );
        assert_eq!(
            events[6],
            Event::Exception(
                "Bar".to_string(),
                "Unsupported install mechanism: Direct download".to_string()
            )
        );
        assert_eq!(
            events[8],
            Event::Outcome("7-Zip".to_string(), InstallOutcome::succeeded())
        );
        assert_eq!(events.last(), Some(&Event::Complete(report.summary)));
    }

    #[tokio::test]
    async fn test_duplicates_are_processed_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = registry(&calls);
        let ui = RecordingUi::new(None);
        let mut orchestrator = Orchestrator::new(&registry, &ui);

        let report = orchestrator
            .run(
                &Catalog::builtin(),
                Selection::Preset(vec![winget("7-Zip"), winget("Foo"), winget("7-zip")]),
            )
            .await
            .unwrap();

        assert_eq!(report.results.len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            ui.events()[0],
            Event::Start(vec!["7-Zip".to_string(), "Foo".to_string()])
        );
    }

    #[tokio::test]
    async fn test_duplicates_fold_non_ascii_case() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = registry(&calls);
        let ui = RecordingUi::new(None);
        let mut orchestrator = Orchestrator::new(&registry, &ui);

        let report = orchestrator
            .run(
                &Catalog::builtin(),
                Selection::Preset(vec![winget("Ärger"), winget("ÄRGER")]),
            )
            .await
            .unwrap();

        assert_eq!(report.results.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_prompt_failure_aborts_run() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = registry(&calls);
        let ui = RecordingUi::new(None);
        let mut orchestrator = Orchestrator::new(&registry, &ui);

        let err = orchestrator
            .run(&Catalog::builtin(), Selection::Prompt)
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("terminal closed"));
        assert!(ui.events().is_empty());
        assert_eq!(orchestrator.state(), RunState::SelectionPending);
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = BatchSummary::default();
        summary.record(&InstallOutcome::succeeded());
        summary.record(&InstallOutcome::failed("x"));
        summary.record(&InstallOutcome::failed("y"));
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.total(), 3);
    }
}
