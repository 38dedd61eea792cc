//! Event entry point: decides whether and how a package event is handled,
//! prints the outcome and persists the lock file.

use anyhow::Result;
use log::{debug, info, warn};
use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::config::{Config, Settings};
use crate::handler::PackageHandler;
use crate::operation::{MessageKind, OperationRegistry, OperationResultCollection};
use crate::package::{Package, find_installed_packages};
use crate::project_type::{ProjectType, ProjectTypeRegistry};
use crate::runtime::Runtime;

const BANNER: &str = "=== [Scaffolder] ===";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Install,
    Update,
    Uninstall,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Install => write!(f, "install"),
            EventKind::Update => write!(f, "update"),
            EventKind::Uninstall => write!(f, "uninstall"),
        }
    }
}

/// A package event delivered by the host package manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageEvent {
    pub kind: EventKind,
    pub package: Package,
}

impl PackageEvent {
    pub fn new(kind: EventKind, package: Package) -> Self {
        Self { kind, package }
    }
}

pub struct Plugin<R: Runtime> {
    runtime: R,
    project_root: PathBuf,
    vendor_dir: PathBuf,
    settings: Settings,
    config: Config,
    operations: OperationRegistry,
    project_types: ProjectTypeRegistry,
}

impl<R: Runtime> Plugin<R> {
    /// Load the lock file and build the registries.
    ///
    /// Failing to load or create the lock file is fatal.
    #[tracing::instrument(skip(runtime, settings))]
    pub fn activate(
        runtime: R,
        project_root: PathBuf,
        vendor_dir: PathBuf,
        settings: Settings,
    ) -> Result<Self> {
        let config = Config::load_or_create(&runtime, &project_root)?;
        let mut plugin = Self {
            runtime,
            project_root,
            vendor_dir,
            settings,
            config,
            operations: OperationRegistry::with_builtins(),
            project_types: ProjectTypeRegistry::with_builtins(),
        };
        plugin.refresh_extensions();
        Ok(plugin)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Rebuild both registries from the packages in the vendor directory.
    ///
    /// When the vendor directory cannot be scanned the current registries stay.
    fn refresh_extensions(&mut self) {
        match find_installed_packages(&self.runtime, &self.vendor_dir) {
            Ok(packages) => {
                self.operations = OperationRegistry::discover(&self.runtime, &packages);
                self.project_types = ProjectTypeRegistry::discover(&self.runtime, &packages);
                debug!(
                    "{} operation(s) and {} project type(s) registered",
                    self.operations.len(),
                    self.project_types.len()
                );
            }
            Err(e) => warn!(
                "Could not scan {:?} for extensions, keeping the current ones: {:#}",
                self.vendor_dir, e
            ),
        }
    }

    pub fn detect_project_type(&self) -> Option<&ProjectType> {
        self.project_types.detect(
            &self.runtime,
            &self.project_root,
            self.settings.project_type.as_deref(),
        )
    }

    /// Handle one package event, printing the outcome to `out` and `err`.
    ///
    /// Returns the collected results; an `Err` means the lock file could not
    /// be written or the output streams failed.
    #[tracing::instrument(
        skip(self, event, out, err),
        fields(kind = %event.kind, package = %event.package)
    )]
    pub fn handle<W: Write, E: Write>(
        &mut self,
        event: &PackageEvent,
        out: &mut W,
        err: &mut E,
    ) -> Result<OperationResultCollection> {
        if !self.settings.enabled {
            debug!("Scaffolder is disabled");
            return Ok(OperationResultCollection::new());
        }
        if self.settings.is_excluded(&event.package.name) {
            writeln!(out, "Scaffolder: Package {} ignored in settings", event.package)?;
            return Ok(OperationResultCollection::new());
        }

        if event.kind != EventKind::Uninstall {
            self.refresh_extensions();
        }
        let Some(project_type) = self.detect_project_type().cloned() else {
            info!("No project type matches {:?}", self.project_root);
            return Ok(OperationResultCollection::new());
        };
        debug!("Project type: {}", project_type.machine_name);

        let mut handler = PackageHandler::new(
            &self.runtime,
            &event.package,
            &project_type,
            &self.project_root,
            &self.operations,
            &mut self.config,
        );
        if !handler.contains_installer_directory() {
            debug!("{} has no installer directory", event.package);
            return Ok(OperationResultCollection::new());
        }

        let (results, forgot_package) = match event.kind {
            EventKind::Install | EventKind::Update => (handler.handle_install(), false),
            EventKind::Uninstall => {
                let uninstalled = handler.handle_uninstall();
                (uninstalled.results, uninstalled.forgot_package)
            }
        };

        if results.made_changes() {
            writeln!(out, "{}", BANNER)?;
            print_results(&results, out, err)?;
            self.config.flush(&self.runtime)?;
            writeln!(out, "{}", BANNER)?;
        } else if forgot_package {
            debug!("Nothing left to reverse for {}, dropping its lock entry", event.package);
            self.config.flush(&self.runtime)?;
        }
        Ok(results)
    }

    /// Print whether the scaffolder is enabled and which project type applies.
    pub fn info<W: Write>(&self, out: &mut W) -> Result<()> {
        if !self.settings.enabled {
            writeln!(out, "Scaffolder disabled in settings")?;
            return Ok(());
        }
        writeln!(out, "Scaffolder enabled")?;
        match self.detect_project_type() {
            Some(project_type) => writeln!(
                out,
                "Project type: {} ({})",
                project_type.friendly_name, project_type.machine_name
            )?,
            None => writeln!(out, "Project type: none detected")?,
        }
        Ok(())
    }
}

/// Print one line per message. Errors go to `err`, everything else to `out`.
pub fn print_results<W: Write, E: Write>(
    results: &OperationResultCollection,
    out: &mut W,
    err: &mut E,
) -> io::Result<()> {
    for result in results.iter() {
        for message in result.messages().iter() {
            let line = format!(
                "  - [{}] [{}] {}",
                result.operation_name(),
                result.version(),
                message
            );
            match message.kind {
                MessageKind::Error => writeln!(err, "{}", line)?,
                MessageKind::Status | MessageKind::Warning => writeln!(out, "{}", line)?,
            }
        }
    }
    Ok(())
}
