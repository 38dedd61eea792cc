use anyhow::{Context, Result};
use log::debug;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::{
    package::Package,
    plugin::{EventKind, PackageEvent},
    runtime::Runtime,
};

pub mod config;
mod paths;

use config::Config;

/// Deliver one package event to the scaffolder.
#[tracing::instrument(skip(config))]
pub fn handle_event<R: Runtime>(
    config: Config<R>,
    kind: EventKind,
    package_name: &str,
    package_path: Option<PathBuf>,
) -> Result<()> {
    let stdout = io::stdout();
    let stderr = io::stderr();
    run_event(
        config,
        kind,
        package_name,
        package_path,
        &mut stdout.lock(),
        &mut stderr.lock(),
    )
}

pub(crate) fn run_event<R: Runtime, W: Write, E: Write>(
    config: Config<R>,
    kind: EventKind,
    package_name: &str,
    package_path: Option<PathBuf>,
    out: &mut W,
    err: &mut E,
) -> Result<()> {
    let package = match package_path {
        Some(path) => Package::new(package_name, path),
        None => Package::in_vendor_dir(package_name, &config.vendor_dir)?,
    };
    debug!("Handling {} of {} at {:?}", kind, package, package.install_path);

    let mut plugin = config.activate()?;
    plugin
        .handle(&PackageEvent::new(kind, package), out, err)
        .with_context(|| format!("Failed to handle {} of {}", kind, package_name))?;
    Ok(())
}

/// Print whether the scaffolder is enabled and the detected project type.
#[tracing::instrument(skip(config))]
pub fn info<R: Runtime>(config: Config<R>) -> Result<()> {
    let plugin = config.activate()?;
    let stdout = io::stdout();
    plugin.info(&mut stdout.lock())
}
