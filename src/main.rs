use anyhow::Result;
use clap::Parser;
use scaffolder::commands::{self, config::Config};
use scaffolder::plugin::EventKind;
use std::path::PathBuf;

/// scaffolder - project scaffolding for installed packages
///
/// Applies the files, environment variables, bundles and ignore rules a
/// package ships in its `.installer` directory, and removes them again
/// when the package is uninstalled.
///
/// Examples:
///   scaffolder install acme/widget      # Apply new versions of acme/widget
///   scaffolder uninstall acme/widget    # Reverse everything acme/widget applied
#[derive(Parser, Debug)]
#[command(author, version = env!("SCAFFOLDER_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project root directory (defaults to the current directory; also via SCAFFOLDER_ROOT)
    #[arg(
        long = "root",
        short = 'r',
        env = "SCAFFOLDER_ROOT",
        value_name = "PATH",
        global = true
    )]
    pub project_root: Option<PathBuf>,

    /// Directory packages are installed to (defaults to <root>/vendor)
    #[arg(long = "vendor-dir", value_name = "PATH", global = true)]
    pub vendor_dir: Option<PathBuf>,

    /// Manifest holding the `extra.scaffolder` settings (defaults to <root>/composer.json)
    #[arg(long = "manifest", value_name = "PATH", global = true)]
    pub manifest: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Handle the installation of a package
    Install(EventArgs),

    /// Handle the update of a package
    Update(EventArgs),

    /// Handle the removal of a package
    Uninstall(EventArgs),

    /// Show whether the scaffolder is enabled and the detected project type
    Info,
}

#[derive(clap::Args, Debug)]
pub struct EventArgs {
    /// The package in the format "vendor/name"
    #[arg(value_name = "VENDOR/NAME")]
    pub package: String,

    /// Where the package is installed (defaults to <vendor-dir>/<vendor>/<name>)
    #[arg(long = "path", value_name = "PATH")]
    pub path: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = scaffolder::runtime::RealRuntime;
    let config = Config::new(runtime, cli.project_root, cli.vendor_dir, cli.manifest)?;

    match cli.command {
        Commands::Install(args) => {
            commands::handle_event(config, EventKind::Install, &args.package, args.path)?
        }
        Commands::Update(args) => {
            commands::handle_event(config, EventKind::Update, &args.package, args.path)?
        }
        Commands::Uninstall(args) => {
            commands::handle_event(config, EventKind::Uninstall, &args.package, args.path)?
        }
        Commands::Info => commands::info(config)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_install_parsing() {
        let cli = Cli::try_parse_from(["scaffolder", "install", "acme/widget"]).unwrap();
        match cli.command {
            Commands::Install(args) => {
                assert_eq!(args.package, "acme/widget");
                assert_eq!(args.path, None);
            }
            _ => panic!("Expected Install command"),
        }
        assert_eq!(cli.vendor_dir, None);
    }

    #[test]
    fn test_cli_uninstall_with_path() {
        let cli = Cli::try_parse_from([
            "scaffolder",
            "uninstall",
            "acme/widget",
            "--path",
            "/tmp/widget",
        ])
        .unwrap();
        match cli.command {
            Commands::Uninstall(args) => {
                assert_eq!(args.path, Some(PathBuf::from("/tmp/widget")));
            }
            _ => panic!("Expected Uninstall command"),
        }
    }

    #[test]
    fn test_cli_global_options() {
        let cli = Cli::try_parse_from([
            "scaffolder",
            "--root",
            "/srv/app",
            "--vendor-dir",
            "/srv/deps",
            "--manifest",
            "/srv/app/project.json",
            "info",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Info));
        assert_eq!(cli.project_root, Some(PathBuf::from("/srv/app")));
        assert_eq!(cli.vendor_dir, Some(PathBuf::from("/srv/deps")));
        assert_eq!(cli.manifest, Some(PathBuf::from("/srv/app/project.json")));
    }

    #[test]
    fn test_cli_root_after_subcommand() {
        let cli =
            Cli::try_parse_from(["scaffolder", "update", "acme/widget", "--root", "/tmp"]).unwrap();
        assert_eq!(cli.project_root, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn test_cli_missing_package_fails() {
        assert!(Cli::try_parse_from(["scaffolder", "install"]).is_err());
    }

    #[test]
    fn test_cli_no_subcommand_fails() {
        assert!(Cli::try_parse_from(["scaffolder", "acme/widget"]).is_err());
    }
}
