//! fenceline CLI: static ownership-boundary checker.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use fenceline::checker::{self, BoundaryChecker};
use fenceline::error::ConfigError;
use fenceline::extract;
use fenceline::filepath::FilePath;
use fenceline::ownership::OwnershipMap;

#[derive(Parser)]
#[command(name = "fenceline", version, about = "Static ownership-boundary checker")]
struct Cli {
    /// Path to the ownership map (defaults to .fenceline.toml at the project root).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Project root directory.
    #[arg(long, global = true, default_value = ".")]
    project_root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check candidate files against the acting instance's boundaries.
    Check {
        /// Candidate file paths (e.g. the output of a version-control diff).
        files: Vec<PathBuf>,

        /// Acting instance (overrides .instance file and environment).
        #[arg(long)]
        instance: Option<String>,

        /// Treat warnings as failures.
        #[arg(long)]
        strict: bool,

        /// Export the violation report as JSON.
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// List every instance's territory and allowed imports.
    Boundaries,

    /// Show the owner of a single path.
    Owner {
        /// Path to resolve.
        path: PathBuf,
    },

    /// Validate the ownership map itself (duplicates, missing directories).
    ValidateMap {
        /// Treat missing-on-disk warnings as failures.
        #[arg(long)]
        strict: bool,
    },

    /// Extract and print a file's import statements as JSON.
    Imports {
        /// Python source file.
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let project_root = cli.project_root.clone();
    let map = load_map(&cli)?;

    match cli.command {
        Commands::Check {
            files,
            instance,
            strict,
            export,
        } => {
            let instance = resolve_instance(instance, &project_root)?;

            if files.is_empty() {
                println!("No files to check.");
                return Ok(());
            }

            let checker = BoundaryChecker::new(map, &project_root, &instance)?;
            let report = checker.check_files(&files);

            print!("{}", report.render());

            if let Some(path) = export {
                report.write_json(&path)?;
                println!("report exported to {}", path.display());
            }

            if report.failed(strict) {
                std::process::exit(1);
            }
        }

        Commands::Boundaries => {
            for boundary in &map.instances {
                println!("{}:", boundary.id);
                println!("  owns:");
                for path in &boundary.owned_paths {
                    println!("    - {path}");
                }
                if !boundary.allowed_imports.is_empty() {
                    println!("  can import from:");
                    for path in &boundary.allowed_imports {
                        println!("    - {path}");
                    }
                }
            }
            for shared in &map.shared {
                println!("shared ({}):", shared.category);
                for path in &shared.paths {
                    println!("    - {path}");
                }
            }
        }

        Commands::Owner { path } => {
            let resolved = FilePath::resolve(&path, &project_root, &map);
            match &resolved.instance_owner {
                Some(owner) => println!("Owner: {owner}"),
                None if resolved.is_shared => println!("Owner: none (shared territory)"),
                None if resolved.is_config => println!("Owner: none (project config)"),
                None => println!("Owner: none (unrestricted)"),
            }
        }

        Commands::ValidateMap { strict } => {
            let report = checker::validate_map(&map, &project_root);
            if report.violations.is_empty() {
                println!("All mappings are valid.");
            } else {
                print!("{}", report.render());
            }
            if report.failed(strict) {
                std::process::exit(1);
            }
        }

        Commands::Imports { file } => {
            let imports = extract::extract_imports(&file)?;
            let json = serde_json::to_string_pretty(&imports).into_diagnostic()?;
            println!("{json}");
        }
    }

    Ok(())
}

/// Load the ownership map from --config or the default location.
fn load_map(cli: &Cli) -> Result<OwnershipMap> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.project_root.join(".fenceline.toml"));
    Ok(OwnershipMap::load(&path)?)
}

/// Determine the acting instance: flag, then `.instance` marker file, then
/// the FENCELINE_INSTANCE environment variable.
fn resolve_instance(flag: Option<String>, project_root: &Path) -> Result<String> {
    if let Some(instance) = flag {
        return Ok(instance);
    }

    let marker = project_root.join(".instance");
    if let Ok(contents) = std::fs::read_to_string(&marker) {
        let trimmed = contents.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }

    if let Ok(instance) = std::env::var("FENCELINE_INSTANCE") {
        if !instance.is_empty() {
            return Ok(instance);
        }
    }

    Err(ConfigError::NoInstance.into())
}
