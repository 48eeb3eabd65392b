use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use needle_core::config::{Config, CONFIG_FILE};
use needle_core::{build_module, Module};
use needle_report::{json, text};

#[derive(Parser)]
#[command(name = "needle")]
#[command(about = "Line composition, declaration, and package dependency analysis for Go modules")]
#[command(version)]
struct Cli {
    /// Log progress to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the full module report
    Analyze {
        /// Path to the module root (the folder holding go.mod)
        path: PathBuf,
        #[arg(long, value_enum, default_value = "text")]
        format: Format,
        /// Single-line JSON output
        #[arg(long)]
        compact: bool,
        /// Include per-file rows
        #[arg(long)]
        details: bool,
        /// Config file path (defaults to .needle.toml in the module root or an ancestor)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print external users, independent packages, and dependency levels
    Deps {
        /// Path to the module root
        path: PathBuf,
        #[arg(long, value_enum, default_value = "text")]
        format: Format,
        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print per-package line and declaration breakdowns
    Code {
        /// Path to the module root
        path: PathBuf,
        /// Include per-file rows
        #[arg(long)]
        details: bool,
        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Create a default .needle.toml configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Analyze {
            path,
            format,
            compact,
            details,
            config,
        } => cmd_analyze(&path, format, compact, details, config.as_deref()),
        Commands::Deps {
            path,
            format,
            config,
        } => cmd_deps(&path, format, config.as_deref()),
        Commands::Code {
            path,
            details,
            config,
        } => cmd_code(&path, details, config.as_deref()),
        Commands::Init { force } => cmd_init(force),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(2);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn cmd_analyze(
    path: &Path,
    format: Format,
    compact: bool,
    details: bool,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = load_config(path, config_path)?;
    let module = run_analysis(path, &config)?;
    let details = details || config.report.details;
    let report = match format {
        Format::Text => text::format_analysis(&module, details),
        Format::Json => {
            let compact = compact || config.report.compact;
            json::format_analysis(&module, details, compact) + "\n"
        }
    };
    print!("{report}");
    Ok(())
}

fn cmd_deps(path: &Path, format: Format, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(path, config_path)?;
    let module = run_analysis(path, &config)?;
    let report = match format {
        Format::Text => text::format_deps(&module),
        Format::Json => json::format_deps(&module, config.report.compact) + "\n",
    };
    print!("{report}");
    Ok(())
}

fn cmd_code(path: &Path, details: bool, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(path, config_path)?;
    let module = run_analysis(path, &config)?;
    let report = text::format_code(&module, details || config.report.details);
    print!("{report}");
    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let target = PathBuf::from(CONFIG_FILE);
    if target.exists() && !force {
        anyhow::bail!("{CONFIG_FILE} already exists. Use --force to overwrite.");
    }
    std::fs::write(&target, Config::default_toml())
        .with_context(|| format!("failed to write {CONFIG_FILE}"))?;
    println!("Created {CONFIG_FILE} with default configuration.");
    Ok(())
}

fn load_config(project_path: &Path, config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(p) => Config::load(p).context("run `needle init` to create a valid config file"),
        None => Ok(Config::load_or_default(project_path)),
    }
}

fn run_analysis(project_path: &Path, config: &Config) -> Result<Module> {
    build_module(project_path, config)
        .with_context(|| format!("failed to analyze '{}'", project_path.display()))
}
