//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use sitesync_core::graph::{RunReport, TaskOutcome};
use sitesync_core::pipeline::{self, DEFAULT, ProgressReporter};
use sitesync_core::updater::updater_for;
use sitesync_shared::{
    AppConfig, SiteConfig, config_file_path, init_config, load_config, load_config_from,
};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// sitesync: keep a documentation site in sync with its upstream library.
#[derive(Parser)]
#[command(
    name = "sitesync",
    version,
    about = "Republish an upstream library's artifacts, docs, examples, and changelog as a static site.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Site root directory (defaults to the current directory).
    #[arg(long, global = true, env = "SITESYNC_ROOT")]
    pub root: Option<PathBuf>,

    /// Config file (defaults to <root>/sitesync.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run a task and everything it requires.
    Run {
        /// Task name (see `sitesync tasks`).
        #[arg(default_value = DEFAULT)]
        task: String,
    },

    /// List the available tasks and their prerequisites.
    Tasks,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "sitesync=info",
        1 => "sitesync=debug",
        _ => "sitesync=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let root = match &cli.root {
        Some(root) => root.clone(),
        None => std::env::current_dir().wrap_err("cannot determine working directory")?,
    };

    match cli.command {
        Command::Run { ref task } => cmd_run(&root, cli.config.as_deref(), task).await,
        Command::Tasks => cmd_tasks(&root, cli.config.as_deref()),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(&root),
            ConfigAction::Show => cmd_config_show(&root, cli.config.as_deref()),
        },
    }
}

fn load(root: &Path, config: Option<&Path>) -> Result<AppConfig> {
    let config = match config {
        Some(path) => load_config_from(path)?,
        None => load_config(root)?,
    };
    Ok(config)
}

fn resolve(root: &Path, config: Option<&Path>) -> Result<Arc<SiteConfig>> {
    let app = load(root, config)?;
    Ok(Arc::new(SiteConfig::resolve(&app, root)?))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(root: &Path, config: Option<&Path>, task: &str) -> Result<()> {
    let site = resolve(root, config)?;
    let updater = updater_for(&site);

    info!(root = %root.display(), task, "building site");

    let reporter = CliProgress::new();
    let report = pipeline::build_site(site, updater, task, &reporter).await?;

    print_summary(&report);
    report.into_result()?;
    Ok(())
}

fn cmd_tasks(root: &Path, config: Option<&Path>) -> Result<()> {
    let site = resolve(root, config)?;
    let graph = pipeline::site_graph(Arc::clone(&site), updater_for(&site))?;

    let width = graph.tasks().iter().map(|t| t.name().len()).max().unwrap_or(0);
    for task in graph.tasks() {
        let requires = if task.prerequisites().is_empty() {
            String::new()
        } else {
            format!(" (requires {})", task.prerequisites().join(", "))
        };
        println!(
            "  {:<width$}  {}{requires}",
            task.name(),
            task.description().unwrap_or("")
        );
    }
    Ok(())
}

fn cmd_config_init(root: &Path) -> Result<()> {
    let path = config_file_path(root);
    if path.exists() {
        return Err(eyre!("config already exists at {}", path.display()));
    }
    let path = init_config(root)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(root: &Path, config: Option<&Path>) -> Result<()> {
    let app = load(root, config)?;
    SiteConfig::resolve(&app, root)?;
    let toml_str = toml::to_string_pretty(&app)?;
    println!("{toml_str}");
    Ok(())
}

fn print_summary(report: &RunReport) {
    println!();
    for record in &report.records {
        match record.outcome.error() {
            None => println!(
                "  {:<8} {:<8} {:.2}s",
                record.name,
                record.outcome.label(),
                record.elapsed.as_secs_f64()
            ),
            Some(e) => println!(
                "  {:<8} {:<8} {}: {e}",
                record.name,
                record.outcome.label(),
                e.kind()
            ),
        }
    }
    println!();
    println!(
        "  {} `{}` in {:.1}s",
        if report.is_success() { "Finished" } else { "Failed" },
        report.target,
        report.elapsed.as_secs_f64()
    );
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .map(|s| s.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]))
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn task_started(&self, name: &str) {
        self.spinner.set_message(format!("Running {name}"));
    }

    fn task_finished(&self, name: &str, outcome: &TaskOutcome) {
        self.spinner
            .set_message(format!("{name}: {}", outcome.label()));
    }

    fn done(&self, _report: &RunReport) {
        self.spinner.finish_and_clear();
    }
}
